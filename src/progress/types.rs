//! Progress page types

use crate::query::Cursor;
use crate::types::Record;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which page to load relative to the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// First page, no boundary
    #[default]
    Initial,
    /// Page after the last record of the current page
    Forward,
    /// Page before the first record of the current page
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => f.write_str("initial"),
            Self::Forward => f.write_str("forward"),
            Self::Backward => f.write_str("backward"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "initial" | "i" => Ok(Self::Initial),
            "forward" | "next" | "f" => Ok(Self::Forward),
            "backward" | "prev" | "b" => Ok(Self::Backward),
            other => Err(crate::Error::Other(format!("Unknown direction: {other}"))),
        }
    }
}

/// A page record with the current user's aggregate attached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    /// Row key, unique within the page even when ids repeat
    pub key: String,
    /// The category record
    pub record: Record,
    /// Aggregate value, 0 when the user has none
    pub aggregate_value: f64,
    /// `floor(aggregate_value / limit * 100)`
    pub progress: u32,
}

impl EnrichedRecord {
    /// Build a row for position `position` of a fetched page
    pub fn new(position: usize, record: Record, aggregate_value: f64, progress: u32) -> Self {
        Self {
            key: format!("{position}:{}", record.id),
            record,
            aggregate_value,
            progress,
        }
    }

    /// Id of the underlying record
    pub fn id(&self) -> &str {
        &self.record.id
    }
}

/// First and last cursor of the displayed page, in fetch order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageBounds {
    /// Cursor of the first fetched record
    pub first: Option<Cursor>,
    /// Cursor of the last fetched record
    pub last: Option<Cursor>,
}

impl PageBounds {
    /// The boundary a move in `direction` starts from
    pub fn boundary(&self, direction: Direction) -> Option<&Cursor> {
        match direction {
            Direction::Initial => None,
            Direction::Forward => self.last.as_ref(),
            Direction::Backward => self.first.as_ref(),
        }
    }
}

/// Result of executing a `PageRequest`, not yet committed to the pager
#[derive(Debug, Clone)]
pub struct PageLoad {
    pub(crate) generation: u64,
    pub(crate) direction: Direction,
    pub(crate) rows: Vec<EnrichedRecord>,
    pub(crate) bounds: PageBounds,
    pub(crate) failed: Vec<String>,
}

impl PageLoad {
    /// Generation of the request that produced this load
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Direction of the request
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Enriched rows, sorted by aggregate value descending
    pub fn rows(&self) -> &[EnrichedRecord] {
        &self.rows
    }

    /// Cursors of the unsorted fetch
    pub fn bounds(&self) -> &PageBounds {
        &self.bounds
    }

    /// Ids whose aggregate lookup failed
    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    /// Check whether every lookup succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
