//! Query types
//!
//! Defines constraints, cursors and the reference evaluation of a query
//! against an in-memory set of records.

use super::compare::compare_values;
use crate::types::{JsonValue, Record};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Sort direction for an `orderBy` constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Asc,
    /// Largest first
    Desc,
}

impl SortDirection {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Self::Asc => ord,
            Self::Desc => ord.reverse(),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("asc"),
            Self::Desc => f.write_str("desc"),
        }
    }
}

/// Opaque pagination boundary
///
/// Names one record's position under the ordering of the query that
/// produced it: the record id plus its values for each `orderBy` field.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    id: String,
    keys: Vec<JsonValue>,
}

impl Cursor {
    /// Create a cursor from a record id and its ordering key values
    pub fn new(id: impl Into<String>, keys: Vec<JsonValue>) -> Self {
        Self {
            id: id.into(),
            keys,
        }
    }

    /// Id of the record this cursor points at
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ordering key values captured from the record
    pub fn keys(&self) -> &[JsonValue] {
        &self.keys
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.id)
    }
}

/// A single query constraint
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Order results by a field
    OrderBy {
        /// Field name
        field: String,
        /// Direction
        direction: SortDirection,
    },
    /// Keep the first `n` results
    Limit(usize),
    /// Keep the last `n` results
    LimitToLast(usize),
    /// Only results strictly after the cursor
    StartAfter(Cursor),
    /// Only results strictly before the cursor
    EndBefore(Cursor),
    /// Only results whose field equals the value
    WhereEquals {
        /// Field name
        field: String,
        /// Expected value
        value: JsonValue,
    },
}

impl Constraint {
    /// Create an orderBy constraint
    pub fn order_by(field: impl Into<String>, direction: SortDirection) -> Self {
        Self::OrderBy {
            field: field.into(),
            direction,
        }
    }

    /// Create a whereEquals constraint
    pub fn where_eq(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::WhereEquals {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderBy { field, direction } => write!(f, "orderBy({field}, {direction})"),
            Self::Limit(n) => write!(f, "limit({n})"),
            Self::LimitToLast(n) => write!(f, "limitToLast({n})"),
            Self::StartAfter(cursor) => write!(f, "startAfter({cursor})"),
            Self::EndBefore(cursor) => write!(f, "endBefore({cursor})"),
            Self::WhereEquals { field, value } => write!(f, "where({field} == {value})"),
        }
    }
}

/// Effective page limit of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLimit {
    /// First `n` results
    First(usize),
    /// Last `n` results
    Last(usize),
}

/// A filtered, ordered, optionally bounded read over one collection
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    constraints: Vec<Constraint>,
}

impl Query {
    /// Create an unconstrained query over a collection
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            constraints: Vec::new(),
        }
    }

    /// Append a constraint
    #[must_use]
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Append several constraints, preserving their order
    #[must_use]
    pub fn with_constraints(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    /// Append an orderBy constraint
    #[must_use]
    pub fn order_by(self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.with(Constraint::order_by(field, direction))
    }

    /// Append a limit constraint
    #[must_use]
    pub fn limit(self, n: usize) -> Self {
        self.with(Constraint::Limit(n))
    }

    /// Append a limitToLast constraint
    #[must_use]
    pub fn limit_to_last(self, n: usize) -> Self {
        self.with(Constraint::LimitToLast(n))
    }

    /// Append a startAfter constraint
    #[must_use]
    pub fn start_after(self, cursor: Cursor) -> Self {
        self.with(Constraint::StartAfter(cursor))
    }

    /// Append an endBefore constraint
    #[must_use]
    pub fn end_before(self, cursor: Cursor) -> Self {
        self.with(Constraint::EndBefore(cursor))
    }

    /// Append a whereEquals constraint
    #[must_use]
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.with(Constraint::where_eq(field, value))
    }

    /// Collection name
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// All constraints in the order they were added
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The orderBy fields, in priority order
    pub fn orderings(&self) -> Vec<(&str, SortDirection)> {
        self.constraints
            .iter()
            .filter_map(|c| match c {
                Constraint::OrderBy { field, direction } => Some((field.as_str(), *direction)),
                _ => None,
            })
            .collect()
    }

    /// The effective limit; the last limit constraint wins
    pub fn page_limit(&self) -> Option<PageLimit> {
        self.constraints.iter().rev().find_map(|c| match c {
            Constraint::Limit(n) => Some(PageLimit::First(*n)),
            Constraint::LimitToLast(n) => Some(PageLimit::Last(*n)),
            _ => None,
        })
    }

    /// Cursor after which results start, if any
    pub fn start_after_cursor(&self) -> Option<&Cursor> {
        self.constraints.iter().rev().find_map(|c| match c {
            Constraint::StartAfter(cursor) => Some(cursor),
            _ => None,
        })
    }

    /// Cursor before which results end, if any
    pub fn end_before_cursor(&self) -> Option<&Cursor> {
        self.constraints.iter().rev().find_map(|c| match c {
            Constraint::EndBefore(cursor) => Some(cursor),
            _ => None,
        })
    }

    /// Check whether a record satisfies every whereEquals constraint
    pub fn matches(&self, record: &Record) -> bool {
        self.constraints.iter().all(|c| match c {
            Constraint::WhereEquals { field, value } => {
                record.get(field).is_some_and(|v| v == value)
            }
            _ => true,
        })
    }

    /// Build the cursor that points at `record` under this query's ordering
    pub fn cursor_for(&self, record: &Record) -> Cursor {
        let keys = self
            .orderings()
            .iter()
            .map(|(field, _)| record.get(field).cloned().unwrap_or(JsonValue::Null))
            .collect();
        Cursor::new(record.id.clone(), keys)
    }

    /// Compare two records under this query's ordering
    ///
    /// Ties are broken by id, in the direction of the last orderBy.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        self.compare_keys(&self.cursor_for(a), &self.cursor_for(b))
    }

    /// Compare a record against a cursor under this query's ordering
    pub fn compare_to_cursor(&self, record: &Record, cursor: &Cursor) -> Ordering {
        self.compare_keys(&self.cursor_for(record), cursor)
    }

    fn compare_keys(&self, a: &Cursor, b: &Cursor) -> Ordering {
        let orderings = self.orderings();
        for (i, (_, direction)) in orderings.iter().enumerate() {
            let null = JsonValue::Null;
            let left = a.keys.get(i).unwrap_or(&null);
            let right = b.keys.get(i).unwrap_or(&null);
            let ord = direction.apply(compare_values(left, right));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        let tiebreak = orderings.last().map_or(SortDirection::Asc, |(_, d)| *d);
        tiebreak.apply(a.id.cmp(&b.id))
    }

    /// Evaluate this query against a set of records
    ///
    /// Filters, sorts, applies cursor bounds, then applies the page limit.
    pub fn evaluate<'a>(&self, records: impl IntoIterator<Item = &'a Record>) -> Vec<Record> {
        let mut results: Vec<Record> = records
            .into_iter()
            .filter(|r| self.matches(r))
            .filter(|r| {
                self.start_after_cursor()
                    .is_none_or(|c| self.compare_to_cursor(r, c) == Ordering::Greater)
            })
            .filter(|r| {
                self.end_before_cursor()
                    .is_none_or(|c| self.compare_to_cursor(r, c) == Ordering::Less)
            })
            .cloned()
            .collect();

        results.sort_by(|a, b| self.compare(a, b));

        match self.page_limit() {
            Some(PageLimit::First(n)) => results.truncate(n),
            Some(PageLimit::Last(n)) => {
                let skip = results.len().saturating_sub(n);
                results.drain(..skip);
            }
            None => {}
        }

        results
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection)?;
        for (i, constraint) in self.constraints.iter().enumerate() {
            let sep = if i == 0 { ": " } else { ", " };
            write!(f, "{sep}{constraint}")?;
        }
        Ok(())
    }
}
