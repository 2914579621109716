//! Live list view types

use crate::types::{Record, StatusFilter};
use serde::Serialize;
use std::sync::Arc;

/// Immutable view of a `ChangeStreamPager` after a batch
#[derive(Debug, Clone, Serialize)]
pub struct PagerView {
    /// Records in arrival order
    pub records: Arc<[Record]>,
    /// Filter the records were fetched with
    #[serde(serialize_with = "serialize_filter")]
    pub filter: StatusFilter,
    /// Whether a subscription is waiting for its first batch
    pub is_loading: bool,
    /// Whether another page may exist
    pub has_more: bool,
    /// Last subscription failure, shown alongside the last good records
    pub error: Option<String>,
}

impl PagerView {
    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the view has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ids in display order
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }
}

fn serialize_filter<S: serde::Serializer>(
    filter: &StatusFilter,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(filter)
}
