//! Backend types and traits
//!
//! Defines the change events, snapshots, pages and subscription handles
//! exchanged between a backend and the pagers.

use crate::error::Result;
use crate::query::{Cursor, Query};
use crate::types::Record;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::fmt;
use std::pin::Pin;

// ============================================================================
// Change Events
// ============================================================================

/// Kind of change reported by a live subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Record entered the result set
    Added,
    /// Record in the result set changed
    Modified,
    /// Record left the result set
    Removed,
}

/// One delta within a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// What happened
    pub kind: ChangeKind,
    /// The record, with its values after the change
    pub record: Record,
}

impl ChangeEvent {
    /// Create an added event
    pub fn added(record: Record) -> Self {
        Self {
            kind: ChangeKind::Added,
            record,
        }
    }

    /// Create a modified event
    pub fn modified(record: Record) -> Self {
        Self {
            kind: ChangeKind::Modified,
            record,
        }
    }

    /// Create a removed event
    pub fn removed(record: Record) -> Self {
        Self {
            kind: ChangeKind::Removed,
            record,
        }
    }
}

/// A batch of changes delivered by a live subscription
///
/// The first snapshot of a subscription reports the whole initial result
/// set as `Added`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Deltas since the previous snapshot, in delivery order
    pub changes: Vec<ChangeEvent>,
    /// Number of records in the full result set after this batch
    pub size: usize,
    /// Cursor of the last record in the full result set
    pub last: Option<Cursor>,
}

impl Snapshot {
    /// Create a snapshot for the result set `docs` of `query`
    pub fn new(query: &Query, changes: Vec<ChangeEvent>, docs: &[Record]) -> Self {
        Self {
            changes,
            size: docs.len(),
            last: docs.last().map(|r| query.cursor_for(r)),
        }
    }

    /// Check whether the full result set is empty
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Count changes of a kind
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }
}

// ============================================================================
// Pages
// ============================================================================

/// Result of a one-shot page fetch
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    /// Records in backend order
    pub records: Vec<Record>,
    /// Cursor of the first record
    pub first: Option<Cursor>,
    /// Cursor of the last record
    pub last: Option<Cursor>,
}

impl Page {
    /// Build a page and its boundary cursors from ordered records
    pub fn from_records(query: &Query, records: Vec<Record>) -> Self {
        Self {
            first: records.first().map(|r| query.cursor_for(r)),
            last: records.last().map(|r| query.cursor_for(r)),
            records,
        }
    }

    /// Check if the page has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Identifier of a live subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Stream of snapshots delivered by a live subscription
pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<Snapshot>> + Send>>;

/// Handle to an open live query
pub struct Subscription {
    id: SubscriptionId,
    query: Query,
    stream: SnapshotStream,
}

impl Subscription {
    /// Create a subscription handle
    pub fn new(id: SubscriptionId, query: Query, stream: SnapshotStream) -> Self {
        Self { id, query, stream }
    }

    /// Subscription id
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The query this subscription serves
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Wait for the next snapshot; `None` once the backend closes the stream
    pub async fn next_snapshot(&mut self) -> Option<Result<Snapshot>> {
        self.stream.next().await
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Backend Traits
// ============================================================================

/// A document database capable of filtered, ordered, paginated reads
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Open a live query; snapshots arrive on the returned handle
    async fn subscribe(&self, query: &Query) -> Result<Subscription>;

    /// Close a live query; no further snapshots are delivered for it
    fn unsubscribe(&self, id: SubscriptionId);

    /// Fetch one page without subscribing
    async fn fetch_page(&self, query: &Query) -> Result<Page>;
}

/// Location of a per-item, per-user aggregate document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregatePath {
    /// Parent collection (e.g. "modalities")
    pub collection: String,
    /// Parent record id
    pub item_id: String,
    /// Sub-collection holding one document per user (e.g. "user_times")
    pub sub_collection: String,
    /// User id, which is also the document id
    pub user_id: String,
}

impl AggregatePath {
    /// Create an aggregate path
    pub fn new(
        collection: impl Into<String>,
        item_id: impl Into<String>,
        sub_collection: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            item_id: item_id.into(),
            sub_collection: sub_collection.into(),
            user_id: user_id.into(),
        }
    }
}

impl fmt::Display for AggregatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.collection, self.item_id, self.sub_collection, self.user_id
        )
    }
}

/// Per-item secondary read keyed by the current user
#[async_trait]
pub trait AggregateLookup: Send + Sync {
    /// Read the aggregate document
    ///
    /// `Ok(None)` means the document does not exist, which is a valid empty
    /// aggregate. `Err` is reserved for transport or permission failures.
    async fn lookup_aggregate(&self, path: &AggregatePath) -> Result<Option<Record>>;
}
