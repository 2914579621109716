//! Change stream pager implementation
//!
//! Reconciles snapshots from one live subscription at a time into an owned
//! record list.

use super::types::PagerView;
use crate::backend::{ChangeKind, QueryBackend, Snapshot, Subscription, SubscriptionId};
use crate::config::{PagerConfig, SubmissionsConfig};
use crate::error::{Error, Result};
use crate::query::{Constraint, Cursor, Query, SortDirection};
use crate::transform::PresentationTransform;
use crate::types::{Record, StatusFilter};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Callback invoked once per newly added record, in arrival order
pub type AddedCallback = Box<dyn FnMut(&Record) + Send>;

/// Live, filterable, growable list of submissions
pub struct ChangeStreamPager {
    /// Shared backend connection
    backend: Arc<dyn QueryBackend>,
    /// Collection and paging settings
    config: SubmissionsConfig,
    /// Display formatting for added and modified records
    transform: PresentationTransform,
    /// Caller constraints appended after the pager's own
    extra: Vec<Constraint>,
    /// Per-added-record hook
    on_added: Option<AddedCallback>,

    /// Records in arrival order
    records: Vec<Record>,
    /// Position of each record id in `records`
    index: HashMap<String, usize>,
    /// Current status filter
    filter: StatusFilter,
    /// Page boundary the current subscription starts after
    boundary: Option<Cursor>,
    /// Last cursor of the most recent snapshot
    last_seen: Option<Cursor>,
    /// Result-set size of the most recent snapshot; `None` until one arrives
    last_page_size: Option<usize>,
    /// Waiting for the first batch of the current subscription
    is_loading: bool,
    /// Replace the list when the next batch arrives
    pending_reset: bool,
    /// Last subscription failure
    error: Option<String>,
    /// Open subscription, at most one
    subscription: Option<Subscription>,
}

impl ChangeStreamPager {
    /// Create a pager; nothing is fetched until `subscribe` is called
    pub fn new(backend: Arc<dyn QueryBackend>, config: &PagerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            config: config.submissions.clone(),
            transform: PresentationTransform::from_config(config)?,
            extra: Vec::new(),
            on_added: None,
            records: Vec::new(),
            index: HashMap::new(),
            filter: StatusFilter::All,
            boundary: None,
            last_seen: None,
            last_page_size: None,
            is_loading: false,
            pending_reset: false,
            error: None,
            subscription: None,
        })
    }

    /// Append caller constraints to every query
    #[must_use]
    pub fn with_constraints(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.extra.extend(constraints);
        self
    }

    /// Register a callback for newly added records
    #[must_use]
    pub fn with_on_added<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Record) + Send + 'static,
    {
        self.on_added = Some(Box::new(callback));
        self
    }

    /// Build the query for the current filter and boundary
    pub fn query(&self) -> Query {
        let mut query = Query::new(&self.config.collection)
            .order_by(&self.config.timestamp_field, SortDirection::Desc)
            .limit(self.config.page_size);

        if let Some(cursor) = &self.boundary {
            query = query.start_after(cursor.clone());
        }
        if let Some(status) = self.filter.status() {
            query = query.where_eq(&self.config.status_field, status);
        }

        query.with_constraints(self.extra.iter().cloned())
    }

    /// Open a live query for the current filter and boundary
    ///
    /// Any open subscription is closed first.
    pub async fn subscribe(&mut self) -> Result<()> {
        self.teardown();

        let query = self.query();
        self.is_loading = true;
        self.last_seen = None;
        self.last_page_size = None;

        match self.backend.subscribe(&query).await {
            Ok(subscription) => {
                debug!("Subscribed {} to {query}", subscription.id());
                self.subscription = Some(subscription);
                Ok(())
            }
            Err(e) => {
                let err = into_subscription_error(&self.config.collection, e);
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Change the status filter and start over from the newest record
    ///
    /// An unrecognized value is rejected before anything else changes.
    /// Selecting the active filter keeps the open subscription and the
    /// loaded pages.
    pub async fn set_filter(&mut self, value: &str) -> Result<()> {
        let filter = StatusFilter::parse(value, &self.config.statuses)?;
        if filter == self.filter && self.subscription.is_some() {
            debug!("Filter '{filter}' already active");
            return Ok(());
        }

        debug!("Filter changed from '{}' to '{filter}'", self.filter);
        self.filter = filter;
        self.boundary = None;
        if self.config.clear_on_filter_change {
            self.clear_records();
        } else {
            self.pending_reset = true;
        }

        self.subscribe().await
    }

    /// Load the next page after the last record of the most recent snapshot
    ///
    /// Fails with `NotReady` when no snapshot has arrived since the last
    /// (re)subscription. Does nothing when the last page was empty.
    pub async fn advance(&mut self) -> Result<()> {
        if self.last_page_size.is_none() {
            return Err(Error::NotReady);
        }
        let Some(cursor) = self.last_seen.take() else {
            debug!("No further pages after an empty snapshot");
            return Ok(());
        };

        debug!("Advancing boundary to {cursor}");
        self.boundary = Some(cursor);
        self.subscribe().await
    }

    /// Alias for `advance`
    pub async fn load_more(&mut self) -> Result<()> {
        self.advance().await
    }

    /// Wait for the next snapshot and reconcile it
    ///
    /// Returns `Ok(None)` when there is no open subscription or the backend
    /// closed it. A delivered failure is fatal to the subscription; the last
    /// good records stay available.
    pub async fn next_batch(&mut self) -> Result<Option<PagerView>> {
        let Some(subscription) = self.subscription.as_mut() else {
            return Ok(None);
        };

        let next = subscription.next_snapshot().await;
        match next {
            Some(Ok(snapshot)) => {
                self.apply(snapshot);
                Ok(Some(self.view()))
            }
            Some(Err(e)) => {
                let err = into_subscription_error(&self.config.collection, e);
                warn!("Live query failed: {err}");
                self.teardown();
                self.fail(&err);
                Err(err)
            }
            None => {
                debug!("Subscription closed by backend");
                self.subscription = None;
                self.is_loading = false;
                Ok(None)
            }
        }
    }

    /// Reconcile one snapshot into the list
    ///
    /// Modified records replace their entry in place; added records are
    /// appended in delivery order. Removals are not applied.
    pub fn apply(&mut self, snapshot: Snapshot) {
        if self.pending_reset {
            self.clear_records();
            self.pending_reset = false;
        }

        let mut added = Vec::new();
        let mut modified = Vec::new();
        for change in snapshot.changes {
            match change.kind {
                ChangeKind::Added => added.push(change.record),
                ChangeKind::Modified => modified.push(change.record),
                ChangeKind::Removed => {
                    debug!("Ignoring removal of '{}'", change.record.id);
                }
            }
        }

        for raw in modified {
            let Some(record) = self.present(raw) else {
                continue;
            };
            match self.index.get(&record.id) {
                Some(&pos) => self.records[pos] = record,
                None => warn!("Modified record '{}' is not in the list", record.id),
            }
        }

        let added: Vec<Record> = added.into_iter().filter_map(|r| self.present(r)).collect();
        if let Some(callback) = self.on_added.as_mut() {
            added.iter().for_each(|r| callback(r));
        }
        for record in added {
            self.upsert(record);
        }

        debug!(
            "Applied snapshot: {} records held, page size {}",
            self.records.len(),
            snapshot.size
        );
        self.last_seen = snapshot.last;
        self.last_page_size = Some(snapshot.size);
        self.is_loading = false;
        self.error = None;
    }

    /// Close the subscription; the list stays readable
    pub fn close(&mut self) {
        self.teardown();
        self.is_loading = false;
    }

    /// Records in arrival order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Whether the current subscription has not delivered yet
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// False once loading finished and the last fetched page was empty
    pub fn has_more(&self) -> bool {
        self.is_loading || self.last_page_size != Some(0)
    }

    /// Current filter
    pub fn filter(&self) -> &StatusFilter {
        &self.filter
    }

    /// Boundary the current subscription starts after
    pub fn boundary(&self) -> Option<&Cursor> {
        self.boundary.as_ref()
    }

    /// Last subscription failure
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Id of the open subscription
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.subscription.as_ref().map(Subscription::id)
    }

    /// Immutable snapshot of the exposed state
    pub fn view(&self) -> PagerView {
        PagerView {
            records: self.records.iter().cloned().collect(),
            filter: self.filter.clone(),
            is_loading: self.is_loading,
            has_more: self.has_more(),
            error: self.error.clone(),
        }
    }

    fn present(&self, raw: Record) -> Option<Record> {
        let id = raw.id.clone();
        match self.transform.apply(raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping record '{id}': {e}");
                None
            }
        }
    }

    fn upsert(&mut self, record: Record) {
        if let Some(&pos) = self.index.get(&record.id) {
            debug!("Record '{}' added twice, replacing", record.id);
            self.records[pos] = record;
        } else {
            self.index.insert(record.id.clone(), self.records.len());
            self.records.push(record);
        }
    }

    fn clear_records(&mut self) {
        self.records.clear();
        self.index.clear();
    }

    fn fail(&mut self, err: &Error) {
        self.is_loading = false;
        self.error = Some(err.to_string());
    }

    fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            debug!("Unsubscribing {}", subscription.id());
            self.backend.unsubscribe(subscription.id());
        }
    }
}

impl Drop for ChangeStreamPager {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for ChangeStreamPager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeStreamPager")
            .field("filter", &self.filter)
            .field("records", &self.records.len())
            .field("boundary", &self.boundary)
            .field("is_loading", &self.is_loading)
            .field("subscription", &self.subscription_id())
            .finish_non_exhaustive()
    }
}

fn into_subscription_error(collection: &str, err: Error) -> Error {
    match err {
        Error::Subscription { .. } => err,
        other => Error::subscription(collection, other.to_string()),
    }
}
