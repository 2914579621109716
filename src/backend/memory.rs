//! In-memory backend implementation
//!
//! Holds collections in memory, evaluates queries with `Query::evaluate`
//! and pushes diffed snapshots to every open subscription on each write.

use super::types::{
    AggregateLookup, AggregatePath, ChangeEvent, Page, QueryBackend, Snapshot, Subscription,
    SubscriptionId,
};
use crate::error::{Error, Result};
use crate::query::Query;
use crate::types::{JsonObject, Record};
use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedSender};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// A live query held by the backend
struct LiveQuery {
    query: Query,
    sender: UnboundedSender<Result<Snapshot>>,
    /// Result set as of the last delivered snapshot
    current: Vec<Record>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Record>>,
    aggregates: HashMap<AggregatePath, Record>,
    live: BTreeMap<SubscriptionId, LiveQuery>,
    next_id: u64,
    subscribe_calls: usize,
    fetch_calls: usize,
}

/// In-memory document store with live subscriptions
///
/// Cloning shares the underlying store.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record, notifying subscriptions
    pub fn insert(&self, collection: &str, record: Record) {
        let mut inner = self.inner.lock();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(record.id.clone(), record);
        inner.notify(collection);
    }

    /// Insert several records, notifying subscriptions once
    pub fn insert_many(&self, collection: &str, records: impl IntoIterator<Item = Record>) {
        let mut inner = self.inner.lock();
        let docs = inner.collections.entry(collection.to_string()).or_default();
        for record in records {
            docs.insert(record.id.clone(), record);
        }
        inner.notify(collection);
    }

    /// Merge fields into an existing record, notifying subscriptions
    pub fn update(&self, collection: &str, id: &str, patch: JsonObject) -> Result<()> {
        let mut inner = self.inner.lock();
        let record = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| Error::backend(format!("No document {collection}/{id}")))?;
        record.fields.extend(patch);
        inner.notify(collection);
        Ok(())
    }

    /// Delete a record, notifying subscriptions
    pub fn remove(&self, collection: &str, id: &str) -> bool {
        let mut inner = self.inner.lock();
        let removed = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            inner.notify(collection);
        }
        removed
    }

    /// Get a record by id
    pub fn get(&self, collection: &str, id: &str) -> Option<Record> {
        let inner = self.inner.lock();
        inner.collections.get(collection)?.get(id).cloned()
    }

    /// Store an aggregate document
    pub fn set_aggregate(&self, path: AggregatePath, fields: JsonObject) {
        let record = Record::new(path.user_id.clone(), fields);
        self.inner.lock().aggregates.insert(path, record);
    }

    /// Deliver a transport failure to a subscription and close it
    pub fn fail_subscription(&self, id: SubscriptionId, message: impl Into<String>) -> bool {
        let mut inner = self.inner.lock();
        match inner.live.remove(&id) {
            Some(live) => {
                let err = Error::subscription(live.query.collection(), message);
                let _ = live.sender.unbounded_send(Err(err));
                true
            }
            None => false,
        }
    }

    /// Number of subscriptions still open on both ends
    pub fn active_subscriptions(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.live.retain(|_, live| !live.sender.is_closed());
        inner.live.len()
    }

    /// Ids of the open subscriptions
    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        let mut inner = self.inner.lock();
        inner.live.retain(|_, live| !live.sender.is_closed());
        inner.live.keys().copied().collect()
    }

    /// Total `subscribe` calls served
    pub fn subscribe_calls(&self) -> usize {
        self.inner.lock().subscribe_calls
    }

    /// Total `fetch_page` calls served
    pub fn fetch_calls(&self) -> usize {
        self.inner.lock().fetch_calls
    }
}

impl Inner {
    fn evaluate(&self, query: &Query) -> Vec<Record> {
        match self.collections.get(query.collection()) {
            Some(docs) => query.evaluate(docs.values()),
            None => Vec::new(),
        }
    }

    /// Diff every live query over `collection` and push the deltas
    fn notify(&mut self, collection: &str) {
        let ids: Vec<SubscriptionId> = self
            .live
            .iter()
            .filter(|(_, live)| live.query.collection() == collection)
            .map(|(id, _)| *id)
            .collect();

        for id in ids {
            let Some(query) = self.live.get(&id).map(|l| l.query.clone()) else {
                continue;
            };
            let next = self.evaluate(&query);
            let Some(live) = self.live.get_mut(&id) else {
                continue;
            };

            let changes = diff(&live.current, &next);
            if changes.is_empty() {
                continue;
            }

            let snapshot = Snapshot::new(&query, changes, &next);
            if live.sender.unbounded_send(Ok(snapshot)).is_err() {
                debug!("Dropping closed subscription {id}");
                self.live.remove(&id);
            } else {
                live.current = next;
            }
        }
    }
}

/// Compute the deltas between two result sets
///
/// Removals come first, then additions and modifications in the order of
/// the new result set.
fn diff(previous: &[Record], next: &[Record]) -> Vec<ChangeEvent> {
    let old: HashMap<&str, &Record> = previous.iter().map(|r| (r.id.as_str(), r)).collect();
    let new: HashMap<&str, &Record> = next.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut changes: Vec<ChangeEvent> = previous
        .iter()
        .filter(|r| !new.contains_key(r.id.as_str()))
        .map(|r| ChangeEvent::removed(r.clone()))
        .collect();

    for record in next {
        match old.get(record.id.as_str()) {
            None => changes.push(ChangeEvent::added(record.clone())),
            Some(prev) if *prev != record => changes.push(ChangeEvent::modified(record.clone())),
            Some(_) => {}
        }
    }

    changes
}

#[async_trait]
impl QueryBackend for MemoryBackend {
    async fn subscribe(&self, query: &Query) -> Result<Subscription> {
        let mut inner = self.inner.lock();
        inner.subscribe_calls += 1;
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);

        let (sender, receiver) = mpsc::unbounded();
        let initial = inner.evaluate(query);
        let changes = initial.iter().cloned().map(ChangeEvent::added).collect();
        let snapshot = Snapshot::new(query, changes, &initial);
        sender
            .unbounded_send(Ok(snapshot))
            .map_err(|e| Error::subscription(query.collection(), e.to_string()))?;

        debug!("Opened {id} for {query} ({} initial records)", initial.len());
        inner.live.insert(
            id,
            LiveQuery {
                query: query.clone(),
                sender,
                current: initial,
            },
        );

        Ok(Subscription::new(id, query.clone(), Box::pin(receiver)))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(live) = self.inner.lock().live.remove(&id) {
            live.sender.close_channel();
            debug!("Closed {id}");
        }
    }

    async fn fetch_page(&self, query: &Query) -> Result<Page> {
        let mut inner = self.inner.lock();
        inner.fetch_calls += 1;
        let records = inner.evaluate(query);
        debug!("Fetched {} records for {query}", records.len());
        Ok(Page::from_records(query, records))
    }
}

#[async_trait]
impl AggregateLookup for MemoryBackend {
    async fn lookup_aggregate(&self, path: &AggregatePath) -> Result<Option<Record>> {
        Ok(self.inner.lock().aggregates.get(path).cloned())
    }
}
