//! Tests for the live submissions list

use super::*;
use crate::backend::{ChangeEvent, MemoryBackend, Page, QueryBackend, Snapshot, Subscription};
use crate::config::PagerConfig;
use crate::error::{Error, Result};
use crate::query::{Constraint, Query};
use crate::types::Record;
use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

fn task(id: &str, seconds: i64, status: &str) -> Record {
    Record::from_value(
        id,
        json!({
            "description": format!("submission {id}"),
            "status": status,
            "authorID": "u1",
            "date": {"seconds": seconds, "nanoseconds": 0},
        }),
    )
    .unwrap()
}

/// Tasks t01..tNN, newer ids have later dates, even ids are "Negado"
fn seeded(n: i64) -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend.insert_many(
        "tasks",
        (1..=n).map(|i| {
            let status = if i % 2 == 0 { "Negado" } else { "Em Análise" };
            task(&format!("t{i:02}"), 1000 + i, status)
        }),
    );
    backend
}

fn config(page_size: usize) -> PagerConfig {
    let mut config = PagerConfig::default();
    config.submissions.page_size = page_size;
    config
}

fn pager(backend: &MemoryBackend, page_size: usize) -> ChangeStreamPager {
    ChangeStreamPager::new(Arc::new(backend.clone()), &config(page_size)).unwrap()
}

fn ids(pager: &ChangeStreamPager) -> Vec<&str> {
    pager.records().iter().map(|r| r.id.as_str()).collect()
}

async fn mounted(backend: &MemoryBackend, page_size: usize) -> ChangeStreamPager {
    let mut pager = pager(backend, page_size);
    pager.subscribe().await.unwrap();
    pager.next_batch().await.unwrap().unwrap();
    pager
}

struct UnavailableBackend;

#[async_trait]
impl QueryBackend for UnavailableBackend {
    async fn subscribe(&self, _query: &Query) -> Result<Subscription> {
        Err(Error::backend("unavailable"))
    }

    fn unsubscribe(&self, _id: crate::backend::SubscriptionId) {}

    async fn fetch_page(&self, _query: &Query) -> Result<Page> {
        Err(Error::backend("unavailable"))
    }
}

// ============================================================================
// Query Construction Tests
// ============================================================================

#[test]
fn test_query_defaults() {
    let backend = MemoryBackend::new();
    let pager = ChangeStreamPager::new(Arc::new(backend), &PagerConfig::default()).unwrap();
    assert_eq!(
        pager.query().to_string(),
        "tasks: orderBy(date, desc), limit(20)"
    );
}

#[tokio::test]
async fn test_query_appends_caller_constraints_last() {
    let backend = seeded(5);
    let mut pager = pager(&backend, 3).with_constraints(vec![Constraint::where_eq("authorID", "u1")]);
    pager.subscribe().await.unwrap();
    pager.next_batch().await.unwrap();
    pager.advance().await.unwrap();
    pager.set_filter("Negado").await.unwrap();
    pager.next_batch().await.unwrap();
    pager.advance().await.unwrap();

    assert_eq!(
        pager.query().to_string(),
        "tasks: orderBy(date, desc), limit(3), startAfter(@t02), \
         where(status == \"Negado\"), where(authorID == \"u1\")"
    );
}

#[test]
fn test_new_rejects_invalid_config() {
    let err = ChangeStreamPager::new(Arc::new(MemoryBackend::new()), &config(0)).unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { .. }));
}

// ============================================================================
// Initial Load Tests
// ============================================================================

#[tokio::test]
async fn test_initial_batch_is_transformed_and_ordered() {
    let backend = seeded(5);
    let mut pager = pager(&backend, 3);
    pager.subscribe().await.unwrap();
    assert!(pager.is_loading());
    assert!(pager.has_more());

    let view = pager.next_batch().await.unwrap().unwrap();
    assert_eq!(view.ids(), vec!["t05", "t04", "t03"]);
    assert!(!view.is_loading);
    assert!(view.has_more);
    assert!(view.error.is_none());
    assert_eq!(view.records[0].get_str("date"), Some("01/01/1970"));
}

#[tokio::test]
async fn test_empty_collection_has_no_more() {
    let backend = MemoryBackend::new();
    let pager = mounted(&backend, 3).await;
    assert!(pager.records().is_empty());
    assert!(!pager.has_more());
}

#[tokio::test]
async fn test_malformed_record_is_skipped() {
    let backend = seeded(2);
    let mut bad = task("bad", 0, "Negado");
    bad.set("date", json!("ontem"));
    backend.insert("tasks", bad);

    let pager = mounted(&backend, 3).await;
    assert_eq!(ids(&pager), vec!["t02", "t01"]);
}

// ============================================================================
// Pagination Tests
// ============================================================================

#[tokio::test]
async fn test_advance_before_first_snapshot_is_not_ready() {
    let backend = seeded(5);
    let mut pager = pager(&backend, 3);

    assert!(matches!(pager.advance().await, Err(Error::NotReady)));

    pager.subscribe().await.unwrap();
    assert!(matches!(pager.advance().await, Err(Error::NotReady)));
    assert_eq!(backend.subscribe_calls(), 1);
}

#[tokio::test]
async fn test_advance_appends_next_page() {
    let backend = seeded(7);
    let mut pager = mounted(&backend, 3).await;

    pager.advance().await.unwrap();
    assert!(pager.is_loading());
    assert!(pager.has_more());
    assert_eq!(pager.boundary().map(|c| c.id()), Some("t05"));
    // Accumulated list survives the re-subscription
    assert_eq!(ids(&pager), vec!["t07", "t06", "t05"]);

    pager.next_batch().await.unwrap();
    assert_eq!(ids(&pager), vec!["t07", "t06", "t05", "t04", "t03", "t02"]);
    assert_eq!(backend.active_subscriptions(), 1);
}

#[tokio::test]
async fn test_advance_twice_requests_later_cursors() {
    let backend = seeded(7);
    let mut pager = mounted(&backend, 3).await;

    pager.advance().await.unwrap();
    // A second advance before the new page arrives must not re-fetch
    assert!(matches!(pager.advance().await, Err(Error::NotReady)));
    pager.next_batch().await.unwrap();
    let first = pager.boundary().cloned().unwrap();

    pager.advance().await.unwrap();
    pager.next_batch().await.unwrap();
    let second = pager.boundary().cloned().unwrap();

    assert_eq!((first.id(), second.id()), ("t05", "t02"));
    let query = pager.query();
    let at_second = backend.get("tasks", second.id()).unwrap();
    assert_eq!(
        query.compare_to_cursor(&at_second, &first),
        std::cmp::Ordering::Greater
    );
    assert_eq!(ids(&pager), vec!["t07", "t06", "t05", "t04", "t03", "t02", "t01"]);
}

#[tokio::test]
async fn test_has_more_turns_false_after_empty_page() {
    let backend = seeded(3);
    let mut pager = mounted(&backend, 3).await;

    pager.advance().await.unwrap();
    pager.next_batch().await.unwrap();
    assert!(!pager.has_more());

    // Nothing after an empty page
    pager.advance().await.unwrap();
    assert_eq!(backend.subscribe_calls(), 2);
    assert_eq!(ids(&pager), vec!["t03", "t02", "t01"]);
}

// ============================================================================
// Reconciliation Tests
// ============================================================================

#[tokio::test]
async fn test_modified_replaces_in_place() {
    let backend = seeded(5);
    let mut pager = mounted(&backend, 3).await;

    let mut patch = serde_json::Map::new();
    patch.insert("status".into(), json!("Validada"));
    backend.update("tasks", "t04", patch).unwrap();

    let view = pager.next_batch().await.unwrap().unwrap();
    assert_eq!(view.ids(), vec!["t05", "t04", "t03"]);
    assert_eq!(view.records[1].get_str("status"), Some("Validada"));
    assert_eq!(view.records[1].get_str("date"), Some("01/01/1970"));
}

#[tokio::test]
async fn test_live_addition_is_appended_not_sorted() {
    let backend = seeded(5);
    let mut pager = mounted(&backend, 3).await;

    backend.insert("tasks", task("t09", 5000, "Negado"));
    pager.next_batch().await.unwrap();

    // t03 left the window but removals are not applied
    assert_eq!(ids(&pager), vec!["t05", "t04", "t03", "t09"]);
}

#[tokio::test]
async fn test_removal_is_ignored() {
    let backend = seeded(5);
    let mut pager = mounted(&backend, 3).await;

    backend.remove("tasks", "t04");
    pager.next_batch().await.unwrap();
    assert_eq!(ids(&pager), vec!["t05", "t04", "t03", "t02"]);
}

#[tokio::test]
async fn test_duplicate_added_replaces_existing_entry() {
    let backend = seeded(3);
    let mut pager = mounted(&backend, 3).await;

    let newer = task("t02", 1002, "Validada");
    pager.apply(Snapshot {
        changes: vec![ChangeEvent::added(newer)],
        size: 3,
        last: None,
    });

    assert_eq!(ids(&pager), vec!["t03", "t02", "t01"]);
    assert_eq!(pager.records()[1].get_str("status"), Some("Validada"));
}

#[tokio::test]
async fn test_modified_unknown_id_is_ignored() {
    let backend = seeded(3);
    let mut pager = mounted(&backend, 3).await;

    pager.apply(Snapshot {
        changes: vec![ChangeEvent::modified(task("zz", 1, "Negado"))],
        size: 3,
        last: None,
    });
    assert_eq!(ids(&pager), vec!["t03", "t02", "t01"]);
}

#[tokio::test]
async fn test_one_entry_per_id_with_latest_values() {
    let backend = seeded(6);
    let mut pager = mounted(&backend, 3).await;

    let mut patch = serde_json::Map::new();
    patch.insert("description".into(), json!("edited"));
    backend.update("tasks", "t05", patch.clone()).unwrap();
    pager.next_batch().await.unwrap();

    pager.advance().await.unwrap();
    pager.next_batch().await.unwrap();
    backend.update("tasks", "t02", patch).unwrap();
    pager.next_batch().await.unwrap();

    let mut seen = ids(&pager);
    assert_eq!(seen.len(), 6);
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 6);

    let edited: Vec<&str> = pager
        .records()
        .iter()
        .filter(|r| r.get_str("description") == Some("edited"))
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(edited, vec!["t05", "t02"]);
}

#[tokio::test]
async fn test_on_added_callback_sees_additions_only() {
    let backend = seeded(4);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut pager = pager(&backend, 3).with_on_added(move |r| sink.lock().push(r.id.clone()));
    pager.subscribe().await.unwrap();
    pager.next_batch().await.unwrap();
    assert_eq!(*seen.lock(), vec!["t04", "t03", "t02"]);

    let mut patch = serde_json::Map::new();
    patch.insert("status".into(), json!("Validada"));
    backend.update("tasks", "t03", patch).unwrap();
    pager.next_batch().await.unwrap();
    assert_eq!(seen.lock().len(), 3);

    backend.insert("tasks", task("t10", 9000, "Negado"));
    pager.next_batch().await.unwrap();
    assert_eq!(*seen.lock(), vec!["t04", "t03", "t02", "t10"]);
    // Callback receives the display form
    assert_eq!(pager.records()[3].get_str("date"), Some("01/01/1970"));
}

// ============================================================================
// Filter Tests
// ============================================================================

#[tokio::test]
async fn test_invalid_filter_leaves_state_untouched() {
    let backend = seeded(7);
    let mut pager = mounted(&backend, 3).await;
    pager.advance().await.unwrap();
    pager.next_batch().await.unwrap();

    let before = ids(&pager).into_iter().map(String::from).collect::<Vec<_>>();
    let boundary = pager.boundary().cloned();
    let subscription = pager.subscription_id();
    let calls = backend.subscribe_calls();

    let err = pager.set_filter("bogus").await.unwrap_err();
    assert!(matches!(err, Error::InvalidFilter { .. }));
    assert_eq!(ids(&pager), before);
    assert_eq!(pager.boundary().cloned(), boundary);
    assert_eq!(pager.subscription_id(), subscription);
    assert_eq!(backend.subscribe_calls(), calls);
    assert_eq!(pager.filter(), &crate::types::StatusFilter::All);
}

#[tokio::test]
async fn test_set_filter_clears_eagerly_and_resets_cursor() {
    let backend = seeded(7);
    let mut pager = mounted(&backend, 3).await;
    pager.advance().await.unwrap();
    pager.next_batch().await.unwrap();

    pager.set_filter("Negado").await.unwrap();
    assert!(pager.records().is_empty());
    assert!(pager.boundary().is_none());
    assert!(pager.is_loading());
    assert_eq!(backend.active_subscriptions(), 1);

    pager.next_batch().await.unwrap();
    assert_eq!(ids(&pager), vec!["t06", "t04", "t02"]);
    assert!(pager
        .records()
        .iter()
        .all(|r| r.get_str("status") == Some("Negado")));
}

#[tokio::test]
async fn test_reselecting_active_filter_keeps_pages() {
    let backend = seeded(6);
    let mut pager = mounted(&backend, 3).await;
    pager.advance().await.unwrap();
    pager.next_batch().await.unwrap();

    let boundary = pager.boundary().cloned();
    let subscription = pager.subscription_id();
    let calls = backend.subscribe_calls();

    pager.set_filter("all").await.unwrap();
    assert_eq!(ids(&pager), vec!["t06", "t05", "t04", "t03", "t02", "t01"]);
    assert_eq!(pager.boundary().cloned(), boundary);
    assert_eq!(pager.subscription_id(), subscription);
    assert_eq!(backend.subscribe_calls(), calls);

    // A different filter still starts over
    pager.set_filter("Negado").await.unwrap();
    pager.next_batch().await.unwrap();
    pager.set_filter("Negado").await.unwrap();
    assert_eq!(ids(&pager), vec!["t06", "t04", "t02"]);
    assert_eq!(backend.subscribe_calls(), calls + 1);
}

#[tokio::test]
async fn test_set_filter_resubscribes_after_close() {
    let backend = seeded(3);
    let mut pager = mounted(&backend, 3).await;
    pager.close();

    pager.set_filter("all").await.unwrap();
    assert!(pager.subscription_id().is_some());
    assert_eq!(backend.subscribe_calls(), 2);
}

#[tokio::test]
async fn test_set_filter_deferred_replacement() {
    let backend = seeded(5);
    let mut config = config(3);
    config.submissions.clear_on_filter_change = false;
    let mut pager = ChangeStreamPager::new(Arc::new(backend.clone()), &config).unwrap();
    pager.subscribe().await.unwrap();
    pager.next_batch().await.unwrap();

    pager.set_filter("Em Análise").await.unwrap();
    // Old records stay visible until the new filter delivers
    assert_eq!(ids(&pager), vec!["t05", "t04", "t03"]);

    pager.next_batch().await.unwrap();
    assert_eq!(ids(&pager), vec!["t05", "t03", "t01"]);

    pager.set_filter("all").await.unwrap();
    pager.next_batch().await.unwrap();
    assert_eq!(ids(&pager), vec!["t05", "t04", "t03"]);
}

// ============================================================================
// Failure and Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_subscription_failure_keeps_last_good_data() {
    let backend = seeded(3);
    let mut pager = mounted(&backend, 3).await;

    let id = pager.subscription_id().unwrap();
    assert!(backend.fail_subscription(id, "permission denied"));

    let err = pager.next_batch().await.unwrap_err();
    assert!(matches!(err, Error::Subscription { .. }));
    assert_eq!(ids(&pager), vec!["t03", "t02", "t01"]);
    assert!(pager.subscription_id().is_none());

    let view = pager.view();
    assert!(view.error.unwrap().contains("permission denied"));
    assert_eq!(view.records.len(), 3);

    assert!(pager.next_batch().await.unwrap().is_none());
}

#[tokio::test]
async fn test_subscribe_failure_is_subscription_error() {
    let mut pager =
        ChangeStreamPager::new(Arc::new(UnavailableBackend), &PagerConfig::default()).unwrap();

    let err = pager.subscribe().await.unwrap_err();
    assert!(matches!(err, Error::Subscription { ref collection, .. } if collection == "tasks"));
    assert!(!pager.is_loading());
    assert!(pager.error().unwrap().contains("unavailable"));
}

#[tokio::test]
async fn test_resubscribe_closes_previous_subscription() {
    let backend = seeded(5);
    let mut pager = mounted(&backend, 3).await;
    let first = pager.subscription_id().unwrap();

    pager.subscribe().await.unwrap();
    let second = pager.subscription_id().unwrap();

    assert_ne!(first, second);
    assert_eq!(backend.subscription_ids(), vec![second]);
}

#[tokio::test]
async fn test_close_and_drop_unsubscribe() {
    let backend = seeded(3);
    let mut pager = mounted(&backend, 3).await;
    pager.close();
    assert_eq!(backend.active_subscriptions(), 0);
    assert_eq!(pager.records().len(), 3);
    assert!(pager.next_batch().await.unwrap().is_none());

    {
        let _pager = mounted(&backend, 3).await;
        assert_eq!(backend.active_subscriptions(), 1);
    }
    assert_eq!(backend.active_subscriptions(), 0);
}
