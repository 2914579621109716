//! Query backend module
//!
//! The document database the pagers read from, abstracted behind traits.
//!
//! # Overview
//!
//! The backend module provides:
//! - `QueryBackend` - one-shot page fetches and live subscriptions
//! - `AggregateLookup` - per-item, per-user sub-document reads
//! - `MemoryBackend` - an in-memory implementation of both, with live
//!   change propagation to open subscriptions
//! - `Fixture` - JSON seed data for a `MemoryBackend`

mod fixture;
mod memory;
mod types;

pub use fixture::{AggregateEntry, Fixture};
pub use memory::MemoryBackend;
pub use types::{
    AggregateLookup, AggregatePath, ChangeEvent, ChangeKind, Page, QueryBackend, Snapshot,
    SnapshotStream, Subscription, SubscriptionId,
};
