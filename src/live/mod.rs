//! Live submissions list
//!
//! A growable list of records fed by a live subscription, with manual
//! "load more" pagination on top of real-time updates.
//!
//! # Overview
//!
//! The live module provides:
//! - `ChangeStreamPager` - owns the subscription and the reconciled list
//! - `PagerView` - immutable view of the list produced after each batch
//!
//! The list is kept in arrival order and never re-sorted. Advancing the
//! cursor keeps the accumulated list; changing the filter replaces it.

mod pager;
mod types;

pub use pager::{AddedCallback, ChangeStreamPager};
pub use types::PagerView;

#[cfg(test)]
mod tests;
