//! Per-category progress pages
//!
//! One fixed-size page of categories at a time, each joined with the
//! current user's accumulated total, navigable forward and backward.
//!
//! # Overview
//!
//! The progress module provides:
//! - `BidirectionalPager` - holds the displayed page and its cursors
//! - `PageRequest` / `PageLoad` - an in-flight load and its uncommitted result
//! - `EnrichedRecord` - a category with its aggregate value and progress
//!
//! Rows are shown sorted by aggregate value, while the stored cursors keep
//! following the fetch order so that navigation stays consistent.

mod pager;
mod types;

pub use pager::{BidirectionalPager, PageRequest};
pub use types::{Direction, EnrichedRecord, PageBounds, PageLoad};
