//! Query module
//!
//! Supports: orderBy, limit, limitToLast, startAfter, endBefore, whereEquals
//!
//! # Overview
//!
//! A `Query` is a collection name plus an ordered list of constraints. Any
//! backend can interpret it; `Query::evaluate` is the reference evaluation
//! used by the in-memory backend. Cursors are opaque positions produced by
//! `Query::cursor_for` and are only meaningful under the ordering that
//! produced them.

mod compare;
mod types;

pub use compare::compare_values;
pub use types::{Constraint, Cursor, PageLimit, Query, SortDirection};
