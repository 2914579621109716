// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # quota-pager
//!
//! Live, filtered, cursor-paginated views over a document database, built
//! for tracking students' extracurricular hours.
//!
//! ## Features
//!
//! - **Live submissions list**: a growable list fed by a live query, with a
//!   status filter and manual "load more" pagination
//! - **Progress pages**: fixed-size pages of categories, navigable forward
//!   and backward, each joined with the user's accumulated total
//! - **Pluggable backend**: any store implementing `QueryBackend` and
//!   `AggregateLookup`; an in-memory implementation ships with the crate
//! - **Presentation transform**: raw timestamps rendered as display strings
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use quota_pager::backend::MemoryBackend;
//! use quota_pager::live::ChangeStreamPager;
//! use quota_pager::{config::PagerConfig, Result};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let backend = MemoryBackend::new();
//!     let mut pager = ChangeStreamPager::new(Arc::new(backend), &PagerConfig::default())?;
//!
//!     pager.set_filter("Negado").await?;
//!     while let Some(view) = pager.next_batch().await? {
//!         println!("{} submissions", view.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────┐
//! │      ChangeStreamPager       │       BidirectionalPager         │
//! │  subscribe · advance         │  begin · execute · complete      │
//! │  set_filter · next_batch     │  move_to(forward | backward)     │
//! └──────────────┬───────────────┴────────────────┬─────────────────┘
//!                │                                │
//! ┌──────────────┴──────────┬─────────────────────┴─────────────────┐
//! │  PresentationTransform  │  Query (orderBy, limit, cursors, ...)  │
//! └─────────────────────────┴───────────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┴──────────────────────────────────┐
//! │        QueryBackend + AggregateLookup  (MemoryBackend)          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Query constraints, cursors and evaluation
pub mod query;

/// Query backend traits and the in-memory store
pub mod backend;

/// Configuration
pub mod config;

/// Timestamp display formatting
pub mod transform;

/// Live submissions list
pub mod live;

/// Per-category progress pages
pub mod progress;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use backend::{AggregateLookup, MemoryBackend, QueryBackend};
pub use config::PagerConfig;
pub use live::{ChangeStreamPager, PagerView};
pub use progress::{BidirectionalPager, Direction, EnrichedRecord};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
