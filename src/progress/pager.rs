//! Bidirectional pager implementation
//!
//! A page load is split in three steps so that a superseded load can be
//! recognized and dropped:
//! - `begin` validates the move and stamps a new generation
//! - `PageRequest::execute` fetches the page and its aggregates
//! - `complete` commits the result if its generation is still current

use super::types::{Direction, EnrichedRecord, PageBounds, PageLoad};
use crate::backend::{AggregateLookup, AggregatePath, QueryBackend};
use crate::config::{PagerConfig, ProgressConfig};
use crate::error::{Error, Result};
use crate::query::Query;
use crate::types::Record;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A validated page load waiting to be executed
#[derive(Debug, Clone)]
pub struct PageRequest {
    generation: u64,
    direction: Direction,
    query: Query,
    user_id: String,
    config: ProgressConfig,
}

impl PageRequest {
    /// Generation stamped by `begin`
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Direction of the move
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Query the page is fetched with
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Fetch the page and look up the user's aggregate for each record
    ///
    /// Lookups run one at a time in fetch order. A failed lookup leaves the
    /// row with zero values and is reported in `PageLoad::failed`.
    pub async fn execute(
        &self,
        backend: &dyn QueryBackend,
        lookup: &dyn AggregateLookup,
    ) -> Result<PageLoad> {
        let page = backend.fetch_page(&self.query).await?;
        debug!(
            "Fetched {} {} records for {}",
            page.records.len(),
            self.direction,
            self.query
        );

        let mut rows = Vec::with_capacity(page.records.len());
        let mut failed = Vec::new();
        for (position, record) in page.records.into_iter().enumerate() {
            let path = AggregatePath::new(
                &self.config.collection,
                &record.id,
                &self.config.aggregate_collection,
                &self.user_id,
            );
            let value = match lookup.lookup_aggregate(&path).await {
                Ok(Some(doc)) => self.aggregate_value(&doc),
                Ok(None) => 0.0,
                Err(e) => {
                    warn!("Aggregate lookup failed for {path}: {e}");
                    failed.push(record.id.clone());
                    0.0
                }
            };
            let progress = self.progress(&record, value);
            rows.push(EnrichedRecord::new(position, record, value, progress));
        }

        rows.sort_by(|a, b| b.aggregate_value.total_cmp(&a.aggregate_value));

        Ok(PageLoad {
            generation: self.generation,
            direction: self.direction,
            rows,
            bounds: PageBounds {
                first: page.first,
                last: page.last,
            },
            failed,
        })
    }

    fn aggregate_value(&self, doc: &Record) -> f64 {
        doc.get_f64(&self.config.aggregate_field).unwrap_or_else(|| {
            debug!(
                "Aggregate '{}' has no numeric '{}'",
                doc.id, self.config.aggregate_field
            );
            0.0
        })
    }

    fn progress(&self, record: &Record, value: f64) -> u32 {
        match record.get_f64(&self.config.limit_field) {
            Some(limit) if limit > 0.0 => (value / limit * 100.0).floor() as u32,
            _ => {
                if value > 0.0 {
                    warn!(
                        "Record '{}' has no positive '{}', progress set to 0",
                        record.id, self.config.limit_field
                    );
                }
                0
            }
        }
    }
}

/// One fixed-size page of a reference collection, navigable both ways
pub struct BidirectionalPager {
    /// Shared backend connection
    backend: Arc<dyn QueryBackend>,
    /// Aggregate source
    lookup: Arc<dyn AggregateLookup>,
    /// User whose aggregates are attached
    user_id: String,
    /// Collection and paging settings
    config: ProgressConfig,

    /// Incremented by every `begin`
    generation: u64,
    /// Displayed page; `None` until the first load completes
    page: Option<Vec<EnrichedRecord>>,
    /// Cursors of the displayed page
    bounds: PageBounds,
    /// Direction of the move that produced the displayed page
    direction: Direction,
    /// Load held back because some lookups failed
    partial: Option<PageLoad>,
    /// Last load failure
    error: Option<String>,
}

impl BidirectionalPager {
    /// Create a pager for `user_id`; nothing is fetched until a page is loaded
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        lookup: Arc<dyn AggregateLookup>,
        user_id: impl Into<String>,
        config: &PagerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(Error::invalid_config("user_id", "must not be empty"));
        }
        Ok(Self {
            backend,
            lookup,
            user_id,
            config: config.progress.clone(),
            generation: 0,
            page: None,
            bounds: PageBounds::default(),
            direction: Direction::Initial,
            partial: None,
            error: None,
        })
    }

    /// Validate a move and build its request
    ///
    /// Fails with `NoPriorPage` when the move needs a boundary that is not
    /// stored; nothing changes in that case.
    pub fn begin(&mut self, direction: Direction) -> Result<PageRequest> {
        let n = self.config.page_size;
        let base = Query::new(&self.config.collection);
        let query = match (direction, self.bounds.boundary(direction).cloned()) {
            (Direction::Initial, _) => base.limit(n),
            (Direction::Forward, Some(last)) => base.start_after(last).limit(n),
            (Direction::Backward, Some(first)) => base.end_before(first).limit_to_last(n),
            (_, None) => return Err(Error::no_prior_page(direction)),
        };

        self.generation += 1;
        self.partial = None;
        debug!("Page request {} ({direction}): {query}", self.generation);

        Ok(PageRequest {
            generation: self.generation,
            direction,
            query,
            user_id: self.user_id.clone(),
            config: self.config.clone(),
        })
    }

    /// Commit an executed load
    ///
    /// Returns `Ok(true)` when the displayed page changed. A load from a
    /// superseded request, or an empty forward/backward page, is dropped
    /// with `Ok(false)`. When lookups failed the load is held in `partial`
    /// and `PartialPage` is returned.
    pub fn complete(&mut self, load: PageLoad) -> Result<bool> {
        if load.generation != self.generation {
            debug!(
                "Discarding stale page {} (current {})",
                load.generation, self.generation
            );
            return Ok(false);
        }

        if load.rows.is_empty() && load.direction != Direction::Initial {
            debug!("No records {}, keeping the current page", load.direction);
            return Ok(false);
        }

        if !load.is_complete() {
            let err = Error::PartialPage {
                failed: load.failed.clone(),
            };
            self.error = Some(err.to_string());
            self.partial = Some(load);
            return Err(err);
        }

        self.commit(load);
        Ok(true)
    }

    /// Display the held partial page, with zero values for failed rows
    pub fn accept_partial(&mut self) -> bool {
        match self.partial.take() {
            Some(load) if load.generation == self.generation => {
                self.commit(load);
                true
            }
            _ => false,
        }
    }

    /// Load a page in `direction`
    pub async fn load_page(&mut self, direction: Direction) -> Result<bool> {
        let request = self.begin(direction)?;
        let load = match request
            .execute(self.backend.as_ref(), self.lookup.as_ref())
            .await
        {
            Ok(load) => load,
            Err(e) => {
                warn!("Page load failed: {e}");
                self.error = Some(e.to_string());
                return Err(e);
            }
        };
        self.complete(load)
    }

    /// Move to the neighbouring page using the stored cursors
    pub async fn move_to(&mut self, direction: Direction) -> Result<bool> {
        self.load_page(direction).await
    }

    /// Displayed page, sorted by aggregate value descending
    pub fn records(&self) -> Option<&[EnrichedRecord]> {
        self.page.as_deref()
    }

    /// Cursors of the displayed page
    pub fn bounds(&self) -> &PageBounds {
        &self.bounds
    }

    /// Direction of the move that produced the displayed page
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Generation of the most recent request
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last load failure
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Page held back by a partial failure
    pub fn partial(&self) -> Option<&PageLoad> {
        self.partial.as_ref()
    }

    /// User whose aggregates are attached
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn commit(&mut self, load: PageLoad) {
        info!(
            "Showing {} {} records (generation {})",
            load.rows.len(),
            load.direction,
            load.generation
        );
        self.direction = load.direction;
        self.bounds = load.bounds;
        self.page = Some(load.rows);
        self.error = None;
    }
}

impl fmt::Debug for BidirectionalPager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BidirectionalPager")
            .field("user_id", &self.user_id)
            .field("generation", &self.generation)
            .field("direction", &self.direction)
            .field("records", &self.page.as_ref().map(Vec::len))
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}
