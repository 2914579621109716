//! CLI runner - executes commands

use crate::backend::Fixture;
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::PagerConfig;
use crate::error::{Error, Result, ResultExt};
use crate::live::ChangeStreamPager;
use crate::progress::{BidirectionalPager, Direction};
use crate::query::Constraint;
use crate::types::JsonValue;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Tasks {
                filter,
                pages,
                conditions,
            } => self.tasks(filter, *pages, conditions).await,
            Commands::Progress { user, moves } => self.progress(user, moves).await,
            Commands::Validate => self.validate(),
        }
    }

    /// Load the pager configuration, or the defaults when none is given
    fn load_config(&self) -> Result<PagerConfig> {
        match &self.cli.config {
            Some(path) => PagerConfig::from_file(path),
            None => Ok(PagerConfig::default()),
        }
    }

    /// Load the fixture, or an empty one when none is given
    fn load_fixture(&self) -> Result<Fixture> {
        match &self.cli.fixture {
            Some(path) => Fixture::from_file(path)
                .with_context(|| format!("Failed to load fixture '{}'", path.display())),
            None => {
                warn!("No fixture given (use -f), the store is empty");
                Ok(Fixture::default())
            }
        }
    }

    /// Walk the submissions list page by page
    async fn tasks(
        &self,
        filter: &str,
        pages: usize,
        conditions: &[(String, String)],
    ) -> Result<()> {
        let config = self.load_config()?;
        let backend = self.load_fixture()?.into_backend();

        let constraints = conditions
            .iter()
            .map(|(field, value)| Constraint::where_eq(field, parse_value(value)));
        let mut pager =
            ChangeStreamPager::new(Arc::new(backend), &config)?.with_constraints(constraints);

        pager.set_filter(filter).await?;
        info!("Listing {}", pager.query());

        for page in 1..=pages {
            let Some(view) = pager.next_batch().await? else {
                break;
            };
            self.output_message(&json!({
                "type": "PAGE",
                "page": page,
                "view": view,
            }));

            if !view.has_more || page == pages {
                break;
            }
            pager.advance().await?;
        }

        pager.close();
        Ok(())
    }

    /// Walk the progress pages of one user
    async fn progress(&self, user: &str, moves: &[String]) -> Result<()> {
        let config = self.load_config()?;
        let backend = self.load_fixture()?.into_backend();
        let mut pager = BidirectionalPager::new(
            Arc::new(backend.clone()),
            Arc::new(backend),
            user,
            &config,
        )?;

        let directions = std::iter::once(Ok(Direction::Initial))
            .chain(
                moves
                    .iter()
                    .map(|m| m.parse::<Direction>().context("Invalid --moves entry")),
            )
            .collect::<Result<Vec<_>>>()?;

        for direction in directions {
            let changed = match pager.move_to(direction).await {
                Ok(changed) => changed,
                Err(e @ Error::NoPriorPage { .. }) => {
                    self.output_message(&json!({
                        "type": "ERROR",
                        "direction": direction,
                        "message": e.to_string(),
                    }));
                    continue;
                }
                Err(Error::PartialPage { failed }) => {
                    warn!("Showing partial page, lookups failed for {failed:?}");
                    pager.accept_partial()
                }
                Err(e) => return Err(e),
            };

            self.output_message(&json!({
                "type": "PROGRESS",
                "direction": direction,
                "changed": changed,
                "records": pager.records(),
            }));
        }
        Ok(())
    }

    /// Validate the configuration and fixture
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        let fixture = self.load_fixture()?;

        let collections: Vec<Value> = fixture
            .collections
            .iter()
            .map(|(name, records)| json!({"name": name, "records": records.len()}))
            .collect();
        self.output_message(&json!({
            "type": "VALIDATE",
            "status": "OK",
            "submissions": config.submissions.collection,
            "progress": config.progress.collection,
            "collections": collections,
            "aggregates": fixture.aggregates.len(),
        }));
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Interpret a command-line value as JSON, falling back to a plain string
fn parse_value(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}
