//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Live, paginated views over a document store
#[derive(Parser, Debug)]
#[command(name = "quota-pager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pager configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Fixture file seeding the in-memory store (JSON)
    #[arg(short, long, global = true)]
    pub fixture: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Walk the live submissions list
    Tasks {
        /// Status filter ("all" or one of the configured statuses)
        #[arg(long, default_value = "all")]
        filter: String,

        /// Number of pages to load
        #[arg(long, default_value = "1")]
        pages: usize,

        /// Extra equality constraint (field=value), repeatable
        #[arg(long = "where", value_parser = parse_condition)]
        conditions: Vec<(String, String)>,
    },

    /// Walk the progress pages of a user
    Progress {
        /// User whose totals are shown
        #[arg(short, long)]
        user: String,

        /// Moves after the initial page (forward/backward, comma-separated)
        #[arg(long, value_delimiter = ',')]
        moves: Vec<String>,
    },

    /// Validate the configuration and fixture
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

/// Parse a `field=value` constraint
fn parse_condition(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected field=value, got '{s}'")),
    }
}
