//! CLI module
//!
//! Command-line interface for walking the pagers over a fixture-seeded
//! in-memory store.
//!
//! # Commands
//!
//! - `tasks` - Load pages of the live submissions list
//! - `progress` - Move through the progress pages of a user
//! - `validate` - Check the configuration and fixture files

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
