//! Configuration types for the pagers
//!
//! All settings have defaults matching the hours-tracking deployment, so an
//! empty YAML document is a valid configuration.

use crate::error::{Error, Result};
use crate::types::Status;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete pager configuration loaded from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagerConfig {
    /// Live submissions list
    #[serde(default)]
    pub submissions: SubmissionsConfig,

    /// Per-category progress pages
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Display formatting for timestamps
    #[serde(default)]
    pub display: DisplayConfig,
}

impl PagerConfig {
    /// Parse a configuration from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                ))
            }
        })?;
        Self::from_yaml_str(&content)
    }

    /// Check the configuration for values the pagers cannot work with
    pub fn validate(&self) -> Result<()> {
        self.submissions.validate()?;
        self.progress.validate()?;
        self.display.validate()
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_config(field, "must not be empty"));
    }
    Ok(())
}

// ============================================================================
// Submissions
// ============================================================================

/// Settings for the live submissions list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionsConfig {
    /// Collection name
    #[serde(default = "default_submissions_collection")]
    pub collection: String,

    /// Timestamp field used for descending order
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,

    /// Status field used by the filter
    #[serde(default = "default_status_field")]
    pub status_field: String,

    /// Embedded reply sub-record
    #[serde(default = "default_reply_field")]
    pub reply_field: String,

    /// Records per "load more" step
    #[serde(default = "default_submissions_page_size")]
    pub page_size: usize,

    /// Recognized status values for filtering
    #[serde(default = "default_statuses")]
    pub statuses: Vec<String>,

    /// Clear the list as soon as the filter changes rather than when the
    /// first batch of the new filter arrives
    #[serde(default = "default_true")]
    pub clear_on_filter_change: bool,
}

impl Default for SubmissionsConfig {
    fn default() -> Self {
        Self {
            collection: default_submissions_collection(),
            timestamp_field: default_timestamp_field(),
            status_field: default_status_field(),
            reply_field: default_reply_field(),
            page_size: default_submissions_page_size(),
            statuses: default_statuses(),
            clear_on_filter_change: true,
        }
    }
}

impl SubmissionsConfig {
    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the collection name
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Set the filter-change policy
    #[must_use]
    pub fn with_clear_on_filter_change(mut self, clear: bool) -> Self {
        self.clear_on_filter_change = clear;
        self
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("submissions.collection", &self.collection)?;
        require_non_empty("submissions.timestamp_field", &self.timestamp_field)?;
        require_non_empty("submissions.status_field", &self.status_field)?;
        if self.page_size == 0 {
            return Err(Error::invalid_config(
                "submissions.page_size",
                "must be greater than zero",
            ));
        }
        if self.statuses.is_empty() {
            return Err(Error::invalid_config(
                "submissions.statuses",
                "at least one status is required",
            ));
        }
        if self.statuses.iter().any(|s| s == "all") {
            return Err(Error::invalid_config(
                "submissions.statuses",
                "'all' is reserved for the unfiltered view",
            ));
        }
        Ok(())
    }
}

fn default_submissions_collection() -> String {
    "tasks".to_string()
}

fn default_timestamp_field() -> String {
    "date".to_string()
}

fn default_status_field() -> String {
    "status".to_string()
}

fn default_reply_field() -> String {
    "reply".to_string()
}

fn default_submissions_page_size() -> usize {
    20
}

fn default_statuses() -> Vec<String> {
    Status::ALL.iter().map(|s| s.as_str().to_string()).collect()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Progress
// ============================================================================

/// Settings for the per-category progress pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Category collection
    #[serde(default = "default_progress_collection")]
    pub collection: String,

    /// Per-user aggregate sub-collection under each category
    #[serde(default = "default_aggregate_collection")]
    pub aggregate_collection: String,

    /// Numeric field of the aggregate document
    #[serde(default = "default_aggregate_field")]
    pub aggregate_field: String,

    /// Numeric quota field of the category
    #[serde(default = "default_limit_field")]
    pub limit_field: String,

    /// Records per page
    #[serde(default = "default_progress_page_size")]
    pub page_size: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            collection: default_progress_collection(),
            aggregate_collection: default_aggregate_collection(),
            aggregate_field: default_aggregate_field(),
            limit_field: default_limit_field(),
            page_size: default_progress_page_size(),
        }
    }
}

impl ProgressConfig {
    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("progress.collection", &self.collection)?;
        require_non_empty("progress.aggregate_collection", &self.aggregate_collection)?;
        require_non_empty("progress.aggregate_field", &self.aggregate_field)?;
        require_non_empty("progress.limit_field", &self.limit_field)?;
        if self.page_size == 0 {
            return Err(Error::invalid_config(
                "progress.page_size",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn default_progress_collection() -> String {
    "modalities".to_string()
}

fn default_aggregate_collection() -> String {
    "user_times".to_string()
}

fn default_aggregate_field() -> String {
    "total".to_string()
}

fn default_limit_field() -> String {
    "limit".to_string()
}

fn default_progress_page_size() -> usize {
    15
}

// ============================================================================
// Display
// ============================================================================

/// Timestamp display formats (chrono `strftime` syntax)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Date-only format
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Time-of-day format appended after the date
    #[serde(default = "default_time_format")]
    pub time_format: String,

    /// Offset from UTC in minutes used when rendering
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            time_format: default_time_format(),
            utc_offset_minutes: 0,
        }
    }
}

impl DisplayConfig {
    /// Set the UTC offset
    #[must_use]
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("display.date_format", &self.date_format)?;
        require_non_empty("display.time_format", &self.time_format)?;
        // chrono accepts offsets strictly inside one day
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(Error::invalid_config(
                "display.utc_offset_minutes",
                format!("{} is outside ±1439", self.utc_offset_minutes),
            ));
        }
        Ok(())
    }
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

fn default_time_format() -> String {
    "%H:%M".to_string()
}
