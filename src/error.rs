//! Error types for quota-pager
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for quota-pager
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Input Validation Errors
    // ============================================================================
    #[error("Invalid filter '{value}': expected 'all' or one of [{allowed}]")]
    InvalidFilter { value: String, allowed: String },

    #[error("Cannot load more: no snapshot has been received for the current query")]
    NotReady,

    #[error("Cannot move {direction}: no page boundary is stored")]
    NoPriorPage { direction: String },

    // ============================================================================
    // Backend Errors
    // ============================================================================
    #[error("Subscription to '{collection}' failed: {message}")]
    Subscription { collection: String, message: String },

    #[error("Backend error: {message}")]
    Backend { message: String },

    /// Raised by `AggregateLookup` implementations on transport or permission failures
    #[error("Aggregate lookup failed for '{item_id}': {message}")]
    AggregateLookup { item_id: String, message: String },

    #[error("Page partially loaded: aggregate lookup failed for [{}]", failed.join(", "))]
    PartialPage { failed: Vec<String> },

    // ============================================================================
    // Presentation Errors
    // ============================================================================
    #[error("Cannot format field '{field}': {message}")]
    Transform { field: String, message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid filter error
    pub fn invalid_filter(value: impl Into<String>, allowed: &[String]) -> Self {
        Self::InvalidFilter {
            value: value.into(),
            allowed: allowed.join(", "),
        }
    }

    /// Create a no prior page error
    pub fn no_prior_page(direction: impl std::fmt::Display) -> Self {
        Self::NoPriorPage {
            direction: direction.to_string(),
        }
    }

    /// Create a subscription error
    pub fn subscription(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Subscription {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create an aggregate lookup error, for `AggregateLookup` implementors
    pub fn aggregate_lookup(item_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AggregateLookup {
            item_id: item_id.into(),
            message: message.into(),
        }
    }

    /// Create a transform error
    pub fn transform(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Transport failures may succeed on a fresh attempt; validation and
    /// programming errors never will.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Subscription { .. }
                | Error::Backend { .. }
                | Error::AggregateLookup { .. }
                | Error::PartialPage { .. }
        )
    }

    /// Check if this error was raised before any backend interaction
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidFilter { .. } | Error::NotReady | Error::NoPriorPage { .. }
        )
    }
}

/// Result type alias for quota-pager
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::invalid_filter("bogus", &["Negado".to_string(), "Validada".to_string()]);
        assert_eq!(
            err.to_string(),
            "Invalid filter 'bogus': expected 'all' or one of [Negado, Validada]"
        );

        let err = Error::PartialPage {
            failed: vec!["m1".to_string(), "m3".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Page partially loaded: aggregate lookup failed for [m1, m3]"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::subscription("tasks", "connection reset").is_retryable());
        assert!(Error::backend("unavailable").is_retryable());
        assert!(Error::PartialPage { failed: vec![] }.is_retryable());

        assert!(!Error::NotReady.is_retryable());
        assert!(!Error::no_prior_page("backward").is_retryable());
        assert!(!Error::invalid_filter("x", &[]).is_retryable());
        assert!(!Error::config("test").is_retryable());
    }

    #[test]
    fn test_is_validation() {
        assert!(Error::NotReady.is_validation());
        assert!(Error::no_prior_page("forward").is_validation());
        assert!(!Error::backend("down").is_validation());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
