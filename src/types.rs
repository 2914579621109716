//! Common types used throughout quota-pager
//!
//! This module contains the record model, the document timestamp,
//! and the submission status vocabulary shared by both pagers.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Record
// ============================================================================

/// A single document of a tracked collection
///
/// Identity is the `id`. Two records with the same `id` are the same logical
/// entity regardless of their field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Document id, unique within its collection
    pub id: String,
    /// Domain fields, including embedded sub-records
    #[serde(flatten)]
    pub fields: JsonObject,
}

impl Record {
    /// Create a record from an id and a field map
    pub fn new(id: impl Into<String>, fields: JsonObject) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Create a record from a JSON object value
    pub fn from_value(id: impl Into<String>, value: JsonValue) -> Result<Self> {
        let id = id.into();
        match value {
            JsonValue::Object(fields) => Ok(Self { id, fields }),
            other => Err(Error::Other(format!(
                "Record '{id}' must be a JSON object, got {other}"
            ))),
        }
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field)
    }

    /// Set a field value, returning the previous one
    pub fn set(&mut self, field: impl Into<String>, value: JsonValue) -> Option<JsonValue> {
        self.fields.insert(field.into(), value)
    }

    /// Get a numeric field as f64
    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(JsonValue::as_f64)
    }

    /// Get a string field
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(JsonValue::as_str)
    }
}

// ============================================================================
// Timestamp
// ============================================================================

/// Raw document timestamp as stored by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since the Unix epoch
    pub seconds: i64,
    /// Sub-second nanoseconds
    #[serde(default)]
    pub nanoseconds: u32,
}

impl Timestamp {
    /// Create a timestamp
    pub fn new(seconds: i64, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    /// Convert from a chrono datetime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanoseconds: dt.timestamp_subsec_nanos(),
        }
    }

    /// Convert to a chrono datetime
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanoseconds)
    }

    /// Read a timestamp from its JSON representation
    ///
    /// Only the raw `{seconds, nanoseconds}` object is accepted; formatted
    /// strings are not timestamps.
    pub fn from_value(value: &JsonValue) -> Option<Self> {
        let map = value.as_object()?;
        if !map.contains_key("seconds") {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Convert to its JSON representation
    pub fn to_value(self) -> JsonValue {
        serde_json::json!({
            "seconds": self.seconds,
            "nanoseconds": self.nanoseconds,
        })
    }
}

// ============================================================================
// Submission Status
// ============================================================================

/// Review status of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Awaiting review
    #[serde(rename = "Em Análise")]
    InReview,
    /// Rejected by a reviewer
    #[serde(rename = "Negado")]
    Denied,
    /// Accepted and counted towards the quota
    #[serde(rename = "Validada")]
    Validated,
}

impl Status {
    /// Every status, in review order
    pub const ALL: [Status; 3] = [Status::InReview, Status::Denied, Status::Validated];

    /// Stored string value
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::InReview => "Em Análise",
            Status::Denied => "Negado",
            Status::Validated => "Validada",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Status Filter
// ============================================================================

/// Filter applied to the submissions list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// No status constraint
    #[default]
    All,
    /// Only submissions whose status equals this value
    Only(String),
}

impl StatusFilter {
    /// Sentinel value meaning "no filter"
    pub const ALL_SENTINEL: &'static str = "all";

    /// Parse a filter value against the recognized statuses
    pub fn parse(value: &str, allowed: &[String]) -> Result<Self> {
        if value == Self::ALL_SENTINEL {
            return Ok(Self::All);
        }
        if allowed.iter().any(|s| s == value) {
            Ok(Self::Only(value.to_string()))
        } else {
            Err(Error::invalid_filter(value, allowed))
        }
    }

    /// Get the status value, if filtering
    pub fn status(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Only(status) => Some(status),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(Self::ALL_SENTINEL),
            Self::Only(status) => f.write_str(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn statuses() -> Vec<String> {
        Status::ALL.iter().map(|s| s.as_str().to_string()).collect()
    }

    #[test]
    fn test_record_from_value() {
        let record = Record::from_value("t1", json!({"status": "Negado", "hours": 4})).unwrap();
        assert_eq!(record.id, "t1");
        assert_eq!(record.get_str("status"), Some("Negado"));
        assert_eq!(record.get_f64("hours"), Some(4.0));

        assert!(Record::from_value("t2", json!([1, 2])).is_err());
    }

    #[test]
    fn test_record_serialization_flattens_fields() {
        let record = Record::from_value("t1", json!({"status": "Negado"})).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"id": "t1", "status": "Negado"}));

        let restored: Record = serde_json::from_value(value).unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn test_timestamp_from_value() {
        let ts = Timestamp::from_value(&json!({"seconds": 1_700_000_000, "nanoseconds": 5}));
        assert_eq!(ts, Some(Timestamp::new(1_700_000_000, 5)));

        assert!(Timestamp::from_value(&json!("14/11/2023")).is_none());
        assert!(Timestamp::from_value(&json!({"nanoseconds": 1})).is_none());
        assert!(Timestamp::from_value(&json!(1_700_000_000)).is_none());
    }

    #[test]
    fn test_timestamp_datetime_conversion() {
        let ts = Timestamp::new(0, 0);
        let dt = ts.to_datetime().unwrap();
        assert_eq!(dt.to_rfc3339(), "1970-01-01T00:00:00+00:00");
        assert_eq!(Timestamp::from_datetime(dt), ts);
    }

    #[test]
    fn test_timestamp_ordering() {
        assert!(Timestamp::new(10, 0) < Timestamp::new(10, 1));
        assert!(Timestamp::new(9, 999) < Timestamp::new(10, 0));
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_value(Status::InReview).unwrap(),
            json!("Em Análise")
        );
        let status: Status = serde_json::from_value(json!("Validada")).unwrap();
        assert_eq!(status, Status::Validated);
        assert_eq!(Status::Denied.to_string(), "Negado");
    }

    #[test]
    fn test_status_filter_parse() {
        let allowed = statuses();
        assert_eq!(StatusFilter::parse("all", &allowed).unwrap(), StatusFilter::All);
        assert_eq!(
            StatusFilter::parse("Negado", &allowed).unwrap(),
            StatusFilter::Only("Negado".to_string())
        );

        let err = StatusFilter::parse("bogus", &allowed).unwrap_err();
        assert!(matches!(err, Error::InvalidFilter { .. }));
        // Case matters
        assert!(StatusFilter::parse("negado", &allowed).is_err());
        assert!(StatusFilter::parse("ALL", &allowed).is_err());
    }

    #[test]
    fn test_status_filter_display() {
        assert_eq!(StatusFilter::All.to_string(), "all");
        assert_eq!(StatusFilter::Only("Negado".into()).status(), Some("Negado"));
        assert_eq!(StatusFilter::All.status(), None);
    }
}
