//! Presentation transform for submission records
//!
//! Replaces raw document timestamps with display strings: the record's own
//! timestamp as a date, the embedded reply's timestamp as date and time.
//! The output is lossy and is not accepted as input again.

use crate::config::{DisplayConfig, PagerConfig, SubmissionsConfig};
use crate::error::{Error, Result};
use crate::types::{JsonValue, Record, Timestamp};
use chrono::{FixedOffset, Offset, Utc};

/// Formats timestamp fields of newly added records
#[derive(Debug, Clone)]
pub struct PresentationTransform {
    date_format: String,
    datetime_format: String,
    offset: FixedOffset,
    timestamp_field: String,
    reply_field: String,
}

impl PresentationTransform {
    /// Build a transform from display and submissions settings
    pub fn new(display: &DisplayConfig, submissions: &SubmissionsConfig) -> Result<Self> {
        let offset = FixedOffset::east_opt(display.utc_offset_minutes * 60).ok_or_else(|| {
            Error::invalid_config(
                "display.utc_offset_minutes",
                format!("{} is out of range", display.utc_offset_minutes),
            )
        })?;

        Ok(Self {
            date_format: display.date_format.clone(),
            datetime_format: format!("{} {}", display.date_format, display.time_format),
            offset,
            timestamp_field: submissions.timestamp_field.clone(),
            reply_field: submissions.reply_field.clone(),
        })
    }

    /// Build a transform from a full configuration
    pub fn from_config(config: &PagerConfig) -> Result<Self> {
        Self::new(&config.display, &config.submissions)
    }

    /// Render a timestamp
    pub fn format(&self, timestamp: Timestamp, with_time: bool) -> Result<String> {
        let dt = timestamp.to_datetime().ok_or_else(|| {
            Error::transform(
                &self.timestamp_field,
                format!("timestamp {} is out of range", timestamp.seconds),
            )
        })?;
        let local = dt.with_timezone(&self.offset);
        let format = if with_time {
            &self.datetime_format
        } else {
            &self.date_format
        };
        Ok(local.format(format).to_string())
    }

    /// Transform a raw record for display
    pub fn apply(&self, mut record: Record) -> Result<Record> {
        let own = self.render_field(
            record.get(&self.timestamp_field),
            &self.timestamp_field,
            false,
        )?;
        record.set(self.timestamp_field.clone(), JsonValue::String(own));

        let reply_path = format!("{}.{}", self.reply_field, self.timestamp_field);
        match record.fields.get_mut(&self.reply_field) {
            None | Some(JsonValue::Null) => {}
            Some(JsonValue::Object(reply)) => {
                let rendered =
                    self.render_field(reply.get(&self.timestamp_field), &reply_path, true)?;
                reply.insert(self.timestamp_field.clone(), JsonValue::String(rendered));
            }
            Some(other) => {
                return Err(Error::transform(
                    &self.reply_field,
                    format!("expected an object, found {other}"),
                ));
            }
        }

        Ok(record)
    }

    fn render_field(
        &self,
        value: Option<&JsonValue>,
        path: &str,
        with_time: bool,
    ) -> Result<String> {
        let value = value.ok_or_else(|| Error::transform(path, "field is missing"))?;
        let timestamp = Timestamp::from_value(value).ok_or_else(|| {
            Error::transform(path, format!("expected a raw timestamp, found {value}"))
        })?;
        self.format(timestamp, with_time)
    }
}

impl Default for PresentationTransform {
    fn default() -> Self {
        Self {
            date_format: "%d/%m/%Y".to_string(),
            datetime_format: "%d/%m/%Y %H:%M".to_string(),
            offset: Utc.fix(),
            timestamp_field: "date".to_string(),
            reply_field: "reply".to_string(),
        }
    }
}
