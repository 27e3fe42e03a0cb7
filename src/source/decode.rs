//! Decoding of raw JSON into typed log records.
//!
//! Every array element is decoded on its own; the malformed-record policy
//! decides whether a bad element aborts the batch or is dropped.

use crate::error::DashboardError;
use crate::models::{LogRecord, Outcome, RecordId, Sentiment};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// What to do with a record that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Fail the whole batch on the first malformed record (default)
    #[default]
    Reject,
    /// Drop malformed records and keep going
    Skip,
}

/// Records that survived decoding.
#[derive(Debug, Clone, Default)]
pub struct DecodedBatch {
    pub records: Vec<LogRecord>,
    /// Number of elements dropped under [`MalformedPolicy::Skip`].
    pub skipped: usize,
}

/// Wire shape of a record before validation.
#[derive(Debug, Deserialize)]
struct WireRecord {
    id: RecordId,
    mc_number: String,
    load_id: String,
    final_rate: Value,
    outcome: Outcome,
    sentiment: Sentiment,
    rounds: u32,
    #[serde(default)]
    notes: Option<String>,
    created_at: String,
}

/// Parse a response body into the raw record array.
pub fn parse_batch(body: &str) -> Result<Vec<Value>, DashboardError> {
    let value: Value = serde_json::from_str(body).map_err(|e| DashboardError::SourceDecode {
        reason: e.to_string(),
    })?;
    into_array(value)
}

/// Require a JSON value to be an array.
pub fn into_array(value: Value) -> Result<Vec<Value>, DashboardError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(DashboardError::SourceDecode {
            reason: format!("expected a JSON array, got {}", json_type(&other)),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decode a raw batch, applying `policy` uniformly to every element.
pub fn decode_records(
    values: Vec<Value>,
    policy: MalformedPolicy,
) -> Result<DecodedBatch, DashboardError> {
    let mut batch = DecodedBatch {
        records: Vec::with_capacity(values.len()),
        skipped: 0,
    };

    for (index, value) in values.into_iter().enumerate() {
        match decode_record(&value) {
            Ok(record) => batch.records.push(record),
            Err(reason) => match policy {
                MalformedPolicy::Reject => {
                    return Err(DashboardError::MalformedRecord {
                        index,
                        id: record_id(&value),
                        reason,
                    });
                }
                MalformedPolicy::Skip => {
                    warn!(index, reason = %reason, "Skipping malformed record");
                    batch.skipped += 1;
                }
            },
        }
    }

    debug!(
        "Decoded {} records ({} skipped)",
        batch.records.len(),
        batch.skipped
    );

    Ok(batch)
}

/// Best-effort id of a raw element, for error reporting.
fn record_id(value: &Value) -> Option<RecordId> {
    value
        .get("id")
        .and_then(|id| serde_json::from_value(id.clone()).ok())
}

/// Decode and validate a single record.
pub fn decode_record(value: &Value) -> Result<LogRecord, String> {
    let wire: WireRecord = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;

    Ok(LogRecord {
        final_rate: parse_rate(&wire.final_rate)?,
        created_at: parse_timestamp(&wire.created_at)?,
        id: wire.id,
        mc_number: wire.mc_number,
        load_id: wire.load_id,
        outcome: wire.outcome,
        sentiment: wire.sentiment,
        rounds: wire.rounds,
        notes: wire.notes.unwrap_or_default(),
    })
}

/// Accept a JSON number or a string holding a decimal number.
fn parse_rate(value: &Value) -> Result<f64, String> {
    let rate = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("final_rate {} is out of range", n))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("final_rate `{}` is not a number", s))?,
        other => {
            return Err(format!(
                "final_rate must be a number, got {}",
                json_type(other)
            ))
        }
    };

    if !rate.is_finite() {
        return Err(format!("final_rate `{}` is not finite", rate));
    }

    Ok(rate)
}

/// Parse an ISO 8601 timestamp into UTC.
///
/// Accepts RFC 3339, Postgres-style `YYYY-MM-DD HH:MM:SS+00`, date-times
/// without offset (taken as UTC) and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    Err(format!("created_at `{}` is not an ISO 8601 timestamp", raw))
}
