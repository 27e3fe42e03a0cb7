//! Data models for the negotiation dashboard.
//!
//! This module contains the record type received from the data source,
//! the closed enums it carries, and the aggregate structures produced for
//! the report.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a negotiation log record.
///
/// Upstream ids are either integers (serial columns) or strings (uuids).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Presentation color assigned to a chart category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartColor {
    Green,
    Red,
    Amber,
    Gray,
}

impl ChartColor {
    /// Returns the hex code used when rendering this color.
    pub fn hex(&self) -> &'static str {
        match self {
            ChartColor::Green => "#10b981",
            ChartColor::Red => "#ef4444",
            ChartColor::Amber => "#f59e0b",
            ChartColor::Gray => "#6b7280",
        }
    }

    /// Returns an emoji swatch for terminal and Markdown output.
    pub fn emoji(&self) -> &'static str {
        match self {
            ChartColor::Green => "🟢",
            ChartColor::Red => "🔴",
            ChartColor::Amber => "🟡",
            ChartColor::Gray => "⚪",
        }
    }
}

impl fmt::Display for ChartColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartColor::Green => write!(f, "green"),
            ChartColor::Red => write!(f, "red"),
            ChartColor::Amber => write!(f, "amber"),
            ChartColor::Gray => write!(f, "gray"),
        }
    }
}

/// Terminal state of a negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Accepted,
    Declined,
    NoAgreement,
}

impl Outcome {
    /// Wire form, as sent by the data source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Accepted => "accepted",
            Outcome::Declined => "declined",
            Outcome::NoAgreement => "no_agreement",
        }
    }

    /// Display form used for chart labels.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }

    pub fn color(&self) -> ChartColor {
        match self {
            Outcome::Accepted => ChartColor::Green,
            Outcome::Declined => ChartColor::Red,
            Outcome::NoAgreement => ChartColor::Amber,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualitative tone of a negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Wire form, as sent by the data source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    pub fn label(&self) -> String {
        self.as_str().to_string()
    }

    pub fn color(&self) -> ChartColor {
        match self {
            Sentiment::Positive => ChartColor::Green,
            Sentiment::Neutral => ChartColor::Gray,
            Sentiment::Negative => ChartColor::Red,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed rate negotiation between a carrier and a load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Identifier, unique within a batch.
    pub id: RecordId,
    /// Carrier MC number.
    pub mc_number: String,
    /// Load identifier.
    pub load_id: String,
    /// Final agreed (or last offered) rate.
    pub final_rate: f64,
    /// Terminal state of the negotiation.
    pub outcome: Outcome,
    /// Tone classification.
    pub sentiment: Sentiment,
    /// Number of negotiation rounds.
    pub rounds: u32,
    /// Free-text notes, not used in aggregation.
    #[serde(default)]
    pub notes: String,
    /// Creation time of the log entry.
    pub created_at: DateTime<Utc>,
}

impl LogRecord {
    /// Calendar date (UTC) used for trend bucketing.
    pub fn created_date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

/// Scalar statistics over the whole dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Number of records in the dataset.
    pub total_records: usize,
    /// Records with outcome `accepted`.
    pub accepted_count: usize,
    /// Records with outcome `declined`.
    pub declined_count: usize,
    /// Mean final rate, 0 for an empty dataset.
    pub avg_final_rate: f64,
    /// Mean number of rounds, 0 for an empty dataset.
    pub avg_rounds: f64,
}

impl SummaryStats {
    /// Records that ended without agreement (neither accepted nor declined).
    pub fn no_agreement_count(&self) -> usize {
        self.total_records - self.accepted_count - self.declined_count
    }

    /// Share of accepted records in percent, 0 for an empty dataset.
    pub fn acceptance_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.accepted_count as f64 / self.total_records as f64 * 100.0
        }
    }
}

/// One bar/slice of a categorical chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionEntry {
    pub label: String,
    pub count: usize,
    pub color: ChartColor,
}

/// Average rate for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub avg_rate: f64,
}

/// Everything derived from one record batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dashboard {
    /// Records matching the search term, in input order.
    pub records: Vec<LogRecord>,
    /// Statistics over the full, unfiltered dataset.
    pub stats: SummaryStats,
    pub outcome_distribution: Vec<DistributionEntry>,
    pub sentiment_distribution: Vec<DistributionEntry>,
    /// Daily average rate, ascending by date.
    pub rate_trend: Vec<TrendPoint>,
}

/// Metadata about one dashboard render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// URL or file the records were read from.
    pub source: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Records accepted by the decoder.
    pub total_records: usize,
    /// Records dropped by the decoder under the `skip` policy.
    pub skipped_records: usize,
    /// Search term applied to the record table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    /// Time spent fetching and decoding, in seconds.
    pub fetch_duration_seconds: f64,
}

/// The complete rendered dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub metadata: ReportMetadata,
    pub dashboard: Dashboard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_label_replaces_underscore() {
        assert_eq!(Outcome::NoAgreement.label(), "no agreement");
        assert_eq!(Outcome::Accepted.label(), "accepted");
    }

    #[test]
    fn test_color_lookup() {
        assert_eq!(Outcome::Accepted.color(), ChartColor::Green);
        assert_eq!(Outcome::Declined.color(), ChartColor::Red);
        assert_eq!(Outcome::NoAgreement.color(), ChartColor::Amber);
        assert_eq!(Sentiment::Positive.color(), ChartColor::Green);
        assert_eq!(Sentiment::Neutral.color(), ChartColor::Gray);
        assert_eq!(Sentiment::Negative.color(), ChartColor::Red);
    }

    #[test]
    fn test_enum_wire_format() {
        let outcome: Outcome = serde_json::from_str("\"no_agreement\"").unwrap();
        assert_eq!(outcome, Outcome::NoAgreement);

        let sentiment: Sentiment = serde_json::from_str("\"negative\"").unwrap();
        assert_eq!(sentiment, Sentiment::Negative);

        assert!(serde_json::from_str::<Outcome>("\"maybe\"").is_err());
    }

    #[test]
    fn test_record_id_untagged() {
        let id: RecordId = serde_json::from_str("42").unwrap();
        assert_eq!(id, RecordId::Number(42));

        let id: RecordId = serde_json::from_str("\"abc-1\"").unwrap();
        assert_eq!(id.to_string(), "abc-1");
    }

    #[test]
    fn test_summary_derived_values() {
        let stats = SummaryStats {
            total_records: 4,
            accepted_count: 2,
            declined_count: 1,
            avg_final_rate: 0.0,
            avg_rounds: 0.0,
        };
        assert_eq!(stats.no_agreement_count(), 1);
        assert_eq!(stats.acceptance_rate(), 50.0);
        assert_eq!(SummaryStats::default().acceptance_rate(), 0.0);
    }
}
