//! Record filtering and dashboard statistics.
//!
//! Every function here is a pure reduction over a record slice; the whole
//! dashboard is re-derived from scratch for each fetched batch.

use crate::analysis::buckets::OrderedBuckets;
use crate::models::{
    Dashboard, DistributionEntry, LogRecord, Outcome, SummaryStats, TrendPoint,
};
use chrono::NaiveDate;

/// Number of distinct dates kept in the rate trend.
pub const DEFAULT_TREND_DAYS: usize = 7;

/// Check whether a record matches an already-lowercased search needle.
fn matches_search(record: &LogRecord, needle: &str) -> bool {
    [
        record.mc_number.as_str(),
        record.load_id.as_str(),
        record.outcome.as_str(),
        record.sentiment.as_str(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Filter records by a case-insensitive substring search.
///
/// The term is matched against the MC number, load id, outcome and
/// sentiment. An empty term returns every record; order is preserved.
pub fn filter_by_search_term(records: &[LogRecord], term: &str) -> Vec<LogRecord> {
    if term.is_empty() {
        return records.to_vec();
    }

    let needle = term.to_lowercase();
    records
        .iter()
        .filter(|r| matches_search(r, &needle))
        .cloned()
        .collect()
}

/// Compute summary statistics over the full dataset.
pub fn compute_summary_stats(records: &[LogRecord]) -> SummaryStats {
    let mut stats = SummaryStats {
        total_records: records.len(),
        ..SummaryStats::default()
    };

    if records.is_empty() {
        return stats;
    }

    let mut rate_sum = 0.0;
    let mut rounds_sum = 0u64;

    for record in records {
        match record.outcome {
            Outcome::Accepted => stats.accepted_count += 1,
            Outcome::Declined => stats.declined_count += 1,
            Outcome::NoAgreement => {}
        }
        rate_sum += record.final_rate;
        rounds_sum += u64::from(record.rounds);
    }

    let n = records.len() as f64;
    stats.avg_final_rate = rate_sum / n;
    stats.avg_rounds = rounds_sum as f64 / n;

    stats
}

/// Count records per outcome, in order of first appearance.
pub fn compute_outcome_distribution(records: &[LogRecord]) -> Vec<DistributionEntry> {
    let buckets: OrderedBuckets<_> = records.iter().map(|r| (r.outcome, 0.0)).collect();

    buckets
        .into_entries()
        .into_iter()
        .map(|(outcome, acc)| DistributionEntry {
            label: outcome.label(),
            count: acc.count,
            color: outcome.color(),
        })
        .collect()
}

/// Count records per sentiment, in order of first appearance.
pub fn compute_sentiment_distribution(records: &[LogRecord]) -> Vec<DistributionEntry> {
    let buckets: OrderedBuckets<_> = records.iter().map(|r| (r.sentiment, 0.0)).collect();

    buckets
        .into_entries()
        .into_iter()
        .map(|(sentiment, acc)| DistributionEntry {
            label: sentiment.label(),
            count: acc.count,
            color: sentiment.color(),
        })
        .collect()
}

/// Average final rate per UTC calendar date.
///
/// Only dates present in the data produce a point. Points are sorted
/// ascending and only the `days` most recent dates are kept.
pub fn compute_daily_rate_trend(records: &[LogRecord], days: usize) -> Vec<TrendPoint> {
    let buckets: OrderedBuckets<NaiveDate> = records
        .iter()
        .map(|r| (r.created_date(), r.final_rate))
        .collect();

    let mut points: Vec<TrendPoint> = buckets
        .into_entries()
        .into_iter()
        .map(|(date, acc)| TrendPoint {
            date,
            avg_rate: acc.mean(),
        })
        .collect();

    points.sort_by_key(|p| p.date);

    let excess = points.len().saturating_sub(days);
    points.drain(..excess);

    points
}

/// Derive the complete dashboard for one record batch.
pub fn build_dashboard(records: &[LogRecord], search_term: &str, trend_days: usize) -> Dashboard {
    Dashboard {
        records: filter_by_search_term(records, search_term),
        stats: compute_summary_stats(records),
        outcome_distribution: compute_outcome_distribution(records),
        sentiment_distribution: compute_sentiment_distribution(records),
        rate_trend: compute_daily_rate_trend(records, trend_days),
    }
}
