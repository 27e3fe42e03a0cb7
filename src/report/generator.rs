//! Dashboard report generation.
//!
//! This module renders a [`DashboardReport`] as Markdown tables or as
//! pretty-printed JSON.

use crate::cli::OutputFormat;
use crate::models::{
    DashboardReport, DistributionEntry, LogRecord, ReportMetadata, SummaryStats, TrendPoint,
};
use anyhow::Result;
use serde_json::Value;

/// Render a report in the requested format.
pub fn render_report(
    report: &DashboardReport,
    format: OutputFormat,
    include_records: bool,
) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(generate_markdown_report(report, include_records)),
        OutputFormat::Json => generate_json_report(report, include_records),
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &DashboardReport, include_records: bool) -> String {
    let dashboard = &report.dashboard;
    let mut output = String::new();

    output.push_str("# Negotiation Dashboard\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&dashboard.stats));
    output.push_str(&generate_distribution_section(
        "Outcome Distribution",
        "Outcome",
        &dashboard.outcome_distribution,
    ));
    output.push_str(&generate_distribution_section(
        "Sentiment Distribution",
        "Sentiment",
        &dashboard.sentiment_distribution,
    ));
    output.push_str(&generate_trend_section(&dashboard.rate_trend));

    if include_records {
        output.push_str(&generate_records_section(
            &dashboard.records,
            report.metadata.search_term.as_deref(),
        ));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Records:** {}\n", metadata.total_records));
    if metadata.skipped_records > 0 {
        section.push_str(&format!(
            "- **Skipped (malformed):** {}\n",
            metadata.skipped_records
        ));
    }
    if let Some(ref term) = metadata.search_term {
        section.push_str(&format!("- **Search:** {}\n", code_span(term)));
    }
    section.push_str(&format!(
        "- **Fetch Duration:** {:.2}s\n",
        metadata.fetch_duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the summary statistics section.
fn generate_summary_section(stats: &SummaryStats) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Total | Accepted | Declined | No Agreement | Acceptance | Avg Rate | Avg Rounds |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {:.1}% | {} | {:.1} |\n\n",
        stats.total_records,
        stats.accepted_count,
        stats.declined_count,
        stats.no_agreement_count(),
        stats.acceptance_rate(),
        format_rate(stats.avg_final_rate),
        stats.avg_rounds
    ));

    section
}

/// Generate a categorical distribution table.
fn generate_distribution_section(
    title: &str,
    column: &str,
    entries: &[DistributionEntry],
) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));

    if entries.is_empty() {
        section.push_str("No data.\n\n");
        return section;
    }

    let total: usize = entries.iter().map(|e| e.count).sum();

    section.push_str(&format!("| {} | Count | Share | Color |\n", column));
    section.push_str("|:---|:---:|:---:|:---|\n");
    for entry in entries {
        section.push_str(&format!(
            "| {} {} | {} | {:.1}% | {} `{}` |\n",
            entry.color.emoji(),
            entry.label,
            entry.count,
            entry.count as f64 / total as f64 * 100.0,
            entry.color,
            entry.color.hex()
        ));
    }
    section.push('\n');

    section
}

/// Generate the daily rate trend table.
fn generate_trend_section(points: &[TrendPoint]) -> String {
    let mut section = String::new();

    section.push_str("## Daily Rate Trend\n\n");

    if points.is_empty() {
        section.push_str("No data.\n\n");
        return section;
    }

    section.push_str("| Date | Avg Rate |\n");
    section.push_str("|:---|---:|\n");
    for point in points {
        section.push_str(&format!(
            "| {} | {} |\n",
            point.date.format("%Y-%m-%d"),
            format_rate(point.avg_rate)
        ));
    }
    section.push('\n');

    section
}

/// Generate the record table.
fn generate_records_section(records: &[LogRecord], search_term: Option<&str>) -> String {
    let mut section = String::new();

    section.push_str("## Negotiation Logs\n\n");

    if records.is_empty() {
        match search_term {
            Some(term) => {
                section.push_str(&format!("No records match {}.\n\n", code_span(term)))
            }
            None => section.push_str("No records.\n\n"),
        }
        return section;
    }

    section.push_str("| ID | MC Number | Load ID | Final Rate | Outcome | Sentiment | Rounds | Created |\n");
    section.push_str("|:---|:---|:---|---:|:---|:---|:---:|:---|\n");
    for record in records {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} {} | {} {} | {} | {} |\n",
            escape_cell(&record.id.to_string()),
            escape_cell(&record.mc_number),
            escape_cell(&record.load_id),
            format_rate(record.final_rate),
            record.outcome.color().emoji(),
            record.outcome.label(),
            record.sentiment.color().emoji(),
            record.sentiment.label(),
            record.rounds,
            record.created_at.format("%Y-%m-%d %H:%M")
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by negodash*\n".to_string()
}

/// Format a monetary amount with two decimals and thousands separators.
pub fn format_rate(rate: f64) -> String {
    let formatted = format!("{:.2}", rate.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // Only amounts that survive rounding keep their sign.
    let negative = rate < 0.0 && formatted.bytes().any(|b| matches!(b, b'1'..=b'9'));
    let sign = if negative { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, fraction)
}

/// Keep free text from breaking the Markdown table.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Wrap user text in an inline code span that its own backticks cannot close.
fn code_span(text: &str) -> String {
    let text = text.replace('\n', " ");
    let mut longest = 0;
    let mut run = 0;
    for ch in text.chars() {
        run = if ch == '`' { run + 1 } else { 0 };
        longest = longest.max(run);
    }

    if longest == 0 {
        return format!("`{}`", text);
    }
    let fence = "`".repeat(longest + 1);
    format!("{} {} {}", fence, text, fence)
}

/// Generate a JSON report, leaving out `dashboard.records` unless asked for.
pub fn generate_json_report(report: &DashboardReport, include_records: bool) -> Result<String> {
    let mut value = serde_json::to_value(report)?;
    if !include_records {
        if let Some(dashboard) = value.get_mut("dashboard").and_then(Value::as_object_mut) {
            dashboard.remove("records");
        }
    }
    serde_json::to_string_pretty(&value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{build_dashboard, DEFAULT_TREND_DAYS};
    use crate::models::{Outcome, RecordId, Sentiment};
    use chrono::{TimeZone, Utc};

    fn create_test_records() -> Vec<LogRecord> {
        vec![
            LogRecord {
                id: RecordId::Number(1),
                mc_number: "MC123".to_string(),
                load_id: "LD-1".to_string(),
                final_rate: 1250.0,
                outcome: Outcome::Accepted,
                sentiment: Sentiment::Positive,
                rounds: 2,
                notes: "Quick agreement".to_string(),
                created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            },
            LogRecord {
                id: RecordId::Number(2),
                mc_number: "MC456".to_string(),
                load_id: "LD-2".to_string(),
                final_rate: 2000.0,
                outcome: Outcome::NoAgreement,
                sentiment: Sentiment::Negative,
                rounds: 4,
                notes: String::new(),
                created_at: Utc.with_ymd_and_hms(2024, 3, 2, 16, 0, 0).unwrap(),
            },
        ]
    }

    fn create_test_report(search: &str) -> DashboardReport {
        let records = create_test_records();
        DashboardReport {
            metadata: ReportMetadata {
                source: "http://localhost:5000/api/negotiation-logs".to_string(),
                generated_at: Utc::now(),
                total_records: records.len(),
                skipped_records: 1,
                search_term: (!search.is_empty()).then(|| search.to_string()),
                fetch_duration_seconds: 0.25,
            },
            dashboard: build_dashboard(&records, search, DEFAULT_TREND_DAYS),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report("");
        let markdown = generate_markdown_report(&report, true);

        assert!(markdown.contains("# Negotiation Dashboard"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Outcome Distribution"));
        assert!(markdown.contains("## Sentiment Distribution"));
        assert!(markdown.contains("## Daily Rate Trend"));
        assert!(markdown.contains("## Negotiation Logs"));
        assert!(markdown.contains("no agreement"));
        assert!(markdown.contains("`#f59e0b`"));
        assert!(markdown.contains("| 2024-03-02 | $2,000.00 |"));
        assert!(markdown.contains("Skipped (malformed):** 1"));
        assert!(markdown.contains("MC456"));
    }

    #[test]
    fn test_markdown_without_records() {
        let report = create_test_report("");
        let markdown = generate_markdown_report(&report, false);

        assert!(!markdown.contains("## Negotiation Logs"));
        assert!(!markdown.contains("MC456"));
    }

    #[test]
    fn test_markdown_search_without_matches() {
        let report = create_test_report("zzz");
        let markdown = generate_markdown_report(&report, true);

        assert!(markdown.contains("- **Search:** `zzz`"));
        assert!(markdown.contains("No records match `zzz`."));
        // Charts still cover the full dataset.
        assert!(markdown.contains("| 2 | 1 | 0 | 1 | 50.0% | $1,625.00 | 3.0 |"));
    }

    #[test]
    fn test_markdown_empty_dataset() {
        let report = DashboardReport {
            metadata: ReportMetadata {
                source: "logs.json".to_string(),
                generated_at: Utc::now(),
                total_records: 0,
                skipped_records: 0,
                search_term: None,
                fetch_duration_seconds: 0.0,
            },
            dashboard: build_dashboard(&[], "", DEFAULT_TREND_DAYS),
        };

        let markdown = generate_markdown_report(&report, true);

        assert!(markdown.contains("| 0 | 0 | 0 | 0 | 0.0% | $0.00 | 0.0 |"));
        assert_eq!(markdown.matches("No data.").count(), 3);
        assert!(markdown.contains("No records."));
        assert!(!markdown.contains("Skipped"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report("mc123");
        let json = render_report(&report, OutputFormat::Json, true).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["search_term"], "mc123");
        assert_eq!(value["dashboard"]["records"].as_array().unwrap().len(), 1);
        assert_eq!(value["dashboard"]["stats"]["accepted_count"], 1);
        assert_eq!(value["dashboard"]["outcome_distribution"][1]["color"], "amber");
        assert_eq!(value["dashboard"]["rate_trend"][0]["date"], "2024-03-01");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(0.0), "$0.00");
        assert_eq!(format_rate(999.5), "$999.50");
        assert_eq!(format_rate(1234567.891), "$1,234,567.89");
        assert_eq!(format_rate(-1500.0), "-$1,500.00");
        assert_eq!(format_rate(-0.001), "$0.00");
        assert_eq!(format_rate(-0.005001), "-$0.01");
    }

    #[test]
    fn test_json_report_without_records() {
        let report = create_test_report("");
        let json = render_report(&report, OutputFormat::Json, false).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["dashboard"].get("records").is_none());
        assert!(!json.contains("MC123"));
        assert_eq!(value["dashboard"]["stats"]["total_records"], 2);
        assert_eq!(value["dashboard"]["rate_trend"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_markdown_escapes_user_text() {
        let mut records = create_test_records();
        records[0].id = RecordId::Text("a|b".to_string());
        let report = DashboardReport {
            metadata: ReportMetadata {
                source: "logs.json".to_string(),
                generated_at: Utc::now(),
                total_records: records.len(),
                skipped_records: 0,
                search_term: Some("x`y".to_string()),
                fetch_duration_seconds: 0.0,
            },
            dashboard: build_dashboard(&records, "", DEFAULT_TREND_DAYS),
        };

        let markdown = generate_markdown_report(&report, true);

        assert!(markdown.contains("| a\\|b | MC123 |"));
        assert!(markdown.contains("- **Search:** `` x`y ``"));
    }

    #[test]
    fn test_code_span() {
        assert_eq!(code_span("mc123"), "`mc123`");
        assert_eq!(code_span("a``b"), "``` a``b ```");
    }

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell("a|b\nc"), "a\\|b c");
    }
}
