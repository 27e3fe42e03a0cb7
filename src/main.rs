//! Negodash - Negotiation Log Dashboard
//!
//! A CLI tool that fetches rate negotiation logs from an HTTP endpoint,
//! derives outcome, sentiment and rate statistics, and writes a Markdown
//! or JSON dashboard report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (arguments, config, writing the report, etc.)
//!   2 - Data source unavailable (connection, HTTP status, unreadable body)
//!   3 - Malformed record in the fetched batch

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod source;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use error::DashboardError;
use indicatif::{ProgressBar, ProgressStyle};
use models::{Dashboard, DashboardReport, ReportMetadata};
use source::{RecordSource, SourceClient, SourceSettings};
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Negodash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        let exit_code = e
            .downcast_ref::<DashboardError>()
            .map(DashboardError::exit_code)
            .unwrap_or(1);
        error!("Dashboard failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(exit_code);
    }

    Ok(())
}

/// Handle --init-config: generate a default .negodash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the source URL, retry policy and report options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration, build the record source and render once or on a timer.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let source = match args.input {
        Some(ref path) => RecordSource::File(path.clone()),
        None => RecordSource::Http(SourceClient::new(SourceSettings::from(&config.source))?),
    };

    match args.refresh {
        None => render_dashboard(&source, &config, &args).await.map(|_| ()),
        Some(secs) => {
            refresh_loop(&source, &config, &args, secs, tokio::signal::ctrl_c()).await
        }
    }
}

/// Re-run the whole pipeline every `secs` seconds until `shutdown` resolves.
///
/// Fetch and data errors are shown and retried at the next tick; anything
/// else (e.g. the report cannot be written) stops the loop.
async fn refresh_loop<F: Future>(
    source: &RecordSource,
    config: &Config,
    args: &Args,
    secs: u64,
    shutdown: F,
) -> Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    // Polled across iterations, so a signal that lands during a render is kept.
    tokio::pin!(shutdown);

    println!("🔄 Refreshing every {}s. Press Ctrl-C to stop.", secs);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => break,
        }

        let rendered = tokio::select! {
            result = render_dashboard(source, config, args) => result,
            _ = &mut shutdown => break,
        };

        if let Err(e) = rendered {
            match e.downcast_ref::<DashboardError>() {
                Some(err) => {
                    warn!("Refresh failed: {}", err);
                    eprintln!("⚠️  {} (retrying in {}s)", err, secs);
                }
                None => return Err(e),
            }
        }
    }

    println!("\n👋 Stopped refreshing.");
    Ok(())
}

/// Fetch, decode, aggregate and write one dashboard.
///
/// Every call starts from a fresh fetch; the written report is also returned.
async fn render_dashboard(
    source: &RecordSource,
    config: &Config,
    args: &Args,
) -> Result<DashboardReport> {
    let start_time = Instant::now();
    let to_stdout = config.report.output == "-";

    // Step 1: Fetch the raw batch
    let spinner = if args.quiet || to_stdout {
        None
    } else {
        Some(fetch_spinner(&source.describe()))
    };

    let fetched = source.load().await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    // Step 2: Decode into typed records
    let batch = source::decode_records(fetched?, config.validation.malformed)?;
    let fetch_duration = start_time.elapsed().as_secs_f64();

    if batch.skipped > 0 {
        warn!("Skipped {} malformed records", batch.skipped);
    }

    // Step 3: Aggregate
    let search_term = args.search_term();
    let dashboard = analysis::build_dashboard(
        &batch.records,
        search_term.unwrap_or(""),
        config.report.trend_days,
    );

    let report = DashboardReport {
        metadata: ReportMetadata {
            source: source.describe(),
            generated_at: Utc::now(),
            total_records: batch.records.len(),
            skipped_records: batch.skipped,
            search_term: search_term.map(str::to_string),
            fetch_duration_seconds: fetch_duration,
        },
        dashboard,
    };

    // Step 4: Render and write
    let output =
        report::render_report(&report, config.report.format, config.report.include_records)?;

    if to_stdout {
        println!("{}", output);
        return Ok(report);
    }

    std::fs::write(&config.report.output, &output)
        .with_context(|| format!("Failed to write report to {}", config.report.output))?;

    if !args.quiet {
        print_summary(&report.dashboard, &config.report.output, search_term);
    }

    Ok(report)
}

fn fetch_spinner(origin: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")
    {
        pb.set_style(style);
    }
    pb.set_message(format!("📥 Fetching negotiation logs from {}", origin));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print the terminal summary for one render.
fn print_summary(dashboard: &Dashboard, output: &str, search_term: Option<&str>) {
    let stats = &dashboard.stats;

    println!("\n📊 Dashboard Summary:");
    println!("   Records: {}", stats.total_records);
    println!(
        "   - 🟢 Accepted: {} | 🔴 Declined: {} | 🟡 No agreement: {}",
        stats.accepted_count,
        stats.declined_count,
        stats.no_agreement_count()
    );
    println!(
        "   Avg rate: {} | Avg rounds: {:.1}",
        report::format_rate(stats.avg_final_rate),
        stats.avg_rounds
    );
    if let Some(latest) = dashboard.rate_trend.last() {
        println!(
            "   Latest day ({}): {}",
            latest.date,
            report::format_rate(latest.avg_rate)
        );
    }
    if let Some(term) = search_term {
        println!("   Matching \"{}\": {}", term, dashboard.records.len());
    }
    println!("\n✅ Dashboard saved to: {}", output);
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn log_json(id: i64, mc_number: &str, rate: f64, outcome: &str, created_at: &str) -> Value {
        json!({
            "id": id,
            "mc_number": mc_number,
            "load_id": format!("LD-{}", id),
            "final_rate": rate,
            "outcome": outcome,
            "sentiment": "neutral",
            "rounds": 2,
            "notes": null,
            "created_at": created_at,
        })
    }

    fn quiet_args() -> Args {
        let mut args = Args::test_default();
        args.quiet = true;
        args
    }

    fn http_source(server: &MockServer) -> RecordSource {
        let mut config = Config::default();
        config.source.url = format!("{}/api/negotiation-logs", server.uri());
        config.source.retries = 0;
        RecordSource::Http(SourceClient::new(SourceSettings::from(&config.source)).unwrap())
    }

    #[tokio::test]
    async fn test_render_dashboard_writes_report() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                log_json(1, "MC100", 1000.0, "accepted", "2024-03-01T10:00:00Z"),
                log_json(2, "MC200", 3000.0, "declined", "2024-03-02T10:00:00Z"),
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.report.output = temp_dir.path().join("report.md").display().to_string();

        let source = http_source(&mock_server);
        let report = render_dashboard(&source, &config, &quiet_args()).await.unwrap();

        assert_eq!(report.dashboard.stats.total_records, 2);
        assert_eq!(report.dashboard.stats.avg_final_rate, 2000.0);

        let written = std::fs::read_to_string(&config.report.output).unwrap();
        assert!(written.contains("# Negotiation Dashboard"));
        assert!(written.contains("| 2024-03-02 | $3,000.00 |"));
        assert!(written.contains("MC200"));
    }

    #[tokio::test]
    async fn test_rerender_reflects_only_latest_batch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                log_json(1, "MC100", 1000.0, "accepted", "2024-03-01T10:00:00Z"),
                log_json(2, "MC200", 3000.0, "declined", "2024-03-02T10:00:00Z"),
            ])))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([log_json(
                7,
                "MC777",
                500.0,
                "no_agreement",
                "2024-04-10T08:00:00Z"
            )])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.report.format = cli::OutputFormat::Json;
        config.report.output = temp_dir.path().join("report.json").display().to_string();

        let source = http_source(&mock_server);
        let args = quiet_args();

        let first = render_dashboard(&source, &config, &args).await.unwrap();
        assert_eq!(first.dashboard.stats.total_records, 2);

        let second = render_dashboard(&source, &config, &args).await.unwrap();
        let stats = &second.dashboard.stats;
        assert_eq!(stats.total_records, 1);
        assert_eq!(stats.accepted_count, 0);
        assert_eq!(stats.avg_final_rate, 500.0);
        assert_eq!(second.dashboard.outcome_distribution.len(), 1);
        assert_eq!(second.dashboard.outcome_distribution[0].label, "no agreement");
        assert_eq!(second.dashboard.rate_trend.len(), 1);

        let written = std::fs::read_to_string(&config.report.output).unwrap();
        assert!(written.contains("MC777"));
        assert!(!written.contains("MC100"));
        assert!(!written.contains("MC200"));
    }

    #[tokio::test]
    async fn test_refresh_loop_renders_each_tick() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.report.output = temp_dir.path().join("report.md").display().to_string();

        let source = http_source(&mock_server);
        let shutdown = tokio::time::sleep(Duration::from_millis(1500));

        refresh_loop(&source, &config, &quiet_args(), 1, shutdown)
            .await
            .unwrap();

        assert!(Path::new(&config.report.output).exists());
    }

    #[tokio::test]
    async fn test_refresh_loop_stops_during_slow_render() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_secs(20)),
            )
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.report.output = temp_dir.path().join("report.md").display().to_string();

        let source = http_source(&mock_server);
        let shutdown = tokio::time::sleep(Duration::from_millis(200));

        let started = Instant::now();
        let stopped = tokio::time::timeout(
            Duration::from_secs(5),
            refresh_loop(&source, &config, &quiet_args(), 60, shutdown),
        )
        .await;

        assert!(matches!(stopped, Ok(Ok(()))));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!Path::new(&config.report.output).exists());
    }

    #[tokio::test]
    async fn test_render_dashboard_rejects_malformed_batch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                log_json(1, "MC100", 1000.0, "maybe", "2024-03-01T10:00:00Z"),
            ])))
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.report.output = temp_dir.path().join("report.md").display().to_string();

        let source = http_source(&mock_server);
        let err = render_dashboard(&source, &config, &quiet_args()).await.unwrap_err();

        let err = err.downcast_ref::<DashboardError>().unwrap();
        assert_eq!(err.exit_code(), 3);
        assert!(!Path::new(&config.report.output).exists());
    }
}
