//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::source::MalformedPolicy;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Negodash - analytics dashboard for rate negotiation logs
///
/// Fetches negotiation log records from an HTTP endpoint, derives outcome,
/// sentiment and rate statistics, and writes a Markdown or JSON dashboard.
///
/// Examples:
///   negodash --url https://logs.example.com/api/negotiation-logs
///   negodash --input logs.json --search mc123 --output -
///   negodash --format json --output dashboard.json
///   negodash --refresh 60
///   negodash --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Negotiation log endpoint URL
    ///
    /// Overrides the `[source] url` setting of the config file.
    #[arg(short, long, value_name = "URL", env = "NEGODASH_SOURCE_URL")]
    pub url: Option<String>,

    /// Read records from a local JSON file instead of the endpoint
    ///
    /// Use `-` to read from stdin.
    #[arg(short, long, value_name = "FILE", conflicts_with = "url")]
    pub input: Option<PathBuf>,

    /// Only list records matching this term in the record table
    ///
    /// Case-insensitive match on MC number, load id, outcome and sentiment.
    /// Summary statistics and charts always cover every record.
    #[arg(short, long, value_name = "TERM")]
    pub search: Option<String>,

    /// Output file path for the report (`-` for stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .negodash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Retries after a failed fetch
    #[arg(long, value_name = "COUNT")]
    pub retries: Option<usize>,

    /// How to handle records that fail validation (reject, skip)
    #[arg(long, value_name = "POLICY")]
    pub malformed: Option<MalformedPolicy>,

    /// Leave the record table out of the report
    #[arg(long)]
    pub no_records: bool,

    /// Re-fetch and re-render every SECS seconds until interrupted
    #[arg(long, value_name = "SECS")]
    pub refresh: Option<u64>,

    /// Generate a default .negodash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Search term, `None` when absent or empty.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Source URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(refresh) = self.refresh {
            if refresh == 0 {
                return Err("Refresh interval must be at least 1 second".to_string());
            }
        }

        if let Some(ref input) = self.input {
            if input.as_os_str() == "-" {
                if self.refresh.is_some() {
                    return Err("Cannot use --refresh when reading from stdin".to_string());
                }
            } else if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    #[cfg(test)]
    pub(crate) fn test_default() -> Self {
        Args {
            url: None,
            input: None,
            search: None,
            output: None,
            format: None,
            config: None,
            verbose: false,
            quiet: false,
            timeout: None,
            retries: None,
            malformed: None,
            no_records: false,
            refresh: None,
            init_config: false,
        }
    }
}
