//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.negodash.toml` files.

use crate::analysis::DEFAULT_TREND_DAYS;
use crate::cli::OutputFormat;
use crate::source::MalformedPolicy;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".negodash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Record validation settings.
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Data source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Negotiation log endpoint.
    #[serde(default = "default_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Number of retries after the first failed attempt.
    #[serde(default = "default_retries")]
    pub retries: usize,

    /// Delay before the first retry in milliseconds, doubled per retry.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:5000/api/negotiation-logs".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> usize {
    3
}

fn default_retry_delay() -> u64 {
    500
}

/// Record validation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// What to do with records that fail validation.
    #[serde(default)]
    pub malformed: MalformedPolicy,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Output file path, `-` for stdout.
    #[serde(default = "default_output")]
    pub output: String,

    /// Include the record table in the report.
    #[serde(default = "default_true")]
    pub include_records: bool,

    /// Number of most recent dates kept in the rate trend.
    #[serde(default = "default_trend_days")]
    pub trend_days: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            output: default_output(),
            include_records: true,
            trend_days: default_trend_days(),
        }
    }
}

fn default_output() -> String {
    "negodash_report.md".to_string()
}

fn default_true() -> bool {
    true
}

fn default_trend_days() -> usize {
    DEFAULT_TREND_DAYS
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.url {
            self.source.url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }
        if let Some(retries) = args.retries {
            self.source.retries = retries;
        }

        if let Some(policy) = args.malformed {
            self.validation.malformed = policy;
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(ref output) = args.output {
            self.report.output = output.display().to_string();
        } else if args.format == Some(OutputFormat::Json)
            && self.report.output == default_output()
        {
            self.report.output = "negodash_report.json".to_string();
        }
        if args.no_records {
            self.report.include_records = false;
        }
    }

    /// Check merged settings that the file format alone cannot rule out.
    pub fn validate(&self) -> Result<()> {
        let url = &self.source.url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!(
                "Invalid source.url '{}': must start with 'http://' or 'https://'",
                url
            );
        }
        if self.source.timeout_seconds == 0 {
            bail!("Invalid source.timeout_seconds: must be at least 1");
        }
        if self.report.trend_days == 0 {
            bail!("Invalid report.trend_days: must be at least 1");
        }
        if self.report.output.is_empty() {
            bail!("Invalid report.output: must not be empty");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
