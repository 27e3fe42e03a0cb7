//! HTTP client for the negotiation log endpoint.
//!
//! A single GET is retried with exponential backoff on transport errors and
//! server-side statuses; client errors fail immediately.

use crate::error::DashboardError;
use crate::source::decode::into_array;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection settings for the data source.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub url: String,
    pub timeout_seconds: u64,
    /// Retries after the first attempt.
    pub retries: usize,
    /// Delay before the first retry, doubled for each further retry.
    pub retry_delay_ms: u64,
}

impl From<&crate::config::SourceConfig> for SourceSettings {
    fn from(config: &crate::config::SourceConfig) -> Self {
        Self {
            url: config.url.clone(),
            timeout_seconds: config.timeout_seconds,
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
        }
    }
}

/// Why a single attempt failed.
#[derive(Debug)]
enum AttemptError {
    Transport(String),
    Status(u16),
    Body(DashboardError),
}

impl AttemptError {
    fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Transport(_) => true,
            AttemptError::Status(status) => *status >= 500 || *status == 429,
            AttemptError::Body(_) => false,
        }
    }

    fn into_error(self, url: &str) -> DashboardError {
        match self {
            AttemptError::Transport(reason) => DashboardError::SourceUnavailable {
                url: url.to_string(),
                reason,
            },
            AttemptError::Status(status) => DashboardError::SourceStatus {
                url: url.to_string(),
                status,
            },
            AttemptError::Body(err) => err,
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Transport(reason) => write!(f, "{}", reason),
            AttemptError::Status(status) => write!(f, "HTTP {}", status),
            AttemptError::Body(err) => write!(f, "{}", err),
        }
    }
}

/// Client for the negotiation log endpoint.
pub struct SourceClient {
    settings: SourceSettings,
    http_client: reqwest::Client,
}

impl SourceClient {
    pub fn new(settings: SourceSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            settings,
            http_client,
        })
    }

    pub fn url(&self) -> &str {
        &self.settings.url
    }

    /// Fetch the raw record array, retrying transient failures.
    pub async fn fetch_records(&self) -> Result<Vec<Value>, DashboardError> {
        let mut attempt = 0;

        loop {
            match self.try_fetch().await {
                Ok(values) => {
                    info!(
                        "Fetched {} records from {}",
                        values.len(),
                        self.settings.url
                    );
                    return Ok(values);
                }
                Err(e) if e.is_retryable() && attempt < self.settings.retries => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    warn!(
                        attempt,
                        url = %self.settings.url,
                        error = %e,
                        "Fetch attempt failed, retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into_error(&self.settings.url)),
            }
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u64 << attempt.min(16);
        Duration::from_millis(self.settings.retry_delay_ms.saturating_mul(factor))
    }

    /// Execute a single GET and decode the body.
    async fn try_fetch(&self) -> Result<Vec<Value>, AttemptError> {
        debug!("GET {}", self.settings.url);

        let response = self
            .http_client
            .get(&self.settings.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AttemptError::Transport(format!(
                        "request timed out after {}s",
                        self.settings.timeout_seconds
                    ))
                } else if e.is_connect() {
                    AttemptError::Transport(format!(
                        "cannot connect to {}",
                        self.settings.url
                    ))
                } else {
                    AttemptError::Transport(format!("failed to send request: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        let body: Value = response.json().await.map_err(|e| {
            AttemptError::Body(DashboardError::SourceDecode {
                reason: e.to_string(),
            })
        })?;

        into_array(body).map_err(AttemptError::Body)
    }
}
