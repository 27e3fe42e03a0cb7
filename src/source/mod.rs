//! Negotiation log sources.
//!
//! Records come either from the HTTP endpoint or from a local JSON file
//! holding the same array.

pub mod client;
pub mod decode;

pub use client::{SourceClient, SourceSettings};
pub use decode::{decode_records, MalformedPolicy};

use crate::error::DashboardError;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where a record batch is read from.
pub enum RecordSource {
    Http(SourceClient),
    /// Local JSON file; `-` reads stdin.
    File(PathBuf),
}

impl RecordSource {
    /// Human-readable origin, used in report metadata.
    pub fn describe(&self) -> String {
        match self {
            RecordSource::Http(client) => client.url().to_string(),
            RecordSource::File(path) if path.as_os_str() == "-" => "stdin".to_string(),
            RecordSource::File(path) => path.display().to_string(),
        }
    }

    /// Load the raw record array.
    pub async fn load(&self) -> Result<Vec<Value>, DashboardError> {
        match self {
            RecordSource::Http(client) => client.fetch_records().await,
            RecordSource::File(path) => {
                let body = read_input(path)?;
                let values = decode::parse_batch(&body)?;
                info!("Read {} records from {}", values.len(), self.describe());
                Ok(values)
            }
        }
    }
}

fn read_input(path: &Path) -> Result<String, DashboardError> {
    let input_error = |e: std::io::Error| DashboardError::InputFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    if path.as_os_str() == "-" {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .map_err(input_error)?;
        Ok(body)
    } else {
        std::fs::read_to_string(path).map_err(input_error)
    }
}
