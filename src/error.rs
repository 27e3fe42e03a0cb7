//! Error taxonomy for fetching and decoding negotiation logs.
//!
//! Source failures (the data source could not deliver a batch) are kept
//! apart from data-format failures (a delivered record is malformed) so the
//! caller can report them distinctly.

use crate::models::RecordId;

/// Error type for the fetch and decode boundary.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// The data source could not be reached after all attempts.
    #[error("data source {url} is unavailable: {reason}")]
    SourceUnavailable { url: String, reason: String },

    /// The data source answered with a non-2xx status after all attempts.
    #[error("data source {url} returned HTTP {status}")]
    SourceStatus { url: String, status: u16 },

    /// The response body is not a JSON array.
    #[error("data source returned an unreadable body: {reason}")]
    SourceDecode { reason: String },

    /// A local input file could not be read.
    #[error("failed to read input {path}: {reason}")]
    InputFile { path: String, reason: String },

    /// A record violates the expected shape.
    #[error("malformed record at index {index}{}: {reason}", id_suffix(.id))]
    MalformedRecord {
        index: usize,
        id: Option<RecordId>,
        reason: String,
    },
}

fn id_suffix(id: &Option<RecordId>) -> String {
    match id {
        Some(id) => format!(" (id {})", id),
        None => String::new(),
    }
}

impl DashboardError {
    /// True when no usable batch was delivered at all.
    pub fn is_source_failure(&self) -> bool {
        !matches!(self, DashboardError::MalformedRecord { .. })
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        if self.is_source_failure() {
            2
        } else {
            3
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = DashboardError::SourceStatus {
            url: "http://localhost/api".to_string(),
            status: 502,
        };
        assert_eq!(
            err.to_string(),
            "data source http://localhost/api returned HTTP 502"
        );
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_malformed_display_with_id() {
        let err = DashboardError::MalformedRecord {
            index: 3,
            id: Some(RecordId::Number(17)),
            reason: "unknown outcome `maybe`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed record at index 3 (id 17): unknown outcome `maybe`"
        );
        assert!(!err.is_source_failure());
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_malformed_display_without_id() {
        let err = DashboardError::MalformedRecord {
            index: 0,
            id: None,
            reason: "missing field `id`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed record at index 0: missing field `id`"
        );
    }
}
