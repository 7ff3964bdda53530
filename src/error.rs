//! Error types for media-dl
//!
//! This module provides:
//! - The crate-wide [`Error`] enum and [`Result`] alias
//! - [`ExtractionError`] for failures inside the media extractor
//! - [`SettingsError`] for preference-file persistence
//! - [`ErrorDetail`], the serializable form carried by `Event::Failed`
//!
//! Every error has a stable machine-readable code and a retryability flag so the
//! worker can turn any failure into exactly one typed event.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::WorkerState;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "cookies_browser")
        key: Option<String>,
    },

    /// Request not valid in the worker's current state
    #[error("{request} request rejected while {state}: {reason}")]
    RequestRejected {
        /// Kind of request ("fetch", "download", ...)
        request: &'static str,
        /// State the worker was in
        state: WorkerState,
        /// Why it was rejected
        reason: String,
    },

    /// Metadata query or download failed inside the extractor
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Operation stopped because its cancellation token was set
    #[error("operation cancelled")]
    Cancelled,

    /// Preference file could not be read or written
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// External tool could not be executed
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Worker task is no longer running
    #[error("worker stopped: no longer accepting requests")]
    WorkerStopped,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Failures reported by an extractor
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// URL is malformed or uses an unsupported scheme
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// What is wrong with it
        reason: String,
    },

    /// No extractor understands this site
    #[error("unsupported site: {url}")]
    UnsupportedSite {
        /// The URL that was rejected
        url: String,
    },

    /// Connection, DNS, or HTTP failure
    #[error("network error: {0}")]
    Network(String),

    /// Merge or transcode step failed
    #[error("post-processing failed: {0}")]
    PostProcess(String),

    /// A required executable is not installed
    #[error("{tool} not found: install it or configure its path")]
    MissingTool {
        /// Executable name (e.g. "yt-dlp")
        tool: String,
    },

    /// Extractor exited with an error not otherwise classified
    #[error("extractor failed{}: {message}", exit_code.map(|c| format!(" (exit code {c})")).unwrap_or_default())]
    Tool {
        /// Last error text reported by the extractor
        message: String,
        /// Process exit code, if it exited normally
        exit_code: Option<i32>,
    },

    /// Extractor output could not be understood
    #[error("malformed extractor output: {0}")]
    MalformedOutput(String),

    /// Operation exceeded the configured time limit
    #[error("operation timed out after {}s", after.as_secs())]
    TimedOut {
        /// Configured limit
        after: Duration,
    },
}

/// Preference-file persistence errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// Settings file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// File contents are not valid settings JSON
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Settings file path
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// File could not be written
    #[error("failed to write {path}: {source}")]
    Write {
        /// Settings file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Serializable failure description carried by `Event::Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "network_error", "unsupported_site")
    pub code: String,

    /// Human-readable error message, suitable for displaying to end users
    pub message: String,

    /// Whether retrying the same request may succeed
    pub recoverable: bool,
}

impl ErrorDetail {
    /// Create an error detail from its parts
    pub fn new(code: impl Into<String>, message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            recoverable,
        }
    }
}

impl Error {
    /// Get the machine-readable error code
    pub fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::RequestRejected { .. } => "request_rejected",
            Error::Extraction(e) => match e {
                ExtractionError::InvalidUrl { .. } => "invalid_url",
                ExtractionError::UnsupportedSite { .. } => "unsupported_site",
                ExtractionError::Network(_) => "network_error",
                ExtractionError::PostProcess(_) => "post_process_failed",
                ExtractionError::MissingTool { .. } => "missing_tool",
                ExtractionError::Tool { .. } => "extractor_error",
                ExtractionError::MalformedOutput(_) => "malformed_output",
                ExtractionError::TimedOut { .. } => "timed_out",
            },
            Error::Cancelled => "cancelled",
            Error::Settings(_) => "settings_error",
            Error::Io(_) => "io_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::WorkerStopped => "worker_stopped",
            Error::Other(_) => "internal_error",
        }
    }

    /// Whether the user may reasonably retry the same request
    ///
    /// Bad input and missing tools will fail the same way again; transient
    /// network and tool failures might not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Extraction(e) => match e {
                ExtractionError::InvalidUrl { .. }
                | ExtractionError::UnsupportedSite { .. }
                | ExtractionError::MissingTool { .. }
                | ExtractionError::PostProcess(_) => false,
                ExtractionError::Network(_)
                | ExtractionError::Tool { .. }
                | ExtractionError::MalformedOutput(_)
                | ExtractionError::TimedOut { .. } => true,
            },
            Error::Config { .. } | Error::WorkerStopped => false,
            Error::RequestRejected { .. }
            | Error::Cancelled
            | Error::Settings(_)
            | Error::Io(_)
            | Error::ExternalTool(_)
            | Error::Other(_) => true,
        }
    }

    /// Convert into the form carried by `Event::Failed`
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail::new(self.error_code(), self.to_string(), self.is_recoverable())
    }
}

impl From<&Error> for ErrorDetail {
    fn from(error: &Error) -> Self {
        error.detail()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")
    }

    /// Every variant paired with its expected code and retryability
    fn all_error_variants() -> Vec<(Error, &'static str, bool)> {
        vec![
            (
                Error::Config {
                    message: "bad".into(),
                    key: None,
                },
                "config_error",
                false,
            ),
            (
                Error::RequestRejected {
                    request: "download",
                    state: WorkerState::Idle,
                    reason: "no media info".into(),
                },
                "request_rejected",
                true,
            ),
            (
                ExtractionError::InvalidUrl {
                    url: "nope".into(),
                    reason: "relative URL without a base".into(),
                }
                .into(),
                "invalid_url",
                false,
            ),
            (
                ExtractionError::UnsupportedSite {
                    url: "https://example.org".into(),
                }
                .into(),
                "unsupported_site",
                false,
            ),
            (
                ExtractionError::Network("timed out".into()).into(),
                "network_error",
                true,
            ),
            (
                ExtractionError::PostProcess("ffmpeg exited 1".into()).into(),
                "post_process_failed",
                false,
            ),
            (
                ExtractionError::MissingTool {
                    tool: "ffmpeg".into(),
                }
                .into(),
                "missing_tool",
                false,
            ),
            (
                ExtractionError::Tool {
                    message: "ERROR: boom".into(),
                    exit_code: Some(1),
                }
                .into(),
                "extractor_error",
                true,
            ),
            (
                ExtractionError::MalformedOutput("not json".into()).into(),
                "malformed_output",
                true,
            ),
            (
                ExtractionError::TimedOut {
                    after: Duration::from_secs(5),
                }
                .into(),
                "timed_out",
                true,
            ),
            (Error::Cancelled, "cancelled", true),
            (
                SettingsError::Write {
                    path: "/ro/settings.json".into(),
                    source: io_err(),
                }
                .into(),
                "settings_error",
                true,
            ),
            (Error::Io(io_err()), "io_error", true),
            (
                Error::ExternalTool("spawn failed".into()),
                "external_tool_error",
                true,
            ),
            (Error::WorkerStopped, "worker_stopped", false),
            (Error::Other("x".into()), "internal_error", true),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_error_code() {
        for (error, code, _) in all_error_variants() {
            assert_eq!(error.error_code(), code, "wrong code for {error:?}");
        }
    }

    #[test]
    fn every_variant_maps_to_expected_recoverability() {
        for (error, _, recoverable) in all_error_variants() {
            assert_eq!(
                error.is_recoverable(),
                recoverable,
                "wrong recoverability for {error:?}"
            );
        }
    }

    #[test]
    fn detail_carries_display_message() {
        let error: Error = ExtractionError::UnsupportedSite {
            url: "https://example.org/x".into(),
        }
        .into();
        let detail = error.detail();
        assert_eq!(detail.code, "unsupported_site");
        assert_eq!(detail.message, "unsupported site: https://example.org/x");
        assert!(!detail.recoverable);
    }

    #[test]
    fn tool_error_message_includes_exit_code_only_when_known() {
        let with_code = ExtractionError::Tool {
            message: "ERROR: boom".into(),
            exit_code: Some(2),
        };
        assert_eq!(
            with_code.to_string(),
            "extractor failed (exit code 2): ERROR: boom"
        );

        let without_code = ExtractionError::Tool {
            message: "killed".into(),
            exit_code: None,
        };
        assert_eq!(without_code.to_string(), "extractor failed: killed");
    }

    #[test]
    fn rejection_message_names_request_and_state() {
        let error = Error::RequestRejected {
            request: "download",
            state: WorkerState::FetchingInfo,
            reason: "operation in flight".into(),
        };
        assert_eq!(
            error.to_string(),
            "download request rejected while fetching_info: operation in flight"
        );
    }

    #[test]
    fn timed_out_message_reports_seconds() {
        let error = ExtractionError::TimedOut {
            after: Duration::from_secs(90),
        };
        assert_eq!(error.to_string(), "operation timed out after 90s");
    }

    #[test]
    fn error_detail_round_trips_through_json() {
        let detail = ErrorDetail::new("network_error", "connection reset", true);
        let json = serde_json::to_string(&detail).unwrap();
        let back: ErrorDetail = serde_json::from_str(&json).unwrap();
        assert_eq!(back, detail);
    }
}
