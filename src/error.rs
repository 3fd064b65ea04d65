//! Error types for each layer of the collector.
//!
//! - [`FetchError`]: anything that can go wrong while acquiring or reading a
//!   page. These never escape an adapter; they become absent fields plus a
//!   logged warning.
//! - [`ConfigError`]: invalid configuration, fatal at startup.
//! - [`SinkError`]: failure writing a final result file, fatal for the run.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while acquiring a document through either fetch tier.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, reset, TLS error.
    #[error("network failure for {url}: {message}")]
    Network { url: String, message: String },

    /// The request or browser navigation exceeded its time budget.
    #[error("timed out after {secs}s fetching {url}")]
    Timeout { url: String, secs: u64 },

    /// The server answered outside the 2xx range.
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    /// Browser automation failed (launch, navigation, script evaluation).
    #[error("browser render failed: {0}")]
    Render(String),

    /// Every candidate selector for a required field came back empty.
    #[error("no selector matched required field `{field}`")]
    NoSelectorMatch { field: &'static str },

    /// The body could not be decoded into the expected shape.
    #[error("could not parse response from {url}: {message}")]
    Parse { url: String, message: String },
}

impl FetchError {
    /// Classify a `reqwest` error, keeping timeouts distinct from other transport failures.
    pub fn from_reqwest(url: &str, err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            FetchError::Parse {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid CSS selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    #[error("invalid URL `{url}` for `{name}`: {source}")]
    Url {
        name: String,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Failure writing a final result file.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}
