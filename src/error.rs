//! Error types for every fallible layer of the pipeline.
//!
//! Fetch errors never leave their own section: the aggregator turns them into
//! fallback fragments. Configuration and delivery errors propagate to `main`.

use std::path::PathBuf;

/// Failure of a single fetch operation (one section of the document).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure, including per-request timeouts.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The endpoint answered with JSON we could not decode.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The page was fetched but could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    /// An element the scraper relies on is absent from the page.
    #[error("missing element: {0}")]
    MissingElement(&'static str),

    /// A local input file could not be read.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The source answered but had nothing to show.
    #[error("no content: {0}")]
    NoContent(String),

    /// The language model call failed or returned no content.
    #[error("LLM error: {0}")]
    Llm(String),

    /// The task panicked or was cancelled before producing a result.
    #[error("task aborted: {0}")]
    Aborted(String),
}

impl FetchError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Misuse of the aggregator itself.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    /// Two tasks were registered under the same key.
    #[error("task key {0:?} registered twice")]
    DuplicateKey(String),
}

/// Failure to load the optional YAML configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure to hand the finished document to its destination.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A required credential or recipient was not supplied.
    #[error("missing {0} (set it in the environment)")]
    MissingCredentials(&'static str),

    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("cannot build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP failure: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}
