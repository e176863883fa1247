//! Error types for the REST adapter.
//!
//! # Design
//! Only transport-level failures are errors during a request. A response with
//! a non-2xx status is returned as data and flagged by `Outcome`; callers
//! inspect the status themselves. `TransportError` is what `Transport::send`
//! and `RequestExecutor::execute` return, and it reaches the caller exactly
//! as the transport produced it. `AdapterError` covers setup (configuration,
//! log file) and body decoding.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::rolling::InitError;

/// The transport could not complete the exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused or reset, DNS lookup failed, or another socket error.
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// The request could not be sent as described (malformed URL, bad header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response body was larger than the transport's configured limit.
    #[error("response body exceeds {0} bytes")]
    BodyTooLarge(u64),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Errors raised while building an adapter or decoding a response body.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid log level {0}")]
    InvalidLogLevel(String),

    #[error("missing required setting {0}")]
    MissingSetting(&'static str),

    #[error("invalid value {value:?} for setting {name}")]
    InvalidSetting { name: &'static str, value: String },

    #[error("invalid configuration document: {0}")]
    Config(#[from] serde_json::Error),

    #[error("cannot open log file {}: {source}", path.display())]
    LogFile { path: PathBuf, source: InitError },

    #[error("deserialization failed: {0}")]
    Deserialization(String),
}
