//! Blocking REST client with per-request logging.
//!
//! # Overview
//! `RestAdapter` joins endpoints onto a configured base URL
//! (`https://{hostname}/{version}/`) and issues GET/POST/PUT/DELETE calls.
//! Every call goes through `RequestExecutor`, which logs a pre-flight line,
//! sends the request through a `Transport`, classifies the response as a
//! success when its status is in `200..=299`, and logs a post-flight line.
//!
//! # Design
//! - Non-2xx responses are data, not errors. Only a `TransportError` (the
//!   exchange never completed) comes back as `Err`.
//! - The transport and the log sink are constructed by the caller and passed
//!   in; nothing here installs global logging state.
//! - `UreqTransport` is the production transport. Tests substitute their
//!   own `Transport` implementations.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod logging;
pub mod transport;

pub use client::RestAdapter;
pub use config::AdapterConfig;
pub use error::{AdapterError, TransportError};
pub use executor::RequestExecutor;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Outcome};
pub use logging::{FileSink, LogSink, MemorySink, Severity, TracingSink};
pub use transport::{Transport, TransportConfig, UreqTransport};
