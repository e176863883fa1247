//! HTTP request and response types passed between the executor and a
//! transport.
//!
//! # Design
//! These types describe one exchange as plain data. The executor reads
//! `HttpRequest` to build its log lines and hands it to a `Transport`; the
//! transport answers with an `HttpResponse`, which is returned to the caller
//! untouched. Nothing here outlives a single request/response cycle.
//!
//! All fields use owned types (`String`, `Vec`) so a request can be cloned
//! into a transport or a test double without lifetime concerns.

use std::fmt;

use serde::de::DeserializeOwned;

use crate::error::AdapterError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute. `query` keeps insertion order so the log line and the
/// wire see the pairs in the order the caller supplied them. `headers` holds
/// per-request extras only; session-wide defaults such as the API key belong
/// to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// An HTTP response described as plain data.
///
/// Produced by a `Transport`. `reason` is the status line's reason phrase
/// (for example `"Not Found"`), which ends up in the post-flight log line.
/// `body` holds the raw bytes; `text` and `json` decode on demand, so an
/// image or any other non-UTF-8 payload still comes back as a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::classify(self)
    }

    /// Case-insensitive header lookup; returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body as UTF-8 text.
    pub fn text(&self) -> Result<&str, AdapterError> {
        std::str::from_utf8(&self.body).map_err(|e| AdapterError::Deserialization(e.to_string()))
    }

    /// Deserialize the body as JSON. Does not look at the status code.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AdapterError> {
        serde_json::from_slice(&self.body).map_err(|e| AdapterError::Deserialization(e.to_string()))
    }
}

/// Classified result of one request/response cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub status_code: u16,
    pub reason: String,
}

impl Outcome {
    /// Success is decided by the numeric range alone, never by method.
    pub fn classify(response: &HttpResponse) -> Self {
        Self {
            success: is_success_status(response.status),
            status_code: response.status,
            reason: response.reason.clone(),
        }
    }
}

/// `200..=299`, both ends inclusive.
pub fn is_success_status(status: u16) -> bool {
    (200..=299).contains(&status)
}
