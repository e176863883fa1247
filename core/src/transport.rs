//! The seam between the executor and whatever actually moves bytes.
//!
//! # Design
//! `Transport` is the only thing the executor knows about the network. It
//! takes a fully described `HttpRequest` and either answers with an
//! `HttpResponse`, whatever its status, or fails with a `TransportError`
//! when no response arrived at all. Tests plug in scripted transports; the
//! crate ships `UreqTransport` for real traffic.
//!
//! `UreqTransport` plays the role of the session: it owns the `ureq::Agent`
//! (connection pool, TLS settings, timeout) and the default headers, the API
//! key among them. Nothing in it is mutated after construction, so one
//! instance can be shared across threads behind an `Arc` or a plain borrow.

use std::sync::Arc;
use std::time::Duration;

use ureq::typestate::{WithBody, WithoutBody};
use ureq::RequestBuilder;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Sends one request and returns the response the server gave.
///
/// Implementations must return non-2xx responses as `Ok`; `Err` is reserved
/// for exchanges that did not complete.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

/// Session-level settings for `UreqTransport`.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Sent on every request, before any per-request headers.
    pub default_headers: Vec<(String, String)>,
    pub ssl_verify: bool,
    /// Whole-exchange timeout. `None` keeps ureq's defaults.
    pub timeout: Option<Duration>,
    /// Largest response body read into memory, in bytes.
    pub body_limit: u64,
}

/// 64 MiB.
pub const DEFAULT_BODY_LIMIT: u64 = 64 * 1024 * 1024;

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            default_headers: Vec::new(),
            ssl_verify: true,
            timeout: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Blocking transport backed by a `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    default_headers: Vec<(String, String)>,
    body_limit: u64,
}

impl UreqTransport {
    pub fn new(config: TransportConfig) -> Self {
        // Status codes are data here; only failed exchanges become errors.
        let mut builder = ureq::Agent::config_builder().http_status_as_error(false);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout_global(Some(timeout));
        }
        if !config.ssl_verify {
            tracing::warn!("TLS certificate verification is disabled for this transport");
            builder = builder.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }

        Self {
            agent: builder.build().new_agent(),
            default_headers: config.default_headers,
            body_limit: config.body_limit,
        }
    }

    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    pub fn body_limit(&self) -> u64 {
        self.body_limit
    }

    fn prepare<B>(&self, mut builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
        for (name, value) in self.default_headers.iter().chain(&request.headers) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        for (key, value) in &request.query {
            builder = builder.query(key, value);
        }
        builder
    }

    fn call_without_body(
        &self,
        builder: RequestBuilder<WithoutBody>,
        request: &HttpRequest,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let builder = self.prepare(builder, request);
        match &request.body {
            Some(body) => builder.force_send_body().send_json(body),
            None => builder.call(),
        }
    }

    fn call_with_body(
        &self,
        builder: RequestBuilder<WithBody>,
        request: &HttpRequest,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let builder = self.prepare(builder, request);
        match &request.body {
            Some(body) => builder.send_json(body),
            None => builder.send_empty(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let response = match request.method {
            HttpMethod::Get => self.call_without_body(self.agent.get(url), request),
            HttpMethod::Delete => self.call_without_body(self.agent.delete(url), request),
            HttpMethod::Post => self.call_with_body(self.agent.post(url), request),
            HttpMethod::Put => self.call_with_body(self.agent.put(url), request),
        }?;
        into_response(response, self.body_limit)
    }
}

fn into_response(
    mut response: ureq::http::Response<ureq::Body>,
    body_limit: u64,
) -> Result<HttpResponse, TransportError> {
    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    // Raw bytes: the body may be an image or any other non-text payload.
    let body = response
        .body_mut()
        .with_config()
        .limit(body_limit)
        .read_to_vec()?;

    Ok(HttpResponse {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        body,
    })
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        let message = err.to_string();
        match err {
            ureq::Error::Timeout(_) => TransportError::Timeout(message),
            ureq::Error::Io(_) | ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => {
                TransportError::Connection(message)
            }
            ureq::Error::BadUri(_) | ureq::Error::Http(_) => TransportError::InvalidRequest(message),
            ureq::Error::BodyExceedsLimit(limit) => TransportError::BodyTooLarge(limit),
            other => TransportError::Other(Box::new(other)),
        }
    }
}
