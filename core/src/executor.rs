//! Send one request, classify the response, log both sides.
//!
//! # Design
//! `RequestExecutor` holds a transport and a log sink and nothing else, so
//! each call is an independent request/response/log cycle. A call emits
//! exactly two records:
//!
//! ```text
//! DEBUG  method=GET, url=https://host/v1/items, params=['page: 2']
//! DEBUG  method=GET, url=https://host/v1/items, params=['page: 2'], success=True, status_code=200, message=OK
//! ```
//!
//! The second record is at ERROR when the status falls outside `200..=299`,
//! and is replaced by the transport error's text when no response came back.
//! A failed classification is still returned as `Ok`; only transport errors
//! become `Err`, and they are passed through untouched.

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, Outcome};
use crate::logging::{LogSink, Severity};
use crate::transport::Transport;

/// Logs and dispatches requests through a caller-supplied transport.
///
/// Both collaborators may be owned values, borrows or `Arc`s; the executor
/// never mutates either one.
#[derive(Debug, Clone)]
pub struct RequestExecutor<T, S> {
    transport: T,
    sink: S,
}

impl<T: Transport, S: LogSink> RequestExecutor<T, S> {
    pub fn new(transport: T, sink: S) -> Self {
        Self { transport, sink }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Send `request`, logging before and after.
    ///
    /// Returns the transport's response whether or not it classifies as a
    /// success. No retry is attempted on any status or error.
    pub fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let pre = preflight_line(request);
        self.sink.log(Severity::Debug, &pre);

        let response = match self.transport.send(request) {
            Ok(response) => response,
            Err(e) => {
                self.sink.log(Severity::Error, &e.to_string());
                return Err(e);
            }
        };

        let outcome = Outcome::classify(&response);
        let severity = if outcome.success {
            Severity::Debug
        } else {
            Severity::Error
        };
        self.sink.log(severity, &postflight_line(&pre, &outcome));
        Ok(response)
    }

    /// Send `request` without emitting any log record.
    pub fn send_unlogged(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.transport.send(request)
    }
}

/// `['k1: v1', 'k2: v2']`, or `[]` when there are no pairs.
pub fn render_params(pairs: &[(String, String)]) -> String {
    let items: Vec<String> = pairs
        .iter()
        .map(|(key, value)| format!("'{key}: {value}'"))
        .collect();
    format!("[{}]", items.join(", "))
}

pub fn preflight_line(request: &HttpRequest) -> String {
    format!(
        "method={}, url={}, params={}",
        request.method,
        request.url,
        render_params(&request.query)
    )
}

pub fn postflight_line(preflight: &str, outcome: &Outcome) -> String {
    format!(
        "{preflight}, success={}, status_code={}, message={}",
        if outcome.success { "True" } else { "False" },
        outcome.status_code,
        outcome.reason
    )
}
