//! `RestAdapter`: base URL plus executor, with one method per HTTP verb.
//!
//! # Design
//! The adapter joins an endpoint onto its base URL, wraps the result in an
//! `HttpRequest` and hands it to its `RequestExecutor`. Every verb goes
//! through `request`, so logging and classification behave identically for
//! all of them. The adapter keeps no per-call state; the transport (the
//! session) and the sink are fixed at construction.

use serde_json::Value;

use crate::config::AdapterConfig;
use crate::error::{AdapterError, TransportError};
use crate::executor::RequestExecutor;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::logging::{FileSink, LogSink, Severity};
use crate::transport::{Transport, UreqTransport};

/// Convenience client for one REST service.
///
/// `params` arguments are query pairs in the order they should appear on the
/// wire and in the log; pass `&[]` for none.
pub struct RestAdapter<T = UreqTransport, S = FileSink> {
    base_url: String,
    executor: RequestExecutor<T, S>,
}

impl RestAdapter {
    /// Build the production adapter: ureq transport with the API key header,
    /// logging to the configured file at the configured level.
    pub fn new(config: &AdapterConfig) -> Result<Self, AdapterError> {
        let threshold = config.log_severity()?;
        let sink = FileSink::open(config.log_path(), threshold)?;
        let transport = UreqTransport::new(config.transport_config());
        Ok(Self::from_base_url(&config.base_url(), transport, sink))
    }
}

impl<T: Transport, S: LogSink> RestAdapter<T, S> {
    /// Use the config for the base URL only; transport and sink come from
    /// the caller. The configured log level is still validated.
    pub fn with_parts(config: &AdapterConfig, transport: T, sink: S) -> Result<Self, AdapterError> {
        config.log_severity()?;
        Ok(Self::from_base_url(&config.base_url(), transport, sink))
    }

    pub fn from_base_url(base_url: &str, transport: T, sink: S) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            executor: RequestExecutor::new(transport, sink),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn executor(&self) -> &RequestExecutor<T, S> {
        &self.executor
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    pub fn request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: &[(&str, &str)],
        data: Option<Value>,
    ) -> Result<HttpResponse, TransportError> {
        let request = self.build(method, endpoint, params, data);
        self.executor.execute(&request)
    }

    /// Same as `request` without a body, but emits no log records.
    pub fn request_unlogged(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        let request = self.build(method, endpoint, params, None);
        self.executor.send_unlogged(&request)
    }

    pub fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<HttpResponse, TransportError> {
        self.request(HttpMethod::Get, endpoint, params, None)
    }

    pub fn post(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        data: Option<Value>,
    ) -> Result<HttpResponse, TransportError> {
        self.request(HttpMethod::Post, endpoint, params, data)
    }

    pub fn put(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        data: Option<Value>,
    ) -> Result<HttpResponse, TransportError> {
        self.request(HttpMethod::Put, endpoint, params, data)
    }

    pub fn delete(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<HttpResponse, TransportError> {
        self.request(HttpMethod::Delete, endpoint, params, None)
    }

    /// Log through the adapter's sink. Unknown labels are recorded at
    /// `Severity::NotSet`, which the shipped sinks ignore.
    pub fn log(&self, level: &str, message: &str) {
        self.executor
            .sink()
            .log(Severity::from_label_lenient(level), message);
    }

    fn build(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: &[(&str, &str)],
        data: Option<Value>,
    ) -> HttpRequest {
        let mut request =
            HttpRequest::new(method, self.url_for(endpoint)).with_query(params.iter().copied());
        request.body = data;
        request
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::logging::MemorySink;

    /// Answers every request with 200 and keeps a copy of what it was sent.
    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingTransport {
        fn sent(&self) -> Vec<HttpRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.sent.lock().unwrap().push(request.clone());
            Ok(HttpResponse {
                status: 200,
                reason: "OK".to_string(),
                headers: Vec::new(),
                body: Vec::new(),
            })
        }
    }

    fn adapter<'a>(
        transport: &'a RecordingTransport,
        sink: &'a MemorySink,
    ) -> RestAdapter<&'a RecordingTransport, &'a MemorySink> {
        let config = AdapterConfig::new("host", "key").with_version("v1");
        RestAdapter::with_parts(&config, transport, sink).unwrap()
    }

    #[test]
    fn endpoint_is_joined_onto_base_url() {
        let transport = RecordingTransport::default();
        let sink = MemorySink::new();
        let adapter = adapter(&transport, &sink);

        assert_eq!(adapter.base_url(), "https://host/v1/");
        assert_eq!(adapter.url_for("items"), "https://host/v1/items");
        assert_eq!(adapter.url_for("/items/7"), "https://host/v1/items/7");
    }

    #[test]
    fn from_base_url_appends_missing_slash() {
        let transport = RecordingTransport::default();
        let sink = MemorySink::new();
        let adapter = RestAdapter::from_base_url("http://127.0.0.1:3000/v1", &transport, &sink);
        assert_eq!(adapter.url_for("items"), "http://127.0.0.1:3000/v1/items");
    }

    #[test]
    fn verbs_map_to_methods_and_carry_bodies() {
        let transport = RecordingTransport::default();
        let sink = MemorySink::new();
        let adapter = adapter(&transport, &sink);

        adapter.get("items", &[("page", "1")]).unwrap();
        adapter
            .post("items", &[], Some(json!({"name": "widget"})))
            .unwrap();
        adapter
            .put("items/1", &[], Some(json!({"quantity": 3})))
            .unwrap();
        adapter.delete("items/1", &[]).unwrap();

        let sent = transport.sent();
        let methods: Vec<HttpMethod> = sent.iter().map(|r| r.method).collect();
        assert_eq!(
            methods,
            vec![HttpMethod::Get, HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete]
        );
        assert_eq!(sent[0].query, vec![("page".to_string(), "1".to_string())]);
        assert!(sent[0].body.is_none());
        assert_eq!(sent[1].body, Some(json!({"name": "widget"})));
        assert_eq!(sent[2].url, "https://host/v1/items/1");
        assert!(sent[3].body.is_none());
    }

    #[test]
    fn every_verb_logs_pre_and_post_lines() {
        let transport = RecordingTransport::default();
        let sink = MemorySink::new();
        let adapter = adapter(&transport, &sink);

        adapter.get("items", &[("page", "1")]).unwrap();
        assert_eq!(
            sink.messages(),
            vec![
                "method=GET, url=https://host/v1/items, params=['page: 1']",
                "method=GET, url=https://host/v1/items, params=['page: 1'], success=True, status_code=200, message=OK",
            ]
        );
    }

    #[test]
    fn unlogged_request_skips_sink() {
        let transport = RecordingTransport::default();
        let sink = MemorySink::new();
        let adapter = adapter(&transport, &sink);

        adapter
            .request_unlogged(HttpMethod::Get, "health", &[])
            .unwrap();
        assert_eq!(transport.sent().len(), 1);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn log_maps_labels_leniently() {
        let transport = RecordingTransport::default();
        let sink = MemorySink::new();
        let adapter = adapter(&transport, &sink);

        adapter.log("warning", "low disk");
        adapter.log("FATAL", "gone");
        adapter.log("VERBOSE", "unknown level");
        assert_eq!(
            sink.records(),
            vec![
                (Severity::Warning, "low disk".to_string()),
                (Severity::Critical, "gone".to_string()),
                (Severity::NotSet, "unknown level".to_string()),
            ]
        );
    }

    #[test]
    fn with_parts_rejects_unknown_log_level() {
        let transport = RecordingTransport::default();
        let sink = MemorySink::new();
        let config = AdapterConfig::new("host", "key").with_log_level("LOUD");
        let err = RestAdapter::with_parts(&config, &transport, &sink).err().unwrap();
        assert!(matches!(err, AdapterError::InvalidLogLevel(_)));
    }

    #[test]
    fn new_creates_log_file_at_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = AdapterConfig::new("api.example.com", "key")
            .with_log_dir(dir.path().join("logs"))
            .with_log_file("client.log")
            .with_log_level("info");

        let adapter = RestAdapter::new(&config).unwrap();
        assert_eq!(adapter.base_url(), "https://api.example.com/");
        assert_eq!(adapter.executor().sink().threshold(), Severity::Info);

        adapter.log("DEBUG", "below threshold");
        adapter.log("ERROR", "recorded");
        // Dropping the adapter flushes the sink's background writer.
        drop(adapter);
        let contents = std::fs::read_to_string(dir.path().join("logs/client.log")).unwrap();
        assert!(!contents.contains("below threshold"));
        assert!(contents.contains(" - ERROR - recorded"));
    }

    #[test]
    fn new_rejects_unknown_log_level_before_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = AdapterConfig::new("host", "key")
            .with_log_dir(dir.path())
            .with_log_level("chatty");
        assert!(matches!(
            RestAdapter::new(&config).err().unwrap(),
            AdapterError::InvalidLogLevel(_)
        ));
        assert!(!config.log_path().exists());
    }
}
