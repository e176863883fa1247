//! Adapter settings: where the API lives, how to authenticate, where logs go.
//!
//! Settings come from code (`AdapterConfig::new` plus `with_*`), a JSON
//! document, or `REST_*` environment variables. The log level is checked
//! when it is used, not when it is stored, so a bad level in a JSON file
//! surfaces as `AdapterError::InvalidLogLevel` from `RestAdapter::new`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::AdapterError;
use crate::logging::Severity;
use crate::transport::{TransportConfig, DEFAULT_BODY_LIMIT};

pub const DEFAULT_LOG_FILE: &str = "rest_adapter.log";
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdapterConfig {
    pub hostname: String,
    pub api_key: String,
    /// Path segment inserted after the host, e.g. `v1`. Empty means none.
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default)]
    pub log_file: Option<String>,
    /// Whole-exchange timeout; written as `timeout_ms` in JSON documents.
    #[serde(default, rename = "timeout_ms", deserialize_with = "deserialize_millis")]
    pub timeout: Option<Duration>,
    #[serde(default = "default_body_limit")]
    pub body_limit: u64,
}

fn deserialize_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

fn default_body_limit() -> u64 {
    DEFAULT_BODY_LIMIT
}

fn default_ssl_verify() -> bool {
    true
}

fn default_log_level() -> String {
    "DEBUG".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

impl AdapterConfig {
    pub fn new(hostname: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            api_key: api_key.into(),
            version: String::new(),
            ssl_verify: default_ssl_verify(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            log_file: None,
            timeout: None,
            body_limit: default_body_limit(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_ssl_verify(mut self, ssl_verify: bool) -> Self {
        self.ssl_verify = ssl_verify;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn with_log_file(mut self, file: impl Into<String>) -> Self {
        self.log_file = Some(file.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_body_limit(mut self, bytes: u64) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn from_json(document: &str) -> Result<Self, AdapterError> {
        Ok(serde_json::from_str(document)?)
    }

    /// Read `REST_HOSTNAME` and `REST_API_KEY` (required) plus the optional
    /// `REST_API_VERSION`, `REST_SSL_VERIFY`, `REST_LOG_LEVEL`,
    /// `REST_LOG_DIR`, `REST_LOG_FILE`, `REST_TIMEOUT_MS` and
    /// `REST_BODY_LIMIT`.
    pub fn from_env() -> Result<Self, AdapterError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AdapterError> {
        let hostname = lookup("REST_HOSTNAME").ok_or(AdapterError::MissingSetting("REST_HOSTNAME"))?;
        let api_key = lookup("REST_API_KEY").ok_or(AdapterError::MissingSetting("REST_API_KEY"))?;
        let mut config = Self::new(hostname, api_key);

        if let Some(version) = lookup("REST_API_VERSION") {
            config.version = version;
        }
        if let Some(raw) = lookup("REST_SSL_VERIFY") {
            config.ssl_verify = parse_bool(&raw).ok_or(AdapterError::InvalidSetting {
                name: "REST_SSL_VERIFY",
                value: raw,
            })?;
        }
        if let Some(level) = lookup("REST_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(dir) = lookup("REST_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        config.log_file = lookup("REST_LOG_FILE");
        if let Some(raw) = lookup("REST_TIMEOUT_MS") {
            let millis = parse_positive(&raw).ok_or(AdapterError::InvalidSetting {
                name: "REST_TIMEOUT_MS",
                value: raw.clone(),
            })?;
            config.timeout = Some(Duration::from_millis(millis));
        }
        if let Some(raw) = lookup("REST_BODY_LIMIT") {
            config.body_limit = parse_positive(&raw).ok_or(AdapterError::InvalidSetting {
                name: "REST_BODY_LIMIT",
                value: raw.clone(),
            })?;
        }
        Ok(config)
    }

    /// `https://{hostname}/`, with `{version}/` appended when set.
    pub fn base_url(&self) -> String {
        let mut url = format!("https://{}/", self.hostname);
        if !self.version.is_empty() {
            url.push_str(&self.version);
            url.push('/');
        }
        url
    }

    /// Strict: an unknown level is a configuration error.
    pub fn log_severity(&self) -> Result<Severity, AdapterError> {
        Severity::from_label(&self.log_level)
            .ok_or_else(|| AdapterError::InvalidLogLevel(self.log_level.clone()))
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_dir
            .join(self.log_file.as_deref().unwrap_or(DEFAULT_LOG_FILE))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Session settings for `UreqTransport`: JSON accept header, the API
    /// key header, TLS verification, timeout and body limit.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            default_headers: vec![
                ("accept".to_string(), "application/json".to_string()),
                (API_KEY_HEADER.to_string(), self.api_key.clone()),
            ],
            ssl_verify: self.ssl_verify,
            timeout: self.timeout,
            body_limit: self.body_limit,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Zero would fail every request, so it is rejected along with non-numbers.
fn parse_positive(raw: &str) -> Option<u64> {
    raw.trim().parse().ok().filter(|&n| n > 0)
}
