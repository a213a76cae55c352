//! HTTP step configuration.
//!
//! The static configuration of a step can be overridden per call by the keys
//! of the step's `Object` mapping, e.g. a previous step producing `url` or
//! `query_params`.

use exporter_core::retry::RetryConfig;
use exporter_core::value::{Map, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Step type name.
pub const TASK_TYPE: &str = "http";

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

/// Default idle connection timeout in milliseconds.
pub const DEFAULT_IDLE_CONN_TIMEOUT_MS: u64 = 90000;

/// Default number of idle connections kept per host.
pub const DEFAULT_MAX_IDLE_CONNS_PER_HOST: usize = 10;

/// Errors raised when applying per-call overrides.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid type for {key}, expected {expected}")]
    InvalidOverride { key: String, expected: &'static str },
    #[error("Unsupported HTTP method {0}")]
    UnsupportedMethod(String),
}

/// HTTP step configuration.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
pub struct Processor {
    /// Request URL. Required either here or as an override.
    #[serde(default)]
    pub url: String,
    /// HTTP method to use for requests.
    #[serde(default)]
    pub method: Method,
    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// URL query parameters, replacing parameters of the same name in `url`.
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,
    /// Request body.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub basic_auth_username: String,
    #[serde(default)]
    pub basic_auth_password: String,
    /// Whole request timeout. Zero disables it.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_idle_conn_timeout_ms")]
    pub idle_conn_timeout_ms: u64,
    #[serde(default = "default_max_idle_conns_per_host")]
    pub max_idle_conns_per_host: usize,
    #[serde(default)]
    pub tls_insecure_skip_verify: bool,
    /// Proxy for every scheme.
    #[serde(default)]
    pub proxy_url: String,
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,
    /// Optional retry policy. A single attempt is made when absent.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for Processor {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: Method::default(),
            headers: BTreeMap::new(),
            query_params: BTreeMap::new(),
            body: String::new(),
            basic_auth_username: String::new(),
            basic_auth_password: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            idle_conn_timeout_ms: DEFAULT_IDLE_CONN_TIMEOUT_MS,
            max_idle_conns_per_host: DEFAULT_MAX_IDLE_CONNS_PER_HOST,
            tls_insecure_skip_verify: false,
            proxy_url: String::new(),
            follow_redirects: true,
            retry: None,
        }
    }
}

impl Processor {
    /// Applies the known keys of `overrides`. Unknown keys are ignored.
    ///
    /// `headers` and `query_params` are merged into the configured ones, every
    /// other key replaces the configured value.
    pub fn merge(&mut self, overrides: &Map) -> Result<(), Error> {
        for (key, value) in overrides {
            match key.as_str() {
                "url" => self.url = string(key, value)?,
                "method" => self.method = string(key, value)?.parse()?,
                "headers" => self.headers.extend(string_map(key, value)?),
                "query_params" => self.query_params.extend(string_map(key, value)?),
                "body" => {
                    self.body = match value {
                        Value::Bytes(bytes) => String::from_utf8(bytes.clone())
                            .map_err(|_| invalid(key, "UTF-8 bytes"))?,
                        other => string(key, other)?,
                    }
                }
                "basic_auth_username" => self.basic_auth_username = string(key, value)?,
                "basic_auth_password" => self.basic_auth_password = string(key, value)?,
                "timeout_ms" => self.timeout_ms = integer(key, value)?,
                "idle_conn_timeout_ms" => self.idle_conn_timeout_ms = integer(key, value)?,
                "max_idle_conns_per_host" => {
                    self.max_idle_conns_per_host = integer(key, value)? as usize
                }
                "tls_insecure_skip_verify" => self.tls_insecure_skip_verify = boolean(key, value)?,
                "proxy_url" => self.proxy_url = string(key, value)?,
                "follow_redirects" => self.follow_redirects = boolean(key, value)?,
                _ => {}
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, expected: &'static str) -> Error {
    Error::InvalidOverride {
        key: key.to_string(),
        expected,
    }
}

fn string(key: &str, value: &Value) -> Result<String, Error> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(key, "string"))
}

fn boolean(key: &str, value: &Value) -> Result<bool, Error> {
    match value {
        Value::Bool(b) => Ok(*b),
        _ => Err(invalid(key, "bool")),
    }
}

/// Accepts integers, floats (truncated) and numeric strings.
fn integer(key: &str, value: &Value) -> Result<u64, Error> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| invalid(key, "non-negative integer")),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| invalid(key, "non-negative integer")),
        _ => Err(invalid(key, "non-negative integer")),
    }
}

fn string_map(key: &str, value: &Value) -> Result<BTreeMap<String, String>, Error> {
    let map = value.as_map().ok_or_else(|| invalid(key, "map"))?;
    map.iter()
        .map(|(k, v)| string(&format!("{key}.{k}"), v).map(|v| (k.clone(), v)))
        .collect()
}

/// HTTP method types supported by the step.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub enum Method {
    /// HTTP GET method (default).
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "" | "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "PATCH" => Ok(Method::PATCH),
            "HEAD" => Ok(Method::HEAD),
            "OPTIONS" => Ok(Method::OPTIONS),
            _ => Err(Error::UnsupportedMethod(s.to_string())),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::DELETE => reqwest::Method::DELETE,
            Method::PATCH => reqwest::Method::PATCH,
            Method::HEAD => reqwest::Method::HEAD,
            Method::OPTIONS => reqwest::Method::OPTIONS,
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_idle_conn_timeout_ms() -> u64 {
    DEFAULT_IDLE_CONN_TIMEOUT_MS
}

fn default_max_idle_conns_per_host() -> usize {
    DEFAULT_MAX_IDLE_CONNS_PER_HOST
}

fn default_follow_redirects() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn overrides(value: serde_json::Value) -> Map {
        match Value::from(value) {
            Value::Map(map) => map,
            other => panic!("expected a map, got {}", other.kind()),
        }
    }

    #[test]
    fn test_defaults() {
        let config: Processor = serde_json::from_value(json!({"url": "http://x"})).unwrap();
        assert_eq!(config.method, Method::GET);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.idle_conn_timeout_ms, DEFAULT_IDLE_CONN_TIMEOUT_MS);
        assert_eq!(config.max_idle_conns_per_host, DEFAULT_MAX_IDLE_CONNS_PER_HOST);
        assert!(config.follow_redirects);
        assert!(!config.tls_insecure_skip_verify);
        assert_eq!(config.retry, None);
        assert_eq!(
            Processor {
                url: "http://x".to_string(),
                ..Default::default()
            },
            config
        );
    }

    #[test]
    fn test_merge_overrides() {
        let mut config: Processor = serde_json::from_value(json!({
            "url": "http://configured",
            "headers": {"Accept": "application/json"},
        }))
        .unwrap();

        config
            .merge(&overrides(json!({
                "url": "http://override",
                "method": "post",
                "headers": {"X-Trace": "1"},
                "query_params": {"page": "2"},
                "timeout_ms": "1500",
                "follow_redirects": false,
                "unknown": [1, 2],
            })))
            .unwrap();

        assert_eq!(config.url, "http://override");
        assert_eq!(config.method, Method::POST);
        assert_eq!(config.headers.len(), 2);
        assert_eq!(config.headers["X-Trace"], "1");
        assert_eq!(config.query_params["page"], "2");
        assert_eq!(config.timeout_ms, 1500);
        assert!(!config.follow_redirects);
    }

    #[test]
    fn test_merge_rejects_wrong_types() {
        let mut config = Processor::default();
        let err = config.merge(&overrides(json!({"url": 5}))).unwrap_err();
        assert_eq!(err.to_string(), "Invalid type for url, expected string");

        let err = config
            .merge(&overrides(json!({"headers": {"X": 1}})))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOverride { ref key, .. } if key == "headers.X"));

        let err = config
            .merge(&overrides(json!({"method": "BREW"})))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedMethod(_)));
    }

    #[test]
    fn test_body_accepts_bytes() {
        let mut config = Processor::default();
        let mut map = Map::new();
        map.insert("body".to_string(), Value::Bytes(b"{}".to_vec()));
        config.merge(&map).unwrap();
        assert_eq!(config.body, "{}");
    }
}
