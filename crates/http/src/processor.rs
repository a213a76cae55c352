//! Performs an HTTP request per call.
//!
//! A mapping `Object` overrides the configured request (see
//! [`super::config::Processor::merge`]). The response is written to `Result`
//! as a mapping with `status`, `status_code`, `headers` and `body`.

use super::config::TASK_TYPE;
use exporter_core::config::Fragment;
use exporter_core::registry::{self, Registry};
use exporter_core::task::context::TransformationContext;
use exporter_core::task::transformer::{self, Transformer};
use exporter_core::value::{Map, Value};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect, Url};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Override(#[from] super::config::Error),
    #[error("Missing required attribute: {}.", _0)]
    MissingRequiredAttribute(String),
    #[error("Invalid URL {url} with error: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid header {name}")]
    Header { name: String },
    #[error("Building HTTP client failed with error: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },
    #[error("Request to {url} failed with error: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

pub fn build(
    fragment: &Fragment,
    _registry: &Registry,
) -> Result<Box<dyn Transformer>, registry::Error> {
    let config: super::config::Processor = registry::decode(TASK_TYPE, fragment)?;
    Ok(Box::new(Processor { config }))
}

#[derive(Debug)]
pub struct Processor {
    config: super::config::Processor,
}

impl Processor {
    async fn execute(&self, overrides: &Map) -> Result<Value, Error> {
        let mut config = self.config.clone();
        config.merge(overrides)?;

        let client = client(&config)?;
        let url = url(&config)?;
        let headers = headers(&config)?;

        let send = || {
            let mut request = client
                .request(config.method.into(), url.clone())
                .headers(headers.clone());
            if !config.body.is_empty() {
                request = request.body(config.body.clone());
            }
            if !config.basic_auth_username.is_empty() || !config.basic_auth_password.is_empty() {
                request = request.basic_auth(
                    &config.basic_auth_username,
                    Some(&config.basic_auth_password),
                );
            }
            request.send()
        };

        let send = &send;
        let response = match &config.retry {
            Some(retry) => {
                tokio_retry::Retry::spawn(retry.strategy(), move || async move {
                    send().await.inspect_err(|e| warn!("{}", e))
                })
                .await
            }
            None => send().await,
        }
        .map_err(|source| Error::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "received response");

        let mut headers = Map::new();
        for name in response.headers().keys() {
            let joined = response
                .headers()
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            headers.insert(name.to_string(), Value::String(joined));
        }

        let body = response.bytes().await.map_err(|source| Error::Request {
            url: url.to_string(),
            source,
        })?;

        let mut result = Map::new();
        result.insert(
            "status".to_string(),
            Value::String(
                format!(
                    "{} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                )
                .trim_end()
                .to_string(),
            ),
        );
        result.insert("status_code".to_string(), Value::from(status.as_u16()));
        result.insert("headers".to_string(), Value::Map(headers));
        result.insert("body".to_string(), Value::Bytes(body.to_vec()));
        Ok(Value::Map(result))
    }
}

#[async_trait::async_trait]
impl Transformer for Processor {
    #[tracing::instrument(skip_all, name = "http")]
    async fn transform(&self, ctx: &mut TransformationContext) -> Result<(), transformer::Error> {
        let overrides = ctx
            .object
            .as_map()
            .ok_or_else(|| transformer::Error::object_type("map", ctx.object.kind()))?;
        ctx.result = self
            .execute(overrides)
            .await
            .map_err(|e| transformer::Error::leaf(TASK_TYPE, e))?;
        Ok(())
    }
}

fn client(config: &super::config::Processor) -> Result<reqwest::Client, Error> {
    let mut builder = reqwest::ClientBuilder::new()
        .pool_idle_timeout(Duration::from_millis(config.idle_conn_timeout_ms))
        .pool_max_idle_per_host(config.max_idle_conns_per_host)
        .danger_accept_invalid_certs(config.tls_insecure_skip_verify)
        .redirect(if config.follow_redirects {
            redirect::Policy::default()
        } else {
            redirect::Policy::none()
        });
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if !config.proxy_url.is_empty() {
        let proxy = reqwest::Proxy::all(&config.proxy_url)
            .map_err(|source| Error::Client { source })?;
        builder = builder.proxy(proxy);
    }
    builder.build().map_err(|source| Error::Client { source })
}

/// Parses the configured URL and sets `query_params`, replacing existing
/// parameters of the same name.
fn url(config: &super::config::Processor) -> Result<Url, Error> {
    if config.url.is_empty() {
        return Err(Error::MissingRequiredAttribute("url".to_string()));
    }
    let mut url = Url::parse(&config.url).map_err(|source| Error::Url {
        url: config.url.clone(),
        source,
    })?;
    if !config.query_params.is_empty() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !config.query_params.contains_key(k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .extend_pairs(&config.query_params);
    }
    Ok(url)
}

fn headers(config: &super::config::Processor) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::with_capacity(config.headers.len());
    for (name, value) in &config.headers {
        let invalid = || Error::Header { name: name.clone() };
        let header_name = HeaderName::try_from(name.as_str()).map_err(|_| invalid())?;
        let header_value = HeaderValue::try_from(value.as_str()).map_err(|_| invalid())?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
