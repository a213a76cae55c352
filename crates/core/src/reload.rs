//! Configuration reloading.
//!
//! The reloader polls a [`Source`], skips content identical to the last
//! adopted document, and otherwise swaps the alias names in the registry and
//! parses the new document. A document that fails to parse is never adopted
//! and the registry is restored to the names of the running generation.

use crate::config::{self, Config};
use crate::registry::Registry;
use crate::source::{self, Source};
use crate::task::alias::processor::Factory as AliasFactory;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Delay before fetching again after a failed fetch.
pub const DEFAULT_FETCH_BACKOFF: Duration = Duration::from_secs(5);

/// Errors raised by a reload cycle.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Failed to reload config with error: {source}")]
    Fetch {
        #[source]
        source: source::Error,
    },
    #[error("Failed to read config with error: {source}")]
    Parse {
        #[source]
        source: config::Error,
    },
    #[error("Missing required builder attribute: {0}")]
    MissingRequiredAttribute(String),
}

/// Outcome of one poll.
#[derive(Debug)]
pub enum Reload {
    /// Content is byte-identical to the adopted document.
    Unchanged,
    /// A new generation was parsed.
    Updated(Config),
}

/// Polls a configuration source and produces new generations.
pub struct Reloader {
    source: Arc<dyn Source>,
    registry: Registry,
    interval: Duration,
    backoff: Duration,
    last_content: Option<Vec<u8>>,
    active_aliases: Vec<String>,
}

impl Reloader {
    /// Runs one reload cycle.
    pub async fn poll(&mut self) -> Result<Reload, Error> {
        let content = self
            .source
            .fetch()
            .await
            .map_err(|source| Error::Fetch { source })?;

        if self.last_content.as_deref() == Some(content.as_slice()) {
            debug!("Reloaded config with no changes");
            return Ok(Reload::Unchanged);
        }

        for name in &self.active_aliases {
            self.registry.unregister(name);
        }

        match Config::from_slice(&content, &self.registry) {
            Ok(config) => {
                self.active_aliases = config.aliases.clone();
                self.last_content = Some(content);
                info!(
                    aliases = self.active_aliases.len(),
                    jobs = config.jobs.len(),
                    "Reloaded config"
                );
                Ok(Reload::Updated(config))
            }
            Err(source) => {
                self.restore_aliases();
                Err(Error::Parse { source })
            }
        }
    }

    /// Re-binds the alias names of the running generation.
    fn restore_aliases(&self) {
        for name in &self.active_aliases {
            if let Err(e) = self.registry.register(name, AliasFactory::new(name)) {
                warn!("Restoring alias {} failed: {}", name, e);
            }
        }
    }

    /// Polls until `tx` is closed, sending every new generation.
    ///
    /// With a zero interval the reloader stops after the first adopted
    /// document and returns the parse error if that document is invalid.
    /// Fetch failures are always retried after the backoff.
    #[tracing::instrument(skip_all, name = "reloader", fields(source = %self.source.describe()))]
    pub async fn run(mut self, tx: mpsc::Sender<Config>) -> Result<(), Error> {
        loop {
            match self.poll().await {
                Ok(Reload::Updated(config)) => {
                    if tx.send(config).await.is_err() {
                        return Ok(());
                    }
                    if self.interval.is_zero() {
                        return Ok(());
                    }
                }
                Ok(Reload::Unchanged) => {}
                Err(e @ Error::Fetch { .. }) => {
                    error!("{}", e);
                    tokio::select! {
                        _ = tx.closed() => return Ok(()),
                        _ = tokio::time::sleep(self.backoff) => continue,
                    }
                }
                Err(e) => {
                    error!("{}", e);
                    if self.interval.is_zero() {
                        return Err(e);
                    }
                }
            }

            tokio::select! {
                _ = tx.closed() => return Ok(()),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

/// Builder for [`Reloader`].
#[derive(Default)]
pub struct ReloaderBuilder {
    source: Option<Arc<dyn Source>>,
    registry: Option<Registry>,
    interval: Duration,
    backoff: Option<Duration>,
}

impl ReloaderBuilder {
    pub fn new() -> ReloaderBuilder {
        ReloaderBuilder {
            ..Default::default()
        }
    }

    pub fn source(mut self, source: Arc<dyn Source>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Poll interval. Zero loads the configuration once.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = Some(backoff);
        self
    }

    pub fn build(self) -> Result<Reloader, Error> {
        Ok(Reloader {
            source: self
                .source
                .ok_or_else(|| Error::MissingRequiredAttribute("source".to_string()))?,
            registry: self
                .registry
                .ok_or_else(|| Error::MissingRequiredAttribute("registry".to_string()))?,
            interval: self.interval,
            backoff: self.backoff.unwrap_or(DEFAULT_FETCH_BACKOFF),
            last_content: None,
            active_aliases: Vec::new(),
        })
    }
}
