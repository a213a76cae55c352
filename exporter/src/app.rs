use crate::config::AppConfig;
use exporter_core::registry::{self, Registry};
use exporter_core::reload::{self, ReloaderBuilder};
use exporter_core::scheduler::Scheduler;
use exporter_core::source::{FileSource, Source};
use exporter_http::source::HttpSource;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use url::Url;

/// Errors that can occur during application execution.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Registering the built-in step types failed.
    #[error("Registering step types failed with error: {source}")]
    Registry {
        #[source]
        source: registry::Error,
    },
    /// The reloader could not be built or gave up on an invalid document.
    #[error(transparent)]
    Reload(#[from] reload::Error),
    /// The reloader task panicked or was aborted.
    #[error("Reloader task failed with error: {source}")]
    Join {
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Main application that keeps the running jobs in line with the
/// configuration document.
pub struct App {
    /// Global application configuration.
    pub config: AppConfig,
}

impl App {
    /// Runs until the configuration source is exhausted and its jobs have
    /// finished, or until Ctrl-C.
    pub async fn start(self) -> Result<(), Error> {
        self.run_until(shutdown_signal()).await
    }

    /// Runs until the configuration source is exhausted and its jobs have
    /// finished, or until `shutdown` completes.
    ///
    /// Every configuration adopted by the reloader replaces the running
    /// generation of jobs. On shutdown the running generation is cancelled.
    #[tracing::instrument(skip_all, name = "app", fields(config_path = %self.config.config_path))]
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let registry = Registry::new();
        exporter_core::task::register_builtins(&registry)
            .map_err(|source| Error::Registry { source })?;
        exporter_http::register(&registry).map_err(|source| Error::Registry { source })?;

        let reloader = ReloaderBuilder::new()
            .source(source(&self.config.config_path))
            .registry(registry)
            .interval(self.config.reload_interval)
            .build()?;

        let (tx, mut rx) = mpsc::channel(1);
        let mut reloader = tokio::spawn(reloader.run(tx));
        let mut scheduler = Scheduler::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                config = rx.recv() => match config {
                    Some(config) => {
                        scheduler.launch(config);
                    }
                    None => break,
                },
                _ = &mut shutdown => {
                    info!("Shutting down");
                    reloader.abort();
                    scheduler.cancel();
                    return Ok(());
                }
            }
        }

        (&mut reloader)
            .await
            .map_err(|source| Error::Join { source })??;

        info!("Configuration source finished, waiting for running jobs");
        let interrupted = tokio::select! {
            _ = scheduler.wait() => false,
            _ = &mut shutdown => true,
        };
        if interrupted {
            info!("Shutting down");
            scheduler.cancel();
        }
        Ok(())
    }
}

/// Picks the source for `location`: an `http(s)` URL with a host is fetched
/// over HTTP, anything else is read as a local file.
pub fn source(location: &str) -> Arc<dyn Source> {
    match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
            Arc::new(HttpSource::new(url))
        }
        _ => Arc::new(FileSource::new(location)),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
