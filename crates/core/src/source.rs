//! Configuration sources.
//!
//! A source yields the raw bytes of the configuration document. The reloader
//! polls it and decides whether the content changed.

use std::path::PathBuf;

/// Errors raised while fetching configuration bytes.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Cannot read {path:?} with error: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot fetch {location} with error: {source}")]
    Fetch {
        location: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Unexpected status code when fetching {location}: {status}, expecting 200; response: {body:?}")]
    Status {
        location: String,
        status: u16,
        body: String,
    },
}

/// Provider of configuration document bytes.
#[async_trait::async_trait]
pub trait Source: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, Error>;

    /// Human readable location used in logs.
    fn describe(&self) -> String;
}

/// Reads the configuration from a local file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Source for FileSource {
    async fn fetch(&self) -> Result<Vec<u8>, Error> {
        tokio::fs::read(&self.path).await.map_err(|source| Error::Read {
            path: self.path.clone(),
            source,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
