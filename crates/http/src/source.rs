//! Configuration source fetched over HTTP(S).

use exporter_core::source::{Error, Source};
use reqwest::{StatusCode, Url};

/// Longest response body quoted in a status error.
const MAX_ERROR_BODY: usize = 4096;

/// Fetches the configuration document with a plain GET request.
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: Url,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Source for HttpSource {
    async fn fetch(&self) -> Result<Vec<u8>, Error> {
        let fetch_error = |source: reqwest::Error| Error::Fetch {
            location: self.url.to_string(),
            source: Box::new(source),
        };

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(fetch_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(fetch_error)?;

        if status != StatusCode::OK {
            let quoted = &body[..body.len().min(MAX_ERROR_BODY)];
            return Err(Error::Status {
                location: self.url.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(quoted).into_owned(),
            });
        }
        Ok(body.to_vec())
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}
