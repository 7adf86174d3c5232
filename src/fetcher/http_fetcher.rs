use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::fetcher::{FetchError, Fetcher};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("vmail/", env!("CARGO_PKG_VERSION"));

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_options(Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_USER_AGENT)
    }

    pub fn with_options(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }
}

fn classify(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http(err)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| classify(url, e))?;
        tracing::debug!(url, bytes = body.len(), "fetched feed document");

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_defaults() {
        assert!(HttpFetcher::new().is_ok());
    }

    #[test]
    fn test_unreachable_host_is_fetch_error() {
        let fetcher =
            HttpFetcher::with_options(Duration::from_secs(2), DEFAULT_USER_AGENT).unwrap();
        // Nothing listens on the discard port.
        let result = tokio_test::block_on(fetcher.fetch("http://127.0.0.1:9/feed.xml"));
        assert!(matches!(
            result,
            Err(FetchError::Http(_)) | Err(FetchError::Timeout { .. })
        ));
    }

    #[test]
    fn test_silent_server_times_out() {
        // Connections are queued by the kernel but never answered.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/feed.xml", listener.local_addr().unwrap());

        let fetcher =
            HttpFetcher::with_options(Duration::from_secs(1), DEFAULT_USER_AGENT).unwrap();
        let result = tokio_test::block_on(fetcher.fetch(&url));
        assert!(
            matches!(&result, Err(FetchError::Timeout { url: u }) if *u == url),
            "expected timeout, got {:?}",
            result
        );
        drop(listener);
    }
}
