pub mod http_fetcher;

use async_trait::async_trait;
use thiserror::Error;

pub use http_fetcher::HttpFetcher;

/// Transport-level failures: the feed could not be retrieved at all.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait Fetcher {
    /// Fetches the raw feed document at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
