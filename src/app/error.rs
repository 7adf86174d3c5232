use thiserror::Error;

use crate::config::ConfigError;
use crate::fetcher::FetchError;
use crate::mail::BuildError;
use crate::maildir::DeliveryError;
use crate::parser::ParseError;
use crate::render::RenderError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum VmailError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Feed parsing error: {0}")]
    Parse(#[from] ParseError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Message error: {0}")]
    Build(#[from] BuildError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, VmailError>;
