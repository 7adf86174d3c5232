pub mod sqlite;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Entry, Feed, SeenRecord};
use crate::filter::Fingerprint;

pub use sqlite::SqliteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("Store lock poisoned: {0}")]
    Poisoned(String),

    #[error("A feed named {name} or with url {url} already exists")]
    FeedExists { name: String, url: String },

    #[error("Feed not found: {0}")]
    FeedNotFound(String),
}

pub trait Store {
    // Feed operations
    fn list_feeds(&self, name: Option<&str>) -> Result<Vec<Feed>, StoreError>;
    fn get_feed(&self, name: &str) -> Result<Option<Feed>, StoreError>;
    fn add_feed(&self, name: &str, url: &str) -> Result<Feed, StoreError>;
    fn update_feed_url(&self, name: &str, url: &str) -> Result<(), StoreError>;

    // History operations
    fn is_seen(&self, feed_id: i64, fingerprint: &Fingerprint) -> Result<bool, StoreError>;
    /// Stamps the feed's fetch time and records every entry as seen, all or
    /// nothing.
    fn record_delivered(
        &self,
        feed_id: i64,
        entries: &[Entry],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    /// Keeps the `limit` most recent records for the feed, returning how many
    /// were deleted.
    fn prune(&self, feed_id: i64, limit: usize) -> Result<usize, StoreError>;
    fn seen_records(&self, feed_id: i64) -> Result<Vec<SeenRecord>, StoreError>;
    fn seen_count(&self, feed_id: i64) -> Result<usize, StoreError>;
}
