use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted evidence that an entry was delivered for a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    pub id: i64,
    pub feed_id: i64,
    pub link_fingerprint: u32,
    pub title_fingerprint: u32,
    pub delivered_at: DateTime<Utc>,
}
