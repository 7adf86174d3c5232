use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source format stored in the `type` column of `feeder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedKind {
    Rss,
}

impl FeedKind {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Rss => 1,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Rss),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub kind: FeedKind,
    pub name: String,
    pub url: String,
    pub last_fetch_time: Option<DateTime<Utc>>,
}

impl Feed {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: 0,
            kind: FeedKind::Rss,
            name: name.into(),
            url: url.into(),
            last_fetch_time: None,
        }
    }

    /// Last fetch time formatted for listings.
    pub fn display_last_fetch(&self) -> String {
        self.last_fetch_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string())
    }
}

/// Checks that a feed name can double as a mailbox directory name.
pub fn validate_feed_name(name: &str) -> std::result::Result<(), String> {
    if name.trim().is_empty() {
        return Err("feed name must not be empty".into());
    }
    if name.starts_with('.') {
        return Err(format!("feed name must not start with '.': {}", name));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(format!("feed name must not contain path separators: {}", name));
    }
    // The name is also the local part of the recipient address.
    if name
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || "<>()[],;:@\"".contains(c))
    {
        return Err(format!("feed name is not a valid mailbox name: {:?}", name));
    }
    Ok(())
}
