use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One syndication item as seen in a single fetch. Never persisted; only its
/// fingerprints survive delivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    pub link: String,
    /// Inline or encoded content body.
    pub content: Option<String>,
    /// Description / summary.
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub enclosure: Option<String>,
}

impl Entry {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            ..Default::default()
        }
    }

    /// The markup fragment to render: content first, then summary. Empty
    /// strings are skipped.
    pub fn raw_content(&self) -> &str {
        [self.content.as_deref(), self.summary.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or("")
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}

/// Parsed channel: feed-level metadata plus its entries in document order.
#[derive(Debug, Clone, Default)]
pub struct Channel {
    pub title: Option<String>,
    pub link: Option<String>,
    pub entries: Vec<Entry>,
}
