use url::Url;

use crate::app::{AppContext, Result, VmailError};
use crate::store::Store;

/// Counts of feed cycles from one `update` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub delivered: usize,
}

impl UpdateSummary {
    /// True when feeds were processed and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        self.failed > 0 && self.succeeded == 0
    }
}

pub fn add_feed(ctx: &AppContext, name: &str, url: &str) -> Result<()> {
    let maildir = ctx.pipeline.maildir();
    // Reject names that cannot become a mailbox before touching the store.
    maildir.mailbox_path(name)?;
    let url = Url::parse(url)?;

    let feed = ctx.store.add_feed(name, url.as_str())?;
    let mailbox = maildir.ensure_mailbox(&feed.name)?;

    println!("Added feed: {} ({})", feed.name, feed.url);
    println!("  mailbox {}", mailbox.display());
    Ok(())
}

pub fn list_feeds(ctx: &AppContext, name: Option<&str>) -> Result<()> {
    let feeds = ctx.store.list_feeds(name)?;

    if feeds.is_empty() {
        return match name {
            Some(name) => Err(VmailError::FeedNotFound(name.to_string())),
            None => {
                println!("No feeds");
                Ok(())
            }
        };
    }

    for feed in feeds {
        let seen = ctx.store.seen_count(feed.id)?;
        println!(
            "{} ({} seen, last fetched {})\n  {}",
            feed.name,
            seen,
            feed.display_last_fetch(),
            feed.url
        );
    }

    Ok(())
}

pub fn set_feed_url(ctx: &AppContext, name: &str, url: &str) -> Result<()> {
    let url = Url::parse(url)?;
    ctx.store.update_feed_url(name, url.as_str())?;
    println!("Updated feed: {} ({})", name, url);
    Ok(())
}

pub async fn update_feeds(ctx: &AppContext, name: Option<&str>) -> Result<UpdateSummary> {
    let feeds = ctx.store.list_feeds(name)?;

    if feeds.is_empty() {
        if let Some(name) = name {
            return Err(VmailError::FeedNotFound(name.to_string()));
        }
        println!("No feeds to update");
        return Ok(UpdateSummary::default());
    }

    println!("Updating {} feeds...", feeds.len());

    let results = ctx.pipeline.run_all(feeds).await;
    let mut summary = UpdateSummary::default();

    for (feed, result) in results {
        match result {
            Ok(report) => {
                summary.succeeded += 1;
                summary.delivered += report.delivered;
                println!("  {}", report);
            }
            Err(e) => {
                summary.failed += 1;
                eprintln!("  Error updating {}: {}", feed, e);
            }
        }
    }

    println!(
        "Update complete: {} delivered, {} errors",
        summary.delivered, summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::config::Config;
    use crate::fetcher::{FetchError, Fetcher};
    use crate::store::StoreError;

    const XKCD: &[u8] = include_bytes!("../../testdata/xkcd.rss.xml");

    /// Serves the xkcd fixture for any URL on xkcd.com.
    struct FixtureFetcher;

    #[async_trait]
    impl Fetcher for FixtureFetcher {
        async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
            if url.starts_with("https://xkcd.com/") {
                Ok(XKCD.to_vec())
            } else {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 503,
                })
            }
        }
    }

    fn context(dir: &TempDir) -> AppContext {
        let config = Config {
            feeds_dir: Some(dir.path().join("feeds")),
            ..Default::default()
        };
        AppContext::in_memory(config, Arc::new(FixtureFetcher)).unwrap()
    }

    #[test]
    fn test_add_feed_prepares_mailbox() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);

        add_feed(&ctx, "xkcd", "https://xkcd.com/rss.xml").unwrap();

        assert!(ctx.store.get_feed("xkcd").unwrap().is_some());
        assert!(dir.path().join("feeds").join("xkcd").join("new").is_dir());
    }

    #[test]
    fn test_add_feed_validates_input() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);

        assert!(matches!(
            add_feed(&ctx, "xkcd", "not a url"),
            Err(VmailError::InvalidUrl(_))
        ));
        assert!(matches!(
            add_feed(&ctx, "../etc", "https://xkcd.com/rss.xml"),
            Err(VmailError::Delivery(_))
        ));
        assert!(ctx.store.list_feeds(None).unwrap().is_empty());

        add_feed(&ctx, "xkcd", "https://xkcd.com/rss.xml").unwrap();
        assert!(matches!(
            add_feed(&ctx, "xkcd", "https://xkcd.com/atom.xml"),
            Err(VmailError::Store(StoreError::FeedExists { .. }))
        ));
    }

    #[test]
    fn test_list_and_set_url() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        add_feed(&ctx, "xkcd", "https://xkcd.com/rss.xml").unwrap();

        list_feeds(&ctx, None).unwrap();
        list_feeds(&ctx, Some("xkcd")).unwrap();
        assert!(matches!(
            list_feeds(&ctx, Some("nope")),
            Err(VmailError::FeedNotFound(_))
        ));

        set_feed_url(&ctx, "xkcd", "https://xkcd.com/atom.xml").unwrap();
        let feed = ctx.store.get_feed("xkcd").unwrap().unwrap();
        assert_eq!(feed.url, "https://xkcd.com/atom.xml");
    }

    #[tokio::test]
    async fn test_update_summary() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        add_feed(&ctx, "xkcd", "https://xkcd.com/rss.xml").unwrap();
        add_feed(&ctx, "down", "https://down.example/feed").unwrap();

        let summary = update_feeds(&ctx, None).await.unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.delivered, 5);
        assert!(!summary.all_failed());

        let only_down = update_feeds(&ctx, Some("down")).await.unwrap();
        assert!(only_down.all_failed());
    }

    #[tokio::test]
    async fn test_update_without_feeds() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);

        let summary = update_feeds(&ctx, None).await.unwrap();
        assert_eq!(summary, UpdateSummary::default());
        assert!(!summary.all_failed());
        assert!(update_feeds(&ctx, Some("missing")).await.is_err());
    }
}
