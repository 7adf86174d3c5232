//! Per-feed ingestion cycle:
//! fetch → parse → filter → render → build → deliver → record → prune.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::app::{Result, VmailError};
use crate::domain::{Entry, Feed};
use crate::fetcher::Fetcher;
use crate::filter::{dedup_batch, drop_seen};
use crate::mail::{Address, Message};
use crate::maildir::Maildir;
use crate::parser::FeedParser;
use crate::render::render_entry;
use crate::store::Store;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_PRUNE_LIMIT: usize = 1000;

/// Addressing and retention settings shared by every feed.
#[derive(Debug, Clone)]
pub struct DeliveryOptions {
    pub sender: Address,
    pub domain: String,
    pub prune_limit: usize,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            sender: Address::sender(),
            domain: "localhost".to_string(),
            prune_limit: DEFAULT_PRUNE_LIMIT,
        }
    }
}

/// Outcome of one feed's cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub feed: String,
    /// Entries in the fetched document.
    pub seen: usize,
    /// Entries left after batch and history filtering.
    pub candidates: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} seen, {} new, {} delivered",
            self.feed, self.seen, self.candidates, self.delivered
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}

pub struct Pipeline<S> {
    store: Arc<S>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    parser: FeedParser,
    maildir: Arc<Maildir>,
    options: Arc<DeliveryOptions>,
    semaphore: Arc<Semaphore>,
}

impl<S> Clone for Pipeline<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            fetcher: self.fetcher.clone(),
            parser: self.parser.clone(),
            maildir: self.maildir.clone(),
            options: self.options.clone(),
            semaphore: self.semaphore.clone(),
        }
    }
}

impl<S: Store + Send + Sync + 'static> Pipeline<S> {
    pub fn new(
        store: Arc<S>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        maildir: Maildir,
        options: DeliveryOptions,
    ) -> Self {
        Self::with_workers(store, fetcher, maildir, options, DEFAULT_WORKERS)
    }

    pub fn with_workers(
        store: Arc<S>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        maildir: Maildir,
        options: DeliveryOptions,
        workers: usize,
    ) -> Self {
        Self {
            store,
            fetcher,
            parser: FeedParser::new(),
            maildir: Arc::new(maildir),
            options: Arc::new(options),
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub fn maildir(&self) -> &Maildir {
        &self.maildir
    }

    /// Runs every feed concurrently, bounded by the worker count. Results
    /// come back in input order; one feed failing never stops the others.
    pub async fn run_all(&self, feeds: Vec<Feed>) -> Vec<(String, Result<CycleReport>)> {
        let mut handles = Vec::new();

        for feed in feeds {
            let pipeline = self.clone();
            let semaphore = self.semaphore.clone();
            let name = feed.name.clone();

            let handle = tokio::spawn(async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => pipeline.run_feed(&feed).await,
                    Err(_) => Err(VmailError::Other("worker pool closed".into())),
                };
                if let Err(e) = &result {
                    error!(feed = %feed.name, "Feed cycle failed: {}", e);
                }
                result
            });

            handles.push((name, handle));
        }

        let mut results = Vec::new();
        for (name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!(feed = %name, "Task join error: {}", e);
                    Err(VmailError::Other(format!("feed task failed: {}", e)))
                }
            };
            results.push((name, result));
        }

        results
    }

    /// One complete cycle for `feed`.
    ///
    /// Fetch, parse and store failures abort the cycle. A failure to render
    /// or deliver a single entry only skips that entry, which stays
    /// unrecorded and is retried on the next run.
    pub async fn run_feed(&self, feed: &Feed) -> Result<CycleReport> {
        let body = self.fetcher.fetch(&feed.url).await?;
        let channel = self.parser.parse(&body)?;

        let mut report = CycleReport {
            feed: feed.name.clone(),
            seen: channel.entries.len(),
            ..Default::default()
        };

        let batch = dedup_batch(channel.entries);
        let candidates = drop_seen(self.store.as_ref(), feed.id, batch)?;
        report.candidates = candidates.len();

        if candidates.is_empty() {
            debug!(feed = %feed.name, seen = report.seen, "No new entries");
            info!(feed = %feed.name, "{}", report);
            return Ok(report);
        }

        let delivered = self.deliver_entries(feed, candidates, &mut report);

        self.store
            .record_delivered(feed.id, &delivered, Utc::now())?;
        let pruned = self.store.prune(feed.id, self.options.prune_limit)?;
        if pruned > 0 {
            debug!(feed = %feed.name, pruned, "Pruned delivery history");
        }

        info!(feed = %feed.name, "{}", report);
        Ok(report)
    }

    fn deliver_entries(
        &self,
        feed: &Feed,
        candidates: Vec<Entry>,
        report: &mut CycleReport,
    ) -> Vec<Entry> {
        let mut delivered = Vec::with_capacity(candidates.len());

        for entry in candidates {
            let result = self
                .compose(feed, &entry)
                .and_then(|message| {
                    self.maildir
                        .deliver(&feed.name, &message)
                        .map_err(VmailError::from)
                });

            match result {
                Ok(path) => {
                    debug!(feed = %feed.name, title = %entry.display_title(), file = %path.display(), "Delivered entry");
                    delivered.push(entry);
                }
                Err(e) => {
                    warn!(feed = %feed.name, link = %entry.link, "Skipping entry: {}", e);
                    report.failed += 1;
                }
            }
        }

        report.delivered = delivered.len();
        delivered
    }

    /// Renders `entry` and serializes it as a message addressed to the
    /// feed's mailbox.
    pub fn compose(&self, feed: &Feed, entry: &Entry) -> Result<Vec<u8>> {
        let html = render_entry(entry)?;
        let to = Address::parse(&format!("{}@{}", feed.name, self.options.domain))?;

        let mut message = Message::new(&self.options.sender, entry.display_title(), &[to]);
        message.set_date(entry.published_at.unwrap_or_else(Utc::now));
        message.add_html(&html);

        Ok(message.to_bytes()?)
    }
}
