//! # vmail
//!
//! Delivers RSS/Atom feeds into maildir mailboxes, one mailbox per feed.
//!
//! ## Architecture
//!
//! Each feed runs through the same pipeline once per invocation:
//!
//! ```text
//! Fetcher → Parser → Filter → Render → Mail → Maildir → Store
//! ```
//!
//! - [`fetcher`]: HTTP client with a bounded request timeout
//! - [`parser`]: Charset detection and RSS/Atom parsing into entries
//! - [`filter`]: Fingerprints and duplicate removal
//! - [`render`]: HTML body for one entry
//! - [`mail`]: MIME message builder
//! - [`maildir`]: Atomic delivery into per-feed mailboxes
//! - [`store`]: SQLite feed registry and delivery history
//! - [`ingest`]: The per-feed cycle tying it all together
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a feed, delivered to the mailbox "xkcd"
//! vmail feed add xkcd https://xkcd.com/rss.xml
//!
//! # List feeds
//! vmail feed list
//!
//! # Deliver new entries of all feeds
//! vmail update
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// config, store, pipeline.
pub mod app;

/// Command-line interface using clap.
///
/// - `feed add <name> <url>` - Add a new feed
/// - `feed list [name]` - List feeds
/// - `feed set-url <name> <url>` - Change a feed's URL
/// - `update [name]` - Deliver new entries
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/vmail/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Feed`](domain::Feed): A named, URL-addressed feed
/// - [`Entry`](domain::Entry): One syndicated item of a fetch
/// - [`SeenRecord`](domain::SeenRecord): Persisted evidence of a delivery
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for feed fetching
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Fingerprinting and duplicate filtering.
pub mod filter;

/// The ingestion orchestrator.
///
/// [`Pipeline`](ingest::Pipeline) runs feeds concurrently with a semaphore
/// and reports a [`CycleReport`](ingest::CycleReport) per feed.
pub mod ingest;

/// MIME message building.
pub mod mail;

/// Maildir delivery sink.
pub mod maildir;

/// Feed document parsing.
///
/// Decodes the document charset, then converts RSS 0.9x/1.0/2.0 and
/// Atom into [`Entry`](domain::Entry) values.
pub mod parser;

/// Entry rendering.
pub mod render;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
