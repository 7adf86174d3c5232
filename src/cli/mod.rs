pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vmail")]
#[command(about = "Delivers RSS and Atom feeds into maildir mailboxes", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ~/.config/vmail/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of feeds processed in parallel (overrides fetch.workers)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage feeds
    Feed {
        #[command(subcommand)]
        action: FeedAction,
    },
    /// Fetch feeds and deliver new entries
    Update {
        /// Only update this feed
        name: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum FeedAction {
    /// Add a new feed
    Add {
        /// Feed name, also used as its mailbox name
        name: String,
        /// URL of the feed
        url: String,
    },
    /// List feeds
    List {
        /// Only show this feed
        name: Option<String>,
    },
    /// Change the URL of a feed
    SetUrl {
        /// Feed name
        name: String,
        /// New URL of the feed
        url: String,
    },
}
