//! Duplicate filtering.
//!
//! Entries arrive newest first. The batch pass keeps the first entry for any
//! title or link; the history pass drops entries whose fingerprints were
//! already delivered for the feed. Neither pass writes to the store.

mod fingerprint;

use std::collections::HashSet;

use crate::domain::Entry;
use crate::store::{Store, StoreError};

pub use fingerprint::{fnv32, Fingerprint};

/// Keeps an entry only if no earlier kept entry shares its title or link.
pub fn dedup_batch(entries: Vec<Entry>) -> Vec<Entry> {
    let mut titles = HashSet::new();
    let mut links = HashSet::new();
    let mut kept = Vec::with_capacity(entries.len());

    for entry in entries {
        if titles.contains(&entry.title) || links.contains(&entry.link) {
            tracing::trace!(title = %entry.title, "dropping duplicate within batch");
            continue;
        }
        titles.insert(entry.title.clone());
        links.insert(entry.link.clone());
        kept.push(entry);
    }

    kept
}

/// Drops entries whose link or title fingerprint is already recorded for
/// `feed_id`. Order is preserved.
pub fn drop_seen<S: Store + ?Sized>(
    store: &S,
    feed_id: i64,
    entries: Vec<Entry>,
) -> Result<Vec<Entry>, StoreError> {
    let mut fresh = Vec::with_capacity(entries.len());
    for entry in entries {
        if store.is_seen(feed_id, &Fingerprint::of(&entry))? {
            continue;
        }
        fresh.push(entry);
    }
    Ok(fresh)
}

/// Both passes, batch first.
pub fn filter_new<S: Store + ?Sized>(
    store: &S,
    feed_id: i64,
    entries: Vec<Entry>,
) -> Result<Vec<Entry>, StoreError> {
    drop_seen(store, feed_id, dedup_batch(entries))
}
