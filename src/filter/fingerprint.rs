use serde::{Deserialize, Serialize};

use crate::domain::Entry;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1 hash.
pub const fn fnv32(data: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < data.len() {
        hash = hash.wrapping_mul(FNV_PRIME);
        hash ^= data[i] as u32;
        i += 1;
    }
    hash
}

/// Independent hashes of an entry's link and title text.
///
/// Two entries are the same occurrence when either half matches; collisions
/// count as duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub link: u32,
    pub title: u32,
}

impl Fingerprint {
    pub fn of(entry: &Entry) -> Self {
        Self {
            link: fnv32(entry.link.as_bytes()),
            title: fnv32(entry.title.as_bytes()),
        }
    }

    pub fn overlaps(&self, other: &Fingerprint) -> bool {
        self.link == other.link || self.title == other.title
    }
}
