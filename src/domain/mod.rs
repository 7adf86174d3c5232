pub mod entry;
pub mod feed;
pub mod seen;

pub use entry::{Channel, Entry};
pub use feed::{validate_feed_name, Feed, FeedKind};
pub use seen::SeenRecord;
