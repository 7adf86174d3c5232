use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::domain::{Entry, Feed, FeedKind, SeenRecord};
use crate::filter::Fingerprint;
use crate::store::{Store, StoreError};

const FEED_COLUMNS: &str = "id, type, name, url, last_fetch_time";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<(), StoreError> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn format_time(time: &DateTime<Utc>) -> String {
        // Fixed width keeps lexical order equal to chronological order.
        time.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: row.get(0)?,
            kind: FeedKind::from_i64(row.get(1)?).unwrap_or(FeedKind::Rss),
            name: row.get(2)?,
            url: row.get(3)?,
            last_fetch_time: row
                .get::<_, Option<String>>(4)?
                .and_then(|s| Self::parse_datetime(&s)),
        })
    }

    fn is_constraint_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
        )
    }
}

impl Store for SqliteStore {
    fn list_feeds(&self, name: Option<&str>) -> Result<Vec<Feed>, StoreError> {
        let conn = self.lock()?;

        let feeds = match name {
            Some(name) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {FEED_COLUMNS} FROM feeder WHERE name = ?1 ORDER BY name"
                ))?;
                let rows = stmt.query_map(params![name], Self::feed_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("SELECT {FEED_COLUMNS} FROM feeder ORDER BY name"))?;
                let rows = stmt.query_map([], Self::feed_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        Ok(feeds)
    }

    fn get_feed(&self, name: &str) -> Result<Option<Feed>, StoreError> {
        let conn = self.lock()?;

        let feed = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeder WHERE name = ?1"),
                params![name],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(feed)
    }

    fn add_feed(&self, name: &str, url: &str) -> Result<Feed, StoreError> {
        let conn = self.lock()?;
        let mut feed = Feed::new(name, url);

        conn.execute(
            "INSERT INTO feeder (type, name, url) VALUES (?1, ?2, ?3)",
            params![feed.kind.as_i64(), feed.name, feed.url],
        )
        .map_err(|e| {
            if Self::is_constraint_violation(&e) {
                StoreError::FeedExists {
                    name: name.to_string(),
                    url: url.to_string(),
                }
            } else {
                e.into()
            }
        })?;

        feed.id = conn.last_insert_rowid();
        Ok(feed)
    }

    fn update_feed_url(&self, name: &str, url: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;

        let updated = conn
            .execute(
                "UPDATE feeder SET url = ?1 WHERE name = ?2",
                params![url, name],
            )
            .map_err(|e| {
                if Self::is_constraint_violation(&e) {
                    StoreError::FeedExists {
                        name: name.to_string(),
                        url: url.to_string(),
                    }
                } else {
                    e.into()
                }
            })?;

        if updated == 0 {
            return Err(StoreError::FeedNotFound(name.to_string()));
        }
        Ok(())
    }

    fn is_seen(&self, feed_id: i64, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        let conn = self.lock()?;

        let seen = conn
            .query_row(
                "SELECT 1 FROM fedentry
                 WHERE feeder_id = ?1 AND (link_fingerprint = ?2 OR title_fingerprint = ?3)
                 LIMIT 1",
                params![
                    feed_id,
                    i64::from(fingerprint.link),
                    i64::from(fingerprint.title)
                ],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        Ok(seen.is_some())
    }

    fn record_delivered(
        &self,
        feed_id: i64,
        entries: &[Entry],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let time = Self::format_time(&now);

        // Dropping the transaction without commit rolls everything back.
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE feeder SET last_fetch_time = ?1 WHERE id = ?2",
            params![time, feed_id],
        )?;
        if updated == 0 {
            return Err(StoreError::FeedNotFound(feed_id.to_string()));
        }

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO fedentry (feeder_id, link_fingerprint, title_fingerprint, time)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for entry in entries {
                let fingerprint = Fingerprint::of(entry);
                stmt.execute(params![
                    feed_id,
                    i64::from(fingerprint.link),
                    i64::from(fingerprint.title),
                    time
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn prune(&self, feed_id: i64, limit: usize) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let deleted = conn.execute(
            "DELETE FROM fedentry WHERE feeder_id = ?1 AND id NOT IN (
                SELECT id FROM fedentry WHERE feeder_id = ?1
                ORDER BY time DESC, id DESC LIMIT ?2
            )",
            params![feed_id, limit],
        )?;

        Ok(deleted)
    }

    fn seen_records(&self, feed_id: i64) -> Result<Vec<SeenRecord>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, feeder_id, link_fingerprint, title_fingerprint, time
             FROM fedentry WHERE feeder_id = ?1 ORDER BY time DESC, id DESC",
        )?;

        let records = stmt
            .query_map(params![feed_id], |row| {
                Ok(SeenRecord {
                    id: row.get(0)?,
                    feed_id: row.get(1)?,
                    link_fingerprint: row.get::<_, i64>(2)? as u32,
                    title_fingerprint: row.get::<_, i64>(3)? as u32,
                    delivered_at: row
                        .get::<_, String>(4)
                        .ok()
                        .and_then(|s| Self::parse_datetime(&s))
                        .unwrap_or_else(Utc::now),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn seen_count(&self, feed_id: i64) -> Result<usize, StoreError> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM fedentry WHERE feeder_id = ?1",
            params![feed_id],
            |row| row.get(0),
        )?;

        Ok(usize::try_from(count).unwrap_or_default())
    }
}
