//!
//! src/history.rs
//!
//! Previously imported playlists. Records keep insertion order, carry a
//! display name unique within the store, and the demo playlist has a
//! fixed id so loading it again replaces the earlier copy.
//!
//! Two stores: an in-process one and an sqlite one where each record's
//! entries live in a zstd compressed JSON blob.
//!

use std::io::Write;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::demo::DEMO_PLAYLIST;
use crate::errors::InsightsError;
use crate::types::Entry;

pub const DEMO_ID: &str = "demo-data";

const BLOB_LEVEL: i32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRecord {
    pub id: String,
    pub name: String,
    pub entries: Vec<Entry>,
    pub created_at: DateTime<Utc>,
}

impl PlaylistRecord {
    fn new(id: String, name: String, entries: Vec<Entry>) -> Self {
        Self { id, name, entries, created_at: Utc::now() }
    }

    pub fn summary(&self) -> PlaylistSummary {
        PlaylistSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            track_count: self.entries.len(),
            created_at: self.created_at,
        }
    }
}

/// A record without its entries, for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub track_count: usize,
    pub created_at: DateTime<Utc>,
}

/// `base` if unused, otherwise `stem (n).ext` (or `base (n)` without an
/// extension) for the smallest free n starting at 1.
pub fn unique_display_name<S: AsRef<str>>(base: &str, existing: &[S]) -> String {
    let taken = |name: &str| existing.iter().any(|e| e.as_ref() == name);
    let mut display = base.to_string();
    let mut counter = 1;
    while taken(&display) {
        display = match base.rsplit_once('.') {
            Some((stem, ext)) => format!("{stem} ({counter}).{ext}"),
            None => format!("{base} ({counter})"),
        };
        counter += 1;
    }
    display
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Stores an import under a fresh UUID and a unique display name.
    async fn add(&self, file_name: &str, entries: Vec<Entry>) -> Result<PlaylistRecord, InsightsError>;

    /// Drops any earlier demo record and appends a new one.
    async fn replace_demo(&self, entries: Vec<Entry>) -> Result<PlaylistRecord, InsightsError>;

    /// Summaries in insertion order.
    async fn list(&self) -> Result<Vec<PlaylistSummary>, InsightsError>;

    async fn get(&self, id: &str) -> Result<Option<PlaylistRecord>, InsightsError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &str) -> Result<bool, InsightsError>;

    /// The record with `id` when present, otherwise the newest record.
    async fn select(&self, id: Option<&str>) -> Result<Option<PlaylistRecord>, InsightsError> {
        if let Some(id) = id {
            if let Some(record) = self.get(id).await? {
                return Ok(Some(record));
            }
            debug!(id = %id, "history.select.fallback");
        }
        match self.list().await?.last() {
            Some(latest) => self.get(&latest.id).await,
            None => Ok(None),
        }
    }
}

/// Per-process history.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<PlaylistRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn add(&self, file_name: &str, entries: Vec<Entry>) -> Result<PlaylistRecord, InsightsError> {
        let mut records = self.records.lock().await;
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        let name = unique_display_name(file_name, &names);
        let record = PlaylistRecord::new(Uuid::new_v4().to_string(), name, entries);
        records.push(record.clone());
        Ok(record)
    }

    async fn replace_demo(&self, entries: Vec<Entry>) -> Result<PlaylistRecord, InsightsError> {
        let mut records = self.records.lock().await;
        records.retain(|r| r.id != DEMO_ID);
        let record = PlaylistRecord::new(DEMO_ID.to_string(), DEMO_PLAYLIST.to_string(), entries);
        records.push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<PlaylistSummary>, InsightsError> {
        Ok(self.records.lock().await.iter().map(PlaylistRecord::summary).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<PlaylistRecord>, InsightsError> {
        Ok(self.records.lock().await.iter().find(|r| r.id == id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, InsightsError> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }
}

fn compress_entries(entries: &[Entry]) -> Result<Vec<u8>, InsightsError> {
    let mut enc = zstd::stream::write::Encoder::new(Vec::new(), BLOB_LEVEL)?;
    serde_json::to_writer(&mut enc, entries)?;
    enc.flush()?;
    Ok(enc.finish()?)
}

fn decompress_entries(blob: &[u8]) -> Result<Vec<Entry>, InsightsError> {
    let dec = zstd::stream::read::Decoder::new(blob)?;
    Ok(serde_json::from_reader(dec)?)
}

/// History persisted in sqlite.
pub struct SqliteHistory {
    pool: Pool<Sqlite>
}

impl SqliteHistory {
    async fn ensure_schema(pool: &Pool<Sqlite>) -> Result<(), InsightsError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS playlists (
              seq          INTEGER PRIMARY KEY AUTOINCREMENT,
              id           TEXT NOT NULL UNIQUE,
              name         TEXT NOT NULL,
              track_count  INTEGER NOT NULL,
              entries      BLOB NOT NULL,
              created_at   TEXT NOT NULL
            );
            "
        ).execute(pool).await?;
        Ok(())
    }

    pub async fn init(database_url: &str) -> Result<Self, InsightsError> {
        let is_memory = database_url == "sqlite::memory:";

        let mut opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true);

        // WAL is file-only
        if !is_memory {
            opts = opts.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                       .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        }

        let mut pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(if is_memory {1} else {4});
        // a recycled connection would be a fresh, empty in-memory database
        if is_memory {
            pool = pool.idle_timeout(None::<Duration>).max_lifetime(None::<Duration>);
        }
        let pool = pool.connect_with(opts).await?;

        Self::ensure_schema(&pool).await?;
        info!(db = %database_url, "history.open");
        Ok(Self { pool })
    }

    async fn names(&self) -> Result<Vec<String>, InsightsError> {
        let names = sqlx::query_scalar("SELECT name FROM playlists ORDER BY seq;")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn insert(&self, record: &PlaylistRecord) -> Result<(), InsightsError> {
        let blob = compress_entries(&record.entries)?;
        sqlx::query(
            r"
            INSERT INTO playlists (id, name, track_count, entries, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5);
            "
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(record.entries.len() as i64)
        .bind(blob)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        debug!(id = %record.id, tracks = record.entries.len(), "history.insert");
        Ok(())
    }
}

fn parse_created_at(raw: &str) -> Result<DateTime<Utc>, InsightsError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| InsightsError::Parse(format!("created_at {raw}: {e}")))
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    async fn add(&self, file_name: &str, entries: Vec<Entry>) -> Result<PlaylistRecord, InsightsError> {
        let name = unique_display_name(file_name, &self.names().await?);
        let record = PlaylistRecord::new(Uuid::new_v4().to_string(), name, entries);
        self.insert(&record).await?;
        Ok(record)
    }

    async fn replace_demo(&self, entries: Vec<Entry>) -> Result<PlaylistRecord, InsightsError> {
        self.delete(DEMO_ID).await?;
        let record = PlaylistRecord::new(DEMO_ID.to_string(), DEMO_PLAYLIST.to_string(), entries);
        self.insert(&record).await?;
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<PlaylistSummary>, InsightsError> {
        let rows = sqlx::query(
            "SELECT id, name, track_count, created_at FROM playlists ORDER BY seq;"
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| -> Result<PlaylistSummary, InsightsError> {
                let created_at: String = r.try_get("created_at")?;
                let track_count: i64 = r.try_get("track_count")?;
                Ok(PlaylistSummary {
                    id: r.try_get("id")?,
                    name: r.try_get("name")?,
                    track_count: usize::try_from(track_count).unwrap_or(0),
                    created_at: parse_created_at(&created_at)?,
                })
            })
            .collect()
    }

    async fn get(&self, id: &str) -> Result<Option<PlaylistRecord>, InsightsError> {
        let row = sqlx::query(
            "SELECT id, name, entries, created_at FROM playlists WHERE id = ?1;"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(r) = row else { return Ok(None) };
        let blob: Vec<u8> = r.try_get("entries")?;
        let created_at: String = r.try_get("created_at")?;
        Ok(Some(PlaylistRecord {
            id: r.try_get("id")?,
            name: r.try_get("name")?,
            entries: decompress_entries(&blob)?,
            created_at: parse_created_at(&created_at)?,
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, InsightsError> {
        let done = sqlx::query("DELETE FROM playlists WHERE id = ?1;")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at_hour, entry, entry_with, features, track};

    fn sample() -> Vec<Entry> {
        let mut t = track("Glow", &["First", "Second"]);
        t.features = features(0.75, 0.25);
        t.features.tempo = Some(128.5);
        t.genres = vec!["House".to_string()];
        vec![entry_with(t).added_at(at_hour(22)), entry("Plain", &[])]
    }

    #[test]
    fn display_names_get_counters() {
        let existing = ["mix.csv", "mix (1).csv", "notes"];
        assert_eq!(unique_display_name("fresh.csv", &existing), "fresh.csv");
        assert_eq!(unique_display_name("mix.csv", &existing), "mix (2).csv");
        assert_eq!(unique_display_name("notes", &existing), "notes (1)");
        assert_eq!(unique_display_name("a.b.csv", &["a.b.csv"]), "a.b (1).csv");
    }

    async fn exercise(store: &dyn HistoryStore) -> Result<(), InsightsError> {
        assert!(store.select(None).await?.is_none());

        let first = store.add("mix.csv", sample()).await?;
        let second = store.add("mix.csv", Vec::new()).await?;
        let third = store.add("mix.csv", Vec::new()).await?;
        assert_eq!(first.name, "mix.csv");
        assert_eq!(second.name, "mix (1).csv");
        assert_eq!(third.name, "mix (2).csv");
        assert_ne!(first.id, second.id);
        assert!(Uuid::parse_str(&first.id).is_ok());

        let fetched = store.get(&first.id).await?;
        assert_eq!(fetched.as_ref().map(|r| &r.entries), Some(&first.entries));
        assert_eq!(fetched.map(|r| r.created_at), Some(first.created_at));

        // missing id falls back to the newest record
        let picked = store.select(Some("nope")).await?;
        assert_eq!(picked.map(|r| r.id), Some(third.id.clone()));
        let picked = store.select(Some(first.id.as_str())).await?;
        assert_eq!(picked.map(|r| r.id), Some(first.id.clone()));

        let demo = store.replace_demo(sample()).await?;
        assert_eq!(demo.id, DEMO_ID);
        assert_eq!(demo.name, DEMO_PLAYLIST);
        store.add("later.csv", Vec::new()).await?;
        store.replace_demo(Vec::new()).await?;

        let listed = store.list().await?;
        let ids: Vec<&str> = listed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.iter().filter(|id| **id == DEMO_ID).count(), 1);
        assert_eq!(ids.last(), Some(&DEMO_ID));
        assert_eq!(listed[0].track_count, 2);
        assert_eq!(listed.len(), 5);

        assert!(store.delete(&second.id).await?);
        assert!(!store.delete(&second.id).await?);
        assert!(store.get(&second.id).await?.is_none());
        assert_eq!(store.list().await?.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn memory_history_behaves() -> Result<(), InsightsError> {
        exercise(&MemoryHistory::new()).await
    }

    #[tokio::test]
    async fn sqlite_in_memory_history_behaves() -> Result<(), InsightsError> {
        let store = SqliteHistory::init("sqlite::memory:").await?;
        exercise(&store).await
    }

    #[tokio::test]
    async fn sqlite_history_survives_reopen() -> Result<(), InsightsError> {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite:{}", dir.path().join("history.db").display());

        let id = {
            let store = SqliteHistory::init(&url).await?;
            let id = store.add("keep.csv", sample()).await?.id;
            store.pool.close().await;
            id
        };

        let reopened = SqliteHistory::init(&url).await?;
        let record = reopened.get(&id).await?;
        assert_eq!(record.as_ref().map(|r| r.name.as_str()), Some("keep.csv"));
        assert_eq!(record.map(|r| r.entries), Some(sample()));
        Ok(())
    }

    #[test]
    fn blob_roundtrip_keeps_unknowns() -> Result<(), InsightsError> {
        let entries = sample();
        let blob = compress_entries(&entries)?;
        let back = decompress_entries(&blob)?;
        assert_eq!(back, entries);
        assert_eq!(back[1].track.features.energy, None);
        Ok(())
    }
}
