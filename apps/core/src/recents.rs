use std::collections::HashSet;
use std::path::Path;

use rusqlite::Connection;

use crate::kv_store::{self, namespaced_key, StoreError};
use crate::logging;
use crate::model::{now_epoch_secs, RecentFolder, SearchResult};

pub const RECENTS_KEY_NAME: &str = "recent-folders";

/// Bounded most-recently-used list of destination folders, stored as one JSON blob.
#[derive(Debug, Clone)]
pub struct RecencyStore {
    key: String,
    max_entries: usize,
}

impl RecencyStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            key: namespaced_key(RECENTS_KEY_NAME),
            max_entries: max_entries.max(1),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Missing or unreadable storage yields an empty list.
    pub fn load(&self, db: &Connection) -> Vec<RecentFolder> {
        let raw = match kv_store::get(db, &self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(error) => {
                logging::warn(&format!("recent folders unavailable: {error}"));
                return Vec::new();
            }
        };

        let mut entries = match serde_json::from_str::<Vec<RecentFolder>>(&raw) {
            Ok(entries) => entries,
            Err(error) => {
                logging::warn(&format!(
                    "recent folders blob is corrupt, starting empty: {error}"
                ));
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        entries.retain(|entry| seen.insert(entry.folder.path.clone()));
        entries.truncate(self.max_entries);
        entries
    }

    pub fn find(&self, db: &Connection, path: &Path) -> Option<RecentFolder> {
        self.load(db)
            .into_iter()
            .find(|entry| entry.path() == path)
    }

    pub fn record(
        &self,
        db: &Connection,
        folder: SearchResult,
    ) -> Result<Vec<RecentFolder>, StoreError> {
        self.record_at(db, folder, now_epoch_secs())
    }

    /// Moves `folder` to the front with `used_at` as its timestamp and evicts overflow.
    pub fn record_at(
        &self,
        db: &Connection,
        folder: SearchResult,
        used_at: i64,
    ) -> Result<Vec<RecentFolder>, StoreError> {
        let mut entries = self.load(db);
        entries.retain(|entry| entry.folder.path != folder.path);
        entries.insert(0, RecentFolder::new(folder, used_at));
        entries.truncate(self.max_entries);
        self.save(db, &entries)?;
        Ok(entries)
    }

    pub fn remove(&self, db: &Connection, path: &Path) -> Result<bool, StoreError> {
        let mut entries = self.load(db);
        let before = entries.len();
        entries.retain(|entry| entry.path() != path);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(db, &entries)?;
        Ok(true)
    }

    pub fn clear(&self, db: &Connection) -> Result<(), StoreError> {
        kv_store::remove(db, &self.key)?;
        Ok(())
    }

    fn save(&self, db: &Connection, entries: &[RecentFolder]) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(entries)?;
        kv_store::set(db, &self.key, &encoded)
    }
}
