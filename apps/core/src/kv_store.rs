use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::config::{Config, APP_DIR_NAME};

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    Encode(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(error) => write!(f, "sqlite error: {error}"),
            Self::Io(error) => write!(f, "io error: {error}"),
            Self::Encode(error) => write!(f, "encode error: {error}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)";

/// Prefixes `name` with the application namespace, e.g. `folderdrop:recent-folders`.
pub fn namespaced_key(name: &str) -> String {
    format!("{APP_DIR_NAME}:{name}")
}

pub fn open_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    conn.execute(SCHEMA, [])?;
    Ok(conn)
}

pub fn open_file(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute(SCHEMA, [])?;
    Ok(conn)
}

pub fn open_from_config(cfg: &Config) -> Result<Connection, StoreError> {
    open_file(&cfg.kv_db_path)
}

pub fn get(db: &Connection, key: &str) -> Result<Option<String>, StoreError> {
    let value = db
        .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

pub fn set(db: &Connection, key: &str, value: &str) -> Result<(), StoreError> {
    db.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn remove(db: &Connection, key: &str) -> Result<bool, StoreError> {
    let removed = db.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
    Ok(removed > 0)
}

#[cfg(test)]
mod tests {
    use super::{get, namespaced_key, open_memory, remove, set};

    #[test]
    fn set_overwrites_previous_value() {
        let db = open_memory().unwrap();
        set(&db, "k", "one").unwrap();
        set(&db, "k", "two").unwrap();
        assert_eq!(get(&db, "k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn remove_reports_missing_key() {
        let db = open_memory().unwrap();
        assert!(!remove(&db, "absent").unwrap());
        set(&db, "present", "v").unwrap();
        assert!(remove(&db, "present").unwrap());
        assert_eq!(get(&db, "present").unwrap(), None);
    }

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(namespaced_key("recent-folders"), "folderdrop:recent-folders");
    }
}
