use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Folder,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub path: PathBuf,
    pub display_name: String,
    pub kind: EntryKind,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub created_epoch_secs: Option<i64>,
    #[serde(default)]
    pub modified_epoch_secs: Option<i64>,
    #[serde(default)]
    pub last_accessed_epoch_secs: Option<i64>,
    #[serde(default)]
    pub use_count: u32,
}

impl SearchResult {
    pub fn folder(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display_name = display_name_for(&path);
        Self {
            path,
            display_name,
            kind: EntryKind::Folder,
            size_bytes: 0,
            created_epoch_secs: None,
            modified_epoch_secs: None,
            last_accessed_epoch_secs: None,
            use_count: 0,
        }
    }

    /// Builds a result from filesystem metadata. Symlinks are followed.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let kind = if meta.is_dir() {
            EntryKind::Folder
        } else {
            EntryKind::Other
        };

        Ok(Self {
            path: path.to_path_buf(),
            display_name: display_name_for(path),
            kind,
            size_bytes: if meta.is_file() { meta.len() } else { 0 },
            created_epoch_secs: meta.created().ok().and_then(epoch_secs),
            modified_epoch_secs: meta.modified().ok().and_then(epoch_secs),
            last_accessed_epoch_secs: meta.accessed().ok().and_then(epoch_secs),
            use_count: 0,
        })
    }

    pub fn with_last_accessed(mut self, epoch_secs: i64) -> Self {
        self.last_accessed_epoch_secs = Some(epoch_secs);
        self
    }

    pub fn with_use_count(mut self, use_count: u32) -> Self {
        self.use_count = use_count;
        self
    }

    /// Sort key used by recency ordering; unknown access time counts as the epoch.
    pub fn last_accessed_or_epoch(&self) -> i64 {
        self.last_accessed_epoch_secs.unwrap_or(0)
    }

    pub fn parent_display(&self) -> String {
        self.path
            .parent()
            .map(|parent| parent.display().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecentFolder {
    #[serde(flatten)]
    pub folder: SearchResult,
    pub last_used_epoch_secs: i64,
}

impl RecentFolder {
    pub fn new(folder: SearchResult, last_used_epoch_secs: i64) -> Self {
        Self {
            folder,
            last_used_epoch_secs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.folder.path
    }
}

pub fn display_name_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn now_epoch_secs() -> i64 {
    epoch_secs(SystemTime::now()).unwrap_or(0)
}

fn epoch_secs(time: SystemTime) -> Option<i64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs() as i64)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{display_name_for, SearchResult};

    #[test]
    fn display_name_falls_back_to_full_path_for_root() {
        assert_eq!(display_name_for(Path::new("/")), "/");
        assert_eq!(display_name_for(Path::new("/Users/me/Projects")), "Projects");
    }

    #[test]
    fn unknown_access_time_sorts_as_epoch() {
        let item = SearchResult::folder("/tmp/a");
        assert_eq!(item.last_accessed_or_epoch(), 0);
        assert_eq!(item.with_last_accessed(42).last_accessed_or_epoch(), 42);
    }
}
