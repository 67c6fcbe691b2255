use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::aggregator::listing_order;
use crate::logging;
use crate::model::SearchResult;

/// Immediate subdirectories of `dir`, sorted by name. Unreadable children are skipped.
pub fn list_subdirectories(dir: &Path) -> std::io::Result<Vec<SearchResult>> {
    // Surface a missing or unreadable folder before walking it.
    std::fs::read_dir(dir)?;

    let mut folders: Vec<SearchResult> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                logging::warn(&format!("skipping unreadable entry: {error}"));
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| SearchResult::from_path(entry.path()).ok())
        .collect();

    folders.sort_by(listing_order);
    Ok(folders)
}

/// Parent of `dir`; the root is its own parent.
pub fn parent_of(dir: &Path) -> PathBuf {
    dir.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.to_path_buf())
}

/// Absolute, symlink-free form of `dir` when it can be resolved.
pub fn resolve_dir(dir: &Path) -> PathBuf {
    std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}
