use rusqlite::Connection;

use crate::kv_store::{self, namespaced_key, StoreError};
use crate::logging;

pub const SHOW_DETAILS_KEY_NAME: &str = "show-details";
pub const DEFAULT_MAX_RECENT_FOLDERS: usize = 10;

pub fn load_show_details(db: &Connection) -> bool {
    match kv_store::get(db, &namespaced_key(SHOW_DETAILS_KEY_NAME)) {
        Ok(Some(value)) => value.trim() == "true",
        Ok(None) => false,
        Err(error) => {
            logging::warn(&format!("failed to load detail preference: {error}"));
            false
        }
    }
}

pub fn save_show_details(db: &Connection, show: bool) -> Result<(), StoreError> {
    kv_store::set(
        db,
        &namespaced_key(SHOW_DETAILS_KEY_NAME),
        if show { "true" } else { "false" },
    )
}

/// Flips the stored flag and returns the new value.
pub fn toggle_show_details(db: &Connection) -> Result<bool, StoreError> {
    let next = !load_show_details(db);
    save_show_details(db, next)?;
    Ok(next)
}

/// Parses the user-facing "max recent folders" setting. Blank means the default.
pub fn parse_max_recent_folders(input: &str) -> Result<usize, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_MAX_RECENT_FOLDERS);
    }

    let value = trimmed
        .parse::<usize>()
        .map_err(|_| format!("'{trimmed}' is not a whole number."))?;
    validate_max_recent_folders(value)?;
    Ok(value)
}

pub fn validate_max_recent_folders(value: usize) -> Result<(), String> {
    if (1..=50).contains(&value) {
        Ok(())
    } else {
        Err("Max recent folders must be between 1 and 50.".to_string())
    }
}

pub fn validate_max_results(value: usize) -> Result<(), String> {
    if (5..=500).contains(&value) {
        Ok(())
    } else {
        Err("Max results must be between 5 and 500.".to_string())
    }
}
