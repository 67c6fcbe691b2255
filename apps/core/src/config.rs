use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const APP_DIR_NAME: &str = "folderdrop";
const CONFIG_FILE_NAME: &str = "config.toml";
const KV_DB_FILE_NAME: &str = "state.sqlite3";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Auto,
    Spotlight,
    Walk,
}

impl EngineKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "spotlight" | "mdfind" => Some(Self::Spotlight),
            "walk" | "walkdir" => Some(Self::Walk),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub max_recent_folders: usize,
    pub max_results: usize,
    pub search_timeout_ms: u64,
    pub engine: EngineKind,
    pub kv_db_path: PathBuf,
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let base = stable_app_data_dir();
        Self {
            max_recent_folders: 10,
            max_results: 100,
            search_timeout_ms: 5_000,
            engine: EngineKind::Auto,
            kv_db_path: base.join(KV_DB_FILE_NAME),
            config_path: base.join(CONFIG_FILE_NAME),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    Encode(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(error) => write!(f, "io error: {error}"),
            Self::Parse(error) => write!(f, "parse error: {error}"),
            Self::Encode(error) => write!(f, "encode error: {error}"),
            Self::Invalid(error) => write!(f, "invalid config: {error}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

pub fn validate(cfg: &Config) -> Result<(), String> {
    crate::preferences::validate_max_recent_folders(cfg.max_recent_folders)?;
    crate::preferences::validate_max_results(cfg.max_results)?;

    if cfg.search_timeout_ms < 100 || cfg.search_timeout_ms > 60_000 {
        return Err("search_timeout_ms out of range".into());
    }

    if cfg.kv_db_path.as_os_str().is_empty() {
        return Err("kv_db_path is required".into());
    }

    if cfg.config_path.as_os_str().is_empty() {
        return Err("config_path is required".into());
    }

    Ok(())
}

/// Reads the config at `path` (or the default location). A missing file yields defaults.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| stable_app_data_dir().join(CONFIG_FILE_NAME));

    if !config_path.exists() {
        return Ok(Config {
            config_path,
            ..Config::default()
        });
    }

    let raw = std::fs::read_to_string(&config_path)?;
    let mut cfg: Config = if is_json_path(&config_path) {
        json5::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?
    } else {
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?
    };
    cfg.config_path = config_path;
    validate(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    validate(cfg).map_err(ConfigError::Invalid)?;
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let encoded = if is_json_path(&cfg.config_path) {
        serde_json::to_string_pretty(cfg).map_err(|e| ConfigError::Encode(e.to_string()))?
    } else {
        toml::to_string_pretty(cfg).map_err(|e| ConfigError::Encode(e.to_string()))?
    };
    std::fs::write(&cfg.config_path, encoded)?;
    Ok(())
}

pub fn stable_app_data_dir() -> PathBuf {
    if let Some(home) = std::env::var_os("FOLDERDROP_HOME") {
        if !home.is_empty() {
            return PathBuf::from(home);
        }
    }

    platform_data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR_NAME))
}

#[cfg(target_os = "macos")]
fn platform_data_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join("Library")
            .join("Application Support")
    })
}

#[cfg(target_os = "windows")]
fn platform_data_dir() -> Option<PathBuf> {
    std::env::var_os("APPDATA").map(PathBuf::from)
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME") {
        if !xdg.is_empty() {
            return Some(PathBuf::from(xdg));
        }
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share"))
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("json5"))
        .unwrap_or(false)
}
