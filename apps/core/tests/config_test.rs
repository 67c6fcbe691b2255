use std::time::{SystemTime, UNIX_EPOCH};

use folderdrop_core::config::{self, Config, ConfigError, EngineKind};

fn unique_dir(label: &str) -> std::path::PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir()
        .join("folderdrop-tests")
        .join(format!("{label}-{}-{unique}", std::process::id()))
}

#[test]
fn rejects_max_results_out_of_range() {
    let cfg = Config {
        max_results: 1_000,
        ..Default::default()
    };
    assert!(config::validate(&cfg).is_err());
}

#[test]
fn rejects_zero_recent_folders() {
    let cfg = Config {
        max_recent_folders: 0,
        ..Default::default()
    };
    assert!(config::validate(&cfg).is_err());
}

#[test]
fn accepts_default_config() {
    let cfg = Config::default();
    assert_eq!(cfg.max_recent_folders, 10);
    assert_eq!(cfg.engine, EngineKind::Auto);
    assert!(cfg.kv_db_path.to_string_lossy().contains("folderdrop"));
    assert!(config::validate(&cfg).is_ok());
}

#[test]
fn missing_config_file_yields_defaults_at_that_path() {
    let path = unique_dir("missing-config").join("config.toml");
    let cfg = config::load(Some(&path)).unwrap();
    assert_eq!(cfg.config_path, path);
    assert_eq!(cfg.max_results, Config::default().max_results);
}

#[test]
fn saves_and_reloads_toml_config() {
    let dir = unique_dir("toml-config");
    let cfg = Config {
        max_recent_folders: 4,
        engine: EngineKind::Walk,
        config_path: dir.join("config.toml"),
        kv_db_path: dir.join("state.sqlite3"),
        ..Default::default()
    };
    config::save(&cfg).unwrap();

    let loaded = config::load(Some(&cfg.config_path)).unwrap();
    assert_eq!(loaded, cfg);

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn reads_json5_config_with_comments() {
    let dir = unique_dir("json5-config");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json5");
    std::fs::write(
        &path,
        "{\n  // fewer recents\n  max_recent_folders: 3,\n  engine: 'spotlight',\n}\n",
    )
    .unwrap();

    let loaded = config::load(Some(&path)).unwrap();
    assert_eq!(loaded.max_recent_folders, 3);
    assert_eq!(loaded.engine, EngineKind::Spotlight);

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn out_of_range_file_values_are_rejected() {
    let dir = unique_dir("invalid-config");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.toml");
    std::fs::write(&path, "search_timeout_ms = 1\n").unwrap();

    let result = config::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));

    std::fs::remove_dir_all(dir).unwrap();
}
