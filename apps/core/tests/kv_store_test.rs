use std::time::{SystemTime, UNIX_EPOCH};

use folderdrop_core::kv_store;

#[test]
fn reads_back_written_value() {
    let db = kv_store::open_memory().unwrap();
    kv_store::set(&db, "folderdrop:show-details", "true").unwrap();

    let got = kv_store::get(&db, "folderdrop:show-details").unwrap();
    assert_eq!(got.as_deref(), Some("true"));
    assert_eq!(kv_store::get(&db, "folderdrop:absent").unwrap(), None);
}

#[test]
fn persists_values_across_reopen() {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let db_path = std::env::temp_dir()
        .join("folderdrop-tests")
        .join(format!("kv-persist-{unique}.sqlite3"));

    {
        let db = kv_store::open_file(&db_path).unwrap();
        kv_store::set(&db, "folderdrop:recent-folders", "[]").unwrap();
    }

    let reopened = kv_store::open_file(&db_path).unwrap();
    let got = kv_store::get(&reopened, "folderdrop:recent-folders").unwrap();
    assert_eq!(got.as_deref(), Some("[]"));

    drop(reopened);
    std::fs::remove_file(&db_path).unwrap();
}

#[test]
fn opens_store_from_config_path() {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut cfg = folderdrop_core::config::Config::default();
    cfg.kv_db_path = std::env::temp_dir()
        .join("folderdrop-tests")
        .join(format!("kv-cfg-{unique}.sqlite3"));

    let db = kv_store::open_from_config(&cfg).unwrap();
    kv_store::set(&db, "k", "v").unwrap();
    assert!(cfg.kv_db_path.exists());

    drop(db);
    std::fs::remove_file(&cfg.kv_db_path).unwrap();
}
