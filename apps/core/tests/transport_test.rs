use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use folderdrop_core::config::Config;
use folderdrop_core::contract::{CoreRequest, CoreResponse, SearchRequest};
use folderdrop_core::kv_store;
use folderdrop_core::model::SearchResult;
use folderdrop_core::query_engine::{FixedEngine, QueryEngine, WalkEngine};
use folderdrop_core::session::Session;
use folderdrop_core::transport::{handle_json, handle_request, ErrorCode, TransportResponse};

fn unique_dir(label: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir()
        .join("folderdrop-tests")
        .join(format!("{label}-{}-{unique}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    fs::canonicalize(dir).unwrap()
}

fn session_with(engine: Box<dyn QueryEngine>) -> Session {
    let db = kv_store::open_memory().unwrap();
    Session::with_connection(Config::default(), db, engine).unwrap()
}

fn json(session: &mut Session, payload: &str) -> serde_json::Value {
    serde_json::from_str(&handle_json(session, payload)).unwrap()
}

#[test]
fn request_json_uses_kind_and_payload_tags() {
    let request: CoreRequest =
        serde_json::from_str(r#"{"kind":"Search","payload":{"text":"proj","budget":5}}"#).unwrap();
    assert_eq!(
        request,
        CoreRequest::Search(SearchRequest {
            text: "proj".to_string(),
            budget: Some(5),
        })
    );

    let up: CoreRequest = serde_json::from_str(r#"{"kind":"Up"}"#).unwrap();
    assert_eq!(up, CoreRequest::Up);
}

#[test]
fn search_request_returns_results_in_recency_order() {
    let engine = FixedEngine::from_results(vec![
        SearchResult::folder("/Users/me/Projects").with_last_accessed(10),
        SearchResult::folder("/Volumes/Backup/Projects").with_last_accessed(99),
    ]);
    let mut session = session_with(Box::new(engine));

    let value = json(
        &mut session,
        r#"{"kind":"Search","payload":{"text":"Projects","budget":10}}"#,
    );

    assert_eq!(value["status"], "ok");
    let response = &value["response"];
    assert_eq!(response["kind"], "Results");
    assert_eq!(response["payload"]["state"], "idle");
    assert_eq!(response["payload"]["querying"], false);
    let results = response["payload"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["path"], "/Volumes/Backup/Projects");
    assert_eq!(results[0]["title"], "Projects");
    assert_eq!(results[0]["subtitle"], "/Volumes/Backup");
}

#[test]
fn failed_search_reports_single_notification() {
    let engine = FixedEngine::failing_after(Vec::new(), "engine crashed");
    let mut session = session_with(Box::new(engine));

    let value = json(&mut session, r#"{"kind":"Search","payload":{"text":"x","budget":null}}"#);
    let notifications = value["response"]["payload"]["notifications"]
        .as_array()
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["title"], "Search Error");

    let again = json(&mut session, r#"{"kind":"Poll","payload":{"budget":null}}"#);
    assert!(again["response"]["payload"]["notifications"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[test]
fn browse_and_up_list_subfolders() {
    let root = unique_dir("transport-browse");
    fs::create_dir_all(root.join("parent").join("beta")).unwrap();
    fs::create_dir_all(root.join("parent").join("Alpha")).unwrap();
    fs::write(root.join("parent").join("file.txt"), "f").unwrap();
    fs::create_dir_all(root.join("sibling")).unwrap();
    let mut session = session_with(Box::new(WalkEngine));

    let payload = serde_json::json!({
        "kind": "Browse",
        "payload": { "path": root.join("parent") },
    });
    let value = json(&mut session, &payload.to_string());
    let listed = &value["response"]["payload"];
    assert_eq!(listed["state"], "browsing");
    let titles: Vec<&str> = listed["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Alpha", "beta"]);

    let value = json(&mut session, r#"{"kind":"Up"}"#);
    let titles: Vec<&str> = value["response"]["payload"]["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["parent", "sibling"]);

    fs::remove_dir_all(root).unwrap();
}

#[test]
fn browse_failure_maps_to_browse_error() {
    let root = unique_dir("transport-missing");
    let mut session = session_with(Box::new(WalkEngine));

    let payload = serde_json::json!({
        "kind": "Browse",
        "payload": { "path": root.join("missing") },
    });
    let value = json(&mut session, &payload.to_string());

    assert_eq!(value["status"], "err");
    assert_eq!(value["error"]["code"], "browse");
    assert_eq!(value["error"]["notification"]["message"], "Failed to read folder contents");

    fs::remove_dir_all(root).unwrap();
}

#[test]
fn transfer_request_moves_files_and_lists_recent() {
    let root = unique_dir("transport-transfer");
    let dest = root.join("dest");
    fs::create_dir_all(&dest).unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();
    let mut session = session_with(Box::new(WalkEngine));

    let browse = serde_json::json!({ "kind": "Browse", "payload": { "path": dest } });
    json(&mut session, &browse.to_string());

    let payload = serde_json::json!({
        "kind": "Transfer",
        "payload": {
            "mode": "move",
            "destination": dest,
            "files": [root.join("a.txt")],
        },
    });
    let value = json(&mut session, &payload.to_string());

    assert_eq!(value["status"], "ok");
    let response = &value["response"]["payload"];
    assert_eq!(response["summary"]["success_count"], 1);
    assert_eq!(response["close_window"], true);
    assert_eq!(response["notifications"][0]["title"], "Moved 1 file");
    assert!(dest.join("a.txt").exists());

    let value = json(&mut session, r#"{"kind":"Recents"}"#);
    let folders = value["response"]["payload"]["folders"].as_array().unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0]["title"], "dest");

    fs::remove_dir_all(root).unwrap();
}

#[test]
fn transfer_without_selection_is_a_selection_error() {
    let mut session = session_with(Box::new(WalkEngine));
    let request: CoreRequest = serde_json::from_str(
        r#"{"kind":"Transfer","payload":{"mode":"copy","destination":"/tmp"}}"#,
    )
    .unwrap();

    match handle_request(&mut session, request) {
        TransportResponse::Err { error } => {
            assert_eq!(error.code, ErrorCode::Selection);
            assert_eq!(error.notification.unwrap().title, "No files selected");
        }
        TransportResponse::Ok { response } => panic!("unexpected response: {response:?}"),
    }
}

#[test]
fn toggle_details_flips_preference() {
    let mut session = session_with(Box::new(WalkEngine));

    let first = handle_request(&mut session, CoreRequest::ToggleDetails);
    let second = handle_request(&mut session, CoreRequest::ToggleDetails);

    let flags: Vec<bool> = [first, second]
        .into_iter()
        .map(|response| match response {
            TransportResponse::Ok {
                response: CoreResponse::Details(details),
            } => details.show_details,
            other => panic!("unexpected response: {other:?}"),
        })
        .collect();
    assert_eq!(flags, vec![true, false]);
}

#[test]
fn invalid_json_is_reported_not_panicked() {
    let mut session = session_with(Box::new(WalkEngine));
    let value = json(&mut session, "{not json");
    assert_eq!(value["status"], "err");
    assert_eq!(value["error"]["code"], "invalid_json");
    assert!(value["error"]["notification"].is_null());
}

#[test]
fn overwrite_answers_apply_per_file_name() {
    let root = unique_dir("transport-overwrite");
    let dest = root.join("dest");
    fs::create_dir_all(&dest).unwrap();
    fs::write(root.join("keep.txt"), "new keep").unwrap();
    fs::write(root.join("replace.txt"), "new replace").unwrap();
    fs::write(dest.join("keep.txt"), "old keep").unwrap();
    fs::write(dest.join("replace.txt"), "old replace").unwrap();
    let mut session = session_with(Box::new(WalkEngine));

    let payload = serde_json::json!({
        "kind": "Transfer",
        "payload": {
            "mode": "copy",
            "destination": dest,
            "overwrite": { "replace.txt": true },
            "files": [root.join("keep.txt"), root.join("replace.txt")],
        },
    });
    let value = json(&mut session, &payload.to_string());

    let summary = &value["response"]["payload"]["summary"];
    assert_eq!(summary["success_count"], 1);
    assert_eq!(summary["fail_count"], 1);
    assert_eq!(fs::read_to_string(dest.join("keep.txt")).unwrap(), "old keep");
    assert_eq!(fs::read_to_string(dest.join("replace.txt")).unwrap(), "new replace");

    fs::remove_dir_all(root).unwrap();
}

#[test]
fn forget_recent_drops_entry_from_list() {
    let root = unique_dir("transport-forget");
    let dest = root.join("dest");
    fs::create_dir_all(&dest).unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();
    let mut session = session_with(Box::new(WalkEngine));

    let browse = serde_json::json!({ "kind": "Browse", "payload": { "path": dest } });
    json(&mut session, &browse.to_string());
    let transfer = serde_json::json!({
        "kind": "Transfer",
        "payload": { "mode": "copy", "destination": dest, "files": [root.join("a.txt")] },
    });
    json(&mut session, &transfer.to_string());
    assert_eq!(session.recent_folders().len(), 1);

    let forget = serde_json::json!({ "kind": "ForgetRecent", "payload": { "path": dest } });
    let value = json(&mut session, &forget.to_string());

    assert_eq!(value["response"]["kind"], "Recents");
    assert!(value["response"]["payload"]["folders"]
        .as_array()
        .unwrap()
        .is_empty());

    fs::remove_dir_all(root).unwrap();
}
