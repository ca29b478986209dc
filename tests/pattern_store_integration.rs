//! Integration tests for the persisted pattern store.

use std::sync::{Arc, Barrier};
use std::thread;

use musannif::privacy::{is_duplicate, PatternError, PatternStore, Redactor};
use serde_json::Value;

fn store_in(dir: &tempfile::TempDir) -> PatternStore {
    PatternStore::new(dir.path().join("config").join("privacy_settings.json"))
}

#[test]
fn add_writes_pretty_utf8_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store.add_pattern("2", 5, "رقم الطالب").unwrap();

    let content = std::fs::read_to_string(store.path()).unwrap();
    // Arabic is written as-is, not \u escaped
    assert!(content.contains("رقم الطالب"));
    assert!(content.contains('\n'));

    let doc: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(doc["id_patterns"][0]["start_with"], "2");
    assert_eq!(doc["id_patterns"][0]["length"], 5);
}

#[test]
fn store_reads_documents_written_by_hand() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("privacy_settings.json");
    std::fs::write(
        &path,
        r#"{
  "id_patterns": [
    {"start_with": "2", "length": 5, "description": "student"},
    {"start_with": "05", "length": 10}
  ]
}"#,
    )
    .unwrap();

    let settings = PatternStore::new(&path).load().unwrap();

    assert_eq!(settings.len(), 2);
    assert_eq!(settings.id_patterns[1].description(), "");
    assert!(is_duplicate(&settings, "2", 5));
    assert!(!is_duplicate(&settings, "3", 5));
}

#[test]
fn duplicate_and_invalid_patterns_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.add_pattern("2", 5, "").unwrap();

    assert!(matches!(
        store.add_pattern(" 2 ", 5, "again"),
        Err(PatternError::Duplicate { .. })
    ));
    assert!(matches!(
        store.add_pattern("12a", 5, ""),
        Err(PatternError::NonDigitPrefix(_))
    ));
    assert!(matches!(
        store.add_pattern("1234", 3, ""),
        Err(PatternError::LengthShorterThanPrefix { .. })
    ));
    assert!(matches!(
        store.add_pattern("1", 21, ""),
        Err(PatternError::LengthOutOfRange(21))
    ));
    assert_eq!(store.load().unwrap().len(), 1);
}

#[test]
fn remove_rewrites_file_and_bumps_generation() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.add_pattern("2", 5, "a").unwrap();
    store.add_pattern("3", 6, "b").unwrap();
    let before = store.generation();

    let removed = store.remove_pattern(0).unwrap();

    assert_eq!(removed.prefix(), "2");
    assert!(store.generation() > before);
    let reloaded = PatternStore::new(store.path()).load().unwrap();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.id_patterns[0].prefix(), "3");

    assert!(matches!(
        store.remove_pattern(5),
        Err(PatternError::IndexOutOfRange { index: 5, count: 1 })
    ));
}

#[test]
fn external_edits_are_seen_after_invalidate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("privacy_settings.json");
    let store = PatternStore::new(&path);
    assert!(store.load().unwrap().is_empty());

    std::fs::write(
        &path,
        r#"{"id_patterns": [{"start_with": "9", "length": 4, "description": "x"}]}"#,
    )
    .unwrap();
    // Still cached
    assert!(store.load().unwrap().is_empty());

    store.invalidate();
    assert_eq!(store.load().unwrap().len(), 1);
}

#[test]
fn concurrent_readers_share_one_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(store_in(&dir));
    store.add_pattern("2", 5, "student").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let settings = store.load().unwrap();
                Redactor::new(&settings.id_patterns).mask_text("id 20001")
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "id XXXXX");
    }
}

#[test]
fn concurrent_writers_never_lose_or_corrupt_patterns() {
    for _ in 0..20 {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (1..=8)
            .map(|i: usize| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.add_pattern(&i.to_string(), 5, "").map(|_| i)
                })
            })
            .collect();
        let added: Vec<usize> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap().ok())
            .collect();

        store.invalidate();
        let settings = store.load().expect("settings file still parses");
        assert_eq!(settings.len(), added.len());
        for i in added {
            assert!(is_duplicate(&settings, &i.to_string(), 5));
        }
    }
}
