//! Version store persistence tests.

use checkpoint_store::{StoreError, VersionNumber, VersionStore};
use proptest::prelude::*;
use rusqlite::Connection;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_history_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("checkpoints.db");

    let (file_id, last_id) = {
        let store = VersionStore::open(&db).unwrap();
        let file = store.create_file("src/main.rs").unwrap();
        store.create_version(file.id, "fn main() {}\n", None).unwrap();
        let last = store
            .create_version(file.id, "fn main() {\n    run();\n}\n", Some("wip"))
            .unwrap();
        (file.id, last.id)
    };

    let store = VersionStore::open(&db).unwrap();
    assert!(store.open_report().quarantined.is_none());

    let file = store.get_file("src/main.rs").unwrap().unwrap();
    assert_eq!(file.id, file_id);
    assert_eq!(file.current_version_id, Some(last_id));

    let history = store.get_file_versions(file.id, None).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version_number, VersionNumber(2));
    assert_eq!(history[0].label.as_deref(), Some("wip"));

    // Numbering continues where it left off.
    let next = store.create_version(file.id, "x\ny\n", None).unwrap();
    assert_eq!(next.version_number, VersionNumber(3));
}

#[test]
fn test_schema_tables_and_indexes() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("checkpoints.db");
    drop(VersionStore::open(&db).unwrap());

    let conn = Connection::open(&db).unwrap();
    let names: Vec<(String, String)> = conn
        .prepare(
            "SELECT type, name FROM sqlite_master \
             WHERE type IN ('table', 'index') AND name NOT LIKE 'sqlite_%' \
             ORDER BY type, name",
        )
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let expected = [
        ("index", "idx_repository_commits_hash"),
        ("index", "idx_versions_file_id"),
        ("table", "files"),
        ("table", "repository_commits"),
        ("table", "versions"),
    ];
    let names: Vec<(&str, &str)> = names.iter().map(|(t, n)| (t.as_str(), n.as_str())).collect();
    assert_eq!(names, expected);
}

#[test]
fn test_corrupt_database_is_quarantined() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("checkpoints.db");
    fs::write(&db, b"this is not a sqlite file ".repeat(160)).unwrap();

    let store = VersionStore::open(&db).unwrap();
    let backup = store.open_report().quarantined.clone().unwrap();
    assert!(backup.exists());
    assert!(backup
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("checkpoints.db.corrupt-"));
    assert!(fs::read(&backup).unwrap().starts_with(b"this is not a sqlite file"));

    // The replacement store is empty and usable.
    assert_eq!(store.file_count().unwrap(), 0);
    let file = store.create_file("a.txt").unwrap();
    store.create_version(file.id, "a\nb", None).unwrap();
}

#[test]
fn test_newer_schema_is_refused_but_kept() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("checkpoints.db");
    {
        let store = VersionStore::open(&db).unwrap();
        let file = store.create_file("a.txt").unwrap();
        store.create_version(file.id, "a\nb", None).unwrap();
    }
    Connection::open(&db)
        .unwrap()
        .pragma_update(None, "user_version", 99)
        .unwrap();

    let result = VersionStore::open(&db);
    assert!(matches!(
        result,
        Err(StoreError::UnsupportedSchema { found: 99, .. })
    ));

    // Nothing was moved aside and the data is intact.
    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().all(|n| !n.contains(".corrupt-")));
    let conn = Connection::open(&db).unwrap();
    let versions: i64 = conn
        .query_row("SELECT COUNT(*) FROM versions", [], |row| row.get(0))
        .unwrap();
    assert_eq!(versions, 1);
}

#[test]
fn test_deleting_file_row_cascades_to_versions() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("checkpoints.db");
    let store = VersionStore::open(&db).unwrap();
    let file = store.create_file("a.txt").unwrap();
    for i in 0..3 {
        store.create_version(file.id, &format!("{}\n", i), None).unwrap();
    }
    drop(store);

    let conn = Connection::open(&db).unwrap();
    conn.execute_batch("PRAGMA foreign_keys=ON; UPDATE files SET current_version_id = NULL; DELETE FROM files;")
        .unwrap();
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM versions", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn test_pointer_follows_deletes() {
    let store = VersionStore::in_memory().unwrap();
    let file = store.create_file("a.txt").unwrap();
    let v1 = store.create_version(file.id, "1\n", None).unwrap();
    let v2 = store.create_version(file.id, "2\n", None).unwrap();
    let v3 = store.create_version(file.id, "3\n", None).unwrap();

    // Deleting a non-current version leaves the pointer alone.
    store.delete_version(v2.id).unwrap();
    let current = store.get_file_by_id(file.id).unwrap().unwrap().current_version_id;
    assert_eq!(current, Some(v3.id));

    store.delete_version(v3.id).unwrap();
    let current = store.get_file_by_id(file.id).unwrap().unwrap().current_version_id;
    assert_eq!(current, Some(v1.id));

    store.delete_version(v1.id).unwrap();
    let current = store.get_file_by_id(file.id).unwrap().unwrap().current_version_id;
    assert_eq!(current, None);

    // Numbering continues after the highest surviving number (none left).
    let v = store.create_version(file.id, "again\n", None).unwrap();
    assert_eq!(v.version_number, VersionNumber(1));
}

#[test]
fn test_unknown_ids_are_not_found() {
    let store = VersionStore::in_memory().unwrap();
    let file = store.create_file("a.txt").unwrap();
    let v = store.create_version(file.id, "x\n", None).unwrap();
    store.delete_version(v.id).unwrap();

    assert!(matches!(
        store.delete_version(v.id),
        Err(StoreError::VersionNotFound(_))
    ));
    assert!(!store.delete_version_if_exists(v.id).unwrap());
    assert!(matches!(
        store.create_file("a.txt"),
        Err(StoreError::FileExists(_))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_numbers_are_one_through_n(contents in prop::collection::vec(".{0,40}", 1..20)) {
        let store = VersionStore::in_memory().unwrap();
        let file = store.create_file("p.txt").unwrap();
        let mut last = None;
        for content in &contents {
            last = Some(store.create_version(file.id, content, None).unwrap());
        }

        let history = store.get_file_versions(file.id, None).unwrap();
        let mut numbers: Vec<i64> = history.iter().map(|v| v.version_number.0).collect();
        numbers.reverse();
        let expected: Vec<i64> = (1..=contents.len() as i64).collect();
        prop_assert_eq!(numbers, expected);

        let current = store.get_file_by_id(file.id).unwrap().unwrap().current_version_id;
        prop_assert_eq!(current, last.map(|v| v.id));
    }
}
