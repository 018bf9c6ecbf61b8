use rankings::collection::AppLists;
use rankings::error::AppError;
use rankings::record::ListKind;
use rankings::snapshot::SnapshotStore;
use rankings::template::example_record;
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn store(dir: &TempDir, retention: usize) -> SnapshotStore {
    SnapshotStore::new(dir.path().join("data").join("excel-data.json"), retention)
}

fn sample() -> AppLists {
    let mut lists = AppLists::new();
    lists.push(example_record(ListKind::Web));
    lists.push(example_record(ListKind::App));
    lists
}

fn web_only() -> AppLists {
    let mut lists = AppLists::new();
    lists.push(example_record(ListKind::Web));
    lists
}

#[test]
fn read_before_first_write() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, 0);

    assert!(matches!(store.read(), Err(AppError::NotFound(_))));
    let fallback = store.read_or_fallback().unwrap();
    assert_eq!(fallback, AppLists::fallback());
    assert_eq!(fallback.web.len(), 1);
    assert_eq!(fallback.app.len(), 1);
}

#[test]
fn write_creates_directory_and_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, 0);

    let outcome = store.write(&sample()).unwrap();
    assert!(outcome.backup.is_none(), "nothing to back up on first write");
    assert_eq!(store.read().unwrap(), sample());
    assert!(store.backups().unwrap().is_empty());
}

#[test]
fn snapshot_is_pretty_printed_in_canonical_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, 0);
    store.write(&sample()).unwrap();

    let text = fs::read_to_string(store.path()).unwrap();
    assert!(text.starts_with("{\n  \"Web\": ["), "got {}", &text[..20]);
    let web = text.find("\"Web\"").unwrap();
    let app = text.find("\"App\"").unwrap();
    let all = text.find("\"all\"").unwrap();
    assert!(web < app && app < all);
    assert!(text.contains("\"growthRate\": 0.15"));
    assert!(text.contains("\"listType\": \"App\""));
}

#[test]
fn same_collection_twice_is_byte_identical_with_one_backup_per_write() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, 0);

    store.write(&sample()).unwrap();
    let first = fs::read(store.path()).unwrap();

    let outcome = store.write(&sample()).unwrap();
    let second = fs::read(store.path()).unwrap();
    assert_eq!(first, second);
    assert_eq!(store.backups().unwrap().len(), 1);
    assert_eq!(fs::read(outcome.backup.unwrap()).unwrap(), first);

    store.write(&sample()).unwrap();
    let third = fs::read(store.path()).unwrap();
    assert_eq!(first, third);
    assert_eq!(store.backups().unwrap().len(), 2);
}

#[test]
fn backups_hold_the_replaced_snapshot_oldest_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, 0);

    store.write(&AppLists::new()).unwrap();
    store.write(&web_only()).unwrap();
    store.write(&sample()).unwrap();

    let backups = store.backups().unwrap();
    assert_eq!(backups.len(), 2);
    let read = |p: &std::path::Path| -> AppLists {
        serde_json::from_str(&fs::read_to_string(p).unwrap()).unwrap()
    };
    assert_eq!(read(backups[0].as_path()), AppLists::new());
    assert_eq!(read(backups[1].as_path()), web_only());
    assert_eq!(store.read().unwrap(), sample());

    let name = backups[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("excel-data-backup-"), "got {}", name);
    assert!(!name.contains(':'), "backup names must be filesystem safe");
}

#[test]
fn missing_key_is_rejected_without_touching_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, 0);
    store.write(&sample()).unwrap();
    let before = fs::read(store.path()).unwrap();

    let err = store
        .write_json(json!({ "Web": [], "all": [] }))
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {:?}", err);

    assert_eq!(fs::read(store.path()).unwrap(), before);
    assert!(store.backups().unwrap().is_empty());
}

#[test]
fn write_json_accepts_client_collection() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, 0);

    let body = serde_json::to_value(sample()).unwrap();
    store.write_json(body).unwrap();
    assert_eq!(store.read().unwrap(), sample());
}

#[test]
fn retention_prunes_oldest_backups() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, 2);

    let mut pruned = 0;
    for _ in 0..5 {
        pruned += store.write(&sample()).unwrap().pruned.len();
    }
    assert_eq!(store.backups().unwrap().len(), 2);
    assert_eq!(pruned, 2, "four backups made, two kept");
}

#[test]
fn corrupt_snapshot_is_not_masked_by_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, 0);
    fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    fs::write(store.path(), "{ \"Web\": [").unwrap();

    assert!(matches!(store.read(), Err(AppError::Serialization(_))));
    assert!(matches!(
        store.read_or_fallback(),
        Err(AppError::Serialization(_))
    ));
}

#[test]
fn concurrent_writes_are_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(store(&dir, 0));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let lists = if i % 2 == 0 { sample() } else { web_only() };
                store.write(&lists).unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let current = store.read().unwrap();
    assert!(current == sample() || current == web_only());
    assert_eq!(store.backups().unwrap().len(), 7);
    for backup in store.backups().unwrap() {
        let text = fs::read_to_string(backup).unwrap();
        serde_json::from_str::<AppLists>(&text).expect("every backup is a complete snapshot");
    }
}

#[test]
fn non_finite_figures_are_rejected_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, 0);
    store.write(&sample()).unwrap();
    let before = fs::read(store.path()).unwrap();

    let mut lists = sample();
    lists.web[0].growth_rate = f64::NAN;
    lists.all[0].growth_rate = f64::NAN;
    let err = store.write(&lists).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {:?}", err);

    let mut lists = sample();
    lists.app[0].arpu = Some(f64::INFINITY);
    assert!(matches!(store.write(&lists), Err(AppError::Validation(_))));

    assert_eq!(fs::read(store.path()).unwrap(), before);
    assert!(store.backups().unwrap().is_empty());
    assert_eq!(store.read().unwrap(), sample());
}

#[test]
fn unwritable_snapshot_directory_is_a_server_fault() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("data"), "not a directory").unwrap();
    let store = store(&dir, 0);

    let err = store.write(&sample()).unwrap_err();
    assert!(matches!(err, AppError::Io(_)), "got {:?}", err);
    assert_eq!(err.status(), 500);
}
