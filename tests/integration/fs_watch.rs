//! End-to-end watching through the native filesystem notifier.

use crate::integration::test_utils::{record_changes, write_file};
use lesion::store::{Store, StoreOptions};
use lesion::watch::FsNotifier;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const DEADLINE: Duration = Duration::from_secs(10);

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    condition()
}

fn open(dir: &TempDir) -> Store {
    let options = StoreOptions::default()
        .with_notifier(Arc::new(FsNotifier::new(Duration::from_millis(20))));
    Store::open(dir.path(), options).unwrap()
}

#[test]
fn test_watch_picks_up_created_and_modified_files() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let (_sub, seen) = record_changes(&store);

    write_file(store.root(), "service/port.json", "8080");
    assert!(
        wait_until(|| store.has("service.port")),
        "created file never reached the store"
    );

    write_file(store.root(), "service/port.json", "9090");
    assert!(
        wait_until(|| store.value() == json!({"service": {"port": 9090}})),
        "modification never reached the store: {}",
        store.value()
    );
    assert!(!seen.lock().unwrap().is_empty());
}

#[test]
fn test_watch_picks_up_deleted_files() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.json", "1");
    let store = open(&dir);
    assert!(store.has("a"));

    std::fs::remove_file(store.root().join("a.json")).unwrap();
    assert!(
        wait_until(|| !store.has("a")),
        "deletion never reached the store"
    );
}

#[test]
fn test_close_stops_watching() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let (_sub, seen) = record_changes(&store);
    store.close();

    write_file(dir.path(), "late.json", "1");
    std::thread::sleep(Duration::from_millis(200));
    assert!(seen.lock().unwrap().is_empty());
    assert!(!store.has("late"));
}
