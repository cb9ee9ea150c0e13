//! Incident store tests covering schema init and row lifecycle.

use tempfile::tempdir;

use super::IncidentStore;

#[test]
fn open_creates_parent_directories_and_schema() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("nested").join("state").join("incidents.db");

    let store = IncidentStore::open(&path).expect("open");
    assert_eq!(store.lookup(1).expect("lookup"), None);
    assert!(path.exists());
}

#[test]
fn reopening_is_idempotent() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("incidents.db");

    {
        let store = IncidentStore::open(&path).expect("open");
        store.insert(42, "OPS-7").expect("insert");
    }
    let store = IncidentStore::open(&path).expect("reopen");
    assert_eq!(store.lookup(42).expect("lookup"), Some("OPS-7".to_string()));
}

#[test]
fn insert_lookup_delete_round_trip() {
    let temp = tempdir().expect("tempdir");
    let store = IncidentStore::open(&temp.path().join("incidents.db")).expect("open");

    store.insert(42, "OPS-7").expect("insert");
    assert_eq!(store.lookup(42).expect("lookup"), Some("OPS-7".to_string()));
    assert_eq!(store.lookup(43).expect("lookup"), None);

    assert!(store.delete(42).expect("delete"));
    assert_eq!(store.lookup(42).expect("lookup"), None);
    assert!(!store.delete(42).expect("second delete"));
}

#[test]
fn duplicate_trigger_insert_is_rejected() {
    let temp = tempdir().expect("tempdir");
    let store = IncidentStore::open(&temp.path().join("incidents.db")).expect("open");

    store.insert(42, "OPS-7").expect("insert");
    assert!(store.insert(42, "OPS-8").is_err());
    assert_eq!(store.lookup(42).expect("lookup"), Some("OPS-7".to_string()));
}
