//! Tests for upsert command

use telegram_roster::commands::upsert;
use telegram_roster::{Error, RosterLock, UserRecord};
use tempfile::tempdir;

#[test]
fn test_upsert_creates_roster_and_releases_lock() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users.csv");
    let record = UserRecord::new().with_handle("alice").with_id(100);

    let outcome = upsert::run(&path, &record).unwrap();

    assert!(outcome.is_insert());
    assert!(path.exists());
    assert!(RosterLock::acquire(&path).is_ok());
}

#[test]
fn test_upsert_refuses_when_locked() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users.csv");
    let _held = RosterLock::acquire(&path).unwrap();

    let result = upsert::run(&path, &UserRecord::new().with_handle("alice"));

    assert!(matches!(result, Err(Error::RosterLocked)));
    assert!(!path.exists());
}

#[test]
fn test_upsert_rejects_empty_record() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users.csv");

    let result = upsert::run(&path, &UserRecord::new().with_gender("Mr."));

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert!(!path.exists());
}
