//! Tests for list command

use telegram_roster::commands::{list, OutputFormat};
use tempfile::tempdir;

#[test]
fn test_list_reads_users_with_username() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users.csv");
    std::fs::write(
        &path,
        "username,gender,lastname,chat_id\nalice,Ms.,Smith,100\n,Mr.,Nobody,5\nbob,,,\n",
    )
    .unwrap();

    let users = list::run(&path, OutputFormat::Table).unwrap();

    let handles: Vec<_> = users.iter().map(|u| u.handle.as_deref()).collect();
    assert_eq!(handles, vec![Some("alice"), Some("bob")]);
    assert_eq!(users[0].numeric_id, Some(100));
}

#[test]
fn test_list_missing_roster_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(list::run(&dir.path().join("absent.csv"), OutputFormat::Json).is_err());
}
