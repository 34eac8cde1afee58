//! Error types for the roster bot

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required roster column is missing: {0}")]
    MissingRequiredColumn(&'static str),

    #[error("Roster storage error: {0}")]
    StorageIo(#[from] std::io::Error),

    #[error("Roster CSV error: {0}")]
    Csv(String),

    #[error("Roster is locked by another process")]
    RosterLocked,

    #[error("Failed to acquire roster lock: {0}")]
    LockError(String),

    #[error("Telegram API error: {0}")]
    TelegramError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err.to_string())
    }
}

impl From<teloxide::RequestError> for Error {
    fn from(err: teloxide::RequestError) -> Self {
        Error::TelegramError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::TaskFailed(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("record has no username or chat_id".to_string());
        assert!(err.to_string().contains("Invalid input"));
        assert!(err.to_string().contains("no username"));
    }

    #[test]
    fn test_error_display_missing_column() {
        let err = Error::MissingRequiredColumn("username");
        let msg = err.to_string();
        assert!(msg.contains("missing"));
        assert!(msg.contains("username"));
    }

    #[test]
    fn test_error_display_roster_locked() {
        let err = Error::RosterLocked;
        assert!(err.to_string().contains("locked by another process"));
    }

    #[test]
    fn test_error_display_lock_error() {
        let err = Error::LockError("timeout".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Failed to acquire roster lock"));
        assert!(msg.contains("timeout"));
    }

    #[test]
    fn test_error_display_telegram_error() {
        let err = Error::TelegramError("flood wait".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Telegram API error"));
        assert!(msg.contains("flood wait"));
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("bot token is not set".to_string());
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "users.csv");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::StorageIo(_)));
        assert!(err.to_string().contains("Roster storage error"));
    }

    #[test]
    fn test_error_from_io_various_kinds() {
        let kinds = [
            std::io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::InvalidData,
        ];

        for kind in kinds {
            let io_err = std::io::Error::new(kind, "test");
            let err: Error = io_err.into();
            assert!(matches!(err, Error::StorageIo(_)));
        }
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();

        assert!(matches!(err, Error::SerializationError(_)));
        assert!(err.to_string().contains("Serialization error"));
    }

    #[tokio::test]
    async fn test_error_from_panicked_task() {
        let join_err = tokio::task::spawn_blocking(|| panic!("roster write panicked"))
            .await
            .unwrap_err();
        let err: Error = join_err.into();

        assert!(matches!(err, Error::TaskFailed(_)));
        assert!(err.to_string().contains("Background task failed"));
    }

    #[test]
    fn test_error_debug_impl() {
        let err = Error::RosterLocked;
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("RosterLocked"));
    }
}
