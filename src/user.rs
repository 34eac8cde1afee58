//! User records exchanged between the bot and the roster.

use serde::Serialize;

/// One user as seen in an incoming message or read from a roster row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    /// Telegram username without `@`.
    pub handle: Option<String>,
    pub display_gender: Option<String>,
    /// Last name of the chat, or its first name when there is none.
    pub display_name: Option<String>,
    pub numeric_id: Option<i64>,
}

impl UserRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.display_gender = Some(gender.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.numeric_id = Some(id);
        self
    }

    /// Trimmed, lowercased handle used for matching; `None` when blank.
    pub fn normalized_handle(&self) -> Option<String> {
        self.handle
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_lowercase)
    }

    /// A record must carry a non-blank handle or a numeric id.
    pub fn is_valid(&self) -> bool {
        self.normalized_handle().is_some() || self.numeric_id.is_some()
    }

    /// Label used in logs and reports.
    pub fn label(&self) -> String {
        match (self.handle.as_deref().map(str::trim), self.numeric_id) {
            (Some(h), _) if !h.is_empty() => format!("@{}", h),
            (_, Some(id)) => id.to_string(),
            _ => "<unknown>".to_string(),
        }
    }
}
