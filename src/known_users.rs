//! Chats the bot has heard from.
//!
//! Holds the set of known chat ids (used for the online notice and
//! `/status`) and a bounded history of observed chats that lets a roster
//! username be resolved to a chat id when the roster has none.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// One chat seen in an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedChat {
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub seen_at: DateTime<Utc>,
}

impl ObservedChat {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            username: None,
            first_name: None,
            last_name: None,
            seen_at: Utc::now(),
        }
    }

    pub fn with_username(mut self, username: Option<&str>) -> Self {
        self.username = username.map(str::to_string);
        self
    }

    pub fn with_names(mut self, first_name: Option<&str>, last_name: Option<&str>) -> Self {
        self.first_name = first_name.map(str::to_string);
        self.last_name = last_name.map(str::to_string);
        self
    }

    /// Last name if present, otherwise first name.
    pub fn display_name(&self) -> Option<&str> {
        self.last_name
            .as_deref()
            .or(self.first_name.as_deref())
    }
}

/// Known chat ids plus a bounded, oldest-first history of observations.
#[derive(Debug, Clone)]
pub struct KnownUsers {
    chat_ids: HashSet<i64>,
    history: VecDeque<ObservedChat>,
    history_limit: usize,
}

impl Default for KnownUsers {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl KnownUsers {
    pub fn new(history_limit: usize) -> Self {
        Self {
            chat_ids: HashSet::new(),
            history: VecDeque::with_capacity(history_limit.min(1024)),
            history_limit,
        }
    }

    /// Record an observation. Returns true when the chat id was not known yet.
    ///
    /// A chat keeps a single history entry; a repeat observation refreshes it
    /// in place.
    pub fn observe(&mut self, chat: ObservedChat) -> bool {
        let is_new = self.chat_ids.insert(chat.chat_id);
        if let Some(entry) = self.history.iter_mut().find(|e| e.chat_id == chat.chat_id) {
            *entry = chat;
        } else if self.history_limit > 0 {
            if self.history.len() == self.history_limit {
                self.history.pop_front();
            }
            self.history.push_back(chat);
        }
        is_new
    }

    pub fn contains(&self, chat_id: i64) -> bool {
        self.chat_ids.contains(&chat_id)
    }

    pub fn len(&self) -> usize {
        self.chat_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chat_ids.is_empty()
    }

    /// Known chat ids in ascending order.
    pub fn chat_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.chat_ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Chat id of the oldest retained observation whose username matches,
    /// compared case-insensitively. A leading `@` is ignored on both sides.
    pub fn find_chat_id(&self, username: &str) -> Option<i64> {
        let wanted = normalize(username)?;
        self.history
            .iter()
            .find(|chat| {
                chat.username
                    .as_deref()
                    .and_then(normalize)
                    .is_some_and(|name| name == wanted)
            })
            .map(|chat| chat.chat_id)
    }
}

fn normalize(username: &str) -> Option<String> {
    let trimmed = username.trim();
    let trimmed = trimmed.strip_prefix('@').unwrap_or(trimmed);
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}
