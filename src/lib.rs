//! Telegram Roster Bot Library
//!
//! This library provides tools to:
//! - Record people who talk to the bot in a CSV roster, filling gaps without
//!   overwriting what is already there
//! - Read the roster back as user records
//! - Broadcast a personalized message plus a window of numbered photos to
//!   every roster user
//! - Run the long-polling bot (`/start`, `/send`, `/status`)

pub mod bot;
pub mod broadcast;
pub mod commands;
pub mod config;
pub mod error;
pub mod known_users;
pub mod lock;
pub mod messenger;
pub mod metrics;
pub mod photos;
pub mod roster;
pub mod user;

// Re-export common types
pub use config::{BroadcastSettings, Config};
pub use error::{Error, Result};
pub use known_users::{KnownUsers, ObservedChat};
pub use lock::RosterLock;
pub use messenger::{Messenger, TelegramMessenger};
pub use roster::{Roster, UpsertOutcome};
pub use user::UserRecord;
