//! Send a text to every chat id stored in the roster

use std::collections::BTreeSet;

use teloxide::Bot;

use crate::config::Config;
use crate::error::Result;
use crate::messenger::{self, Messenger, TelegramMessenger};
use crate::roster::Roster;
use crate::user::UserRecord;

/// Distinct chat ids of the roster users, ascending.
pub fn roster_chat_ids(users: &[UserRecord]) -> Vec<i64> {
    users
        .iter()
        .filter_map(|u| u.numeric_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Send `text` to each chat id. Returns how many sends succeeded.
pub async fn send_all<M: Messenger>(messenger: &M, chat_ids: &[i64], text: &str) -> usize {
    let mut reached = 0;
    for chat_id in chat_ids {
        if messenger::send_text_logged(messenger, *chat_id, text).await.is_ok() {
            reached += 1;
        }
    }
    reached
}

pub async fn run(config: Config, text: &str) -> Result<usize> {
    let users = Roster::new(&config.roster_path).read_all()?;
    let chat_ids = roster_chat_ids(&users);
    let messenger = TelegramMessenger::new(Bot::new(config.require_token()?));

    let reached = send_all(&messenger, &chat_ids, text).await;
    println!("📤 Sent to {} of {} roster chat(s)", reached, chat_ids.len());
    Ok(reached)
}
