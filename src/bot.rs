//! Long-polling Telegram bot.
//!
//! On startup the bot reads pending updates once to learn which chats have
//! talked to it and tells them it is online. After that every message is
//! recorded, and `/start`, `/send` and `/status` are handled.

use std::sync::Arc;
use std::time::Instant;

use teloxide::prelude::*;
use teloxide::types::{Chat, UpdateKind};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::broadcast::{self, BroadcastSummary};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::known_users::{KnownUsers, ObservedChat};
use crate::lock::RosterLock;
use crate::messenger::{self, Messenger, TelegramMessenger};
use crate::metrics;
use crate::roster::{Roster, UpsertOutcome};
use crate::user::UserRecord;

pub const HELP_TEXT: &str = "👋 Hi! Welcome to the bot.\n\n\
This bot sends messages and photos to the users listed in the roster.\n\n\
Commands:\n\
/send - send the message to the roster users\n\
/status - show bot status";

pub const ONLINE_TEXT: &str = "🟢 The bot is online!\n\nSend /start for help.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Send,
    Status,
}

impl BotCommand {
    const ALL: [(BotCommand, &'static str); 3] = [
        (BotCommand::Start, "start"),
        (BotCommand::Send, "send"),
        (BotCommand::Status, "status"),
    ];

    /// Recognizes `/name`, `/name args` and `/name@bot`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL
            .iter()
            .find(|(_, name)| is_command(text, name))
            .map(|(command, _)| *command)
    }

    pub fn metric_name(self) -> &'static str {
        match self {
            BotCommand::Start => "bot_start",
            BotCommand::Send => "bot_send",
            BotCommand::Status => "bot_status",
        }
    }
}

fn is_command(text: &str, name: &str) -> bool {
    let base = format!("/{name}");
    text == base || text.starts_with(&(base.clone() + " ")) || text.starts_with(&(base + "@"))
}

pub fn status_text(known_chats: usize) -> String {
    format!("📊 Bot status:\n• Known users: {}", known_chats)
}

/// Observation of the chat a message came from.
pub fn observed_chat_from(chat: &Chat) -> ObservedChat {
    ObservedChat::new(chat.id.0)
        .with_username(chat.username())
        .with_names(chat.first_name(), chat.last_name())
}

/// Roster record for a `/start` sender.
pub fn user_from_chat(chat: &ObservedChat) -> UserRecord {
    UserRecord {
        handle: chat.username.clone(),
        display_gender: None,
        display_name: chat.display_name().map(str::to_string),
        numeric_id: Some(chat.chat_id),
    }
}

/// State shared by all handlers.
pub struct BotContext {
    pub config: Config,
    pub roster: Roster,
    pub known: RwLock<KnownUsers>,
    roster_guard: Mutex<()>,
}

impl BotContext {
    pub fn new(config: Config) -> Self {
        let roster = Roster::new(config.roster_path.clone());
        let known = KnownUsers::new(config.history_limit);
        Self {
            config,
            roster,
            known: RwLock::new(known),
            roster_guard: Mutex::new(()),
        }
    }

    /// Record a chat. Returns true when it was not known before.
    pub async fn observe(&self, chat: ObservedChat) -> bool {
        let mut known = self.known.write().await;
        let is_new = known.observe(chat);
        metrics::set_known_chats(known.len());
        is_new
    }

    pub async fn known_count(&self) -> usize {
        self.known.read().await.len()
    }

    /// Upsert under the in-process guard and the cross-process file lock.
    pub async fn record_user(&self, user: &UserRecord) -> Result<UpsertOutcome> {
        let user = user.clone();
        self.with_roster(move |roster| {
            let _lock = RosterLock::acquire(roster.path())?;
            roster.upsert(&user)
        })
        .await
    }

    /// Broadcast to everyone in the roster.
    pub async fn broadcast<M: Messenger>(&self, messenger: &M) -> Result<BroadcastSummary> {
        let users = self.with_roster(|roster| roster.read_all()).await?;
        let known = self.known.read().await.clone();
        Ok(broadcast::broadcast(messenger, &users, &known, &self.config.broadcast).await)
    }

    /// Run file I/O on the blocking pool while holding the roster guard.
    async fn with_roster<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Roster) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let _guard = self.roster_guard.lock().await;
        let roster = self.roster.clone();
        tokio::task::spawn_blocking(move || op(&roster)).await?
    }
}

/// Chats found in the updates Telegram still holds for the bot.
pub async fn collect_known_chats(bot: &Bot, ctx: &BotContext) -> Result<usize> {
    let updates = bot.get_updates().await?;
    for update in &updates {
        if let UpdateKind::Message(msg) = &update.kind {
            ctx.observe(observed_chat_from(&msg.chat)).await;
        }
    }
    let count = ctx.known_count().await;
    info!(count, "Collected known chats");
    Ok(count)
}

/// Tell every known chat that the bot is up. Returns how many were reached.
pub async fn notify_online<M: Messenger>(messenger: &M, ctx: &BotContext) -> usize {
    let chat_ids = ctx.known.read().await.chat_ids();
    let mut reached = 0;
    for chat_id in chat_ids {
        if messenger::send_text_logged(messenger, chat_id, ONLINE_TEXT)
            .await
            .is_ok()
        {
            reached += 1;
        }
    }
    info!(reached, "Online notice sent");
    reached
}

/// Handle one incoming message. Command failures are logged, not returned.
pub async fn handle_message<M: Messenger>(
    messenger: &M,
    ctx: &BotContext,
    chat: ObservedChat,
    text: Option<&str>,
) {
    let chat_id = chat.chat_id;
    ctx.observe(chat.clone()).await;

    let Some(command) = text.and_then(BotCommand::parse) else {
        return;
    };
    info!(chat_id, ?command, "Command received");

    let name = command.metric_name();
    metrics::record_command_start(name);
    let started = Instant::now();
    let result = run_command(messenger, ctx, command, &chat).await;
    metrics::record_command_result(name, started.elapsed(), result.is_ok());

    if let Err(err) = result {
        error!(chat_id, ?command, "Command failed: {}", err);
    }
}

async fn run_command<M: Messenger>(
    messenger: &M,
    ctx: &BotContext,
    command: BotCommand,
    chat: &ObservedChat,
) -> Result<()> {
    match command {
        BotCommand::Start => {
            // Help goes out even when the roster cannot be written.
            let sent = messenger::send_text_logged(messenger, chat.chat_id, HELP_TEXT).await;
            match ctx.record_user(&user_from_chat(chat)).await {
                Ok(outcome) => info!(chat_id = chat.chat_id, ?outcome, "Sender recorded"),
                Err(Error::RosterLocked) => {
                    warn!(chat_id = chat.chat_id, "Roster locked, sender not recorded")
                }
                Err(err) => return Err(err),
            }
            sent
        }
        BotCommand::Send => {
            let summary = ctx.broadcast(messenger).await?;
            messenger::send_text_logged(messenger, chat.chat_id, &summary.summary_text()).await
        }
        BotCommand::Status => {
            let text = status_text(ctx.known_count().await);
            messenger::send_text_logged(messenger, chat.chat_id, &text).await
        }
    }
}

/// Collect chats, announce, then poll until Ctrl+C.
pub async fn run(config: Config) -> Result<()> {
    let bot = Bot::new(config.require_token()?);
    let ctx = Arc::new(BotContext::new(config));
    let messenger = TelegramMessenger::new(bot.clone());

    if let Err(err) = collect_known_chats(&bot, &ctx).await {
        warn!("Could not collect known chats: {}", err);
    }
    notify_online(&messenger, &ctx).await;

    info!("Listening for commands");
    let handler = Update::filter_message().endpoint({
        let ctx = ctx.clone();
        move |bot: Bot, msg: Message| {
            let ctx = ctx.clone();
            async move {
                let messenger = TelegramMessenger::new(bot);
                handle_message(&messenger, &ctx, observed_chat_from(&msg.chat), msg.text()).await;
                respond(())
            }
        }
    });

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messenger::testing::{RecordingMessenger, Sent};
    use tempfile::tempdir;

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::from_yaml("").unwrap();
        config.roster_path = dir.join("users.csv");
        config.broadcast.photos_dir = dir.join("photos");
        config.broadcast.message_template = "Hi {lastname}".to_string();
        config
    }

    fn alice() -> ObservedChat {
        ObservedChat::new(100)
            .with_username(Some("alice"))
            .with_names(Some("Alice"), Some("Smith"))
    }

    #[test]
    fn parses_commands_with_args_and_bot_suffix() {
        assert_eq!(BotCommand::parse("/start"), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse(" /send now "), Some(BotCommand::Send));
        assert_eq!(BotCommand::parse("/status@roster_bot"), Some(BotCommand::Status));
        assert_eq!(BotCommand::parse("/started"), None);
        assert_eq!(BotCommand::parse("start"), None);
        assert_eq!(BotCommand::parse("/help"), None);
    }

    #[test]
    fn start_sender_becomes_roster_record() {
        let record = user_from_chat(&alice());
        assert_eq!(record.handle.as_deref(), Some("alice"));
        assert_eq!(record.display_name.as_deref(), Some("Smith"));
        assert_eq!(record.numeric_id, Some(100));
        assert_eq!(record.display_gender, None);

        let first_only = ObservedChat::new(5).with_names(Some("Bo"), None);
        assert_eq!(user_from_chat(&first_only).display_name.as_deref(), Some("Bo"));
    }

    #[tokio::test]
    async fn start_replies_with_help_and_records_sender() {
        let dir = tempdir().unwrap();
        let ctx = BotContext::new(config_in(dir.path()));
        let messenger = RecordingMessenger::default();

        handle_message(&messenger, &ctx, alice(), Some("/start")).await;

        assert_eq!(messenger.sent(), vec![Sent::Text(100, HELP_TEXT.into())]);
        let users = ctx.roster.read_all().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].handle.as_deref(), Some("alice"));
        assert_eq!(users[0].numeric_id, Some(100));
        assert!(RosterLock::acquire(ctx.roster.path()).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_starts_all_land_in_the_roster() {
        let dir = tempdir().unwrap();
        let ctx = Arc::new(BotContext::new(config_in(dir.path())));

        let mut tasks = tokio::task::JoinSet::new();
        for id in 1..=8i64 {
            let ctx = Arc::clone(&ctx);
            tasks.spawn(async move {
                let chat = ObservedChat::new(id).with_username(Some(format!("user{id}").as_str()));
                ctx.record_user(&user_from_chat(&chat)).await
            });
        }
        while let Some(joined) = tasks.join_next().await {
            assert!(joined.unwrap().unwrap().is_insert());
        }

        let mut ids: Vec<i64> = ctx
            .roster
            .read_all()
            .unwrap()
            .iter()
            .filter_map(|u| u.numeric_id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn plain_messages_are_only_observed() {
        let dir = tempdir().unwrap();
        let ctx = BotContext::new(config_in(dir.path()));
        let messenger = RecordingMessenger::default();

        handle_message(&messenger, &ctx, alice(), Some("hello")).await;
        handle_message(&messenger, &ctx, ObservedChat::new(7), None).await;

        assert!(messenger.sent().is_empty());
        assert_eq!(ctx.known_count().await, 2);
        assert!(!ctx.roster.path().exists());
    }

    #[tokio::test]
    async fn status_reports_known_chats() {
        let dir = tempdir().unwrap();
        let ctx = BotContext::new(config_in(dir.path()));
        let messenger = RecordingMessenger::default();

        ctx.observe(ObservedChat::new(1)).await;
        handle_message(&messenger, &ctx, ObservedChat::new(2), Some("/status")).await;

        assert_eq!(messenger.sent(), vec![Sent::Text(2, status_text(2))]);
    }

    #[tokio::test]
    async fn send_broadcasts_then_confirms() {
        let dir = tempdir().unwrap();
        let ctx = BotContext::new(config_in(dir.path()));
        std::fs::create_dir(dir.path().join("photos")).unwrap();
        std::fs::write(dir.path().join("photos").join("1.jpg"), b"img").unwrap();
        std::fs::write(
            ctx.roster.path(),
            "username,gender,lastname,chat_id\nbob,Mr.,Jones,\n",
        )
        .unwrap();
        ctx.observe(ObservedChat::new(200).with_username(Some("Bob"))).await;
        let messenger = RecordingMessenger::default();

        handle_message(&messenger, &ctx, ObservedChat::new(1), Some("/send")).await;

        let sent = messenger.sent();
        assert_eq!(sent[0], Sent::Text(200, "Hi Jones".into()));
        assert_eq!(sent[1], Sent::Photo(200, "1.jpg".into()));
        match &sent[2] {
            Sent::Text(1, text) => assert!(text.contains("1 delivered")),
            other => panic!("unexpected send: {:?}", other),
        }
    }

    #[tokio::test]
    async fn locked_roster_still_gets_help() {
        let dir = tempdir().unwrap();
        let ctx = BotContext::new(config_in(dir.path()));
        let _held = RosterLock::acquire(ctx.roster.path()).unwrap();
        let messenger = RecordingMessenger::default();

        handle_message(&messenger, &ctx, alice(), Some("/start")).await;

        assert_eq!(messenger.sent(), vec![Sent::Text(100, HELP_TEXT.into())]);
        assert!(!ctx.roster.path().exists());
    }

    #[tokio::test]
    async fn online_notice_reaches_every_known_chat() {
        let dir = tempdir().unwrap();
        let ctx = BotContext::new(config_in(dir.path()));
        ctx.observe(ObservedChat::new(3)).await;
        ctx.observe(ObservedChat::new(1)).await;
        let messenger = RecordingMessenger::failing(&[3]);

        let reached = notify_online(&messenger, &ctx).await;

        assert_eq!(reached, 1);
        assert_eq!(messenger.sent(), vec![Sent::Text(1, ONLINE_TEXT.into())]);
    }
}
