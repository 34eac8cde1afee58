//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI.

pub mod broadcast;
pub mod list;
pub mod notify;
pub mod upsert;

pub use list::OutputFormat;

use teloxide::Bot;

use crate::bot::{self, BotContext};
use crate::config::Config;
use crate::error::Result;

/// Bot plus a context primed with the chats Telegram still reports.
pub(crate) async fn connect(config: Config) -> Result<(Bot, BotContext)> {
    let bot = Bot::new(config.require_token()?);
    let ctx = BotContext::new(config);
    bot::collect_known_chats(&bot, &ctx).await?;
    Ok((bot, ctx))
}
