//! Outgoing messages.
//!
//! [`Messenger`] is the seam between broadcast logic and the Telegram Bot
//! API; [`TelegramMessenger`] is the real implementation and tests plug in
//! a recording one.

use std::future::Future;
use std::path::{Path, PathBuf};

use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile};
use tracing::{info, warn};

use crate::error::Result;
use crate::metrics;
use crate::photos;

pub trait Messenger: Send + Sync {
    fn send_text(&self, chat_id: i64, text: &str) -> impl Future<Output = Result<()>> + Send;

    fn send_photo(&self, chat_id: i64, photo: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// Result of sending one photo of a batch.
#[derive(Debug)]
pub struct PhotoDelivery {
    pub path: PathBuf,
    pub result: Result<()>,
}

impl PhotoDelivery {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Send `count` photos of `folder`, starting at `offset` in numeric order.
///
/// Fails only when the folder cannot be read; individual send failures are
/// reported per photo.
pub async fn send_image_batch<M: Messenger>(
    messenger: &M,
    chat_id: i64,
    folder: &Path,
    count: usize,
    offset: usize,
) -> Result<Vec<PhotoDelivery>> {
    let batch = photos::select_batch(folder, count, offset)?;
    let mut deliveries = Vec::with_capacity(batch.len());

    for path in batch {
        let result = messenger.send_photo(chat_id, &path).await;
        metrics::record_delivery("photo", result.is_ok());
        match &result {
            Ok(()) => info!(chat_id, photo = %path.display(), "Photo sent"),
            Err(err) => warn!(chat_id, photo = %path.display(), "Photo not sent: {}", err),
        }
        deliveries.push(PhotoDelivery { path, result });
    }
    Ok(deliveries)
}

/// Send a text and record the delivery metric.
pub async fn send_text_logged<M: Messenger>(messenger: &M, chat_id: i64, text: &str) -> Result<()> {
    let result = messenger.send_text(chat_id, text).await;
    metrics::record_delivery("text", result.is_ok());
    match &result {
        Ok(()) => info!(chat_id, "Message sent"),
        Err(err) => warn!(chat_id, "Message not sent: {}", err),
    }
    result
}

/// Messenger backed by a teloxide [`Bot`].
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

impl Messenger for TelegramMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, photo: &Path) -> Result<()> {
        self.bot
            .send_photo(ChatId(chat_id), InputFile::file(photo))
            .await?;
        Ok(())
    }
}
