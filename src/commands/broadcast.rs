//! One-shot broadcast from the command line

use tracing::warn;

use crate::broadcast::{self, BroadcastSummary, DeliveryStatus};
use crate::config::Config;
use crate::error::Result;
use crate::known_users::KnownUsers;
use crate::messenger::TelegramMessenger;
use crate::roster::Roster;

fn print_summary(summary: &BroadcastSummary) {
    for report in &summary.reports {
        let chat = report
            .chat_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let line = match &report.status {
            DeliveryStatus::Delivered {
                photos_sent,
                photos_failed,
            } => format!("✅ sent, {} photo(s), {} failed", photos_sent, photos_failed),
            DeliveryStatus::Unresolved => "❌ not found or has not messaged the bot".to_string(),
            DeliveryStatus::Failed { reason } => format!("⚠️  failed: {}", reason),
            DeliveryStatus::Planned { photos } => format!("📝 would send {} photo(s)", photos),
        };
        println!("[{}] {} ({}): {}", report.index + 1, report.label, chat, line);
    }
    println!("\n{}", summary.summary_text());
}

/// Broadcast to the roster. A dry run without a token resolves only the
/// chat ids stored in the roster.
pub async fn run(config: Config, dry_run: bool) -> Result<BroadcastSummary> {
    let users = Roster::new(&config.roster_path).read_all()?;
    println!("📤 {} roster user(s)", users.len());

    if dry_run && config.require_token().is_err() {
        warn!("No bot token, planning with roster chat ids only");
        let summary = broadcast::plan(&users, &KnownUsers::default(), &config.broadcast);
        print_summary(&summary);
        return Ok(summary);
    }

    let settings = config.broadcast.clone();
    let (bot, ctx) = super::connect(config).await?;
    let known = ctx.known.read().await.clone();

    let summary = if dry_run {
        broadcast::plan(&users, &known, &settings)
    } else {
        let messenger = TelegramMessenger::new(bot);
        broadcast::broadcast(&messenger, &users, &known, &settings).await
    };
    print_summary(&summary);
    Ok(summary)
}
