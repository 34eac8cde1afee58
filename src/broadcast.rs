//! Personalized broadcast to the roster.
//!
//! Every roster user gets the rendered message template followed by their own
//! window of the photo folder: user `i` receives photos
//! `[i * per_user, i * per_user + per_user)`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::BroadcastSettings;
use crate::known_users::KnownUsers;
use crate::messenger::{self, Messenger};
use crate::photos;
use crate::user::UserRecord;

static SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").expect("valid regex"));

/// Fill `{username}`, `{gender}` and `{lastname}`; missing values render empty.
pub fn render_message(template: &str, user: &UserRecord) -> String {
    let field = |value: &Option<String>| value.as_deref().map(str::trim).unwrap_or("").to_string();

    let rendered = template
        .replace("{username}", &field(&user.handle))
        .replace("{gender}", &field(&user.display_gender))
        .replace("{lastname}", &field(&user.display_name));
    SPACE_RUNS.replace_all(&rendered, " ").trim().to_string()
}

/// Chat id for a roster user: the stored id first, then the username history.
pub fn resolve_chat_id(user: &UserRecord, known: &KnownUsers) -> Option<i64> {
    user.numeric_id
        .or_else(|| user.handle.as_deref().and_then(|h| known.find_chat_id(h)))
}

/// What happened for one roster user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DeliveryStatus {
    Delivered { photos_sent: usize, photos_failed: usize },
    /// No chat id could be resolved.
    Unresolved,
    /// The text message was rejected; photos were not attempted.
    Failed { reason: String },
    /// Dry run: would have been sent.
    Planned { photos: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub index: usize,
    pub label: String,
    pub chat_id: Option<i64>,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastSummary {
    pub reports: Vec<DeliveryReport>,
}

impl BroadcastSummary {
    pub fn delivered(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, DeliveryStatus::Delivered { .. }))
            .count()
    }

    pub fn unresolved(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.status == DeliveryStatus::Unresolved)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, DeliveryStatus::Failed { .. }))
            .count()
    }

    pub fn photos_sent(&self) -> usize {
        self.reports
            .iter()
            .map(|r| match r.status {
                DeliveryStatus::Delivered { photos_sent, .. } => photos_sent,
                _ => 0,
            })
            .sum()
    }

    /// Short text sent back to whoever asked for the broadcast.
    pub fn summary_text(&self) -> String {
        let mut text = format!(
            "✅ Broadcast finished: {} delivered, {} not found, {} failed ({} photos).",
            self.delivered(),
            self.unresolved(),
            self.failed(),
            self.photos_sent()
        );
        let missing: Vec<&str> = self
            .reports
            .iter()
            .filter(|r| r.status == DeliveryStatus::Unresolved)
            .map(|r| r.label.as_str())
            .collect();
        if !missing.is_empty() {
            text.push_str("\nNot found (they must message the bot first): ");
            text.push_str(&missing.join(", "));
        }
        text
    }
}

/// Send to every user in roster order. Per-user failures are reported, never
/// propagated.
pub async fn broadcast<M: Messenger>(
    messenger: &M,
    users: &[UserRecord],
    known: &KnownUsers,
    settings: &BroadcastSettings,
) -> BroadcastSummary {
    let per_user = settings.photos_per_user;
    let mut summary = BroadcastSummary::default();

    for (index, user) in users.iter().enumerate() {
        let offset = index.saturating_mul(per_user);
        let Some(chat_id) = resolve_or_report(&mut summary, index, user, known) else {
            continue;
        };

        let status = deliver(messenger, user, chat_id, offset, settings).await;
        info!(user = %user.label(), chat_id, offset, ?status, "Broadcast step done");
        summary.reports.push(DeliveryReport {
            index,
            label: user.label(),
            chat_id: Some(chat_id),
            status,
        });

        if !settings.delay.is_zero() && index + 1 < users.len() {
            sleep(settings.delay).await;
        }
    }

    info!(
        delivered = summary.delivered(),
        unresolved = summary.unresolved(),
        failed = summary.failed(),
        "Broadcast finished"
    );
    summary
}

/// Resolve recipients and photo windows without sending anything.
pub fn plan(users: &[UserRecord], known: &KnownUsers, settings: &BroadcastSettings) -> BroadcastSummary {
    let per_user = settings.photos_per_user;
    let mut summary = BroadcastSummary::default();

    for (index, user) in users.iter().enumerate() {
        let offset = index.saturating_mul(per_user);
        let Some(chat_id) = resolve_or_report(&mut summary, index, user, known) else {
            continue;
        };
        let photos = photos::select_batch(&settings.photos_dir, per_user, offset)
            .map(|batch| batch.len())
            .unwrap_or(0);
        summary.reports.push(DeliveryReport {
            index,
            label: user.label(),
            chat_id: Some(chat_id),
            status: DeliveryStatus::Planned { photos },
        });
    }
    summary
}

fn resolve_or_report(
    summary: &mut BroadcastSummary,
    index: usize,
    user: &UserRecord,
    known: &KnownUsers,
) -> Option<i64> {
    let chat_id = resolve_chat_id(user, known);
    if chat_id.is_none() {
        warn!(user = %user.label(), "User not found or has not messaged the bot, skipping");
        summary.reports.push(DeliveryReport {
            index,
            label: user.label(),
            chat_id: None,
            status: DeliveryStatus::Unresolved,
        });
    }
    chat_id
}

async fn deliver<M: Messenger>(
    messenger: &M,
    user: &UserRecord,
    chat_id: i64,
    offset: usize,
    settings: &BroadcastSettings,
) -> DeliveryStatus {
    let text = render_message(&settings.message_template, user);
    if let Err(err) = messenger::send_text_logged(messenger, chat_id, &text).await {
        return DeliveryStatus::Failed {
            reason: err.to_string(),
        };
    }

    match messenger::send_image_batch(
        messenger,
        chat_id,
        &settings.photos_dir,
        settings.photos_per_user,
        offset,
    )
    .await
    {
        Ok(deliveries) => {
            let photos_sent = deliveries.iter().filter(|d| d.is_ok()).count();
            DeliveryStatus::Delivered {
                photos_sent,
                photos_failed: deliveries.len() - photos_sent,
            }
        }
        Err(err) => {
            warn!(chat_id, "Photo folder unavailable: {}", err);
            DeliveryStatus::Delivered {
                photos_sent: 0,
                photos_failed: 0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::known_users::ObservedChat;
    use crate::messenger::testing::{RecordingMessenger, Sent};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    fn settings(dir: &Path, per_user: usize) -> BroadcastSettings {
        BroadcastSettings {
            photos_dir: dir.to_path_buf(),
            photos_per_user: per_user,
            delay: Duration::ZERO,
            message_template: "Hello {gender} {lastname}".to_string(),
        }
    }

    fn photo_folder(count: usize) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        for i in 1..=count {
            std::fs::write(dir.path().join(format!("{}.jpg", i)), b"img").unwrap();
        }
        dir
    }

    #[test]
    fn render_fills_placeholders_and_collapses_spaces() {
        let user = UserRecord::new()
            .with_handle("alice")
            .with_gender("Ms.")
            .with_name("Smith");
        assert_eq!(
            render_message("Hello {gender} {lastname} (@{username})", &user),
            "Hello Ms. Smith (@alice)"
        );

        let bare = UserRecord::new().with_name("Smith");
        assert_eq!(render_message("Hello {gender} {lastname}, hi", &bare), "Hello Smith, hi");
    }

    #[test]
    fn resolve_prefers_stored_chat_id() {
        let mut known = KnownUsers::default();
        known.observe(ObservedChat::new(500).with_username(Some("alice")));

        let stored = UserRecord::new().with_handle("alice").with_id(42);
        let by_name = UserRecord::new().with_handle("ALICE");
        let unknown = UserRecord::new().with_handle("bob");

        assert_eq!(resolve_chat_id(&stored, &known), Some(42));
        assert_eq!(resolve_chat_id(&by_name, &known), Some(500));
        assert_eq!(resolve_chat_id(&unknown, &known), None);
    }

    #[tokio::test]
    async fn each_user_gets_their_photo_window() {
        let photos = photo_folder(5);
        let users = vec![
            UserRecord::new().with_handle("alice").with_name("Smith").with_id(1),
            UserRecord::new().with_handle("bob").with_name("Jones").with_id(2),
        ];
        let messenger = RecordingMessenger::default();

        let summary = broadcast(
            &messenger,
            &users,
            &KnownUsers::default(),
            &settings(photos.path(), 3),
        )
        .await;

        assert_eq!(summary.delivered(), 2);
        assert_eq!(summary.photos_sent(), 5);
        assert_eq!(
            messenger.sent(),
            vec![
                Sent::Text(1, "Hello Smith".into()),
                Sent::Photo(1, "1.jpg".into()),
                Sent::Photo(1, "2.jpg".into()),
                Sent::Photo(1, "3.jpg".into()),
                Sent::Text(2, "Hello Jones".into()),
                Sent::Photo(2, "4.jpg".into()),
                Sent::Photo(2, "5.jpg".into()),
            ]
        );
    }

    #[tokio::test]
    async fn unresolved_users_keep_their_slot() {
        let photos = photo_folder(4);
        let users = vec![
            UserRecord::new().with_handle("ghost"),
            UserRecord::new().with_handle("bob").with_id(2),
        ];
        let messenger = RecordingMessenger::default();

        let summary = broadcast(
            &messenger,
            &users,
            &KnownUsers::default(),
            &settings(photos.path(), 2),
        )
        .await;

        assert_eq!(summary.unresolved(), 1);
        assert_eq!(summary.reports[0].status, DeliveryStatus::Unresolved);
        assert!(summary.summary_text().contains("@ghost"));
        assert_eq!(
            messenger.sent(),
            vec![
                Sent::Text(2, "Hello".into()),
                Sent::Photo(2, "3.jpg".into()),
                Sent::Photo(2, "4.jpg".into()),
            ]
        );
    }

    #[tokio::test]
    async fn rejected_text_skips_photos_but_not_other_users() {
        let photos = photo_folder(2);
        let users = vec![
            UserRecord::new().with_handle("blocked").with_id(1),
            UserRecord::new().with_handle("bob").with_id(2),
        ];
        let messenger = RecordingMessenger::failing(&[1]);

        let summary = broadcast(
            &messenger,
            &users,
            &KnownUsers::default(),
            &settings(photos.path(), 1),
        )
        .await;

        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.delivered(), 1);
        assert_eq!(
            messenger.sent(),
            vec![Sent::Text(2, "Hello".into()), Sent::Photo(2, "2.jpg".into())]
        );
    }

    #[test]
    fn plan_counts_photo_windows() {
        let photos = photo_folder(3);
        let users = vec![UserRecord::new().with_handle("alice").with_id(1)];

        let summary = plan(&users, &KnownUsers::default(), &settings(photos.path(), 2));

        assert_eq!(summary.reports[0].status, DeliveryStatus::Planned { photos: 2 });
        assert_eq!(summary.reports[0].chat_id, Some(1));
    }
}
