use tracing::{info, warn};

use crate::auth::AppState;

/// Background task mailing receivers about unread messages.
///
/// Runs on an interval; each run sends at most one email per
/// sender → receiver direction and then marks the mailed messages notified.
pub async fn run_notification_loop(state: AppState) {
    let mut interval = tokio::time::interval(state.config.notify_interval);

    loop {
        interval.tick().await;

        match notify_unread_messages(&state).await {
            Ok(count) => {
                if count > 0 {
                    info!("Notifications: sent {} emails", count);
                }
            }
            Err(e) => {
                warn!("Notification error: {}", e);
            }
        }
    }
}

/// One notification run. Returns the number of emails sent.
pub async fn notify_unread_messages(state: &AppState) -> anyhow::Result<usize> {
    let db = state.clone();
    let groups = tokio::task::spawn_blocking(move || db.db.read_unnotified()).await??;

    let mut sent = 0;
    let mut notified: Vec<String> = Vec::new();
    for group in &groups {
        match state.mailer.send_message_notification(group).await {
            Ok(()) => {
                sent += 1;
                notified.extend(group.messages.iter().map(|m| m.id.clone()));
            }
            // Left unnotified; the next run retries.
            Err(e) => warn!(
                "Failed to notify {} about messages from {}: {}",
                group.receiver, group.sender, e
            ),
        }
    }

    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.mark_notified(&notified)).await??;

    Ok(sent)
}
