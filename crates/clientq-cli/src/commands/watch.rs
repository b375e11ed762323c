use clientq_core::queue::QueueSnapshot;
use clientq_core::realtime::SupabaseRealtimeFeed;

use crate::commands::common::{open_admin_session, preview};
use crate::error::CliError;

pub async fn run_watch(global_profile: Option<&str>) -> Result<(), CliError> {
    let context = open_admin_session(global_profile).await?;
    let queue = context.queue()?;
    let feed = SupabaseRealtimeFeed::from_config(&context.config)
        .with_access_token(&context.session.access_token);

    let mut changes = queue.subscribe();
    let mut live = queue.attach(&feed, &context.config.pending_table).await?;
    if let Err(error) = queue.load_initial().await {
        eprintln!("Initial load failed: {error}");
    }

    let mut previous = changes.borrow_and_update().clone();
    println!(
        "Watching '{}' for profile '{}' ({} pending). Press Ctrl-C to stop.",
        context.config.pending_table,
        context.profile_name,
        previous.pending.len()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            () = live.finished() => {
                eprintln!("Live feed ended");
                break;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = changes.borrow_and_update().clone();
                for line in describe_changes(&previous, &current) {
                    println!("{line}");
                }
                previous = current;
            }
        }
    }

    live.stop().await;
    queue.shutdown();
    Ok(())
}

/// Human-readable lines for what changed between two queue snapshots.
pub fn describe_changes(previous: &QueueSnapshot, current: &QueueSnapshot) -> Vec<String> {
    let mut lines = Vec::new();

    for notification in &current.notifications {
        if previous.notification(notification.id).is_none() {
            lines.push(format!(
                "New client #{}: {} - {}",
                notification.id,
                preview(&notification.title, 40),
                preview(&notification.text, 60)
            ));
        }
    }

    for record in &current.pending {
        let announced = current.notification(record.id).is_some();
        if !previous.contains(record.id) && !announced {
            lines.push(format!(
                "Pending #{}: {}",
                record.id,
                preview(&record.title, 40)
            ));
        }
    }

    for notification in &previous.notifications {
        if current.notification(notification.id).is_none() && current.contains(notification.id) {
            lines.push(format!("Notification for #{} dismissed", notification.id));
        }
    }

    for record in &previous.pending {
        if !current.contains(record.id) {
            lines.push(format!("Client #{} left the queue", record.id));
        }
    }

    lines
}
