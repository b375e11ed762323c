use chrono::Utc;

use crate::commands::common::{
    format_pending_lines, open_admin_session, pending_to_list_item, ClientListItem,
};
use crate::error::CliError;

pub async fn run_pending(as_json: bool, global_profile: Option<&str>) -> Result<(), CliError> {
    let context = open_admin_session(global_profile).await?;
    let queue = context.queue()?;
    queue.load_initial().await?;

    let pending = queue.snapshot().pending;
    let now = Utc::now();
    if as_json {
        let items = pending
            .iter()
            .map(|record| pending_to_list_item(record, now))
            .collect::<Vec<ClientListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if pending.is_empty() {
        println!("No clients waiting for approval.");
    } else {
        for line in format_pending_lines(&pending, now) {
            println!("{line}");
        }
    }
    Ok(())
}
