use chrono::Utc;

use crate::commands::common::{
    client_to_list_item, format_client_lines, open_session, ClientListItem,
};
use crate::error::CliError;

pub async fn run_list(mine: bool, as_json: bool, global_profile: Option<&str>) -> Result<(), CliError> {
    let context = open_session(global_profile).await?;
    let directory = context.directory()?;
    directory.refresh().await?;

    let user_id = context.user().id.as_str();
    let mut clients = directory.clients().await;
    if mine {
        clients.retain(|client| client.is_created_by(user_id));
    }

    let now = Utc::now();
    if as_json {
        let items = clients
            .iter()
            .map(|client| client_to_list_item(client, now))
            .collect::<Vec<ClientListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for line in format_client_lines(&clients, Some(user_id), now) {
            println!("{line}");
        }
    }

    Ok(())
}
