use clientq_core::models::ClientUpdate;
use clientq_core::{ClientId, Error};

use crate::commands::common::open_session;
use crate::error::CliError;

pub async fn run_edit(
    id: ClientId,
    title: Option<&str>,
    text: Option<&str>,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    if title.is_none() && text.is_none() {
        return Err(CliError::NothingToEdit);
    }

    let context = open_session(global_profile).await?;
    let directory = context.directory()?;
    directory.refresh().await?;
    let current = directory.get(id).await.ok_or(Error::NotFound(id))?;

    let update = ClientUpdate::new(
        title.unwrap_or(&current.title),
        text.unwrap_or(&current.text),
    )?;
    directory.edit(id, &update, context.user()).await?;
    println!("{id}");
    Ok(())
}
