use clientq_core::ClientId;

use crate::commands::common::open_session;
use crate::error::CliError;

pub async fn run_delete(id: ClientId, global_profile: Option<&str>) -> Result<(), CliError> {
    let context = open_session(global_profile).await?;
    let directory = context.directory()?;
    directory.refresh().await?;
    directory.remove(id, context.user()).await?;
    println!("{id}");
    Ok(())
}
