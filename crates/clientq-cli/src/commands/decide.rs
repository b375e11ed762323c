use clientq_core::queue::ResolveOutcome;
use clientq_core::{ClientId, Decision};

use crate::commands::common::open_admin_session;
use crate::error::CliError;

pub async fn run_decide(
    id: ClientId,
    decision: Decision,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let context = open_admin_session(global_profile).await?;
    let queue = context.queue()?;
    queue.load_initial().await?;

    let record = queue.get(id).ok_or(CliError::PendingNotFound(id))?;
    match queue.resolve(&record, decision).await? {
        ResolveOutcome::Resolved => println!("Client {id} {}", decision.past_tense()),
        ResolveOutcome::NotPending | ResolveOutcome::InFlight => {
            return Err(CliError::PendingNotFound(id));
        }
    }
    Ok(())
}
