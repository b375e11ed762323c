use std::io;

use clientq_core::ClientId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] clientq_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No client description provided")]
    EmptyText,
    #[error("Nothing to change; pass --title and/or --text")]
    NothingToEdit,
    #[error("Client {0} is not waiting for approval")]
    PendingNotFound(ClientId),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Not signed in. Run `clientq auth login --email <email> --password <password>` first.")]
    NotSignedIn,
    #[error("This command requires an ADMIN account")]
    AdminRequired,
}
