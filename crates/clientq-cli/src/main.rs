//! clientq CLI - Review and manage client records from the terminal
//!
//! Regular users submit and maintain their own client records; administrators
//! work the pending approval queue.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};
use clientq_core::Decision;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::decide::run_decide;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::pending::run_pending;
use crate::commands::submit::run_submit;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "clientq=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Some(Commands::Submit { title, text }) => run_submit(&title, &text, profile).await?,
        Some(Commands::List { mine, json }) => run_list(mine, json, profile).await?,
        Some(Commands::Edit { id, title, text }) => {
            run_edit(id, title.as_deref(), text.as_deref(), profile).await?;
        }
        Some(Commands::Delete { id }) => run_delete(id, profile).await?,
        Some(Commands::Pending { json }) => run_pending(json, profile).await?,
        Some(Commands::Approve { id }) => run_decide(id, Decision::Approve, profile).await?,
        Some(Commands::Reject { id }) => run_decide(id, Decision::Reject, profile).await?,
        Some(Commands::Watch) => run_watch(profile).await?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        Some(Commands::Config { command }) => run_config(command, profile)?,
        Some(Commands::Auth { command }) => run_auth(command, profile).await?,
        None => {
            Cli::command().print_help().map_err(CliError::Io)?;
            println!();
        }
    }

    Ok(())
}
