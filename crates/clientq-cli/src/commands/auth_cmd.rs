use clientq_core::auth::SignUpOutcome;
use clientq_core::models::Role;

use crate::auth::{clear_stored_session, load_stored_session, SupabaseAuthService};
use crate::cli::AuthCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::Login {
            profile,
            email,
            password,
        } => {
            let (profile_name, auth_service) =
                configured_auth_service(profile.as_deref().or(global_profile))?;
            let session = auth_service
                .sign_in(&email, &password)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!(
                "Signed in profile '{profile_name}' as {email_label} ({})",
                session.role()
            );
            Ok(())
        }
        AuthCommands::Signup {
            profile,
            email,
            password,
            admin,
        } => {
            let (profile_name, auth_service) =
                configured_auth_service(profile.as_deref().or(global_profile))?;
            let role = if admin { Role::Admin } else { Role::User };
            let outcome = auth_service
                .sign_up(&email, &password, role)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            match outcome {
                SignUpOutcome::SignedIn(session) => {
                    println!(
                        "Created {} account and signed in profile '{profile_name}' as {}",
                        session.role(),
                        session.user.email.as_deref().unwrap_or(&email)
                    );
                }
                SignUpOutcome::ConfirmationRequired => {
                    println!(
                        "Created {role} account for {email}. Confirm the email, then run `clientq auth login`."
                    );
                }
            }
            Ok(())
        }
        AuthCommands::Status { profile } => {
            let config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            let Some(profile) = config.profile(&profile_name) else {
                println!("Profile '{profile_name}' is not configured.");
                return Ok(());
            };

            let maybe_auth_service = SupabaseAuthService::new_for_profile(&profile_name, profile)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            let session = if let Some(service) = maybe_auth_service {
                service
                    .restore_session()
                    .await
                    .map_err(|error| CliError::Auth(error.to_string()))?
            } else {
                load_stored_session(&profile_name)
                    .map_err(|error| CliError::Auth(error.to_string()))?
            };

            if let Some(session) = session {
                let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                println!(
                    "Profile '{}' is signed in as {} with role {} (expires_at={})",
                    profile_name,
                    email_label,
                    session.role(),
                    session.expires_at
                );
            } else {
                println!("Profile '{profile_name}' is not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout { profile } => {
            let config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            let stored_session = load_stored_session(&profile_name)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            let maybe_auth_service = config
                .profile(&profile_name)
                .map(|profile| SupabaseAuthService::new_for_profile(&profile_name, profile))
                .transpose()
                .map_err(|error| CliError::Auth(error.to_string()))?
                .flatten();

            if let (Some(service), Some(session)) = (maybe_auth_service, stored_session) {
                service
                    .sign_out(&session.access_token)
                    .await
                    .map_err(|error| CliError::Auth(error.to_string()))?;
            } else {
                clear_stored_session(&profile_name)
                    .map_err(|error| CliError::Auth(error.to_string()))?;
            }

            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}

fn configured_auth_service(
    profile: Option<&str>,
) -> Result<(String, SupabaseAuthService), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile);
    let profile_config = config.profile(&profile_name).ok_or_else(|| {
        CliError::Config(format!(
            "Profile '{profile_name}' is not configured. Run `clientq config init --profile {profile_name}` first."
        ))
    })?;
    let auth_service = SupabaseAuthService::new_for_profile(&profile_name, profile_config)
        .map_err(|error| CliError::Auth(error.to_string()))?
        .ok_or_else(|| {
            CliError::Config(format!(
                "Profile '{profile_name}' missing Supabase auth config. Set SUPABASE_URL and SUPABASE_ANON_KEY via `clientq config init`."
            ))
        })?;
    Ok((profile_name, auth_service))
}
