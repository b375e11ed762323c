use std::env;

use clientq_core::util::is_http_url;

use crate::cli::ConfigCommands;
use crate::config_profiles::{normalize_text_option, CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            supabase_url,
            supabase_anon_key,
            clients_table,
            pending_table,
            notification_ttl_secs,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            CliProfile {
                supabase_url,
                supabase_anon_key,
                clients_table,
                pending_table,
                notification_ttl_secs,
            },
            no_activate,
        ),
        ConfigCommands::Show { profile } => run_config_show(profile.as_deref().or(global_profile)),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    explicit: CliProfile,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();
    let merged = merge_profile(explicit, &existing, |key| env::var(key).ok());

    validate_profile(&merged)?;
    *config.profile_mut_or_default(&profile_name) = merged.clone();
    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let missing_fields = missing_fields(&merged);
    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `clientq auth login --email <email> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

fn run_config_show(profile_name: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let Some(profile) = config.profile(&profile_name) else {
        println!("Profile '{profile_name}' is not configured.");
        return Ok(());
    };

    let mut shown = profile.clone();
    shown.supabase_anon_key = shown.supabase_anon_key().map(|key| mask_secret(&key));
    println!("Profile '{profile_name}':");
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

/// Explicit flags win, then environment variables, then the stored profile.
pub fn merge_profile(
    explicit: CliProfile,
    existing: &CliProfile,
    lookup: impl Fn(&str) -> Option<String>,
) -> CliProfile {
    CliProfile {
        supabase_url: normalize_text_option(explicit.supabase_url)
            .or_else(|| normalize_text_option(lookup("SUPABASE_URL")))
            .or_else(|| existing.supabase_url()),
        supabase_anon_key: normalize_text_option(explicit.supabase_anon_key)
            .or_else(|| normalize_text_option(lookup("SUPABASE_ANON_KEY")))
            .or_else(|| existing.supabase_anon_key()),
        clients_table: normalize_text_option(explicit.clients_table)
            .or_else(|| normalize_text_option(existing.clients_table.clone())),
        pending_table: normalize_text_option(explicit.pending_table)
            .or_else(|| normalize_text_option(existing.pending_table.clone())),
        notification_ttl_secs: explicit
            .notification_ttl_secs
            .or(existing.notification_ttl_secs),
    }
}

fn validate_profile(profile: &CliProfile) -> Result<(), CliError> {
    if let Some(url) = profile.supabase_url() {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
    }
    if profile.clients_table.is_some() && profile.clients_table == profile.pending_table {
        return Err(CliError::Config(
            "clients_table and pending_table must be different".to_string(),
        ));
    }
    Ok(())
}

fn missing_fields(profile: &CliProfile) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if profile.supabase_url().is_none() {
        missing.push("supabase_url");
    }
    if profile.supabase_anon_key().is_none() {
        missing.push("supabase_anon_key");
    }
    missing
}

pub fn mask_secret(value: &str) -> String {
    let visible = value.chars().take(6).collect::<String>();
    if value.chars().count() <= 6 {
        "***".to_string()
    } else {
        format!("{visible}***")
    }
}
