use chrono::{DateTime, Utc};
use clientq_core::auth::AuthUser;
use clientq_core::config::ServiceConfig;
use clientq_core::queue::{PendingQueue, QueueConfig};
use clientq_core::services::ClientDirectory;
use clientq_core::store::PostgrestStore;
use clientq_core::util::format_relative_age;
use clientq_core::{ClientRecord, PendingRecord};
use serde::Serialize;

use crate::auth::{AuthSession, SupabaseAuthService};
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// Everything a signed-in command needs.
pub struct SessionContext {
    pub profile_name: String,
    pub config: ServiceConfig,
    pub session: AuthSession,
}

impl SessionContext {
    pub fn user(&self) -> &AuthUser {
        &self.session.user
    }

    pub fn store(&self) -> Result<PostgrestStore, CliError> {
        Ok(PostgrestStore::new(&self.config)?.with_access_token(&self.session.access_token))
    }

    pub fn directory(&self) -> Result<ClientDirectory<PostgrestStore>, CliError> {
        Ok(ClientDirectory::new(self.store()?))
    }

    pub fn queue(&self) -> Result<PendingQueue<PostgrestStore>, CliError> {
        Ok(PendingQueue::new(
            self.store()?,
            QueueConfig::from(&self.config),
        ))
    }
}

/// Resolve the profile, restore its session, and build the service config.
pub async fn open_session(global_profile: Option<&str>) -> Result<SessionContext, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();
    let service_config = profile.service_config(|key| std::env::var(key).ok())?;

    let auth_service = SupabaseAuthService::new(
        &profile_name,
        &service_config.supabase_url,
        &service_config.supabase_anon_key,
    )
    .map_err(|error| CliError::Auth(error.to_string()))?;
    let session = auth_service
        .restore_session()
        .await
        .map_err(|error| CliError::Auth(error.to_string()))?
        .ok_or(CliError::NotSignedIn)?;

    tracing::debug!(
        "Using profile '{}' as {}",
        profile_name,
        session.user.email.as_deref().unwrap_or(&session.user.id)
    );
    Ok(SessionContext {
        profile_name,
        config: service_config,
        session,
    })
}

/// Same as [`open_session`] but only for administrators.
pub async fn open_admin_session(global_profile: Option<&str>) -> Result<SessionContext, CliError> {
    let context = open_session(global_profile).await?;
    require_admin(&context.session)?;
    Ok(context)
}

pub fn require_admin(session: &AuthSession) -> Result<(), CliError> {
    if session.role().is_admin() {
        Ok(())
    } else {
        Err(CliError::AdminRequired)
    }
}

#[derive(Debug, Serialize)]
pub struct ClientListItem {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub relative_time: String,
}

pub fn client_to_list_item(client: &ClientRecord, now: DateTime<Utc>) -> ClientListItem {
    ClientListItem {
        id: client.id.get(),
        title: client.title.clone(),
        text: client.text.clone(),
        created_at: client.created_at,
        created_by: client.created_by.clone(),
        relative_time: format_relative_age(client.created_at, now),
    }
}

pub fn pending_to_list_item(record: &PendingRecord, now: DateTime<Utc>) -> ClientListItem {
    client_to_list_item(&ClientRecord::from(record.clone()), now)
}

pub fn preview(text: &str, max_chars: usize) -> String {
    let compact = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.chars().count() <= max_chars {
        return compact;
    }
    let mut truncated = compact
        .chars()
        .take(max_chars.saturating_sub(3))
        .collect::<String>();
    truncated.push_str("...");
    truncated
}

/// One line per client; records owned by `user_id` are starred.
pub fn format_client_lines(
    clients: &[ClientRecord],
    user_id: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<String> {
    clients
        .iter()
        .map(|client| {
            let marker = if user_id.is_some_and(|id| client.is_created_by(id)) {
                '*'
            } else {
                ' '
            };
            format_line(
                marker,
                client.id.get(),
                &client.title,
                &client.text,
                client.created_at,
                now,
            )
        })
        .collect()
}

pub fn format_pending_lines(records: &[PendingRecord], now: DateTime<Utc>) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            format_line(
                ' ',
                record.id.get(),
                &record.title,
                &record.text,
                record.created_at,
                now,
            )
        })
        .collect()
}

fn format_line(
    marker: char,
    id: i64,
    title: &str,
    text: &str,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> String {
    let title = preview(title, 24);
    let text = preview(text, 40);
    let age = format_relative_age(created_at, now);
    format!("{marker}{id:>6}  {title:<24}  {text:<40}  {age}")
}

pub fn join_text(parts: &[String]) -> Result<String, CliError> {
    let text = parts.join(" ");
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyText)
    } else {
        Ok(trimmed.to_string())
    }
}
