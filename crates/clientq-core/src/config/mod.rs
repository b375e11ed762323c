//! Service configuration.
//!
//! `ServiceConfig` carries the public Supabase endpoint/key and the table
//! names the approval workflow reads and writes. Secret credentials must never
//! be stored here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_CLIENTS_TABLE: &str = "clients";
pub const DEFAULT_PENDING_TABLE: &str = "clientstemp";
pub const DEFAULT_NOTIFICATION_TTL_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    #[serde(default = "default_clients_table")]
    pub clients_table: String,
    #[serde(default = "default_pending_table")]
    pub pending_table: String,
    #[serde(default = "default_notification_ttl_secs")]
    pub notification_ttl_secs: u64,
}

fn default_clients_table() -> String {
    DEFAULT_CLIENTS_TABLE.to_string()
}

fn default_pending_table() -> String {
    DEFAULT_PENDING_TABLE.to_string()
}

const fn default_notification_ttl_secs() -> u64 {
    DEFAULT_NOTIFICATION_TTL_SECS
}

impl ServiceConfig {
    /// Build a validated config with default table names.
    pub fn new(supabase_url: impl Into<String>, supabase_anon_key: impl Into<String>) -> Result<Self> {
        Self {
            supabase_url: supabase_url.into(),
            supabase_anon_key: supabase_anon_key.into(),
            clients_table: default_clients_table(),
            pending_table: default_pending_table(),
            notification_ttl_secs: DEFAULT_NOTIFICATION_TTL_SECS,
        }
        .validated()
    }

    /// Read `SUPABASE_URL`, `SUPABASE_ANON_KEY` and the optional `CLIENTQ_*`
    /// overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let supabase_url = normalize_text_option(lookup("SUPABASE_URL"))
            .ok_or_else(|| Error::Config("SUPABASE_URL is not set".to_string()))?;
        let supabase_anon_key = normalize_text_option(lookup("SUPABASE_ANON_KEY"))
            .ok_or_else(|| Error::Config("SUPABASE_ANON_KEY is not set".to_string()))?;

        let mut config = Self::new(supabase_url, supabase_anon_key)?;
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Apply optional `CLIENTQ_*` table/TTL overrides.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(table) = normalize_text_option(lookup("CLIENTQ_CLIENTS_TABLE")) {
            self.clients_table = table;
        }
        if let Some(table) = normalize_text_option(lookup("CLIENTQ_PENDING_TABLE")) {
            self.pending_table = table;
        }
        if let Some(raw) = normalize_text_option(lookup("CLIENTQ_NOTIFICATION_TTL_SECS")) {
            self.notification_ttl_secs = raw.parse().map_err(|_| {
                Error::Config(format!("CLIENTQ_NOTIFICATION_TTL_SECS must be an integer, got '{raw}'"))
            })?;
        }
        Ok(())
    }

    /// Normalize URL/key and reject unusable values.
    pub fn validated(mut self) -> Result<Self> {
        let url = normalize_text_option(Some(self.supabase_url))
            .ok_or_else(|| Error::Config("Supabase URL must not be empty".to_string()))?;
        if !is_http_url(&url) {
            return Err(Error::Config(
                "Supabase URL must include http:// or https://".to_string(),
            ));
        }
        self.supabase_url = url.trim_end_matches('/').to_string();
        self.supabase_anon_key = normalize_text_option(Some(self.supabase_anon_key))
            .ok_or_else(|| Error::Config("Supabase anon key must not be empty".to_string()))?;
        if self.clients_table.trim().is_empty() || self.pending_table.trim().is_empty() {
            return Err(Error::Config("table names must not be empty".to_string()));
        }
        if self.clients_table == self.pending_table {
            return Err(Error::Config(
                "clients and pending tables must be different".to_string(),
            ));
        }
        Ok(self)
    }

    /// PostgREST base, e.g. `https://x.supabase.co/rest/v1`.
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url)
    }

    /// Realtime websocket endpoint with the anon key and protocol version.
    pub fn realtime_url(&self) -> String {
        let ws_base = if let Some(rest) = self.supabase_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.supabase_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.supabase_url.clone()
        };
        format!(
            "{ws_base}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            urlencoding::encode(&self.supabase_anon_key)
        )
    }

    pub const fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.notification_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn from_lookup_applies_defaults_and_overrides() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("SUPABASE_URL", " https://demo.supabase.co/ "),
            ("SUPABASE_ANON_KEY", "anon"),
            ("CLIENTQ_PENDING_TABLE", "clients_pending"),
            ("CLIENTQ_NOTIFICATION_TTL_SECS", "8"),
        ]))
        .unwrap();

        assert_eq!(config.supabase_url, "https://demo.supabase.co");
        assert_eq!(config.clients_table, "clients");
        assert_eq!(config.pending_table, "clients_pending");
        assert_eq!(config.notification_ttl(), Duration::from_secs(8));
    }

    #[test]
    fn from_lookup_requires_url_and_key() {
        let error = ServiceConfig::from_lookup(lookup_from(&[("SUPABASE_ANON_KEY", "anon")]))
            .unwrap_err();
        assert!(error.to_string().contains("SUPABASE_URL"));
    }

    #[test]
    fn rejects_non_http_url_and_bad_ttl() {
        assert!(ServiceConfig::new("demo.supabase.co", "anon").is_err());
        let error = ServiceConfig::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://demo.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("CLIENTQ_NOTIFICATION_TTL_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(error.to_string().contains("integer"));
    }

    #[test]
    fn rejects_identical_tables() {
        let mut config = ServiceConfig::new("https://demo.supabase.co", "anon").unwrap();
        config.pending_table = "clients".to_string();
        assert!(config.validated().is_err());
    }

    #[test]
    fn derives_rest_and_realtime_urls() {
        let config = ServiceConfig::new("https://demo.supabase.co", "anon key").unwrap();
        assert_eq!(config.rest_url(), "https://demo.supabase.co/rest/v1");
        assert_eq!(
            config.realtime_url(),
            "wss://demo.supabase.co/realtime/v1/websocket?apikey=anon%20key&vsn=1.0.0"
        );

        let local = ServiceConfig::new("http://127.0.0.1:54321", "anon").unwrap();
        assert!(local.realtime_url().starts_with("ws://127.0.0.1:54321/realtime/v1/"));
    }
}
