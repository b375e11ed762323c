//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clientq_core::config::ServiceConfig;
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "cli-config.json";
pub const PROFILE_ENV_VAR: &str = "CLIENTQ_PROFILE";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default)]
    pub clients_table: Option<String>,
    #[serde(default)]
    pub pending_table: Option<String>,
    #[serde(default)]
    pub notification_ttl_secs: Option<u64>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join("clientq").join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    clientq_core::util::normalize_text_option(value)
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Explicit name, then `CLIENTQ_PROFILE`, then the active profile, then "default".
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        self.resolve_profile_name_with(explicit, std::env::var(PROFILE_ENV_VAR).ok())
    }

    fn resolve_profile_name_with(&self, explicit: Option<&str>, from_env: Option<String>) -> String {
        normalize_profile_name(explicit)
            .or_else(|| normalize_profile_name(from_env.as_deref()))
            .or_else(|| normalize_profile_name(self.active_profile.as_deref()))
            .unwrap_or_else(|| "default".to_string())
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    pub fn supabase_url(&self) -> Option<String> {
        normalize_text_option(self.supabase_url.clone())
    }

    pub fn supabase_anon_key(&self) -> Option<String> {
        normalize_text_option(self.supabase_anon_key.clone())
    }

    /// Build the service config from this profile, filling gaps from `lookup`
    /// (`SUPABASE_URL`, `SUPABASE_ANON_KEY`) and applying `CLIENTQ_*` overrides.
    pub fn service_config(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> clientq_core::Result<ServiceConfig> {
        let url = self
            .supabase_url()
            .or_else(|| normalize_text_option(lookup("SUPABASE_URL")))
            .ok_or_else(|| {
                clientq_core::Error::Config(
                    "Supabase URL missing; run `clientq config init` or set SUPABASE_URL".to_string(),
                )
            })?;
        let anon_key = self
            .supabase_anon_key()
            .or_else(|| normalize_text_option(lookup("SUPABASE_ANON_KEY")))
            .ok_or_else(|| {
                clientq_core::Error::Config(
                    "Supabase anon key missing; run `clientq config init` or set SUPABASE_ANON_KEY"
                        .to_string(),
                )
            })?;

        let mut config = ServiceConfig::new(url, anon_key)?;
        if let Some(table) = normalize_text_option(self.clients_table.clone()) {
            config.clients_table = table;
        }
        if let Some(table) = normalize_text_option(self.pending_table.clone()) {
            config.pending_table = table;
        }
        if let Some(ttl) = self.notification_ttl_secs {
            config.notification_ttl_secs = ttl;
        }
        config.apply_overrides(lookup)?;
        config.validated()
    }

    fn normalize(&mut self) {
        self.supabase_url = normalize_text_option(self.supabase_url.clone());
        self.supabase_anon_key = normalize_text_option(self.supabase_anon_key.clone());
        self.clients_table = normalize_text_option(self.clients_table.clone());
        self.pending_table = normalize_text_option(self.pending_table.clone());
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn normalize_profile_name_rejects_empty() {
        assert_eq!(normalize_profile_name(None), None);
        assert_eq!(normalize_profile_name(Some(" ")), None);
        assert_eq!(normalize_profile_name(Some(" work ")), Some("work".to_string()));
    }

    #[test]
    fn config_roundtrip_preserves_profiles() {
        let path = std::env::temp_dir().join(format!(
            "clientq-cli-config-test-{}.json",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map_or(0, |duration| duration.as_nanos())
        ));

        let mut config = CliProfilesConfig {
            version: 1,
            active_profile: Some("default".to_string()),
            profiles: BTreeMap::new(),
        };
        config.profiles.insert(
            "default".to_string(),
            CliProfile {
                supabase_url: Some(" https://project.supabase.co ".to_string()),
                supabase_anon_key: Some(" anon-key ".to_string()),
                clients_table: None,
                pending_table: Some(" review ".to_string()),
                notification_ttl_secs: Some(8),
            },
        );

        config.save_to_path(&path).unwrap();
        let loaded = CliProfilesConfig::load_from_path(&path).unwrap();
        let profile = loaded.profiles.get("default").unwrap();
        assert_eq!(
            profile.supabase_url.as_deref(),
            Some("https://project.supabase.co")
        );
        assert_eq!(profile.supabase_anon_key.as_deref(), Some("anon-key"));
        assert_eq!(profile.pending_table.as_deref(), Some("review"));
        assert_eq!(profile.notification_ttl_secs, Some(8));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn resolve_profile_name_prefers_explicit_then_env_then_active() {
        let config = CliProfilesConfig {
            version: 1,
            active_profile: Some("work".to_string()),
            profiles: BTreeMap::new(),
        };
        assert_eq!(
            config.resolve_profile_name_with(Some("mobile"), Some("env".to_string())),
            "mobile"
        );
        assert_eq!(
            config.resolve_profile_name_with(None, Some("env".to_string())),
            "env"
        );
        assert_eq!(config.resolve_profile_name_with(None, None), "work");
        assert_eq!(
            CliProfilesConfig::default().resolve_profile_name_with(None, None),
            "default"
        );
    }

    #[test]
    fn service_config_uses_profile_tables_and_env_fallbacks() {
        let profile = CliProfile {
            supabase_url: None,
            supabase_anon_key: Some("anon".to_string()),
            clients_table: Some("approved".to_string()),
            pending_table: None,
            notification_ttl_secs: Some(9),
        };
        let config = profile
            .service_config(|key| {
                (key == "SUPABASE_URL").then(|| "https://demo.supabase.co/".to_string())
            })
            .unwrap();

        assert_eq!(config.supabase_url, "https://demo.supabase.co");
        assert_eq!(config.clients_table, "approved");
        assert_eq!(config.pending_table, "clientstemp");
        assert_eq!(config.notification_ttl_secs, 9);
    }

    #[test]
    fn service_config_requires_url_and_key() {
        let profile = CliProfile::default();
        assert!(profile.service_config(no_env).is_err());
    }

    #[test]
    fn env_overrides_win_over_profile_tables() {
        let profile = CliProfile {
            supabase_url: Some("https://demo.supabase.co".to_string()),
            supabase_anon_key: Some("anon".to_string()),
            pending_table: Some("review".to_string()),
            ..CliProfile::default()
        };
        let config = profile
            .service_config(|key| (key == "CLIENTQ_PENDING_TABLE").then(|| "staging".to_string()))
            .unwrap();
        assert_eq!(config.pending_table, "staging");
    }
}
