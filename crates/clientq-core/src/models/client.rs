//! Client record models

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Row identifier assigned by the store at insert time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(i64);

impl ClientId {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for ClientId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A client submission awaiting administrator approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRecord {
    pub id: ClientId,
    pub title: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Submitting user; provenance only, never checked on approval
    #[serde(default, deserialize_with = "null_as_empty")]
    pub created_by: String,
}

/// An approved client record from the permanent table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: ClientId,
    pub title: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub created_by: String,
}

impl ClientRecord {
    /// Whether `user_id` submitted this record
    #[must_use]
    pub fn is_created_by(&self, user_id: &str) -> bool {
        !user_id.is_empty() && self.created_by == user_id
    }
}

impl From<PendingRecord> for ClientRecord {
    fn from(value: PendingRecord) -> Self {
        Self {
            id: value.id,
            title: value.title,
            text: value.text,
            created_at: value.created_at,
            created_by: value.created_by,
        }
    }
}

/// Payload for a new submission; the store assigns `id` and `created_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewClient {
    pub title: String,
    pub text: String,
    pub created_by: String,
}

impl NewClient {
    /// Build a submission, trimming fields and rejecting empty ones
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            title: required_field(title.into(), "title")?,
            text: required_field(text.into(), "text")?,
            created_by: required_field(created_by.into(), "created_by")?,
        })
    }
}

/// Editable fields of an approved record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientUpdate {
    pub title: String,
    pub text: String,
}

impl ClientUpdate {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        Ok(Self {
            title: required_field(title.into(), "title")?,
            text: required_field(text.into(), "text")?,
        })
    }
}

/// Nullable text columns arrive as JSON `null`.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn required_field(value: String, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::InvalidInput(format!("{field} must not be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn client_id_parses_and_displays() {
        let id: ClientId = " 42 ".parse().unwrap();
        assert_eq!(id, ClientId::new(42));
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<ClientId>().is_err());
    }

    #[test]
    fn pending_record_reads_store_row() {
        let row = r#"{
            "id": 7,
            "title": "Acme",
            "text": "New customer",
            "created_at": "2024-05-01T10:15:00.123456+00:00",
            "created_by": "5d3c6f1e-0000-4000-8000-000000000001"
        }"#;
        let record: PendingRecord = serde_json::from_str(row).unwrap();
        assert_eq!(record.id, ClientId::new(7));
        assert_eq!(record.title, "Acme");
        assert_eq!(record.created_by, "5d3c6f1e-0000-4000-8000-000000000001");
    }

    #[test]
    fn pending_record_tolerates_missing_creator() {
        let row = r#"{"id": 1, "title": "A", "text": "", "created_at": "2024-05-01T10:15:00Z"}"#;
        let record: PendingRecord = serde_json::from_str(row).unwrap();
        assert!(record.created_by.is_empty());
    }

    #[test]
    fn null_creator_reads_as_empty() {
        let row = r#"{"id":1,"title":"A","text":"t","created_at":"2024-05-01T10:00:00+00:00","created_by":null}"#;
        let pending: PendingRecord = serde_json::from_str(row).unwrap();
        assert_eq!(pending.id, ClientId::new(1));
        assert!(pending.created_by.is_empty());

        let approved: ClientRecord = serde_json::from_str(row).unwrap();
        assert!(approved.created_by.is_empty());
        assert!(!approved.is_created_by(""));
    }

    #[test]
    fn approved_record_keeps_pending_fields() {
        let pending = PendingRecord {
            id: ClientId::new(3),
            title: "Title".to_string(),
            text: "Body".to_string(),
            created_at: Utc::now(),
            created_by: "user-1".to_string(),
        };
        let approved = ClientRecord::from(pending.clone());
        assert_eq!(approved.id, pending.id);
        assert_eq!(approved.created_at, pending.created_at);
        assert!(approved.is_created_by("user-1"));
        assert!(!approved.is_created_by("user-2"));
        assert!(!approved.is_created_by(""));
    }

    #[test]
    fn new_client_trims_and_rejects_empty_fields() {
        let client = NewClient::new("  Acme ", " text ", "user").unwrap();
        assert_eq!(client.title, "Acme");
        assert_eq!(client.text, "text");

        let error = NewClient::new("   ", "text", "user").unwrap_err();
        assert!(error.to_string().contains("title"));
        assert!(ClientUpdate::new("Title", "\n").is_err());
    }
}
