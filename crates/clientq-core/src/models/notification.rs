//! Transient notification model and admin decisions

use serde::{Deserialize, Serialize};

use super::client::{ClientId, PendingRecord};

/// On-screen alert for a pending record that arrived over the live feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: ClientId,
    pub title: String,
    pub text: String,
    pub seen: bool,
    /// Hovered/focused; suppresses expiry while set
    pub held: bool,
}

impl Notification {
    #[must_use]
    pub fn for_record(record: &PendingRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            text: record.text.clone(),
            seen: false,
            held: false,
        }
    }
}

/// Administrator decision on a pending record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    #[must_use]
    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Approve => "approved",
            Self::Reject => "rejected",
        }
    }
}
