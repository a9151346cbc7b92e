use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix given to client-generated ids of optimistic turns
pub const DEFAULT_TEMP_PREFIX: &str = "temp-";

/// Identifier of a turn, either client-generated (temporary) or server-issued
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(String);

impl TurnId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a temporary id: `<prefix><unix millis>-<9 random hex chars>`
    pub fn temporary(prefix: &str) -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}{}-{}",
            prefix,
            Utc::now().timestamp_millis(),
            &random[..9]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_temporary(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TurnId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TurnId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    /// Sent, awaiting the assistant's response
    Pending,
    /// Response received
    Complete,
    /// No usable response; eligible for removal
    Failed,
}

/// A single query/response exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub query: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
    pub status: TurnStatus,
}

impl Turn {
    /// Create an optimistic turn stamped with the current time
    pub fn pending(id: TurnId, query: impl Into<String>) -> Self {
        Self {
            id,
            query: query.into(),
            response: String::new(),
            created_at: Utc::now(),
            status: TurnStatus::Pending,
        }
    }

    /// Create a turn that already went through the server.
    ///
    /// An empty response marks the turn as failed so that a complete turn
    /// always carries a response.
    pub fn settled(
        id: TurnId,
        query: impl Into<String>,
        response: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let response = response.into();
        let status = status_for(&response);
        Self {
            id,
            query: query.into(),
            response,
            created_at,
            status,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TurnStatus::Pending
    }

    pub fn is_complete(&self) -> bool {
        self.status == TurnStatus::Complete
    }
}

pub(crate) fn status_for(response: &str) -> TurnStatus {
    if response.is_empty() {
        TurnStatus::Failed
    } else {
        TurnStatus::Complete
    }
}
