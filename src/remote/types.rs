use crate::turns::{Turn, TurnId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reply to a sent message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(rename = "chatId")]
    pub chat_id: String,
}

impl ChatReply {
    pub fn new(response: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            chat_id: chat_id.into(),
        }
    }
}

/// One stored exchange as the service returns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(alias = "_id")]
    pub id: String,
    pub query: String,
    #[serde(default)]
    pub response: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<HistoryEntry> for Turn {
    fn from(entry: HistoryEntry) -> Self {
        Turn::settled(
            TurnId::new(entry.id),
            entry.query,
            entry.response,
            entry.created_at,
        )
    }
}

/// Body of a history fetch. A missing or null `chats` means no history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub chats: Option<Vec<HistoryEntry>>,
}

impl HistoryPage {
    pub fn new(chats: Vec<HistoryEntry>) -> Self {
        Self { chats: Some(chats) }
    }

    pub fn into_turns(self) -> Vec<Turn> {
        self.chats
            .unwrap_or_default()
            .into_iter()
            .map(Turn::from)
            .collect()
    }
}
