use std::fmt;

use serde::{Deserialize, Serialize};

/// Sender tag the backend writes for user-authored history rows.
pub const USER_SENDER_TAG: &str = "user";

/// Backend-assigned conversation identifier.
///
/// The client never mints one. It is kept in the JSON shape the backend chose
/// (string or integer) so it round-trips unchanged into request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConversationId {
    Number(i64),
    Text(String),
}

impl ConversationId {
    pub fn text(raw: impl Into<String>) -> Self {
        Self::Text(raw.into())
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(raw) => write!(formatter, "{raw}"),
            Self::Text(raw) => formatter.write_str(raw),
        }
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for ConversationId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ConversationId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// One entry of the conversation list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl ConversationSummary {
    pub fn new(id: impl Into<ConversationId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: None,
        }
    }
}

/// One stored message as returned by the history endpoint.
///
/// Storage-local shape, intentionally decoupled from the transcript role enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub sender: String,
    pub message: String,
}

impl HistoryRecord {
    pub fn new(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            message: message.into(),
        }
    }

    /// Any tag other than `user` is rendered as the assistant.
    pub fn is_from_user(&self) -> bool {
        self.sender == USER_SENDER_TAG
    }
}

/// One match from the message search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub message: String,
    pub sender: String,
    pub conversation_id: ConversationId,
    pub conversation_name: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct NameRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub message: &'a str,
    pub conversation_id: &'a ConversationId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct SendMessageResponse {
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}
