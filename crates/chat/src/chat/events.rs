use std::fmt;

use chatline_api::{ApiResult, ConversationSummary, HistoryRecord, SearchHit};

use crate::chat::message::{ConversationId, DeliveryTarget, HistoryTarget, RequestSeq};

/// Why a conversation is being created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateIntent {
    /// Implicit creation carrying the first message, sent once the id is known.
    FirstMessage(String),
    /// Explicit "new chat" with an empty transcript.
    Blank,
}

/// A finished backend round-trip, tagged with the target it was issued for.
#[derive(Debug)]
pub enum Completion {
    ConversationsLoaded {
        seq: RequestSeq,
        result: ApiResult<Vec<ConversationSummary>>,
    },
    ConversationCreated {
        seq: RequestSeq,
        intent: CreateIntent,
        result: ApiResult<ConversationSummary>,
    },
    ReplyReceived {
        target: DeliveryTarget,
        result: ApiResult<String>,
    },
    HistoryLoaded {
        target: HistoryTarget,
        result: ApiResult<Vec<HistoryRecord>>,
    },
    ConversationDeleted {
        conversation_id: ConversationId,
        result: ApiResult<()>,
    },
    ConversationRenamed {
        conversation_id: ConversationId,
        result: ApiResult<ConversationSummary>,
    },
    SearchCompleted {
        seq: RequestSeq,
        query: String,
        result: ApiResult<Vec<SearchHit>>,
    },
}

impl Completion {
    /// Short operation name used in logs and notices.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::ConversationsLoaded { .. } => "load conversations",
            Self::ConversationCreated { .. } => "create conversation",
            Self::ReplyReceived { .. } => "send message",
            Self::HistoryLoaded { .. } => "load chat history",
            Self::ConversationDeleted { .. } => "delete conversation",
            Self::ConversationRenamed { .. } => "rename conversation",
            Self::SearchCompleted { .. } => "search messages",
        }
    }
}

/// User-visible report of a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub operation: &'static str,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "failed to {}: {}", self.operation, self.message)
    }
}

/// Emitted toward the shell for layout-only concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellRequest {
    /// A conversation finished activating; collapsed layouts hide the sidebar.
    HideSidebar,
}
