pub use chatline_api::ConversationId;

use chatline_api::HistoryRecord;

/// Monotonic tag for one issued request.
///
/// A fresh value is minted for every request so stale responses can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestSeq(pub u64);

impl RequestSeq {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Generation tag for the transcript contents.
///
/// A fresh value is taken whenever the transcript is retargeted to another
/// conversation (or reset), so a reply is only appended to the transcript it was
/// sent from. Values are never reused, which keeps a restored epoch safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TranscriptEpoch(pub u64);

impl TranscriptEpoch {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Routing key for a history fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryTarget {
    pub conversation_id: ConversationId,
    pub seq: RequestSeq,
}

impl HistoryTarget {
    pub fn new(conversation_id: ConversationId, seq: RequestSeq) -> Self {
        Self {
            conversation_id,
            seq,
        }
    }
}

/// Routing key for a message delivery and its reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeliveryTarget {
    pub conversation_id: ConversationId,
    pub epoch: TranscriptEpoch,
}

impl DeliveryTarget {
    pub fn new(conversation_id: ConversationId, epoch: TranscriptEpoch) -> Self {
        Self {
            conversation_id,
            epoch,
        }
    }
}

/// Transcript speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Bot,
}

/// One rendered transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(Role::Bot, content)
    }
}

impl From<HistoryRecord> for Message {
    fn from(record: HistoryRecord) -> Self {
        let role = if record.is_from_user() {
            Role::User
        } else {
            Role::Bot
        };
        Self::new(role, record.message)
    }
}

/// Which conversation the session currently displays and targets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Inactive,
    Active(ConversationId),
}

/// State transition input for the session pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
    /// Successful create or activation.
    Activate(ConversationId),
    /// Successful deletion of the given conversation.
    Close(ConversationId),
    /// Rollback after a failed activation.
    Restore(SessionState),
}

/// Rejection reason for illegal session transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransitionRejection {
    NotActive {
        active: Option<ConversationId>,
        attempted: ConversationId,
    },
}

pub type SessionTransitionResult = Result<SessionState, SessionTransitionRejection>;

impl SessionState {
    pub fn active_id(&self) -> Option<&ConversationId> {
        match self {
            Self::Active(conversation_id) => Some(conversation_id),
            Self::Inactive => None,
        }
    }

    pub fn is_active(&self, conversation_id: &ConversationId) -> bool {
        self.active_id() == Some(conversation_id)
    }

    /// Applies one transition deterministically.
    ///
    /// Closing only succeeds for the conversation that is currently active; closing
    /// any other id leaves the session untouched and is reported as a rejection.
    pub fn apply(&self, transition: SessionTransition) -> SessionTransitionResult {
        match transition {
            SessionTransition::Activate(conversation_id) => Ok(Self::Active(conversation_id)),
            SessionTransition::Close(conversation_id) => self.apply_close(conversation_id),
            SessionTransition::Restore(previous) => Ok(previous),
        }
    }

    fn apply_close(&self, conversation_id: ConversationId) -> SessionTransitionResult {
        match self {
            Self::Active(active) if *active == conversation_id => Ok(Self::Inactive),
            Self::Active(_) | Self::Inactive => Err(SessionTransitionRejection::NotActive {
                active: self.active_id().cloned(),
                attempted: conversation_id,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_only_resets_the_active_conversation() {
        let active = SessionState::Active(ConversationId::text("c1"));

        assert_eq!(
            active.apply(SessionTransition::Close(ConversationId::text("c1"))),
            Ok(SessionState::Inactive)
        );
        assert_eq!(
            active.apply(SessionTransition::Close(ConversationId::text("c2"))),
            Err(SessionTransitionRejection::NotActive {
                active: Some(ConversationId::text("c1")),
                attempted: ConversationId::text("c2"),
            })
        );
        assert!(
            SessionState::Inactive
                .apply(SessionTransition::Close(ConversationId::text("c1")))
                .is_err()
        );
    }

    #[test]
    fn activation_replaces_any_previous_pointer() {
        let state = SessionState::Inactive
            .apply(SessionTransition::Activate(ConversationId::text("c1")))
            .and_then(|state| state.apply(SessionTransition::Activate(ConversationId::text("c2"))))
            .unwrap();

        assert!(state.is_active(&ConversationId::text("c2")));
        assert!(!state.is_active(&ConversationId::text("c1")));
    }

    #[test]
    fn history_records_map_sender_tags_to_roles() {
        let user: Message = HistoryRecord::new("user", "old Q").into();
        let bot: Message = HistoryRecord::new("ai", "old A").into();

        assert_eq!(user, Message::user("old Q"));
        assert_eq!(bot, Message::bot("old A"));
    }
}
