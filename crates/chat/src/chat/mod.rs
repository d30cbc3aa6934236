/// Completion and notice contracts between the controller and its owner.
pub mod events;
/// Domain entities and deterministic session state boundaries.
pub mod message;
pub mod message_input;
pub mod message_list;
pub mod search;
pub mod sidebar;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use events::{Completion, CreateIntent, Notice, ShellRequest};
pub use message::{
    ConversationId, DeliveryTarget, HistoryTarget, Message, RequestSeq, Role, SessionState,
    SessionTransition, SessionTransitionRejection, SessionTransitionResult, TranscriptEpoch,
};
pub use message_input::MessageInput;
pub use message_list::{MessageList, PLACEHOLDER_TEXT};
pub use search::SearchResults;
pub use sidebar::ChatSidebar;
pub use view::{ChatView, DEFAULT_CONVERSATION_PREFIX, default_conversation_name};
