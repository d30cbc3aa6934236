use chatline_api::ConversationSummary;

use crate::chat::message::ConversationId;

const ACTIVE_MARKER: &str = "*";
const INACTIVE_MARKER: &str = " ";

/// Conversation list projection.
///
/// Entries keep the order the backend (or the controller) supplied. At most one
/// entry is marked active, and the controller is the only writer of that marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSidebar {
    conversations: Vec<ConversationSummary>,
    active_conversation: Option<ConversationId>,
    filter_query: String,
}

impl ChatSidebar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn active_conversation(&self) -> Option<&ConversationId> {
        self.active_conversation.as_ref()
    }

    pub fn contains(&self, conversation_id: &ConversationId) -> bool {
        self.conversations
            .iter()
            .any(|conversation| conversation.id == *conversation_id)
    }

    /// Looks up an entry by its 1-based position in the unfiltered list.
    pub fn conversation_at(&self, position: usize) -> Option<&ConversationSummary> {
        position
            .checked_sub(1)
            .and_then(|index| self.conversations.get(index))
    }

    /// Replaces every entry with a freshly fetched list.
    ///
    /// The active marker is kept only if the marked conversation still exists.
    pub fn replace(&mut self, conversations: Vec<ConversationSummary>) {
        self.conversations = conversations;

        if self
            .active_conversation
            .as_ref()
            .is_some_and(|active| !self.contains(active))
        {
            self.active_conversation = None;
        }
    }

    /// Inserts a new entry at the head of the list.
    pub fn prepend(&mut self, conversation: ConversationSummary) {
        self.conversations
            .retain(|existing| existing.id != conversation.id);
        self.conversations.insert(0, conversation);
    }

    /// Marks exactly `conversation_id` active, or none when `None`.
    pub fn mark_active(&mut self, conversation_id: Option<ConversationId>) {
        self.active_conversation = conversation_id;
    }

    pub fn rename(&mut self, conversation_id: &ConversationId, name: impl Into<String>) -> bool {
        let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|conversation| conversation.id == *conversation_id)
        else {
            return false;
        };

        conversation.name = name.into();
        true
    }

    pub fn filter_query(&self) -> &str {
        &self.filter_query
    }

    pub fn set_filter(&mut self, query: impl Into<String>) {
        self.filter_query = query.into();
    }

    pub fn render_lines(&self) -> Vec<String> {
        if self.conversations.is_empty() {
            return vec!["No conversations yet".to_string()];
        }

        let normalized_query = self.filter_query.trim().to_lowercase();
        let lines: Vec<String> = self
            .conversations
            .iter()
            .enumerate()
            .filter(|(_, conversation)| matches_query(conversation, &normalized_query))
            .map(|(index, conversation)| {
                let marker = if self.active_conversation.as_ref() == Some(&conversation.id) {
                    ACTIVE_MARKER
                } else {
                    INACTIVE_MARKER
                };
                format!("{marker}{:>3}. {}", index + 1, conversation.name)
            })
            .collect();

        if lines.is_empty() {
            return vec!["No conversations match your filter".to_string()];
        }

        lines
    }
}

fn matches_query(conversation: &ConversationSummary, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }

    conversation.name.to_lowercase().contains(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sidebar_with(ids: &[&str]) -> ChatSidebar {
        let mut sidebar = ChatSidebar::new();
        sidebar.replace(
            ids.iter()
                .map(|id| ConversationSummary::new(*id, format!("chat {id}")))
                .collect(),
        );
        sidebar
    }

    #[test]
    fn marking_active_unmarks_every_other_entry() {
        let mut sidebar = sidebar_with(&["c1", "c2"]);

        sidebar.mark_active(Some(ConversationId::text("c1")));
        sidebar.mark_active(Some(ConversationId::text("c2")));

        assert_eq!(
            sidebar.render_lines(),
            vec!["   1. chat c1".to_string(), "*  2. chat c2".to_string()]
        );
    }

    #[test]
    fn replace_drops_marker_for_vanished_conversation() {
        let mut sidebar = sidebar_with(&["c1", "c2"]);
        sidebar.mark_active(Some(ConversationId::text("c1")));

        sidebar.replace(vec![ConversationSummary::new("c2", "chat c2")]);

        assert_eq!(sidebar.active_conversation(), None);
        assert_eq!(sidebar.conversations().len(), 1);
    }

    #[test]
    fn prepend_puts_new_entry_first_without_duplicates() {
        let mut sidebar = sidebar_with(&["c1"]);

        sidebar.prepend(ConversationSummary::new("c2", "fresh"));
        sidebar.prepend(ConversationSummary::new("c2", "fresh"));

        let ids: Vec<_> = sidebar.conversations().iter().map(|c| c.id.to_string()).collect();
        assert_eq!(ids, ["c2", "c1"]);
        assert_eq!(sidebar.conversation_at(1).map(|c| c.name.as_str()), Some("fresh"));
        assert!(sidebar.conversation_at(0).is_none());
    }

    #[test]
    fn filter_only_affects_rendering() {
        let mut sidebar = ChatSidebar::new();
        sidebar.replace(vec![
            ConversationSummary::new("c1", "Trip plans"),
            ConversationSummary::new("c2", "Groceries"),
        ]);

        sidebar.set_filter("TRIP");
        assert_eq!(sidebar.render_lines(), vec!["   1. Trip plans".to_string()]);
        assert_eq!(sidebar.conversations().len(), 2);

        sidebar.set_filter("nothing");
        assert_eq!(
            sidebar.render_lines(),
            vec!["No conversations match your filter".to_string()]
        );
    }

    #[test]
    fn rename_updates_matching_entry_only() {
        let mut sidebar = sidebar_with(&["c1", "c2"]);

        assert!(sidebar.rename(&ConversationId::text("c2"), "renamed"));
        assert!(!sidebar.rename(&ConversationId::text("c9"), "ghost"));

        assert_eq!(sidebar.conversations()[1].name, "renamed");
        assert_eq!(sidebar.conversations()[0].name, "chat c1");
    }
}
