use crate::chat::message::{Message, Role};

pub const PLACEHOLDER_TEXT: &str = "Type a message to start a new conversation.";
const USER_PREFIX: &str = "you> ";
const BOT_PREFIX: &str = "bot> ";
const MIN_RENDER_WIDTH: usize = 16;

/// Transcript projection for the active conversation.
///
/// Holds exactly what the controller last handed it; it never fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageList {
    messages: Vec<Message>,
    placeholder_visible: bool,
}

impl Default for MessageList {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageList {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            placeholder_visible: true,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn placeholder_visible(&self) -> bool {
        self.placeholder_visible
    }

    pub fn set_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.placeholder_visible = false;
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.placeholder_visible = false;
    }

    /// Empties the transcript for a freshly created conversation.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.placeholder_visible = false;
    }

    /// Empties the transcript and returns to the no-conversation placeholder.
    pub fn show_placeholder(&mut self) {
        self.messages.clear();
        self.placeholder_visible = true;
    }

    pub fn render_lines(&self, width: usize) -> Vec<String> {
        if self.placeholder_visible {
            return vec![PLACEHOLDER_TEXT.to_string()];
        }

        let width = width.max(MIN_RENDER_WIDTH);
        let mut lines = Vec::new();

        for message in &self.messages {
            let prefix = match message.role {
                Role::User => USER_PREFIX,
                Role::Bot => BOT_PREFIX,
            };
            let indent = " ".repeat(prefix.len());

            for (index, line) in wrap_text(&message.content, width - prefix.len())
                .into_iter()
                .enumerate()
            {
                let lead = if index == 0 { prefix } else { indent.as_str() };
                lines.push(format!("{lead}{line}"));
            }
        }

        lines
    }
}

/// First-fit wrap by display width; words wider than the line are broken.
fn wrap_text(content: &str, width: usize) -> Vec<String> {
    let options = textwrap::Options::new(width)
        .wrap_algorithm(textwrap::WrapAlgorithm::FirstFit)
        .break_words(true);

    textwrap::wrap(content, options)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}
