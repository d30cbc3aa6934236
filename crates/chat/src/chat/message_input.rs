/// Draft buffer behind the message box.
///
/// The draft survives a failed implicit creation so the user can retry it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageInput {
    draft: String,
}

impl MessageInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    pub fn clear(&mut self) {
        self.draft.clear();
    }

    /// Returns the trimmed draft, or `None` when only whitespace was typed.
    pub fn submission(&self) -> Option<String> {
        let trimmed = self.draft.trim();
        if trimmed.is_empty() {
            return None;
        }

        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_draft_is_not_a_submission() {
        let mut input = MessageInput::new();
        assert_eq!(input.submission(), None);

        input.set_draft(" \n\t ");
        assert_eq!(input.submission(), None);

        input.set_draft("  Hello \n");
        assert_eq!(input.submission().as_deref(), Some("Hello"));
        assert_eq!(input.draft(), "  Hello \n");
    }
}
