use chatline_api::{SearchHit, USER_SENDER_TAG};

/// Projection of the latest message search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    query: String,
    hits: Vec<SearchHit>,
}

impl SearchResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    /// Looks up a hit by its 1-based position.
    pub fn hit_at(&self, position: usize) -> Option<&SearchHit> {
        position.checked_sub(1).and_then(|index| self.hits.get(index))
    }

    pub fn set_results(&mut self, query: impl Into<String>, hits: Vec<SearchHit>) {
        self.query = query.into();
        self.hits = hits;
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.hits.clear();
    }

    pub fn render_lines(&self) -> Vec<String> {
        if self.query.is_empty() {
            return Vec::new();
        }

        let mut lines = vec![format!("search \"{}\": {} hit(s)", self.query, self.hits.len())];
        lines.extend(self.hits.iter().enumerate().map(|(index, hit)| {
            let speaker = if hit.sender == USER_SENDER_TAG { "you" } else { "bot" };
            format!(
                "{:>3}. [{}] {}: {}",
                index + 1,
                hit.conversation_name,
                speaker,
                hit.message
            )
        }));
        lines
    }
}
