use uuid::Uuid;

use crate::llm::ChatMessage;

/// One conversation's append-only message history.
///
/// Each conversation owns its session, so independent conversations can be
/// routed concurrently by the same orchestrator.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    history: Vec<ChatMessage>,
}

impl Session {
    /// Start a conversation seeded with `system_prompt`.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            history: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.history.last()
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.history.push(message);
    }
}
