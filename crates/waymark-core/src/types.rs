//! Data model shared by the store, the pipeline engine and the orchestrator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current wall-clock time as epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// An immutable, timestamped record kept in the memory store.
///
/// Items are never updated in place: they are written fresh or deleted.
/// The `metadata` map is what callers query on, e.g. the pipeline engine
/// tags step outcomes with `pipeline`, `step`, `agent` and `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryItem {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    content: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
    created_at: i64,
}

impl MemoryItem {
    /// Create an item with a generated id, stamped with the current time.
    ///
    /// Generated ids are time-ordered, so items sharing a `created_at`
    /// millisecond still sort in creation order in the recency index.
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            kind: kind.into(),
            content: content.into(),
            metadata: HashMap::new(),
            created_at: now_millis(),
        }
    }

    /// Rebuild an item from its stored fields.
    pub fn from_parts(
        id: impl Into<String>,
        kind: impl Into<String>,
        content: impl Into<String>,
        metadata: HashMap<String, String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            content: content.into(),
            metadata,
            created_at,
        }
    }

    /// Use an explicit id instead of the generated one.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Look up a single metadata value.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }
}

/// A named, versioned checkpoint of broader agent state.
///
/// Saving a snapshot under an existing id replaces the old one entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSnapshot {
    pub checkpoint_id: String,
    /// Most-recent-last.
    #[serde(default)]
    pub conversation_window: Vec<MemoryItem>,
    #[serde(default)]
    pub pending_tasks: Vec<String>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    pub agent_version: String,
    pub created_at: i64,
}

impl AgentSnapshot {
    pub fn new(checkpoint_id: impl Into<String>, agent_version: impl Into<String>) -> Self {
        Self {
            checkpoint_id: checkpoint_id.into(),
            conversation_window: Vec::new(),
            pending_tasks: Vec::new(),
            variables: HashMap::new(),
            agent_version: agent_version.into(),
            created_at: now_millis(),
        }
    }

    pub fn with_message(mut self, item: MemoryItem) -> Self {
        self.conversation_window.push(item);
        self
    }

    pub fn with_pending_task(mut self, task: impl Into<String>) -> Self {
        self.pending_tasks.push(task.into());
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

/// Outcome of a step, a pipeline run or an orchestrator call.
///
/// Error results always carry a non-empty diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    message: String,
    is_error: bool,
}

impl PipelineResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "unspecified error".to_string()
        } else {
            message
        };
        Self {
            message,
            is_error: true,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn into_message(self) -> String {
        self.message
    }
}
