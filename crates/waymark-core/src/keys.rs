//! Key layout of the backing key-value store.
//!
//! ```text
//! memory:{id}          hash   id, type, content, metadata, createdAt
//! memories:timeline    zset   member = item id, score = createdAt
//! checkpoint:{id}      hash   snapshot, createdAt, agentVersion
//! lock:{key}           string owner id, with expiry
//! ```
//!
//! An optional prefix is prepended as `{prefix}:` to every key.

const MEMORY: &str = "memory:";
const TIMELINE: &str = "memories:timeline";
const CHECKPOINT: &str = "checkpoint:";
const LOCK: &str = "lock:";

/// Renders store keys, optionally namespaced by a prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreKeys {
    prefix: Option<String>,
}

impl StoreKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace every key under `prefix`. An empty prefix means no namespace.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: (!prefix.is_empty()).then_some(prefix),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn scoped(&self, key: String) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key,
        }
    }

    pub fn memory(&self, id: &str) -> String {
        self.scoped(format!("{}{}", MEMORY, id))
    }

    pub fn timeline(&self) -> String {
        self.scoped(TIMELINE.to_string())
    }

    pub fn checkpoint(&self, id: &str) -> String {
        self.scoped(format!("{}{}", CHECKPOINT, id))
    }

    pub fn lock(&self, lock_key: &str) -> String {
        self.scoped(format!("{}{}", LOCK, lock_key))
    }

    /// Glob pattern matching every checkpoint key whose id starts with `id_prefix`.
    ///
    /// Glob metacharacters in the prefixes are escaped so they match literally.
    pub fn checkpoint_pattern(&self, id_prefix: &str) -> String {
        let scope = match &self.prefix {
            Some(prefix) => format!("{}:", escape_glob(prefix)),
            None => String::new(),
        };
        format!("{}{}{}*", scope, CHECKPOINT, escape_glob(id_prefix))
    }

    /// Recover the checkpoint id from a full checkpoint key.
    pub fn checkpoint_id<'a>(&self, key: &'a str) -> Option<&'a str> {
        let key = match &self.prefix {
            Some(prefix) => key.strip_prefix(prefix.as_str())?.strip_prefix(':')?,
            None => key,
        };
        key.strip_prefix(CHECKPOINT)
    }
}

fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
