use std::collections::HashMap;

use tracing::{info, warn};

/// Name-to-handler lookup table.
///
/// Registration takes `&mut self`, so it has to finish before the registry is
/// shared (typically behind an `Arc`); after that, lookups are plain O(1)
/// reads that are safe from any number of tasks. Iteration follows
/// registration order, which keeps generated prompts stable.
///
/// # Example
///
/// ```rust
/// use waymark_core::Registry;
///
/// let mut registry = Registry::new();
/// registry.register("chat_pipeline", "general chat");
/// registry.register("release_pipeline", "creates releases");
///
/// assert_eq!(registry.get("release_pipeline"), Some(&"creates releases"));
/// assert!(registry.get("unknown").is_none());
/// assert_eq!(registry.names().collect::<Vec<_>>(), ["chat_pipeline", "release_pipeline"]);
/// ```
#[derive(Debug, Clone)]
pub struct Registry<T> {
    entries: HashMap<String, T>,
    order: Vec<String>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a handler under `name`, returning the handler it replaced.
    ///
    /// A replaced handler keeps its original position in iteration order.
    pub fn register(&mut self, name: impl Into<String>, handler: T) -> Option<T> {
        let name = name.into();
        let previous = self.entries.insert(name.clone(), handler);
        if previous.is_some() {
            warn!(name = %name, "Replacing registered handler");
        } else {
            info!(name = %name, "Registering handler");
            self.order.push(name);
        }
        previous
    }

    /// Builder form of [`Registry::register`].
    pub fn with(mut self, name: impl Into<String>, handler: T) -> Self {
        self.register(name, handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// `(name, handler)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name).map(|h| (name.as_str(), h)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.register("a", 1).is_none());
        assert_eq!(registry.get("a"), Some(&1));
        assert!(registry.contains("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_replace_keeps_order() {
        let mut registry = Registry::new().with("first", 1).with("second", 2);
        assert_eq!(registry.register("first", 10), Some(1));

        let pairs: Vec<_> = registry.iter().collect();
        assert_eq!(pairs, vec![("first", &10), ("second", &2)]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_missing_name() {
        let registry: Registry<u8> = Registry::new();
        assert!(registry.get("ghost").is_none());
        assert_eq!(registry.names().count(), 0);
    }
}
