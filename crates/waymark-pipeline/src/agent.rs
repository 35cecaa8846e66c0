use std::sync::Arc;

use async_trait::async_trait;
use waymark_core::{PipelineResult, Registry};

/// A named handler that executes step work, typically by calling a model.
///
/// Agents report failure through an error [`PipelineResult`], never by
/// panicking, so the runner can persist the outcome and stop cleanly.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, input: &str) -> PipelineResult;
}

/// Agents addressable by name from pipeline definitions.
pub type AgentRegistry = Registry<Arc<dyn Agent>>;

/// Register `agent` under its own name.
pub fn register_agent(registry: &mut AgentRegistry, agent: Arc<dyn Agent>) {
    let name = agent.name().to_string();
    registry.register(name, agent);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    #[async_trait]
    impl Agent for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        async fn handle(&self, input: &str) -> PipelineResult {
            PipelineResult::success(input.to_uppercase())
        }
    }

    #[tokio::test]
    async fn test_registered_agent_resolves_by_name() {
        let mut registry = AgentRegistry::new();
        register_agent(&mut registry, Arc::new(Upper));

        let agent = registry.get("upper").unwrap();
        assert_eq!(agent.handle("ship it").await.message(), "SHIP IT");
        assert!(registry.get("lower").is_none());
    }
}
