use std::sync::Arc;

use tracing::{debug, info};
use waymark_core::{PipelineResult, Registry};

use crate::agent::AgentRegistry;
use crate::error::PipelineError;
use crate::step::{AgentAction, PipelineStep, StepAction};

/// Pipelines addressable by name, e.g. by the orchestrator.
pub type PipelineRegistry = Registry<Arc<Pipeline>>;

/// A named, ordered list of steps.
///
/// Step ids start at 1 and strictly increase; this is checked by
/// [`PipelineBuilder::build`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    description: String,
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder {
            name: name.into(),
            description: description.into(),
            steps: Vec::new(),
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable purpose, shown to the routing model.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Id of the step preceding `step_id`, if any.
    pub fn previous_step_id(&self, step_id: u32) -> Option<u32> {
        self.steps
            .iter()
            .take_while(|step| step.id() < step_id)
            .last()
            .map(PipelineStep::id)
    }

    /// Run every step in memory, threading each output into the next input.
    ///
    /// Nothing is persisted; use [`crate::PipelineRunner`] for resumable runs.
    pub async fn run(&self, input: &str) -> PipelineResult {
        if self.steps.is_empty() {
            return PipelineResult::error(no_steps_message(&self.name));
        }

        let mut current = input.to_string();
        let mut last = None;
        for step in &self.steps {
            debug!(
                pipeline = %self.name,
                step = step.id(),
                agent = %step.agent_name(),
                "Executing step"
            );
            let result = step.execute(&current).await;
            if result.is_error() {
                info!(pipeline = %self.name, step = step.id(), "Pipeline stopped on step error");
                return result;
            }
            current = result.message().to_string();
            last = Some(result);
        }

        info!(pipeline = %self.name, steps = self.steps.len(), "Pipeline completed");
        last.unwrap_or_else(|| PipelineResult::error(no_steps_message(&self.name)))
    }
}

pub(crate) fn no_steps_message(pipeline: &str) -> String {
    format!("pipeline '{}' has no steps defined", pipeline)
}

/// Builder for [`Pipeline`]. The first invalid step is reported by `build`.
pub struct PipelineBuilder {
    name: String,
    description: String,
    steps: Vec<PipelineStep>,
    error: Option<PipelineError>,
}

impl PipelineBuilder {
    /// Append a step running `action`.
    pub fn step(
        mut self,
        id: u32,
        name: impl Into<String>,
        agent_name: impl Into<String>,
        action: Arc<dyn StepAction>,
    ) -> Self {
        self.steps
            .push(PipelineStep::new(id, name, agent_name, action));
        self
    }

    /// Append a step delegated to the agent registered as `agent_name`.
    pub fn agent_step(
        mut self,
        id: u32,
        name: impl Into<String>,
        agent_name: &str,
        agents: &AgentRegistry,
    ) -> Self {
        match agents.get(agent_name) {
            Some(agent) => {
                let action = Arc::new(AgentAction::new(Arc::clone(agent)));
                self.step(id, name, agent_name, action)
            }
            None => {
                if self.error.is_none() {
                    self.error = Some(PipelineError::UnknownAgent {
                        pipeline: self.name.clone(),
                        step: id,
                        agent: agent_name.to_string(),
                    });
                }
                self
            }
        }
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        if self.name.trim().is_empty() {
            return Err(PipelineError::EmptyName);
        }
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut previous = 0;
        for step in &self.steps {
            if step.id() == 0 {
                return Err(PipelineError::InvalidStepId {
                    pipeline: self.name,
                    id: 0,
                });
            }
            if step.id() <= previous {
                return Err(PipelineError::StepOutOfOrder {
                    pipeline: self.name,
                    previous,
                    id: step.id(),
                });
            }
            previous = step.id();
        }

        Ok(Pipeline {
            name: self.name,
            description: self.description,
            steps: self.steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::step_fn;

    fn append(tag: &'static str) -> Arc<dyn StepAction> {
        step_fn(move |input| async move { PipelineResult::success(format!("{input}>{tag}")) })
    }

    fn fail() -> Arc<dyn StepAction> {
        step_fn(|_| async { PipelineResult::error("step exploded") })
    }

    #[tokio::test]
    async fn test_direct_run_threads_outputs() {
        let pipeline = Pipeline::builder("p", "test")
            .step(1, "one", "a", append("1"))
            .step(2, "two", "a", append("2"))
            .build()
            .unwrap();

        let result = pipeline.run("in").await;
        assert!(!result.is_error());
        assert_eq!(result.message(), "in>1>2");
    }

    #[tokio::test]
    async fn test_direct_run_stops_on_error() {
        let pipeline = Pipeline::builder("p", "test")
            .step(1, "one", "a", fail())
            .step(2, "two", "a", append("2"))
            .build()
            .unwrap();

        let result = pipeline.run("in").await;
        assert!(result.is_error());
        assert_eq!(result.message(), "step exploded");
    }

    #[tokio::test]
    async fn test_empty_pipeline_reports_no_steps() {
        let pipeline = Pipeline::builder("empty", "nothing").build().unwrap();
        let result = pipeline.run("in").await;
        assert!(result.is_error());
        assert!(result.message().contains("no steps"));
    }

    #[test]
    fn test_build_rejects_bad_ids() {
        let zero = Pipeline::builder("p", "").step(0, "s", "a", append("x")).build();
        assert!(matches!(zero, Err(PipelineError::InvalidStepId { id: 0, .. })));

        let unordered = Pipeline::builder("p", "")
            .step(2, "s", "a", append("x"))
            .step(2, "t", "a", append("y"))
            .build();
        assert!(matches!(
            unordered,
            Err(PipelineError::StepOutOfOrder { previous: 2, id: 2, .. })
        ));

        assert_eq!(
            Pipeline::builder(" ", "").build().unwrap_err(),
            PipelineError::EmptyName
        );
    }

    #[test]
    fn test_agent_step_requires_registered_agent() {
        let agents = AgentRegistry::new();
        let err = Pipeline::builder("p", "")
            .agent_step(1, "s", "ghost", &agents)
            .build()
            .unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_AGENT");
    }

    #[test]
    fn test_previous_step_id_follows_definition_order() {
        let pipeline = Pipeline::builder("p", "")
            .step(1, "a", "x", append("a"))
            .step(3, "b", "x", append("b"))
            .step(7, "c", "x", append("c"))
            .build()
            .unwrap();
        assert_eq!(pipeline.previous_step_id(1), None);
        assert_eq!(pipeline.previous_step_id(3), Some(1));
        assert_eq!(pipeline.previous_step_id(7), Some(3));
    }
}
