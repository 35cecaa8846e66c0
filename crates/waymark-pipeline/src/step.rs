use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use waymark_core::PipelineResult;

use crate::agent::Agent;

/// Work performed by one pipeline step: string input in, result out.
///
/// An action may run again after a crash or a failed checkpoint write, so
/// it should not rely on having run exactly once.
#[async_trait]
pub trait StepAction: Send + Sync {
    async fn execute(&self, input: &str) -> PipelineResult;
}

/// [`StepAction`] wrapping an async closure. Build one with [`step_fn`].
pub struct FnAction<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> StepAction for FnAction<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = PipelineResult> + Send,
{
    async fn execute(&self, input: &str) -> PipelineResult {
        (self.f)(input.to_string()).await
    }
}

/// Adapt an async closure into a shareable [`StepAction`].
///
/// ```rust
/// use waymark_core::PipelineResult;
/// use waymark_pipeline::{StepAction, step_fn};
///
/// let shout = step_fn(|input| async move { PipelineResult::success(input.to_uppercase()) });
/// # tokio_test::block_on(async {
/// assert_eq!(shout.execute("hi").await.message(), "HI");
/// # });
/// ```
pub fn step_fn<F, Fut>(f: F) -> Arc<dyn StepAction>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PipelineResult> + Send + 'static,
{
    Arc::new(FnAction { f })
}

/// Delegates a step to an [`Agent`].
pub struct AgentAction {
    agent: Arc<dyn Agent>,
}

impl AgentAction {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl StepAction for AgentAction {
    async fn execute(&self, input: &str) -> PipelineResult {
        self.agent.handle(input).await
    }
}

/// One unit of pipeline work. Immutable once the pipeline is built.
#[derive(Clone)]
pub struct PipelineStep {
    id: u32,
    name: String,
    agent_name: String,
    action: Arc<dyn StepAction>,
}

impl PipelineStep {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        agent_name: impl Into<String>,
        action: Arc<dyn StepAction>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            agent_name: agent_name.into(),
            action,
        }
    }

    /// 1-based position, also the resume cursor.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub async fn execute(&self, input: &str) -> PipelineResult {
        self.action.execute(input).await
    }
}

impl fmt::Debug for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineStep")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("agent_name", &self.agent_name)
            .finish_non_exhaustive()
    }
}
