//! Resumable, checkpointed pipeline execution.
//!
//! A run walks the steps in id order. After every step the outcome is
//! written to the store before the next step may start, so a later run with
//! `resume = true` re-enters at the first step without a durable success
//! record. State machine:
//!
//! ```text
//! NotStarted -> Running(step) -> Completed
//!                             -> Failed(step)
//!                             -> AbortedByStoreError(step)
//!                             -> Cancelled(after step)
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use waymark_core::{MemoryStore, PipelineResult};

use crate::pipeline::{Pipeline, no_steps_message};
use crate::progress::StepProgress;

/// Where a run is, or where it ended.
///
/// Reports only ever carry terminal states. `Running` is attached to the
/// per-step `Executing step` log event; `NotStarted` is for callers tracking
/// queued runs themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running { step: u32 },
    Completed,
    /// The step's action failed, or its input could not be found.
    Failed { step: u32 },
    /// A store read or write failed; `step` is `None` when progress could
    /// not be read before any step ran.
    AbortedByStoreError { step: Option<u32> },
    Cancelled { after_step: Option<u32> },
    /// The pipeline has no steps, or none left to resume.
    NoSteps,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::NotStarted | RunState::Running { .. })
    }
}

/// Outcome of a run with the terminal state and the steps executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub state: RunState,
    pub result: PipelineResult,
    /// Ids of steps whose action ran during this run, in order.
    pub executed_steps: Vec<u32>,
}

impl RunReport {
    fn finish(state: RunState, result: PipelineResult, executed_steps: Vec<u32>) -> Self {
        Self {
            state,
            result,
            executed_steps,
        }
    }
}

/// Executes pipelines against a [`MemoryStore`], recording every step.
///
/// The runner holds no per-run state; one instance can serve any number of
/// concurrent runs.
#[derive(Clone)]
pub struct PipelineRunner {
    progress: StepProgress,
}

impl PipelineRunner {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self {
            progress: StepProgress::new(store),
        }
    }

    pub fn with_progress(progress: StepProgress) -> Self {
        Self { progress }
    }

    pub fn progress(&self) -> &StepProgress {
        &self.progress
    }

    pub async fn run(&self, pipeline: &Pipeline, input: &str, resume: bool) -> PipelineResult {
        self.run_with_report(pipeline, input, resume).await.result
    }

    pub async fn run_with_report(
        &self,
        pipeline: &Pipeline,
        input: &str,
        resume: bool,
    ) -> RunReport {
        self.run_with_cancel(pipeline, input, resume, &CancellationToken::new())
            .await
    }

    /// Run `pipeline`, checking `cancel` before every step.
    ///
    /// A step already executing always finishes and is recorded first.
    pub async fn run_with_cancel(
        &self,
        pipeline: &Pipeline,
        input: &str,
        resume: bool,
        cancel: &CancellationToken,
    ) -> RunReport {
        let name = pipeline.name();
        let mut executed = Vec::new();

        if pipeline.is_empty() {
            return RunReport::finish(
                RunState::NoSteps,
                PipelineResult::error(no_steps_message(name)),
                executed,
            );
        }

        let last_completed = if resume {
            match self.progress.last_completed_step(name).await {
                Ok(last) => last.unwrap_or(0),
                Err(e) => {
                    warn!(
                        pipeline = %name,
                        error = %e,
                        "Could not read progress, aborting run"
                    );
                    return RunReport::finish(
                        RunState::AbortedByStoreError { step: None },
                        PipelineResult::error(format!(
                            "pipeline '{}' aborted: could not read progress: {}",
                            name, e
                        )),
                        executed,
                    );
                }
            }
        } else {
            0
        };

        let first_step = pipeline.steps().first().map(|s| s.id());
        let mut previous: Option<String> = None;
        let mut last_result = None;

        for step in pipeline.steps().iter().filter(|s| s.id() > last_completed) {
            let id = step.id();
            if cancel.is_cancelled() {
                let after_step = executed.last().copied();
                info!(pipeline = %name, after_step = ?after_step, "Run cancelled");
                return RunReport::finish(
                    RunState::Cancelled { after_step },
                    PipelineResult::error(format!("pipeline '{}' was cancelled", name)),
                    executed,
                );
            }

            let step_input = if Some(id) == first_step {
                input.to_string()
            } else if let Some(output) = previous.take() {
                output
            } else {
                let Some(prior) = pipeline.previous_step_id(id) else {
                    return missing_input(name, id, executed);
                };
                match self.progress.step_output(name, prior).await {
                    Ok(Some(output)) => output,
                    Ok(None) => return missing_input(name, id, executed),
                    Err(e) => {
                        warn!(
                            pipeline = %name,
                            step = id,
                            error = %e,
                            "Could not load step input"
                        );
                        return RunReport::finish(
                            RunState::AbortedByStoreError { step: Some(id) },
                            PipelineResult::error(format!(
                                "pipeline '{}' aborted: could not load input for step {}: {}",
                                name, id, e
                            )),
                            executed,
                        );
                    }
                }
            };

            debug!(
                pipeline = %name,
                state = ?RunState::Running { step: id },
                agent = %step.agent_name(),
                "Executing step"
            );
            let result = step.execute(&step_input).await;
            executed.push(id);

            if let Err(e) = self
                .progress
                .save_step_result(name, id, step.agent_name(), &result)
                .await
            {
                warn!(
                    pipeline = %name,
                    step = id,
                    error = %e,
                    "Could not record step outcome, aborting run"
                );
                return RunReport::finish(
                    RunState::AbortedByStoreError { step: Some(id) },
                    PipelineResult::error(format!(
                        "pipeline '{}' aborted: could not record step {}: {}",
                        name, id, e
                    )),
                    executed,
                );
            }

            if result.is_error() {
                info!(pipeline = %name, step = id, "Pipeline stopped on step error");
                return RunReport::finish(RunState::Failed { step: id }, result, executed);
            }

            previous = Some(result.message().to_string());
            last_result = Some(result);
        }

        match last_result {
            Some(result) => {
                info!(
                    pipeline = %name,
                    steps = executed.len(),
                    resumed_after = last_completed,
                    "Pipeline completed"
                );
                RunReport::finish(RunState::Completed, result, executed)
            }
            None => RunReport::finish(
                RunState::NoSteps,
                PipelineResult::error(format!(
                    "pipeline '{}' has no steps remaining after step {}",
                    name, last_completed
                )),
                executed,
            ),
        }
    }

    /// Run `pipeline` while holding `lock:pipeline:{name}`.
    ///
    /// If another owner holds the lock nothing runs and an error result is
    /// returned. The lock is released afterwards; a failed release is left
    /// to expire after `lock_ttl`.
    pub async fn run_exclusive(
        &self,
        pipeline: &Pipeline,
        input: &str,
        resume: bool,
        lock_ttl: Duration,
        owner_id: &str,
    ) -> PipelineResult {
        let name = pipeline.name();
        let lock_key = pipeline_lock_key(name);
        let store = self.progress.store();

        match store.acquire_lock(&lock_key, lock_ttl, owner_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(pipeline = %name, owner = %owner_id, "Pipeline lock is held elsewhere");
                return PipelineResult::error(format!("pipeline '{}' is already running", name));
            }
            Err(e) => {
                return PipelineResult::error(format!(
                    "pipeline '{}' aborted: could not acquire lock: {}",
                    name, e
                ));
            }
        }

        let result = self.run(pipeline, input, resume).await;

        match store.release_lock(&lock_key, owner_id).await {
            Ok(true) => {}
            Ok(false) => warn!(
                pipeline = %name,
                owner = %owner_id,
                "Pipeline lock expired before release"
            ),
            Err(e) => warn!(pipeline = %name, error = %e, "Could not release pipeline lock"),
        }
        result
    }
}

/// Lock key guarding single-flight runs of `pipeline`.
pub fn pipeline_lock_key(pipeline: &str) -> String {
    format!("pipeline:{}", pipeline)
}

fn missing_input(pipeline: &str, step: u32, executed: Vec<u32>) -> RunReport {
    warn!(pipeline = %pipeline, step, "No input available for step");
    RunReport::finish(
        RunState::Failed { step },
        PipelineResult::error(format!("missing input for step {}", step)),
        executed,
    )
}
