//! # Waymark Pipeline
//!
//! Named, ordered step pipelines and a runner that records every step
//! outcome so an interrupted run can resume at the first unfinished step.
//!
//! - **[Pipeline]**: step definitions, validated by [`PipelineBuilder`]
//! - **[PipelineRunner]**: resumable execution with cancellation and opt-in locking
//! - **[StepProgress]**: progress queries over the memory store
//! - **[Agent]** / **[AgentRegistry]**: named step handlers
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use waymark_core::{InMemoryStore, PipelineResult};
//! use waymark_pipeline::{Pipeline, PipelineRunner, step_fn};
//!
//! # tokio_test::block_on(async {
//! let pipeline = Pipeline::builder("greeting", "says hello")
//!     .step(
//!         1,
//!         "greet",
//!         "greeter",
//!         step_fn(|name| async move { PipelineResult::success(format!("hello, {name}")) }),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let runner = PipelineRunner::new(Arc::new(InMemoryStore::new()));
//! let result = runner.run(&pipeline, "ada", true).await;
//! assert_eq!(result.message(), "hello, ada");
//! # });
//! ```

pub mod agent;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod runner;
pub mod step;

pub use agent::{Agent, AgentRegistry, register_agent};
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineBuilder, PipelineRegistry};
pub use progress::{DEFAULT_SCAN_WINDOW, SNAPSHOT_KIND, StepProgress};
pub use runner::{PipelineRunner, RunReport, RunState, pipeline_lock_key};
pub use step::{AgentAction, FnAction, PipelineStep, StepAction, step_fn};
pub use tokio_util::sync::CancellationToken;
