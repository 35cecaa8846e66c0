//! # Waymark Agent
//!
//! Routes natural-language requests to registered pipelines.
//!
//! An [`Orchestrator`] asks a [`CompletionClient`] to classify each message
//! against the pipeline descriptions, parses the strict JSON decision and
//! runs the chosen pipeline, either directly or through a
//! [`waymark_pipeline::PipelineRunner`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use waymark_agent::{Orchestrator, OrchestratorConfig, ScriptedClient};
//! use waymark_core::PipelineResult;
//! use waymark_pipeline::{Pipeline, PipelineRegistry, step_fn};
//!
//! # tokio_test::block_on(async {
//! let chat = Pipeline::builder("chat_pipeline", "general chat")
//!     .step(
//!         1,
//!         "reply",
//!         "chat",
//!         step_fn(|input| async move { PipelineResult::success(format!("you said: {input}")) }),
//!     )
//!     .build()
//!     .unwrap();
//! let pipelines = Arc::new(PipelineRegistry::new().with("chat_pipeline", Arc::new(chat)));
//!
//! let client = Arc::new(ScriptedClient::new().reply(r#"{"pipeline": "chat_pipeline"}"#));
//! let orchestrator = Orchestrator::new(client, pipelines, OrchestratorConfig::default());
//!
//! let mut session = orchestrator.new_session();
//! let result = orchestrator.handle_message(&mut session, "hi").await;
//! assert_eq!(result.message(), "you said: hi");
//! # });
//! ```

pub mod config;
pub mod llm;
pub mod mock;
pub mod orchestrator;
pub mod routing;
pub mod session;

pub use config::{ConfigError, OrchestratorConfig};
pub use llm::{ChatMessage, CompletionClient, CompletionError, CompletionRequest, Role};
pub use mock::ScriptedClient;
pub use orchestrator::{Dispatch, Orchestrator, OrchestratorError};
pub use routing::{RoutingError, parse_routing};
pub use session::Session;
