use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use waymark_core::PipelineResult;
use waymark_pipeline::{Pipeline, PipelineRegistry, PipelineRunner};

use crate::config::OrchestratorConfig;
use crate::llm::{ChatMessage, CompletionClient, CompletionError, CompletionRequest};
use crate::routing::{RoutingError, parse_routing};
use crate::session::Session;

/// Why a message could not be routed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

/// How a routed pipeline is executed.
#[derive(Clone)]
pub enum Dispatch {
    /// In memory, nothing recorded.
    Direct,
    /// Through the runner, recording every step.
    ///
    /// Step records are keyed by pipeline name only. With `resume: true`,
    /// once a pipeline has completed every later message routed to it
    /// reports no steps remaining, so set `resume` for retries of a failed
    /// request rather than for fresh ones.
    Runner {
        runner: PipelineRunner,
        resume: bool,
    },
}

/// Routes user messages to registered pipelines with a language model.
///
/// The system prompt is generated once, from the registry contents at
/// construction. Conversation state lives in [`Session`]s owned by callers.
pub struct Orchestrator {
    client: Arc<dyn CompletionClient>,
    pipelines: Arc<PipelineRegistry>,
    config: OrchestratorConfig,
    dispatch: Dispatch,
    system_prompt: String,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        pipelines: Arc<PipelineRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        if !pipelines.contains(&config.default_pipeline) {
            warn!(default = %config.default_pipeline, "Default pipeline is not registered");
        }
        let system_prompt = build_system_prompt(&pipelines, &config);
        Self {
            client,
            pipelines,
            config,
            dispatch: Dispatch::Direct,
            system_prompt,
        }
    }

    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// A fresh conversation seeded with the routing prompt.
    pub fn new_session(&self) -> Session {
        Session::new(self.system_prompt.clone())
    }

    /// Ask the model which pipeline handles `text`.
    ///
    /// The user turn is always appended to `session`; the assistant's reply
    /// only when it names a registered pipeline.
    pub async fn route(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<Arc<Pipeline>, OrchestratorError> {
        session.push(ChatMessage::user(text));
        let request = CompletionRequest {
            messages: session.history().to_vec(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let reply = self.client.complete(&request).await?;
        if reply.trim().is_empty() {
            return Err(CompletionError::EmptyReply.into());
        }
        debug!(session = %session.id(), reply = %reply, "Routing reply");

        let name = parse_routing(&reply, &self.config.routing_key)?;
        let pipeline = self
            .pipelines
            .get(&name)
            .cloned()
            .ok_or(RoutingError::UnknownPipeline(name))?;

        session.push(ChatMessage::assistant(reply));
        info!(session = %session.id(), pipeline = %pipeline.name(), "Routed message");
        Ok(pipeline)
    }

    /// Route `text` and run the chosen pipeline on it.
    pub async fn handle_message(&self, session: &mut Session, text: &str) -> PipelineResult {
        let pipeline = match self.route(session, text).await {
            Ok(pipeline) => pipeline,
            Err(e) => {
                warn!(session = %session.id(), error = %e, "Could not route message");
                return PipelineResult::error(e.to_string());
            }
        };

        match &self.dispatch {
            Dispatch::Direct => pipeline.run(text).await,
            Dispatch::Runner { runner, resume } => runner.run(&pipeline, text, *resume).await,
        }
    }
}

fn build_system_prompt(pipelines: &PipelineRegistry, config: &OrchestratorConfig) -> String {
    let mut prompt = String::from(
        "You route user requests. Pick the single pipeline best suited to the user's latest message.\n\nAvailable pipelines:\n",
    );
    for (name, pipeline) in pipelines.iter() {
        prompt.push_str(&format!("- {}: {}\n", name, pipeline.description()));
    }
    prompt.push_str(&format!(
        "\nIf no other pipeline matches, choose \"{default}\".\n\
         Reply with exactly one JSON object and nothing else, no prose and no markdown: \
         {{\"{key}\": \"<pipeline name>\"}}",
        default = config.default_pipeline,
        key = config.routing_key,
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedClient;
    use waymark_core::InMemoryStore;
    use waymark_pipeline::step_fn;

    fn registry() -> Arc<PipelineRegistry> {
        let chat = Pipeline::builder("chat_pipeline", "general chat")
            .step(
                1,
                "reply",
                "chat",
                step_fn(|input| async move { PipelineResult::success(format!("chat: {input}")) }),
            )
            .build()
            .unwrap();
        let release = Pipeline::builder("release_pipeline", "creates releases")
            .step(
                1,
                "release",
                "releaser",
                step_fn(|input| async move {
                    PipelineResult::success(format!("release: {input}"))
                }),
            )
            .build()
            .unwrap();
        Arc::new(
            PipelineRegistry::new()
                .with("chat_pipeline", Arc::new(chat))
                .with("release_pipeline", Arc::new(release)),
        )
    }

    #[test]
    fn test_system_prompt_lists_registry() {
        let client = Arc::new(ScriptedClient::new());
        let orchestrator = Orchestrator::new(client, registry(), OrchestratorConfig::default());
        let prompt = orchestrator.system_prompt();
        assert!(prompt.contains(
            "- chat_pipeline: general chat\n- release_pipeline: creates releases\n"
        ));
        assert!(prompt.contains("choose \"chat_pipeline\""));
        assert!(prompt.contains(r#"{"pipeline": "<pipeline name>"}"#));
    }

    #[tokio::test]
    async fn test_request_carries_history_and_sampling() {
        let client = Arc::new(ScriptedClient::new().reply(r#"{"pipeline": "chat_pipeline"}"#));
        let config = OrchestratorConfig::default()
            .with_temperature(0.0)
            .with_max_tokens(32);
        let orchestrator = Orchestrator::new(client.clone(), registry(), config);
        let mut session = orchestrator.new_session();

        let result = orchestrator.handle_message(&mut session, "hello").await;
        assert_eq!(result.message(), "chat: hello");

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].max_tokens, 32);
        assert_eq!(session.len(), 3);
    }

    #[tokio::test]
    async fn test_model_failure_appends_no_assistant_turn() {
        let client = Arc::new(
            ScriptedClient::new().fail(CompletionError::Transport("connection refused".into())),
        );
        let orchestrator = Orchestrator::new(client, registry(), OrchestratorConfig::default());
        let mut session = orchestrator.new_session();

        let result = orchestrator.handle_message(&mut session, "hi").await;
        assert!(result.is_error());
        assert!(result.message().contains("connection refused"));
        assert_eq!(session.len(), 2);
        assert_eq!(session.last().map(|m| m.content.as_str()), Some("hi"));
    }

    #[tokio::test]
    async fn test_blank_reply_is_model_error() {
        let client = Arc::new(ScriptedClient::new().reply("   "));
        let orchestrator = Orchestrator::new(client, registry(), OrchestratorConfig::default());
        let mut session = orchestrator.new_session();

        let err = orchestrator.route(&mut session, "hi").await.unwrap_err();
        assert_eq!(err, OrchestratorError::Completion(CompletionError::EmptyReply));
    }

    #[tokio::test]
    async fn test_resuming_dispatch_has_nothing_left_after_completion() {
        let reply = r#"{"pipeline": "release_pipeline"}"#;
        let client = Arc::new(ScriptedClient::new().reply(reply).reply(reply).reply(reply));
        let runner = PipelineRunner::new(Arc::new(InMemoryStore::new()));
        let resuming = Orchestrator::new(client.clone(), registry(), OrchestratorConfig::default())
            .with_dispatch(Dispatch::Runner {
                runner: runner.clone(),
                resume: true,
            });
        let mut session = resuming.new_session();

        let first = resuming.handle_message(&mut session, "v1").await;
        assert_eq!(first.message(), "release: v1");
        let second = resuming.handle_message(&mut session, "v2").await;
        assert!(second.is_error());
        assert!(second.message().contains("no steps remaining"));

        let fresh = Orchestrator::new(client, registry(), OrchestratorConfig::default())
            .with_dispatch(Dispatch::Runner {
                runner,
                resume: false,
            });
        let third = fresh.handle_message(&mut session, "v2").await;
        assert_eq!(third.message(), "release: v2");
    }
}
