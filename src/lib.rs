//! # Waymark
//!
//! Resumable, checkpointed agent pipelines over a durable memory store.
//!
//! This crate re-exports the workspace members:
//!
//! - [`core`]: data model, the [`MemoryStore`] contract, in-memory backend, registries
//! - [`memory`]: Redis backend
//! - [`pipeline`]: pipeline definitions and the resumable runner
//! - [`agent`]: LLM routing orchestrator

pub use waymark_agent as agent;
pub use waymark_core as core;
pub use waymark_memory as memory;
pub use waymark_pipeline as pipeline;

pub use waymark_agent::{Dispatch, Orchestrator, OrchestratorConfig, Session};
pub use waymark_core::{
    AgentSnapshot, InMemoryStore, MemoryItem, MemoryStore, PipelineResult, Registry, StoreError,
};
pub use waymark_memory::{RedisConfig, RedisMemoryStore};
pub use waymark_pipeline::{Pipeline, PipelineRegistry, PipelineRunner, RunReport, RunState};
