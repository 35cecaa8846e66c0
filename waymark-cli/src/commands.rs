use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use waymark_core::{MemoryStore, StoreError};
use waymark_memory::{ConfigError, RedisConfig, RedisMemoryStore};
use waymark_pipeline::{PipelineError, StepProgress};

use crate::{Commands, LockCommands};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("could not encode output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) | CliError::Pipeline(_) => "CONFIG",
            CliError::Store(_) => "STORE",
            CliError::NotFound(_) => "NOT_FOUND",
            CliError::Output(_) => "OUTPUT",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound(_) => 3,
            CliError::Store(_) => 2,
            _ => 1,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run_command(redis_url: Option<String>, command: Commands) -> Result<(), CliError> {
    let mut config = RedisConfig::from_env()?;
    if let Some(url) = redis_url {
        config.url = url;
        config.validate()?;
    }
    let store = RedisMemoryStore::connect(config).await?;
    let result = execute(&store, command).await;
    store.close().await;
    result
}

async fn execute(store: &RedisMemoryStore, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Ping => print_json(&store.health_check().await),
        Commands::Recent { limit } => print_json(&store.query_recent(limit).await?),
        Commands::Show { id } => match store.get_memory(&id).await? {
            Some(item) => print_json(&item),
            None => Err(CliError::NotFound(format!("memory item '{}'", id))),
        },
        Commands::Delete { id } => {
            store.delete_memory(&id).await?;
            print_json(&json!({ "deleted": id }))
        }
        Commands::Checkpoints { prefix } => print_json(&store.list_checkpoints(&prefix).await?),
        Commands::Checkpoint { id } => match store.load_checkpoint(&id).await? {
            Some(snapshot) => print_json(&snapshot),
            None => Err(CliError::NotFound(format!("checkpoint '{}'", id))),
        },
        Commands::Progress { pipeline } => {
            let progress = StepProgress::from_env(Arc::new(store.clone()))?;
            let last = progress.last_completed_step(&pipeline).await?;
            print_json(&json!({
                "pipeline": pipeline,
                "lastCompletedStep": last,
                "scanWindow": progress.scan_window(),
            }))
        }
        Commands::Lock { lock_command } => match lock_command {
            LockCommands::Acquire {
                key,
                owner,
                ttl_secs,
            } => {
                let acquired = store
                    .acquire_lock(&key, Duration::from_secs(ttl_secs), &owner)
                    .await?;
                print_json(&json!({ "key": key, "owner": owner, "acquired": acquired }))
            }
            LockCommands::Release { key, owner } => {
                let released = store.release_lock(&key, &owner).await?;
                print_json(&json!({ "key": key, "owner": owner, "released": released }))
            }
        },
    }
}
