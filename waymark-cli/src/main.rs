use clap::{Parser, Subcommand};

mod commands;

use commands::run_command;

#[derive(Parser, Debug)]
#[command(name = "waymark", version)]
#[command(about = "Inspect and manage the waymark memory, checkpoint and lock store")]
struct Cli {
    /// Redis URL (overrides WAYMARK_REDIS_URL)
    #[arg(long, global = true)]
    redis_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Check the store is reachable
    Ping,
    /// List the most recent memory items, newest first
    Recent {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one memory item
    Show { id: String },
    /// Delete one memory item
    Delete { id: String },
    /// List checkpoint ids
    Checkpoints {
        /// Only ids starting with this prefix
        #[arg(long, default_value = "")]
        prefix: String,
    },
    /// Show one checkpoint
    Checkpoint { id: String },
    /// Show the last completed step of a pipeline
    Progress { pipeline: String },
    /// Acquire or release a lock
    Lock {
        #[command(subcommand)]
        lock_command: LockCommands,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum LockCommands {
    /// Try to take a lock; prints whether it was acquired
    Acquire {
        key: String,
        #[arg(long)]
        owner: String,
        #[arg(long, default_value_t = 60)]
        ttl_secs: u64,
    },
    /// Release a lock held by `owner`
    Release {
        key: String,
        #[arg(long)]
        owner: String,
    },
}

#[tokio::main]
async fn main() {
    // JSON logs go to stderr; stdout carries command output.
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .json()
        .try_init();

    let cli = Cli::parse();

    if let Err(e) = run_command(cli.redis_url, cli.command).await {
        tracing::error!(error = %e, code = e.code(), "Command failed");
        std::process::exit(e.exit_code());
    }
}
