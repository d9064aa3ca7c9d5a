//! swarms: bounded autonomous agent loop
//!
//! Repeatedly feeds its own transcript to an OpenAI-compatible chat API.

mod agent;
mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ClientOptions, RunOptions};

#[derive(Debug, Parser)]
#[command(name = "swarms")]
#[command(about = "Bounded autonomous agent loop over an OpenAI-compatible API", version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to swarms.toml (searched for in parent directories otherwise)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// API key (defaults to the env var named by provider.api_key_env)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Base URL of the chat-completions API
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    base_url: Option<String>,

    /// Model to use (overrides config)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Request timeout in seconds (no timeout by default)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the agent loop on a task
    Run(RunArgs),

    /// Send one prompt to several models at once
    Fanout {
        /// The prompt to send
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,

        /// Comma-separated list of models (overrides config)
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,

        /// System prompt
        #[arg(short, long)]
        system: Option<String>,
    },
}

#[derive(Debug, Default, Args)]
struct RunArgs {
    /// The task (defaults to agent.task from config)
    task: Vec<String>,

    /// Number of iterations
    #[arg(long)]
    max_loops: Option<u32>,

    /// Completion attempts per iteration
    #[arg(long)]
    retry_attempts: Option<u32>,

    /// Seconds to pause between iterations
    #[arg(long)]
    interval: Option<u64>,

    /// Cap on transcript entries, task included
    #[arg(long)]
    max_transcript: Option<usize>,

    /// System prompt
    #[arg(short, long)]
    system: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let client_opts = ClientOptions {
        config_path: cli.config,
        api_key: cli.api_key,
        base_url: cli.base_url,
        model: cli.model,
        timeout_secs: cli.timeout,
        system_prompt: None,
    };

    match cli.command {
        Some(Commands::Fanout {
            prompt,
            models,
            system,
        }) => {
            let client_opts = ClientOptions {
                system_prompt: system,
                ..client_opts
            };
            commands::fanout(&prompt.join(" "), models, client_opts).await
        }
        Some(Commands::Run(args)) => run(args, client_opts).await,
        None => {
            // Default to a run with configured settings
            run(RunArgs::default(), client_opts).await
        }
    }
}

async fn run(args: RunArgs, client_opts: ClientOptions) -> Result<()> {
    let task = if args.task.is_empty() {
        None
    } else {
        Some(args.task.join(" "))
    };
    let client_opts = ClientOptions {
        system_prompt: args.system,
        ..client_opts
    };
    let run_opts = RunOptions {
        max_loops: args.max_loops,
        retry_attempts: args.retry_attempts,
        interval_secs: args.interval,
        max_transcript_entries: args.max_transcript,
    };
    commands::run(task, client_opts, run_opts).await
}
