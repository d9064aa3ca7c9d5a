//! Command implementations

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use swarms_core::config::AgentSection;
use swarms_core::{ChatCompletion, Config, MultiModelManager, OpenAiClient};
use tracing::{info, warn};

use crate::agent::{AgentConfig, AgentLoop, RunOutcome};

/// Settings shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub config_path: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub system_prompt: Option<String>,
}

/// Overrides for the agent loop policy
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub max_loops: Option<u32>,
    pub retry_attempts: Option<u32>,
    pub interval_secs: Option<u64>,
    pub max_transcript_entries: Option<usize>,
}

fn load_config(opts: &ClientOptions) -> Result<Config> {
    let mut config = match &opts.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load().context("Failed to load swarms.toml")?,
    };

    if let Some(ref base_url) = opts.base_url {
        config.provider.base_url = base_url.clone();
    }
    if let Some(ref model) = opts.model {
        config.provider.model = model.clone();
    }
    if let Some(secs) = opts.timeout_secs {
        config.provider.timeout_secs = Some(secs);
    }
    if let Some(ref system) = opts.system_prompt {
        config.provider.system_prompt = system.clone();
    }

    Ok(config)
}

/// Loop policy from the config file with command-line overrides applied
fn agent_config(section: &AgentSection, opts: &RunOptions) -> AgentConfig {
    let mut config = AgentConfig::from_section(section);
    if let Some(max) = opts.max_loops {
        config = config.with_max_loops(max);
    }
    if let Some(attempts) = opts.retry_attempts {
        config = config.with_retry_attempts(attempts);
    }
    if let Some(secs) = opts.interval_secs {
        config = config.with_loop_interval(Duration::from_secs(secs));
    }
    if opts.max_transcript_entries.is_some() {
        config = config.with_max_transcript_entries(opts.max_transcript_entries);
    }
    config
}

fn build_client(config: &Config, opts: &ClientOptions) -> Result<OpenAiClient> {
    let api_key = config.provider.resolve_api_key(opts.api_key.clone())?;
    let client = OpenAiClient::new(config.provider.client_config(api_key))
        .context("Failed to create chat-completion client")?;
    Ok(client)
}

/// Run the agent loop on a task
pub async fn run(task: Option<String>, client_opts: ClientOptions, run_opts: RunOptions) -> Result<()> {
    let config = load_config(&client_opts)?;

    let agent_config = agent_config(&config.agent, &run_opts);
    agent_config.validate().context("Invalid agent configuration")?;

    let client = build_client(&config, &client_opts)?;
    let task = task.unwrap_or_else(|| config.agent.task.clone());

    info!(model = %client.model(), endpoint = %client.endpoint(), "Starting the autonomous agent");

    let mut agent = AgentLoop::new(client, agent_config);
    let report = agent.run(&task).await;

    match report.outcome {
        RunOutcome::Completed => info!(
            iterations = report.iterations,
            attempts = report.attempts,
            entries = report.transcript.len(),
            "Agent run completed"
        ),
        RunOutcome::StoppedEarly { iteration } => warn!(
            iteration,
            completions = report.completions,
            "Agent run stopped early"
        ),
        RunOutcome::Faulted(ref message) => warn!(error = %message, "Agent run faulted"),
    }

    Ok(())
}

/// Send one prompt to several models and print each answer
pub async fn fanout(prompt: &str, models: Vec<String>, client_opts: ClientOptions) -> Result<()> {
    let config = load_config(&client_opts)?;

    let models = if models.is_empty() {
        config.fanout.models.clone()
    } else {
        models
    };
    if models.is_empty() {
        anyhow::bail!("No models to fan out to: pass --models or set [fanout] models in swarms.toml");
    }

    let base = build_client(&config, &client_opts)?;
    let clients: Vec<Arc<dyn ChatCompletion>> = models
        .iter()
        .map(|m| Arc::new(base.for_model(m.as_str())) as Arc<dyn ChatCompletion>)
        .collect();

    info!(models = clients.len(), "Fanning out prompt");
    let manager = MultiModelManager::new(clients);
    let outputs = manager
        .complete_all(prompt)
        .await
        .context("Fan-out failed")?;

    for output in outputs {
        println!("== {} ==", output.model);
        println!("{}\n", output.content);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE_CONFIG: &str = r#"
[provider]
base_url = "http://localhost:11434/v1"
model = "llama3.2"
timeout_secs = 30
system_prompt = "Be brief."

[agent]
max_loops = 5
retry_attempts = 2
loop_interval_secs = 7
max_transcript_entries = 10
"#;

    fn write_config(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("swarms.toml");
        std::fs::write(&path, FILE_CONFIG).unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ClientOptions {
            config_path: Some(write_config(&dir)),
            model: Some("gpt-4o".to_string()),
            timeout_secs: Some(5),
            ..Default::default()
        };

        let config = load_config(&opts).unwrap();

        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.provider.timeout_secs, Some(5));
        // Untouched by flags, so the file wins
        assert_eq!(config.provider.base_url, "http://localhost:11434/v1");
        assert_eq!(config.provider.system_prompt, "Be brief.");
    }

    #[test]
    fn test_base_url_and_system_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ClientOptions {
            config_path: Some(write_config(&dir)),
            base_url: Some("https://api.example.test/v1".to_string()),
            system_prompt: Some("Be thorough.".to_string()),
            ..Default::default()
        };

        let config = load_config(&opts).unwrap();

        assert_eq!(config.provider.base_url, "https://api.example.test/v1");
        assert_eq!(config.provider.system_prompt, "Be thorough.");
        assert_eq!(config.provider.model, "llama3.2");
        assert_eq!(config.provider.timeout_secs, Some(30));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ClientOptions {
            config_path: Some(dir.path().join("absent.toml").display().to_string()),
            ..Default::default()
        };
        assert!(load_config(&opts).is_err());
    }

    #[test]
    fn test_run_flags_override_agent_section() {
        let dir = tempfile::tempdir().unwrap();
        let file = Config::load_from(write_config(&dir)).unwrap();
        let opts = RunOptions {
            max_loops: Some(1),
            interval_secs: Some(0),
            ..Default::default()
        };

        let agent = agent_config(&file.agent, &opts);

        assert_eq!(agent.max_loops, 1);
        assert_eq!(agent.loop_interval, Duration::ZERO);
        assert_eq!(agent.retry_attempts, 2);
        assert_eq!(agent.max_transcript_entries, Some(10));
        assert!(agent.validate().is_ok());
    }

    #[test]
    fn test_max_transcript_flag_reaches_validation() {
        let opts = RunOptions {
            max_transcript_entries: Some(1),
            ..Default::default()
        };

        let agent = agent_config(&AgentSection::default(), &opts);

        assert_eq!(agent.max_transcript_entries, Some(1));
        assert!(agent.validate().is_err());
    }

    #[test]
    fn test_zero_retry_attempts_flag_reaches_validation() {
        let opts = RunOptions {
            retry_attempts: Some(0),
            ..Default::default()
        };

        let agent = agent_config(&AgentSection::default(), &opts);

        assert_eq!(agent.retry_attempts, 0);
        assert!(agent.validate().is_err());
    }

    #[test]
    fn test_no_flags_keep_defaults() {
        let agent = agent_config(&AgentSection::default(), &RunOptions::default());
        assert_eq!(agent.max_loops, 2);
        assert_eq!(agent.retry_attempts, 3);
        assert_eq!(agent.loop_interval, Duration::from_secs(2));
        assert_eq!(agent.max_transcript_entries, None);
    }
}
