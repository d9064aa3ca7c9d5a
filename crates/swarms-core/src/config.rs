//! Configuration management for swarms.toml

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::openai::{OpenAiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};

pub const CONFIG_FILE: &str = "swarms.toml";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_TASK: &str = "What are the best ways to establish a non-profit AI research lab";
pub const DEFAULT_AGENT_NAME: &str = "Autonomous Agent";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub fanout: FanoutSection,
}

/// Where and how to reach the chat-completion API
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the bearer token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Loop policy for the agent
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default = "default_max_loops")]
    pub max_loops: u32,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_loop_interval_secs")]
    pub loop_interval_secs: u64,
    #[serde(default)]
    pub max_transcript_entries: Option<usize>,
    #[serde(default = "default_task")]
    pub task: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FanoutSection {
    #[serde(default)]
    pub models: Vec<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_agent_name() -> String {
    DEFAULT_AGENT_NAME.to_string()
}

fn default_max_loops() -> u32 {
    2
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_loop_interval_secs() -> u64 {
    2
}

fn default_task() -> String {
    DEFAULT_TASK.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            system_prompt: default_system_prompt(),
            timeout_secs: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            max_loops: default_max_loops(),
            retry_attempts: default_retry_attempts(),
            loop_interval_secs: default_loop_interval_secs(),
            max_transcript_entries: None,
            task: default_task(),
        }
    }
}

impl Config {
    /// Load swarms.toml if one exists, otherwise use defaults
    pub fn load() -> Result<Self> {
        match Self::find_config_path() {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.as_ref().display()))
    }

    /// Find swarms.toml by searching the current directory and parents
    pub fn find_config_path() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_config_path_from(current)
    }

    fn find_config_path_from(mut current: PathBuf) -> Option<PathBuf> {
        for _ in 0..10 {
            let candidate = current.join(CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                break;
            }
        }

        None
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Resolve the credential: explicit value first, then the configured env var
    pub fn resolve_api_key(&self, explicit: Option<String>) -> Result<String> {
        if let Some(key) = explicit.filter(|k| !k.is_empty()) {
            return Ok(key);
        }

        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => anyhow::bail!(
                "No API key: pass --api-key or set the {} environment variable",
                self.api_key_env
            ),
        }
    }

    /// Client settings for this provider with the given credential
    pub fn client_config(&self, api_key: String) -> OpenAiConfig {
        OpenAiConfig {
            base_url: self.base_url.clone(),
            api_key,
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            timeout: self.timeout(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}
