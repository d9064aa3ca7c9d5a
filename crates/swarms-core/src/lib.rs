//! swarms-core: chat-completion plumbing for the swarms agent
//!
//! Provides:
//! - Configuration loading (swarms.toml)
//! - OpenAI-compatible chat-completion client
//! - Multi-model fan-out

pub mod config;
pub mod error;
pub mod manager;
pub mod openai;
pub mod provider;

pub use config::Config;
pub use error::CompletionError;
pub use manager::{ModelOutput, MultiModelManager};
pub use openai::{ChatRequest, ChatResponse, Message, OpenAiClient, OpenAiConfig, Role};
pub use provider::ChatCompletion;
