//! Agent configuration and short-term memory

use std::time::Duration;

use anyhow::Result;
use swarms_core::config::{AgentSection, DEFAULT_AGENT_NAME};

/// Configuration for the agent loop
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Name used in log output
    pub agent_name: String,
    /// Number of iterations to run
    pub max_loops: u32,
    /// Completion attempts per iteration
    pub retry_attempts: u32,
    /// Pause after each successful iteration
    pub loop_interval: Duration,
    /// Transcript cap (task included); `None` is unbounded
    pub max_transcript_entries: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            max_loops: 2,
            retry_attempts: 3,
            loop_interval: Duration::from_secs(2),
            max_transcript_entries: None,
        }
    }
}

impl AgentConfig {
    pub fn from_section(section: &AgentSection) -> Self {
        Self {
            agent_name: section.name.clone(),
            max_loops: section.max_loops,
            retry_attempts: section.retry_attempts,
            loop_interval: Duration::from_secs(section.loop_interval_secs),
            max_transcript_entries: section.max_transcript_entries,
        }
    }

    pub fn with_max_loops(mut self, max: u32) -> Self {
        self.max_loops = max;
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn with_loop_interval(mut self, interval: Duration) -> Self {
        self.loop_interval = interval;
        self
    }

    pub fn with_max_transcript_entries(mut self, max: Option<usize>) -> Self {
        self.max_transcript_entries = max;
        self
    }

    /// Reject policies the loop cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.retry_attempts == 0 {
            anyhow::bail!("retry_attempts must be at least 1");
        }
        if let Some(max) = self.max_transcript_entries {
            if max < 2 {
                anyhow::bail!("max_transcript_entries must be at least 2 (got {})", max);
            }
        }
        Ok(())
    }
}

/// Ordered log of the task and every successful response.
///
/// With a cap set, the oldest responses are evicted first; the task at
/// index 0 always stays.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<String>,
    max_entries: Option<usize>,
}

impl Transcript {
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());

        if let Some(max) = self.max_entries {
            if self.entries.len() > max {
                let excess = self.entries.len() - max;
                let start = 1.min(self.entries.len() - 1);
                self.entries.drain(start..start + excess);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Flatten into a single prompt: a quoted, escaped listing in order
    pub fn render(&self) -> String {
        format!("{:?}", self.entries)
    }
}
