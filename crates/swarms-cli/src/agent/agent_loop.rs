//! Agent loop implementation

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use swarms_core::ChatCompletion;
use tracing::{debug, error, info, instrument};

use super::state::{AgentConfig, Transcript};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// All `max_loops` iterations produced a response
    Completed,
    /// An iteration exhausted its retry attempts
    StoppedEarly { iteration: u32 },
    /// The run panicked and was stopped at the run boundary
    Faulted(String),
}

/// Summary of one `run`
#[derive(Debug, Clone)]
pub struct RunReport {
    pub transcript: Vec<String>,
    pub iterations: u32,
    pub attempts: u32,
    pub completions: u32,
    pub outcome: RunOutcome,
}

/// The agent loop orchestrator
pub struct AgentLoop<C> {
    client: C,
    config: AgentConfig,
    iteration: u32,
    attempts: u32,
    completions: u32,
    transcript: Transcript,
}

impl<C: ChatCompletion> AgentLoop<C> {
    /// Create a new agent loop
    pub fn new(client: C, config: AgentConfig) -> Self {
        let transcript = Transcript::new(config.max_transcript_entries);
        Self {
            client,
            config,
            iteration: 0,
            attempts: 0,
            completions: 0,
            transcript,
        }
    }

    /// Run the agent with a task.
    ///
    /// Never fails: exhausted retries stop the loop early and a panic is
    /// reported as [`RunOutcome::Faulted`].
    #[instrument(skip(self, task), fields(agent = %self.config.agent_name, model = %self.client.model()))]
    pub async fn run(&mut self, task: &str) -> RunReport {
        info!("Autonomous agent activated");

        let outcome = match AssertUnwindSafe(self.drive(task)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(error = %message, "Recovered from panic during agent run");
                RunOutcome::Faulted(message)
            }
        };

        info!(transcript = %self.transcript.render(), "Final transcript");

        RunReport {
            transcript: self.transcript.entries().to_vec(),
            iterations: self.iteration,
            attempts: self.attempts,
            completions: self.completions,
            outcome,
        }
    }

    async fn drive(&mut self, task: &str) -> RunOutcome {
        self.transcript.clear();
        self.transcript.push(task);
        self.iteration = 0;
        self.attempts = 0;
        self.completions = 0;

        let max_loops = self.config.max_loops;

        while self.iteration < max_loops {
            self.iteration += 1;
            info!("Loop {}/{}", self.iteration, max_loops);

            let prompt = self.transcript.render();
            debug!(prompt_len = prompt.len(), entries = self.transcript.len(), "Rendered transcript");

            let Some(response) = self.complete_with_retries(&prompt).await else {
                error!(
                    iteration = self.iteration,
                    attempts = self.config.retry_attempts,
                    "Failed to generate a valid response after retry attempts"
                );
                return RunOutcome::StoppedEarly {
                    iteration: self.iteration,
                };
            };

            info!(response = %response, "Response");
            self.transcript.push(response);
            self.completions += 1;

            if self.iteration < max_loops && !self.config.loop_interval.is_zero() {
                tokio::time::sleep(self.config.loop_interval).await;
            }
        }

        RunOutcome::Completed
    }

    /// Up to `retry_attempts` sequential attempts, stopping at the first success
    async fn complete_with_retries(&mut self, prompt: &str) -> Option<String> {
        for attempt in 1..=self.config.retry_attempts {
            self.attempts += 1;
            match self.client.complete(prompt).await {
                Ok(response) => return Some(response),
                Err(e) => {
                    error!(attempt, error = %e, "Attempt {}: Error generating response", attempt);
                }
            }
        }
        None
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use swarms_core::CompletionError;

    enum Step {
        Reply(&'static str),
        Fail,
        Panic,
    }

    /// Replays a fixed script of replies; fails once the script runs out
    struct ScriptedClient {
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatCompletion for ScriptedClient {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Reply(text)) => Ok(text.to_string()),
                Some(Step::Panic) => panic!("scripted client blew up"),
                Some(Step::Fail) | None => Err(CompletionError::EmptyChoices),
            }
        }
    }

    fn config(max_loops: u32, retry_attempts: u32) -> AgentConfig {
        AgentConfig::default()
            .with_max_loops(max_loops)
            .with_retry_attempts(retry_attempts)
            .with_loop_interval(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_zero_loops_makes_no_calls() {
        let client = ScriptedClient::new(vec![Step::Reply("A")]);
        let mut agent = AgentLoop::new(client.clone(), config(0, 3));

        let report = agent.run("T").await;

        assert_eq!(client.calls(), 0);
        assert_eq!(report.transcript, ["T"]);
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.iterations, 0);
    }

    #[tokio::test]
    async fn test_two_loops_append_in_order() {
        let client = ScriptedClient::new(vec![Step::Reply("A"), Step::Reply("B")]);
        let mut agent = AgentLoop::new(client.clone(), config(2, 3));

        let report = agent.run("T").await;

        assert_eq!(report.transcript, ["T", "A", "B"]);
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.completions, 2);
        assert_eq!(client.calls(), 2);

        // Each prompt is the transcript as it stood before the call
        let prompts = client.prompts.lock().unwrap();
        assert_eq!(*prompts, [r#"["T"]"#, r#"["T", "A"]"#]);
    }

    #[tokio::test]
    async fn test_succeeds_on_last_attempt() {
        let client = ScriptedClient::new(vec![Step::Fail, Step::Fail, Step::Reply("A")]);
        let mut agent = AgentLoop::new(client.clone(), config(1, 3));

        let report = agent.run("T").await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.transcript, ["T", "A"]);
        assert_eq!(report.attempts, 3);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_stop_early() {
        let client = ScriptedClient::new(vec![]);
        let mut agent = AgentLoop::new(client.clone(), config(1, 2));

        let report = agent.run("T").await;

        assert_eq!(report.transcript, ["T"]);
        assert_eq!(report.outcome, RunOutcome::StoppedEarly { iteration: 1 });
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_mid_run_keeps_earlier_responses() {
        let client = ScriptedClient::new(vec![Step::Reply("A"), Step::Fail, Step::Fail]);
        let mut agent = AgentLoop::new(client.clone(), config(5, 2));

        let report = agent.run("T").await;

        assert_eq!(report.transcript, ["T", "A"]);
        assert_eq!(report.outcome, RunOutcome::StoppedEarly { iteration: 2 });
        assert_eq!(report.iterations, 2);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_panic_is_contained_at_run_boundary() {
        let client = ScriptedClient::new(vec![Step::Reply("A"), Step::Panic]);
        let mut agent = AgentLoop::new(client.clone(), config(3, 3));

        let report = agent.run("T").await;

        match report.outcome {
            RunOutcome::Faulted(message) => assert!(message.contains("blew up")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(report.transcript, ["T", "A"]);
    }

    #[tokio::test]
    async fn test_state_resets_between_runs() {
        let client = ScriptedClient::new(vec![Step::Reply("A"), Step::Reply("B")]);
        let mut agent = AgentLoop::new(client.clone(), config(1, 1));

        let first = agent.run("T1").await;
        let second = agent.run("T2").await;

        assert_eq!(first.transcript, ["T1", "A"]);
        assert_eq!(second.transcript, ["T2", "B"]);
        assert_eq!(second.iterations, 1);
        assert_eq!(second.attempts, 1);
    }

    #[tokio::test]
    async fn test_transcript_cap_applies_during_run() {
        let client = ScriptedClient::new(vec![Step::Reply("A"), Step::Reply("B"), Step::Reply("C")]);
        let mut agent = AgentLoop::new(
            client.clone(),
            config(3, 1).with_max_transcript_entries(Some(2)),
        );

        let report = agent.run("T").await;

        assert_eq!(report.transcript, ["T", "C"]);
        assert_eq!(report.completions, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_between_iterations_only() {
        let client = ScriptedClient::new(vec![Step::Reply("A"), Step::Reply("B")]);
        let mut agent = AgentLoop::new(
            client.clone(),
            config(2, 1).with_loop_interval(Duration::from_secs(2)),
        );

        let start = tokio::time::Instant::now();
        let report = agent.run("T").await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(start.elapsed().as_secs(), 2);
    }

    #[test]
    fn test_panic_message_formats() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
