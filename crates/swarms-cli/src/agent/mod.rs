//! Bounded autonomous agent loop
//!
//! Feeds the growing transcript back to the model for a fixed number of
//! iterations, retrying each iteration a bounded number of times.

mod agent_loop;
mod state;

pub use agent_loop::{AgentLoop, RunOutcome};
pub use state::AgentConfig;
