//! Agent runtime for the agentic SDK: the turn loop that drives an LLM,
//! executes tools, pauses for external input, and delegates to sub-agents,
//! narrating every step through the core event protocol.

pub mod builder;
pub mod runner;

pub use builder::AgentBuilder;
pub use runner::{AgentRunner, TurnOutcome};
