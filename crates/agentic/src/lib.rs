//! # Agentic
//!
//! Framework for composing AI agents around a typed event protocol: every
//! step of a run (prompts, completions, tool calls, pauses for human input,
//! sub-agent delegation) is surfaced as a serializable [`AgentEvent`] that
//! broadcasters can render, persist or forward.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use agentic::events::ConsoleBroadcaster;
//! use agentic::AgentBuilder;
//! # use agentic::llm::{Completion, CompletionRequest, LanguageModel};
//! # use async_trait::async_trait;
//! # struct MyModel;
//! # #[async_trait]
//! # impl LanguageModel for MyModel {
//! #     async fn complete(&self, _: CompletionRequest) -> anyhow::Result<Completion> {
//! #         unimplemented!()
//! #     }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let agent = AgentBuilder::new("Assistant")
//!         .with_instructions("You are a helpful assistant.")
//!         .with_model(Arc::new(MyModel))
//!         .with_broadcaster(Arc::new(ConsoleBroadcaster::new()))
//!         .build()?;
//!
//!     let outcome = agent.prompt("Hello!").await?;
//!     println!("{:?}", outcome.result());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toolkit` (default): built-in tools such as the browser automation wrapper
//! - `rag`: vector index, embeddings and chunking helpers
//! - `full`: everything

#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export core functionality (always available)
pub use agentic_core::{agent, context, control, events, llm, messaging, persistence};
pub use agentic_core::events::AgentEvent;
pub use agentic_runtime::{AgentBuilder, AgentRunner, TurnOutcome};

// Re-export toolkit functionality (when toolkit feature is enabled)
#[cfg(feature = "toolkit")]
#[cfg_attr(docsrs, doc(cfg(feature = "toolkit")))]
pub use agentic_toolkit as toolkit;

// Re-export RAG functionality (when rag feature is enabled)
#[cfg(feature = "rag")]
#[cfg_attr(docsrs, doc(cfg(feature = "rag")))]
pub use agentic_rag as rag;

/// Prelude module for common imports
///
/// ```rust
/// use agentic::prelude::*;
/// ```
pub mod prelude {

    // Core types
    pub use agentic_core::agent::{ToolHandle, ToolRegistry, ToolResponse};
    pub use agentic_core::context::RunContext;
    pub use agentic_core::control::ToolControl;
    pub use agentic_core::events::{
        AgentEvent, ConsoleBroadcaster, EventBroadcaster, EventDispatcher, EventOrigin,
    };
    pub use agentic_core::llm::{Completion, CompletionRequest, LanguageModel};
    pub use agentic_core::messaging::{AgentMessage, MessageContent, MessageRole, ToolInvocation};
    pub use agentic_core::persistence::{Checkpointer, InMemoryCheckpointer, ThreadId};

    // Runtime essentials
    pub use agentic_runtime::{AgentBuilder, AgentRunner, TurnOutcome};

    // Toolkit utilities (when available)
    #[cfg(feature = "toolkit")]
    pub use agentic_toolkit::browser::{BrowserUseConfig, BrowserUseTool};
}
