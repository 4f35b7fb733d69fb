//! Core traits and shared data models for the agentic SDK.
//! This crate keeps the domain primitives lightweight and platform-agnostic
//! so runtimes and integrations can compose them without pulling in heavy deps.

pub mod agent;
pub mod context;
pub mod control;
pub mod events;
pub mod llm;
pub mod messaging;
pub mod persistence;

pub use agent::{ToolBox, ToolHandle, ToolRegistry, ToolResponse};
pub use context::RunContext;
pub use control::{
    ToolControl, FINISH_AGENT_SENTINEL, PAUSE_FOR_CHILD_SENTINEL, PAUSE_FOR_INPUT_SENTINEL,
};
pub use events::{
    AddChildEvent, AgentEvent, ChatOutputEvent, CompletionEndEvent, CompletionStartEvent,
    CompletionUsage, ConsoleBroadcaster, EventBroadcaster, EventDispatcher, EventOrigin,
    OutputEvent, PromptEvent, PromptStartedEvent, ResetHistoryEvent, ResumeWithInputEvent,
    SetStateEvent, ToolCallEvent, ToolResultEvent, TurnEndEvent, WaitForInputEvent,
};
pub use llm::{Completion, CompletionRequest, LanguageModel, ToolCallRequest};
pub use messaging::{AgentMessage, MessageContent, MessageMetadata, MessageRole, ToolInvocation};
pub use persistence::{Checkpointer, InMemoryCheckpointer, PendingChild, RunState, ThreadId};
