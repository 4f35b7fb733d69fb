//! Typed event protocol between agent internals and the surrounding runtime.
//!
//! Every event names the agent that produced it and carries a nesting `depth`
//! (0 for the top-level agent, +1 per sub-agent hop). Events flow out of the
//! runner through an [`EventDispatcher`] to any number of registered
//! [`EventBroadcaster`]s.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::messaging::AgentMessage;

/// Common origin fields shared by every event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventOrigin {
    pub agent: String,
    pub depth: u32,
}

impl EventOrigin {
    pub fn new(agent: impl Into<String>, depth: u32) -> Self {
        Self {
            agent: agent.into(),
            depth,
        }
    }

    pub fn top_level(agent: impl Into<String>) -> Self {
        Self::new(agent, 0)
    }
}

/// Token and cost accounting for a single LLM completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompletionUsage {
    pub model: String,
    pub cost: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub elapsed_seconds: f64,
}

impl CompletionUsage {
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_tokens(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AgentEvent {
    Prompt(PromptEvent),
    PromptStarted(PromptStartedEvent),
    ResetHistory(ResetHistoryEvent),
    Output(OutputEvent),
    ChatOutput(ChatOutputEvent),
    ToolCall(ToolCallEvent),
    ToolResult(ToolResultEvent),
    CompletionStart(CompletionStartEvent),
    CompletionEnd(CompletionEndEvent),
    TurnEnd(TurnEndEvent),
    SetState(SetStateEvent),
    AddChild(AddChildEvent),
    WaitForInput(WaitForInputEvent),
    ResumeWithInput(ResumeWithInputEvent),
}

/// Request to run a turn. The `originator` is the address of the top-level
/// caller into the agent; it is passed down the call chain so sub-agents can
/// route results back to the top.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptEvent {
    pub origin: EventOrigin,
    pub message: String,
    /// Asks broadcasters that honor it (the console does) to render every
    /// event of the run with [`AgentEvent::debug_line`], not just outputs.
    #[serde(default)]
    pub debug: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originator: Option<String>,
    #[serde(default)]
    pub ignore_result: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptStartedEvent {
    pub origin: EventOrigin,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResetHistoryEvent {
    pub origin: EventOrigin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputEvent {
    pub origin: EventOrigin,
    pub message: String,
}

/// Structured chat payload; the display form is the `content` field only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatOutputEvent {
    pub origin: EventOrigin,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallEvent {
    pub origin: EventOrigin,
    pub tool_name: String,
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResultEvent {
    pub origin: EventOrigin,
    pub tool_name: String,
    pub result: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionStartEvent {
    pub origin: EventOrigin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionEndEvent {
    pub origin: EventOrigin,
    pub message: AgentMessage,
    pub usage: CompletionUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnEndEvent {
    pub origin: EventOrigin,
    pub messages: Vec<AgentMessage>,
    #[serde(default)]
    pub context_variables: BTreeMap<String, serde_json::Value>,
}

impl TurnEndEvent {
    /// Text content of the final message, the conventional "result" of a turn.
    pub fn result(&self) -> Option<&str> {
        self.messages.last().and_then(|m| m.content.as_text())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetStateEvent {
    pub origin: EventOrigin,
    pub state: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddChildEvent {
    pub origin: EventOrigin,
    pub child: String,
    #[serde(default)]
    pub handoff: bool,
}

/// Emitted whenever the agent needs to pause, either to wait for human input
/// or for a response from another agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitForInputEvent {
    pub origin: EventOrigin,
    pub request_keys: BTreeMap<String, String>,
}

/// Sent by the caller with the requested input values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResumeWithInputEvent {
    pub origin: EventOrigin,
    pub values: BTreeMap<String, serde_json::Value>,
}

impl AgentEvent {
    pub fn event_type_name(&self) -> &'static str {
        match self {
            AgentEvent::Prompt(_) => "prompt",
            AgentEvent::PromptStarted(_) => "prompt_started",
            AgentEvent::ResetHistory(_) => "reset_history",
            AgentEvent::Output(_) => "output",
            AgentEvent::ChatOutput(_) => "chat_output",
            AgentEvent::ToolCall(_) => "tool_call",
            AgentEvent::ToolResult(_) => "tool_result",
            AgentEvent::CompletionStart(_) => "completion_start",
            AgentEvent::CompletionEnd(_) => "completion_end",
            AgentEvent::TurnEnd(_) => "turn_end",
            AgentEvent::SetState(_) => "set_state",
            AgentEvent::AddChild(_) => "add_child",
            AgentEvent::WaitForInput(_) => "wait_for_input",
            AgentEvent::ResumeWithInput(_) => "resume_with_input",
        }
    }

    pub fn origin(&self) -> &EventOrigin {
        match self {
            AgentEvent::Prompt(e) => &e.origin,
            AgentEvent::PromptStarted(e) => &e.origin,
            AgentEvent::ResetHistory(e) => &e.origin,
            AgentEvent::Output(e) => &e.origin,
            AgentEvent::ChatOutput(e) => &e.origin,
            AgentEvent::ToolCall(e) => &e.origin,
            AgentEvent::ToolResult(e) => &e.origin,
            AgentEvent::CompletionStart(e) => &e.origin,
            AgentEvent::CompletionEnd(e) => &e.origin,
            AgentEvent::TurnEnd(e) => &e.origin,
            AgentEvent::SetState(e) => &e.origin,
            AgentEvent::AddChild(e) => &e.origin,
            AgentEvent::WaitForInput(e) => &e.origin,
            AgentEvent::ResumeWithInput(e) => &e.origin,
        }
    }

    pub fn agent(&self) -> &str {
        &self.origin().agent
    }

    pub fn depth(&self) -> u32 {
        self.origin().depth
    }

    /// True only for user-visible output events.
    pub fn is_output(&self) -> bool {
        matches!(self, AgentEvent::Output(_) | AgentEvent::ChatOutput(_))
    }

    /// Short payload rendering used by the generic display and debug forms.
    fn payload_summary(&self) -> String {
        match self {
            AgentEvent::Prompt(e) => e.message.clone(),
            AgentEvent::PromptStarted(e) => e.message.clone(),
            AgentEvent::ResetHistory(_) | AgentEvent::CompletionStart(_) => String::new(),
            AgentEvent::Output(e) => e.message.clone(),
            AgentEvent::ChatOutput(e) => chat_content(&e.payload).to_string(),
            AgentEvent::ToolCall(e) => format!("{}({})", e.tool_name, e.args),
            AgentEvent::ToolResult(e) => format!("{}: {}", e.tool_name, e.result),
            AgentEvent::CompletionEnd(e) => e
                .message
                .content
                .as_text()
                .unwrap_or_default()
                .to_string(),
            AgentEvent::TurnEnd(e) => e.result().unwrap_or_default().to_string(),
            AgentEvent::SetState(e) => e.state.to_string(),
            AgentEvent::AddChild(e) => e.child.clone(),
            AgentEvent::WaitForInput(e) => format!("{:?}", e.request_keys),
            AgentEvent::ResumeWithInput(e) => format!("{:?}", e.values),
        }
    }

    /// One-line debug rendering: `TYPE: payload`, indented two dots per depth
    /// level when `indent` is set.
    pub fn debug_line(&self, indent: bool) -> String {
        let prefix = if indent {
            "..".repeat(self.depth() as usize + 1)
        } else {
            String::new()
        };
        format!(
            "{}{}: {}",
            prefix,
            self.event_type_name().to_uppercase(),
            self.payload_summary()
        )
    }
}

fn chat_content(payload: &serde_json::Value) -> &str {
    payload
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
}

impl fmt::Display for AgentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentEvent::Output(e) => write!(f, "{}", e.message),
            AgentEvent::ChatOutput(e) => write!(f, "{}", chat_content(&e.payload)),
            AgentEvent::ToolCall(e) => {
                let dashes = "--".repeat(e.origin.depth as usize + 1);
                writeln!(f, "{}> {}({})", dashes, e.tool_name, e.args)
            }
            AgentEvent::ToolResult(e) => {
                let dashes = "--".repeat(e.origin.depth as usize + 1);
                writeln!(f, "<{}{}: {}", dashes, e.tool_name, e.result)
            }
            _ => writeln!(
                f,
                "[{}: {}] {}",
                self.agent(),
                self.event_type_name(),
                self.payload_summary()
            ),
        }
    }
}

/// Sink for agent events. Implementations decide where events go (console,
/// websocket, message queue, ...).
#[async_trait::async_trait]
pub trait EventBroadcaster: Send + Sync {
    fn id(&self) -> &str;

    async fn broadcast(&self, event: &AgentEvent) -> anyhow::Result<()>;

    /// Filter hook; broadcasters that only care about a subset of events
    /// override this.
    fn should_broadcast(&self, _event: &AgentEvent) -> bool {
        true
    }
}

/// Fans events out to every registered broadcaster on detached tasks so a
/// slow sink cannot stall the agent loop.
pub struct EventDispatcher {
    broadcasters: Vec<Arc<dyn EventBroadcaster>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            broadcasters: Vec::new(),
        }
    }

    pub fn add_broadcaster(&mut self, broadcaster: Arc<dyn EventBroadcaster>) {
        self.broadcasters.push(broadcaster);
    }

    pub fn is_empty(&self) -> bool {
        self.broadcasters.is_empty()
    }

    pub async fn dispatch(&self, event: AgentEvent) {
        for broadcaster in self.broadcasters.clone() {
            let event_clone = event.clone();
            tokio::spawn(async move {
                if broadcaster.should_broadcast(&event_clone) {
                    if let Err(e) = broadcaster.broadcast(&event_clone).await {
                        tracing::warn!(
                            broadcaster_id = broadcaster.id(),
                            event_type = event_clone.event_type_name(),
                            error = %e,
                            "Failed to broadcast event"
                        );
                    }
                }
            });
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints output events to stdout; in debug mode it prints the indented debug
/// line for every event instead. A prompt arriving with its `debug` flag set
/// switches the console into debug mode for the rest of the run.
pub struct ConsoleBroadcaster {
    id: String,
    debug: std::sync::atomic::AtomicBool,
}

impl ConsoleBroadcaster {
    pub fn new() -> Self {
        Self {
            id: "console".to_string(),
            debug: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn debug() -> Self {
        Self {
            id: "console".to_string(),
            debug: std::sync::atomic::AtomicBool::new(true),
        }
    }

    fn debug_mode(&self) -> bool {
        self.debug.load(std::sync::atomic::Ordering::Relaxed)
    }
}

impl Default for ConsoleBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EventBroadcaster for ConsoleBroadcaster {
    fn id(&self) -> &str {
        &self.id
    }

    async fn broadcast(&self, event: &AgentEvent) -> anyhow::Result<()> {
        if let AgentEvent::Prompt(prompt) = event {
            if prompt.debug {
                self.debug.store(true, std::sync::atomic::Ordering::Relaxed);
            }
        }
        if self.debug_mode() {
            println!("{}", event.debug_line(true));
        } else {
            print!("{event}");
        }
        Ok(())
    }

    fn should_broadcast(&self, event: &AgentEvent) -> bool {
        if let AgentEvent::Prompt(prompt) = event {
            return prompt.debug || self.debug_mode();
        }
        self.debug_mode() || event.is_output()
    }
}
