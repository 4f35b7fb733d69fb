use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::events::CompletionUsage;
use crate::messaging::AgentMessage;

/// Request passed to a language model: the agent's system prompt, the
/// conversation so far, and the names of the tools the model may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub messages: Vec<AgentMessage>,
    #[serde(default)]
    pub tools: Vec<String>,
}

/// A tool call the model asked for as part of a completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub tool_name: String,
    pub args: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub message: AgentMessage,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
    #[serde(default)]
    pub usage: CompletionUsage,
}

/// Abstraction over the LLM completion SDK. The SDK itself stays an external
/// collaborator; runners only ever see this trait.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> anyhow::Result<Completion>;
}
