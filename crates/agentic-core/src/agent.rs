use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::RunContext;
use crate::control::ToolControl;
use crate::events::AgentEvent;
use crate::messaging::{AgentMessage, ToolInvocation};

/// Describes a tool that can be invoked by an agent at runtime.
#[async_trait]
pub trait ToolHandle: Send + Sync {
    /// Returns the unique, stable name for this tool.
    fn name(&self) -> &str;

    /// One-line description shown to the model alongside the tool name.
    fn description(&self) -> &str {
        ""
    }

    /// Executes the tool given the invocation payload and run context.
    async fn invoke(
        &self,
        invocation: ToolInvocation,
        ctx: RunContext,
    ) -> anyhow::Result<ToolResponse>;
}

/// What a tool hands back to the runner.
#[derive(Debug, Clone)]
pub enum ToolResponse {
    /// Plain tool result message.
    Message(AgentMessage),
    /// Result message plus follow-up events the runner should dispatch, e.g.
    /// a completion-end accounting for LLM spend inside the tool.
    MessageWithEvents {
        message: AgentMessage,
        events: Vec<AgentEvent>,
    },
    /// Control-flow signal instead of a result.
    Control(ToolControl),
}

impl ToolResponse {
    pub fn text(content: impl Into<String>, tool_call_id: Option<String>) -> Self {
        ToolResponse::Message(AgentMessage::tool(content, tool_call_id))
    }
}

pub type ToolBox = Arc<dyn ToolHandle>;

/// Registry of the tools available to one agent, keyed by tool name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolBox>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: ToolBox) -> &mut Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolBox> {
        self.tools.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl ToolHandle for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        async fn invoke(
            &self,
            invocation: ToolInvocation,
            _ctx: RunContext,
        ) -> anyhow::Result<ToolResponse> {
            Ok(ToolResponse::text(
                invocation.args.to_string(),
                invocation.tool_call_id,
            ))
        }
    }

    #[tokio::test]
    async fn registry_lookup_and_invoke() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert!(registry.has("echo"));
        assert_eq!(registry.len(), 1);

        let tool = registry.get("echo").unwrap().clone();
        let response = tool
            .invoke(
                ToolInvocation {
                    tool_name: "echo".to_string(),
                    args: json!({"hello": "world"}),
                    tool_call_id: Some("call-1".to_string()),
                },
                RunContext::new("tester", "thread-1", 0),
            )
            .await
            .unwrap();

        match response {
            ToolResponse::Message(message) => {
                assert_eq!(
                    message.content.as_text().unwrap(),
                    "{\"hello\":\"world\"}"
                );
                assert_eq!(
                    message.metadata.unwrap().tool_call_id.as_deref(),
                    Some("call-1")
                );
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
