use std::sync::Arc;

use agentic_core::agent::{ToolBox, ToolRegistry};
use agentic_core::events::{EventBroadcaster, EventDispatcher};
use agentic_core::llm::LanguageModel;
use agentic_core::persistence::{Checkpointer, ThreadId};

use crate::runner::AgentRunner;

const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// Builder for [`AgentRunner`]. Only the model is mandatory.
pub struct AgentBuilder {
    name: String,
    instructions: String,
    model: Option<Arc<dyn LanguageModel>>,
    tools: ToolRegistry,
    dispatcher: EventDispatcher,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    thread_id: Option<ThreadId>,
    max_tool_rounds: usize,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: String::new(),
            model: None,
            tools: ToolRegistry::new(),
            dispatcher: EventDispatcher::new(),
            checkpointer: None,
            thread_id: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_tool(mut self, tool: ToolBox) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn with_tools<I>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = ToolBox>,
    {
        for tool in tools {
            self.tools.register(tool);
        }
        self
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn EventBroadcaster>) -> Self {
        self.dispatcher.add_broadcaster(broadcaster);
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<ThreadId>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn build(self) -> anyhow::Result<AgentRunner> {
        let model = self
            .model
            .ok_or_else(|| anyhow::anyhow!("agent '{}' has no language model", self.name))?;
        let thread_id = self
            .thread_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Ok(AgentRunner::new(
            self.name,
            self.instructions,
            model,
            self.tools,
            Arc::new(self.dispatcher),
            self.checkpointer,
            thread_id,
            self.max_tool_rounds,
        ))
    }
}
