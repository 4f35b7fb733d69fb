//! Agent turn loop.
//!
//! A turn starts with a prompt and alternates LLM completions with tool
//! execution until the model answers without tool calls, a tool finishes the
//! agent, or a tool pauses the turn to wait for external input. Every step is
//! surfaced through the event protocol in `agentic_core::events`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use agentic_core::agent::{ToolRegistry, ToolResponse};
use agentic_core::context::RunContext;
use agentic_core::control::ToolControl;
use agentic_core::events::{
    AddChildEvent, AgentEvent, CompletionEndEvent, CompletionStartEvent, EventDispatcher,
    EventOrigin, OutputEvent, PromptEvent, PromptStartedEvent, ResetHistoryEvent,
    ResumeWithInputEvent, SetStateEvent, ToolCallEvent, ToolResultEvent, TurnEndEvent,
    WaitForInputEvent,
};
use agentic_core::llm::{CompletionRequest, LanguageModel, ToolCallRequest};
use agentic_core::messaging::{AgentMessage, ToolInvocation};
use agentic_core::persistence::{Checkpointer, PendingChild, RunState, ThreadId};

/// How a turn ended from the caller's point of view.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    Completed {
        result: String,
        messages: Vec<AgentMessage>,
    },
    /// The agent is parked until `resume` is called with the requested values.
    AwaitingInput {
        request_keys: BTreeMap<String, String>,
    },
}

impl TurnOutcome {
    pub fn result(&self) -> Option<&str> {
        match self {
            TurnOutcome::Completed { result, .. } => Some(result.as_str()),
            TurnOutcome::AwaitingInput { .. } => None,
        }
    }
}

struct ChildAgent {
    runner: Arc<AgentRunner>,
    handoff: bool,
}

/// Drives one agent: its model, tools, sub-agents, and event fan-out.
pub struct AgentRunner {
    name: String,
    instructions: String,
    model: Arc<dyn LanguageModel>,
    tools: ToolRegistry,
    dispatcher: Arc<EventDispatcher>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    thread_id: ThreadId,
    max_tool_rounds: usize,
    history: RwLock<Vec<AgentMessage>>,
    context_variables: RwLock<BTreeMap<String, serde_json::Value>>,
    pending_wait: RwLock<Option<BTreeMap<String, String>>>,
    pending_child: RwLock<Option<PendingChild>>,
    pending_depth: RwLock<u32>,
    children: RwLock<HashMap<String, ChildAgent>>,
}

impl AgentRunner {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        instructions: String,
        model: Arc<dyn LanguageModel>,
        tools: ToolRegistry,
        dispatcher: Arc<EventDispatcher>,
        checkpointer: Option<Arc<dyn Checkpointer>>,
        thread_id: ThreadId,
        max_tool_rounds: usize,
    ) -> Self {
        Self {
            name,
            instructions,
            model,
            tools,
            dispatcher,
            checkpointer,
            thread_id,
            max_tool_rounds,
            history: RwLock::new(Vec::new()),
            context_variables: RwLock::new(BTreeMap::new()),
            pending_wait: RwLock::new(None),
            pending_child: RwLock::new(None),
            pending_depth: RwLock::new(0),
            children: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    /// Register a sub-agent. With `handoff` set, the child's final output
    /// becomes the parent turn's result instead of folding back in as a tool
    /// result.
    pub async fn add_child(&self, runner: Arc<AgentRunner>, handoff: bool) {
        let child_name = runner.name.clone();
        self.children.write().expect("children lock poisoned").insert(
            child_name.clone(),
            ChildAgent { runner, handoff },
        );
        self.dispatcher
            .dispatch(AgentEvent::AddChild(AddChildEvent {
                origin: EventOrigin::top_level(&self.name),
                child: child_name,
                handoff,
            }))
            .await;
    }

    /// Run one turn from plain prompt text.
    pub async fn prompt(&self, text: impl Into<String>) -> anyhow::Result<TurnOutcome> {
        let event = PromptEvent {
            origin: EventOrigin::top_level(&self.name),
            message: text.into(),
            debug: false,
            originator: None,
            ignore_result: false,
        };
        self.handle_prompt(event).await
    }

    /// Run one turn from a full prompt event (debug/originator/ignore_result
    /// honored).
    pub async fn handle_prompt(&self, prompt: PromptEvent) -> anyhow::Result<TurnOutcome> {
        let depth = prompt.origin.depth;
        self.dispatcher
            .dispatch(AgentEvent::Prompt(prompt.clone()))
            .await;
        self.dispatcher
            .dispatch(AgentEvent::PromptStarted(PromptStartedEvent {
                origin: EventOrigin::new(&self.name, depth),
                message: prompt.message.clone(),
            }))
            .await;
        self.append_history(AgentMessage::user(prompt.message));
        self.run_loop(depth, prompt.ignore_result).await
    }

    /// Resume a paused turn with the values that were requested via
    /// `WaitForInput`. When the pause came from a delegated sub-agent the
    /// values are routed into the child and its answer folds back in as the
    /// original tool result.
    pub async fn resume(
        &self,
        values: BTreeMap<String, serde_json::Value>,
    ) -> anyhow::Result<TurnOutcome> {
        let pending = self
            .pending_wait
            .write()
            .expect("pending lock poisoned")
            .take();
        if pending.is_none() {
            anyhow::bail!("no pending input request to resume");
        }
        let depth = *self.pending_depth.read().expect("pending lock poisoned");

        self.dispatcher
            .dispatch(AgentEvent::ResumeWithInput(ResumeWithInputEvent {
                origin: EventOrigin::new(&self.name, depth),
                values: values.clone(),
            }))
            .await;

        let pending_child = self
            .pending_child
            .write()
            .expect("pending lock poisoned")
            .take();
        if let Some(pending_child) = pending_child {
            return self.resume_child(pending_child, values, depth).await;
        }

        self.context_variables
            .write()
            .expect("context lock poisoned")
            .extend(values.clone());

        // Feed the supplied values back into the conversation so the model
        // can pick the turn up where it paused.
        let rendered = serde_json::to_string(&values).unwrap_or_default();
        self.append_history(AgentMessage::user(format!(
            "Requested input provided: {rendered}"
        )));
        self.run_loop(depth, false).await
    }

    async fn resume_child(
        &self,
        pending: PendingChild,
        values: BTreeMap<String, serde_json::Value>,
        depth: u32,
    ) -> anyhow::Result<TurnOutcome> {
        let child = {
            let children = self.children.read().expect("children lock poisoned");
            children.get(&pending.agent).map(|c| c.runner.clone())
        };
        let runner = child.ok_or_else(|| {
            anyhow::anyhow!("no child agent named '{}' registered", pending.agent)
        })?;

        let outcome = Box::pin(runner.resume(values)).await?;
        match outcome {
            TurnOutcome::AwaitingInput { request_keys } => {
                // The child needs more input; stay parked on it.
                *self.pending_child.write().expect("pending lock poisoned") = Some(pending);
                *self.pending_wait.write().expect("pending lock poisoned") =
                    Some(request_keys.clone());
                self.dispatcher
                    .dispatch(AgentEvent::WaitForInput(WaitForInputEvent {
                        origin: EventOrigin::new(&self.name, depth),
                        request_keys: request_keys.clone(),
                    }))
                    .await;
                self.checkpoint().await;
                Ok(TurnOutcome::AwaitingInput { request_keys })
            }
            TurnOutcome::Completed { result, .. } => {
                let call = ToolCallRequest {
                    tool_name: pending.tool_name,
                    args: serde_json::Value::Null,
                    tool_call_id: pending.tool_call_id,
                };
                let message = AgentMessage::tool(result.clone(), call.tool_call_id.clone());
                self.record_tool_result(&call, &message, depth).await;
                if pending.handoff {
                    self.append_history(AgentMessage::assistant(result));
                    return Ok(self.finish_turn(depth, false).await);
                }
                self.run_loop(depth, false).await
            }
        }
    }

    /// Clear the stored conversation history.
    pub async fn reset_history(&self) {
        self.history.write().expect("history lock poisoned").clear();
        self.dispatcher
            .dispatch(AgentEvent::ResetHistory(ResetHistoryEvent {
                origin: EventOrigin::top_level(&self.name),
            }))
            .await;
    }

    /// Merge a JSON object into the turn's context variables and surface the
    /// directive as a `SetState` event.
    pub async fn set_state(&self, state: serde_json::Value) {
        if let Some(object) = state.as_object() {
            let mut vars = self
                .context_variables
                .write()
                .expect("context lock poisoned");
            for (key, value) in object {
                vars.insert(key.clone(), value.clone());
            }
        }
        self.dispatcher
            .dispatch(AgentEvent::SetState(SetStateEvent {
                origin: EventOrigin::top_level(&self.name),
                state,
            }))
            .await;
    }

    /// Restore history and context variables previously checkpointed for this
    /// runner's thread. Returns false when nothing was saved.
    pub async fn load_thread(&self) -> anyhow::Result<bool> {
        let Some(checkpointer) = &self.checkpointer else {
            tracing::warn!("Attempted to load thread state but no checkpointer is configured");
            return Ok(false);
        };
        match checkpointer.load_state(&self.thread_id).await? {
            Some(state) => {
                *self.history.write().expect("history lock poisoned") = state.history;
                *self
                    .context_variables
                    .write()
                    .expect("context lock poisoned") = state.context_variables;
                *self.pending_wait.write().expect("pending lock poisoned") = state.pending_wait;
                *self.pending_child.write().expect("pending lock poisoned") = state.pending_child;
                *self.pending_depth.write().expect("pending lock poisoned") = state.pending_depth;
                tracing::info!(thread_id = %self.thread_id, "Restored run state");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn append_history(&self, message: AgentMessage) {
        self.history
            .write()
            .expect("history lock poisoned")
            .push(message);
    }

    fn current_history(&self) -> Vec<AgentMessage> {
        self.history.read().expect("history lock poisoned").clone()
    }

    fn current_context(&self) -> BTreeMap<String, serde_json::Value> {
        self.context_variables
            .read()
            .expect("context lock poisoned")
            .clone()
    }

    fn run_context(&self, depth: u32) -> RunContext {
        let mut ctx = RunContext::new(&self.name, &self.thread_id, depth);
        ctx.context_variables = self.current_context();
        ctx
    }

    async fn checkpoint(&self) {
        let Some(checkpointer) = &self.checkpointer else {
            return;
        };
        let state = RunState {
            history: self.current_history(),
            context_variables: self.current_context(),
            pending_wait: self
                .pending_wait
                .read()
                .expect("pending lock poisoned")
                .clone(),
            pending_child: self
                .pending_child
                .read()
                .expect("pending lock poisoned")
                .clone(),
            pending_depth: *self.pending_depth.read().expect("pending lock poisoned"),
        };
        if let Err(e) = checkpointer.save_state(&self.thread_id, &state).await {
            tracing::warn!(thread_id = %self.thread_id, error = %e, "Failed to checkpoint run state");
        }
    }

    async fn finish_turn(&self, depth: u32, ignore_result: bool) -> TurnOutcome {
        let messages = self.current_history();
        let result = messages
            .last()
            .and_then(|m| m.content.as_text())
            .unwrap_or_default()
            .to_string();
        if !ignore_result && !result.is_empty() {
            self.dispatcher
                .dispatch(AgentEvent::Output(OutputEvent {
                    origin: EventOrigin::new(&self.name, depth),
                    message: result.clone(),
                }))
                .await;
        }
        self.dispatcher
            .dispatch(AgentEvent::TurnEnd(TurnEndEvent {
                origin: EventOrigin::new(&self.name, depth),
                messages: messages.clone(),
                context_variables: self.current_context(),
            }))
            .await;
        self.checkpoint().await;
        TurnOutcome::Completed { result, messages }
    }

    async fn run_loop(&self, depth: u32, ignore_result: bool) -> anyhow::Result<TurnOutcome> {
        for _round in 0..self.max_tool_rounds {
            self.dispatcher
                .dispatch(AgentEvent::CompletionStart(CompletionStartEvent {
                    origin: EventOrigin::new(&self.name, depth),
                }))
                .await;

            let request = CompletionRequest {
                system_prompt: self.instructions.clone(),
                messages: self.current_history(),
                tools: self.available_tool_names(),
            };
            let started = Instant::now();
            let mut completion = self.model.complete(request).await?;
            if completion.usage.elapsed_seconds == 0.0 {
                completion.usage.elapsed_seconds = started.elapsed().as_secs_f64();
            }

            self.dispatcher
                .dispatch(AgentEvent::CompletionEnd(CompletionEndEvent {
                    origin: EventOrigin::new(&self.name, depth),
                    message: completion.message.clone(),
                    usage: completion.usage.clone(),
                }))
                .await;
            self.append_history(completion.message.clone());

            if completion.tool_calls.is_empty() {
                return Ok(self.finish_turn(depth, ignore_result).await);
            }

            for call in completion.tool_calls {
                match self.run_tool_call(call, depth).await? {
                    StepControl::Continue => {}
                    StepControl::FinishTurn => {
                        return Ok(self.finish_turn(depth, ignore_result).await)
                    }
                    StepControl::Await(request_keys) => {
                        *self.pending_wait.write().expect("pending lock poisoned") =
                            Some(request_keys.clone());
                        *self.pending_depth.write().expect("pending lock poisoned") = depth;
                        self.dispatcher
                            .dispatch(AgentEvent::WaitForInput(WaitForInputEvent {
                                origin: EventOrigin::new(&self.name, depth),
                                request_keys: request_keys.clone(),
                            }))
                            .await;
                        self.checkpoint().await;
                        return Ok(TurnOutcome::AwaitingInput { request_keys });
                    }
                }
            }
        }
        anyhow::bail!(
            "agent '{}' exceeded {} tool rounds without a final answer",
            self.name,
            self.max_tool_rounds
        )
    }

    fn available_tool_names(&self) -> Vec<String> {
        let mut names = self.tools.names();
        names.extend(
            self.children
                .read()
                .expect("children lock poisoned")
                .keys()
                .cloned(),
        );
        names
    }

    async fn run_tool_call(
        &self,
        call: ToolCallRequest,
        depth: u32,
    ) -> anyhow::Result<StepControl> {
        self.dispatcher
            .dispatch(AgentEvent::ToolCall(ToolCallEvent {
                origin: EventOrigin::new(&self.name, depth),
                tool_name: call.tool_name.clone(),
                args: call.args.clone(),
            }))
            .await;

        // Sub-agents registered under this runner are callable by name, the
        // same way plain tools are.
        let child = {
            let children = self.children.read().expect("children lock poisoned");
            children
                .get(&call.tool_name)
                .map(|c| (c.runner.clone(), c.handoff))
        };
        if let Some((runner, handoff)) = child {
            let message = call
                .args
                .get("message")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| call.args.to_string());
            return self
                .delegate_to_child(runner, handoff, message, &call, depth)
                .await;
        }

        let Some(tool) = self.tools.get(&call.tool_name).cloned() else {
            tracing::warn!(agent = %self.name, tool = %call.tool_name, "Unknown tool requested");
            let message = AgentMessage::tool(
                format!("Tool '{}' is not available.", call.tool_name),
                call.tool_call_id.clone(),
            );
            self.record_tool_result(&call, &message, depth).await;
            return Ok(StepControl::Continue);
        };

        let invocation = ToolInvocation {
            tool_name: call.tool_name.clone(),
            args: call.args.clone(),
            tool_call_id: call.tool_call_id.clone(),
        };
        let response = tool.invoke(invocation, self.run_context(depth)).await?;

        match response {
            ToolResponse::Message(message) => {
                self.record_tool_result(&call, &message, depth).await;
                Ok(StepControl::Continue)
            }
            ToolResponse::MessageWithEvents { message, events } => {
                self.record_tool_result(&call, &message, depth).await;
                for event in events {
                    self.dispatcher.dispatch(event).await;
                }
                Ok(StepControl::Continue)
            }
            ToolResponse::Control(ToolControl::PauseForInput { request_keys }) => {
                Ok(StepControl::Await(request_keys))
            }
            ToolResponse::Control(ToolControl::FinishAgent) => Ok(StepControl::FinishTurn),
            ToolResponse::Control(ToolControl::PauseForChild { values }) => {
                let agent = values
                    .get("agent")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        anyhow::anyhow!("pause-for-child result is missing the 'agent' value")
                    })?;
                let message = values
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let child = {
                    let children = self.children.read().expect("children lock poisoned");
                    children
                        .get(&agent)
                        .map(|c| (c.runner.clone(), c.handoff))
                };
                let (runner, handoff) = child.ok_or_else(|| {
                    anyhow::anyhow!("no child agent named '{agent}' registered")
                })?;
                self.delegate_to_child(runner, handoff, message, &call, depth)
                    .await
            }
        }
    }

    async fn delegate_to_child(
        &self,
        runner: Arc<AgentRunner>,
        handoff: bool,
        message: String,
        call: &ToolCallRequest,
        depth: u32,
    ) -> anyhow::Result<StepControl> {
        let prompt = PromptEvent {
            origin: EventOrigin::new(runner.name.clone(), depth + 1),
            message,
            debug: false,
            originator: Some(self.name.clone()),
            ignore_result: !handoff,
        };
        let outcome = Box::pin(runner.handle_prompt(prompt)).await?;
        match outcome {
            TurnOutcome::AwaitingInput { request_keys } => {
                // The child paused mid-delegation; park it so resume() can
                // route the values back in and finish the tool call later.
                *self.pending_child.write().expect("pending lock poisoned") =
                    Some(PendingChild {
                        agent: runner.name.clone(),
                        handoff,
                        tool_name: call.tool_name.clone(),
                        tool_call_id: call.tool_call_id.clone(),
                    });
                Ok(StepControl::Await(request_keys))
            }
            TurnOutcome::Completed { result, .. } => {
                let message = AgentMessage::tool(result.clone(), call.tool_call_id.clone());
                self.record_tool_result(call, &message, depth).await;

                if handoff {
                    // The child's answer becomes this turn's final output.
                    self.append_history(AgentMessage::assistant(result));
                    return Ok(StepControl::FinishTurn);
                }
                Ok(StepControl::Continue)
            }
        }
    }

    async fn record_tool_result(&self, call: &ToolCallRequest, message: &AgentMessage, depth: u32) {
        self.append_history(message.clone());
        let result = match &message.content {
            agentic_core::messaging::MessageContent::Text(text) => {
                serde_json::Value::String(text.clone())
            }
            agentic_core::messaging::MessageContent::Json(value) => value.clone(),
        };
        self.dispatcher
            .dispatch(AgentEvent::ToolResult(ToolResultEvent {
                origin: EventOrigin::new(&self.name, depth),
                tool_name: call.tool_name.clone(),
                result,
            }))
            .await;
    }
}

enum StepControl {
    Continue,
    FinishTurn,
    Await(BTreeMap<String, String>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::AgentBuilder;
    use agentic_core::agent::{ToolHandle, ToolResponse};
    use agentic_core::events::EventBroadcaster;
    use agentic_core::llm::Completion;
    use agentic_core::CompletionUsage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedModel {
        completions: Mutex<VecDeque<Completion>>,
    }

    impl ScriptedModel {
        fn new(completions: Vec<Completion>) -> Arc<Self> {
            Arc::new(Self {
                completions: Mutex::new(completions.into()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, _request: CompletionRequest) -> anyhow::Result<Completion> {
            self.completions
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("scripted model ran out of completions"))
        }
    }

    fn answer(text: &str) -> Completion {
        Completion {
            message: AgentMessage::assistant(text),
            tool_calls: Vec::new(),
            usage: CompletionUsage::for_model("scripted").with_tokens(10, 5),
        }
    }

    fn tool_call(tool_name: &str, args: serde_json::Value) -> Completion {
        Completion {
            message: AgentMessage::assistant(format!("calling {tool_name}")),
            tool_calls: vec![ToolCallRequest {
                tool_name: tool_name.to_string(),
                args,
                tool_call_id: Some("call-1".to_string()),
            }],
            usage: CompletionUsage::for_model("scripted"),
        }
    }

    struct Recorder {
        events: Mutex<Vec<AgentEvent>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
            })
        }

        fn type_names(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.event_type_name().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl EventBroadcaster for Recorder {
        fn id(&self) -> &str {
            "recorder"
        }

        async fn broadcast(&self, event: &AgentEvent) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    async fn settle() {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    struct PauseTool;

    #[async_trait]
    impl ToolHandle for PauseTool {
        fn name(&self) -> &str {
            "get_human_input"
        }

        async fn invoke(
            &self,
            _invocation: ToolInvocation,
            ctx: RunContext,
        ) -> anyhow::Result<ToolResponse> {
            if let Some(topic) = ctx.get_str("topic") {
                return Ok(ToolResponse::text(topic.to_string(), None));
            }
            Ok(ToolResponse::Control(ToolControl::pause_for_input([(
                "topic",
                "What is the news topic?",
            )])))
        }
    }

    struct FinishTool;

    #[async_trait]
    impl ToolHandle for FinishTool {
        fn name(&self) -> &str {
            "finish"
        }

        async fn invoke(
            &self,
            _invocation: ToolInvocation,
            _ctx: RunContext,
        ) -> anyhow::Result<ToolResponse> {
            Ok(ToolResponse::Control(ToolControl::FinishAgent))
        }
    }

    struct UppercaseTool;

    #[async_trait]
    impl ToolHandle for UppercaseTool {
        fn name(&self) -> &str {
            "uppercase"
        }

        async fn invoke(
            &self,
            invocation: ToolInvocation,
            _ctx: RunContext,
        ) -> anyhow::Result<ToolResponse> {
            let text = invocation
                .args
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Ok(ToolResponse::text(
                text.to_uppercase(),
                invocation.tool_call_id,
            ))
        }
    }

    #[tokio::test]
    async fn plain_turn_emits_protocol_sequence() {
        let recorder = Recorder::new();
        let runner = AgentBuilder::new("producer")
            .with_instructions("answer briefly")
            .with_model(ScriptedModel::new(vec![answer("all quiet today")]))
            .with_broadcaster(recorder.clone())
            .build()
            .unwrap();

        let outcome = runner.prompt("any news?").await.unwrap();
        settle().await;

        assert_eq!(outcome.result(), Some("all quiet today"));
        assert_eq!(
            recorder.type_names(),
            [
                "prompt",
                "prompt_started",
                "completion_start",
                "completion_end",
                "output",
                "turn_end"
            ]
        );
    }

    #[tokio::test]
    async fn tool_round_trip_feeds_result_back() {
        let recorder = Recorder::new();
        let runner = AgentBuilder::new("producer")
            .with_model(ScriptedModel::new(vec![
                tool_call("uppercase", json!({"text": "rust"})),
                answer("RUST it is"),
            ]))
            .with_tool(Arc::new(UppercaseTool))
            .with_broadcaster(recorder.clone())
            .build()
            .unwrap();

        let outcome = runner.prompt("shout the topic").await.unwrap();
        settle().await;

        assert_eq!(outcome.result(), Some("RUST it is"));
        let names = recorder.type_names();
        assert!(names.contains(&"tool_call".to_string()));
        assert!(names.contains(&"tool_result".to_string()));

        let events = recorder.events.lock().unwrap();
        let tool_result = events
            .iter()
            .find_map(|e| match e {
                AgentEvent::ToolResult(e) => Some(e.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(tool_result.tool_name, "uppercase");
        assert_eq!(tool_result.result, json!("RUST"));
    }

    #[tokio::test]
    async fn pause_then_resume_completes_the_turn() {
        let recorder = Recorder::new();
        let runner = AgentBuilder::new("producer")
            .with_model(ScriptedModel::new(vec![
                tool_call("get_human_input", json!({})),
                tool_call("get_human_input", json!({})),
                answer("covering rust today"),
            ]))
            .with_tool(Arc::new(PauseTool))
            .with_broadcaster(recorder.clone())
            .build()
            .unwrap();

        let outcome = runner.prompt("get the topic").await.unwrap();
        match &outcome {
            TurnOutcome::AwaitingInput { request_keys } => {
                assert_eq!(
                    request_keys.get("topic").map(String::as_str),
                    Some("What is the news topic?")
                );
            }
            other => panic!("expected awaiting input, got {other:?}"),
        }

        let outcome = runner
            .resume(BTreeMap::from([("topic".to_string(), json!("rust"))]))
            .await
            .unwrap();
        settle().await;

        assert_eq!(outcome.result(), Some("covering rust today"));
        let names = recorder.type_names();
        assert!(names.contains(&"wait_for_input".to_string()));
        assert!(names.contains(&"resume_with_input".to_string()));
    }

    #[tokio::test]
    async fn resume_without_pending_request_fails() {
        let runner = AgentBuilder::new("producer")
            .with_model(ScriptedModel::new(vec![]))
            .build()
            .unwrap();
        let err = runner.resume(BTreeMap::new()).await.unwrap_err();
        assert!(err.to_string().contains("no pending input request"));
    }

    #[tokio::test]
    async fn finish_agent_tool_aborts_the_turn() {
        let runner = AgentBuilder::new("producer")
            .with_model(ScriptedModel::new(vec![tool_call("finish", json!({}))]))
            .with_tool(Arc::new(FinishTool))
            .build()
            .unwrap();

        let outcome = runner.prompt("stop now").await.unwrap();
        // No further completion happened; scripted model would have errored.
        assert!(matches!(outcome, TurnOutcome::Completed { .. }));
    }

    #[tokio::test]
    async fn handoff_child_result_becomes_turn_result() {
        let recorder = Recorder::new();
        let reporter = Arc::new(
            AgentBuilder::new("reporter")
                .with_model(ScriptedModel::new(vec![answer("3 rust headlines")]))
                .build()
                .unwrap(),
        );
        let producer = AgentBuilder::new("producer")
            .with_model(ScriptedModel::new(vec![tool_call(
                "reporter",
                json!({"message": "rust"}),
            )]))
            .with_broadcaster(recorder.clone())
            .build()
            .unwrap();
        producer.add_child(reporter, true).await;

        let outcome = producer.prompt("get the news on rust").await.unwrap();
        settle().await;

        assert_eq!(outcome.result(), Some("3 rust headlines"));
        let events = recorder.events.lock().unwrap();
        let add_child = events
            .iter()
            .find_map(|e| match e {
                AgentEvent::AddChild(e) => Some(e.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(add_child.child, "reporter");
        assert!(add_child.handoff);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_not_fatal() {
        let runner = AgentBuilder::new("producer")
            .with_model(ScriptedModel::new(vec![
                tool_call("no_such_tool", json!({})),
                answer("done anyway"),
            ]))
            .build()
            .unwrap();

        let outcome = runner.prompt("try it").await.unwrap();
        assert_eq!(outcome.result(), Some("done anyway"));
    }

    #[tokio::test]
    async fn runaway_tool_loop_is_cut_off() {
        let completions: Vec<Completion> = (0..4)
            .map(|_| tool_call("uppercase", json!({"text": "again"})))
            .collect();
        let runner = AgentBuilder::new("producer")
            .with_model(ScriptedModel::new(completions))
            .with_tool(Arc::new(UppercaseTool))
            .with_max_tool_rounds(3)
            .build()
            .unwrap();

        let err = runner.prompt("loop forever").await.unwrap_err();
        assert!(err.to_string().contains("exceeded 3 tool rounds"));
    }

    #[tokio::test]
    async fn checkpointer_captures_pause_state() {
        let checkpointer = Arc::new(agentic_core::persistence::InMemoryCheckpointer::new());
        let runner = AgentBuilder::new("producer")
            .with_model(ScriptedModel::new(vec![tool_call(
                "get_human_input",
                json!({}),
            )]))
            .with_tool(Arc::new(PauseTool))
            .with_thread_id("thread-ckpt")
            .with_checkpointer(checkpointer.clone())
            .build()
            .unwrap();

        runner.prompt("get the topic").await.unwrap();

        let saved = checkpointer
            .load_state(&"thread-ckpt".to_string())
            .await
            .unwrap()
            .unwrap();
        assert!(saved.pending_wait.is_some());
        assert!(!saved.history.is_empty());
    }

    #[tokio::test]
    async fn child_pause_bubbles_to_parent_and_resumes() {
        let recorder = Recorder::new();
        let reporter = Arc::new(
            AgentBuilder::new("reporter")
                .with_model(ScriptedModel::new(vec![
                    tool_call("get_human_input", json!({})),
                    tool_call("get_human_input", json!({})),
                    answer("topic covered"),
                ]))
                .with_tool(Arc::new(PauseTool))
                .build()
                .unwrap(),
        );
        let producer = AgentBuilder::new("producer")
            .with_model(ScriptedModel::new(vec![
                tool_call("reporter", json!({"message": "cover the topic"})),
                answer("done with the topic"),
            ]))
            .with_broadcaster(recorder.clone())
            .build()
            .unwrap();
        producer.add_child(reporter, false).await;

        // The child's pause surfaces as the parent's own wait, not as a
        // completed delegation with an empty tool result.
        let outcome = producer.prompt("get the news").await.unwrap();
        match &outcome {
            TurnOutcome::AwaitingInput { request_keys } => {
                assert_eq!(
                    request_keys.get("topic").map(String::as_str),
                    Some("What is the news topic?")
                );
            }
            other => panic!("expected awaiting input, got {other:?}"),
        }

        let outcome = producer
            .resume(BTreeMap::from([("topic".to_string(), json!("rust"))]))
            .await
            .unwrap();
        settle().await;

        assert_eq!(outcome.result(), Some("done with the topic"));
        let events = recorder.events.lock().unwrap();
        let tool_result = events
            .iter()
            .find_map(|e| match e {
                AgentEvent::ToolResult(e) if e.tool_name == "reporter" => Some(e.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(tool_result.result, json!("topic covered"));
    }

    #[tokio::test]
    async fn resume_keeps_the_paused_depth() {
        let recorder = Recorder::new();
        let runner = AgentBuilder::new("producer")
            .with_model(ScriptedModel::new(vec![
                tool_call("get_human_input", json!({})),
                tool_call("get_human_input", json!({})),
                answer("covering rust today"),
            ]))
            .with_tool(Arc::new(PauseTool))
            .with_broadcaster(recorder.clone())
            .build()
            .unwrap();

        let prompt = PromptEvent {
            origin: EventOrigin::new("producer", 1),
            message: "get the topic".to_string(),
            debug: false,
            originator: None,
            ignore_result: false,
        };
        let outcome = runner.handle_prompt(prompt).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::AwaitingInput { .. }));

        runner
            .resume(BTreeMap::from([("topic".to_string(), json!("rust"))]))
            .await
            .unwrap();
        settle().await;

        let events = recorder.events.lock().unwrap();
        let resume_depth = events
            .iter()
            .find_map(|e| match e {
                AgentEvent::ResumeWithInput(e) => Some(e.origin.depth),
                _ => None,
            })
            .unwrap();
        assert_eq!(resume_depth, 1);
        let turn_end_depth = events
            .iter()
            .find_map(|e| match e {
                AgentEvent::TurnEnd(e) => Some(e.origin.depth),
                _ => None,
            })
            .unwrap();
        assert_eq!(turn_end_depth, 1);
    }
}
