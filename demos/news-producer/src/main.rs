//! News Producer Demo
//!
//! A producer agent asks the human for a topic (pausing the turn until the
//! answer arrives), then delegates to a reporter sub-agent that pulls
//! headlines with a tool. Every step is rendered by the console broadcaster.
//!
//! The language model is scripted so the demo runs offline; swap in a real
//! `LanguageModel` implementation to drive it with an actual LLM.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use agentic::prelude::*;
use async_trait::async_trait;
use serde_json::json;

/// Deterministic stand-in for an LLM: plays back a fixed list of completions.
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
            .map_err(|_| anyhow::anyhow!("script lock poisoned"))?
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("scripted model ran out of completions"))
    }
}

/// Returns canned headlines for a topic.
struct QueryNewsTool;

#[async_trait]
impl ToolHandle for QueryNewsTool {
    fn name(&self) -> &str {
        "query_news"
    }

    fn description(&self) -> &str {
        "Fetch current headlines for a news topic"
    }

    async fn invoke(
        &self,
        invocation: ToolInvocation,
        _ctx: RunContext,
    ) -> anyhow::Result<ToolResponse> {
        let topic = invocation
            .args
            .get("topic")
            .and_then(|v| v.as_str())
            .unwrap_or("general");
        let headlines = format!(
            "1. {topic} breakthrough announced\n\
             2. Markets react to {topic} news\n\
             3. Experts debate the future of {topic}"
        );
        Ok(ToolResponse::text(headlines, invocation.tool_call_id))
    }
}

/// Asks the human for the topic: answers from context when it is already
/// there, otherwise pauses the turn.
struct GetHumanInputTool;

#[async_trait]
impl ToolHandle for GetHumanInputTool {
    fn name(&self) -> &str {
        "get_human_input"
    }

    fn description(&self) -> &str {
        "Ask the human operator for the news topic"
    }

    async fn invoke(
        &self,
        invocation: ToolInvocation,
        ctx: RunContext,
    ) -> anyhow::Result<ToolResponse> {
        if let Some(topic) = ctx.get_str("topic") {
            return Ok(ToolResponse::text(topic.to_string(), invocation.tool_call_id));
        }
        Ok(ToolResponse::Control(ToolControl::pause_for_input([(
            "topic",
            "What is the news topic?",
        )])))
    }
}

fn tool_call(tool_name: &str, args: serde_json::Value) -> Completion {
    Completion {
        message: AgentMessage::assistant(format!("calling {tool_name}")),
        tool_calls: vec![agentic::llm::ToolCallRequest {
            tool_name: tool_name.to_string(),
            args,
            tool_call_id: Some(format!("call-{tool_name}")),
        }],
        usage: agentic::events::CompletionUsage::for_model("scripted"),
    }
}

fn answer(text: &str) -> Completion {
    Completion {
        message: AgentMessage::assistant(text),
        tool_calls: Vec::new(),
        usage: agentic::events::CompletionUsage::for_model("scripted").with_tokens(40, 20),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("I am the news producer. Tell me the topic, and I'll get the news from my reporter.\n");

    let console = Arc::new(ConsoleBroadcaster::new());

    let reporter = Arc::new(
        AgentBuilder::new("News Reporter")
            .with_instructions("Call query_news to get headlines on the indicated news topic.")
            .with_model(ScriptedModel::new(vec![
                tool_call("query_news", json!({"topic": "fusion energy"})),
                answer("Three fresh headlines on fusion energy, markets are taking notice."),
            ]))
            .with_tool(Arc::new(QueryNewsTool))
            .with_broadcaster(console.clone())
            .build()?,
    );

    let producer = AgentBuilder::new("Producer")
        .with_instructions(
            "You are a news producer. Call the human to get the topic, then call the \
             reporter with the indicated topic. Print a one sentence summary of the report.",
        )
        .with_model(ScriptedModel::new(vec![
            tool_call("get_human_input", json!({})),
            tool_call("get_human_input", json!({})),
            tool_call("News Reporter", json!({"message": "fusion energy"})),
            answer("The reporter found three fusion energy headlines; markets are reacting."),
        ]))
        .with_tool(Arc::new(GetHumanInputTool))
        .with_broadcaster(console)
        .with_checkpointer(Arc::new(InMemoryCheckpointer::new()))
        .build()?;

    producer.add_child(reporter, false).await;

    // First turn: the producer pauses to ask for the topic.
    let outcome = producer.prompt("Get me today's news").await?;
    let TurnOutcome::AwaitingInput { request_keys } = outcome else {
        anyhow::bail!("expected the producer to pause for input");
    };
    for (key, question) in &request_keys {
        println!("\n[input requested] {question} ({key})");
    }

    // Second turn: answer the request and let the run finish.
    let outcome = producer
        .resume(BTreeMap::from([(
            "topic".to_string(),
            json!("fusion energy"),
        )]))
        .await?;

    if let Some(result) = outcome.result() {
        println!("\nFinal report: {result}");
    }

    // Let the spawned broadcaster tasks drain before exiting.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    Ok(())
}
