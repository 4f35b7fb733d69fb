//! Browser automation tool.
//!
//! Thin adapter over an external browser-automation agent service: the
//! instructions go out as a task, the service drives the browser with its own
//! internal LLM, and the history of extracted content comes back. The token
//! spend of that internal LLM is surfaced as a `CompletionEnd` event so the
//! caller's accounting stays complete.

use agentic_core::agent::{ToolHandle, ToolResponse};
use agentic_core::context::RunContext;
use agentic_core::events::{AgentEvent, CompletionEndEvent, CompletionUsage, EventOrigin};
use agentic_core::messaging::{AgentMessage, ToolInvocation};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BROWSER_MODEL: &str = "gpt-4o-mini";

#[derive(Clone)]
pub struct BrowserUseConfig {
    /// Base URL of the browser automation service.
    pub endpoint: String,
    /// Path to a Chrome executable when the service should drive a local
    /// browser with its cookies and state. Typical paths:
    /// macOS `/Applications/Google Chrome.app/Contents/MacOS/Google Chrome`,
    /// Linux `/usr/bin/google-chrome`.
    pub chrome_instance_path: Option<String>,
    /// Model the automation agent uses internally.
    pub model: String,
}

impl BrowserUseConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            chrome_instance_path: None,
            model: DEFAULT_BROWSER_MODEL.to_string(),
        }
    }

    pub fn with_chrome_instance_path(mut self, path: impl Into<String>) -> Self {
        self.chrome_instance_path = Some(path.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Executes natural-language browsing instructions via the automation
/// service and returns the history of extracted content.
pub struct BrowserUseTool {
    name: String,
    client: Client,
    config: BrowserUseConfig,
}

impl BrowserUseTool {
    pub fn new(config: BrowserUseConfig) -> anyhow::Result<Self> {
        Ok(Self {
            name: "run_browser_agent".to_string(),
            client: Client::builder().user_agent("agentic-sdk/0.1").build()?,
            config,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BrowserArgs {
    instructions: String,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Serialize)]
struct BrowserTaskRequest<'a> {
    task: &'a str,
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    chrome_instance_path: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct BrowserTaskResponse {
    #[serde(default)]
    steps: Vec<BrowserStep>,
}

#[derive(Debug, Deserialize)]
struct BrowserStep {
    #[serde(default)]
    extracted_content: Option<String>,
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[async_trait]
impl ToolHandle for BrowserUseTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Execute a set of instructions via browser automation. Instructions can \
         be in natural language. The history of browsing actions taken is returned."
    }

    async fn invoke(
        &self,
        invocation: ToolInvocation,
        ctx: RunContext,
    ) -> anyhow::Result<ToolResponse> {
        let args: BrowserArgs = serde_json::from_value(invocation.args.clone())?;
        let model = args.model.as_deref().unwrap_or(&self.config.model);
        let url = format!("{}/run", self.config.endpoint.trim_end_matches('/'));

        let body = BrowserTaskRequest {
            task: &args.instructions,
            model,
            chrome_instance_path: self.config.chrome_instance_path.as_deref(),
        };

        tracing::info!(tool = %self.name, model = %model, "dispatching browser task");
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let data: BrowserTaskResponse = resp.json().await?;

        let mut input_tokens = 0u64;
        let mut output_tokens = 0u64;
        let mut extracted: Vec<String> = Vec::new();
        for step in &data.steps {
            input_tokens += step.input_tokens;
            output_tokens += step.output_tokens;
            if let Some(content) = &step.extracted_content {
                extracted.push(content.clone());
            }
        }
        tracing::info!(
            tool = %self.name,
            input_tokens,
            output_tokens,
            steps = data.steps.len(),
            "browser task finished"
        );

        let message = AgentMessage::tool(extracted.join("\n"), invocation.tool_call_id);
        let usage_note = format!(
            "Tokens used - Input: {input_tokens}, Output: {output_tokens}"
        );
        let accounting = AgentEvent::CompletionEnd(CompletionEndEvent {
            origin: EventOrigin::new(ctx.agent_name.clone(), ctx.depth),
            message: AgentMessage::assistant(usage_note),
            usage: CompletionUsage::for_model(model).with_tokens(input_tokens, output_tokens),
        });

        Ok(ToolResponse::MessageWithEvents {
            message,
            events: vec![accounting],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn browser_task_joins_extracted_content_and_accounts_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .and(body_partial_json(json!({
                "task": "find rust news",
                "model": "gpt-4o-mini"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "steps": [
                    {"extracted_content": "opened news site", "input_tokens": 100, "output_tokens": 20},
                    {"extracted_content": null, "input_tokens": 50, "output_tokens": 10},
                    {"extracted_content": "3 headlines found", "input_tokens": 80, "output_tokens": 30}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool = BrowserUseTool::new(BrowserUseConfig::new(server.uri())).unwrap();
        let response = tool
            .invoke(
                ToolInvocation {
                    tool_name: "run_browser_agent".to_string(),
                    args: json!({"instructions": "find rust news"}),
                    tool_call_id: Some("call-7".to_string()),
                },
                RunContext::new("producer", "thread-1", 0),
            )
            .await
            .unwrap();

        match response {
            ToolResponse::MessageWithEvents { message, events } => {
                assert_eq!(
                    message.content.as_text().unwrap(),
                    "opened news site\n3 headlines found"
                );
                assert_eq!(events.len(), 1);
                match &events[0] {
                    AgentEvent::CompletionEnd(e) => {
                        assert_eq!(e.usage.input_tokens, 230);
                        assert_eq!(e.usage.output_tokens, 60);
                        assert_eq!(e.usage.model, "gpt-4o-mini");
                        assert_eq!(e.usage.cost, 0.0);
                        assert_eq!(e.origin.agent, "producer");
                    }
                    other => panic!("expected completion end event, got {other:?}"),
                }
            }
            other => panic!("expected message with events, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn model_override_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .and(body_partial_json(json!({"model": "gpt-4o"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"steps": []})))
            .expect(1)
            .mount(&server)
            .await;

        let tool = BrowserUseTool::new(BrowserUseConfig::new(server.uri())).unwrap();
        tool.invoke(
            ToolInvocation {
                tool_name: "run_browser_agent".to_string(),
                args: json!({"instructions": "anything", "model": "gpt-4o"}),
                tool_call_id: None,
            },
            RunContext::new("producer", "thread-1", 0),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn http_errors_bubble_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tool = BrowserUseTool::new(BrowserUseConfig::new(server.uri())).unwrap();
        let err = tool
            .invoke(
                ToolInvocation {
                    tool_name: "run_browser_agent".to_string(),
                    args: json!({"instructions": "anything"}),
                    tool_call_id: None,
                },
                RunContext::new("producer", "thread-1", 0),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
