//! OpenAI-compatible gateway for hosted model interactions.
//!
//! This module provides a gateway for any endpoint speaking the OpenAI chat
//! completions protocol, including tool calling. The endpoint location and
//! credential come from the environment by default, so the same gateway works
//! against api.openai.com or a self-hosted compatible server.

use crate::config::{API_KEY_VAR, BASE_URL_VAR};
use crate::error::{Result, TabletalkError};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmGatewayResponse, LlmMessage, LlmToolCall, MessageRole};
use crate::llm::tools::LlmTool;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Configuration for connecting to an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Option<std::time::Duration>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var(API_KEY_VAR).unwrap_or_default(),
            base_url: std::env::var(BASE_URL_VAR)
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            timeout: None,
        }
    }
}

/// Gateway for OpenAI-compatible LLM services.
///
/// Supports text generation and tool calling through the chat completions
/// endpoint.
pub struct OpenAIGateway {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIGateway {
    /// Create a new gateway with environment-derived configuration.
    pub fn new() -> Self {
        Self::with_config(OpenAIConfig::default())
    }

    /// Create a new gateway with custom configuration.
    pub fn with_config(config: OpenAIConfig) -> Self {
        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build().unwrap();

        Self { client, config }
    }

    /// Create a gateway with custom API key and base URL.
    pub fn with_api_key_and_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self::with_config(OpenAIConfig {
            api_key: api_key.into(),
            base_url: base_url.into(),
            ..Default::default()
        })
    }
}

impl Default for OpenAIGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert conversation messages into the OpenAI wire format.
fn adapt_messages(messages: &[LlmMessage]) -> Result<Vec<Value>> {
    messages.iter().map(adapt_message).collect()
}

fn adapt_message(message: &LlmMessage) -> Result<Value> {
    match message.role {
        MessageRole::System | MessageRole::User => Ok(serde_json::json!({
            "role": role_str(message.role),
            "content": message.content.clone().unwrap_or_default(),
        })),
        MessageRole::Assistant => {
            let mut wire = serde_json::json!({
                "role": "assistant",
                "content": message.content.clone().map(Value::String).unwrap_or(Value::Null),
            });
            if let Some(calls) = &message.tool_calls {
                let wire_calls: Result<Vec<Value>> =
                    calls.iter().map(tool_call_to_wire).collect();
                wire["tool_calls"] = Value::Array(wire_calls?);
            }
            Ok(wire)
        }
        MessageRole::Tool => {
            // The protocol ties a tool result to the call that produced it.
            let call_id = message
                .tool_calls
                .as_ref()
                .and_then(|calls| calls.first())
                .and_then(|call| call.id.clone())
                .unwrap_or_default();
            Ok(serde_json::json!({
                "role": "tool",
                "tool_call_id": call_id,
                "content": message.content.clone().unwrap_or_default(),
            }))
        }
    }
}

fn role_str(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    }
}

fn tool_call_to_wire(call: &LlmToolCall) -> Result<Value> {
    Ok(serde_json::json!({
        "id": call.id.clone().unwrap_or_default(),
        "type": "function",
        "function": {
            "name": call.name,
            "arguments": serde_json::to_string(&call.arguments)?,
        }
    }))
}

/// Parse tool calls from a chat completion response.
fn convert_tool_calls(calls: &[Value]) -> Vec<LlmToolCall> {
    calls
        .iter()
        .filter_map(|tc| {
            let name = tc["function"]["name"].as_str()?.to_string();
            let arguments: HashMap<String, Value> = tc["function"]["arguments"]
                .as_str()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_default();

            Some(LlmToolCall {
                id: tc["id"].as_str().map(String::from),
                name,
                arguments,
            })
        })
        .collect()
}

#[async_trait]
impl LlmGateway for OpenAIGateway {
    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        tools: Option<&[Box<dyn LlmTool>]>,
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        info!("Delegating to model endpoint for completion");
        debug!("Model: {}, Message count: {}", model, messages.len());

        let wire_messages = adapt_messages(messages)?;

        let mut body = serde_json::json!({
            "model": model,
            "messages": wire_messages,
            "temperature": config.temperature,
            "max_tokens": config.max_tokens,
        });

        if let Some(top_p) = config.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }

        if let Some(tools) = tools {
            let tool_defs: Vec<_> = tools.iter().map(|t| t.descriptor()).collect();
            body["tools"] = serde_json::to_value(tool_defs)?;
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Model endpoint returned {}", status);
            return Err(TabletalkError::GatewayError(format!(
                "API error: {} - {}",
                status, error_text
            )));
        }

        let response_body: Value = response.json().await?;

        let content = response_body["choices"][0]["message"]["content"].as_str().map(String::from);

        let tool_calls =
            if let Some(calls) = response_body["choices"][0]["message"]["tool_calls"].as_array() {
                convert_tool_calls(calls)
            } else {
                vec![]
            };

        Ok(LlmGatewayResponse {
            content,
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tools::{FunctionDescriptor, ToolDescriptor};
    use serde_json::json;

    #[tokio::test]
    async fn test_complete_simple() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"There are 12 tables."}}]}"#,
            )
            .create();

        let gateway = OpenAIGateway::with_api_key_and_base_url("test-key", server.url());
        let messages = vec![LlmMessage::user("How many tables are there?")];
        let config = CompletionConfig::default();

        let result = gateway.complete("gpt-4o", &messages, None, &config).await;

        mock.assert();
        let response = result.unwrap();
        assert_eq!(response.content, Some("There are 12 tables.".to_string()));
        assert!(response.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_complete_parses_tool_calls() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":null,"tool_calls":[
                    {"id":"call_1","type":"function","function":{"name":"run_sql_query","arguments":"{\"query\":\"SELECT 1\"}"}}
                ]}}]}"#,
            )
            .create();

        let gateway = OpenAIGateway::with_api_key_and_base_url("test-key", server.url());
        let messages = vec![LlmMessage::user("Count the employees")];
        let config = CompletionConfig::default();

        let response = gateway.complete("gpt-4o", &messages, None, &config).await.unwrap();

        mock.assert();
        assert!(response.content.is_none());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].id, Some("call_1".to_string()));
        assert_eq!(response.tool_calls[0].name, "run_sql_query");
        assert_eq!(response.tool_calls[0].arguments["query"], json!("SELECT 1"));
    }

    #[tokio::test]
    async fn test_complete_sends_tool_descriptors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"tools":[{"type":"function","function":{"name":"list_tables"}}]}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#)
            .create();

        #[derive(Clone)]
        struct MockTool;
        impl LlmTool for MockTool {
            fn run(&self, _args: &HashMap<String, Value>) -> Result<Value> {
                Ok(json!({}))
            }
            fn descriptor(&self) -> ToolDescriptor {
                ToolDescriptor {
                    r#type: "function".to_string(),
                    function: FunctionDescriptor {
                        name: "list_tables".to_string(),
                        description: "List tables".to_string(),
                        parameters: json!({"type": "object", "properties": {}}),
                    },
                }
            }
            fn clone_box(&self) -> Box<dyn LlmTool> {
                Box::new(self.clone())
            }
        }

        let gateway = OpenAIGateway::with_api_key_and_base_url("test-key", server.url());
        let messages = vec![LlmMessage::user("What tables exist?")];
        let tools: Vec<Box<dyn LlmTool>> = vec![Box::new(MockTool)];
        let config = CompletionConfig::default();

        let result = gateway.complete("gpt-4o", &messages, Some(&tools), &config).await;

        mock.assert();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_complete_error_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"invalid key"}}"#)
            .create();

        let gateway = OpenAIGateway::with_api_key_and_base_url("bad-key", server.url());
        let messages = vec![LlmMessage::user("Hi")];
        let config = CompletionConfig::default();

        let result = gateway.complete("gpt-4o", &messages, None, &config).await;

        mock.assert();
        match result {
            Err(TabletalkError::GatewayError(msg)) => assert!(msg.contains("401")),
            other => panic!("Expected GatewayError, got {:?}", other.map(|r| r.content)),
        }
    }

    #[test]
    fn test_adapt_user_and_system_messages() {
        let messages =
            vec![LlmMessage::system("You are a data analyst"), LlmMessage::user("Hello")];
        let wire = adapt_messages(&messages).unwrap();

        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[0]["content"], "You are a data analyst");
        assert_eq!(wire[1]["role"], "user");
        assert_eq!(wire[1]["content"], "Hello");
    }

    #[test]
    fn test_adapt_assistant_with_tool_calls() {
        let call = LlmToolCall {
            id: Some("call_9".to_string()),
            name: "describe_table".to_string(),
            arguments: HashMap::from([("table_name".to_string(), json!("employees"))]),
        };
        let message = LlmMessage {
            role: MessageRole::Assistant,
            content: None,
            tool_calls: Some(vec![call]),
        };

        let wire = adapt_message(&message).unwrap();

        assert_eq!(wire["role"], "assistant");
        assert_eq!(wire["content"], Value::Null);
        assert_eq!(wire["tool_calls"][0]["id"], "call_9");
        assert_eq!(wire["tool_calls"][0]["function"]["name"], "describe_table");
        // Arguments travel as a JSON-encoded string
        let raw = wire["tool_calls"][0]["function"]["arguments"].as_str().unwrap();
        let parsed: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed["table_name"], "employees");
    }

    #[test]
    fn test_adapt_tool_result_message() {
        let call = LlmToolCall {
            id: Some("call_2".to_string()),
            name: "list_tables".to_string(),
            arguments: HashMap::new(),
        };
        let message = LlmMessage::tool_result(&call, r#"{"tables":["employees"]}"#);

        let wire = adapt_message(&message).unwrap();

        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_2");
        assert_eq!(wire["content"], r#"{"tables":["employees"]}"#);
    }

    #[test]
    fn test_convert_tool_calls_bad_arguments() {
        let calls = vec![json!({
            "id": "call_x",
            "type": "function",
            "function": {"name": "run_sql_query", "arguments": "not json"}
        })];

        let converted = convert_tool_calls(&calls);

        // Unparseable arguments degrade to an empty map rather than dropping the call
        assert_eq!(converted.len(), 1);
        assert!(converted[0].arguments.is_empty());
    }

    #[test]
    fn test_with_api_key_and_base_url() {
        let gateway = OpenAIGateway::with_api_key_and_base_url("key", "http://localhost:8080/v1");
        assert_eq!(gateway.config.api_key, "key");
        assert_eq!(gateway.config.base_url, "http://localhost:8080/v1");
    }
}
