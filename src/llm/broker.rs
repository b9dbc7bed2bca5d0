use crate::error::Result;
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmMessage, MessageRole};
use crate::llm::tools::LlmTool;
use std::sync::Arc;
use tracing::{info, warn};

/// Main interface for LLM interactions.
///
/// The broker pairs a model id with a gateway and drives the tool-call loop:
/// when the model requests tool execution, the broker runs the matching tools,
/// feeds their output back, and re-invokes the model until a text answer
/// arrives.
pub struct LlmBroker {
    model: String,
    gateway: Arc<dyn LlmGateway>,
}

impl LlmBroker {
    /// Create a new LLM broker
    pub fn new(model: impl Into<String>, gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            model: model.into(),
            gateway,
        }
    }

    /// Generate a text response from the model.
    ///
    /// Each delegate call is awaited to completion; tool calls requested by
    /// the model are executed in order and the loop continues until the model
    /// answers in text. Failures from the gateway or a tool propagate
    /// unmodified.
    pub async fn generate(
        &self,
        messages: &[LlmMessage],
        tools: Option<&[Box<dyn LlmTool>]>,
        config: Option<CompletionConfig>,
    ) -> Result<String> {
        let config = config.unwrap_or_default();
        let mut current_messages = messages.to_vec();

        loop {
            let response = self
                .gateway
                .complete(&self.model, &current_messages, tools, &config)
                .await?;

            if response.tool_calls.is_empty() {
                return Ok(response.content.unwrap_or_default());
            }

            let Some(tools) = tools else {
                // Model asked for tools we never offered; fall back to its text
                warn!("Model requested tool calls but no tools were provided");
                return Ok(response.content.unwrap_or_default());
            };

            info!("Tool calls requested: {}", response.tool_calls.len());

            current_messages.push(LlmMessage {
                role: MessageRole::Assistant,
                content: response.content.clone(),
                tool_calls: Some(response.tool_calls.clone()),
            });

            for tool_call in &response.tool_calls {
                if let Some(tool) = tools.iter().find(|t| t.matches(&tool_call.name)) {
                    info!("Executing tool: {}", tool_call.name);

                    let output = tool.run(&tool_call.arguments)?;
                    current_messages
                        .push(LlmMessage::tool_result(tool_call, serde_json::to_string(&output)?));
                } else {
                    warn!("Tool not found: {}", tool_call.name);
                    current_messages.push(LlmMessage::tool_result(
                        tool_call,
                        format!("{{\"error\":\"unknown tool {}\"}}", tool_call.name),
                    ));
                }
            }
        }
    }

    /// The model id this broker was created with
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::models::{LlmGatewayResponse, LlmToolCall};
    use crate::llm::tools::{FunctionDescriptor, ToolDescriptor};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Mock gateway for testing
    struct MockGateway {
        responses: Vec<LlmGatewayResponse>,
        call_count: Mutex<usize>,
        seen_messages: Mutex<Vec<Vec<LlmMessage>>>,
    }

    impl MockGateway {
        fn new(responses: Vec<LlmGatewayResponse>) -> Self {
            Self {
                responses,
                call_count: Mutex::new(0),
                seen_messages: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmGateway for MockGateway {
        async fn complete(
            &self,
            _model: &str,
            messages: &[LlmMessage],
            _tools: Option<&[Box<dyn LlmTool>]>,
            _config: &CompletionConfig,
        ) -> Result<LlmGatewayResponse> {
            self.seen_messages.lock().unwrap().push(messages.to_vec());

            let mut count = self.call_count.lock().unwrap();
            let idx = *count;
            *count += 1;

            if idx < self.responses.len() {
                Ok(self.responses[idx].clone())
            } else {
                Ok(LlmGatewayResponse {
                    content: Some("default response".to_string()),
                    tool_calls: vec![],
                })
            }
        }
    }

    // Mock tool for testing
    #[derive(Clone)]
    struct MockTool {
        name: String,
        result: Value,
    }

    impl LlmTool for MockTool {
        fn run(&self, _args: &HashMap<String, Value>) -> Result<Value> {
            Ok(self.result.clone())
        }

        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                r#type: "function".to_string(),
                function: FunctionDescriptor {
                    name: self.name.clone(),
                    description: "A mock tool".to_string(),
                    parameters: serde_json::json!({}),
                },
            }
        }

        fn clone_box(&self) -> Box<dyn LlmTool> {
            Box::new(self.clone())
        }
    }

    #[tokio::test]
    async fn test_broker_new() {
        let gateway = Arc::new(MockGateway::new(vec![]));
        let broker = LlmBroker::new("gpt-4o", gateway);
        assert_eq!(broker.model(), "gpt-4o");
    }

    #[tokio::test]
    async fn test_generate_simple_response() {
        let response = LlmGatewayResponse {
            content: Some("Hello, World!".to_string()),
            tool_calls: vec![],
        };

        let gateway = Arc::new(MockGateway::new(vec![response]));
        let broker = LlmBroker::new("test-model", gateway);

        let messages = vec![LlmMessage::user("Hi")];
        let result = broker.generate(&messages, None, None).await.unwrap();

        assert_eq!(result, "Hello, World!");
    }

    #[tokio::test]
    async fn test_generate_empty_response_content() {
        let response = LlmGatewayResponse {
            content: None,
            tool_calls: vec![],
        };

        let gateway = Arc::new(MockGateway::new(vec![response]));
        let broker = LlmBroker::new("test-model", gateway);

        let messages = vec![LlmMessage::user("Hi")];
        let result = broker.generate(&messages, None, None).await.unwrap();

        assert_eq!(result, "");
    }

    #[tokio::test]
    async fn test_generate_with_tool_call() {
        let tool_call = LlmToolCall {
            id: Some("call_1".to_string()),
            name: "run_sql_query".to_string(),
            arguments: HashMap::new(),
        };

        let first_response = LlmGatewayResponse {
            content: None,
            tool_calls: vec![tool_call],
        };

        let second_response = LlmGatewayResponse {
            content: Some("After tool execution".to_string()),
            tool_calls: vec![],
        };

        let gateway = Arc::new(MockGateway::new(vec![first_response, second_response]));
        let broker = LlmBroker::new("test-model", gateway.clone());

        let tool = MockTool {
            name: "run_sql_query".to_string(),
            result: serde_json::json!({"rows": []}),
        };
        let tools: Vec<Box<dyn LlmTool>> = vec![Box::new(tool)];

        let messages = vec![LlmMessage::user("Count the employees")];
        let result = broker.generate(&messages, Some(&tools), None).await.unwrap();

        assert_eq!(result, "After tool execution");

        // The second call must carry the assistant tool-call turn and the tool result
        let seen = gateway.seen_messages.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let second = &seen[1];
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].role, MessageRole::Assistant);
        assert_eq!(second[2].role, MessageRole::Tool);
        assert!(second[2].content.as_ref().unwrap().contains("rows"));
    }

    #[tokio::test]
    async fn test_generate_executes_multiple_tool_calls_in_order() {
        let calls = vec![
            LlmToolCall {
                id: Some("call_1".to_string()),
                name: "list_tables".to_string(),
                arguments: HashMap::new(),
            },
            LlmToolCall {
                id: Some("call_2".to_string()),
                name: "describe_table".to_string(),
                arguments: HashMap::new(),
            },
        ];

        let first_response = LlmGatewayResponse {
            content: None,
            tool_calls: calls,
        };
        let second_response = LlmGatewayResponse {
            content: Some("done".to_string()),
            tool_calls: vec![],
        };

        let gateway = Arc::new(MockGateway::new(vec![first_response, second_response]));
        let broker = LlmBroker::new("test-model", gateway.clone());

        let tools: Vec<Box<dyn LlmTool>> = vec![
            Box::new(MockTool {
                name: "list_tables".to_string(),
                result: serde_json::json!({"tables": ["employees"]}),
            }),
            Box::new(MockTool {
                name: "describe_table".to_string(),
                result: serde_json::json!({"columns": []}),
            }),
        ];

        let messages = vec![LlmMessage::user("Explore the schema")];
        let result = broker.generate(&messages, Some(&tools), None).await.unwrap();

        assert_eq!(result, "done");

        let seen = gateway.seen_messages.lock().unwrap();
        let second = &seen[1];
        // user + assistant(tool_calls) + two tool results
        assert_eq!(second.len(), 4);
        assert!(second[2].content.as_ref().unwrap().contains("tables"));
        assert!(second[3].content.as_ref().unwrap().contains("columns"));
    }

    #[tokio::test]
    async fn test_generate_with_tool_call_no_tools_provided() {
        let tool_call = LlmToolCall {
            id: Some("call_1".to_string()),
            name: "run_sql_query".to_string(),
            arguments: HashMap::new(),
        };

        let response = LlmGatewayResponse {
            content: Some("fallback".to_string()),
            tool_calls: vec![tool_call],
        };

        let gateway = Arc::new(MockGateway::new(vec![response]));
        let broker = LlmBroker::new("test-model", gateway);

        let messages = vec![LlmMessage::user("Use the tool")];
        let result = broker.generate(&messages, None, None).await.unwrap();

        assert_eq!(result, "fallback");
    }

    #[tokio::test]
    async fn test_generate_unknown_tool_reports_error_to_model() {
        let tool_call = LlmToolCall {
            id: Some("call_1".to_string()),
            name: "mystery_tool".to_string(),
            arguments: HashMap::new(),
        };

        let first_response = LlmGatewayResponse {
            content: None,
            tool_calls: vec![tool_call],
        };
        let second_response = LlmGatewayResponse {
            content: Some("recovered".to_string()),
            tool_calls: vec![],
        };

        let gateway = Arc::new(MockGateway::new(vec![first_response, second_response]));
        let broker = LlmBroker::new("test-model", gateway.clone());

        let tools: Vec<Box<dyn LlmTool>> = vec![Box::new(MockTool {
            name: "list_tables".to_string(),
            result: serde_json::json!({}),
        })];

        let messages = vec![LlmMessage::user("Hi")];
        let result = broker.generate(&messages, Some(&tools), None).await.unwrap();

        assert_eq!(result, "recovered");

        let seen = gateway.seen_messages.lock().unwrap();
        let second = &seen[1];
        assert!(second[2].content.as_ref().unwrap().contains("unknown tool"));
    }

    #[tokio::test]
    async fn test_multiple_messages() {
        let response = LlmGatewayResponse {
            content: Some("Response to conversation".to_string()),
            tool_calls: vec![],
        };

        let gateway = Arc::new(MockGateway::new(vec![response]));
        let broker = LlmBroker::new("test-model", gateway);

        let messages = vec![
            LlmMessage::system("You are a data analyst"),
            LlmMessage::user("First message"),
            LlmMessage::assistant("First response"),
            LlmMessage::user("Second message"),
        ];

        let result = broker.generate(&messages, None, None).await.unwrap();
        assert_eq!(result, "Response to conversation");
    }
}
