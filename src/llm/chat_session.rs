//! Chat session management with context window tracking.
//!
//! This module provides a chat session abstraction that manages conversation history
//! and automatically handles context window limits using token counting.

use crate::error::Result;
use crate::llm::broker::LlmBroker;
use crate::llm::gateway::CompletionConfig;
use crate::llm::gateways::TokenizerGateway;
use crate::llm::models::{LlmMessage, MessageRole};
use crate::llm::tools::LlmTool;
use serde::{Deserialize, Serialize};

/// An LLM message with token count metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizedLlmMessage {
    #[serde(flatten)]
    pub message: LlmMessage,
    pub token_length: usize,
}

impl SizedLlmMessage {
    /// Create a new sized message
    pub fn new(message: LlmMessage, token_length: usize) -> Self {
        Self {
            message,
            token_length,
        }
    }

    /// Get the role of the message
    pub fn role(&self) -> MessageRole {
        self.message.role
    }

    /// Get the content of the message
    pub fn content(&self) -> Option<&str> {
        self.message.content.as_deref()
    }
}

/// A chat session that manages conversation history with context window limits.
///
/// `ChatSession` maintains a list of messages and automatically trims old messages
/// when the total token count exceeds the configured maximum context size. The system
/// prompt (first message) is always preserved.
///
/// # Examples
///
/// ```ignore
/// use tabletalk::llm::{ChatSession, LlmBroker};
/// use tabletalk::llm::gateways::OpenAIGateway;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let gateway = Arc::new(OpenAIGateway::new());
///     let broker = LlmBroker::new("gpt-4o", gateway);
///     let mut session = ChatSession::new(broker);
///
///     let response = session.send("What tables does the database have?").await?;
///     println!("Response: {}", response);
///
///     Ok(())
/// }
/// ```
pub struct ChatSession {
    broker: LlmBroker,
    messages: Vec<SizedLlmMessage>,
    tools: Option<Vec<Box<dyn LlmTool>>>,
    max_context: usize,
    tokenizer: TokenizerGateway,
    temperature: f32,
}

impl ChatSession {
    /// Create a new chat session with default settings.
    pub fn new(broker: LlmBroker) -> Self {
        Self::builder(broker).build()
    }

    /// Create a chat session builder for custom configuration.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use tabletalk::llm::ChatSession;
    ///
    /// let session = ChatSession::builder(broker)
    ///     .system_prompt("You are a data analyst.")
    ///     .temperature(0.7)
    ///     .max_context(16384)
    ///     .build();
    /// ```
    pub fn builder(broker: LlmBroker) -> ChatSessionBuilder {
        ChatSessionBuilder::new(broker)
    }

    /// Send a message to the LLM and get a response.
    ///
    /// This method:
    /// 1. Adds the user message to the conversation history
    /// 2. Generates a response using the LLM (running any requested tools)
    /// 3. Adds the assistant's response to the history
    /// 4. Automatically trims old messages if the context window is exceeded
    pub async fn send(&mut self, query: &str) -> Result<String> {
        // Add user message
        self.insert_message(LlmMessage::user(query));

        // Generate response
        let messages: Vec<LlmMessage> = self.messages.iter().map(|m| m.message.clone()).collect();
        let config = CompletionConfig {
            temperature: self.temperature,
            ..Default::default()
        };

        let response =
            self.broker.generate(&messages, self.tools.as_deref(), Some(config)).await?;

        // Add assistant response
        self.insert_message(LlmMessage::assistant(&response));

        Ok(response)
    }

    /// Insert a message into the conversation history.
    ///
    /// If the total token count exceeds `max_context`, the oldest messages
    /// are removed until the total is under the limit. The system prompt
    /// (index 0) is always preserved.
    pub fn insert_message(&mut self, message: LlmMessage) {
        let sized_message = self.build_sized_message(message);
        self.messages.push(sized_message);

        // Trim messages if over context limit
        let mut total_length: usize = self.messages.iter().map(|m| m.token_length).sum();

        while total_length > self.max_context && self.messages.len() > 1 {
            // Remove the oldest message (index 1 to preserve system prompt at 0)
            let removed = self.messages.remove(1);
            total_length -= removed.token_length;
        }
    }

    /// Get the current conversation history
    pub fn messages(&self) -> &[SizedLlmMessage] {
        &self.messages
    }

    /// Get the total token count of the current conversation
    pub fn total_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.token_length).sum()
    }

    /// Build a sized message from a regular message
    fn build_sized_message(&self, message: LlmMessage) -> SizedLlmMessage {
        let token_length = if let Some(content) = &message.content {
            self.tokenizer.count_tokens(content)
        } else {
            0
        };

        SizedLlmMessage::new(message, token_length)
    }
}

/// Builder for constructing a `ChatSession` with custom configuration.
pub struct ChatSessionBuilder {
    broker: LlmBroker,
    system_prompt: String,
    tools: Option<Vec<Box<dyn LlmTool>>>,
    max_context: usize,
    tokenizer: Option<TokenizerGateway>,
    temperature: f32,
}

impl ChatSessionBuilder {
    fn new(broker: LlmBroker) -> Self {
        Self {
            broker,
            system_prompt: "You are a helpful assistant.".to_string(),
            tools: None,
            max_context: 32768,
            tokenizer: None,
            temperature: 1.0,
        }
    }

    /// Set the system prompt (default: "You are a helpful assistant.")
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the tools available to the LLM
    pub fn tools(mut self, tools: Vec<Box<dyn LlmTool>>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Set the maximum context window in tokens (default: 32768)
    pub fn max_context(mut self, max_context: usize) -> Self {
        self.max_context = max_context;
        self
    }

    /// Set a custom tokenizer (default: cl100k_base)
    pub fn tokenizer(mut self, tokenizer: TokenizerGateway) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Set the temperature for generation (default: 1.0)
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Build the chat session
    pub fn build(self) -> ChatSession {
        let tokenizer = self.tokenizer.unwrap_or_default();
        let system_message = LlmMessage::system(&self.system_prompt);
        let token_length = tokenizer.count_tokens(&self.system_prompt);

        ChatSession {
            broker: self.broker,
            messages: vec![SizedLlmMessage::new(system_message, token_length)],
            tools: self.tools,
            max_context: self.max_context,
            tokenizer,
            temperature: self.temperature,
        }
    }
}
