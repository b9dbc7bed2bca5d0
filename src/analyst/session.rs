//! The analyst session: a stateful wrapper around one chat session.
//!
//! `AnalystSession` is what callers hold on to. It is identified by
//! (user_id, session_id), owns the wrapped chat session, and carries the
//! previous turn's topic through [`ContextCarrier`] so follow-up questions
//! arrive at the model with enough context to be answerable.

use crate::analyst::context::ContextCarrier;
use crate::analyst::prompt;
use crate::config::Settings;
use crate::error::Result;
use crate::llm::broker::LlmBroker;
use crate::llm::chat_session::ChatSession;
use crate::llm::gateway::LlmGateway;
use crate::llm::gateways::OpenAIGateway;
use crate::llm::tools::{LlmTool, SqlToolkit};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const DEFAULT_MODEL: &str = "gpt-4o";

/// A conversational data-analysis session bound to a single database.
///
/// Each call to [`ask`](AnalystSession::ask) is one turn: the question is
/// enhanced with the previous turn's context when it reads like a follow-up,
/// forwarded to the wrapped chat session, and the context string is
/// recomputed from the question for the next turn. `ask` takes `&mut self`,
/// so one request is in flight per session at a time.
///
/// # Examples
///
/// ```ignore
/// use tabletalk::analyst::AnalystSession;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut session = AnalystSession::builder("alice").build()?;
///
///     let answer = session.ask("Show the department distribution").await?;
///     println!("{}", answer);
///
///     // "those" marks this as a follow-up; the previous topic rides along
///     let detail = session.ask("Break those down by gender").await?;
///     println!("{}", detail);
///
///     Ok(())
/// }
/// ```
pub struct AnalystSession {
    user_id: String,
    session_id: String,
    debug_mode: bool,
    chat: ChatSession,
    context: ContextCarrier,
}

impl AnalystSession {
    /// Create a session builder for the given user.
    pub fn builder(user_id: impl Into<String>) -> AnalystSessionBuilder {
        AnalystSessionBuilder::new(user_id)
    }

    /// Ask the analyst a question and wait for its answer.
    ///
    /// The call blocks until the delegate chain (model, tools) returns;
    /// failures propagate unmodified. After the response arrives the stored
    /// context is recomputed from the question, replacing the previous one.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        let outgoing = self.context.enhance_question(question);

        if self.debug_mode {
            info!(
                user_id = %self.user_id,
                session_id = %self.session_id,
                "Forwarding question: {}",
                outgoing
            );
        } else {
            debug!("Forwarding question: {}", outgoing);
        }

        let response = self.chat.send(&outgoing).await?;

        self.context.observe_turn(question);

        Ok(response)
    }

    /// The user this session belongs to
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The session identifier
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The context string carried from the previous turn
    pub fn last_query_context(&self) -> &str {
        self.context.last_query_context()
    }

    /// The wrapped chat session
    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }
}

/// Builder for constructing an `AnalystSession`.
///
/// By default the builder reads [`Settings`] from the environment, connects
/// an [`OpenAIGateway`], and binds the SQL toolkit to the configured
/// database. A gateway and tool set can be supplied directly instead, which
/// keeps construction hermetic for tests and demos.
pub struct AnalystSessionBuilder {
    user_id: String,
    session_id: Option<String>,
    model: String,
    debug_mode: bool,
    settings: Option<Settings>,
    gateway: Option<Arc<dyn LlmGateway>>,
    tools: Option<Vec<Box<dyn LlmTool>>>,
}

impl AnalystSessionBuilder {
    fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: None,
            model: DEFAULT_MODEL.to_string(),
            debug_mode: false,
            settings: None,
            gateway: None,
            tools: None,
        }
    }

    /// Set the session identifier (default: a fresh UUID v4)
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the model id (default: "gpt-4o")
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Log forwarded prompts at info level instead of debug
    pub fn debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    /// Use explicit settings instead of reading the environment
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Use a pre-built gateway instead of the environment-configured one
    pub fn gateway(mut self, gateway: Arc<dyn LlmGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Use an explicit tool set instead of the database-bound SQL toolkit
    pub fn tools(mut self, tools: Vec<Box<dyn LlmTool>>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Build the analyst session.
    ///
    /// Settings are only resolved when the gateway or the tool set has to be
    /// assembled from them.
    pub fn build(self) -> Result<AnalystSession> {
        let session_id = self.session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let (gateway, tools) = match (self.gateway, self.tools) {
            (Some(gateway), Some(tools)) => (gateway, tools),
            (gateway, tools) => {
                let settings = match self.settings {
                    Some(settings) => settings,
                    None => Settings::from_env()?,
                };

                let gateway: Arc<dyn LlmGateway> = match gateway {
                    Some(gateway) => gateway,
                    None => Arc::new(OpenAIGateway::with_api_key_and_base_url(
                        settings.api_key.clone(),
                        settings.base_url.clone(),
                    )),
                };
                let tools = match tools {
                    Some(tools) => tools,
                    None => SqlToolkit::open(&settings.database_url)?.tools(),
                };

                (gateway, tools)
            }
        };

        let broker = LlmBroker::new(self.model, gateway);
        let chat = ChatSession::builder(broker)
            .system_prompt(prompt::system_prompt())
            .tools(tools)
            .build();

        Ok(AnalystSession {
            user_id: self.user_id,
            session_id,
            debug_mode: self.debug_mode,
            chat,
            context: ContextCarrier::new(),
        })
    }
}
