pub mod analyst;
pub mod config;
pub mod error;
pub mod llm;

pub use analyst::{AnalystSession, ContextCarrier};
pub use error::{Result, TabletalkError};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::analyst::{AnalystSession, AnalystSessionBuilder, ContextCarrier};
    pub use crate::config::Settings;
    pub use crate::error::{Result, TabletalkError};
    pub use crate::llm::gateways::OpenAIGateway;
    pub use crate::llm::tools::{FunctionDescriptor, LlmTool, SqlToolkit, ToolDescriptor};
    pub use crate::llm::{ChatSession, CompletionConfig, LlmBroker, LlmGateway, LlmMessage, MessageRole};
}
