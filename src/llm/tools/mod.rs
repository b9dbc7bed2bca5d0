pub mod sql;
mod tool;

pub use sql::SqlToolkit;
pub use tool::{FunctionDescriptor, LlmTool, ToolDescriptor};
