use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;

/// Descriptor for a tool exposed to the model
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolDescriptor {
    pub r#type: String,
    pub function: FunctionDescriptor,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Trait for model-callable tools
pub trait LlmTool: Send + Sync {
    /// Execute the tool with given arguments
    fn run(&self, args: &HashMap<String, Value>) -> Result<Value>;

    /// Get tool descriptor for the model
    fn descriptor(&self) -> ToolDescriptor;

    /// Check if this tool matches the given name
    fn matches(&self, name: &str) -> bool {
        self.descriptor().function.name == name
    }

    /// Clone the tool into a Box
    ///
    /// This method is required to support cloning trait objects.
    /// Implementations should return `Box::new(self.clone())`.
    fn clone_box(&self) -> Box<dyn LlmTool>;
}
