pub mod openai;
pub mod tokenizer;

pub use openai::{OpenAIConfig, OpenAIGateway};
pub use tokenizer::TokenizerGateway;
