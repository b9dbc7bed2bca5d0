//! Tokenizer gateway for encoding and decoding text using tiktoken.
//!
//! Token counting backs the chat session's context-window trimming: each
//! message is measured once and the session drops the oldest turns when the
//! running total exceeds its budget.

use crate::error::{Result, TabletalkError};
use tiktoken_rs::CoreBPE;

/// Gateway for tokenizing and detokenizing text using tiktoken.
///
/// # Examples
///
/// ```
/// use tabletalk::llm::gateways::TokenizerGateway;
///
/// let tokenizer = TokenizerGateway::new("cl100k_base").unwrap();
/// let text = "Hello, world!";
/// let tokens = tokenizer.encode(text);
/// let decoded = tokenizer.decode(&tokens);
/// assert_eq!(text, decoded);
/// ```
pub struct TokenizerGateway {
    tokenizer: CoreBPE,
}

impl TokenizerGateway {
    /// Creates a new TokenizerGateway with the specified encoding model.
    ///
    /// Supported encodings: `cl100k_base` (default), `p50k_base`, `r50k_base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the specified encoding is not available.
    pub fn new(model: &str) -> Result<Self> {
        let tokenizer = match model {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            _ => {
                return Err(TabletalkError::ConfigError(format!(
                    "Unsupported encoding model: {}",
                    model
                )))
            }
        }
        .map_err(|e| TabletalkError::ConfigError(format!("Failed to load tokenizer: {}", e)))?;

        Ok(Self { tokenizer })
    }

    /// Encodes text into tokens.
    pub fn encode(&self, text: &str) -> Vec<usize> {
        self.tokenizer.encode_with_special_tokens(text)
    }

    /// Decodes tokens back into text.
    pub fn decode(&self, tokens: &[usize]) -> String {
        self.tokenizer.decode(tokens.to_vec()).unwrap_or_else(|e| {
            tracing::error!("Failed to decode tokens: {}", e);
            String::new()
        })
    }

    /// Counts the number of tokens in a text string.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

impl Default for TokenizerGateway {
    fn default() -> Self {
        // cl100k_base ships with tiktoken-rs
        Self::new("cl100k_base").expect("cl100k_base should always be available")
    }
}
