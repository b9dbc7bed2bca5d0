//! Environment-driven settings for the analyst session.
//!
//! The session needs three pieces of external configuration: the hosted model
//! credential, the model endpoint, and the location of the bound database.
//! All three come from the environment (a `.env` file is honored when present).

use crate::error::{Result, TabletalkError};

/// Environment variable holding the hosted model API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
/// Environment variable holding the OpenAI-compatible endpoint base URL.
pub const BASE_URL_VAR: &str = "LLM_BASE_URL";
/// Environment variable holding the bound database location.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection settings for the model endpoint and the bound database.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub database_url: String,
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// `OPENAI_API_KEY` and `DATABASE_URL` are required; `LLM_BASE_URL` falls
    /// back to the public OpenAI endpoint. A `.env` file in the working
    /// directory is loaded first if one exists.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let api_key = std::env::var(API_KEY_VAR)
            .map_err(|_| TabletalkError::ConfigError(format!("{} is not set", API_KEY_VAR)))?;
        let database_url = std::env::var(DATABASE_URL_VAR)
            .map_err(|_| TabletalkError::ConfigError(format!("{} is not set", DATABASE_URL_VAR)))?;
        let base_url =
            std::env::var(BASE_URL_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            api_key,
            base_url,
            database_url,
        })
    }
}
