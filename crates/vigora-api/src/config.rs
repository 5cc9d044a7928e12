//! Environment-driven server configuration.

use std::path::PathBuf;

use anyhow::Context;
use secrecy::SecretString;

/// Default model when `VIGORA_MODEL` is unset.
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Runtime configuration for the `serve` command.
pub struct ServerConfig {
    /// Directory holding the SQLite database.
    pub data_dir: PathBuf,
    /// Gemini API key (never logged).
    pub gemini_api_key: SecretString,
    /// Model identifier for chat turns.
    pub model: String,
    /// Optional Gemini base URL override (testing, proxies).
    pub gemini_base_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from the environment.
    ///
    /// - `VIGORA_DATA_DIR` -- data directory, default `~/.vigora`
    /// - `GEMINI_API_KEY`  -- required
    /// - `VIGORA_MODEL`    -- default `gemini-1.5-flash`
    /// - `GEMINI_BASE_URL` -- optional override
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = std::env::var("VIGORA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".vigora")
            });

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .map(SecretString::from)
            .context("GEMINI_API_KEY must be set")?;

        let model = std::env::var("VIGORA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let gemini_base_url = std::env::var("GEMINI_BASE_URL").ok();

        Ok(Self {
            data_dir,
            gemini_api_key,
            model,
            gemini_base_url,
        })
    }
}
