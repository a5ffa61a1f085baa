//! Application Configuration Module
//!
//! Centralizes the guide's settings. Everything is read from environment
//! variables (optionally via a `.env` file) into a single struct that is
//! passed to the clients at startup.

use secrecy::SecretString;
use std::env;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_VISION_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";
pub const DEFAULT_HAZARD_INTERVAL_MS: u64 = 3_000;

/// How images reach the vision model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionProvider {
    /// Chat-completions endpoint, prompts sent from this process.
    Chat,
    /// A hosted gateway exposing `/detect-hazards`, `/analyze-scene` and
    /// `/find-object`, which owns its own prompts.
    Gateway,
}

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub vision_api_key: SecretString,
    pub vision_api_base: String,
    pub vision_model: String,
    pub vision_provider: VisionProvider,
    pub maps_api_key: Option<SecretString>,
    pub hazard_interval: Duration,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("HAZARD_INTERVAL_MS must be a positive number of milliseconds, got {0:?}")]
    InvalidInterval(String),
    #[error("Unknown VISION_PROVIDER {0:?}, expected \"chat\" or \"gateway\"")]
    InvalidProvider(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `VISION_API_KEY`: Bearer token for the vision endpoint. Required.
    // *   `VISION_API_BASE`: (Optional) Base URL. Defaults to "https://api.openai.com/v1".
    // *   `VISION_MODEL`: (Optional) Model name for chat mode. Defaults to "gpt-4o".
    // *   `VISION_PROVIDER`: (Optional) "chat" or "gateway". Defaults to "chat".
    // *   `GOOGLE_MAPS_API_KEY`: (Optional) Enables navigation.
    // *   `HAZARD_INTERVAL_MS`: (Optional) Hazard cycle period. Defaults to 3000.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let vision_api_key = non_empty("VISION_API_KEY")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingVar("VISION_API_KEY".to_string()))?;

        let vision_api_base = non_empty("VISION_API_BASE")
            .unwrap_or_else(|| DEFAULT_VISION_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let vision_model =
            non_empty("VISION_MODEL").unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string());

        let vision_provider = match non_empty("VISION_PROVIDER") {
            None => VisionProvider::Chat,
            Some(value) => match value.to_lowercase().as_str() {
                "chat" => VisionProvider::Chat,
                "gateway" => VisionProvider::Gateway,
                _ => return Err(ConfigError::InvalidProvider(value)),
            },
        };

        let maps_api_key = non_empty("GOOGLE_MAPS_API_KEY").map(SecretString::from);

        let hazard_interval = match non_empty("HAZARD_INTERVAL_MS") {
            None => Duration::from_millis(DEFAULT_HAZARD_INTERVAL_MS),
            Some(value) => match value.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => return Err(ConfigError::InvalidInterval(value)),
            },
        };

        // Configure logging level from RUST_LOG, with a sensible default.
        let log_level_str = non_empty("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            vision_api_key,
            vision_api_base,
            vision_model,
            vision_provider,
            maps_api_key,
            hazard_interval,
            log_level,
        })
    }
}
