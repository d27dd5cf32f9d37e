//! services/app/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the platform API (auth, progress, exams).
    pub api_base_url: String,
    /// Base URL of the course-content document store. Defaults to the API.
    pub catalog_url: String,
    /// Where the `{user, token}` pair is persisted between runs.
    pub session_file: PathBuf,
    pub log_level: Level,
    /// Optional credentials for the demo login performed by the binary.
    pub demo_email: Option<String>,
    pub demo_password: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_base_url = std::env::var("API_BASE_URL")
            .map_err(|_| ConfigError::MissingVar("API_BASE_URL".to_string()))?;

        let catalog_url =
            std::env::var("CATALOG_URL").unwrap_or_else(|_| api_base_url.clone());

        let session_file = std::env::var("SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./session.json"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let demo_email = std::env::var("CAMPUS_EMAIL").ok();
        let demo_password = std::env::var("CAMPUS_PASSWORD").ok();

        Ok(Self {
            api_base_url,
            catalog_url,
            session_file,
            log_level,
            demo_email,
            demo_password,
        })
    }
}
