//! services/app/src/error.rs
//!
//! Defines the primary error type for the entire application shell.

use crate::config::ConfigError;
use campus_core::ports::PortError;

/// The primary error type for the `app` service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying HTTP client library.
    #[error("HTTP Error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents an error surfaced by the session store (login lifecycle).
    #[error("Session Error: {0}")]
    Session(#[from] campus_core::session::SessionError),

    /// Represents a standard Input/Output error (e.g., the session file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
