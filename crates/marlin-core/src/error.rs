//! Error types for the marlin core library.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types for marlin.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Layered configuration error (file parsing or environment).
    #[error("Config crate error: {0}")]
    ConfigCrate(#[from] config::ConfigError),
}

impl CoreError {
    /// Create a new configuration error with a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
