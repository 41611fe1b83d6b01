//! Unified error handling for the comparison runner.

use std::path::PathBuf;

/// Application error type. Every variant except the transient network
/// failures handled inside the request sender is fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load fixture {path}: {message}")]
    Fixture { path: PathBuf, message: String },

    #[error("Health check failed: {0}")]
    HealthCheck(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Check if this error represents a pre-flight check failure.
    pub fn is_health_check(&self) -> bool {
        matches!(self, Self::HealthCheck(_))
    }
}
