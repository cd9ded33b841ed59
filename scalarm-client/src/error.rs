//! Error types for the Scalarm client

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the directory or experiment manager
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection or transport level failure
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not the JSON we expected
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The service reported a failure
    #[error("Remote error: {0}")]
    Remote(String),

    /// The directory service returned no experiment managers
    #[error("Not found: {0}")]
    NotFound(String),

    /// A service call was made before the experiment manager was located
    #[error("Experiment manager address has not been resolved")]
    NotLocated,

    /// The configured CA certificate could not be loaded
    #[error("Invalid certificate {}: {reason}", path.display())]
    Certificate {
        /// Path of the PEM file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Writing a downloaded archive failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Create a remote error from a message
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    /// Check if the service itself reported the failure
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Check if this is a network or connection failure
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
