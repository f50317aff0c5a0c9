//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Option combination that cannot run
    #[error("Invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Frame source could not be reached
    #[error("Failed to connect to frame source {server}: {message}")]
    SourceConnection { server: String, message: String },

    /// Receive loop ended abnormally
    #[error("Frame source stopped: {message}")]
    SourceStopped { message: String },
}

impl CliError {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    pub fn source_connection(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceConnection {
            server: server.into(),
            message: message.into(),
        }
    }

    pub fn source_stopped(message: impl Into<String>) -> Self {
        Self::SourceStopped {
            message: message.into(),
        }
    }
}
