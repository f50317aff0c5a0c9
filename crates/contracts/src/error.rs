//! Layered error definitions
//!
//! Categorized by source: config / connection / dispatch / codec / io

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Malformed or missing parameter
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Frame Source Errors =====
    /// Frame source could not be reached (fatal at startup)
    #[error("connection error for '{address}': {message}")]
    Connection { address: String, message: String },

    /// Frame source receive loop failed
    #[error("frame source '{source_name}' receive error: {message}")]
    Receive {
        source_name: String,
        message: String,
    },

    // ===== Dispatch Errors =====
    /// Channel could not be advertised on the bus
    #[error("sink '{sink_name}' failed to advertise '{topic}': {message}")]
    Advertise {
        sink_name: String,
        topic: String,
        message: String,
    },

    /// Message could not be published (per entity, recoverable)
    #[error("sink '{sink_name}' failed to publish on '{topic}': {message}")]
    Publish {
        sink_name: String,
        topic: String,
        message: String,
    },

    /// Mean marker size requested over an empty marker set
    #[error("degenerate frame at t={timestamp}: no markers to aggregate")]
    DegenerateFrame { timestamp: f64 },

    // ===== Codec Errors =====
    /// Wire encode/decode error
    #[error("codec error ({format}): {message}")]
    Codec {
        format: &'static str,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create connection error
    pub fn connection(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create receive error
    pub fn receive(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Receive {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create advertise error
    pub fn advertise(
        sink_name: impl Into<String>,
        topic: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Advertise {
            sink_name: sink_name.into(),
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create publish error
    pub fn publish(
        sink_name: impl Into<String>,
        topic: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Publish {
            sink_name: sink_name.into(),
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create codec error
    pub fn codec(format: &'static str, message: impl Into<String>) -> Self {
        Self::Codec {
            format,
            message: message.into(),
        }
    }

    /// Whether the error should stop the process
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Receive { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = ContractError::publish("udp", "/mocap/markers/3", "queue full");
        assert_eq!(
            err.to_string(),
            "sink 'udp' failed to publish on '/mocap/markers/3': queue full"
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_connection_is_fatal() {
        let err = ContractError::connection("tracker:1511", "no route to host");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("tracker:1511"));
    }
}
