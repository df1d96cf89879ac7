// Centralized error handling for device administration

use crate::core::config::DeviceConfig;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to the caller of an administrative operation.
///
/// Every variant ends the invocation: it is rendered into the failure
/// result line and the process exits non-zero. Nothing is retried here.
#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Failed to connect to device {host}:{port}: {reason}")]
    ConnectionFailed {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("User with UID {0} not found")]
    RecordNotFound(u16),

    #[error("No available UID found (valid range 1-65534)")]
    AllocationExhausted,

    #[error("Device rejected {operation}: {message}")]
    DeviceRejected {
        operation: &'static str,
        message: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AdminError {
    /// Stable name of the variant, reported as `error_type`.
    pub fn kind(&self) -> &'static str {
        match self {
            AdminError::ConnectionFailed { .. } => "ConnectionFailed",
            AdminError::RecordNotFound(_) => "RecordNotFound",
            AdminError::AllocationExhausted => "AllocationExhausted",
            AdminError::DeviceRejected { .. } => "DeviceRejected",
            AdminError::InvalidInput(_) => "InvalidInput",
        }
    }

    pub fn connection(config: &DeviceConfig, err: ProtocolError) -> Self {
        AdminError::ConnectionFailed {
            host: config.host.clone(),
            port: config.port,
            reason: err.to_string(),
        }
    }

    /// Wrap a protocol fault raised after the session was established.
    /// The device's own message is carried verbatim.
    pub fn rejected(operation: &'static str, err: ProtocolError) -> Self {
        AdminError::DeviceRejected {
            operation,
            message: err.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        AdminError::InvalidInput(message.into())
    }
}

/// Faults of the terminal wire protocol
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out after {0:?} waiting for device")]
    Timeout(Duration),

    #[error("Invalid frame header: {0}")]
    BadFrame(String),

    #[error("Frame of {0} bytes exceeds the accepted maximum")]
    Oversized(u32),

    #[error("Packet too short: expected at least {expected} bytes, got {actual}")]
    ShortPacket { expected: usize, actual: usize },

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Device refused {command} (reply code {code})")]
    Refused { command: &'static str, code: u16 },

    #[error("Unexpected reply code {code} while {stage}")]
    UnexpectedReply { stage: &'static str, code: u16 },

    #[error("Field {field} is {len} bytes, the device accepts at most {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Field {field} must be numeric for this device: '{value}'")]
    NonNumericField { field: &'static str, value: String },

    #[error("User with UID {0} not found in device")]
    UnknownUser(u16),
}
