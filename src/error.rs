//! Error types for the bridge
//!
//! Only conditions that end the process live here. Lines that are skipped
//! and failed posts are ordinary values handled inside the forwarder loop.

use thiserror::Error;

/// Fatal bridge errors
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The serial device could not be opened
    #[error("failed to open serial port {port}: {reason}")]
    PortUnavailable { port: String, reason: String },

    /// Serial ports could not be enumerated
    #[error("failed to enumerate serial ports: {0}")]
    PortEnumeration(String),

    /// The configuration was rejected before startup
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
