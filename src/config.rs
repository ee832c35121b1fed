//! Bridge configuration
//!
//! Built once at startup from defaults and command-line overrides, then
//! passed by reference into the forwarder.

use crate::error::{BridgeError, Result};
use crate::serial::PortConfig;
use reqwest::Url;
use std::time::Duration;

/// Ingest endpoint of the spectrum dashboard
pub const DEFAULT_ENDPOINT: &str = "https://automacao-industrial-ene-090-xwqc.vercel.app/api/spectrum";

/// Per-request timeout for posts
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after each forward attempt
pub const DEFAULT_PACE: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Serial device settings
    pub port: PortConfig,
    /// URL every payload is posted to
    pub endpoint: String,
    /// Upper bound on one post, including connect
    pub request_timeout: Duration,
    /// Rate limit between forward attempts
    pub pace: Duration,
    /// Prefix console status lines with the local time
    pub show_timestamps: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: PortConfig::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            pace: DEFAULT_PACE,
            show_timestamps: true,
        }
    }
}

impl BridgeConfig {
    pub fn with_port(mut self, port: PortConfig) -> Self {
        self.port = port;
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub fn with_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    /// Reject settings that could never work before touching any device
    pub fn validate(&self) -> Result<()> {
        if self.port.port_path.trim().is_empty() {
            return Err(BridgeError::InvalidConfig("serial port name is empty".into()));
        }
        if self.port.baud_rate == 0 {
            return Err(BridgeError::InvalidConfig("baud rate must be positive".into()));
        }
        if self.port.timeout.is_zero() {
            return Err(BridgeError::InvalidConfig("read timeout must be positive".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(BridgeError::InvalidConfig("request timeout must be positive".into()));
        }

        let url = Url::parse(&self.endpoint).map_err(|e| {
            BridgeError::InvalidConfig(format!("endpoint {:?}: {}", self.endpoint, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BridgeError::InvalidConfig(format!(
                "endpoint must be http or https, got {}",
                url.scheme()
            )));
        }

        Ok(())
    }
}
