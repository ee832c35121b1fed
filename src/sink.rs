//! Forwarding endpoint
//!
//! [`TelemetrySink`] is the seam between the loop and the network so the
//! loop can be driven without a live endpoint.

use crate::error::Result;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Transport-level failure of a single post
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

/// Destination for decoded telemetry payloads
pub trait TelemetrySink {
    /// Post one payload and return the HTTP status code of the response.
    ///
    /// Any response counts as delivered; only transport failures are errors.
    fn post(&mut self, payload: &Value) -> std::result::Result<u16, SinkError>;
}

/// Blocking HTTP client posting JSON to a fixed URL
pub struct HttpSink {
    client: Client,
    endpoint: String,
}

impl HttpSink {
    /// Build a client with the given per-request timeout
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TelemetrySink for HttpSink {
    fn post(&mut self, payload: &Value) -> std::result::Result<u16, SinkError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .map_err(|e| SinkError(describe(&e)))?;

        Ok(resp.status().as_u16())
    }
}

/// Flatten a reqwest error and its sources into one line
fn describe(err: &reqwest::Error) -> String {
    let mut msg = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
