//! Serial port access for the telemetry device
//!
//! This module provides functionality for:
//! - Opening the device with a bounded read timeout
//! - Reading newline-delimited telemetry lines
//! - Listing available serial ports

pub mod port;

pub use port::{PortConfig, SerialConnection};
