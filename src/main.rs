//! Serial HTTP Bridge
//!
//! Forwards line-delimited JSON telemetry from a serial device to an HTTP
//! ingest endpoint.
//!
//! # Features
//!
//! - **Forwarding**: Every line that is a JSON object is posted as-is; device
//!   debug output and corrupted lines are dropped
//! - **Noise tolerance**: Invalid UTF-8 bytes are removed instead of
//!   discarding the whole line
//! - **Port discovery**: List serial ports and flag likely USB adapters
//!
//! # Usage
//!
//! ```bash
//! # Forward with the built-in defaults
//! serial-http-bridge
//!
//! # Forward from a specific port to a local endpoint
//! serial-http-bridge -p /dev/ttyACM0 -e http://localhost:3000/api/spectrum
//!
//! # List available serial ports
//! serial-http-bridge ports
//! ```

mod config;
mod console;
mod error;
mod forwarder;
mod serial;
mod signal;
mod sink;
mod telemetry;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use config::{BridgeConfig, DEFAULT_ENDPOINT};
use console::Console;
use serial::{PortConfig, SerialConnection};
use sink::HttpSink;

/// Serial HTTP Bridge
///
/// Forward JSON telemetry lines from a serial device to an HTTP endpoint
#[derive(Parser)]
#[command(name = "serial-http-bridge")]
#[command(version = "0.1.0")]
#[command(about = "Forward JSON telemetry lines from a serial device to an HTTP endpoint")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    forward: ForwardArgs,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available serial ports
    Ports,
}

#[derive(Args)]
struct ForwardArgs {
    /// Serial port path (e.g., /dev/ttyUSB0, COM6)
    #[arg(short, long, default_value = serial::port::DEFAULT_PORT)]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value_t = serial::port::DEFAULT_BAUD)]
    baud: u32,

    /// URL each payload is posted to
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Serial read timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    read_timeout_ms: u64,

    /// HTTP request timeout in milliseconds
    #[arg(long, default_value_t = 10_000)]
    request_timeout_ms: u64,

    /// Pause after each post in milliseconds
    #[arg(long, default_value_t = 20)]
    pace_ms: u64,

    /// Disable timestamps
    #[arg(long)]
    no_timestamps: bool,
}

impl ForwardArgs {
    fn into_config(self) -> BridgeConfig {
        let port = PortConfig::new(&self.port)
            .with_baud_rate(self.baud)
            .with_timeout(Duration::from_millis(self.read_timeout_ms));

        BridgeConfig::default()
            .with_port(port)
            .with_endpoint(&self.endpoint)
            .with_request_timeout(Duration::from_millis(self.request_timeout_ms))
            .with_pace(Duration::from_millis(self.pace_ms))
            .with_timestamps(!self.no_timestamps)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Some(Commands::Ports) => serial::port::print_ports().context("Failed to list serial ports"),
        None => handle_forward(cli.forward),
    }
}

fn handle_forward(args: ForwardArgs) -> Result<()> {
    let config = args.into_config();
    config.validate()?;

    let sink = HttpSink::new(&config.endpoint, config.request_timeout)?;
    log::debug!(
        "posting to {} (timeout {:?}, pace {:?})",
        sink.endpoint(),
        config.request_timeout,
        config.pace
    );

    let stop = signal::install().context("Failed to set Ctrl+C handler")?;

    let status = forwarder::run_bridge(
        &config,
        |port| {
            let conn = SerialConnection::open(port.clone())?;
            log::info!(
                "serial link ready on {} at {} baud",
                conn.config().port_path,
                conn.config().baud_rate
            );
            Ok(conn)
        },
        sink,
        Console::stdout(config.show_timestamps),
        stop,
    );

    std::process::exit(status.code());
}
