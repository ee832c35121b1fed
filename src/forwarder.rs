//! Read-validate-forward loop
//!
//! Two states: awaiting the port, where an open failure ends the process
//! with status 1, and running, which only ends when the interrupt flag is
//! raised. Each iteration is independent of the previous one; nothing is
//! retried and nothing is queued.

use crate::config::BridgeConfig;
use crate::console::Console;
use crate::error::Result;
use crate::serial::{PortConfig, SerialConnection};
use crate::signal;
use crate::sink::{SinkError, TelemetrySink};
use crate::telemetry::{self, LineDecision, SkipReason};
use std::io::{self, Write};
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

/// Pause after a failed serial read before trying again
const READ_ERROR_PAUSE: Duration = Duration::from_millis(100);

/// Source of raw telemetry lines
pub trait LineSource {
    /// One line without its terminator, or `None` if the read timed out idle
    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>>;
}

impl LineSource for SerialConnection {
    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        SerialConnection::read_line(self)
    }
}

/// How the bridge ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Ctrl+C observed while running
    Interrupted,
    /// The serial device never opened
    PortUnavailable,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Interrupted => 0,
            ExitStatus::PortUnavailable => 1,
        }
    }
}

/// Counters printed at shutdown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub lines_read: u64,
    pub skipped: u64,
    pub forwarded: u64,
    pub post_failures: u64,
    pub read_errors: u64,
}

/// Result of a single iteration
#[derive(Debug)]
pub enum Step {
    /// Nothing arrived within the read timeout
    Idle,
    Skipped(SkipReason),
    Forwarded { status: u16, line_len: usize },
    PostFailed(SinkError),
    ReadFailed(io::Error),
}

pub struct Forwarder<'a, S, K, W: Write> {
    config: &'a BridgeConfig,
    source: S,
    sink: K,
    console: Console<W>,
    summary: RunSummary,
    /// Consecutive failed reads; only the first of a run is printed
    read_streak: u64,
}

impl<'a, S, K, W> Forwarder<'a, S, K, W>
where
    S: LineSource,
    K: TelemetrySink,
    W: Write,
{
    pub fn new(config: &'a BridgeConfig, source: S, sink: K, console: Console<W>) -> Self {
        Self {
            config,
            source,
            sink,
            console,
            summary: RunSummary::default(),
            read_streak: 0,
        }
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Read one line and forward it if it holds a JSON object
    pub fn step(&mut self) -> Step {
        let raw = match self.source.read_line() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Step::Idle,
            Err(e) => {
                self.summary.read_errors += 1;
                return Step::ReadFailed(e);
            }
        };
        self.summary.lines_read += 1;

        let telemetry = match telemetry::classify(&raw) {
            LineDecision::Forward(telemetry) => telemetry,
            LineDecision::Skip(reason) => {
                self.summary.skipped += 1;
                log::debug!("skipped line ({}): {} bytes", reason, raw.len());
                return Step::Skipped(reason);
            }
        };

        match self.sink.post(&telemetry.payload) {
            Ok(status) => {
                self.summary.forwarded += 1;
                Step::Forwarded {
                    status,
                    line_len: telemetry.line_len,
                }
            }
            Err(e) => {
                self.summary.post_failures += 1;
                Step::PostFailed(e)
            }
        }
    }

    /// Iterate until the interrupt flag is raised, then print the farewell
    pub fn run(mut self, stop: &AtomicBool) -> RunSummary {
        while !signal::requested(stop) {
            let step = self.step();
            if self.read_streak > 0 && !matches!(step, Step::ReadFailed(_)) {
                self.console.read_recovered(self.read_streak);
                self.read_streak = 0;
            }

            match step {
                Step::Idle | Step::Skipped(_) => {}
                Step::Forwarded { status, line_len } => {
                    self.console.forwarded(status, line_len);
                    self.pause(self.config.pace);
                }
                Step::PostFailed(e) => {
                    self.console.post_failed(&e);
                    self.pause(self.config.pace);
                }
                Step::ReadFailed(e) => {
                    if self.read_streak == 0 {
                        self.console.read_failed(&e);
                    } else {
                        log::debug!("read error #{}: {}", self.read_streak + 1, e);
                    }
                    self.read_streak += 1;
                    self.pause(READ_ERROR_PAUSE);
                }
            }
        }

        self.console.farewell(&self.summary);
        self.summary
    }

    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Open the port and run the forwarder until interrupted.
///
/// `open` is only called once; if it fails the sink is never used.
pub fn run_bridge<S, K, W, F>(
    config: &BridgeConfig,
    open: F,
    sink: K,
    mut console: Console<W>,
    stop: &AtomicBool,
) -> ExitStatus
where
    S: LineSource,
    K: TelemetrySink,
    W: Write,
    F: FnOnce(&PortConfig) -> Result<S>,
{
    console.opening(config);
    let source = match open(&config.port) {
        Ok(source) => source,
        Err(e) => {
            console.open_failed(&e);
            return ExitStatus::PortUnavailable;
        }
    };

    console.running(config);
    let summary = Forwarder::new(config, source, sink, console).run(stop);
    log::info!(
        "forwarded {} of {} lines ({} HTTP errors)",
        summary.forwarded,
        summary.lines_read,
        summary.post_failures
    );

    ExitStatus::Interrupted
}
