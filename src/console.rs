//! Operator-facing status lines
//!
//! Human-readable only. Diagnostics that are not meant for the operator go
//! through `log` instead.

use crate::config::BridgeConfig;
use crate::forwarder::RunSummary;
use chrono::Local;
use colored::{ColoredString, Colorize};
use std::fmt;
use std::io::{self, Write};

pub struct Console<W: Write> {
    out: W,
    show_timestamps: bool,
}

impl Console<io::Stdout> {
    pub fn stdout(show_timestamps: bool) -> Self {
        Self::new(io::stdout(), show_timestamps)
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W, show_timestamps: bool) -> Self {
        Self {
            out,
            show_timestamps,
        }
    }

    /// Write one status line. A closed stdout must not stop forwarding, so
    /// write errors are dropped.
    fn line(&mut self, tag: ColoredString, args: fmt::Arguments<'_>) {
        let mut output = String::new();
        if self.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S%.3f");
            output.push_str(&format!("{} ", timestamp.to_string().dimmed()));
        }
        output.push_str(&format!("{} {}", tag, args));
        let _ = writeln!(self.out, "{}", output);
    }

    pub fn opening(&mut self, config: &BridgeConfig) {
        self.line(
            "[*]".cyan().bold(),
            format_args!(
                "Opening {} at {} baud...",
                config.port.port_path, config.port.baud_rate
            ),
        );
    }

    pub fn open_failed(&mut self, err: &dyn fmt::Display) {
        self.line("[ERROR]".red().bold(), format_args!("{}", err));
        let _ = writeln!(self.out, "\n{}", "Tips:".cyan().bold());
        let _ = writeln!(self.out, "  1. Close any other serial monitor holding the port");
        let _ = writeln!(self.out, "  2. Verify the port name (serial-http-bridge ports)");
        let _ = writeln!(self.out, "  3. Check permissions: sudo usermod -aG dialout $USER");
    }

    pub fn running(&mut self, config: &BridgeConfig) {
        self.line(
            "[OK]".green().bold(),
            format_args!("Forwarding JSON lines to: {}", config.endpoint),
        );
        let _ = writeln!(self.out, "{}", "Press Ctrl+C to stop.".yellow());
    }

    pub fn forwarded(&mut self, status: u16, line_len: usize) {
        let tag = if (200..300).contains(&status) {
            "[TX]".green().bold()
        } else {
            "[TX]".yellow().bold()
        };
        self.line(tag, format_args!("POST {} bytes={}", status, line_len));
    }

    pub fn post_failed(&mut self, err: &dyn fmt::Display) {
        self.line("[ERROR]".red().bold(), format_args!("HTTP error: {}", err));
    }

    pub fn read_failed(&mut self, err: &dyn fmt::Display) {
        self.line(
            "[ERROR]".red().bold(),
            format_args!("Read error: {} (repeats suppressed until reads recover)", err),
        );
    }

    pub fn read_recovered(&mut self, failures: u64) {
        self.line(
            "[OK]".green().bold(),
            format_args!("Serial reads recovered after {} errors", failures),
        );
    }

    pub fn farewell(&mut self, summary: &RunSummary) {
        let _ = writeln!(self.out, "\n{}", "Exiting...".yellow());
        let _ = writeln!(self.out, "{}", "=".repeat(60).dimmed());
        let _ = writeln!(self.out, "Lines read: {}", summary.lines_read);
        let _ = writeln!(self.out, "Lines skipped: {}", summary.skipped);
        let _ = writeln!(self.out, "Payloads forwarded: {}", summary.forwarded);
        let _ = writeln!(
            self.out,
            "HTTP errors: {}",
            if summary.post_failures > 0 {
                summary.post_failures.to_string().red().bold().to_string()
            } else {
                summary.post_failures.to_string().green().to_string()
            }
        );
        if summary.read_errors > 0 {
            let _ = writeln!(self.out, "Serial read errors: {}", summary.read_errors);
        }
        let _ = writeln!(self.out, "{}", "=".repeat(60).dimmed());
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut Console<&mut Vec<u8>>)) -> String {
        let mut buf = Vec::new();
        {
            let mut console = Console::new(&mut buf, false);
            f(&mut console);
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_forwarded_line() {
        let out = render(|c| c.forwarded(200, 42));
        assert!(out.contains("POST 200 bytes=42"));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_open_failure_has_tips() {
        let out = render(|c| c.open_failed(&"failed to open serial port COM6: busy"));
        assert!(out.contains("failed to open serial port COM6: busy"));
        assert!(out.contains("Tips:"));
    }

    #[test]
    fn test_farewell_reports_counts() {
        let summary = RunSummary {
            lines_read: 7,
            skipped: 3,
            forwarded: 3,
            post_failures: 1,
            read_errors: 0,
        };
        let out = render(|c| c.farewell(&summary));
        assert!(out.contains("Exiting..."));
        assert!(out.contains("Lines read: 7"));
        assert!(out.contains("Payloads forwarded: 3"));
        assert!(!out.contains("Serial read errors"));
    }

    #[test]
    fn test_timestamps_prefix() {
        let mut buf = Vec::new();
        Console::new(&mut buf, true).post_failed(&"timed out");
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("HTTP error: timed out"));
        assert!(out.contains(':'));
    }
}
