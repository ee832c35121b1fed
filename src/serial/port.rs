//! Serial port configuration and connection management
//!
//! Opens the telemetry device and reads newline-delimited lines from it.

use crate::error::{BridgeError, Result};
use colored::Colorize;
use serialport::{
    DataBits, FlowControl, Parity, SerialPort, SerialPortInfo, SerialPortType, StopBits,
};
use std::io::{self, Read};
use std::time::Duration;

/// Default baud rate of the telemetry firmware
pub const DEFAULT_BAUD: u32 = 115200;

/// Default serial device name
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM6";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Where and how fast to read; framing is fixed at 8N1 without flow control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfig {
    /// Serial port path (e.g., /dev/ttyUSB0, COM6)
    pub port_path: String,
    pub baud_rate: u32,
    /// Read timeout; an idle line returns nothing after this long
    pub timeout: Duration,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

impl PortConfig {
    pub fn new(port_path: &str) -> Self {
        Self {
            port_path: port_path.to_string(),
            baud_rate: DEFAULT_BAUD,
            timeout: Duration::from_secs(1),
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Open serial link to the telemetry device
pub struct SerialConnection {
    port: Box<dyn SerialPort>,
    config: PortConfig,
}

impl SerialConnection {
    /// Open a serial connection with the given configuration
    pub fn open(config: PortConfig) -> Result<Self> {
        let port = serialport::new(&config.port_path, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|e| BridgeError::PortUnavailable {
                port: config.port_path.clone(),
                reason: e.to_string(),
            })?;

        log::debug!(
            "opened {} at {} baud (timeout {:?})",
            config.port_path,
            config.baud_rate,
            config.timeout
        );

        Ok(Self { port, config })
    }

    /// Get the port configuration
    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    /// Read raw bytes up to the next newline.
    ///
    /// Returns `Ok(None)` when nothing arrived before the timeout. A line cut
    /// short by the timeout is returned as-is. The terminator and a trailing
    /// carriage return are not included.
    pub fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        read_line_from(&mut self.port)
    }
}

/// Byte-at-a-time line reader shared by the serial connection and tests
pub(crate) fn read_line_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut buffer = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        match reader.read(&mut byte) {
            Ok(1) => {
                if byte[0] == b'\n' {
                    break;
                }
                buffer.push(byte[0]);
            }
            Ok(_) => {
                if buffer.is_empty() {
                    return Ok(None);
                }
                break;
            }
            Err(ref e)
                if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) =>
            {
                if buffer.is_empty() {
                    return Ok(None);
                }
                break;
            }
            Err(e) => return Err(e),
        }
    }

    // Handle carriage returns
    if buffer.last() == Some(&b'\r') {
        buffer.pop();
    }

    Ok(Some(buffer))
}

/// USB identity of a port, when the OS reports one
#[derive(Debug, Clone, Default)]
pub struct UsbIdentity {
    pub vid: u16,
    pub pid: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

/// A serial port found on this machine
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub path: String,
    /// Bus the port sits on, as shown to the operator
    pub bus: &'static str,
    pub usb: Option<UsbIdentity>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (bus, usb) = match info.port_type {
            SerialPortType::UsbPort(usb) => (
                "USB",
                Some(UsbIdentity {
                    vid: usb.vid,
                    pid: usb.pid,
                    manufacturer: usb.manufacturer,
                    product: usb.product,
                    serial_number: usb.serial_number,
                }),
            ),
            SerialPortType::PciPort => ("PCI", None),
            SerialPortType::BluetoothPort => ("Bluetooth", None),
            SerialPortType::Unknown => ("unknown", None),
        };

        Self {
            path: info.port_name,
            bus,
            usb,
        }
    }
}

impl PortInfo {
    /// Whether this looks like a USB-to-serial adapter or a USB CDC board
    pub fn is_usb_adapter(&self) -> bool {
        let Some(usb) = &self.usb else {
            return false;
        };

        let known_bridge = match usb.vid {
            0x0403 => true,                                     // FTDI
            0x10c4 => matches!(usb.pid, 0xea60 | 0xea70),       // CP210x
            0x1a86 => matches!(usb.pid, 0x7523 | 0x5523 | 0x55d4), // CH340/CH341/CH9102
            0x303a => true,                                     // Espressif native USB
            _ => false,
        };

        known_bridge
            || usb.product.as_deref().is_some_and(|prod| {
                let prod = prod.to_lowercase();
                prod.contains("serial") || prod.contains("uart") || prod.contains("ch340")
            })
    }
}

/// List all available serial ports
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()
        .map_err(|e| BridgeError::PortEnumeration(e.to_string()))?;

    Ok(ports.into_iter().map(PortInfo::from).collect())
}

/// Print formatted list of available serial ports
pub fn print_ports() -> Result<()> {
    let ports = list_ports()?;

    if ports.is_empty() {
        println!("{}", "No serial ports found".yellow());
        println!("\n{}", "Troubleshooting tips:".cyan().bold());
        println!("  1. Connect the telemetry device over USB");
        println!("  2. Check if the device is recognized: ls -la /dev/ttyUSB* /dev/ttyACM*");
        println!("  3. Add your user to the 'dialout' group: sudo usermod -aG dialout $USER");
        return Ok(());
    }

    println!("{}", "Available Serial Ports:".green().bold());
    println!("{}", "=".repeat(60));

    for port in &ports {
        let marker = if port.is_usb_adapter() {
            " [likely device]".green().to_string()
        } else {
            String::new()
        };
        println!("\n{}: {}{}", "Port".cyan(), port.path.white().bold(), marker);
        println!("  Bus: {}", port.bus);

        if let Some(ref usb) = port.usb {
            println!("  VID:PID: {:04x}:{:04x}", usb.vid, usb.pid);
            for (label, value) in [
                ("Manufacturer", &usb.manufacturer),
                ("Product", &usb.product),
                ("Serial", &usb.serial_number),
            ] {
                if let Some(value) = value {
                    println!("  {}: {}", label, value);
                }
            }
        }
    }

    println!("\n{}", "=".repeat(60));
    println!(
        "{}",
        "Use: serial-http-bridge --port <PORT> to start forwarding".yellow()
    );

    Ok(())
}
