//! Capture configuration.
//!
//! One immutable [`CaptureConfig`] is built at startup and owned by the
//! session supervisor; every session shares it and nothing else.

use std::path::PathBuf;
use std::time::Duration;

/// Default baud rate for sniffer devices.
pub const DEFAULT_BAUD: u32 = 115200;

/// Default settle delay before arming the device.
pub const DEFAULT_HANDSHAKE_DELAY: Duration = Duration::from_secs(2);

/// Default command that switches the device into streaming mode.
pub const DEFAULT_ARM_COMMAND: &[u8] = b"snif\r\n";

/// Default banner the device echoes once streaming has started.
pub const DEFAULT_CONFIRM_MARKER: &[u8] = b"SNIF";

/// Where captured packets go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Hex lines on standard output.
    Console,
    /// pcap capture file at the given path (created/truncated).
    File(PathBuf),
    /// pcap stream over a named pipe at the given path, created if absent.
    ///
    /// Opening blocks until a reader (e.g. `wireshark -k -i <path>`)
    /// attaches.
    Fifo(PathBuf),
}

/// Handshake parameters. A zero/empty value disables the matching step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// Settle time before anything is sent, giving the device room to finish
    /// its own boot after the port opened.
    pub delay: Duration,
    /// Bytes written verbatim to switch the device into streaming mode.
    pub arm_command: Vec<u8>,
    /// Marker scanned for in the incoming stream to confirm streaming
    /// started.
    pub confirm_marker: Vec<u8>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_HANDSHAKE_DELAY,
            arm_command: DEFAULT_ARM_COMMAND.to_vec(),
            confirm_marker: DEFAULT_CONFIRM_MARKER.to_vec(),
        }
    }
}

/// Immutable capture configuration, created once at startup.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Serial port name/path (e.g., "/dev/ttyUSB0").
    pub port: String,
    /// Baud rate.
    pub baud: u32,
    /// Output destination and encoding.
    pub output: OutputMode,
    /// Start-of-capture handshake parameters.
    pub handshake: HandshakeConfig,
}

impl CaptureConfig {
    /// Create a configuration for the given port with defaults everywhere
    /// else (115200 baud, console output, default handshake).
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud: DEFAULT_BAUD,
            output: OutputMode::Console,
            handshake: HandshakeConfig::default(),
        }
    }

    /// Set the baud rate.
    #[must_use]
    pub fn with_baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }

    /// Set the output mode.
    #[must_use]
    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Set the handshake parameters.
    #[must_use]
    pub fn with_handshake(mut self, handshake: HandshakeConfig) -> Self {
        self.handshake = handshake;
        self
    }
}
