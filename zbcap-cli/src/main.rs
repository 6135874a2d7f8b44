//! zbcap CLI - capture bridge for serial-attached IEEE 802.15.4 sniffers.
//!
//! Arms the sniffer device over the serial line and streams captured frames
//! to a pcap file, a named pipe for a live Wireshark, or the console as hex
//! lines. The capture keeps running across consumer restarts; Ctrl-C stops
//! it.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use env_logger::Env;
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use zbcap::{CaptureConfig, HandshakeConfig, OutputMode};

/// zbcap - bridge a serial 802.15.4 sniffer into pcap.
///
/// Environment variables:
///   ZBCAP_PORT   - Default serial port
///   ZBCAP_BAUD   - Default baud rate (default: 115200)
#[derive(Parser)]
#[command(name = "zbcap")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Examples:\n  zbcap /dev/ttyUSB0 -p /tmp/zbcap.pipe\n  \
                        wireshark -k -i /tmp/zbcap.pipe")]
struct Cli {
    /// Serial port the sniffer is attached to.
    #[arg(env = "ZBCAP_PORT", required_unless_present = "list_ports")]
    port: Option<String>,

    /// Baud rate.
    #[arg(short, long, default_value_t = zbcap::DEFAULT_BAUD, env = "ZBCAP_BAUD")]
    baud: u32,

    /// Stream pcap into a named pipe at PATH, created if absent; waits for a
    /// reader (e.g. wireshark -k -i PATH) before capturing.
    #[arg(short = 'p', long = "pipe", value_name = "PATH", conflicts_with = "write")]
    pipe: Option<PathBuf>,

    /// Write a pcap capture file to PATH (created/truncated).
    ///
    /// Without --pipe or --write, frames go to stdout as hex lines.
    #[arg(short = 'w', long = "write", value_name = "PATH")]
    write: Option<PathBuf>,

    /// Seconds to wait after opening the port before arming the device.
    #[arg(short, long, default_value_t = 2, value_name = "SECS")]
    delay: u64,

    /// Arm command sent to the device, as a hex byte string (empty disables).
    #[arg(long, value_name = "HEX", value_parser = parse_hex_bytes)]
    init: Option<HexBytes>,

    /// Confirmation marker expected back from the device, as a hex byte
    /// string (empty disables).
    #[arg(long, value_name = "HEX", value_parser = parse_hex_bytes)]
    marker: Option<HexBytes>,

    /// List available serial ports and exit.
    #[arg(long)]
    list_ports: bool,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long)]
    quiet: bool,
}

/// Byte string given on the command line as hex.
///
/// Newtype so clap treats the value as one scalar argument rather than a
/// list of `u8` values.
#[derive(Clone, Debug)]
struct HexBytes(Vec<u8>);

/// Parse a hex byte string like "736e6966" into bytes. Empty is allowed and
/// means "disable this handshake step".
fn parse_hex_bytes(s: &str) -> Result<HexBytes, String> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return Err("hex byte string needs an even number of digits".to_string());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| format!("invalid hex byte: {e}"))
        })
        .collect::<Result<Vec<u8>, String>>()
        .map(HexBytes)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            _ => "debug",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();

    debug!("zbcap v{}", env!("CARGO_PKG_VERSION"));

    if cli.list_ports {
        return list_ports();
    }

    // Wire Ctrl-C into the library's stop condition.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl-C handler")?;
    }
    zbcap::set_interrupt_checker(move || interrupted.load(Ordering::SeqCst));

    let config = build_config(&cli)?;

    if !cli.quiet {
        let target = match &config.output {
            OutputMode::Console => "stdout (hex lines)".to_string(),
            OutputMode::File(path) => format!("capture file {}", path.display()),
            OutputMode::Fifo(path) => format!("pipe {}", path.display()),
        };
        eprintln!(
            "{} Capturing {} at {} baud into {}",
            style("●").cyan(),
            style(&config.port).green(),
            config.baud,
            target
        );
        eprintln!("{}", style("Press Ctrl-C to stop.").dim());
    }

    zbcap::supervisor::run(&config).context("Capture failed")
}

/// Assemble the immutable capture configuration from CLI arguments.
fn build_config(cli: &Cli) -> Result<CaptureConfig> {
    let port = cli
        .port
        .clone()
        .context("No serial port given (argument or ZBCAP_PORT)")?;

    let output = if let Some(path) = &cli.pipe {
        OutputMode::Fifo(path.clone())
    } else if let Some(path) = &cli.write {
        OutputMode::File(path.clone())
    } else {
        OutputMode::Console
    };

    let handshake = HandshakeConfig {
        delay: Duration::from_secs(cli.delay),
        arm_command: cli
            .init
            .clone()
            .map_or_else(|| zbcap::DEFAULT_ARM_COMMAND.to_vec(), |hex| hex.0),
        confirm_marker: cli
            .marker
            .clone()
            .map_or_else(|| zbcap::DEFAULT_CONFIRM_MARKER.to_vec(), |hex| hex.0),
    };

    Ok(CaptureConfig::new(port)
        .with_baud(cli.baud)
        .with_output(output)
        .with_handshake(handshake))
}

/// Print available serial ports.
fn list_ports() -> Result<()> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;

    if ports.is_empty() {
        eprintln!("No serial ports found.");
        return Ok(());
    }

    for port in ports {
        match port.port_type {
            serialport::SerialPortType::UsbPort(info) => {
                let product = info.product.unwrap_or_else(|| "USB serial".to_string());
                println!(
                    "{}  {} ({:04x}:{:04x})",
                    port.port_name, product, info.vid, info.pid
                );
            },
            _ => println!("{}", port.port_name),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_bytes_round_trip() {
        assert_eq!(parse_hex_bytes("736e6966").unwrap().0, b"snif");
        assert_eq!(parse_hex_bytes("").unwrap().0, Vec::<u8>::new());
        assert!(parse_hex_bytes("abc").is_err());
        assert!(parse_hex_bytes("zz").is_err());
    }

    #[test]
    fn test_build_config_defaults_to_console_hex() {
        let cli = Cli::parse_from(["zbcap", "/dev/ttyUSB0"]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.output, OutputMode::Console);
        assert_eq!(config.baud, zbcap::DEFAULT_BAUD);
        assert_eq!(config.handshake.arm_command, zbcap::DEFAULT_ARM_COMMAND);
    }

    #[test]
    fn test_build_config_handshake_overrides() {
        let cli = Cli::parse_from([
            "zbcap",
            "/dev/ttyUSB0",
            "--delay",
            "0",
            "--init",
            "",
            "--marker",
            "534e4946",
        ]);
        let config = build_config(&cli).unwrap();
        assert!(config.handshake.delay.is_zero());
        assert!(config.handshake.arm_command.is_empty());
        assert_eq!(config.handshake.confirm_marker, b"SNIF");
    }

    #[test]
    fn test_pipe_and_write_conflict() {
        let result = Cli::try_parse_from([
            "zbcap",
            "/dev/ttyUSB0",
            "--pipe",
            "/tmp/p",
            "--write",
            "/tmp/f",
        ]);
        assert!(result.is_err());
    }
}
