//! Start-of-capture handshake.
//!
//! Sniffer firmware boots into a command console; it starts streaming frames
//! only after receiving its enable command. The handshake runs once at the
//! start of every session, in a fixed order:
//!
//! 1. **Delay**: give the device time to finish its own boot/reset after the
//!    port was opened.
//! 2. **Arm**: write the enable command verbatim.
//! 3. **Confirm**: scan the incoming stream for the device's banner marker.
//!
//! Each step is skipped when its configured value is zero/empty. The confirm
//! scan has no deadline: a silent device blocks the session indefinitely.

use crate::config::HandshakeConfig;
use crate::error::{Error, Result};
use log::{debug, info};
use std::io::{self, Read, Write};
use std::thread;

/// Run the delay → arm → confirm sequence on an open channel.
pub fn run<C: Read + Write>(channel: &mut C, config: &HandshakeConfig) -> Result<()> {
    if !config.delay.is_zero() {
        debug!("Waiting {:?} for the device to settle", config.delay);
        thread::sleep(config.delay);
    }

    if !config.arm_command.is_empty() {
        debug!("Arming device ({} bytes)", config.arm_command.len());
        channel.write_all(&config.arm_command)?;
        channel.flush()?;
    }

    if !config.confirm_marker.is_empty() {
        debug!("Scanning for confirm marker {:02x?}", config.confirm_marker);
        scan_for_marker(channel, &config.confirm_marker).map_err(Error::from_read)?;
        info!("Device confirmed streaming mode");
    }

    Ok(())
}

/// Consume bytes from `reader` until `marker` appears as a contiguous match.
///
/// The first read pulls `marker.len()` bytes; afterwards the window slides
/// one byte at a time (drop the oldest, append one fresh byte) until it
/// equals the marker. Bytes past the marker are left unread for the capture
/// loop, so nothing at the boundary is dropped or duplicated.
///
/// Blocks until the marker arrives or the reader errors; there is no timeout.
pub fn scan_for_marker<R: Read>(reader: &mut R, marker: &[u8]) -> io::Result<()> {
    let mut window = vec![0u8; marker.len()];
    reader.read_exact(&mut window)?;

    while window != marker {
        window.rotate_left(1);
        let tail = window.len() - 1;
        reader.read_exact(&mut window[tail..])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    #[test]
    fn test_scan_finds_marker_at_start() {
        let mut stream = Cursor::new(b"SNIFrest".to_vec());
        scan_for_marker(&mut stream, b"SNIF").unwrap();
        assert_eq!(stream.position(), 4);
    }

    #[test]
    fn test_scan_consumes_through_marker_only() {
        let mut stream = Cursor::new(b"XXSNIFdata...".to_vec());
        scan_for_marker(&mut stream, b"SNIF").unwrap();
        // Everything after the marker stays unread for the capture loop.
        assert_eq!(stream.position(), 6);
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"data...");
    }

    #[test]
    fn test_scan_handles_partial_marker_prefix() {
        let mut stream = Cursor::new(b"SNSNIFx".to_vec());
        scan_for_marker(&mut stream, b"SNIF").unwrap();
        assert_eq!(stream.position(), 6);
    }

    #[test]
    fn test_scan_errors_when_stream_ends_without_marker() {
        let mut stream = Cursor::new(b"nothing here".to_vec());
        let err = scan_for_marker(&mut stream, b"SNIF").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    /// In-memory duplex: reads come from a canned script, writes are
    /// recorded.
    struct ScriptedChannel {
        incoming: Cursor<Vec<u8>>,
        sent: Vec<u8>,
    }

    impl Read for ScriptedChannel {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.incoming.read(buf)
        }
    }

    impl Write for ScriptedChannel {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.sent.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_run_arms_then_confirms() {
        let mut channel = ScriptedChannel {
            incoming: Cursor::new(b"bootlog SNIF\x04abcd".to_vec()),
            sent: Vec::new(),
        };
        let config = HandshakeConfig {
            delay: Duration::ZERO,
            arm_command: b"snif\r\n".to_vec(),
            confirm_marker: b"SNIF".to_vec(),
        };

        run(&mut channel, &config).unwrap();

        assert_eq!(channel.sent, b"snif\r\n");
        // The first frame (length 4) is still waiting in the stream.
        assert_eq!(channel.incoming.position(), 12);
    }

    #[test]
    fn test_run_skips_disabled_steps() {
        let mut channel = ScriptedChannel {
            incoming: Cursor::new(Vec::new()),
            sent: Vec::new(),
        };
        let config = HandshakeConfig {
            delay: Duration::ZERO,
            arm_command: Vec::new(),
            confirm_marker: Vec::new(),
        };

        run(&mut channel, &config).unwrap();

        assert!(channel.sent.is_empty());
    }
}
