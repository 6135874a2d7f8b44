//! Human-readable hex sink.
//!
//! One line per packet: the payload as lowercase hex, newline-terminated.
//! There is no stream header.

use crate::error::{Error, Result};
use crate::sink::Sink;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::os::unix::io::{AsRawFd, RawFd};

/// Sink that renders packets as hex lines.
pub struct HexSink<W: Write + AsRawFd> {
    dest: Option<W>,
}

impl HexSink<io::Stdout> {
    /// Wrap the standard output stream.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + AsRawFd> HexSink<W> {
    /// Wrap an already-open destination.
    pub fn new(dest: W) -> Self {
        Self { dest: Some(dest) }
    }
}

/// Encode a payload as one lowercase-hex line.
pub(crate) fn hex_line(payload: &[u8]) -> String {
    let mut line = String::with_capacity(payload.len() * 2 + 1);
    for byte in payload {
        let _ = write!(line, "{byte:02x}");
    }
    line.push('\n');
    line
}

impl<W: Write + AsRawFd> Sink for HexSink<W> {
    fn write_header(&mut self) -> Result<()> {
        // The hex encoding has no stream header.
        Ok(())
    }

    fn write_packet(&mut self, payload: &[u8]) -> Result<()> {
        let dest = self.dest.as_mut().ok_or(Error::SinkClosed)?;
        dest.write_all(hex_line(payload).as_bytes())
            .map_err(Error::from_sink_write)?;
        dest.flush().map_err(Error::from_sink_write)?;
        Ok(())
    }

    fn pollable_fd(&self) -> Result<RawFd> {
        self.dest
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or(Error::SinkClosed)
    }

    fn close(&mut self) -> Result<()> {
        self.dest.take();
        Ok(())
    }
}
