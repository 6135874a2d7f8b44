//! Packet sinks.
//!
//! A sink consumes raw frame payloads and serializes them into one of two
//! external representations: the pcap capture-file format ([`PcapSink`]) or
//! human-readable hex lines ([`HexSink`]). The capture loop only sees the
//! [`Sink`] trait.
//!
//! Every sink flushes after each packet. The consumer on the other side of a
//! rendezvous pipe (typically a live Wireshark) must see each packet
//! immediately, and buffering must never hide a disconnect.

pub mod hex;
pub mod pcap;

pub use hex::HexSink;
pub use pcap::PcapSink;

use crate::config::{CaptureConfig, OutputMode};
use crate::error::{Error, Result};
use log::debug;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::os::unix::io::RawFd;
use std::path::Path;

/// Destination abstraction for captured packets.
pub trait Sink {
    /// Emit the global stream header, if the format has one. Called once per
    /// session, before the first packet.
    fn write_header(&mut self) -> Result<()>;

    /// Emit one packet record and flush it through.
    ///
    /// Fails with [`Error::SinkClosed`] when the destination's reader went
    /// away; that ends the session, it is not a crash.
    fn write_packet(&mut self, payload: &[u8]) -> Result<()>;

    /// File descriptor for the readiness multiplexer, which watches it for
    /// error readiness (the pipe reader having gone away).
    fn pollable_fd(&self) -> Result<RawFd>;

    /// Release the underlying destination. Safe to call after an error or a
    /// second time.
    fn close(&mut self) -> Result<()>;
}

/// Open the sink selected by the configuration.
///
/// For [`OutputMode::Fifo`] this blocks until a reader attaches to the pipe.
pub fn open(config: &CaptureConfig) -> Result<Box<dyn Sink>> {
    match &config.output {
        OutputMode::Console => Ok(Box::new(HexSink::stdout())),
        OutputMode::File(path) => Ok(Box::new(PcapSink::create(path)?)),
        OutputMode::Fifo(path) => Ok(Box::new(PcapSink::open_fifo(path)?)),
    }
}

/// Create the named pipe at `path` if it does not exist yet.
///
/// "Already exists" is success, so a pipe left behind by an earlier run (or
/// created by the consumer) is reused as-is. Deleting the pipe afterwards is
/// left to the environment.
pub fn ensure_fifo(path: &Path) -> Result<()> {
    match mkfifo(path, Mode::from_bits_truncate(0o644)) {
        Ok(()) => {
            debug!("Created rendezvous pipe {}", path.display());
            Ok(())
        },
        Err(nix::errno::Errno::EEXIST) => Ok(()),
        Err(errno) => Err(Error::Io(errno.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_fifo_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.pipe");

        ensure_fifo(&path).unwrap();
        ensure_fifo(&path).unwrap();
    }

    #[test]
    fn test_ensure_fifo_fails_on_missing_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("capture.pipe");

        assert!(ensure_fifo(&path).is_err());
    }
}
