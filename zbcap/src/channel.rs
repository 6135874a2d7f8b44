//! Blocking serial channel to the sniffer device.
//!
//! The channel is a plain byte connection: exact-count reads block until the
//! requested bytes have arrived, writes go out verbatim with no framing.
//! Waiting for *readiness* (as opposed to completion of a requested read) is
//! the capture loop's job, not the channel's; see [`crate::poll`].

use crate::error::Result;
use serialport::{DataBits, FlowControl, Parity, StopBits, TTYPort};
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

/// An open serial connection, exclusively owned by the active session.
pub struct SerialChannel {
    port: TTYPort,
    name: String,
    baud_rate: u32,
}

impl SerialChannel {
    /// Internal read deadline.
    ///
    /// The `serialport` crate requires one; the channel's [`Read`] impl
    /// absorbs it by retrying, so reads observed through the channel never
    /// time out on their own.
    const READ_TIMEOUT: Duration = Duration::from_millis(1000);

    /// Open a serial channel on the given port at the given speed (8N1, no
    /// flow control).
    ///
    /// The native port type is used so the file descriptor can be registered
    /// with the readiness multiplexer.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Self::READ_TIMEOUT)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native()?;

        Ok(Self {
            port,
            name: port_name.to_string(),
            baud_rate,
        })
    }

    /// Get the port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the configured baud rate.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Release the connection.
    pub fn close(self) {
        drop(self);
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.port.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    // Expired internal deadline, not a channel error. Retried
                    // unless the embedding application asked us to stop.
                    if crate::is_interrupt_requested() {
                        return Err(io::Error::from(io::ErrorKind::Interrupted));
                    }
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    if crate::is_interrupt_requested() {
                        return Err(e);
                    }
                    // spurious EINTR - retry
                },
                Err(e) => return Err(e),
            }
        }
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl AsRawFd for SerialChannel {
    fn as_raw_fd(&self) -> RawFd {
        self.port.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_port_fails() {
        assert!(SerialChannel::open("/dev/zbcap-does-not-exist", 115200).is_err());
    }
}
