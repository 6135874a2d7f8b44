//! Error types for zbcap.

use std::io;
use thiserror::Error;

/// Result type for zbcap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for zbcap operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (serial port, file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The sink's reader went away (broken pipe / error readiness).
    ///
    /// This is the normal way a capture session ends, not a failure: the
    /// supervisor reacts by starting a fresh session.
    #[error("Capture sink closed by its reader")]
    SinkClosed,

    /// The embedding application requested a stop (e.g. Ctrl-C).
    #[error("Interrupted")]
    Interrupted,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify an I/O error raised while reading from the serial channel.
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::Interrupted {
            Self::Interrupted
        } else {
            Self::Io(err)
        }
    }

    /// Classify an I/O error raised while writing to a sink.
    ///
    /// A vanished pipe reader surfaces as `BrokenPipe`; everything else is a
    /// real I/O failure.
    pub(crate) fn from_sink_write(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::BrokenPipe {
            Self::SinkClosed
        } else {
            Self::Io(err)
        }
    }

    /// Whether this error ends the session without ending the process.
    pub fn is_session_end(&self) -> bool {
        matches!(self, Self::SinkClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broken_pipe_classifies_as_sink_closed() {
        let err = Error::from_sink_write(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(matches!(err, Error::SinkClosed));
        assert!(err.is_session_end());
    }

    #[test]
    fn test_other_write_errors_stay_fatal() {
        let err = Error::from_sink_write(io::Error::from(io::ErrorKind::StorageFull));
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_session_end());
    }

    #[test]
    fn test_interrupted_read_classifies_as_interrupted() {
        let err = Error::from_read(io::Error::from(io::ErrorKind::Interrupted));
        assert!(matches!(err, Error::Interrupted));
    }
}
