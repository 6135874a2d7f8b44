//! Readiness multiplexer for the capture loop.
//!
//! One `poll(2)` call watches the serial channel for readable data and the
//! sink for error readiness. A rendezvous pipe whose reader went away
//! manifests as `POLLERR`/`POLLHUP` on the write end, not as an exception at
//! write time, so the loop learns about a detached consumer without having a
//! packet to send.

#![allow(unsafe_code)]

use crate::error::{Error, Result};
use std::io;
use std::os::unix::io::RawFd;

/// What the multiplexer reported ready.
#[derive(Debug, Clone, Copy)]
pub struct Readiness {
    /// The serial channel has bytes to read (or an error the next read will
    /// surface).
    pub source_readable: bool,
    /// The sink's reader went away; the session is over.
    pub sink_gone: bool,
}

/// Block until the source is readable or the sink becomes unusable.
///
/// Returns [`Error::Interrupted`] when the embedding application requested a
/// stop while we were waiting.
pub fn wait(source: RawFd, sink: RawFd) -> Result<Readiness> {
    let mut fds = [
        libc::pollfd {
            fd: source,
            events: libc::POLLIN,
            revents: 0,
        },
        libc::pollfd {
            fd: sink,
            // POLLERR/POLLHUP are always delivered; nothing to request.
            events: 0,
            revents: 0,
        },
    ];

    loop {
        // SAFETY: fds is a valid array of initialized pollfd structs;
        // blocking indefinitely is intentional.
        let ret = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };

        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                if crate::is_interrupt_requested() {
                    return Err(Error::Interrupted);
                }
                continue; // EINTR - retry
            }
            return Err(Error::Io(err));
        }

        let sink_gone = fds[1].revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0;
        // A source error is reported as readable so the next read surfaces it.
        let source_readable =
            fds[0].revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0;

        if sink_gone || source_readable {
            return Ok(Readiness {
                source_readable,
                sink_gone,
            });
        }
    }
}
