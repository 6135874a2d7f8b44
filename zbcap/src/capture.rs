//! The capture loop.
//!
//! Extracts length-prefixed frames from the serial byte stream and forwards
//! them to the sink, in arrival order, until the sink becomes unusable. Wire
//! framing is one length byte (0–255) followed by exactly that many raw
//! bytes; there are no markers, checksums, or retransmissions, and the frame
//! payload is treated as opaque.

use crate::error::{Error, Result};
use crate::poll;
use crate::sink::Sink;
use log::{debug, info, trace};
use std::io::{self, Read};
use std::os::unix::io::AsRawFd;

/// Read one length-prefixed frame.
///
/// Blocks until the length byte and the full declared payload have arrived.
/// A zero-length frame is valid and comes back as an empty payload.
pub fn read_frame<R: Read>(source: &mut R) -> io::Result<Vec<u8>> {
    let mut len = [0u8; 1];
    source.read_exact(&mut len)?;

    let mut payload = vec![0u8; usize::from(len[0])];
    source.read_exact(&mut payload)?;
    Ok(payload)
}

/// Run one capture session: forward frames from `channel` into `sink` until
/// the sink's reader goes away.
///
/// Returns the number of frames seen this session. The sink disappearing
/// (error readiness, or a broken pipe discovered on write) is the normal end
/// of a session; any other I/O failure propagates as fatal.
pub fn run<C: Read + AsRawFd>(channel: &mut C, sink: &mut dyn Sink) -> Result<u64> {
    let mut frames: u64 = 0;

    loop {
        let ready = poll::wait(channel.as_raw_fd(), sink.pollable_fd()?)?;

        if ready.sink_gone {
            debug!("Sink reader went away");
            break;
        }

        if ready.source_readable {
            let payload = read_frame(channel).map_err(Error::from_read)?;
            frames += 1;
            trace!("Frame {frames}: {} bytes", payload.len());

            match sink.write_packet(&payload) {
                Ok(()) => {},
                Err(Error::SinkClosed) => {
                    debug!("Sink closed while writing frame {frames}");
                    break;
                },
                Err(e) => return Err(e),
            }
        }
    }

    info!("Session ended after {frames} frames");
    Ok(frames)
}
