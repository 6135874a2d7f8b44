//! Session supervisor.
//!
//! A session is one full sink-open → handshake → capture → teardown
//! lifecycle. The supervisor runs sessions back to back, forever: a closed
//! rendezvous pipe followed by a new reader attaching (a restarted Wireshark,
//! say) is the designed normal-operation pattern, so there is no backoff and
//! no restart cap. The only stop condition is the interrupt checker
//! registered via [`crate::set_interrupt_checker`].

use crate::capture;
use crate::channel::SerialChannel;
use crate::config::CaptureConfig;
use crate::error::{Error, Result};
use crate::handshake;
use crate::sink;
use log::{debug, info};

/// Run capture sessions until interrupted.
///
/// Expected session endings (the sink's reader going away) restart a fresh
/// session immediately; a requested interrupt returns `Ok(())` once the
/// current session's resources are released; anything else is fatal and
/// propagates.
pub fn run(config: &CaptureConfig) -> Result<()> {
    loop {
        if crate::is_interrupt_requested() {
            debug!("Interrupt requested; stopping supervisor");
            return Ok(());
        }

        match run_session(config) {
            Ok(frames) => {
                info!("Restarting capture after {frames} frames");
            },
            Err(Error::Interrupted) => {
                debug!("Interrupted mid-session");
                return Ok(());
            },
            Err(e) if e.is_session_end() => {
                info!("Restarting capture: {e}");
            },
            Err(e) => return Err(e),
        }
    }
}

/// Run one session; returns its final frame count.
///
/// Every session starts from scratch: fresh sink, fresh serial channel, full
/// handshake. Nothing carries over from the previous session except the
/// shared immutable configuration. Both resources are released before this
/// returns, on every path (explicitly on success, by drop on error).
pub fn run_session(config: &CaptureConfig) -> Result<u64> {
    let mut sink = sink::open(config)?;
    sink.write_header()?;

    let mut channel = SerialChannel::open(&config.port, config.baud)?;
    debug!("Opened {} at {} baud", channel.name(), channel.baud_rate());

    handshake::run(&mut channel, &config.handshake)?;

    let frames = capture::run(&mut channel, sink.as_mut())?;

    channel.close();
    sink.close()?;
    Ok(frames)
}
