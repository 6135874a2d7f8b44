//! # zbcap
//!
//! A capture bridge for serial-attached IEEE 802.15.4 sniffer devices.
//!
//! The sniffer hardware streams captured radio frames over a serial line as
//! length-prefixed byte blobs. This crate arms the device, extracts the
//! frames, and hands them to a sink:
//!
//! - a pcap capture file (link type 195, IEEE 802.15.4 with FCS),
//! - a rendezvous named pipe feeding a live `wireshark -k -i <pipe>`,
//! - or the console, one hex line per frame.
//!
//! Sessions restart automatically when the pipe's reader goes away, so the
//! consumer can be stopped and relaunched freely while the bridge keeps
//! running.
//!
//! ## Example
//!
//! ```rust,no_run
//! use zbcap::{CaptureConfig, OutputMode};
//!
//! fn main() -> zbcap::Result<()> {
//!     let config = CaptureConfig::new("/dev/ttyUSB0")
//!         .with_output(OutputMode::Fifo("/tmp/zbcap.pipe".into()));
//!
//!     // Runs sessions until an interrupt checker reports a stop request.
//!     zbcap::supervisor::run(&config)
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::{Arc, OnceLock};

pub mod capture;
pub mod channel;
pub mod config;
pub mod error;
pub mod handshake;
pub mod poll;
pub mod sink;
pub mod supervisor;

static INTERRUPT_CHECKER: OnceLock<Arc<dyn Fn() -> bool + Send + Sync>> = OnceLock::new();

/// Register a global interruption checker used by long-running library loops.
///
/// The checker should return `true` when the current operation should stop
/// (for example after receiving Ctrl-C in CLI applications). The supervisor
/// polls it between sessions; blocking reads and the readiness multiplexer
/// poll it while waiting, so a stop request unwinds mid-session too.
pub fn set_interrupt_checker<F>(checker: F)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    let _ = INTERRUPT_CHECKER.set(Arc::new(checker));
}

/// Returns whether interruption was requested by the embedding application.
#[must_use]
pub fn is_interrupt_requested() -> bool {
    INTERRUPT_CHECKER
        .get()
        .is_some_and(|checker| checker())
}

#[cfg(test)]
pub(crate) fn test_set_interrupted(value: bool) {
    use std::sync::atomic::{AtomicBool, Ordering};

    static TEST_INTERRUPT_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

    let flag = TEST_INTERRUPT_FLAG
        .get_or_init(|| {
            let shared = Arc::new(AtomicBool::new(false));
            let checker = Arc::clone(&shared);
            set_interrupt_checker(move || checker.load(Ordering::Relaxed));
            shared
        })
        .clone();

    flag.store(value, Ordering::Relaxed);
}

// Re-exports for convenience
pub use {
    capture::read_frame,
    channel::SerialChannel,
    config::{
        CaptureConfig, HandshakeConfig, OutputMode, DEFAULT_ARM_COMMAND, DEFAULT_BAUD,
        DEFAULT_CONFIRM_MARKER, DEFAULT_HANDSHAKE_DELAY,
    },
    error::{Error, Result},
    handshake::scan_for_marker,
    sink::{HexSink, PcapSink, Sink},
};
