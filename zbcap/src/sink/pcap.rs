//! pcap capture-file sink.
//!
//! Classic libpcap format, little-endian on all platforms:
//!
//! ```text
//! +-------+---------+--------+----------+---------+----------+
//! | magic | version | gmtoff | accuracy | snaplen | linktype |
//! +-------+---------+--------+----------+---------+----------+
//! |  4 B  | 2+2 B   |  4 B   |   4 B    |   4 B   |   4 B    |
//! +-------+---------+--------+----------+---------+----------+
//! ```
//!
//! followed by one 16-byte record header (seconds, microseconds, captured
//! length, original length) plus the raw frame bytes per packet. Captured
//! length always equals original length; nothing is ever truncated, frames
//! are at most 255 bytes.

use crate::error::{Error, Result};
use crate::sink::Sink;
use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// pcap magic number, written in the file's byte order.
pub const PCAP_MAGIC: u32 = 0xa1b2c3d4;

/// Format version written to the global header.
const VERSION_MAJOR: u16 = 2;
const VERSION_MINOR: u16 = 4;

/// Snapshot length advertised in the global header.
const SNAPLEN: u32 = 65535;

/// Link type for IEEE 802.15.4 frames with the FCS still attached.
pub const LINKTYPE_IEEE802_15_4_WITHFCS: u32 = 195;

/// Size of the global header in bytes.
pub const FILE_HEADER_LEN: usize = 24;

/// Size of a per-record header in bytes.
pub const RECORD_HEADER_LEN: usize = 16;

/// Sink that serializes packets as a pcap stream.
pub struct PcapSink<W: Write + AsRawFd> {
    dest: Option<W>,
}

impl PcapSink<File> {
    /// Create (or truncate) a capture file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        debug!("Writing capture file {}", path.display());
        Ok(Self::new(File::create(path)?))
    }

    /// Open a rendezvous pipe at `path`, creating it if absent.
    ///
    /// Blocks until a reader attaches to the other end.
    pub fn open_fifo(path: &Path) -> Result<Self> {
        super::ensure_fifo(path)?;
        info!("Waiting for a reader on {}", path.display());
        let dest = OpenOptions::new().write(true).open(path)?;
        info!("Reader attached");
        Ok(Self::new(dest))
    }
}

impl<W: Write + AsRawFd> PcapSink<W> {
    /// Wrap an already-open destination.
    pub fn new(dest: W) -> Self {
        Self { dest: Some(dest) }
    }

    fn dest_mut(&mut self) -> Result<&mut W> {
        self.dest.as_mut().ok_or(Error::SinkClosed)
    }
}

/// Build the fixed 24-byte global header.
///
/// Deterministic: independent of configuration, clock, and platform.
#[allow(clippy::unwrap_used)] // Writing to Vec<u8> cannot fail
pub(crate) fn file_header() -> Vec<u8> {
    let mut buf = Vec::with_capacity(FILE_HEADER_LEN);
    buf.write_u32::<LittleEndian>(PCAP_MAGIC).unwrap();
    buf.write_u16::<LittleEndian>(VERSION_MAJOR).unwrap();
    buf.write_u16::<LittleEndian>(VERSION_MINOR).unwrap();
    buf.write_i32::<LittleEndian>(0).unwrap(); // GMT offset
    buf.write_u32::<LittleEndian>(0).unwrap(); // timestamp accuracy
    buf.write_u32::<LittleEndian>(SNAPLEN).unwrap();
    buf.write_u32::<LittleEndian>(LINKTYPE_IEEE802_15_4_WITHFCS)
        .unwrap();
    buf
}

/// Build a 16-byte record header for a frame of `len` bytes captured at `ts`.
///
/// Captured and original length are both `len`.
#[allow(clippy::unwrap_used)] // Writing to Vec<u8> cannot fail
#[allow(clippy::cast_possible_truncation)] // seconds wrap in 2106, frames are <= 255 bytes
pub(crate) fn record_header(ts: Duration, len: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(RECORD_HEADER_LEN);
    buf.write_u32::<LittleEndian>(ts.as_secs() as u32).unwrap();
    buf.write_u32::<LittleEndian>(ts.subsec_micros()).unwrap();
    buf.write_u32::<LittleEndian>(len).unwrap();
    buf.write_u32::<LittleEndian>(len).unwrap();
    buf
}

impl<W: Write + AsRawFd> Sink for PcapSink<W> {
    fn write_header(&mut self) -> Result<()> {
        let dest = self.dest_mut()?;
        dest.write_all(&file_header())
            .map_err(Error::from_sink_write)?;
        dest.flush().map_err(Error::from_sink_write)?;
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)] // frames are <= 255 bytes
    fn write_packet(&mut self, payload: &[u8]) -> Result<()> {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let header = record_header(ts, payload.len() as u32);

        let dest = self.dest_mut()?;
        dest.write_all(&header).map_err(Error::from_sink_write)?;
        dest.write_all(payload).map_err(Error::from_sink_write)?;
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
        // Take ownership of the destination and let it drop (close)
        self.dest.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ReadBytesExt;
    use std::io::{Read, Seek, SeekFrom};

    #[test]
    fn test_file_header_is_deterministic() {
        let header = file_header();
        assert_eq!(header.len(), FILE_HEADER_LEN);
        assert_eq!(header, file_header());
        // Magic in little-endian
        assert_eq!(&header[0..4], &[0xd4, 0xc3, 0xb2, 0xa1]);
        // Version 2.4
        assert_eq!(&header[4..8], &[0x02, 0x00, 0x04, 0x00]);
        // Snaplen 65535
        assert_eq!(&header[16..20], &[0xff, 0xff, 0x00, 0x00]);
        // Link type 195
        assert_eq!(&header[20..24], &[0xc3, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_record_header_lengths_match_frame() {
        let header = record_header(Duration::new(1700000000, 123_456_000), 4);
        assert_eq!(header.len(), RECORD_HEADER_LEN);

        let mut cursor = std::io::Cursor::new(header);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 1700000000);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 123_456);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 4);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 4);
    }

    #[test]
    fn test_record_shape_on_file() {
        let mut sink = PcapSink::new(tempfile::tempfile().unwrap());
        sink.write_header().unwrap();
        sink.write_packet(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();

        let mut file = sink.dest.take().unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();

        assert_eq!(contents.len(), FILE_HEADER_LEN + RECORD_HEADER_LEN + 4);
        let record = &contents[FILE_HEADER_LEN..];
        // Captured and original length both 4
        assert_eq!(&record[8..12], &[4, 0, 0, 0]);
        assert_eq!(&record[12..16], &[4, 0, 0, 0]);
        assert_eq!(&record[16..], &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_zero_length_frame_is_a_valid_record() {
        let mut sink = PcapSink::new(tempfile::tempfile().unwrap());
        sink.write_packet(&[]).unwrap();

        let mut file = sink.dest.take().unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();

        assert_eq!(contents.len(), RECORD_HEADER_LEN);
        assert_eq!(&contents[8..12], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_close_is_idempotent_and_poisons_writes() {
        let mut sink = PcapSink::new(tempfile::tempfile().unwrap());
        sink.close().unwrap();
        sink.close().unwrap();
        assert!(matches!(sink.write_packet(b"x"), Err(Error::SinkClosed)));
        assert!(matches!(sink.pollable_fd(), Err(Error::SinkClosed)));
    }
}
