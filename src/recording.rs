//! Recorded sessions for cross-platform replay
//!
//! A recording is a sequence of consistent region images captured from the
//! live game, each stamped with its capture time. Replaying it through
//! [`RecordingRegion`] drives the exact same reader and detector as live
//! mode, on any platform, with the recorded clock standing in for the wall
//! clock.
//!
//! ## File Structure
//!
//! ```text
//! offset 0   magic          8 bytes  "AMS2REC\0"
//! offset 8   format version u32 LE   RECORDING_FORMAT_VERSION
//! offset 12  frame size     u32 LE   size of SharedMemory in bytes
//! offset 16  frames         N * (capture time u64 LE in microseconds since
//!                           the recording started, then the raw region
//!                           image in host byte order)
//! ```
//!
//! Format version 1 files carry no capture times and replay without a
//! recorded clock.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::region::{RegionSource, SharedMemory};
use crate::snapshot::Snapshot;
use crate::{Result, TelemetryError};

const RECORDING_MAGIC: &[u8; 8] = b"AMS2REC\0";
const RECORDING_HEADER_SIZE: usize = 16;
const CAPTURE_TIME_SIZE: usize = 8;
/// Version of the recording container format.
pub const RECORDING_FORMAT_VERSION: u32 = 2;

/// Appends consistent snapshots to a recording file.
pub struct RecordingWriter<W: Write = BufWriter<File>> {
    out: W,
    path: PathBuf,
    started: Instant,
    frames: usize,
}

impl RecordingWriter {
    /// Create (or truncate) a recording file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| TelemetryError::file_error(path, e))?;
        Self::with_path(BufWriter::new(file), path.to_path_buf())
    }
}

impl<W: Write> RecordingWriter<W> {
    /// Wrap a writer and emit the recording header.
    pub fn new(out: W) -> Result<Self> {
        Self::with_path(out, PathBuf::from("<memory>"))
    }

    fn with_path(mut out: W, path: PathBuf) -> Result<Self> {
        let mut header = [0u8; RECORDING_HEADER_SIZE];
        header[..8].copy_from_slice(RECORDING_MAGIC);
        header[8..12].copy_from_slice(&RECORDING_FORMAT_VERSION.to_le_bytes());
        header[12..16].copy_from_slice(&(SharedMemory::SIZE as u32).to_le_bytes());
        out.write_all(&header).map_err(|e| TelemetryError::file_error(&path, e))?;
        Ok(Self { out, path, started: Instant::now(), frames: 0 })
    }

    /// Append a snapshot stamped with the time since the writer was created.
    pub fn append(&mut self, snapshot: &Snapshot) -> Result<()> {
        let at = self.started.elapsed();
        self.write_frame(snapshot.as_bytes(), at)
    }

    /// Append a region stamped with the time since the writer was created.
    pub fn append_region(&mut self, region: &SharedMemory) -> Result<()> {
        let at = self.started.elapsed();
        self.write_frame(region.as_bytes(), at)
    }

    /// Append a region captured `at` after the start of the recording.
    pub fn append_region_at(&mut self, region: &SharedMemory, at: Duration) -> Result<()> {
        self.write_frame(region.as_bytes(), at)
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush().map_err(|e| TelemetryError::file_error(&self.path, e))?;
        debug!(frames = self.frames, path = %self.path.display(), "Recording finished");
        Ok(self.out)
    }

    fn write_frame(&mut self, image: &[u8], at: Duration) -> Result<()> {
        let micros = u64::try_from(at.as_micros()).unwrap_or(u64::MAX);
        let path = &self.path;
        let out = &mut self.out;
        out.write_all(&micros.to_le_bytes()).map_err(|e| TelemetryError::file_error(path, e))?;
        out.write_all(image).map_err(|e| TelemetryError::file_error(path, e))?;
        self.frames += 1;
        Ok(())
    }
}

/// Region replaying a recording one frame per acquisition attempt.
pub struct RecordingRegion {
    data: Vec<u8>,
    path: PathBuf,
    frame_count: usize,
    /// Bytes before each region image
    stamp_size: usize,
    current: Option<usize>,
    exhausted: bool,
}

impl RecordingRegion {
    /// Load a recording file into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| TelemetryError::file_error(path, e))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| TelemetryError::file_error(path, e))?;

        let region = Self::from_bytes_with_path(data, path.to_path_buf())?;
        info!(frames = region.frame_count, path = %path.display(), "Opened recording");
        Ok(region)
    }

    /// Create a region from recording bytes (for testing).
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with_path(data, PathBuf::from("<memory>"))
    }

    fn from_bytes_with_path(data: Vec<u8>, path: PathBuf) -> Result<Self> {
        if data.len() < RECORDING_HEADER_SIZE || &data[..8] != RECORDING_MAGIC {
            return Err(TelemetryError::parse_error(
                "recording header",
                format!("{} is not a recording", path.display()),
            ));
        }

        let stamp_size = match parse_u32_le(&data, 8)? {
            1 => 0,
            2 => CAPTURE_TIME_SIZE,
            other => {
                return Err(TelemetryError::parse_error(
                    "recording header",
                    format!("unsupported format version {}", other),
                ));
            }
        };

        let frame_size = parse_u32_le(&data, 12)? as usize;
        if frame_size != SharedMemory::SIZE {
            return Err(TelemetryError::Memory { expected: SharedMemory::SIZE, found: frame_size });
        }

        let stride = stamp_size + frame_size;
        let body = data.len() - RECORDING_HEADER_SIZE;
        if body % stride != 0 {
            return Err(TelemetryError::parse_error(
                "recording frames",
                format!("{} trailing bytes after the last frame", body % stride),
            ));
        }

        Ok(Self {
            frame_count: body / stride,
            stamp_size,
            data,
            path,
            current: None,
            exhausted: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Index of the frame currently served.
    pub fn current_frame(&self) -> Option<usize> {
        self.current
    }

    fn record(&self, index: usize) -> &[u8] {
        let stride = self.stamp_size + SharedMemory::SIZE;
        let start = RECORDING_HEADER_SIZE + index * stride;
        &self.data[start..start + stride]
    }

    fn current_bytes(&self) -> Option<&[u8]> {
        self.current.map(|index| &self.record(index)[self.stamp_size..])
    }
}

impl RegionSource for RecordingRegion {
    fn version(&self) -> u32 {
        self.current_bytes().map_or(0, |frame| read_u32(frame, 0))
    }

    fn sequence_number(&self) -> u32 {
        const OFFSET: usize = std::mem::offset_of!(SharedMemory, sequence_number);
        self.current_bytes().map_or(1, |frame| read_u32(frame, OFFSET))
    }

    fn copy_to(&mut self, dst: &mut SharedMemory) {
        if let Some(frame) = self.current_bytes() {
            dst.as_bytes_mut().copy_from_slice(frame);
        }
    }

    fn advance(&mut self) {
        let next = self.current.map_or(0, |index| index + 1);
        if next < self.frame_count {
            self.current = Some(next);
        } else {
            self.exhausted = true;
        }
    }

    fn is_closed(&self) -> bool {
        self.exhausted
    }

    fn elapsed(&self) -> Option<Duration> {
        if self.stamp_size == 0 {
            return None;
        }
        let record = self.record(self.current?);
        let mut stamp = [0u8; CAPTURE_TIME_SIZE];
        stamp.copy_from_slice(&record[..CAPTURE_TIME_SIZE]);
        Some(Duration::from_micros(u64::from_le_bytes(stamp)))
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_ne_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

fn parse_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| {
            TelemetryError::parse_error("recording header", format!("truncated at offset {}", offset))
        })
}
