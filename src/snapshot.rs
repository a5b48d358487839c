//! Consistent snapshots of the shared region
//!
//! [`SnapshotReader`] implements the reader half of the sequence counter
//! protocol. A single copy-and-recheck per attempt is enough: any write that
//! overlaps the copy changes the counter, and the attempt is discarded.
//!
//! Misses are not errors. An odd counter (write in progress) or a changed
//! counter (torn read) simply yields `Ok(None)`, and the caller polls again.
//! The only error is a layout version mismatch, which is fatal.

use std::sync::atomic::{Ordering, fence};
use tracing::trace;

use crate::region::{RegionSource, SHARED_MEMORY_VERSION, SharedMemory};
use crate::{Result, TelemetryError};

/// Owned copy of the region taken at one even sequence number.
pub struct Snapshot {
    sequence: u32,
    region: Box<SharedMemory>,
}

impl Snapshot {
    /// Sequence number the copy was validated against.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn region(&self) -> &SharedMemory {
        &self.region
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.region.as_bytes()
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("sequence", &self.sequence)
            .field("session_state", &self.region.session_state)
            .field("race_state", &self.region.race_state)
            .field("num_participants", &self.region.num_participants)
            .finish()
    }
}

/// Why an acquisition attempt produced no snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireMiss {
    /// The counter was odd before the copy.
    WriteInProgress,
    /// The counter changed while copying.
    TornRead,
    /// The source will not produce data again.
    Closed,
}

/// Counters describing the reader's acquisition history.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AcquireStats {
    pub attempts: u64,
    pub acquired: u64,
    pub write_in_progress: u64,
    pub torn_reads: u64,
}

/// Reader side of the sequence counter protocol.
pub struct SnapshotReader<R> {
    source: R,
    expected_version: u32,
    scratch: Option<Box<SharedMemory>>,
    stats: AcquireStats,
}

impl<R: RegionSource> SnapshotReader<R> {
    /// Reader expecting [`SHARED_MEMORY_VERSION`].
    pub fn new(source: R) -> Self {
        Self::with_expected_version(source, SHARED_MEMORY_VERSION)
    }

    pub fn with_expected_version(source: R, expected_version: u32) -> Self {
        Self { source, expected_version, scratch: None, stats: AcquireStats::default() }
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut R {
        &mut self.source
    }

    pub fn stats(&self) -> AcquireStats {
        self.stats
    }

    /// Whether the underlying source has been exhausted.
    pub fn is_closed(&self) -> bool {
        self.source.is_closed()
    }

    /// Attempt one consistent copy of the region.
    ///
    /// Returns `Ok(None)` when the writer is mid-write or wrote during the
    /// copy. Returns [`TelemetryError::Version`] when the region's layout
    /// version differs from the expected one.
    pub fn try_acquire(&mut self) -> Result<Option<Snapshot>> {
        match self.acquire()? {
            Ok(snapshot) => {
                self.stats.acquired += 1;
                Ok(Some(snapshot))
            }
            Err(miss) => {
                match miss {
                    AcquireMiss::WriteInProgress => self.stats.write_in_progress += 1,
                    AcquireMiss::TornRead => self.stats.torn_reads += 1,
                    AcquireMiss::Closed => {}
                }
                trace!(?miss, "No snapshot this attempt");
                Ok(None)
            }
        }
    }

    /// Attempt one copy, reporting why it failed when it did.
    pub fn acquire(&mut self) -> Result<std::result::Result<Snapshot, AcquireMiss>> {
        self.source.advance();
        if self.source.is_closed() {
            return Ok(Err(AcquireMiss::Closed));
        }
        self.stats.attempts += 1;

        let found = self.source.version();
        if found != self.expected_version {
            return Err(TelemetryError::Version { expected: self.expected_version, found });
        }

        let sequence = self.source.sequence_number();
        if sequence % 2 != 0 {
            return Ok(Err(AcquireMiss::WriteInProgress));
        }

        let mut region = self.scratch.take().unwrap_or_else(SharedMemory::zeroed);
        self.source.copy_to(&mut region);
        fence(Ordering::Acquire);

        // The copied counter catches writes that started before the counter
        // field was copied; the live counter catches the ones after.
        if region.sequence_number != sequence || self.source.sequence_number() != sequence {
            self.scratch = Some(region);
            return Ok(Err(AcquireMiss::TornRead));
        }

        Ok(Ok(Snapshot { sequence, region }))
    }
}
