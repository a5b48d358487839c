//! Access to the simulator's shared memory region
//!
//! The region is written by the game at high frequency and read here without
//! any OS-level lock. Consistency relies entirely on the sequence counter
//! protocol:
//!
//! 1. The writer increments `mSequenceNumber` to an odd value before writing
//! 2. The writer updates the region
//! 3. The writer increments `mSequenceNumber` to an even value
//!
//! [`RegionSource`] is the only capability the reader needs from whoever owns
//! the mapping. The live Windows mapping, recorded sessions and the synthetic
//! writer used in tests all implement it.

mod layout;

use std::time::Duration;

pub use layout::{
    MAP_OBJECT_NAME, ParticipantInfo, SHARED_MEMORY_VERSION, STORED_PARTICIPANTS_MAX,
    STRING_LENGTH_MAX, SharedMemory,
};

/// Read-only view of a sequence-guarded shared region.
pub trait RegionSource {
    /// Current layout version tag (`mVersion`).
    fn version(&self) -> u32;

    /// Current sequence counter, read with acquire ordering.
    fn sequence_number(&self) -> u32;

    /// Copy the whole region into `dst`.
    ///
    /// The copy may race with the writer; callers validate it against the
    /// sequence counter afterwards.
    fn copy_to(&mut self, dst: &mut SharedMemory);

    /// Called once before every acquisition attempt.
    ///
    /// Live regions change on their own and ignore this. Recorded regions
    /// step to their next frame here.
    fn advance(&mut self) {}

    /// Whether the region will never produce new data again.
    fn is_closed(&self) -> bool {
        false
    }

    /// Capture time of the current data, for sources that carry their own
    /// clock. `None` means the wall clock applies.
    fn elapsed(&self) -> Option<Duration> {
        None
    }
}

impl<R: RegionSource + ?Sized> RegionSource for Box<R> {
    fn version(&self) -> u32 {
        (**self).version()
    }

    fn sequence_number(&self) -> u32 {
        (**self).sequence_number()
    }

    fn copy_to(&mut self, dst: &mut SharedMemory) {
        (**self).copy_to(dst)
    }

    fn advance(&mut self) {
        (**self).advance()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }

    fn elapsed(&self) -> Option<Duration> {
        (**self).elapsed()
    }
}
