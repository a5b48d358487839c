//! Test utilities: an in-process stand-in for the simulator's writer
//!
//! [`SyntheticRegion`] owns a [`SharedMemory`] image and follows the same
//! odd/even sequence protocol as the game. Tests can also schedule a write to
//! happen in the middle of the reader's copy to produce torn reads on demand.

#![cfg(any(test, feature = "benchmark"))]

use crate::region::{RegionSource, SHARED_MEMORY_VERSION, STORED_PARTICIPANTS_MAX, SharedMemory};
use crate::types::{RacePhase, SessionKind, encode_c_string};

type CopyHook = Box<dyn FnMut(&mut SyntheticRegion) + Send>;

/// Participant entry for [`SyntheticRegion::set_race`].
#[derive(Debug, Clone)]
pub struct Entrant {
    pub name: String,
    pub position: u32,
    pub phase: RacePhase,
    pub best_lap: f32,
    pub car: String,
    pub class: String,
}

impl Entrant {
    pub fn new(name: &str, position: u32, phase: RacePhase) -> Self {
        Self {
            name: name.to_string(),
            position,
            phase,
            best_lap: 90.0 + position as f32,
            car: "Formula Classic Gen2".to_string(),
            class: "F-Classic_Gen2".to_string(),
        }
    }
}

/// In-memory region driven by test code.
pub struct SyntheticRegion {
    region: Box<SharedMemory>,
    mid_copy: Option<(usize, CopyHook)>,
    copies: usize,
}

impl Default for SyntheticRegion {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticRegion {
    /// Empty region with a matching version and sequence number 0.
    pub fn new() -> Self {
        let mut region = SharedMemory::zeroed();
        region.version = SHARED_MEMORY_VERSION;
        region.num_participants = -1;
        Self { region, mid_copy: None, copies: 0 }
    }

    pub fn region(&self) -> &SharedMemory {
        &self.region
    }

    /// Mutate the region without touching the sequence counter.
    pub fn region_mut(&mut self) -> &mut SharedMemory {
        &mut self.region
    }

    /// Number of completed `copy_to` calls.
    pub fn copies(&self) -> usize {
        self.copies
    }

    /// Mark a write as started (sequence becomes odd).
    pub fn begin_write(&mut self) {
        self.region.sequence_number = self.region.sequence_number.wrapping_add(1);
    }

    /// Mark a write as complete (sequence becomes even).
    pub fn end_write(&mut self) {
        self.region.sequence_number = self.region.sequence_number.wrapping_add(1);
    }

    /// Perform a complete write following the sequence protocol.
    pub fn write(&mut self, update: impl FnOnce(&mut SharedMemory)) {
        self.begin_write();
        update(&mut self.region);
        self.end_write();
    }

    /// Run `hook` after the first `split` bytes of the next copy.
    pub fn during_next_copy(
        &mut self,
        split: usize,
        hook: impl FnMut(&mut SyntheticRegion) + Send + 'static,
    ) {
        self.mid_copy = Some((split.min(SharedMemory::SIZE), Box::new(hook)));
    }

    /// Publish a race session with the given overall phase and entrants.
    pub fn set_race(&mut self, session: SessionKind, phase: RacePhase, entrants: &[Entrant]) {
        self.write(|region| {
            region.session_state = session.raw();
            region.race_state = phase.raw();
            region.laps_in_event = 12;
            region.session_duration = 0.0;
            region.session_additional_laps = 0;
            region.track_location = encode_c_string("Interlagos");
            region.track_variation = encode_c_string("Interlagos_GP");
            region.track_length = 4309.0;
            region.num_participants = entrants.len().min(STORED_PARTICIPANTS_MAX) as i32;

            for (i, entrant) in entrants.iter().take(STORED_PARTICIPANTS_MAX).enumerate() {
                let info = &mut region.participant_info[i];
                info.is_active = 1;
                info.name = encode_c_string(&entrant.name);
                info.race_position = entrant.position;
                region.race_states[i] = entrant.phase.raw();
                region.fastest_lap_times[i] = entrant.best_lap;
                region.car_names[i] = encode_c_string(&entrant.car);
                region.car_class_names[i] = encode_c_string(&entrant.class);
            }
        });
    }
}

impl RegionSource for SyntheticRegion {
    fn version(&self) -> u32 {
        self.region.version
    }

    fn sequence_number(&self) -> u32 {
        self.region.sequence_number
    }

    fn copy_to(&mut self, dst: &mut SharedMemory) {
        match self.mid_copy.take() {
            Some((split, mut hook)) => {
                dst.as_bytes_mut()[..split].copy_from_slice(&self.region.as_bytes()[..split]);
                hook(self);
                dst.as_bytes_mut()[split..].copy_from_slice(&self.region.as_bytes()[split..]);
            }
            None => dst.as_bytes_mut().copy_from_slice(self.region.as_bytes()),
        }
        self.copies += 1;
    }
}

/// Entrants that have all taken the chequered flag.
pub fn finished_field(count: usize) -> Vec<Entrant> {
    (0..count)
        .map(|i| Entrant::new(&format!("Driver {}", i + 1), i as u32 + 1, RacePhase::Finished))
        .collect()
}
