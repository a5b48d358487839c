//! Shared memory layout published by the simulator
//!
//! Mirrors the simulator's `SharedMemory` header field for field. Every
//! member is an integer, float or byte array; C `bool` members are `u8` and
//! alignment padding is spelled out. This makes any bit pattern a valid
//! value, so a copy taken while the game is writing is wrong data, never
//! undefined behaviour.

/// Layout version this build reads (`SHARED_MEMORY_VERSION`).
pub const SHARED_MEMORY_VERSION: u32 = 13;
/// Default name of the file mapping created by the game.
pub const MAP_OBJECT_NAME: &str = "$pcars2$";
/// Capacity of every fixed `char` array.
pub const STRING_LENGTH_MAX: usize = 64;
/// Capacity of every per-participant array.
pub const STORED_PARTICIPANTS_MAX: usize = 64;

const VEC_MAX: usize = 3;
const TYRE_MAX: usize = 4;
const TYRE_COMPOUND_NAME_LENGTH_MAX: usize = 40;

/// Participant record (`ParticipantInfo`)
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ParticipantInfo {
    pub is_active: u8,
    pub name: [u8; STRING_LENGTH_MAX],
    pub pad: [u8; 3], // alignment of the following float
    pub world_position: [f32; VEC_MAX],
    pub current_lap_distance: f32,
    pub race_position: u32, // 1-based, 0 when unset
    pub laps_completed: u32,
    pub current_lap: u32,
    pub current_sector: i32,
}

/// Full shared memory header.
///
/// Follows revision 13 (`SHARED_MEMORY_VERSION`) of the Project CARS 2
/// format `SharedMemory.h` that Automobilista 2 ships for third-party
/// tools. Blocks this crate never reads (`viewed_car_state`,
/// `car_dynamics`, `extensions`) are kept as opaque `u32` arrays of the
/// same byte length as the header's members they replace; the offset
/// tests below pin every field that is read.
#[repr(C)]
pub struct SharedMemory {
    pub version: u32,
    pub build_version_number: u32,

    // Game states
    pub game_state: u32,
    pub session_state: u32,
    pub race_state: u32,

    // Participants
    pub viewed_participant_index: i32,
    pub num_participants: i32, // -1 when unset
    pub participant_info: [ParticipantInfo; STORED_PARTICIPANTS_MAX],

    pub unfiltered_input: [f32; 4], // throttle, brake, steering, clutch

    // Viewed vehicle
    pub car_name: [u8; STRING_LENGTH_MAX],
    pub car_class_name: [u8; STRING_LENGTH_MAX],

    // Event
    pub laps_in_event: u32,
    pub track_location: [u8; STRING_LENGTH_MAX],
    pub track_variation: [u8; STRING_LENGTH_MAX],
    pub track_length: f32, // metres

    /// Timings, flags, pit info, car state, motion, tyres, damage and
    /// weather of the viewed car. Not consumed here.
    pub viewed_car_state: [u32; 153],

    /// Odd while the game is writing, even once a write is complete.
    pub sequence_number: u32,

    pub car_dynamics: [u32; 21],

    // Per-participant timing and state
    pub sector_times: [[f32; STORED_PARTICIPANTS_MAX]; 6], // current s1..s3, fastest s1..s3
    pub fastest_lap_times: [f32; STORED_PARTICIPANTS_MAX],
    pub last_lap_times: [f32; STORED_PARTICIPANTS_MAX],
    pub laps_invalidated: [u8; STORED_PARTICIPANTS_MAX],
    pub race_states: [u32; STORED_PARTICIPANTS_MAX],
    pub pit_modes: [u32; STORED_PARTICIPANTS_MAX],
    pub orientations: [[f32; VEC_MAX]; STORED_PARTICIPANTS_MAX],
    pub speeds: [f32; STORED_PARTICIPANTS_MAX],
    pub car_names: [[u8; STRING_LENGTH_MAX]; STORED_PARTICIPANTS_MAX],
    pub car_class_names: [[u8; STRING_LENGTH_MAX]; STORED_PARTICIPANTS_MAX],

    pub enforced_pit_stop_lap: i32,
    pub translated_track_location: [u8; STRING_LENGTH_MAX],
    pub translated_track_variation: [u8; STRING_LENGTH_MAX],
    pub brake_bias: f32,
    pub turbo_boost_pressure: f32,
    pub tyre_compound: [[u8; TYRE_COMPOUND_NAME_LENGTH_MAX]; TYRE_MAX],
    pub pit_schedules: [u32; STORED_PARTICIPANTS_MAX],
    pub highest_flag_colours: [u32; STORED_PARTICIPANTS_MAX],
    pub highest_flag_reasons: [u32; STORED_PARTICIPANTS_MAX],
    pub nationalities: [u32; STORED_PARTICIPANTS_MAX],
    pub snow_density: f32,

    // Session configuration
    pub session_duration: f32, // minutes, 0 for lap-limited races
    pub session_additional_laps: i32,

    /// Tyre temperatures, DRS, ride height, input, ERS and clutch state.
    pub extensions: [u32; 30],
}

impl SharedMemory {
    /// Size of the mapped view in bytes.
    pub const SIZE: usize = std::mem::size_of::<SharedMemory>();

    /// Allocate an all-zero region on the heap.
    pub fn zeroed() -> Box<Self> {
        // SAFETY: every field is an integer, float or byte array, for which
        // the all-zero bit pattern is a valid value.
        unsafe { Box::<Self>::new_zeroed().assume_init() }
    }

    /// Raw bytes of the region.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: the struct has no implicit padding, so every byte is
        // initialized, and the slice borrows `self`.
        unsafe { std::slice::from_raw_parts(self as *const Self as *const u8, Self::SIZE) }
    }

    /// Mutable raw bytes of the region.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: any byte pattern is a valid `SharedMemory`, so arbitrary
        // writes through the slice cannot produce an invalid value.
        unsafe { std::slice::from_raw_parts_mut(self as *mut Self as *mut u8, Self::SIZE) }
    }

    /// Build a region from exactly [`SharedMemory::SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Box<Self>> {
        if bytes.len() != Self::SIZE {
            return Err(crate::TelemetryError::Memory { expected: Self::SIZE, found: bytes.len() });
        }
        let mut region = Self::zeroed();
        region.as_bytes_mut().copy_from_slice(bytes);
        Ok(region)
    }

    /// Participant count clamped to the array bounds.
    pub fn participant_count(&self) -> usize {
        usize::try_from(self.num_participants).unwrap_or(0).min(STORED_PARTICIPANTS_MAX)
    }
}
