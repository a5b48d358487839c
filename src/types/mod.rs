//! Core value types decoded from the shared memory region.
//!
//! The simulator publishes its state as raw `unsigned int` enums and
//! fixed-width `char` arrays. This module maps them to Rust types:
//!
//! - [`GameState`] maps `mGameState`
//! - [`SessionKind`] maps `mSessionState`
//! - [`RacePhase`] maps `mRaceState` and the per-participant `mRaceStates[]`
//! - [`decode_c_string`] turns `char[64]` fields into owned strings
//!
//! Unknown raw values are preserved in an `Unknown(u32)` variant rather than
//! rejected, since the projection from a snapshot is total.

mod c_string;
mod race_phase;
mod session;

pub use c_string::{decode_c_string, encode_c_string};
pub use race_phase::RacePhase;
pub use session::{GameState, SessionKind};
