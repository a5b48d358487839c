//! Race phase reported for the whole race and for each participant

use serde::{Serialize, Serializer};

/// Race state as published in `mRaceState` and `mRaceStates[]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RacePhase {
    Invalid,
    NotStarted,
    Racing,
    Finished,
    Disqualified,
    Retired,
    DidNotFinish,
    /// Raw value outside the known range
    Unknown(u32),
}

impl RacePhase {
    /// Whether the race (or participant) will not resume from this phase.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            RacePhase::Finished
                | RacePhase::Disqualified
                | RacePhase::Retired
                | RacePhase::DidNotFinish
        )
    }

    /// Name used in persisted results.
    pub const fn as_str(self) -> &'static str {
        match self {
            RacePhase::Invalid => "RACESTATE_INVALID",
            RacePhase::NotStarted => "RACESTATE_NOT_STARTED",
            RacePhase::Racing => "RACESTATE_RACING",
            RacePhase::Finished => "RACESTATE_FINISHED",
            RacePhase::Disqualified => "RACESTATE_DISQUALIFIED",
            RacePhase::Retired => "RACESTATE_RETIRED",
            RacePhase::DidNotFinish => "RACESTATE_DNF",
            RacePhase::Unknown(_) => "UNKNOWN RACE STATE",
        }
    }

    /// Raw value as written by the simulator.
    pub const fn raw(self) -> u32 {
        match self {
            RacePhase::Invalid => 0,
            RacePhase::NotStarted => 1,
            RacePhase::Racing => 2,
            RacePhase::Finished => 3,
            RacePhase::Disqualified => 4,
            RacePhase::Retired => 5,
            RacePhase::DidNotFinish => 6,
            RacePhase::Unknown(raw) => raw,
        }
    }
}

impl From<u32> for RacePhase {
    fn from(raw: u32) -> Self {
        match raw {
            0 => RacePhase::Invalid,
            1 => RacePhase::NotStarted,
            2 => RacePhase::Racing,
            3 => RacePhase::Finished,
            4 => RacePhase::Disqualified,
            5 => RacePhase::Retired,
            6 => RacePhase::DidNotFinish,
            other => RacePhase::Unknown(other),
        }
    }
}

impl std::fmt::Display for RacePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RacePhase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
