//! Projection of a snapshot onto the state the completion detector needs

use crate::region::SharedMemory;
use crate::snapshot::Snapshot;
use crate::types::{GameState, RacePhase, SessionKind, decode_c_string};

/// Race configuration copied into every completion event.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceConfig {
    pub laps_in_event: u32,
    pub session_duration: f32,
    pub session_additional_laps: i32,
    pub track_location: String,
    pub track_variation: String,
    pub track_length: f32,
}

/// One participant as seen in a single snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantState {
    /// Index into the simulator's participant arrays
    pub id: usize,
    pub name: String,
    pub phase: RacePhase,
    pub position: u32,
    pub best_lap: f32,
    pub car: String,
    pub class: String,
}

/// Race-relevant view of one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceState {
    pub sequence: u32,
    pub game: GameState,
    pub session: SessionKind,
    pub phase: RacePhase,
    pub participants: Vec<ParticipantState>,
    pub config: RaceConfig,
}

impl RaceState {
    /// Project a snapshot. Total: every snapshot yields a state.
    pub fn project(snapshot: &Snapshot) -> Self {
        Self::from_region(snapshot.sequence(), snapshot.region())
    }

    pub(crate) fn from_region(sequence: u32, region: &SharedMemory) -> Self {
        let participants = (0..region.participant_count())
            .map(|id| ParticipantState {
                id,
                name: decode_c_string(&region.participant_info[id].name),
                phase: RacePhase::from(region.race_states[id]),
                position: region.participant_info[id].race_position,
                best_lap: region.fastest_lap_times[id],
                car: decode_c_string(&region.car_names[id]),
                class: decode_c_string(&region.car_class_names[id]),
            })
            .collect();

        Self {
            sequence,
            game: GameState::from(region.game_state),
            session: SessionKind::from(region.session_state),
            phase: RacePhase::from(region.race_state),
            participants,
            config: RaceConfig {
                laps_in_event: region.laps_in_event,
                session_duration: region.session_duration,
                session_additional_laps: region.session_additional_laps,
                track_location: decode_c_string(&region.track_location),
                track_variation: decode_c_string(&region.track_variation),
                track_length: region.track_length,
            },
        }
    }

    /// Whether every participant has reached a terminal phase.
    ///
    /// Vacuously true for an empty field.
    pub fn all_participants_terminal(&self) -> bool {
        self.participants.iter().all(|p| p.phase.is_terminal())
    }

    /// Participants still running, for diagnostics.
    pub fn stragglers(&self) -> usize {
        self.participants.iter().filter(|p| !p.phase.is_terminal()).count()
    }
}

/// Free-function form of [`RaceState::project`].
pub fn project(snapshot: &Snapshot) -> RaceState {
    RaceState::project(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::STORED_PARTICIPANTS_MAX;
    use crate::snapshot::SnapshotReader;
    use crate::test_utils::{Entrant, SyntheticRegion};

    fn snapshot_of(source: SyntheticRegion) -> Snapshot {
        SnapshotReader::new(source).try_acquire().unwrap().unwrap()
    }

    #[test]
    fn projects_session_and_participants() {
        let mut source = SyntheticRegion::new();
        source.set_race(
            SessionKind::Race,
            RacePhase::Racing,
            &[
                Entrant::new("Ayrton", 2, RacePhase::Racing),
                Entrant::new("Nelson", 1, RacePhase::Finished),
            ],
        );

        let state = project(&snapshot_of(source));

        assert_eq!(state.session, SessionKind::Race);
        assert_eq!(state.phase, RacePhase::Racing);
        assert_eq!(state.sequence, 2);
        assert_eq!(state.participants.len(), 2);
        assert_eq!(state.participants[0].id, 0);
        assert_eq!(state.participants[0].name, "Ayrton");
        assert_eq!(state.participants[0].position, 2);
        assert_eq!(state.participants[1].phase, RacePhase::Finished);
        assert_eq!(state.participants[1].best_lap, 91.0);
        assert_eq!(state.participants[1].class, "F-Classic_Gen2");
        assert_eq!(state.config.track_location, "Interlagos");
        assert_eq!(state.config.track_variation, "Interlagos_GP");
        assert_eq!(state.config.laps_in_event, 12);
        assert_eq!(state.stragglers(), 1);
        assert!(!state.all_participants_terminal());
    }

    #[test]
    fn uses_exactly_the_declared_participant_count() {
        let mut source = SyntheticRegion::new();
        source.set_race(
            SessionKind::Race,
            RacePhase::Finished,
            &[
                Entrant::new("A", 1, RacePhase::Finished),
                Entrant::new("B", 2, RacePhase::Finished),
                Entrant::new("C", 3, RacePhase::Racing),
            ],
        );
        // Third slot still holds data but is no longer declared
        source.write(|r| r.num_participants = 2);

        let state = project(&snapshot_of(source));
        assert_eq!(state.participants.len(), 2);
        assert!(state.all_participants_terminal());
    }

    #[test]
    fn out_of_range_participant_counts_are_clamped() {
        let mut source = SyntheticRegion::new();
        source.write(|r| r.num_participants = -1);
        let mut reader = SnapshotReader::new(source);
        let state = project(&reader.try_acquire().unwrap().unwrap());
        assert!(state.participants.is_empty());
        assert!(state.all_participants_terminal());

        reader.source_mut().write(|r| r.num_participants = 1000);
        let state = project(&reader.try_acquire().unwrap().unwrap());
        assert_eq!(state.participants.len(), STORED_PARTICIPANTS_MAX);
    }

    #[test]
    fn unknown_raw_values_are_kept() {
        let mut source = SyntheticRegion::new();
        source.write(|r| {
            r.session_state = 77;
            r.race_state = 12;
            r.game_state = 2;
        });

        let state = project(&snapshot_of(source));
        assert_eq!(state.session, SessionKind::Unknown(77));
        assert_eq!(state.phase, RacePhase::Unknown(12));
        assert_eq!(state.game, GameState::Playing);
    }
}
