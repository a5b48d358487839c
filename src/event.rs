//! Completion event handed to the result sink

use serde::Serialize;

use crate::race_state::{RaceConfig, RaceState};
use crate::types::RacePhase;

/// Race configuration section of a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RaceInfo {
    pub laps_in_event: u32,
    pub session_duration: f32,
    pub session_additional_laps: i32,
    pub track_location: String,
    pub track_variation: String,
    pub track_length: f32,
}

impl From<&RaceConfig> for RaceInfo {
    fn from(config: &RaceConfig) -> Self {
        Self {
            laps_in_event: config.laps_in_event,
            session_duration: config.session_duration,
            session_additional_laps: config.session_additional_laps,
            track_location: config.track_location.clone(),
            track_variation: config.track_variation.clone(),
            track_length: config.track_length,
        }
    }
}

/// Final classification of one participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParticipantResult {
    pub name: String,
    pub position: u32,
    pub best_lap: f32,
    pub race_state: RacePhase,
    pub car_name: String,
    #[serde(rename = "Class")]
    pub class_name: String,
}

/// A finished race, emitted once per race instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionEvent {
    #[serde(rename = "RaceInfo")]
    pub info: RaceInfo,
    /// Sorted ascending by finishing position
    #[serde(rename = "RaceResult")]
    pub results: Vec<ParticipantResult>,
    #[serde(skip)]
    pub sequence: u32,
}

impl CompletionEvent {
    /// Build the event from the terminal race state.
    ///
    /// Ties on position keep the simulator's participant order.
    pub fn from_race_state(state: &RaceState) -> Self {
        let mut results: Vec<ParticipantResult> = state
            .participants
            .iter()
            .map(|p| ParticipantResult {
                name: p.name.clone(),
                position: p.position,
                best_lap: p.best_lap,
                race_state: p.phase,
                car_name: p.car.clone(),
                class_name: p.class.clone(),
            })
            .collect();
        results.sort_by_key(|r| r.position);

        Self { info: RaceInfo::from(&state.config), results, sequence: state.sequence }
    }

    /// Name of the race winner, if any participant was classified.
    pub fn winner(&self) -> Option<&str> {
        self.results.first().map(|r| r.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race_state::ParticipantState;
    use crate::types::{GameState, SessionKind};

    fn participant(id: usize, name: &str, position: u32) -> ParticipantState {
        ParticipantState {
            id,
            name: name.to_string(),
            phase: RacePhase::Finished,
            position,
            best_lap: 80.0 + id as f32,
            car: "McLaren 720S GT3".to_string(),
            class: "GT3".to_string(),
        }
    }

    fn finished_state(participants: Vec<ParticipantState>) -> RaceState {
        RaceState {
            sequence: 10,
            game: GameState::Playing,
            session: SessionKind::Race,
            phase: RacePhase::Finished,
            participants,
            config: RaceConfig {
                laps_in_event: 0,
                session_duration: 30.0,
                session_additional_laps: 1,
                track_location: "Spa-Francorchamps".to_string(),
                track_variation: "Spa_2022".to_string(),
                track_length: 7004.0,
            },
        }
    }

    #[test]
    fn results_are_ordered_by_position() {
        let state = finished_state(vec![
            participant(0, "C", 3),
            participant(1, "A", 1),
            participant(2, "B", 2),
        ]);

        let event = CompletionEvent::from_race_state(&state);
        let positions: Vec<u32> = event.results.iter().map(|r| r.position).collect();

        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(event.winner(), Some("A"));
        assert_eq!(event.sequence, 10);
    }

    #[test]
    fn equal_positions_keep_participant_order() {
        let state = finished_state(vec![
            participant(0, "first", 0),
            participant(1, "second", 0),
            participant(2, "leader", 1),
        ]);

        let event = CompletionEvent::from_race_state(&state);
        let names: Vec<&str> = event.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "leader"]);
    }

    #[test]
    fn serializes_with_persisted_field_names() {
        let state = finished_state(vec![participant(0, "Max", 1)]);
        let event = CompletionEvent::from_race_state(&state);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["RaceInfo"]["TrackLocation"], "Spa-Francorchamps");
        assert_eq!(json["RaceInfo"]["SessionDuration"], 30.0);
        assert_eq!(json["RaceInfo"]["SessionAdditionalLaps"], 1);
        assert_eq!(json["RaceResult"][0]["Name"], "Max");
        assert_eq!(json["RaceResult"][0]["Position"], 1);
        assert_eq!(json["RaceResult"][0]["RaceState"], "RACESTATE_FINISHED");
        assert_eq!(json["RaceResult"][0]["CarName"], "McLaren 720S GT3");
        assert_eq!(json["RaceResult"][0]["Class"], "GT3");
        assert!(json.get("sequence").is_none());
    }

    #[test]
    fn empty_field_has_no_winner() {
        let event = CompletionEvent::from_race_state(&finished_state(Vec::new()));
        assert!(event.results.is_empty());
        assert_eq!(event.winner(), None);
    }
}
