//! Race completion detection
//!
//! [`CompletionDetector`] turns the stream of [`RaceState`] values into at
//! most one [`CompletionEvent`] per race instance.
//!
//! ```text
//!            non-race session (from any state)
//!        ┌──────────────────────────────────────┐
//!        ▼                                      │
//!     ┌──────┐ race, not started/racing ┌────────┐ race over, all terminal ┌─────────┐
//!     │ Idle │ ───────────────────────► │ Active │ ──────────────────────► │ Emitted │
//!     └──────┘                          └────────┘        (emit)           └─────────┘
//!                                          ▲  │ race over, stragglers           │
//!                                          │  └───────────┘                     │
//!                                          └────────────────────────────────────┘
//!                                               race, not started/racing (re-arm)
//! ```
//!
//! The overall race phase can turn terminal before every car has crossed
//! the line, so emission waits for all participants. `Emitted` absorbs the
//! repeated terminal states that follow on later polls.

use tracing::{debug, info};

use crate::event::CompletionEvent;
use crate::race_state::RaceState;
use crate::types::{RacePhase, SessionKind};

/// Detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// No race in progress, or observed only after it ended
    Idle,
    /// Race in progress, no result emitted yet
    Active,
    /// Result emitted; waiting for the next race to start
    Emitted,
}

/// Single-shot race completion state machine.
#[derive(Debug)]
pub struct CompletionDetector {
    state: DetectorState,
    last_sequence: Option<u32>,
    previous: Option<(SessionKind, RacePhase)>,
    emitted: u64,
}

impl Default for CompletionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionDetector {
    pub fn new() -> Self {
        Self { state: DetectorState::Idle, last_sequence: None, previous: None, emitted: 0 }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Sequence number of the last state processed.
    pub fn last_sequence(&self) -> Option<u32> {
        self.last_sequence
    }

    /// Number of events emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Feed one race state; returns the event when the race just completed.
    pub fn observe(&mut self, state: &RaceState) -> Option<CompletionEvent> {
        if self.last_sequence == Some(state.sequence) {
            return None;
        }
        self.last_sequence = Some(state.sequence);
        self.log_transition(state);

        let (next, emit) = self.step(state);
        if next != self.state {
            debug!(from = ?self.state, to = ?next, sequence = state.sequence, "Detector transition");
        }
        if self.state == DetectorState::Emitted && next == DetectorState::Active {
            info!("New race started, waiting for it to finish");
        }
        self.state = next;

        if emit {
            self.emitted += 1;
            let event = CompletionEvent::from_race_state(state);
            info!(
                participants = event.results.len(),
                track = %event.info.track_location,
                winner = event.winner().unwrap_or("-"),
                "Race finished"
            );
            Some(event)
        } else {
            None
        }
    }

    /// Pure transition function: next state and whether to emit.
    fn step(&self, state: &RaceState) -> (DetectorState, bool) {
        if !state.session.is_race() {
            return (DetectorState::Idle, false);
        }

        match (self.state, state.phase.is_terminal()) {
            (_, false) => (DetectorState::Active, false),
            (DetectorState::Active, true) if state.all_participants_terminal() => {
                (DetectorState::Emitted, true)
            }
            (DetectorState::Active, true) => {
                debug!(stragglers = state.stragglers(), "Race over, waiting for stragglers");
                (DetectorState::Active, false)
            }
            (current, true) => (current, false),
        }
    }

    fn log_transition(&mut self, state: &RaceState) {
        let current = (state.session, state.phase);
        if self.previous != Some(current) {
            debug!(session = %state.session, phase = %state.phase, game = %state.game, "Race state changed");
            self.previous = Some(current);
        }
    }
}
