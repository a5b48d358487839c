//! Game and session state enums

/// Application state as published in `mGameState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    Exited,
    FrontEnd,
    Playing,
    Paused,
    InMenuTimeTicking,
    Restarting,
    Replay,
    FrontEndReplay,
    Unknown(u32),
}

impl GameState {
    pub const fn as_str(self) -> &'static str {
        match self {
            GameState::Exited => "GAME_EXITED",
            GameState::FrontEnd => "GAME_FRONT_END",
            GameState::Playing => "GAME_INGAME_PLAYING",
            GameState::Paused => "GAME_INGAME_PAUSED",
            GameState::InMenuTimeTicking => "GAME_INGAME_INMENU_TIME_TICKING",
            GameState::Restarting => "GAME_INGAME_RESTARTING",
            GameState::Replay => "GAME_INGAME_REPLAY",
            GameState::FrontEndReplay => "GAME_FRONT_END_REPLAY",
            GameState::Unknown(_) => "UNKNOWN GAME STATE",
        }
    }
}

impl From<u32> for GameState {
    fn from(raw: u32) -> Self {
        match raw {
            0 => GameState::Exited,
            1 => GameState::FrontEnd,
            2 => GameState::Playing,
            3 => GameState::Paused,
            4 => GameState::InMenuTimeTicking,
            5 => GameState::Restarting,
            6 => GameState::Replay,
            7 => GameState::FrontEndReplay,
            other => GameState::Unknown(other),
        }
    }
}

impl std::fmt::Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session kind as published in `mSessionState`.
///
/// Only [`SessionKind::Race`] can produce a result; the formation lap is a
/// separate session that precedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Invalid,
    Practice,
    Test,
    Qualify,
    FormationLap,
    Race,
    TimeAttack,
    Unknown(u32),
}

impl SessionKind {
    pub const fn is_race(self) -> bool {
        matches!(self, SessionKind::Race)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SessionKind::Invalid => "SESSION_INVALID",
            SessionKind::Practice => "SESSION_PRACTICE",
            SessionKind::Test => "SESSION_TEST",
            SessionKind::Qualify => "SESSION_QUALIFY",
            SessionKind::FormationLap => "SESSION_FORMATION_LAP",
            SessionKind::Race => "SESSION_RACE",
            SessionKind::TimeAttack => "SESSION_TIME_ATTACK",
            SessionKind::Unknown(_) => "UNKNOWN SESSION STATE",
        }
    }

    pub const fn raw(self) -> u32 {
        match self {
            SessionKind::Invalid => 0,
            SessionKind::Practice => 1,
            SessionKind::Test => 2,
            SessionKind::Qualify => 3,
            SessionKind::FormationLap => 4,
            SessionKind::Race => 5,
            SessionKind::TimeAttack => 6,
            SessionKind::Unknown(raw) => raw,
        }
    }
}

impl From<u32> for SessionKind {
    fn from(raw: u32) -> Self {
        match raw {
            0 => SessionKind::Invalid,
            1 => SessionKind::Practice,
            2 => SessionKind::Test,
            3 => SessionKind::Qualify,
            4 => SessionKind::FormationLap,
            5 => SessionKind::Race,
            6 => SessionKind::TimeAttack,
            other => SessionKind::Unknown(other),
        }
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
