//! Session settings, per-mode defaults and creation-time validation.
//!
//! Validation never clamps: a setting outside its mode's bounds fails the
//! creation request with `InvalidSettings`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};

use crate::error::EngineError;

pub const MAX_ROSTER: usize = 32;
pub const DEFAULT_HINTS_PER_TURN: u8 = 3;
pub const MAX_HINTS_PER_TURN: u8 = 10;
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(10);
pub const WORD_LEVELS: std::ops::RangeInclusive<u8> = 1..=10;

const MINUTE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Tournament default: every eligible player spells in turn.
    RoundRobin,
    /// 1v1 speed spelling.
    RapidFire,
    /// Points accumulated over a timed game.
    TotalGame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Solo,
    Multi,
    Practice,
}

impl SessionKind {
    /// Only multi-player sessions get a video/audio room.
    pub fn needs_room(self) -> bool {
        matches!(self, SessionKind::Multi)
    }

    pub fn is_single_player(self) -> bool {
        !matches!(self, SessionKind::Multi)
    }
}

/// How a hint kind is picked when the caller does not name one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintSelection {
    /// Uniform over every kind, repeats allowed.
    Uniform,
    /// Uniform over kinds not yet used this turn.
    #[default]
    AvoidRepeats,
}

/// The single completion rule a session is judged by.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "limit", rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Finished when at most one player is still standing.
    Elimination,
    /// Finished once this many rounds have been played.
    RoundLimit(u32),
    /// Finished once this much time has passed since the start.
    TimeLimit(#[serde_as(as = "DurationSeconds<u64>")] Duration),
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub mode: GameMode,
    pub min_players: usize,
    pub max_players: usize,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(default)]
    pub time_limit: Option<Duration>,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub turn_timeout: Duration,
    #[serde(default)]
    pub max_rounds: Option<u32>,
    pub word_level: u8,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub ranked: bool,
    #[serde(default)]
    pub tournament: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub elimination: bool,
    pub hints_per_turn: u8,
    #[serde(default)]
    pub hint_selection: HintSelection,
    #[serde(default)]
    pub record: bool,
    #[serde(default)]
    pub video: bool,
    #[serde(default)]
    pub voice: bool,
}

impl SessionSettings {
    /// Defaults for a multi-player session of the given mode.
    pub fn for_mode(mode: GameMode) -> Self {
        let base = Self {
            mode,
            min_players: 2,
            max_players: 2,
            time_limit: None,
            turn_timeout: DEFAULT_TURN_TIMEOUT,
            max_rounds: None,
            word_level: 1,
            category: None,
            ranked: false,
            tournament: false,
            private: false,
            elimination: false,
            hints_per_turn: DEFAULT_HINTS_PER_TURN,
            hint_selection: HintSelection::default(),
            record: false,
            video: true,
            voice: true,
        };

        match mode {
            GameMode::RoundRobin => Self {
                max_players: MAX_ROSTER,
                max_rounds: Some(10),
                ..base
            },
            GameMode::RapidFire => Self {
                max_players: 2,
                time_limit: Some(10 * MINUTE),
                ..base
            },
            GameMode::TotalGame => Self {
                max_players: 8,
                time_limit: Some(30 * MINUTE),
                ..base
            },
        }
    }

    /// Defaults for a one-player session of the given mode.
    pub fn solo(mode: GameMode) -> Self {
        Self {
            min_players: 1,
            max_players: 1,
            video: false,
            ..Self::for_mode(mode)
        }
    }

    /// Ranked results feed the rating ladder.
    pub fn is_competitive(&self) -> bool {
        !self.private && (self.tournament || self.mode != GameMode::RapidFire)
    }

    pub fn requires_recording(&self) -> bool {
        self.record && !self.private && self.tournament
    }

    /// Validate for a session of `kind` and resolve its completion policy.
    ///
    /// Precedence: elimination flag, then the mode's own rule (round limit
    /// for round-robin, time limit for rapid-fire and total-game).
    pub fn validate(&self, kind: SessionKind) -> Result<CompletionPolicy, EngineError> {
        self.validate_roster(kind)?;
        self.validate_mode(kind)?;

        if !WORD_LEVELS.contains(&self.word_level) {
            return Err(EngineError::invalid_settings(format!(
                "word level must be between {}-{}, got {}",
                WORD_LEVELS.start(),
                WORD_LEVELS.end(),
                self.word_level
            )));
        }
        if self.hints_per_turn > MAX_HINTS_PER_TURN {
            return Err(EngineError::invalid_settings(format!(
                "at most {MAX_HINTS_PER_TURN} hints per turn, got {}",
                self.hints_per_turn
            )));
        }
        if self.turn_timeout.is_zero() {
            return Err(EngineError::invalid_settings("turn timeout must be positive"));
        }

        self.completion_policy()
    }

    fn validate_roster(&self, kind: SessionKind) -> Result<(), EngineError> {
        if self.min_players == 0 {
            return Err(EngineError::invalid_settings("min players must be at least 1"));
        }
        if self.min_players > self.max_players {
            return Err(EngineError::invalid_settings(format!(
                "min players ({}) exceeds max players ({})",
                self.min_players, self.max_players
            )));
        }
        if self.max_players > MAX_ROSTER {
            return Err(EngineError::invalid_settings(format!(
                "at most {MAX_ROSTER} players per session, got {}",
                self.max_players
            )));
        }
        if kind.is_single_player() && self.max_players != 1 {
            return Err(EngineError::invalid_settings(format!(
                "{kind:?} sessions take exactly one player"
            )));
        }
        Ok(())
    }

    /// Player bounds per mode apply to multi-player sessions only.
    fn validate_mode(&self, kind: SessionKind) -> Result<(), EngineError> {
        let single = kind.is_single_player();
        match self.mode {
            GameMode::RoundRobin => {
                if !single && !(2..=MAX_ROSTER).contains(&self.max_players) {
                    return Err(EngineError::invalid_settings(
                        "round robin requires 2-32 players",
                    ));
                }
                if !self.elimination && self.max_rounds.unwrap_or(0) < 1 {
                    return Err(EngineError::invalid_settings(
                        "round robin requires at least 1 round",
                    ));
                }
            }
            GameMode::RapidFire => {
                if !single && self.max_players != 2 {
                    return Err(EngineError::invalid_settings("rapid fire is strictly 1v1"));
                }
                if !within(self.time_limit, MINUTE, 30 * MINUTE) {
                    return Err(EngineError::invalid_settings(
                        "rapid fire time limit must be between 1-30 minutes",
                    ));
                }
            }
            GameMode::TotalGame => {
                if !single && !(2..=8).contains(&self.max_players) {
                    return Err(EngineError::invalid_settings("total game requires 2-8 players"));
                }
                if !within(self.time_limit, 5 * MINUTE, 60 * MINUTE) {
                    return Err(EngineError::invalid_settings(
                        "total game time limit must be between 5-60 minutes",
                    ));
                }
            }
        }
        Ok(())
    }

    fn completion_policy(&self) -> Result<CompletionPolicy, EngineError> {
        if self.elimination {
            return Ok(CompletionPolicy::Elimination);
        }
        let policy = match self.mode {
            GameMode::RoundRobin => self.max_rounds.map(CompletionPolicy::RoundLimit),
            GameMode::RapidFire | GameMode::TotalGame => {
                self.time_limit.map(CompletionPolicy::TimeLimit)
            }
        };
        policy.ok_or_else(|| EngineError::invalid_settings("no completion rule configured"))
    }
}

fn within(limit: Option<Duration>, min: Duration, max: Duration) -> bool {
    matches!(limit, Some(d) if d >= min && d <= max)
}
