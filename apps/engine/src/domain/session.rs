//! Session, player and attempt records.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::ids::{AttemptId, PlayerId, SessionId};
use crate::domain::scoring::AttemptStats;
use crate::domain::settings::{CompletionPolicy, SessionKind, SessionSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Waiting,
    Active,
    Finished,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Finished | SessionStatus::Cancelled)
    }
}

/// Why a session finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    RoundLimit,
    TimeLimit,
    /// Elimination policy: at most one player left standing.
    LastStanding,
    /// A leave dropped the roster below the minimum mid-game.
    NotEnoughPlayers,
}

/// Why a session was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    Requested,
    RosterEmpty,
    SetupFailed,
    /// The word source kept failing while a new turn waited for its word.
    WordUnavailable,
}

/// Video/audio room allocated for a multi-player session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomHandle {
    pub room_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub score: i64,
    pub attempts: u32,
    pub correct: u32,
    pub total_response_ms: u64,
    pub hints_used: u32,
    pub eliminated: bool,
    pub bot: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, joined_at: OffsetDateTime) -> Self {
        Self {
            id,
            name: name.into(),
            score: 0,
            attempts: 0,
            correct: 0,
            total_response_ms: 0,
            hints_used: 0,
            eliminated: false,
            bot: false,
            joined_at,
        }
    }

    pub fn bot(id: PlayerId, name: impl Into<String>, joined_at: OffsetDateTime) -> Self {
        Self {
            bot: true,
            ..Self::new(id, name, joined_at)
        }
    }

    pub fn stats(&self) -> AttemptStats {
        let avg_response_secs = if self.attempts == 0 {
            0.0
        } else {
            self.total_response_ms as f64 / 1000.0 / f64::from(self.attempts)
        };
        AttemptStats {
            correct: self.correct,
            total: self.attempts,
            avg_response_secs,
        }
    }
}

/// Who joins a session: the host at creation or anyone afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub bot: bool,
}

impl PlayerProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PlayerId::new(),
            name: name.into(),
            bot: false,
        }
    }

    pub fn bot(name: impl Into<String>) -> Self {
        Self {
            bot: true,
            ..Self::new(name)
        }
    }

    pub fn into_player(self, joined_at: OffsetDateTime) -> Player {
        Player {
            bot: self.bot,
            ..Player::new(self.id, self.name, joined_at)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptSource {
    Text,
    Voice,
}

/// One recorded spelling attempt. Never modified once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: AttemptId,
    pub session_id: SessionId,
    pub player_id: PlayerId,
    pub word_id: String,
    pub word: String,
    pub submitted: String,
    pub source: AttemptSource,
    pub correct: bool,
    pub response_ms: u64,
    pub round: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// The durable part of a session: everything except the live turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub kind: SessionKind,
    pub settings: SessionSettings,
    pub completion: CompletionPolicy,
    pub status: SessionStatus,
    pub roster: Vec<Player>,
    pub round: u32,
    pub current_owner: Option<PlayerId>,
    pub host: PlayerId,
    pub room: Option<RoomHandle>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
}

impl Session {
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.roster.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.roster.iter_mut().find(|p| p.id == id)
    }

    pub fn is_member(&self, id: PlayerId) -> bool {
        self.player(id).is_some()
    }

    /// Roster members that can still take turns.
    pub fn standing_count(&self) -> usize {
        self.roster.iter().filter(|p| !p.eliminated).count()
    }
}
