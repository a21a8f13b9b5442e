//! Read-only views of a session.
//!
//! A snapshot is built after every committed transition and shared behind an
//! `Arc`, so readers never touch the live state machine.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::ids::{PlayerId, SessionId};
use crate::domain::ranking::Standing;
use crate::domain::session::{Player, RoomHandle, Session, SessionStatus};
use crate::domain::settings::{CompletionPolicy, SessionKind, SessionSettings};
use crate::domain::turn::Turn;

/// What observers may see of the live turn. The word text only appears once
/// it has been revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnView {
    pub owner: PlayerId,
    pub display: String,
    pub masked: bool,
    pub letters: usize,
    pub hints_used: u8,
    pub hint_budget: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
}

impl TurnView {
    pub fn of(turn: &Turn, timeout: std::time::Duration) -> Self {
        Self {
            owner: turn.owner,
            display: if turn.masked {
                turn.word.masked()
            } else {
                turn.word.text.clone()
            },
            masked: turn.masked,
            letters: turn.word.char_len(),
            hints_used: turn.hints.used(),
            hint_budget: turn.hints.budget(),
            started_at: turn.started_at,
            deadline: turn.deadline(timeout),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub kind: SessionKind,
    pub status: SessionStatus,
    pub settings: SessionSettings,
    pub completion: CompletionPolicy,
    pub host: PlayerId,
    pub roster: Vec<Player>,
    pub round: u32,
    pub turn_order: Vec<PlayerId>,
    pub turn: Option<TurnView>,
    /// Set while the next turn waits on the word source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_owner: Option<PlayerId>,
    pub room: Option<RoomHandle>,
    pub attempts: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standings: Option<Vec<Standing>>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl SessionSnapshot {
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.roster.iter().find(|p| p.id == id)
    }

    pub fn current_owner(&self) -> Option<PlayerId> {
        self.turn.as_ref().map(|t| t.owner)
    }

    pub(crate) fn from_parts(
        session: &Session,
        turn_order: &[PlayerId],
        turn: Option<TurnView>,
        attempts: usize,
        standings: Option<Vec<Standing>>,
    ) -> Self {
        let pending_owner = match (&turn, session.status) {
            (None, SessionStatus::Active) => session.current_owner,
            _ => None,
        };
        Self {
            id: session.id,
            kind: session.kind,
            status: session.status,
            settings: session.settings.clone(),
            completion: session.completion,
            host: session.host,
            roster: session.roster.clone(),
            round: session.round,
            turn_order: turn_order.to_vec(),
            turn,
            pending_owner,
            room: session.room.clone(),
            attempts,
            standings,
            updated_at: session.updated_at,
        }
    }
}
