//! Session event payloads.
//!
//! Each kind has a fixed payload shape. The state machine produces
//! [`PendingEvent`]s; the event bus stamps them with the session id and a
//! sequence number when they are published.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::hints::HintKind;
use crate::domain::ids::{AttemptId, PlayerId, SessionId};
use crate::domain::ranking::Standing;
use crate::domain::session::{CancelReason, EndReason, RoomHandle};
use crate::domain::settings::{CompletionPolicy, GameMode, SessionKind};

/// Why a word was unmasked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealReason {
    Requested,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    SessionCreated {
        kind: SessionKind,
        mode: GameMode,
        host: PlayerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<RoomHandle>,
    },
    PlayerJoined {
        name: String,
        roster_size: usize,
    },
    PlayerLeft {
        roster_size: usize,
    },
    SessionStarted {
        order: Vec<PlayerId>,
        completion: CompletionPolicy,
    },
    TurnStarted {
        round: u32,
        owner: PlayerId,
        masked_word: String,
        hint_budget: u8,
        #[serde(with = "time::serde::rfc3339")]
        deadline: OffsetDateTime,
    },
    AttemptResult {
        attempt_id: AttemptId,
        submitted: String,
        correct: bool,
        response_ms: u64,
        score: i64,
        delta: i64,
    },
    HintGranted {
        kind: HintKind,
        content: String,
        hints_used: u8,
        hints_remaining: u8,
    },
    WordRevealed {
        word: String,
        reason: RevealReason,
    },
    PlayerEliminated {
        remaining: usize,
    },
    RoundAdvanced {
        round: u32,
    },
    SessionEnded {
        reason: EndReason,
        standings: Vec<Standing>,
    },
    SessionCancelled {
        reason: CancelReason,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::SessionCreated { .. } => "session_created",
            EventKind::PlayerJoined { .. } => "player_joined",
            EventKind::PlayerLeft { .. } => "player_left",
            EventKind::SessionStarted { .. } => "session_started",
            EventKind::TurnStarted { .. } => "turn_started",
            EventKind::AttemptResult { .. } => "attempt_result",
            EventKind::HintGranted { .. } => "hint_granted",
            EventKind::WordRevealed { .. } => "word_revealed",
            EventKind::PlayerEliminated { .. } => "player_eliminated",
            EventKind::RoundAdvanced { .. } => "round_advanced",
            EventKind::SessionEnded { .. } => "session_ended",
            EventKind::SessionCancelled { .. } => "session_cancelled",
        }
    }

    /// Events after which the session accepts nothing more.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::SessionEnded { .. } | EventKind::SessionCancelled { .. }
        )
    }
}

/// An event produced by a transition, not yet published.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub player_id: Option<PlayerId>,
    pub at: OffsetDateTime,
    pub kind: EventKind,
}

/// A published event as subscribers see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub seq: u64,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    #[serde(flatten)]
    pub kind: EventKind,
}
