use thiserror::Error;

use crate::capabilities::{Capability, CapabilityError};
use crate::domain::ids::{PlayerId, SessionId};
use crate::errors::ErrorCode;

/// What a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotFoundKind {
    Session,
    Player,
    Word,
}

/// Engine-wide error type.
///
/// Validation variants are produced before any mutation happens, so a caller
/// that receives one can assume the session is exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Not found: {detail}")]
    NotFound { kind: NotFoundKind, detail: String },
    #[error("Invalid state: {detail}")]
    InvalidState { detail: String },
    #[error("Not enough players: {have} joined, {need} required")]
    NotEnoughPlayers { have: usize, need: usize },
    #[error("Session full: capacity is {capacity}")]
    SessionFull { capacity: usize },
    #[error("Player {player_id} does not own the current turn")]
    UnauthorizedTurn { player_id: PlayerId },
    #[error("No word is set for the current turn")]
    NoWordSet,
    #[error("Session is not active")]
    NoActiveSession,
    #[error("Turn expired after {elapsed_ms} ms")]
    TurnExpired { elapsed_ms: u64 },
    #[error("Hint budget of {budget} exhausted for this turn")]
    HintBudgetExhausted { budget: u8 },
    #[error("{capability} failed: {detail}")]
    CapabilityFailure {
        capability: Capability,
        detail: String,
    },
    #[error("Invalid settings: {detail}")]
    InvalidSettings { detail: String },
    #[error("Configuration error: {detail}")]
    Config { detail: String },
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::NotFound { kind, .. } => match kind {
                NotFoundKind::Session => ErrorCode::SessionNotFound,
                NotFoundKind::Player => ErrorCode::PlayerNotFound,
                NotFoundKind::Word => ErrorCode::WordNotFound,
            },
            EngineError::InvalidState { .. } => ErrorCode::InvalidState,
            EngineError::NotEnoughPlayers { .. } => ErrorCode::NotEnoughPlayers,
            EngineError::SessionFull { .. } => ErrorCode::SessionFull,
            EngineError::UnauthorizedTurn { .. } => ErrorCode::UnauthorizedTurn,
            EngineError::NoWordSet => ErrorCode::NoWordSet,
            EngineError::NoActiveSession => ErrorCode::NoActiveSession,
            EngineError::TurnExpired { .. } => ErrorCode::TurnExpired,
            EngineError::HintBudgetExhausted { .. } => ErrorCode::HintBudgetExhausted,
            EngineError::CapabilityFailure { .. } => ErrorCode::CapabilityFailure,
            EngineError::InvalidSettings { .. } => ErrorCode::InvalidSettings,
            EngineError::Config { .. } => ErrorCode::ConfigError,
        }
    }

    pub fn session_not_found(id: SessionId) -> Self {
        Self::NotFound {
            kind: NotFoundKind::Session,
            detail: format!("session {id} is not registered"),
        }
    }

    pub fn player_not_found(id: PlayerId) -> Self {
        Self::NotFound {
            kind: NotFoundKind::Player,
            detail: format!("player {id} is not in the roster"),
        }
    }

    pub fn invalid_state(detail: impl Into<String>) -> Self {
        Self::InvalidState {
            detail: detail.into(),
        }
    }

    pub fn invalid_settings(detail: impl Into<String>) -> Self {
        Self::InvalidSettings {
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    /// Wrap an external dependency error with the name of the capability.
    ///
    /// A word source reporting `NotFound` keeps its not-found meaning so
    /// callers can tell "no word at this level" apart from an outage.
    pub fn capability(capability: Capability, err: CapabilityError) -> Self {
        match (capability, err) {
            (Capability::WordSource, CapabilityError::NotFound(detail)) => Self::NotFound {
                kind: NotFoundKind::Word,
                detail,
            },
            (capability, err) => Self::CapabilityFailure {
                capability,
                detail: err.to_string(),
            },
        }
    }

    /// True for errors raised by an external dependency rather than by the
    /// session rules.
    pub fn is_capability_failure(&self) -> bool {
        matches!(
            self,
            EngineError::CapabilityFailure { .. }
                | EngineError::NotFound {
                    kind: NotFoundKind::Word,
                    ..
                }
        )
    }
}
