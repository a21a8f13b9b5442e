//! Error codes for the session engine.
//!
//! Every `EngineError` maps to exactly one code here. Add new codes here;
//! never pass ad-hoc strings as error codes to callers.
//!
//! All error codes are SCREAMING_SNAKE_CASE and are the strings a request
//! handler is expected to surface verbatim.

use core::fmt;

/// Centralized error codes for the session engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Resource Not Found
    /// Session id is not registered
    SessionNotFound,
    /// Player is not part of the session roster
    PlayerNotFound,
    /// Word source had nothing for the requested level/category
    WordNotFound,

    // Lifecycle
    /// Operation not valid in the session's current status
    InvalidState,
    /// Roster smaller than the configured minimum
    NotEnoughPlayers,
    /// Roster already at the configured maximum
    SessionFull,
    /// Session is not in the Active status
    NoActiveSession,

    // Turn Rules
    /// Attempt or hint from a player who does not own the turn
    UnauthorizedTurn,
    /// No word is set for the current turn
    NoWordSet,
    /// Turn time limit elapsed before the attempt arrived
    TurnExpired,
    /// Per-turn hint budget already consumed
    HintBudgetExhausted,

    // Validation
    /// Session settings rejected at creation time
    InvalidSettings,

    // System Errors
    /// An external capability failed or timed out
    CapabilityFailure,
    /// Configuration error
    ConfigError,
}

impl ErrorCode {
    /// Returns the canonical SCREAMING_SNAKE_CASE string for this error code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            // Resource Not Found
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::PlayerNotFound => "PLAYER_NOT_FOUND",
            Self::WordNotFound => "WORD_NOT_FOUND",

            // Lifecycle
            Self::InvalidState => "INVALID_STATE",
            Self::NotEnoughPlayers => "NOT_ENOUGH_PLAYERS",
            Self::SessionFull => "SESSION_FULL",
            Self::NoActiveSession => "NO_ACTIVE_SESSION",

            // Turn Rules
            Self::UnauthorizedTurn => "UNAUTHORIZED_TURN",
            Self::NoWordSet => "NO_WORD_SET",
            Self::TurnExpired => "TURN_EXPIRED",
            Self::HintBudgetExhausted => "HINT_BUDGET_EXHAUSTED",

            // Validation
            Self::InvalidSettings => "INVALID_SETTINGS",

            // System Errors
            Self::CapabilityFailure => "CAPABILITY_FAILURE",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
