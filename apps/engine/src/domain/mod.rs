//! Domain layer: pure session logic, no I/O.

pub mod clock;
pub mod events;
pub mod hints;
pub mod ids;
pub mod machine;
pub mod normalize;
pub mod ranking;
pub mod scoring;
pub mod seed_derivation;
pub mod session;
pub mod settings;
pub mod snapshot;
pub mod turn;
pub mod turn_order;
pub mod word;

#[cfg(test)]
mod test_prelude;
#[cfg(test)]
mod tests_lifecycle;
#[cfg(test)]
mod tests_progress;
#[cfg(test)]
mod tests_props_hints;
#[cfg(test)]
mod tests_props_turn_order;

// Re-exports for ergonomics
pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{EventKind, PendingEvent, RevealReason, SessionEvent};
pub use hints::{HintKind, HintManager};
pub use ids::{AttemptId, PlayerId, SessionId};
pub use machine::{session_rng, AttemptOutcome, ExpiredTurn, Progress, SessionStateMachine, Settled};
pub use normalize::{attempt_matches, clean_transcript, normalize_attempt};
pub use ranking::{apply_points, placement_points, standings, RankTier, Standing};
pub use scoring::{calculate_score, AttemptStats};
pub use session::{
    Attempt, AttemptSource, CancelReason, EndReason, Player, PlayerProfile, RoomHandle, Session,
    SessionStatus,
};
pub use settings::{CompletionPolicy, GameMode, HintSelection, SessionKind, SessionSettings};
pub use snapshot::{SessionSnapshot, TurnView};
pub use turn::{Turn, TurnController, Verdict};
pub use turn_order::TurnOrder;
pub use word::Word;
