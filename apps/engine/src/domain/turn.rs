//! The live turn and the controller that guards it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::hints::{HintKind, HintManager};
use crate::domain::ids::PlayerId;
use crate::domain::normalize::attempt_matches;
use crate::domain::session::SessionStatus;
use crate::domain::word::Word;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
}

impl Verdict {
    pub fn is_correct(self) -> bool {
        matches!(self, Verdict::Correct)
    }
}

/// One word, one owner. Replaced wholesale when the next turn opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub owner: PlayerId,
    pub word: Word,
    pub masked: bool,
    pub hints: HintManager,
    pub started_at: OffsetDateTime,
    revealed_once: bool,
}

impl Turn {
    pub fn hints_used(&self) -> u8 {
        self.hints.used()
    }

    pub fn deadline(&self, timeout: Duration) -> OffsetDateTime {
        self.started_at + timeout
    }

    /// Milliseconds since the turn opened; zero if the clock went backwards.
    pub fn elapsed_ms(&self, now: OffsetDateTime) -> u64 {
        let elapsed = (now - self.started_at).whole_milliseconds();
        u64::try_from(elapsed).unwrap_or(0)
    }
}

/// Owns at most one live turn and enforces its rules.
#[derive(Debug, Clone)]
pub struct TurnController {
    turn: Option<Turn>,
    timeout: Duration,
    hint_budget: u8,
}

impl TurnController {
    pub fn new(timeout: Duration, hint_budget: u8) -> Self {
        Self {
            turn: None,
            timeout,
            hint_budget,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn hint_budget(&self) -> u8 {
        self.hint_budget
    }

    pub fn current(&self) -> Option<&Turn> {
        self.turn.as_ref()
    }

    /// Open a fresh turn: masked, no hints used, stamped `now`.
    pub fn start_turn(
        &mut self,
        status: SessionStatus,
        owner: PlayerId,
        word: Word,
        now: OffsetDateTime,
    ) -> Result<&Turn, EngineError> {
        if status != SessionStatus::Active {
            return Err(EngineError::NoActiveSession);
        }
        let turn = self.turn.insert(Turn {
            owner,
            word,
            masked: true,
            hints: HintManager::new(self.hint_budget),
            started_at: now,
            revealed_once: false,
        });
        Ok(&*turn)
    }

    pub fn close(&mut self) -> Option<Turn> {
        self.turn.take()
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.turn
            .as_ref()
            .is_some_and(|t| u128::from(t.elapsed_ms(now)) > self.timeout.as_millis())
    }

    fn live_turn(&self, now: OffsetDateTime) -> Result<&Turn, EngineError> {
        let turn = self.turn.as_ref().ok_or(EngineError::NoWordSet)?;
        if self.is_expired(now) {
            return Err(EngineError::TurnExpired {
                elapsed_ms: turn.elapsed_ms(now),
            });
        }
        Ok(turn)
    }

    /// Exact match after normalization; no partial credit.
    pub fn validate_attempt(&self, text: &str, now: OffsetDateTime) -> Result<Verdict, EngineError> {
        let turn = self.live_turn(now)?;
        Ok(if attempt_matches(&turn.word.text, text) {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        })
    }

    /// Checks that a hint could be granted right now without consuming one.
    pub fn ensure_hint_available(&self, now: OffsetDateTime) -> Result<&Turn, EngineError> {
        let turn = self.live_turn(now)?;
        turn.hints.ensure_available()?;
        Ok(turn)
    }

    pub fn grant_hint(&mut self, kind: HintKind) -> Result<u8, EngineError> {
        let turn = self.turn.as_mut().ok_or(EngineError::NoWordSet)?;
        turn.hints.record(kind)
    }

    /// Unmask the word. Returns the word and whether this call did the
    /// unmasking for the first time.
    pub fn reveal(&mut self) -> Result<(Word, bool), EngineError> {
        let turn = self.turn.as_mut().ok_or(EngineError::NoWordSet)?;
        turn.masked = false;
        let first = !turn.revealed_once;
        turn.revealed_once = true;
        Ok((turn.word.clone(), first))
    }
}
