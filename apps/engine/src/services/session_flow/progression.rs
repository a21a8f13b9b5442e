//! Turn progression: word fetches, new turns and lazy timeout handling.

use tracing::{debug, info, warn};

use super::{Live, SessionHandle};
use crate::capabilities::Capability;
use crate::domain::machine::{Progress, SessionStateMachine, Settled};
use crate::domain::session::CancelReason;
use crate::domain::word::Word;
use crate::error::{EngineError, NotFoundKind};

/// What [`SessionHandle::open_pending`] did to the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TurnOpening {
    NotNeeded,
    Opened,
    /// The word source failed; the turn stays pending for the next call.
    Deferred,
    Abandoned,
}

impl SessionHandle {
    /// Ask the word source for the session's next word.
    pub(super) async fn fetch_word(&self, machine: &SessionStateMachine) -> Result<Word, EngineError> {
        let (level, category) = machine.word_request();
        self.call(
            Capability::WordSource,
            self.caps.words.get_word(level, category),
        )
        .await
    }

    /// Best-effort pronunciation audio for a freshly opened turn.
    pub(super) async fn pronounce(&self, word: &Word) {
        let Some(audio) = &self.caps.audio else {
            return;
        };
        match tokio::time::timeout(self.capability_timeout, audio.generate(word)).await {
            Ok(Ok(bytes)) => {
                debug!(session_id = %self.id, word_id = %word.id, bytes = bytes.len(), "Pronunciation audio ready")
            }
            Ok(Err(err)) => {
                warn!(session_id = %self.id, word_id = %word.id, error = %err, "Pronunciation audio failed")
            }
            Err(_) => {
                warn!(session_id = %self.id, word_id = %word.id, "Pronunciation audio timed out")
            }
        }
    }

    /// Open the next turn on `draft` if `progress` calls for one.
    pub(super) async fn follow_progress(
        &self,
        draft: &mut SessionStateMachine,
        progress: Progress,
    ) -> Result<(), EngineError> {
        let Progress::NextTurn(owner) = progress else {
            return Ok(());
        };
        let word = self.fetch_word(draft).await?;
        self.pronounce(&word).await;
        draft.open_turn(owner, word, self.now())?;
        debug!(
            session_id = %self.id,
            owner = %owner,
            round = draft.session().round,
            "Turn opened"
        );
        Ok(())
    }

    /// Open the turn `draft` is waiting on, if any, without failing the
    /// surrounding operation when the word source is down.
    ///
    /// A failed fetch leaves the turn pending; the next call on the session
    /// retries it. The session is cancelled once the word source has been
    /// failing for a full turn timeout, or at once when it has no word to
    /// offer at all.
    pub(super) async fn open_pending(
        &self,
        draft: &mut SessionStateMachine,
    ) -> Result<TurnOpening, EngineError> {
        let Some(owner) = draft.pending_owner() else {
            return Ok(TurnOpening::NotNeeded);
        };
        match self.fetch_word(draft).await {
            Ok(word) => {
                *self.word_outage.lock() = None;
                self.pronounce(&word).await;
                draft.open_turn(owner, word, self.now())?;
                debug!(
                    session_id = %self.id,
                    owner = %owner,
                    round = draft.session().round,
                    "Pending turn opened"
                );
                Ok(TurnOpening::Opened)
            }
            Err(err) => {
                let now = self.now();
                let since = *self.word_outage.lock().get_or_insert(now);
                let waited_ms = (now - since).whole_milliseconds();
                let grace = draft.session().settings.turn_timeout;
                let exhausted = matches!(
                    err,
                    EngineError::NotFound {
                        kind: NotFoundKind::Word,
                        ..
                    }
                );
                if exhausted || waited_ms >= grace.as_millis() as i128 {
                    warn!(
                        session_id = %self.id,
                        waited_ms = waited_ms as i64,
                        error = %err,
                        "No word for the next turn, cancelling session"
                    );
                    draft.cancel(CancelReason::WordUnavailable, now)?;
                    Ok(TurnOpening::Abandoned)
                } else {
                    warn!(
                        session_id = %self.id,
                        owner = %owner,
                        waited_ms = waited_ms as i64,
                        error = %err,
                        "Next turn deferred"
                    );
                    Ok(TurnOpening::Deferred)
                }
            }
        }
    }

    /// Commit the expiry of an overdue turn (or an elapsed session time
    /// limit) before anything else touches the session, and open a turn
    /// left pending by an earlier word source failure.
    pub(super) async fn settle_locked(&self, live: &mut Live<'_>) -> Result<Option<Settled>, EngineError> {
        let now = self.now();
        if !live.is_settle_due(now) && live.pending_owner().is_none() {
            return Ok(None);
        }

        let mut draft = (**live).clone();
        let settled = draft.settle(now);
        match &settled {
            Some(Settled::TurnExpired(expired)) => {
                info!(
                    session_id = %self.id,
                    owner = %expired.owner,
                    elapsed_ms = expired.elapsed_ms,
                    eliminated = expired.eliminated,
                    "Turn timed out"
                );
            }
            Some(Settled::TimeLimitReached) => {
                info!(session_id = %self.id, "Session time limit reached");
            }
            None => {}
        }

        let opening = self.open_pending(&mut draft).await?;
        let unchanged = matches!(opening, TurnOpening::NotNeeded | TurnOpening::Deferred);
        if settled.is_none() && unchanged {
            return Ok(None);
        }
        self.commit(live, draft).await?;
        Ok(settled)
    }

    /// Apply an overdue timeout now instead of waiting for the next call.
    ///
    /// This is what an external scheduler or the sweeper drives for idle
    /// sessions.
    pub async fn expire_turn_if_due(&self) -> Result<Option<Settled>, EngineError> {
        let mut live = self.machine.lock().await;
        self.settle_locked(&mut live).await
    }
}
