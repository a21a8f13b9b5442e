//! Attempts, hints and reveals from players in an active session.

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use super::SessionHandle;
use crate::capabilities::Capability;
use crate::domain::hints::HintKind;
use crate::domain::ids::PlayerId;
use crate::domain::machine::Settled;
use crate::domain::normalize::clean_transcript;
use crate::domain::session::{Attempt, AttemptSource};
use crate::domain::turn::Verdict;
use crate::domain::word::Word;
use crate::error::EngineError;

/// What a scored attempt did to the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptReport {
    pub attempt: Attempt,
    pub verdict: Verdict,
    /// The player's running score after this attempt.
    pub score: i64,
    pub delta: i64,
    pub eliminated: bool,
    /// Owner of the turn opened afterwards, if the session goes on.
    pub next_owner: Option<PlayerId>,
    pub ended: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HintReport {
    pub kind: HintKind,
    pub content: String,
    pub hints_used: u8,
    pub hints_remaining: u8,
}

impl SessionHandle {
    /// Score a typed attempt from the turn owner and move play on.
    pub async fn submit_attempt(
        &self,
        player: PlayerId,
        text: &str,
    ) -> Result<AttemptReport, EngineError> {
        self.attempt(player, text, AttemptSource::Text).await
    }

    /// Transcribe a spoken attempt, then score it like a typed one.
    ///
    /// Transcription runs before the session lock is taken, so a slow
    /// transcriber never blocks other players.
    pub async fn submit_voice_attempt(
        &self,
        player: PlayerId,
        audio: Bytes,
    ) -> Result<AttemptReport, EngineError> {
        let transcript = self
            .call(
                Capability::Transcription,
                self.caps.transcriber.transcribe(audio),
            )
            .await?;
        let text = clean_transcript(&transcript);
        debug!(session_id = %self.id, player_id = %player, transcript = %text, "Voice attempt transcribed");
        self.attempt(player, &text, AttemptSource::Voice).await
    }

    async fn attempt(
        &self,
        player: PlayerId,
        text: &str,
        source: AttemptSource,
    ) -> Result<AttemptReport, EngineError> {
        debug!(session_id = %self.id, player_id = %player, ?source, "Submitting attempt");
        let mut live = self.machine.lock().await;
        self.ensure_turn_alive(&mut live, player).await?;

        let mut draft = (*live).clone();
        let outcome = draft.submit_attempt(player, text, source, self.now())?;
        self.follow_progress(&mut draft, outcome.progress).await?;
        let next_owner = draft.turn().map(|t| t.owner);
        let ended = draft.status().is_terminal();
        self.commit(&mut live, draft).await?;

        Ok(AttemptReport {
            attempt: outcome.attempt,
            verdict: outcome.verdict,
            score: outcome.score,
            delta: outcome.delta,
            eliminated: outcome.eliminated,
            next_owner,
            ended,
        })
    }

    /// Ask the hint source for a hint on the current word. `kind` picks a
    /// specific hint; `None` lets the session's selection policy choose.
    ///
    /// The budget is only charged once the hint source has answered.
    pub async fn request_hint(
        &self,
        player: PlayerId,
        kind: Option<HintKind>,
    ) -> Result<HintReport, EngineError> {
        debug!(session_id = %self.id, player_id = %player, ?kind, "Requesting hint");
        let mut live = self.machine.lock().await;
        self.ensure_turn_alive(&mut live, player).await?;

        let mut draft = (*live).clone();
        let now = self.now();
        let (kind, word) = draft.prepare_hint(player, kind, now)?;
        let content = self
            .call(Capability::HintSource, self.caps.hints.get_hint(&word, kind))
            .await?;
        let hints_used = draft.grant_hint(player, kind, content.clone(), now)?;
        let hints_remaining = draft
            .turn()
            .map(|t| t.hints.remaining())
            .unwrap_or_default();
        self.commit(&mut live, draft).await?;

        Ok(HintReport {
            kind,
            content,
            hints_used,
            hints_remaining,
        })
    }

    /// Unmask the current word for the session.
    pub async fn reveal_word(&self, requested_by: PlayerId) -> Result<Word, EngineError> {
        debug!(session_id = %self.id, player_id = %requested_by, "Revealing word");
        let mut live = self.machine.lock().await;
        self.settle_locked(&mut live).await?;

        let mut draft = (*live).clone();
        let word = draft.reveal_word(requested_by, self.now())?;
        self.commit(&mut live, draft).await?;
        Ok(word)
    }

    /// Settle an overdue turn and make sure the turn `player` acts on is
    /// the one that was live when the call came in.
    ///
    /// The owner of an expired turn learns it arrived too late. Anyone else
    /// never gets to act on a turn opened while their call was settling,
    /// since they have not seen its word.
    async fn ensure_turn_alive(
        &self,
        live: &mut super::Live<'_>,
        player: PlayerId,
    ) -> Result<(), EngineError> {
        let before = live.turn().map(|t| (t.owner, t.started_at));
        if let Some(Settled::TurnExpired(expired)) = self.settle_locked(live).await? {
            if expired.owner == player {
                return Err(EngineError::TurnExpired {
                    elapsed_ms: expired.elapsed_ms,
                });
            }
        }
        match (before, live.turn().map(|t| (t.owner, t.started_at))) {
            (Some(_), Some(after)) if before != Some(after) => {
                Err(EngineError::UnauthorizedTurn { player_id: player })
            }
            (None, Some(_)) => Err(EngineError::NoWordSet),
            _ => Ok(()),
        }
    }
}
