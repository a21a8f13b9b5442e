//! Creation, roster changes, start and cancellation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{HandleContext, Live, SessionHandle};
use crate::capabilities::Capability;
use crate::domain::ids::PlayerId;
use crate::domain::machine::SessionStateMachine;
use crate::domain::session::{CancelReason, PlayerProfile};
use crate::domain::snapshot::SessionSnapshot;
use crate::error::EngineError;

impl SessionHandle {
    /// Persist a freshly built session, provision its room and open it for
    /// joining. On failure the stored record is marked cancelled (best
    /// effort) and no handle is returned.
    pub(crate) async fn open(
        machine: SessionStateMachine,
        ctx: HandleContext,
    ) -> Result<Arc<Self>, EngineError> {
        let handle = Self::new(machine, ctx);
        handle.provision().await?;
        Ok(Arc::new(handle))
    }

    async fn provision(&self) -> Result<(), EngineError> {
        let mut live = self.machine.lock().await;
        self.call(
            Capability::Persistence,
            self.caps.store.create_session(live.session()),
        )
        .await?;

        let room = if live.session().kind.needs_room() {
            match self
                .call(Capability::RoomProvisioning, self.caps.rooms.create_room(self.id))
                .await
            {
                Ok(room) => Some(room),
                Err(err) => {
                    self.abandon(&mut live).await;
                    return Err(err);
                }
            }
        } else {
            None
        };

        let mut draft = (*live).clone();
        draft.mark_waiting(room, self.now())?;
        if let Err(err) = self.commit(&mut live, draft).await {
            self.abandon(&mut live).await;
            return Err(err);
        }

        let session = live.session();
        info!(
            session_id = %self.id,
            kind = ?session.kind,
            mode = ?session.settings.mode,
            host = %session.host,
            "Session created"
        );
        Ok(())
    }

    /// Mark a session whose setup failed as cancelled in the store.
    async fn abandon(&self, live: &mut Live<'_>) {
        let mut draft = (**live).clone();
        if draft.cancel(CancelReason::SetupFailed, self.now()).is_ok() {
            if let Err(err) = self
                .call(
                    Capability::Persistence,
                    self.caps.store.update_session(draft.session()),
                )
                .await
            {
                warn!(session_id = %self.id, error = %err, "Could not mark abandoned session cancelled");
            }
            draft.drain_events();
            **live = draft;
        }
        self.bus.close();
    }

    pub async fn join(&self, profile: PlayerProfile) -> Result<Arc<SessionSnapshot>, EngineError> {
        debug!(session_id = %self.id, player_id = %profile.id, "Joining session");
        let mut live = self.machine.lock().await;
        self.settle_locked(&mut live).await?;

        let mut draft = (*live).clone();
        draft.join(profile, self.now())?;
        self.commit(&mut live, draft).await?;
        Ok(self.snapshot())
    }

    /// Remove a player. May pass the turn on, finish the session when the
    /// roster drops below the minimum, or cancel it when nobody is left.
    ///
    /// A word source outage never blocks leaving: the next turn is left
    /// pending instead.
    pub async fn leave(&self, player: PlayerId) -> Result<Arc<SessionSnapshot>, EngineError> {
        debug!(session_id = %self.id, player_id = %player, "Leaving session");
        let mut live = self.machine.lock().await;
        self.settle_locked(&mut live).await?;
        let word_missing = live.pending_owner().is_some();

        let mut draft = (*live).clone();
        if draft.leave(player, self.now())?.is_some() && !word_missing {
            self.open_pending(&mut draft).await?;
        }
        self.commit(&mut live, draft).await?;
        Ok(self.snapshot())
    }

    /// `Waiting → Active`: draws the turn order and opens the first turn.
    pub async fn start(&self) -> Result<Arc<SessionSnapshot>, EngineError> {
        debug!(session_id = %self.id, "Starting session");
        let mut live = self.machine.lock().await;
        live.validate_start()?;

        let word = self.fetch_word(&live).await?;
        self.pronounce(&word).await;
        let mut draft = (*live).clone();
        draft.start(word, self.now())?;
        self.commit(&mut live, draft).await?;

        info!(
            session_id = %self.id,
            players = live.session().roster.len(),
            completion = ?live.session().completion,
            "Session started"
        );
        Ok(self.snapshot())
    }

    /// Knock a player out of the turn order; they keep their score.
    pub async fn eliminate(&self, player: PlayerId) -> Result<Arc<SessionSnapshot>, EngineError> {
        debug!(session_id = %self.id, player_id = %player, "Eliminating player");
        let mut live = self.machine.lock().await;
        self.settle_locked(&mut live).await?;
        let word_missing = live.pending_owner().is_some();

        let mut draft = (*live).clone();
        if draft.eliminate(player, self.now())?.is_some() && !word_missing {
            self.open_pending(&mut draft).await?;
        }
        self.commit(&mut live, draft).await?;
        Ok(self.snapshot())
    }

    pub async fn cancel(&self) -> Result<Arc<SessionSnapshot>, EngineError> {
        debug!(session_id = %self.id, "Cancelling session");
        let mut live = self.machine.lock().await;

        let mut draft = (*live).clone();
        draft.cancel(CancelReason::Requested, self.now())?;
        self.commit(&mut live, draft).await?;
        info!(session_id = %self.id, "Session cancelled");
        Ok(self.snapshot())
    }
}
