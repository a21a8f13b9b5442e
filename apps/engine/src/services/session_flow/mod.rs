//! Session handles: the concurrency boundary around one state machine.
//!
//! Every mutation takes the session's async mutex, settles an overdue turn,
//! applies the operation to a cloned draft, performs the capability calls the
//! transition needs, persists the draft and only then swaps it in and
//! publishes its events. A failure anywhere leaves the live machine as it
//! was.

mod lifecycle;
mod player_actions;
mod progression;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex as SyncMutex, RwLock};
use time::OffsetDateTime;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::capabilities::{Capabilities, Capability, CapabilityError};
use crate::domain::clock::Clock;
use crate::domain::ids::SessionId;
use crate::domain::machine::SessionStateMachine;
use crate::domain::session::Attempt;
use crate::domain::snapshot::SessionSnapshot;
use crate::error::EngineError;
use crate::events::{EventBus, OverflowPolicy, Subscription};

pub use player_actions::{AttemptReport, HintReport};

/// Shared handle to one live session.
pub struct SessionHandle {
    id: SessionId,
    machine: Mutex<SessionStateMachine>,
    snapshot: RwLock<Arc<SessionSnapshot>>,
    history: RwLock<Vec<Attempt>>,
    bus: EventBus,
    caps: Capabilities,
    clock: Arc<dyn Clock>,
    capability_timeout: Duration,
    /// When the word source started failing a pending turn.
    word_outage: SyncMutex<Option<OffsetDateTime>>,
}

/// Everything a handle needs besides its machine.
#[derive(Clone)]
pub(crate) struct HandleContext {
    pub caps: Capabilities,
    pub clock: Arc<dyn Clock>,
    pub capability_timeout: Duration,
    pub event_capacity: usize,
    pub overflow_policy: OverflowPolicy,
}

type Live<'a> = MutexGuard<'a, SessionStateMachine>;

impl SessionHandle {
    fn new(machine: SessionStateMachine, ctx: HandleContext) -> Self {
        let id = machine.id();
        let snapshot = Arc::new(machine.snapshot());
        let history = machine.attempts().to_vec();
        Self {
            id,
            bus: EventBus::new(id, ctx.event_capacity, ctx.overflow_policy),
            machine: Mutex::new(machine),
            snapshot: RwLock::new(snapshot),
            history: RwLock::new(history),
            caps: ctx.caps,
            clock: ctx.clock,
            capability_timeout: ctx.capability_timeout,
            word_outage: SyncMutex::new(None),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Latest committed state. Never waits on a writer.
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.snapshot.read().clone()
    }

    /// Recorded attempts in submission order.
    pub fn attempts(&self) -> Vec<Attempt> {
        self.history.read().clone()
    }

    /// Events published after this call.
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    pub fn last_event_seq(&self) -> u64 {
        self.bus.last_seq()
    }

    pub(crate) fn close_events(&self) {
        self.bus.close();
    }

    fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Run one capability call under the configured timeout.
    async fn call<T, F>(&self, capability: Capability, fut: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, CapabilityError>>,
    {
        let result = match tokio::time::timeout(self.capability_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CapabilityError::Timeout),
        };
        result.map_err(|err| {
            warn!(session_id = %self.id, capability = %capability, error = %err, "Capability call failed");
            EngineError::capability(capability, err)
        })
    }

    /// Persist `draft`, swap it in and publish what it produced.
    async fn commit(
        &self,
        live: &mut Live<'_>,
        mut draft: SessionStateMachine,
    ) -> Result<(), EngineError> {
        self.persist(&**live, &draft).await?;

        let events = draft.drain_events();
        let new_attempts = draft.attempts()[live.attempts().len()..].to_vec();
        **live = draft;

        if !new_attempts.is_empty() {
            self.history.write().extend(new_attempts);
        }
        *self.snapshot.write() = Arc::new(live.snapshot());
        self.bus.publish(events).await;

        if live.status().is_terminal() {
            info!(
                session_id = %self.id,
                status = ?live.status(),
                attempts = live.attempts().len(),
                "Session reached terminal state"
            );
            self.bus.close();
        }
        Ok(())
    }

    /// Mirror the difference between the live machine and `draft` into the
    /// store.
    async fn persist(
        &self,
        live: &SessionStateMachine,
        draft: &SessionStateMachine,
    ) -> Result<(), EngineError> {
        let store = &self.caps.store;
        let before = live.session();
        let after = draft.session();

        for attempt in &draft.attempts()[live.attempts().len()..] {
            self.call(Capability::Persistence, store.record_attempt(attempt))
                .await?;
        }
        for player in &after.roster {
            match before.player(player.id) {
                None => {
                    self.call(Capability::Persistence, store.add_player(self.id, player))
                        .await?
                }
                Some(old) if old.score != player.score => {
                    self.call(
                        Capability::Persistence,
                        store.update_player_score(self.id, player.id, player.score),
                    )
                    .await?
                }
                Some(_) => {}
            }
        }
        for player in &before.roster {
            if !after.is_member(player.id) {
                self.call(Capability::Persistence, store.remove_player(self.id, player.id))
                    .await?;
            }
        }
        self.call(Capability::Persistence, store.update_session(after))
            .await
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("status", &snapshot.status)
            .field("round", &snapshot.round)
            .field("bus", &self.bus)
            .finish()
    }
}
