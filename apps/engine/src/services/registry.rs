//! Registry of live sessions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::session_flow::{HandleContext, SessionHandle};
use super::sweeper::{self, SweeperHandle};
use crate::capabilities::Capabilities;
use crate::config::EngineConfig;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::ids::SessionId;
use crate::domain::machine::{session_rng, SessionStateMachine};
use crate::domain::session::PlayerProfile;
use crate::domain::settings::{GameMode, SessionKind, SessionSettings};
use crate::domain::snapshot::SessionSnapshot;
use crate::error::EngineError;

/// Concurrency-safe map of session id to live session.
///
/// Lookups never wait on a session's lock; each handle serializes its own
/// mutations.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<SessionHandle>>,
    ctx: HandleContext,
    config: EngineConfig,
    created: AtomicU64,
}

impl SessionRegistry {
    pub fn new(config: EngineConfig, caps: Capabilities) -> Result<Self, EngineError> {
        Self::with_clock(config, caps, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: EngineConfig,
        caps: Capabilities,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let ctx = HandleContext {
            caps,
            clock,
            capability_timeout: config.capability_timeout,
            event_capacity: config.event_capacity,
            overflow_policy: config.overflow_policy,
        };
        Ok(Self {
            sessions: DashMap::new(),
            ctx,
            config,
            created: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build, persist and open a session. It only becomes visible here once
    /// it reached `Waiting`.
    pub async fn create(
        &self,
        kind: SessionKind,
        settings: SessionSettings,
        host: PlayerProfile,
    ) -> Result<Arc<SessionHandle>, EngineError> {
        let id = SessionId::new();
        let ordinal = self.created.fetch_add(1, Ordering::Relaxed);
        debug!(session_id = %id, ?kind, mode = ?settings.mode, host = %host.id, "Creating session");

        let rng = session_rng(self.config.rng_seed, ordinal);
        let machine =
            SessionStateMachine::create(id, kind, settings, host, rng, self.ctx.clock.now())?;
        let handle = SessionHandle::open(machine, self.ctx.clone()).await?;
        self.sessions.insert(id, handle.clone());
        Ok(handle)
    }

    /// [`create`](Self::create) with this engine's defaults for `mode`.
    pub async fn create_with_defaults(
        &self,
        kind: SessionKind,
        mode: GameMode,
        host: PlayerProfile,
    ) -> Result<Arc<SessionHandle>, EngineError> {
        let settings = if kind.is_single_player() {
            SessionSettings {
                turn_timeout: self.config.default_turn_timeout,
                hints_per_turn: self.config.default_hints_per_turn,
                hint_selection: self.config.default_hint_selection,
                ..SessionSettings::solo(mode)
            }
        } else {
            self.config.settings_for(mode)
        };
        self.create(kind, settings, host).await
    }

    pub fn get(&self, id: SessionId) -> Result<Arc<SessionHandle>, EngineError> {
        self.sessions
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::session_not_found(id))
    }

    /// Drop a session from the registry and close its event stream.
    /// Unknown ids are ignored.
    pub fn remove(&self, id: SessionId) -> Option<Arc<SessionHandle>> {
        let (_, handle) = self.sessions.remove(&id)?;
        handle.close_events();
        debug!(session_id = %id, "Session removed from registry");
        Some(handle)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Ids of sessions that have not reached a terminal status.
    pub fn active_ids(&self) -> Vec<SessionId> {
        self.sessions
            .iter()
            .filter(|entry| !entry.value().snapshot().status.is_terminal())
            .map(|entry| *entry.key())
            .collect()
    }

    pub fn snapshot_all(&self) -> Vec<Arc<SessionSnapshot>> {
        self.sessions
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect()
    }

    /// Settle every overdue turn. Returns how many sessions moved.
    pub async fn sweep_expired_turns(&self) -> usize {
        // Collect first so no map shard is held across an await.
        let handles: Vec<_> = self
            .sessions
            .iter()
            .filter(|entry| !entry.value().snapshot().status.is_terminal())
            .map(|entry| entry.value().clone())
            .collect();

        let mut settled = 0;
        for handle in handles {
            match handle.expire_turn_if_due().await {
                Ok(Some(_)) => settled += 1,
                Ok(None) => {}
                Err(err) => {
                    warn!(session_id = %handle.id(), error = %err, "Failed to settle expired turn")
                }
            }
        }
        settled
    }

    /// Remove finished and cancelled sessions. Returns how many went.
    pub fn prune_terminal(&self) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, handle| !handle.snapshot().status.is_terminal());
        let pruned = before.saturating_sub(self.sessions.len());
        if pruned > 0 {
            info!(pruned, remaining = self.sessions.len(), "Pruned terminal sessions");
        }
        pruned
    }

    /// Start the background sweeper when `turn_sweep_interval` is set.
    pub fn start_sweeper(self: &Arc<Self>) -> Option<SweeperHandle> {
        let period = self.config.turn_sweep_interval?;
        Some(sweeper::spawn(Arc::downgrade(self), period))
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("config", &self.config)
            .finish()
    }
}
