#![allow(dead_code)]

// tests/common/mod.rs
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use spellbee_engine::capabilities::memory::{InMemoryStore, LocalRooms, StaticWordSource};
use spellbee_engine::capabilities::{
    Capabilities, CapabilityError, RoomProvisioner, SessionStore, WordSource,
};
use spellbee_engine::domain::{
    Attempt, ManualClock, Player, PlayerId, PlayerProfile, RoomHandle, Session, SessionId,
    SessionKind, SessionSettings, GameMode, Word,
};
use spellbee_engine::{EngineConfig, SessionHandle, SessionRegistry};
use time::macros::datetime;
use time::OffsetDateTime;

// Logging is auto-installed for every test binary
#[ctor::ctor]
fn init_logging() {
    engine_test_support::logging::init();
}

pub const WORD: &str = "garden";

pub fn t0() -> OffsetDateTime {
    datetime!(2025-06-01 9:00 UTC)
}

/// A level-1 word with enough metadata for definition and synonym hints.
pub fn garden() -> Word {
    let mut word = Word::new("w-garden", WORD, 1).with_definition("A plot where plants grow");
    word.synonyms = vec!["yard".into(), "plot".into()];
    word
}

/// Everything a test needs to drive sessions and inspect the fakes.
pub struct Harness {
    pub registry: Arc<SessionRegistry>,
    pub store: Arc<InMemoryStore>,
    pub rooms: Arc<LocalRooms>,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(EngineConfig::default(), |caps| caps)
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::build(config, |caps| caps)
    }

    pub fn with_caps(customize: impl FnOnce(Capabilities) -> Capabilities) -> Self {
        Self::build(EngineConfig::default(), customize)
    }

    pub fn build(
        config: EngineConfig,
        customize: impl FnOnce(Capabilities) -> Capabilities,
    ) -> Self {
        let store = Arc::new(InMemoryStore::default());
        let rooms = Arc::new(LocalRooms::default());
        let clock = ManualClock::new(t0());
        let caps = Capabilities::in_memory(vec![garden()])
            .with_store(store.clone())
            .with_rooms(rooms.clone());
        let registry = SessionRegistry::with_clock(
            EngineConfig {
                rng_seed: Some(7),
                ..config
            },
            customize(caps),
            Arc::new(clock.clone()),
        )
        .expect("valid config");
        Self {
            registry: Arc::new(registry),
            store,
            rooms,
            clock,
        }
    }

    /// Multi session with `players` members (host first), still waiting.
    pub async fn waiting(
        &self,
        settings: SessionSettings,
        players: usize,
    ) -> (Arc<SessionHandle>, Vec<PlayerId>) {
        let host = PlayerProfile::new("player-0");
        let mut ids = vec![host.id];
        let handle = self
            .registry
            .create(SessionKind::Multi, settings, host)
            .await
            .expect("create session");
        for i in 1..players {
            let profile = PlayerProfile::new(format!("player-{i}"));
            ids.push(profile.id);
            handle.join(profile).await.expect("join");
        }
        (handle, ids)
    }

    /// Multi session with `players` members, already started.
    pub async fn active(
        &self,
        settings: SessionSettings,
        players: usize,
    ) -> (Arc<SessionHandle>, Vec<PlayerId>) {
        let (handle, ids) = self.waiting(settings, players).await;
        handle.start().await.expect("start session");
        (handle, ids)
    }

    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance(time::Duration::seconds(secs));
    }
}

pub fn round_robin(players: usize, rounds: u32) -> SessionSettings {
    SessionSettings {
        max_players: players.max(2),
        max_rounds: Some(rounds),
        ..SessionSettings::for_mode(GameMode::RoundRobin)
    }
}

pub fn owner(handle: &SessionHandle) -> PlayerId {
    handle
        .snapshot()
        .current_owner()
        .expect("session has a turn owner")
}

pub fn other(ids: &[PlayerId], not: PlayerId) -> PlayerId {
    *ids.iter().find(|id| **id != not).expect("another player")
}

/// Who follows `id` in the drawn turn order.
pub fn next_in_order(order: &[PlayerId], id: PlayerId) -> PlayerId {
    let idx = order.iter().position(|p| *p == id).expect("player in turn order");
    order[(idx + 1) % order.len()]
}

/// Word source that can be switched to failing mid-test.
pub struct FlakyWords {
    inner: StaticWordSource,
    pub failing: AtomicBool,
    /// Answer `NotFound` for every request, as an empty category would.
    pub exhausted: AtomicBool,
    pub calls: AtomicUsize,
}

impl FlakyWords {
    pub fn new() -> Self {
        Self {
            inner: StaticWordSource::new(vec![garden()]),
            failing: AtomicBool::new(false),
            exhausted: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn exhaust(&self) {
        self.exhausted.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl WordSource for FlakyWords {
    async fn get_word(&self, level: u8, category: Option<&str>) -> Result<Word, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CapabilityError::Unavailable("word service down".into()));
        }
        if self.exhausted.load(Ordering::SeqCst) {
            return Err(CapabilityError::NotFound(format!("no level {level} words left")));
        }
        self.inner.get_word(level, category).await
    }
}

/// Word source that never answers in time.
pub struct StalledWords(pub Duration);

#[async_trait]
impl WordSource for StalledWords {
    async fn get_word(&self, _level: u8, _category: Option<&str>) -> Result<Word, CapabilityError> {
        tokio::time::sleep(self.0).await;
        Ok(garden())
    }
}

pub struct FailingRooms;

#[async_trait]
impl RoomProvisioner for FailingRooms {
    async fn create_room(&self, _session_id: SessionId) -> Result<RoomHandle, CapabilityError> {
        Err(CapabilityError::Unavailable("room provider rejected the request".into()))
    }
}

/// Store whose attempt writes can be made to fail.
pub struct FlakyStore {
    pub inner: Arc<InMemoryStore>,
    pub failing_attempts: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            failing_attempts: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn create_session(&self, session: &Session) -> Result<(), CapabilityError> {
        self.inner.create_session(session).await
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, CapabilityError> {
        self.inner.get_session(id).await
    }

    async fn update_session(&self, session: &Session) -> Result<(), CapabilityError> {
        self.inner.update_session(session).await
    }

    async fn record_attempt(&self, attempt: &Attempt) -> Result<(), CapabilityError> {
        if self.failing_attempts.load(Ordering::SeqCst) {
            return Err(CapabilityError::Other("disk full".into()));
        }
        self.inner.record_attempt(attempt).await
    }

    async fn add_player(&self, session_id: SessionId, player: &Player) -> Result<(), CapabilityError> {
        self.inner.add_player(session_id, player).await
    }

    async fn remove_player(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
    ) -> Result<(), CapabilityError> {
        self.inner.remove_player(session_id, player_id).await
    }

    async fn update_player_score(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
        score: i64,
    ) -> Result<(), CapabilityError> {
        self.inner.update_player_score(session_id, player_id, score).await
    }
}
