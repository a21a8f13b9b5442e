//! Drives one bot-only session from creation to its end.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use spellbee_engine::capabilities::memory::EchoAudio;
use spellbee_engine::domain::{Clock, EndReason, EventKind, ManualClock, Standing};
use spellbee_engine::events::{spawn_forwarder, EventSink, SinkError};
use spellbee_engine::{
    Capabilities, EngineConfig, EngineError, GameMode, PlayerProfile, SessionEvent, SessionId,
    SessionKind, SessionRegistry, SessionSettings, SessionStatus,
};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::bot::{Bot, BotProfile};
use crate::words::vocabulary;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub mode: GameMode,
    pub players: usize,
    pub rounds: Option<u32>,
    pub elimination: bool,
    pub level: u8,
    pub bot: BotProfile,
    pub seed: Option<u64>,
    /// Sessions still running after this many turns are cancelled.
    pub max_turns: u32,
}

impl SimulationConfig {
    fn settings(&self) -> SessionSettings {
        let base = if self.players == 1 {
            SessionSettings::solo(self.mode)
        } else {
            SessionSettings {
                max_players: self.players,
                ..SessionSettings::for_mode(self.mode)
            }
        };
        SessionSettings {
            max_rounds: self.rounds.or(base.max_rounds),
            elimination: self.elimination,
            word_level: self.level,
            ..base
        }
    }

    fn kind(&self) -> SessionKind {
        if self.players == 1 {
            SessionKind::Solo
        } else {
            SessionKind::Multi
        }
    }
}

/// One line of simulation output.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub index: u64,
    pub session_id: SessionId,
    pub mode: GameMode,
    pub players: usize,
    pub status: SessionStatus,
    pub end_reason: Option<EndReason>,
    pub rounds: u32,
    pub turns: u32,
    pub attempts: usize,
    pub correct: usize,
    pub hints: u32,
    pub timeouts: u32,
    pub events: BTreeMap<&'static str, u64>,
    pub lagged_events: u64,
    pub standings: Vec<Standing>,
    /// Simulated time between start and end.
    pub sim_seconds: i64,
    pub wall_ms: f64,
}

/// Tallies forwarded events by kind.
#[derive(Default)]
struct TallySink {
    counts: Mutex<BTreeMap<&'static str, u64>>,
    end_reason: Mutex<Option<EndReason>>,
}

#[async_trait]
impl EventSink for TallySink {
    async fn deliver(&self, event: &SessionEvent) -> Result<(), SinkError> {
        *self.counts.lock().entry(event.kind.name()).or_default() += 1;
        if let EventKind::SessionEnded { reason, .. } = &event.kind {
            *self.end_reason.lock() = Some(*reason);
        }
        Ok(())
    }
}

pub async fn simulate(index: u64, config: &SimulationConfig) -> Result<SessionSummary, EngineError> {
    let wall = Instant::now();
    let clock = ManualClock::new(OffsetDateTime::now_utc());
    let caps = Capabilities::in_memory(vocabulary(config.level)).with_audio(Arc::new(EchoAudio));
    let engine = EngineConfig {
        rng_seed: config.seed.map(|s| s.wrapping_add(index)),
        ..EngineConfig::default()
    };
    let registry = SessionRegistry::with_clock(engine, caps, Arc::new(clock.clone()))?;
    let mut bot = Bot::new(
        config.bot,
        config.seed.unwrap_or_else(rand::random).wrapping_add(index),
    );

    let handle = registry
        .create(config.kind(), config.settings(), PlayerProfile::bot("bot-0"))
        .await?;
    for i in 1..config.players {
        handle.join(PlayerProfile::bot(format!("bot-{i}"))).await?;
    }

    let sink = Arc::new(TallySink::default());
    let forwarder = spawn_forwarder(handle.subscribe(), sink.clone());
    handle.start().await?;
    let started = clock.now();

    let (mut turns, mut hints, mut timeouts) = (0u32, 0u32, 0u32);
    while turns < config.max_turns {
        // Let the forwarder keep up on a single-threaded runtime.
        tokio::task::yield_now().await;
        let snapshot = handle.snapshot();
        let Some(turn) = snapshot.turn.clone() else {
            break;
        };
        turns += 1;

        if bot.stalls() {
            advance(&clock, snapshot.settings.turn_timeout + Duration::from_secs(1));
            if handle.expire_turn_if_due().await?.is_some() {
                timeouts += 1;
            }
            continue;
        }

        let mut used = turn.hints_used;
        while used < turn.hint_budget {
            let Some(kind) = bot.wants_hint() else {
                break;
            };
            let hint = handle.request_hint(turn.owner, Some(kind)).await?;
            debug!(session_id = %handle.id(), kind = %hint.kind, "Bot took a hint");
            used = hint.hints_used;
            hints += 1;
        }

        advance(&clock, bot.think_time());
        let text = bot.spell(turn.letters);
        match handle.submit_attempt(turn.owner, &text).await {
            Ok(_) => {}
            Err(EngineError::TurnExpired { .. }) => timeouts += 1,
            Err(err) => return Err(err),
        }
    }

    if !handle.snapshot().status.is_terminal() {
        info!(session_id = %handle.id(), turns, "Turn cap reached, cancelling session");
        handle.cancel().await?;
    }

    let stats = forwarder.await.unwrap_or_default();
    let snapshot = handle.snapshot();
    let attempts = handle.attempts();
    let counts = sink.counts.lock().clone();
    let end_reason = *sink.end_reason.lock();
    registry.remove(handle.id());

    Ok(SessionSummary {
        index,
        session_id: snapshot.id,
        mode: config.mode,
        players: snapshot.roster.len(),
        status: snapshot.status,
        end_reason,
        rounds: snapshot.round,
        turns,
        attempts: attempts.len(),
        correct: attempts.iter().filter(|a| a.correct).count(),
        hints,
        timeouts,
        events: counts,
        lagged_events: stats.lagged,
        standings: snapshot.standings.clone().unwrap_or_default(),
        sim_seconds: (clock.now() - started).whole_seconds(),
        wall_ms: wall.elapsed().as_secs_f64() * 1000.0,
    })
}

fn advance(clock: &ManualClock, by: Duration) {
    clock.advance(time::Duration::milliseconds(by.as_millis() as i64));
}
