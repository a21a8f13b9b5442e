//! Engine-wide configuration.
//!
//! Defaults suit a single process running many sessions; every field can be
//! overridden from a `SPELLBEE_*` environment variable.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::settings::{
    GameMode, HintSelection, SessionSettings, DEFAULT_HINTS_PER_TURN, DEFAULT_TURN_TIMEOUT,
    MAX_HINTS_PER_TURN,
};
use crate::error::EngineError;
use crate::events::OverflowPolicy;

pub const DEFAULT_EVENT_CAPACITY: usize = 100;
pub const DEFAULT_CAPABILITY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Per-subscriber event buffer.
    pub event_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    /// Upper bound on any single capability call.
    pub capability_timeout: Duration,
    /// Turn timeout for sessions built with [`EngineConfig::settings_for`].
    pub default_turn_timeout: Duration,
    pub default_hints_per_turn: u8,
    pub default_hint_selection: HintSelection,
    /// Period of the background sweeper; `None` leaves expiry fully lazy.
    pub turn_sweep_interval: Option<Duration>,
    /// Base seed for per-session RNGs; `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            capability_timeout: DEFAULT_CAPABILITY_TIMEOUT,
            default_turn_timeout: DEFAULT_TURN_TIMEOUT,
            default_hints_per_turn: DEFAULT_HINTS_PER_TURN,
            default_hint_selection: HintSelection::default(),
            turn_sweep_interval: None,
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by whichever `SPELLBEE_*` variables are set.
    pub fn from_env() -> Result<Self, EngineError> {
        let mut config = Self::default();

        if let Some(v) = parse_var("SPELLBEE_EVENT_CAPACITY")? {
            config.event_capacity = v;
        }
        if let Some(v) = parse_var("SPELLBEE_OVERFLOW_POLICY")? {
            config.overflow_policy = v;
        }
        if let Some(ms) = parse_var::<u64>("SPELLBEE_CAPABILITY_TIMEOUT_MS")? {
            config.capability_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>("SPELLBEE_TURN_TIMEOUT_SECS")? {
            config.default_turn_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = parse_var("SPELLBEE_HINTS_PER_TURN")? {
            config.default_hints_per_turn = v;
        }
        if let Some(v) = optional_var("SPELLBEE_HINT_SELECTION") {
            config.default_hint_selection = parse_hint_selection(&v)?;
        }
        if let Some(ms) = parse_var::<u64>("SPELLBEE_SWEEP_INTERVAL_MS")? {
            config.turn_sweep_interval = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(v) = parse_var("SPELLBEE_RNG_SEED")? {
            config.rng_seed = Some(v);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.event_capacity == 0 {
            return Err(EngineError::config("event capacity must be positive"));
        }
        if self.capability_timeout.is_zero() {
            return Err(EngineError::config("capability timeout must be positive"));
        }
        if self.default_turn_timeout.is_zero() {
            return Err(EngineError::config("turn timeout must be positive"));
        }
        if self.default_hints_per_turn > MAX_HINTS_PER_TURN {
            return Err(EngineError::config(format!(
                "hints per turn must be at most {MAX_HINTS_PER_TURN}"
            )));
        }
        Ok(())
    }

    /// Mode defaults with this engine's turn and hint defaults applied.
    pub fn settings_for(&self, mode: GameMode) -> SessionSettings {
        SessionSettings {
            turn_timeout: self.default_turn_timeout,
            hints_per_turn: self.default_hints_per_turn,
            hint_selection: self.default_hint_selection,
            ..SessionSettings::for_mode(mode)
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an optional environment variable; a malformed value is an error.
fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, EngineError> {
    optional_var(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                EngineError::config(format!("Environment variable '{name}' has invalid value '{raw}'"))
            })
        })
        .transpose()
}

fn parse_hint_selection(raw: &str) -> Result<HintSelection, EngineError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "uniform" => Ok(HintSelection::Uniform),
        "avoid_repeats" => Ok(HintSelection::AvoidRepeats),
        other => Err(EngineError::config(format!(
            "Environment variable 'SPELLBEE_HINT_SELECTION' has invalid value '{other}'"
        ))),
    }
}
