//! In-session scoring.
//!
//! A player's score is always a function of their aggregate counters, never an
//! accumulation of per-attempt points. Rapid-fire and total-game multipliers
//! depend on running averages, so a score may go down after a slow or wrong
//! attempt in those modes.

use serde::{Deserialize, Serialize};

use crate::domain::settings::GameMode;

pub const POINTS_PER_CORRECT: i64 = 100;
pub const RAPID_FIRE_FAST_SECS: f64 = 5.0;
pub const RAPID_FIRE_MULTIPLIER: f64 = 1.5;
pub const TOTAL_GAME_ACCURACY: f64 = 0.9;
pub const TOTAL_GAME_MULTIPLIER: f64 = 1.3;

/// Aggregate attempt counters for one player.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttemptStats {
    pub correct: u32,
    pub total: u32,
    pub avg_response_secs: f64,
}

impl AttemptStats {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.correct) / f64::from(self.total)
        }
    }
}

/// Score for `mode` given aggregate counters. Truncates toward zero.
pub fn calculate_score(mode: GameMode, stats: AttemptStats) -> i64 {
    let base = f64::from(stats.correct) * POINTS_PER_CORRECT as f64;

    let multiplier = match mode {
        GameMode::RoundRobin => 1.0,
        GameMode::RapidFire if stats.avg_response_secs < RAPID_FIRE_FAST_SECS => {
            RAPID_FIRE_MULTIPLIER
        }
        GameMode::RapidFire => 1.0,
        GameMode::TotalGame if stats.accuracy() >= TOTAL_GAME_ACCURACY => TOTAL_GAME_MULTIPLIER,
        GameMode::TotalGame => 1.0,
    };

    (base * multiplier).trunc() as i64
}

/// Whether an attempt outcome knocks the player out.
pub fn eliminates(elimination: bool, correct: bool) -> bool {
    elimination && !correct
}
