//! Placement-based rank points and rating tiers.

use serde::{Deserialize, Serialize};

use crate::domain::ids::PlayerId;
use crate::domain::session::Player;

pub const MIN_RATING: i32 = 0;
pub const MAX_RATING: i32 = 1200;

const PLACEMENT_POINTS: [i32; 3] = [30, 15, 5];
const EXTRA_PLAYER_BONUS: f64 = 0.1;
const COMPETITIVE_MULTIPLIER: f64 = 1.5;

/// Rank points for finishing at `placement` (1-based) out of `players`.
///
/// Rounds half away from zero.
pub fn placement_points(placement: usize, players: usize, ranked: bool) -> i32 {
    let base = placement
        .checked_sub(1)
        .and_then(|idx| PLACEMENT_POINTS.get(idx))
        .copied()
        .unwrap_or(0);

    let extra = players.saturating_sub(2) as f64;
    let mut points = f64::from(base) * (1.0 + EXTRA_PLAYER_BONUS * extra);
    if ranked {
        points *= COMPETITIVE_MULTIPLIER;
    }
    points.round() as i32
}

/// Apply `points` to `current`, clamped to the rating range.
pub fn apply_points(current: i32, points: i32) -> i32 {
    current.saturating_add(points).clamp(MIN_RATING, MAX_RATING)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankTier {
    Gray,
    Violet,
    Indigo,
    Blue,
    Green,
    Yellow,
    Orange,
    Red,
}

impl RankTier {
    /// Tier for a rating; anything outside the rating range is Gray.
    pub fn from_rating(rating: i32) -> Self {
        match rating {
            0..=299 => RankTier::Gray,
            300..=449 => RankTier::Violet,
            450..=599 => RankTier::Indigo,
            600..=749 => RankTier::Blue,
            750..=899 => RankTier::Green,
            900..=1049 => RankTier::Yellow,
            1050..=1149 => RankTier::Orange,
            1150..=1200 => RankTier::Red,
            _ => RankTier::Gray,
        }
    }
}

/// Final position of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player_id: PlayerId,
    pub name: String,
    pub placement: usize,
    pub score: i64,
    pub correct: u32,
    pub attempts: u32,
    pub eliminated: bool,
    /// Rank points earned; only set for competitive sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_points: Option<i32>,
}

/// Order players by score, then correct count, then join order.
///
/// `roster` must already be in join order.
pub fn standings(roster: &[Player], competitive: bool, ranked: bool) -> Vec<Standing> {
    let mut ordered: Vec<&Player> = roster.iter().collect();
    // Stable sort keeps join order among ties.
    ordered.sort_by(|a, b| b.score.cmp(&a.score).then(b.correct.cmp(&a.correct)));

    let players = roster.len();
    ordered
        .into_iter()
        .enumerate()
        .map(|(idx, p)| {
            let placement = idx + 1;
            Standing {
                player_id: p.id,
                name: p.name.clone(),
                placement,
                score: p.score,
                correct: p.correct,
                attempts: p.attempts,
                eliminated: p.eliminated,
                rank_points: competitive.then(|| placement_points(placement, players, ranked)),
            }
        })
        .collect()
}
