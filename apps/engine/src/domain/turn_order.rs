//! Fixed turn permutation chosen when a session starts.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::ids::PlayerId;

/// Next owner picked by [`TurnOrder::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextTurn {
    pub owner: PlayerId,
    /// The walk passed the end of the permutation, i.e. a new round begins.
    pub wrapped: bool,
}

/// The permutation is never edited after it is drawn; ineligible players
/// (eliminated or departed) are skipped at walk time instead.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TurnOrder {
    order: Vec<PlayerId>,
    cursor: usize,
}

impl TurnOrder {
    pub fn shuffled<R: Rng + ?Sized>(mut players: Vec<PlayerId>, rng: &mut R) -> Self {
        players.shuffle(rng);
        Self {
            order: players,
            cursor: 0,
        }
    }

    pub fn from_order(order: Vec<PlayerId>) -> Self {
        Self { order, cursor: 0 }
    }

    pub fn as_slice(&self) -> &[PlayerId] {
        &self.order
    }

    pub fn current(&self) -> Option<PlayerId> {
        self.order.get(self.cursor).copied()
    }

    /// Put the cursor on the first eligible player from the top.
    pub fn first(&mut self, eligible: impl Fn(PlayerId) -> bool) -> Option<PlayerId> {
        let idx = self.order.iter().position(|id| eligible(*id))?;
        self.cursor = idx;
        Some(self.order[idx])
    }

    /// Move to the next eligible player after the cursor, wrapping around.
    ///
    /// The current player is considered last, so a lone survivor keeps the
    /// turn and the move counts as a wrap.
    pub fn advance(&mut self, eligible: impl Fn(PlayerId) -> bool) -> Option<NextTurn> {
        let len = self.order.len();
        for step in 1..=len {
            let idx = (self.cursor + step) % len;
            let owner = self.order[idx];
            if eligible(owner) {
                let wrapped = idx <= self.cursor;
                self.cursor = idx;
                return Some(NextTurn { owner, wrapped });
            }
        }
        None
    }
}
