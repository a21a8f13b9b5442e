//! Scripted players.

use std::time::Duration;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use spellbee_engine::HintKind;

use crate::words::recall;

/// Hints the built-in vocabulary can always answer.
const KNOWN_HINTS: [HintKind; 3] = [
    HintKind::Definition,
    HintKind::PartOfSpeech,
    HintKind::ExampleSentence,
];

#[derive(Debug, Clone, Copy)]
pub struct BotProfile {
    /// Chance of spelling the word right.
    pub accuracy: f64,
    /// Chance of asking for one more hint before answering.
    pub hint_rate: f64,
    /// Chance of letting the turn run out.
    pub stall_rate: f64,
    pub min_think: Duration,
    pub max_think: Duration,
}

pub struct Bot {
    profile: BotProfile,
    rng: ChaCha8Rng,
}

impl Bot {
    pub fn new(profile: BotProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn stalls(&mut self) -> bool {
        self.rng.random_bool(self.profile.stall_rate)
    }

    /// Next hint to ask for, if the bot wants one.
    pub fn wants_hint(&mut self) -> Option<HintKind> {
        if !self.rng.random_bool(self.profile.hint_rate) {
            return None;
        }
        Some(KNOWN_HINTS[self.rng.random_range(0..KNOWN_HINTS.len())])
    }

    pub fn think_time(&mut self) -> Duration {
        let min = self.profile.min_think.as_millis() as u64;
        let max = self.profile.max_think.as_millis() as u64;
        Duration::from_millis(self.rng.random_range(min..=max.max(min)))
    }

    /// Spell the word with `letters` characters, right or wrong.
    pub fn spell(&mut self, letters: usize) -> String {
        let Some(word) = recall(letters) else {
            return "?".repeat(letters.max(1));
        };
        if self.rng.random_bool(self.profile.accuracy) {
            return word.to_uppercase();
        }
        // Swap two neighbouring letters, or drop the last one for short words.
        let mut chars: Vec<char> = word.chars().collect();
        if chars.len() > 3 {
            let i = self.rng.random_range(0..chars.len() - 1);
            if chars[i] == chars[i + 1] {
                chars.remove(i);
            } else {
                chars.swap(i, i + 1);
            }
        } else {
            chars.pop();
        }
        chars.into_iter().collect()
    }
}
