//! Hint kinds and the per-turn hint budget.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::settings::HintSelection;
use crate::domain::word::Word;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintKind {
    Definition,
    ExampleSentence,
    Etymology,
    PartOfSpeech,
    Pronunciation,
    Phonetic,
    Synonym,
}

impl HintKind {
    pub const ALL: [HintKind; 7] = [
        HintKind::Definition,
        HintKind::ExampleSentence,
        HintKind::Etymology,
        HintKind::PartOfSpeech,
        HintKind::Pronunciation,
        HintKind::Phonetic,
        HintKind::Synonym,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            HintKind::Definition => "definition",
            HintKind::ExampleSentence => "example_sentence",
            HintKind::Etymology => "etymology",
            HintKind::PartOfSpeech => "part_of_speech",
            HintKind::Pronunciation => "pronunciation",
            HintKind::Phonetic => "phonetic",
            HintKind::Synonym => "synonym",
        }
    }

    /// Hint text taken straight from the word's own metadata, if present.
    pub fn from_metadata(self, word: &Word) -> Option<String> {
        let field = match self {
            HintKind::Definition => word.definition.clone(),
            HintKind::ExampleSentence => word.example_sentence.clone(),
            HintKind::Etymology => word.etymology.clone(),
            HintKind::PartOfSpeech => word.part_of_speech.clone(),
            HintKind::Pronunciation => word.pronunciation.clone(),
            HintKind::Phonetic => word.phonetic.clone(),
            HintKind::Synonym if word.synonyms.is_empty() => None,
            HintKind::Synonym => Some(word.synonyms.join(", ")),
        };
        field.filter(|s| !s.trim().is_empty())
    }
}

impl std::fmt::Display for HintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hints consumed in one turn.
///
/// Lives inside a `Turn` and is rebuilt whenever a turn starts, which is what
/// resets the budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintManager {
    budget: u8,
    used: u8,
    kinds_used: Vec<HintKind>,
}

impl HintManager {
    pub fn new(budget: u8) -> Self {
        Self {
            budget,
            used: 0,
            kinds_used: Vec::new(),
        }
    }

    pub fn budget(&self) -> u8 {
        self.budget
    }

    pub fn used(&self) -> u8 {
        self.used
    }

    pub fn remaining(&self) -> u8 {
        self.budget.saturating_sub(self.used)
    }

    pub fn kinds_used(&self) -> &[HintKind] {
        &self.kinds_used
    }

    pub fn ensure_available(&self) -> Result<(), EngineError> {
        if self.used >= self.budget {
            return Err(EngineError::HintBudgetExhausted {
                budget: self.budget,
            });
        }
        Ok(())
    }

    /// Pick a kind for a caller that did not ask for one.
    pub fn select_kind<R: Rng + ?Sized>(&self, policy: HintSelection, rng: &mut R) -> HintKind {
        let unused: Vec<HintKind> = match policy {
            HintSelection::Uniform => Vec::new(),
            HintSelection::AvoidRepeats => HintKind::ALL
                .iter()
                .copied()
                .filter(|k| !self.kinds_used.contains(k))
                .collect(),
        };
        let pool: &[HintKind] = if unused.is_empty() {
            &HintKind::ALL
        } else {
            &unused
        };
        pool.choose(rng).copied().unwrap_or(HintKind::Definition)
    }

    /// Count a granted hint. Only called once the hint content is in hand.
    pub fn record(&mut self, kind: HintKind) -> Result<u8, EngineError> {
        self.ensure_available()?;
        self.used += 1;
        if !self.kinds_used.contains(&kind) {
            self.kinds_used.push(kind);
        }
        Ok(self.used)
    }
}
