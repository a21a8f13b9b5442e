//! Built-in vocabulary.
//!
//! One word per length, so a bot can tell which word it was given from the
//! letter count in the turn view alone.

use spellbee_engine::Word;

const VOCABULARY: &[(&str, &str, &str)] = &[
    ("cat", "noun", "A small domesticated feline"),
    ("tree", "noun", "A tall perennial plant with a woody trunk"),
    ("apple", "noun", "The round fruit of a tree of the rose family"),
    ("garden", "noun", "A piece of ground used to grow plants"),
    ("kitchen", "noun", "A room where food is prepared"),
    ("elephant", "noun", "A very large mammal with a trunk"),
    ("butterfly", "noun", "An insect with large colourful wings"),
    ("dictionary", "noun", "A book listing the words of a language"),
    ("spectacular", "adjective", "Beautiful in a dramatic way"),
    ("encyclopedia", "noun", "A book giving information on many subjects"),
];

pub fn vocabulary(level: u8) -> Vec<Word> {
    VOCABULARY
        .iter()
        .map(|(text, pos, definition)| {
            let mut word = Word::new(format!("sim-{text}"), *text, level).with_definition(*definition);
            word.part_of_speech = Some((*pos).to_string());
            word.example_sentence = Some(format!("Can you spell {text}?"));
            word
        })
        .collect()
}

/// The vocabulary word with `letters` characters.
pub fn recall(letters: usize) -> Option<&'static str> {
    VOCABULARY
        .iter()
        .map(|(text, _, _)| *text)
        .find(|text| text.chars().count() == letters)
}
