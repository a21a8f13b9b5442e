use serde::{Deserialize, Serialize};

/// A word served by the word source, with whatever metadata the source has.
///
/// Metadata fields are optional; a hint source may still be able to produce
/// a hint for a kind whose field is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: String,
    pub text: String,
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etymology: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
}

impl Word {
    /// Bare word with no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>, level: u8) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            level,
            category: None,
            definition: None,
            example_sentence: None,
            etymology: None,
            part_of_speech: None,
            pronunciation: None,
            phonetic: None,
            synonyms: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    /// Display form while the word is masked: one underscore per character.
    pub fn masked(&self) -> String {
        self.text
            .chars()
            .map(|c| if c.is_whitespace() { ' ' } else { '_' })
            .collect()
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
