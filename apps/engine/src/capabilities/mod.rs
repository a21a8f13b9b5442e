//! External capabilities the engine consumes but does not own.
//!
//! Every trait is object safe and async; the service layer holds them as
//! `Arc<dyn ...>` and bounds each call with the configured capability
//! timeout.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::hints::HintKind;
use crate::domain::ids::{PlayerId, SessionId};
use crate::domain::session::{Attempt, Player, RoomHandle, Session};
use crate::domain::word::Word;

/// Which capability a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    WordSource,
    HintSource,
    Transcription,
    Persistence,
    RoomProvisioning,
    PronunciationAudio,
}

impl Capability {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Capability::WordSource => "word_source",
            Capability::HintSource => "hint_source",
            Capability::Transcription => "transcription",
            Capability::Persistence => "persistence",
            Capability::RoomProvisioning => "room_provisioning",
            Capability::PronunciationAudio => "pronunciation_audio",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by a capability implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// Nothing matched the request
    NotFound(String),
    /// The dependency is down or refused the request
    Unavailable(String),
    /// The call did not finish within the capability timeout
    Timeout,
    /// Anything else
    Other(String),
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityError::NotFound(msg) => write!(f, "not found: {msg}"),
            CapabilityError::Unavailable(msg) => write!(f, "unavailable: {msg}"),
            CapabilityError::Timeout => write!(f, "timed out"),
            CapabilityError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CapabilityError {}

#[async_trait]
pub trait WordSource: Send + Sync {
    /// A word at `level`, in `category` when one is given.
    async fn get_word(&self, level: u8, category: Option<&str>) -> Result<Word, CapabilityError>;
}

#[async_trait]
pub trait HintSource: Send + Sync {
    async fn get_hint(&self, word: &Word, kind: HintKind) -> Result<String, CapabilityError>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Speech to free text. Output is cleaned by the engine before use.
    async fn transcribe(&self, audio: Bytes) -> Result<String, CapabilityError>;
}

/// Durable mirror of session state.
///
/// The in-memory state machine stays authoritative while a session is live;
/// the store is written after each committed transition.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &Session) -> Result<(), CapabilityError>;
    async fn get_session(&self, id: SessionId) -> Result<Session, CapabilityError>;
    async fn update_session(&self, session: &Session) -> Result<(), CapabilityError>;
    async fn record_attempt(&self, attempt: &Attempt) -> Result<(), CapabilityError>;
    async fn add_player(&self, session_id: SessionId, player: &Player)
        -> Result<(), CapabilityError>;
    async fn remove_player(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
    ) -> Result<(), CapabilityError>;
    async fn update_player_score(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
        score: i64,
    ) -> Result<(), CapabilityError>;
}

#[async_trait]
pub trait RoomProvisioner: Send + Sync {
    async fn create_room(&self, session_id: SessionId) -> Result<RoomHandle, CapabilityError>;
}

#[async_trait]
pub trait PronunciationAudio: Send + Sync {
    async fn generate(&self, word: &Word) -> Result<Bytes, CapabilityError>;
}

/// The set of capabilities a registry runs against.
#[derive(Clone)]
pub struct Capabilities {
    pub words: Arc<dyn WordSource>,
    pub hints: Arc<dyn HintSource>,
    pub transcriber: Arc<dyn Transcriber>,
    pub store: Arc<dyn SessionStore>,
    pub rooms: Arc<dyn RoomProvisioner>,
    /// Optional; audio is best effort.
    pub audio: Option<Arc<dyn PronunciationAudio>>,
}

impl Capabilities {
    /// Reference in-memory implementations over a fixed word list.
    pub fn in_memory(words: Vec<Word>) -> Self {
        Self {
            words: Arc::new(memory::StaticWordSource::new(words)),
            hints: Arc::new(memory::MetadataHints),
            transcriber: Arc::new(memory::PassthroughTranscriber),
            store: Arc::new(memory::InMemoryStore::default()),
            rooms: Arc::new(memory::LocalRooms::default()),
            audio: None,
        }
    }

    pub fn with_words(mut self, words: Arc<dyn WordSource>) -> Self {
        self.words = words;
        self
    }

    pub fn with_hints(mut self, hints: Arc<dyn HintSource>) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = transcriber;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_rooms(mut self, rooms: Arc<dyn RoomProvisioner>) -> Self {
        self.rooms = rooms;
        self
    }

    pub fn with_audio(mut self, audio: Arc<dyn PronunciationAudio>) -> Self {
        self.audio = Some(audio);
        self
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("audio", &self.audio.is_some())
            .finish_non_exhaustive()
    }
}
