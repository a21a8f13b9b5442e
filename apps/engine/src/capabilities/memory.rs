//! In-memory capability implementations.
//!
//! Used by the test suites and the session simulator. The store keeps a
//! copy of every session and its attempts in a `DashMap`.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use super::{
    CapabilityError, HintSource, PronunciationAudio, RoomProvisioner, SessionStore, Transcriber,
    WordSource,
};
use crate::domain::hints::HintKind;
use crate::domain::ids::{PlayerId, SessionId};
use crate::domain::session::{Attempt, Player, RoomHandle, Session};
use crate::domain::word::Word;

/// Serves words from a fixed list, rotating through the matches.
#[derive(Debug, Default)]
pub struct StaticWordSource {
    words: Vec<Word>,
    cursor: AtomicUsize,
}

impl StaticWordSource {
    pub fn new(words: Vec<Word>) -> Self {
        Self {
            words,
            cursor: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WordSource for StaticWordSource {
    async fn get_word(&self, level: u8, category: Option<&str>) -> Result<Word, CapabilityError> {
        let matches: Vec<&Word> = self
            .words
            .iter()
            .filter(|w| w.level == level)
            .filter(|w| category.is_none() || w.category.as_deref() == category)
            .collect();
        if matches.is_empty() {
            return Err(CapabilityError::NotFound(match category {
                Some(c) => format!("no level {level} words in category {c}"),
                None => format!("no level {level} words"),
            }));
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % matches.len();
        Ok(matches[idx].clone())
    }
}

/// Hints straight from word metadata; kinds without metadata are
/// unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataHints;

#[async_trait]
impl HintSource for MetadataHints {
    async fn get_hint(&self, word: &Word, kind: HintKind) -> Result<String, CapabilityError> {
        kind.from_metadata(word).ok_or_else(|| {
            CapabilityError::Unavailable(format!("no {kind} hint for word {}", word.id))
        })
    }
}

/// Treats the audio payload as UTF-8 text.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughTranscriber;

#[async_trait]
impl Transcriber for PassthroughTranscriber {
    async fn transcribe(&self, audio: Bytes) -> Result<String, CapabilityError> {
        if audio.is_empty() {
            return Err(CapabilityError::Other("empty audio".into()));
        }
        Ok(String::from_utf8_lossy(&audio).into_owned())
    }
}

/// Hands out `room-<session id>` handles and remembers them.
#[derive(Debug, Default)]
pub struct LocalRooms {
    rooms: DashMap<SessionId, RoomHandle>,
}

impl LocalRooms {
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[async_trait]
impl RoomProvisioner for LocalRooms {
    async fn create_room(&self, session_id: SessionId) -> Result<RoomHandle, CapabilityError> {
        let handle = self
            .rooms
            .entry(session_id)
            .or_insert_with(|| RoomHandle {
                room_id: format!("room-{session_id}"),
                join_url: None,
            })
            .clone();
        Ok(handle)
    }
}

/// Pretends to synthesize speech; the payload is the word itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoAudio;

#[async_trait]
impl PronunciationAudio for EchoAudio {
    async fn generate(&self, word: &Word) -> Result<Bytes, CapabilityError> {
        Ok(Bytes::from(word.text.clone()))
    }
}

#[derive(Debug, Clone)]
struct StoredSession {
    session: Session,
    attempts: Vec<Attempt>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    sessions: DashMap<SessionId, StoredSession>,
}

impl InMemoryStore {
    pub fn attempts(&self, id: SessionId) -> Vec<Attempt> {
        self.sessions
            .get(&id)
            .map(|s| s.attempts.clone())
            .unwrap_or_default()
    }

    /// Every stored session record, in no particular order.
    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.iter().map(|s| s.session.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn missing(id: SessionId) -> CapabilityError {
        CapabilityError::NotFound(format!("session {id} is not stored"))
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create_session(&self, session: &Session) -> Result<(), CapabilityError> {
        if self.sessions.contains_key(&session.id) {
            return Err(CapabilityError::Other(format!(
                "session {} already stored",
                session.id
            )));
        }
        self.sessions.insert(
            session.id,
            StoredSession {
                session: session.clone(),
                attempts: Vec::new(),
            },
        );
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, CapabilityError> {
        self.sessions
            .get(&id)
            .map(|s| s.session.clone())
            .ok_or_else(|| Self::missing(id))
    }

    async fn update_session(&self, session: &Session) -> Result<(), CapabilityError> {
        let mut stored = self
            .sessions
            .get_mut(&session.id)
            .ok_or_else(|| Self::missing(session.id))?;
        stored.session = session.clone();
        Ok(())
    }

    async fn record_attempt(&self, attempt: &Attempt) -> Result<(), CapabilityError> {
        let mut stored = self
            .sessions
            .get_mut(&attempt.session_id)
            .ok_or_else(|| Self::missing(attempt.session_id))?;
        if stored.attempts.iter().any(|a| a.id == attempt.id) {
            return Ok(());
        }
        stored.attempts.push(attempt.clone());
        Ok(())
    }

    async fn add_player(
        &self,
        session_id: SessionId,
        player: &Player,
    ) -> Result<(), CapabilityError> {
        let mut stored = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| Self::missing(session_id))?;
        if !stored.session.is_member(player.id) {
            stored.session.roster.push(player.clone());
        }
        Ok(())
    }

    async fn remove_player(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
    ) -> Result<(), CapabilityError> {
        let mut stored = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| Self::missing(session_id))?;
        stored.session.roster.retain(|p| p.id != player_id);
        Ok(())
    }

    async fn update_player_score(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
        score: i64,
    ) -> Result<(), CapabilityError> {
        let mut stored = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| Self::missing(session_id))?;
        let player = stored
            .session
            .player_mut(player_id)
            .ok_or_else(|| CapabilityError::NotFound(format!("player {player_id} not stored")))?;
        player.score = score;
        Ok(())
    }
}
