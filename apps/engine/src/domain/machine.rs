//! Pure, synchronous session state machine.
//!
//! Every method either fails without touching state or applies a complete
//! transition and queues the events it produced. Capability calls (word
//! fetch, hint content, persistence) happen outside, in the service layer,
//! which drives the machine on a cloned draft and only swaps the draft in
//! once everything succeeded.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use time::OffsetDateTime;
use tracing::debug;

use crate::domain::events::{EventKind, PendingEvent, RevealReason};
use crate::domain::hints::HintKind;
use crate::domain::ids::{AttemptId, PlayerId, SessionId};
use crate::domain::ranking::{standings, Standing};
use crate::domain::scoring::{calculate_score, eliminates};
use crate::domain::session::{
    Attempt, AttemptSource, CancelReason, EndReason, PlayerProfile, RoomHandle, Session,
    SessionStatus,
};
use crate::domain::settings::{CompletionPolicy, SessionKind, SessionSettings};
use crate::domain::snapshot::{SessionSnapshot, TurnView};
use crate::domain::turn::{Turn, TurnController, Verdict};
use crate::domain::turn_order::TurnOrder;
use crate::domain::word::Word;
use crate::error::EngineError;

/// What has to happen after a turn closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The session goes on; a word must be fetched and a turn opened for
    /// this player.
    NextTurn(PlayerId),
    /// The session reached a terminal status.
    Ended,
}

/// Result of a scored attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
    pub attempt: Attempt,
    pub verdict: Verdict,
    pub score: i64,
    pub delta: i64,
    pub eliminated: bool,
    pub progress: Progress,
}

/// A turn that ran out before anyone answered.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiredTurn {
    pub owner: PlayerId,
    pub word: Word,
    pub elapsed_ms: u64,
    pub eliminated: bool,
    pub progress: Progress,
}

/// What [`SessionStateMachine::settle`] did, if anything.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    TurnExpired(ExpiredTurn),
    TimeLimitReached,
}

#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    session: Session,
    order: TurnOrder,
    turns: TurnController,
    attempts: Vec<Attempt>,
    standings: Option<Vec<Standing>>,
    survivor_floor: usize,
    rng: ChaCha8Rng,
    outbox: Vec<PendingEvent>,
}

impl SessionStateMachine {
    /// Validate settings and build a session in `Created` with the host as
    /// its only member.
    pub fn create(
        id: SessionId,
        kind: SessionKind,
        settings: SessionSettings,
        host: PlayerProfile,
        rng: ChaCha8Rng,
        now: OffsetDateTime,
    ) -> Result<Self, EngineError> {
        let completion = settings.validate(kind)?;
        let turns = TurnController::new(settings.turn_timeout, settings.hints_per_turn);
        let host_id = host.id;

        let session = Session {
            id,
            kind,
            settings,
            completion,
            status: SessionStatus::Created,
            roster: vec![host.into_player(now)],
            round: 0,
            current_owner: None,
            host: host_id,
            room: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            ended_at: None,
        };

        Ok(Self {
            session,
            order: TurnOrder::default(),
            turns,
            attempts: Vec::new(),
            standings: None,
            survivor_floor: 1,
            rng,
            outbox: Vec::new(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn id(&self) -> SessionId {
        self.session.id
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn turn(&self) -> Option<&Turn> {
        self.turns.current()
    }

    pub fn turn_order(&self) -> &[PlayerId] {
        self.order.as_slice()
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn standings(&self) -> Option<&[Standing]> {
        self.standings.as_deref()
    }

    /// Owner of a turn that was decided but never opened because no word
    /// could be fetched for it yet.
    pub fn pending_owner(&self) -> Option<PlayerId> {
        if self.session.status != SessionStatus::Active || self.turns.current().is_some() {
            return None;
        }
        self.session.current_owner
    }

    /// Level and category to ask the word source for.
    pub fn word_request(&self) -> (u8, Option<&str>) {
        (
            self.session.settings.word_level,
            self.session.settings.category.as_deref(),
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let turn = self
            .turns
            .current()
            .map(|t| TurnView::of(t, self.turns.timeout()));
        SessionSnapshot::from_parts(
            &self.session,
            self.order.as_slice(),
            turn,
            self.attempts.len(),
            self.standings.clone(),
        )
    }

    /// Hand over queued events in production order.
    pub fn drain_events(&mut self) -> Vec<PendingEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn emit(&mut self, player_id: Option<PlayerId>, at: OffsetDateTime, kind: EventKind) {
        self.outbox.push(PendingEvent {
            player_id,
            at,
            kind,
        });
    }

    fn touch(&mut self, now: OffsetDateTime) {
        self.session.updated_at = now;
    }

    fn ensure_not_terminal(&self) -> Result<(), EngineError> {
        if self.session.status.is_terminal() {
            return Err(EngineError::invalid_state(format!(
                "session is {:?}",
                self.session.status
            )));
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), EngineError> {
        if self.session.status != SessionStatus::Active {
            return Err(EngineError::NoActiveSession);
        }
        Ok(())
    }

    fn ensure_member(&self, player: PlayerId) -> Result<(), EngineError> {
        if !self.session.is_member(player) {
            return Err(EngineError::player_not_found(player));
        }
        Ok(())
    }

    fn ensure_owner(&self, player: PlayerId) -> Result<(), EngineError> {
        self.ensure_member(player)?;
        match self.turns.current() {
            Some(turn) if turn.owner == player => Ok(()),
            Some(_) => Err(EngineError::UnauthorizedTurn { player_id: player }),
            None => match self.session.current_owner {
                Some(owner) if owner != player => {
                    Err(EngineError::UnauthorizedTurn { player_id: player })
                }
                _ => Err(EngineError::NoWordSet),
            },
        }
    }

    // ---- lifecycle -------------------------------------------------------

    /// `Created → Waiting`, once persistence and room provisioning are done.
    pub fn mark_waiting(
        &mut self,
        room: Option<RoomHandle>,
        now: OffsetDateTime,
    ) -> Result<(), EngineError> {
        if self.session.status != SessionStatus::Created {
            return Err(EngineError::invalid_state(format!(
                "cannot open a {:?} session for joining",
                self.session.status
            )));
        }
        self.session.status = SessionStatus::Waiting;
        self.session.room = room.clone();
        self.touch(now);
        self.emit(
            Some(self.session.host),
            now,
            EventKind::SessionCreated {
                kind: self.session.kind,
                mode: self.session.settings.mode,
                host: self.session.host,
                room,
            },
        );
        Ok(())
    }

    pub fn join(&mut self, profile: PlayerProfile, now: OffsetDateTime) -> Result<(), EngineError> {
        if self.session.status != SessionStatus::Waiting {
            return Err(EngineError::invalid_state(format!(
                "cannot join a {:?} session",
                self.session.status
            )));
        }
        if self.session.is_member(profile.id) {
            return Err(EngineError::invalid_state(format!(
                "player {} already joined",
                profile.id
            )));
        }
        let capacity = self.session.settings.max_players;
        if self.session.roster.len() >= capacity {
            return Err(EngineError::SessionFull { capacity });
        }

        let player = profile.into_player(now);
        let (id, name) = (player.id, player.name.clone());
        self.session.roster.push(player);
        self.touch(now);
        self.emit(
            Some(id),
            now,
            EventKind::PlayerJoined {
                name,
                roster_size: self.session.roster.len(),
            },
        );
        Ok(())
    }

    /// Checks `start` would pass its roster and status rules, so the caller
    /// can skip the word fetch when it would not.
    pub fn validate_start(&self) -> Result<(), EngineError> {
        if self.session.status != SessionStatus::Waiting {
            return Err(EngineError::invalid_state(format!(
                "cannot start a {:?} session",
                self.session.status
            )));
        }
        let have = self.session.roster.len();
        let need = self.session.settings.min_players;
        if have < need {
            return Err(EngineError::NotEnoughPlayers { have, need });
        }
        Ok(())
    }

    /// `Waiting → Active` with `word` as the first turn's word.
    pub fn start(&mut self, word: Word, now: OffsetDateTime) -> Result<(), EngineError> {
        self.validate_start()?;

        let standing: Vec<PlayerId> = self
            .session
            .roster
            .iter()
            .filter(|p| !p.eliminated)
            .map(|p| p.id)
            .collect();
        self.survivor_floor = if standing.len() <= 1 { 0 } else { 1 };
        self.order = TurnOrder::shuffled(standing, &mut self.rng);

        let session = &self.session;
        let first = self
            .order
            .first(|id| session.player(id).is_some_and(|p| !p.eliminated))
            .ok_or_else(|| EngineError::invalid_state("no eligible player to start"))?;

        self.session.status = SessionStatus::Active;
        self.session.round = 1;
        self.session.started_at = Some(now);
        self.touch(now);
        debug!(session_id = %self.session.id, first = %first, "Session started");

        self.emit(
            None,
            now,
            EventKind::SessionStarted {
                order: self.order.as_slice().to_vec(),
                completion: self.session.completion,
            },
        );
        self.open_turn(first, word, now)
    }

    /// Open a turn for `owner`. Used after `start` and whenever a transition
    /// returned [`Progress::NextTurn`].
    pub fn open_turn(
        &mut self,
        owner: PlayerId,
        word: Word,
        now: OffsetDateTime,
    ) -> Result<(), EngineError> {
        match self.session.player(owner) {
            Some(p) if !p.eliminated => {}
            Some(_) => {
                return Err(EngineError::invalid_state(format!(
                    "player {owner} is eliminated"
                )))
            }
            None => return Err(EngineError::player_not_found(owner)),
        }

        let masked_word = word.masked();
        let timeout = self.turns.timeout();
        let turn = self
            .turns
            .start_turn(self.session.status, owner, word, now)?;
        let deadline = turn.deadline(timeout);
        let hint_budget = turn.hints.budget();

        self.session.current_owner = Some(owner);
        self.touch(now);
        self.emit(
            Some(owner),
            now,
            EventKind::TurnStarted {
                round: self.session.round,
                owner,
                masked_word,
                hint_budget,
                deadline,
            },
        );
        Ok(())
    }

    pub fn cancel(&mut self, reason: CancelReason, now: OffsetDateTime) -> Result<(), EngineError> {
        self.ensure_not_terminal()?;
        self.turns.close();
        self.session.status = SessionStatus::Cancelled;
        self.session.current_owner = None;
        self.session.ended_at = Some(now);
        self.touch(now);
        self.emit(None, now, EventKind::SessionCancelled { reason });
        Ok(())
    }

    fn finish(&mut self, reason: EndReason, now: OffsetDateTime) {
        self.turns.close();
        self.session.status = SessionStatus::Finished;
        self.session.current_owner = None;
        self.session.ended_at = Some(now);
        self.touch(now);

        let settings = &self.session.settings;
        let table = standings(
            &self.session.roster,
            settings.is_competitive(),
            settings.ranked || settings.tournament,
        );
        self.standings = Some(table.clone());
        self.emit(
            None,
            now,
            EventKind::SessionEnded {
                reason,
                standings: table,
            },
        );
    }

    // ---- progress --------------------------------------------------------

    fn time_limit_reached(&self, now: OffsetDateTime) -> bool {
        match (self.session.completion, self.session.started_at) {
            (CompletionPolicy::TimeLimit(limit), Some(started)) => {
                let elapsed = (now - started).whole_milliseconds();
                elapsed >= limit.as_millis() as i128
            }
            _ => false,
        }
    }

    fn last_standing(&self) -> bool {
        self.session.standing_count() <= self.survivor_floor
    }

    /// After the current turn closed: finish or pick the next owner.
    fn progress(&mut self, now: OffsetDateTime) -> Progress {
        if self.session.standing_count() == 0 {
            self.finish(EndReason::LastStanding, now);
            return Progress::Ended;
        }
        match self.session.completion {
            CompletionPolicy::Elimination if self.last_standing() => {
                self.finish(EndReason::LastStanding, now);
                return Progress::Ended;
            }
            CompletionPolicy::TimeLimit(_) if self.time_limit_reached(now) => {
                self.finish(EndReason::TimeLimit, now);
                return Progress::Ended;
            }
            _ => {}
        }

        let session = &self.session;
        let next = self
            .order
            .advance(|id| session.player(id).is_some_and(|p| !p.eliminated));
        let Some(next) = next else {
            self.finish(EndReason::LastStanding, now);
            return Progress::Ended;
        };

        if next.wrapped {
            if let CompletionPolicy::RoundLimit(max) = self.session.completion {
                if self.session.round >= max {
                    self.finish(EndReason::RoundLimit, now);
                    return Progress::Ended;
                }
            }
            self.session.round += 1;
            self.emit(
                None,
                now,
                EventKind::RoundAdvanced {
                    round: self.session.round,
                },
            );
        }
        self.session.current_owner = Some(next.owner);
        Progress::NextTurn(next.owner)
    }

    fn mark_eliminated(&mut self, player: PlayerId, now: OffsetDateTime) {
        if let Some(p) = self.session.player_mut(player) {
            p.eliminated = true;
        }
        let remaining = self.session.standing_count();
        self.emit(Some(player), now, EventKind::PlayerEliminated { remaining });
    }

    /// True when [`settle`](Self::settle) would change something at `now`.
    pub fn is_settle_due(&self, now: OffsetDateTime) -> bool {
        self.session.status == SessionStatus::Active
            && (self.time_limit_reached(now) || self.turns.is_expired(now))
    }

    /// Expire an overdue turn or end a session whose time ran out.
    ///
    /// Mutating operations call this first so that nothing is ever scored
    /// against a turn past its deadline.
    pub fn settle(&mut self, now: OffsetDateTime) -> Option<Settled> {
        if self.session.status != SessionStatus::Active {
            return None;
        }
        if self.time_limit_reached(now) {
            self.finish(EndReason::TimeLimit, now);
            return Some(Settled::TimeLimitReached);
        }
        if !self.turns.is_expired(now) {
            return None;
        }

        let turn = self.turns.current()?;
        let owner = turn.owner;
        let elapsed_ms = turn.elapsed_ms(now);
        let (word, first_reveal) = self.turns.reveal().ok()?;
        if first_reveal {
            self.emit(
                Some(owner),
                now,
                EventKind::WordRevealed {
                    word: word.text.clone(),
                    reason: RevealReason::TimedOut,
                },
            );
        }

        let eliminated = self.session.settings.elimination;
        if eliminated {
            self.mark_eliminated(owner, now);
        }
        self.turns.close();
        self.touch(now);
        debug!(session_id = %self.session.id, owner = %owner, elapsed_ms, "Turn expired");

        let progress = self.progress(now);
        Some(Settled::TurnExpired(ExpiredTurn {
            owner,
            word,
            elapsed_ms,
            eliminated,
            progress,
        }))
    }

    // ---- player actions --------------------------------------------------

    /// Score an attempt by the turn owner and close the turn.
    pub fn submit_attempt(
        &mut self,
        player: PlayerId,
        text: &str,
        source: AttemptSource,
        now: OffsetDateTime,
    ) -> Result<AttemptOutcome, EngineError> {
        self.ensure_active()?;
        self.ensure_owner(player)?;
        let verdict = self.turns.validate_attempt(text, now)?;
        let turn = self.turns.current().ok_or(EngineError::NoWordSet)?;
        let response_ms = turn.elapsed_ms(now);

        let attempt = Attempt {
            id: AttemptId::next_after(self.attempts.last().map(|a| a.id), now),
            session_id: self.session.id,
            player_id: player,
            word_id: turn.word.id.clone(),
            word: turn.word.text.clone(),
            submitted: text.to_string(),
            source,
            correct: verdict.is_correct(),
            response_ms,
            round: self.session.round,
            at: now,
        };

        let mode = self.session.settings.mode;
        let p = self
            .session
            .player_mut(player)
            .ok_or_else(|| EngineError::player_not_found(player))?;
        p.attempts += 1;
        if verdict.is_correct() {
            p.correct += 1;
        }
        p.total_response_ms += response_ms;
        let before = p.score;
        p.score = calculate_score(mode, p.stats());
        let (score, delta) = (p.score, p.score - before);

        self.attempts.push(attempt.clone());
        self.emit(
            Some(player),
            now,
            EventKind::AttemptResult {
                attempt_id: attempt.id,
                submitted: attempt.submitted.clone(),
                correct: attempt.correct,
                response_ms,
                score,
                delta,
            },
        );

        let eliminated = eliminates(self.session.settings.elimination, verdict.is_correct());
        if eliminated {
            self.mark_eliminated(player, now);
        }

        self.turns.close();
        self.touch(now);
        let progress = self.progress(now);

        Ok(AttemptOutcome {
            attempt,
            verdict,
            score,
            delta,
            eliminated,
            progress,
        })
    }

    /// Pick the hint kind for a request and return the word the hint source
    /// needs. Nothing is consumed yet.
    pub fn prepare_hint(
        &mut self,
        player: PlayerId,
        kind: Option<HintKind>,
        now: OffsetDateTime,
    ) -> Result<(HintKind, Word), EngineError> {
        self.ensure_active()?;
        self.ensure_owner(player)?;
        let policy = self.session.settings.hint_selection;
        let turn = self.turns.ensure_hint_available(now)?;
        let word = turn.word.clone();
        let kind = match kind {
            Some(kind) => kind,
            None => turn.hints.select_kind(policy, &mut self.rng),
        };
        Ok((kind, word))
    }

    /// Consume one hint for `player` now that its content is known.
    pub fn grant_hint(
        &mut self,
        player: PlayerId,
        kind: HintKind,
        content: String,
        now: OffsetDateTime,
    ) -> Result<u8, EngineError> {
        self.ensure_active()?;
        self.ensure_owner(player)?;
        let used = self.turns.grant_hint(kind)?;
        let remaining = self
            .turns
            .current()
            .map(|t| t.hints.remaining())
            .unwrap_or(0);
        if let Some(p) = self.session.player_mut(player) {
            p.hints_used += 1;
        }
        self.touch(now);
        self.emit(
            Some(player),
            now,
            EventKind::HintGranted {
                kind,
                content,
                hints_used: used,
                hints_remaining: remaining,
            },
        );
        Ok(used)
    }

    /// Unmask the current word. Idempotent; the event goes out once.
    pub fn reveal_word(
        &mut self,
        requested_by: PlayerId,
        now: OffsetDateTime,
    ) -> Result<Word, EngineError> {
        self.ensure_active()?;
        self.ensure_member(requested_by)?;
        let (word, first) = self.turns.reveal()?;
        if first {
            self.touch(now);
            self.emit(
                Some(requested_by),
                now,
                EventKind::WordRevealed {
                    word: word.text.clone(),
                    reason: RevealReason::Requested,
                },
            );
        }
        Ok(word)
    }

    /// Knock a player out. Returns `Some` when a new turn or the end of the
    /// session followed from it.
    pub fn eliminate(
        &mut self,
        player: PlayerId,
        now: OffsetDateTime,
    ) -> Result<Option<Progress>, EngineError> {
        self.ensure_active()?;
        let p = self
            .session
            .player(player)
            .ok_or_else(|| EngineError::player_not_found(player))?;
        if p.eliminated {
            return Err(EngineError::invalid_state(format!(
                "player {player} is already eliminated"
            )));
        }

        self.mark_eliminated(player, now);
        self.touch(now);
        Ok(self.after_removal(player, now))
    }

    /// Remove a player from the roster.
    pub fn leave(
        &mut self,
        player: PlayerId,
        now: OffsetDateTime,
    ) -> Result<Option<Progress>, EngineError> {
        self.ensure_not_terminal()?;
        let idx = self
            .session
            .roster
            .iter()
            .position(|p| p.id == player)
            .ok_or_else(|| EngineError::player_not_found(player))?;

        self.session.roster.remove(idx);
        self.touch(now);
        self.emit(
            Some(player),
            now,
            EventKind::PlayerLeft {
                roster_size: self.session.roster.len(),
            },
        );

        if self.session.roster.is_empty() {
            self.cancel(CancelReason::RosterEmpty, now)?;
            return Ok(Some(Progress::Ended));
        }
        if self.session.host == player {
            self.session.host = self.session.roster[0].id;
        }
        if self.session.status != SessionStatus::Active {
            return Ok(None);
        }
        if self.session.roster.len() < self.session.settings.min_players {
            self.finish(EndReason::NotEnoughPlayers, now);
            return Ok(Some(Progress::Ended));
        }
        Ok(self.after_removal(player, now))
    }

    /// Common tail of elimination and leave during an active session.
    fn after_removal(&mut self, player: PlayerId, now: OffsetDateTime) -> Option<Progress> {
        if self.session.current_owner == Some(player) {
            self.turns.close();
            return Some(self.progress(now));
        }
        let over = self.session.standing_count() == 0
            || (self.session.completion == CompletionPolicy::Elimination && self.last_standing());
        if over {
            self.finish(EndReason::LastStanding, now);
            return Some(Progress::Ended);
        }
        None
    }
}

/// Per-session RNG: seeded from the engine seed when one is configured,
/// otherwise from the OS.
pub fn session_rng(engine_seed: Option<u64>, ordinal: u64) -> ChaCha8Rng {
    match engine_seed {
        Some(seed) => {
            ChaCha8Rng::seed_from_u64(crate::domain::seed_derivation::derive_session_seed(
                seed, ordinal,
            ))
        }
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    }
}
