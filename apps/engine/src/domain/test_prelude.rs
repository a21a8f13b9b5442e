//! Shared helpers for domain tests.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use time::macros::datetime;
use time::OffsetDateTime;

pub use engine_test_support::proptest_config;

use crate::domain::ids::{PlayerId, SessionId};
use crate::domain::machine::{Progress, SessionStateMachine};
use crate::domain::session::PlayerProfile;
use crate::domain::settings::{SessionKind, SessionSettings};
use crate::domain::word::Word;

pub const T0: OffsetDateTime = datetime!(2025-06-01 9:00 UTC);

pub fn at(secs: i64) -> OffsetDateTime {
    T0 + time::Duration::seconds(secs)
}

pub fn word(text: &str) -> Word {
    Word::new(format!("w-{text}"), text, 1)
}

/// A waiting session with `players` members (host first), seeded.
pub fn waiting_machine(
    kind: SessionKind,
    settings: SessionSettings,
    players: usize,
) -> (SessionStateMachine, Vec<PlayerId>) {
    let host = PlayerProfile::new("host");
    let mut ids = vec![host.id];
    let mut machine = SessionStateMachine::create(
        SessionId::new(),
        kind,
        settings,
        host,
        ChaCha8Rng::seed_from_u64(99),
        T0,
    )
    .expect("settings should validate");
    machine.mark_waiting(None, T0).expect("created -> waiting");

    for n in 1..players {
        let profile = PlayerProfile::new(format!("p{n}"));
        ids.push(profile.id);
        machine.join(profile, T0).expect("join");
    }
    machine.drain_events();
    (machine, ids)
}

/// An active session whose first turn is on `first_word`.
pub fn active_machine(
    kind: SessionKind,
    settings: SessionSettings,
    players: usize,
    first_word: &str,
) -> (SessionStateMachine, Vec<PlayerId>) {
    let (mut machine, ids) = waiting_machine(kind, settings, players);
    machine.start(word(first_word), T0).expect("start");
    machine.drain_events();
    (machine, ids)
}

pub fn owner(machine: &SessionStateMachine) -> PlayerId {
    machine.turn().expect("live turn").owner
}

/// Open the next turn when progress asks for one.
pub fn follow(machine: &mut SessionStateMachine, progress: Progress, text: &str, now: OffsetDateTime) {
    if let Progress::NextTurn(next) = progress {
        machine.open_turn(next, word(text), now).expect("open turn");
    }
}
