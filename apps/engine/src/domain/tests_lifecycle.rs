use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::domain::events::EventKind;
use crate::domain::ids::SessionId;
use crate::domain::machine::{Progress, SessionStateMachine};
use crate::domain::session::{CancelReason, EndReason, PlayerProfile, RoomHandle, SessionStatus};
use crate::domain::settings::{GameMode, SessionKind, SessionSettings};
use crate::domain::test_prelude::*;
use crate::errors::ErrorCode;

fn rr() -> SessionSettings {
    SessionSettings::for_mode(GameMode::RoundRobin)
}

#[test]
fn create_starts_in_created_with_host_only() {
    let host = PlayerProfile::new("host");
    let host_id = host.id;
    let machine = SessionStateMachine::create(
        SessionId::new(),
        SessionKind::Multi,
        rr(),
        host,
        ChaCha8Rng::seed_from_u64(1),
        T0,
    )
    .unwrap();

    assert_eq!(machine.status(), SessionStatus::Created);
    assert_eq!(machine.session().roster.len(), 1);
    assert_eq!(machine.session().host, host_id);
    assert!(machine.turn().is_none());
}

#[test]
fn invalid_settings_never_build_a_machine() {
    let settings = SessionSettings {
        word_level: 42,
        ..rr()
    };
    let err = SessionStateMachine::create(
        SessionId::new(),
        SessionKind::Multi,
        settings,
        PlayerProfile::new("host"),
        ChaCha8Rng::seed_from_u64(1),
        T0,
    )
    .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidSettings);
}

#[test]
fn mark_waiting_emits_session_created_with_room() {
    let mut machine = SessionStateMachine::create(
        SessionId::new(),
        SessionKind::Multi,
        rr(),
        PlayerProfile::new("host"),
        ChaCha8Rng::seed_from_u64(1),
        T0,
    )
    .unwrap();
    let room = RoomHandle {
        room_id: "room-1".into(),
        join_url: None,
    };
    machine.mark_waiting(Some(room.clone()), T0).unwrap();

    assert_eq!(machine.status(), SessionStatus::Waiting);
    let events = machine.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0].kind,
        EventKind::SessionCreated { room: Some(r), .. } if *r == room
    ));

    // Only once.
    let err = machine.mark_waiting(None, T0).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}

#[test]
fn join_respects_capacity() {
    let settings = SessionSettings::for_mode(GameMode::TotalGame);
    let (mut machine, _) = waiting_machine(SessionKind::Multi, settings, 8);

    let err = machine.join(PlayerProfile::new("late"), T0).unwrap_err();
    assert_eq!(err, crate::error::EngineError::SessionFull { capacity: 8 });
    assert_eq!(machine.session().roster.len(), 8);
}

#[test]
fn joining_an_existing_member_is_rejected() {
    let (mut machine, ids) = waiting_machine(SessionKind::Multi, rr(), 2);
    let dup = PlayerProfile {
        id: ids[1],
        name: "again".into(),
        bot: false,
    };
    let err = machine.join(dup, T0).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
    assert_eq!(machine.session().roster.len(), 2);
}

#[test]
fn start_with_too_few_players_leaves_session_waiting() {
    let (mut machine, _) = waiting_machine(SessionKind::Multi, rr(), 1);

    let err = machine.start(word("apple"), T0).unwrap_err();
    assert_eq!(err, crate::error::EngineError::NotEnoughPlayers { have: 1, need: 2 });
    assert_eq!(machine.status(), SessionStatus::Waiting);
    assert!(machine.turn().is_none());
    assert!(machine.drain_events().is_empty());
}

#[test]
fn start_opens_first_turn_and_emits_in_order() {
    let (mut machine, ids) = waiting_machine(SessionKind::Multi, rr(), 3);
    machine.start(word("apple"), T0).unwrap();

    assert_eq!(machine.status(), SessionStatus::Active);
    assert_eq!(machine.session().round, 1);
    let turn = machine.turn().expect("turn opened");
    assert!(turn.masked);
    assert_eq!(turn.hints_used(), 0);
    assert!(ids.contains(&turn.owner));
    assert_eq!(machine.turn_order().len(), 3);
    assert_eq!(machine.turn_order()[0], turn.owner);

    let names: Vec<_> = machine.drain_events().iter().map(|e| e.kind.name()).collect();
    assert_eq!(names, ["session_started", "turn_started"]);
}

#[test]
fn start_twice_is_invalid_state() {
    let (mut machine, _) = active_machine(SessionKind::Multi, rr(), 2, "apple");
    let err = machine.start(word("pear"), T0).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}

#[test]
fn join_after_start_is_rejected() {
    let (mut machine, _) = active_machine(SessionKind::Multi, rr(), 2, "apple");
    let err = machine.join(PlayerProfile::new("late"), T0).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}

#[test]
fn turn_exists_iff_active() {
    let (mut machine, ids) = waiting_machine(SessionKind::Multi, rr(), 2);
    assert!(machine.turn().is_none());
    machine.start(word("apple"), T0).unwrap();
    assert!(machine.turn().is_some());
    machine.cancel(CancelReason::Requested, at(1)).unwrap();
    assert_eq!(machine.status(), SessionStatus::Cancelled);
    assert!(machine.turn().is_none());
    assert!(machine.session().current_owner.is_none());
    assert_eq!(ids.len(), 2);
}

#[test]
fn cancel_is_rejected_once_terminal() {
    let (mut machine, _) = waiting_machine(SessionKind::Multi, rr(), 2);
    machine.cancel(CancelReason::Requested, T0).unwrap();
    let err = machine.cancel(CancelReason::Requested, T0).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}

#[test]
fn last_player_leaving_cancels() {
    let (mut machine, ids) = waiting_machine(SessionKind::Multi, rr(), 1);
    let progress = machine.leave(ids[0], at(1)).unwrap();
    assert_eq!(progress, Some(Progress::Ended));
    assert_eq!(machine.status(), SessionStatus::Cancelled);

    let kinds: Vec<_> = machine.drain_events().into_iter().map(|e| e.kind).collect();
    assert!(matches!(kinds[0], EventKind::PlayerLeft { roster_size: 0 }));
    assert!(matches!(
        kinds[1],
        EventKind::SessionCancelled {
            reason: CancelReason::RosterEmpty
        }
    ));
}

#[test]
fn host_leaving_hands_over_to_next_member() {
    let (mut machine, ids) = waiting_machine(SessionKind::Multi, rr(), 3);
    assert_eq!(machine.leave(ids[0], at(1)).unwrap(), None);
    assert_eq!(machine.session().host, ids[1]);
    assert_eq!(machine.status(), SessionStatus::Waiting);
}

#[test]
fn leaving_below_minimum_mid_game_finishes() {
    let (mut machine, ids) = active_machine(SessionKind::Multi, rr(), 2, "apple");
    let progress = machine.leave(ids[1], at(1)).unwrap();
    assert_eq!(progress, Some(Progress::Ended));
    assert_eq!(machine.status(), SessionStatus::Finished);
    assert!(machine.turn().is_none());

    let ended = machine
        .drain_events()
        .into_iter()
        .find_map(|e| match e.kind {
            EventKind::SessionEnded { reason, standings } => Some((reason, standings)),
            _ => None,
        })
        .expect("session ended event");
    assert_eq!(ended.0, EndReason::NotEnoughPlayers);
    assert_eq!(ended.1.len(), 1);
    assert_eq!(ended.1[0].player_id, ids[0]);
}

#[test]
fn owner_leaving_passes_the_turn() {
    let (mut machine, _) = active_machine(SessionKind::Multi, rr(), 3, "apple");
    let leaver = owner(&machine);
    let progress = machine.leave(leaver, at(1)).unwrap();
    let Some(Progress::NextTurn(next)) = progress else {
        panic!("expected a next turn, got {progress:?}");
    };
    assert_ne!(next, leaver);
    assert!(machine.turn().is_none(), "caller opens the next turn");

    follow(&mut machine, Progress::NextTurn(next), "pear", at(1));
    assert_eq!(owner(&machine), next);
}

#[test]
fn unknown_player_cannot_leave() {
    let (mut machine, _) = waiting_machine(SessionKind::Multi, rr(), 2);
    let err = machine
        .leave(crate::domain::ids::PlayerId::new(), T0)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PlayerNotFound);
}

#[test]
fn solo_session_starts_with_one_player() {
    let (mut machine, ids) =
        waiting_machine(SessionKind::Solo, SessionSettings::solo(GameMode::RoundRobin), 1);
    machine.start(word("apple"), T0).unwrap();
    assert_eq!(owner(&machine), ids[0]);
}
