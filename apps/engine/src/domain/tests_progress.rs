use crate::domain::events::{EventKind, RevealReason};
use crate::domain::hints::HintKind;
use crate::domain::ids::PlayerId;
use crate::domain::machine::{Progress, Settled};
use crate::domain::session::{AttemptSource, EndReason, SessionStatus};
use crate::domain::settings::{GameMode, SessionKind, SessionSettings};
use crate::domain::test_prelude::*;
use crate::domain::turn::Verdict;
use crate::error::EngineError;
use crate::errors::ErrorCode;

fn rr_rounds(rounds: u32) -> SessionSettings {
    SessionSettings {
        max_rounds: Some(rounds),
        ..SessionSettings::for_mode(GameMode::RoundRobin)
    }
}

#[test]
fn correct_attempt_scores_and_passes_the_turn() {
    let (mut machine, _) = active_machine(SessionKind::Multi, rr_rounds(5), 2, "Testing");
    let first = owner(&machine);

    let outcome = machine
        .submit_attempt(first, " TESTING ", AttemptSource::Text, at(3))
        .unwrap();
    assert_eq!(outcome.verdict, Verdict::Correct);
    assert_eq!(outcome.score, 100);
    assert_eq!(outcome.delta, 100);
    assert_eq!(outcome.attempt.response_ms, 3_000);
    assert_eq!(outcome.attempt.word, "Testing");
    let Progress::NextTurn(next) = outcome.progress else {
        panic!("session should continue");
    };
    assert_ne!(next, first);
    assert!(machine.turn().is_none());

    let player = machine.session().player(first).unwrap();
    assert_eq!((player.attempts, player.correct, player.score), (1, 1, 100));

    let names: Vec<_> = machine.drain_events().iter().map(|e| e.kind.name()).collect();
    assert_eq!(names, ["attempt_result"]);
}

#[test]
fn attempts_from_non_owners_are_rejected_without_side_effects() {
    let (mut machine, ids) = active_machine(SessionKind::Multi, rr_rounds(5), 3, "apple");
    let current = owner(&machine);
    let other = *ids.iter().find(|id| **id != current).unwrap();

    let err = machine
        .submit_attempt(other, "apple", AttemptSource::Text, at(1))
        .unwrap_err();
    assert_eq!(err, EngineError::UnauthorizedTurn { player_id: other });

    let stranger = PlayerId::new();
    let err = machine
        .submit_attempt(stranger, "apple", AttemptSource::Text, at(1))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PlayerNotFound);

    assert!(machine.attempts().is_empty());
    assert_eq!(owner(&machine), current);
    assert!(machine.drain_events().is_empty());
}

#[test]
fn attempts_outside_active_are_no_active_session() {
    let (mut machine, ids) = waiting_machine(SessionKind::Multi, rr_rounds(5), 2);
    let err = machine
        .submit_attempt(ids[0], "apple", AttemptSource::Text, T0)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoActiveSession);
}

#[test]
fn order_wrap_advances_round_and_round_limit_finishes() {
    let (mut machine, _) = active_machine(SessionKind::Multi, rr_rounds(2), 2, "w0");
    let mut rounds_seen = Vec::new();
    let mut progress = Progress::Ended;

    for n in 0..4 {
        rounds_seen.push(machine.session().round);
        let who = owner(&machine);
        progress = machine
            .submit_attempt(who, &format!("w{n}"), AttemptSource::Text, at(n))
            .unwrap()
            .progress;
        follow(&mut machine, progress, &format!("w{}", n + 1), at(n));
    }

    assert_eq!(rounds_seen, [1, 1, 2, 2]);
    assert_eq!(progress, Progress::Ended);
    assert_eq!(machine.status(), SessionStatus::Finished);
    let standings = machine.standings().expect("standings on finish");
    assert_eq!(standings.len(), 2);
    assert!(standings.iter().all(|s| s.score == 200));

    let events = machine.drain_events();
    let advanced: Vec<_> = events
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::RoundAdvanced { round } => Some(round),
            _ => None,
        })
        .collect();
    assert_eq!(advanced, [2]);
    assert!(matches!(
        events.last().map(|e| &e.kind),
        Some(EventKind::SessionEnded {
            reason: EndReason::RoundLimit,
            ..
        })
    ));
}

#[test]
fn elimination_mode_ends_with_last_player_standing() {
    let settings = SessionSettings {
        elimination: true,
        ..SessionSettings::for_mode(GameMode::RoundRobin)
    };
    let (mut machine, _) = active_machine(SessionKind::Multi, settings, 3, "apple");

    let loser = owner(&machine);
    let outcome = machine
        .submit_attempt(loser, "appel", AttemptSource::Text, at(1))
        .unwrap();
    assert!(outcome.eliminated);
    assert!(machine.session().player(loser).unwrap().eliminated);
    follow(&mut machine, outcome.progress, "pear", at(1));

    let second = owner(&machine);
    assert_ne!(second, loser);
    let outcome = machine
        .submit_attempt(second, "peer", AttemptSource::Text, at(2))
        .unwrap();
    assert_eq!(outcome.progress, Progress::Ended);
    assert_eq!(machine.status(), SessionStatus::Finished);

    // Eliminated players keep their history.
    assert_eq!(machine.session().player(loser).unwrap().attempts, 1);
    assert_eq!(machine.session().roster.len(), 3);
}

#[test]
fn eliminated_players_are_skipped_in_turn_order() {
    let settings = SessionSettings {
        elimination: true,
        ..SessionSettings::for_mode(GameMode::RoundRobin)
    };
    let (mut machine, _) = active_machine(SessionKind::Multi, settings, 4, "a");
    let order = machine.turn_order().to_vec();
    let skipped = order[1];

    assert_eq!(machine.eliminate(skipped, at(1)).unwrap(), None);
    let err = machine.eliminate(skipped, at(1)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);

    let progress = machine
        .submit_attempt(order[0], "a", AttemptSource::Text, at(2))
        .unwrap()
        .progress;
    assert_eq!(progress, Progress::NextTurn(order[2]));
    assert_eq!(machine.turn_order(), order.as_slice());
}

#[test]
fn overdue_attempt_is_rejected_and_leaves_state_untouched() {
    let (mut machine, _) = active_machine(SessionKind::Multi, rr_rounds(5), 2, "apple");
    let current = owner(&machine);

    let err = machine
        .submit_attempt(current, "apple", AttemptSource::Text, at(11))
        .unwrap_err();
    assert_eq!(err, EngineError::TurnExpired { elapsed_ms: 11_000 });
    assert!(machine.attempts().is_empty());
    assert_eq!(owner(&machine), current);
}

#[test]
fn settle_expires_the_turn_reveals_and_moves_on() {
    let (mut machine, _) = active_machine(SessionKind::Multi, rr_rounds(5), 2, "apple");
    let current = owner(&machine);

    assert_eq!(machine.settle(at(10)), None, "deadline itself is still in time");
    let settled = machine.settle(at(12)).expect("turn should expire");
    let Settled::TurnExpired(expired) = settled else {
        panic!("expected an expired turn");
    };
    assert_eq!(expired.owner, current);
    assert_eq!(expired.word.text, "apple");
    assert_eq!(expired.elapsed_ms, 12_000);
    assert!(!expired.eliminated);
    let Progress::NextTurn(next) = expired.progress else {
        panic!("session should continue");
    };
    assert_ne!(next, current);
    assert!(machine.attempts().is_empty(), "a timeout is not an attempt");

    let events = machine.drain_events();
    assert!(matches!(
        &events[0].kind,
        EventKind::WordRevealed { word, reason: RevealReason::TimedOut } if word == "apple"
    ));

    // Nothing further to settle until the next turn opens.
    assert_eq!(machine.settle(at(13)), None);
}

#[test]
fn timeout_eliminates_in_elimination_mode() {
    let settings = SessionSettings {
        elimination: true,
        ..SessionSettings::for_mode(GameMode::RoundRobin)
    };
    let (mut machine, _) = active_machine(SessionKind::Multi, settings, 2, "apple");
    let current = owner(&machine);

    let Some(Settled::TurnExpired(expired)) = machine.settle(at(30)) else {
        panic!("turn should expire");
    };
    assert!(expired.eliminated);
    assert_eq!(expired.progress, Progress::Ended);
    assert_eq!(machine.status(), SessionStatus::Finished);
    assert!(machine.session().player(current).unwrap().eliminated);
}

#[test]
fn time_limit_finishes_idle_sessions() {
    let settings = SessionSettings::for_mode(GameMode::RapidFire);
    let (mut machine, _) = active_machine(SessionKind::Multi, settings, 2, "apple");

    assert_eq!(machine.settle(at(599)).map(|_| ()), Some(()), "turn expired first");
    let next = machine.session().current_owner.expect("next owner");
    follow(&mut machine, Progress::NextTurn(next), "pear", at(599));

    assert_eq!(machine.settle(at(600)), Some(Settled::TimeLimitReached));
    assert_eq!(machine.status(), SessionStatus::Finished);
    assert!(machine.turn().is_none());
}

#[test]
fn total_game_score_can_decay() {
    let (mut machine, ids) = active_machine(
        SessionKind::Solo,
        SessionSettings::solo(GameMode::TotalGame),
        1,
        "apple",
    );
    let solo = ids[0];

    let first = machine
        .submit_attempt(solo, "apple", AttemptSource::Text, at(2))
        .unwrap();
    assert_eq!((first.score, first.delta), (130, 130));
    assert_eq!(first.progress, Progress::NextTurn(solo));
    follow(&mut machine, first.progress, "pear", at(2));
    assert_eq!(machine.session().round, 2);

    let second = machine
        .submit_attempt(solo, "pare", AttemptSource::Text, at(4))
        .unwrap();
    assert_eq!((second.score, second.delta), (100, -30));
}

#[test]
fn hint_budget_is_per_turn() {
    let (mut machine, _) = active_machine(SessionKind::Multi, rr_rounds(5), 2, "apple");
    let current = owner(&machine);

    for n in 1..=3u8 {
        let (kind, word) = machine.prepare_hint(current, None, at(1)).unwrap();
        assert_eq!(word.text, "apple");
        let used = machine
            .grant_hint(current, kind, format!("hint {n}"), at(1))
            .unwrap();
        assert_eq!(used, n);
    }
    let err = machine.prepare_hint(current, None, at(1)).unwrap_err();
    assert_eq!(err, EngineError::HintBudgetExhausted { budget: 3 });
    assert_eq!(machine.turn().unwrap().hints_used(), 3);

    let kinds: Vec<HintKind> = machine
        .drain_events()
        .into_iter()
        .filter_map(|e| match e.kind {
            EventKind::HintGranted { kind, .. } => Some(kind),
            _ => None,
        })
        .collect();
    let mut unique = kinds.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 3, "avoid-repeats picks distinct kinds");

    let progress = machine
        .submit_attempt(current, "apple", AttemptSource::Text, at(2))
        .unwrap()
        .progress;
    follow(&mut machine, progress, "pear", at(2));
    assert_eq!(machine.turn().unwrap().hints_used(), 0);
    assert_eq!(machine.session().player(current).unwrap().hints_used, 3);
}

#[test]
fn hints_are_for_the_turn_owner_only() {
    let (mut machine, ids) = active_machine(SessionKind::Multi, rr_rounds(5), 2, "apple");
    let current = owner(&machine);
    let other = *ids.iter().find(|id| **id != current).unwrap();

    let err = machine
        .prepare_hint(other, Some(HintKind::Definition), at(1))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnauthorizedTurn);

    let err = machine
        .prepare_hint(current, Some(HintKind::Definition), at(11))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TurnExpired);
}

#[test]
fn reveal_emits_once() {
    let (mut machine, ids) = active_machine(SessionKind::Multi, rr_rounds(5), 2, "apple");
    assert_eq!(machine.reveal_word(ids[0], at(1)).unwrap().text, "apple");
    assert_eq!(machine.reveal_word(ids[1], at(2)).unwrap().text, "apple");
    assert!(!machine.turn().unwrap().masked);

    let reveals = machine
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e.kind, EventKind::WordRevealed { .. }))
        .count();
    assert_eq!(reveals, 1);
    assert_eq!(
        machine.snapshot().turn.expect("turn view").display,
        "apple"
    );
}

#[test]
fn attempt_history_keeps_submission_order() {
    let (mut machine, _) = active_machine(SessionKind::Multi, rr_rounds(10), 3, "w0");
    let mut submitted = Vec::new();
    for n in 0..6 {
        let who = owner(&machine);
        let text = if n % 2 == 0 { format!("w{n}") } else { "nope".into() };
        let outcome = machine
            .submit_attempt(who, &text, AttemptSource::Text, T0)
            .unwrap();
        submitted.push((who, text));
        follow(&mut machine, outcome.progress, &format!("w{}", n + 1), T0);
    }

    let history: Vec<_> = machine
        .attempts()
        .iter()
        .map(|a| (a.player_id, a.submitted.clone()))
        .collect();
    assert_eq!(history, submitted);

    let ids: Vec<_> = machine.attempts().iter().map(|a| a.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    assert!(machine.attempts().iter().enumerate().all(|(n, a)| a.word == format!("w{n}")));
}
