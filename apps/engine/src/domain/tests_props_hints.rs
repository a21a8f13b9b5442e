//! Property tests: per-turn hint budget and turn invariants over random
//! operation sequences.

use proptest::prelude::*;

use crate::domain::hints::HintKind;
use crate::domain::machine::SessionStateMachine;
use crate::domain::session::{AttemptSource, SessionStatus};
use crate::domain::settings::{GameMode, SessionKind, SessionSettings};
use crate::domain::test_prelude::{self, *};

#[derive(Debug, Clone)]
enum Op {
    Hint(Option<usize>),
    Attempt { correct: bool },
    Wait(i64),
    Reveal,
    Settle,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => proptest::option::of(0..HintKind::ALL.len()).prop_map(Op::Hint),
        3 => any::<bool>().prop_map(|correct| Op::Attempt { correct }),
        2 => (0i64..15).prop_map(Op::Wait),
        1 => Just(Op::Reveal),
        1 => Just(Op::Settle),
    ]
}

fn check_invariants(machine: &SessionStateMachine) {
    let session = machine.session();
    let active = session.status == SessionStatus::Active;
    assert_eq!(machine.turn().is_some(), active, "turn iff active");

    if let Some(turn) = machine.turn() {
        assert!(turn.hints_used() <= turn.hints.budget());
        let owner = session.player(turn.owner).expect("owner in roster");
        assert!(!owner.eliminated, "owner must not be eliminated");
    }
    if active {
        assert!(session.roster.len() >= session.settings.min_players);
    }
    assert!(session.roster.len() <= session.settings.max_players);
}

proptest! {
    #![proptest_config(test_prelude::proptest_config())]

    #[test]
    fn prop_hints_never_exceed_budget(
        budget in 0u8..=5,
        players in 2usize..=5,
        elimination in any::<bool>(),
        ops in proptest::collection::vec(op(), 1..60),
    ) {
        let settings = SessionSettings {
            hints_per_turn: budget,
            elimination,
            max_rounds: Some(4),
            ..SessionSettings::for_mode(GameMode::RoundRobin)
        };
        let (mut machine, ids) = active_machine(SessionKind::Multi, settings, players, "w0");
        let mut now = 0i64;
        let mut next_word = 1;

        for op in ops {
            if machine.status() != SessionStatus::Active {
                break;
            }
            let current = owner(&machine);
            match op {
                Op::Hint(kind) => {
                    let kind = kind.map(|i| HintKind::ALL[i]);
                    if let Ok((kind, _)) = machine.prepare_hint(current, kind, at(now)) {
                        machine
                            .grant_hint(current, kind, "hint".into(), at(now))
                            .expect("prepared hint must be grantable");
                    }
                }
                Op::Attempt { correct } => {
                    let text = if correct {
                        machine.turn().map(|t| t.word.text.clone()).unwrap_or_default()
                    } else {
                        "zzz".to_string()
                    };
                    if let Ok(outcome) =
                        machine.submit_attempt(current, &text, AttemptSource::Text, at(now))
                    {
                        follow(&mut machine, outcome.progress, &format!("w{next_word}"), at(now));
                        next_word += 1;
                    }
                }
                Op::Wait(secs) => now += secs,
                Op::Reveal => {
                    let _ = machine.reveal_word(ids[0], at(now));
                }
                Op::Settle => {
                    if let Some(crate::domain::machine::Settled::TurnExpired(expired)) =
                        machine.settle(at(now))
                    {
                        follow(&mut machine, expired.progress, &format!("w{next_word}"), at(now));
                        next_word += 1;
                    }
                }
            }
            check_invariants(&machine);
        }
    }
}
