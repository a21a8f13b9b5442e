mod common;

use std::sync::Arc;

use common::{owner, round_robin, Harness, WORD};
use futures::future::join_all;
use spellbee_engine::domain::{GameMode, HintKind, PlayerProfile, SessionKind};
use spellbee_engine::EngineError;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_attempts_advance_the_turn_once() {
    let h = Harness::new();
    let (handle, _) = h.active(round_robin(2, 5), 2).await;
    let current = owner(&handle);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move { handle.submit_attempt(current, WORD).await })
        })
        .collect();
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(
            *result,
            EngineError::UnauthorizedTurn {
                player_id: current
            }
        );
    }

    let snap = handle.snapshot();
    assert_eq!(snap.round, 1);
    assert_eq!(snap.attempts, 1);
    assert_ne!(snap.current_owner(), Some(current));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn both_players_racing_never_double_advance_the_round() {
    let h = Harness::new();
    let (handle, ids) = h.active(round_robin(2, 50), 2).await;

    let tasks: Vec<_> = ids
        .iter()
        .copied()
        .flat_map(|player| std::iter::repeat(player).take(20))
        .map(|player| {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move { handle.submit_attempt(player, WORD).await.is_ok() })
        })
        .collect();
    let wins = join_all(tasks)
        .await
        .into_iter()
        .filter(|joined| matches!(joined, Ok(true)))
        .count();

    let snap = handle.snapshot();
    assert_eq!(snap.attempts, wins);
    // Two turns per round: the round counter follows the attempts exactly.
    assert_eq!(snap.round as usize, wins / 2 + 1);
    let total: i64 = snap.roster.iter().map(|p| p.score).sum();
    assert_eq!(total, wins as i64 * 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_hint_requests_respect_the_budget() {
    let h = Harness::new();
    let (handle, _) = h.active(round_robin(2, 5), 2).await;
    let current = owner(&handle);

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move {
                handle
                    .request_hint(current, Some(HintKind::Definition))
                    .await
            })
        })
        .collect();
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|err| *err == EngineError::HintBudgetExhausted { budget: 3 }));
    assert_eq!(handle.snapshot().turn.as_ref().map(|t| t.hints_used), Some(3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sessions_are_created_independently() {
    let h = Harness::new();
    let registry = Arc::clone(&h.registry);

    let tasks: Vec<_> = (0..24)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .create_with_defaults(
                        SessionKind::Solo,
                        GameMode::RoundRobin,
                        PlayerProfile::new(format!("solo-{i}")),
                    )
                    .await
            })
        })
        .collect();
    for joined in join_all(tasks).await {
        joined.expect("task panicked").expect("create session");
    }

    assert_eq!(registry.len(), 24);
    assert_eq!(registry.active_ids().len(), 24);
    assert_eq!(h.store.len(), 24);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn snapshots_stay_readable_while_writers_run() {
    let h = Harness::new();
    let (handle, _) = h.active(round_robin(2, 50), 2).await;

    let writer = {
        let handle = Arc::clone(&handle);
        tokio::spawn(async move {
            for _ in 0..20 {
                let current = owner(&handle);
                handle.submit_attempt(current, WORD).await.expect("attempt");
            }
        })
    };

    let mut last_attempts = 0;
    while !writer.is_finished() {
        let snap = handle.snapshot();
        assert!(snap.attempts >= last_attempts, "snapshots never go back");
        last_attempts = snap.attempts;
        tokio::task::yield_now().await;
    }
    writer.await.expect("writer");
    assert_eq!(handle.snapshot().attempts, 20);
}
