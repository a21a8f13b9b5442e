//! Property tests for turn order walking.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::domain::ids::PlayerId;
use crate::domain::test_prelude;
use crate::domain::turn_order::TurnOrder;

proptest! {
    #![proptest_config(test_prelude::proptest_config())]

    /// Over one full lap every eligible player gets exactly one turn and
    /// exactly one step reports the wrap.
    #[test]
    fn prop_full_lap_visits_each_eligible_once(
        players in 1usize..=12,
        seed in any::<u64>(),
        mask in proptest::collection::vec(any::<bool>(), 12),
    ) {
        let ids: Vec<PlayerId> = (0..players).map(|_| PlayerId::new()).collect();
        let mut order = TurnOrder::shuffled(ids.clone(), &mut ChaCha8Rng::seed_from_u64(seed));
        let eligible: Vec<PlayerId> = order
            .as_slice()
            .iter()
            .zip(mask.iter())
            .filter(|(_, keep)| **keep)
            .map(|(id, _)| *id)
            .collect();
        prop_assume!(!eligible.is_empty());

        let is_eligible = |id: PlayerId| eligible.contains(&id);
        let start = order.first(is_eligible).expect("someone eligible");

        let mut visited = vec![start];
        let mut wraps = 0;
        for _ in 1..eligible.len() {
            let next = order.advance(is_eligible).expect("next");
            wraps += usize::from(next.wrapped);
            visited.push(next.owner);
        }
        let back = order.advance(is_eligible).expect("lap closes");
        wraps += usize::from(back.wrapped);

        prop_assert_eq!(back.owner, start);
        prop_assert_eq!(wraps, 1);
        visited.sort();
        let mut expected = eligible.clone();
        expected.sort();
        prop_assert_eq!(visited, expected);
    }
}
