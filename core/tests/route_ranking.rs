//! Properties of checkpoint ordering and race ranking, checked over
//! every small route shape and a batch of seeded random standings.

use mission_core::{
    ranking::{is_ahead, rank_of, standings, RankKey},
    rng::StreamRng,
    route::{Route, RouteNode},
    types::Vec3,
};

/// Every route of `len` nodes with at least one checkpoint.
fn all_routes(len: usize) -> impl Iterator<Item = Route> {
    (1u32..(1 << len)).map(move |mask| {
        let nodes = (0..len)
            .map(|i| {
                let pos = Vec3::new(i as f32 * 25.0, 0.0, 0.0);
                if mask & (1 << i) != 0 {
                    RouteNode::checkpoint(pos, 0.0, 20.0)
                } else {
                    RouteNode::waypoint(pos, 0.0, 20.0)
                }
            })
            .collect();
        Route::new(nodes).unwrap()
    })
}

/// From any node, following `find_next_checkpoint_id` visits every
/// checkpoint exactly once before the cycle repeats.
#[test]
fn next_checkpoint_cycles_through_every_checkpoint() {
    for len in 1..=6 {
        for route in all_routes(len) {
            let checkpoints: Vec<usize> = route.checkpoint_ids().collect();
            for start in 0..route.len() {
                let mut id = start;
                let mut seen = Vec::new();
                for _ in 0..checkpoints.len() {
                    id = route.find_next_checkpoint_id(id);
                    assert!(route.node(id).is_checkpoint, "node {id} is not a checkpoint");
                    seen.push(id);
                }
                assert_eq!(
                    route.find_next_checkpoint_id(id),
                    seen[0],
                    "cycle from {start} does not repeat after {} steps",
                    checkpoints.len()
                );
                seen.sort_unstable();
                assert_eq!(seen, checkpoints, "cycle from {start} on {len} nodes");
            }
        }
    }
}

#[test]
fn normalized_checkpoint_is_a_checkpoint_at_or_after_id() {
    for route in all_routes(5) {
        for id in 0..route.len() {
            let cp = route.normalized_checkpoint(id);
            assert!(route.node(cp).is_checkpoint);
            if route.node(id).is_checkpoint {
                assert_eq!(cp, id);
            }
        }
        assert_eq!(route.ordinal_of(route.last_checkpoint_id()), Some(route.last_checkpoint_ordinal()));
    }
}

fn random_keys(rng: &mut StreamRng, n: usize) -> Vec<RankKey> {
    (0..n)
        .map(|_| RankKey {
            lap:                (rng.next_f64() * 3.0) as u32,
            checkpoint_ordinal: (rng.next_f64() * 4.0) as usize,
            distance:           (rng.range_f32(0.0, 4.0)).floor() * 10.0,
        })
        .collect()
}

/// Ranks are 1..=n, the leader is 1, and for every pair exactly one of
/// "ahead", "behind" or "equal key" holds.
#[test]
fn ranking_is_a_consistent_order() {
    let mut rng = StreamRng::new(7, 0);
    for _ in 0..200 {
        let keys = random_keys(&mut rng, 6);
        let ranks = standings(&keys);
        assert!(ranks.iter().all(|&r| (1..=keys.len()).contains(&r)));
        assert!(ranks.contains(&1), "someone always leads: {ranks:?}");

        for (i, a) in keys.iter().enumerate() {
            for (j, b) in keys.iter().enumerate() {
                if i == j {
                    continue;
                }
                let relations = [is_ahead(a, b), is_ahead(b, a), a == b];
                assert_eq!(
                    relations.iter().filter(|&&r| r).count(),
                    1,
                    "keys {a:?} and {b:?} are not ordered exactly one way"
                );
                if is_ahead(a, b) {
                    assert!(ranks[i] < ranks[j]);
                }
                if a == b {
                    assert_eq!(ranks[i], ranks[j]);
                }
            }
        }
    }
}

/// Swapping two racers with identical state leaves every other racer's
/// position where it was, and reordering the field reorders the ranks.
#[test]
fn ranking_does_not_depend_on_racer_order() {
    let mut rng = StreamRng::new(11, 0);
    for _ in 0..200 {
        let mut keys = random_keys(&mut rng, 5);
        keys[3] = keys[1];
        let before = standings(&keys);

        keys.swap(1, 3);
        let after = standings(&keys);
        assert_eq!(before, after);

        let reversed: Vec<RankKey> = keys.iter().rev().copied().collect();
        let mut reversed_ranks = standings(&reversed);
        reversed_ranks.reverse();
        assert_eq!(reversed_ranks, after);
        for i in 0..keys.len() {
            assert_eq!(rank_of(i, &keys), after[i]);
        }
    }
}
