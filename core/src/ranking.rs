//! Race position ranking.
//!
//! rank = 1 + number of other racers strictly ahead, where "ahead" is
//!   1. more completed laps, else
//!   2. a larger next-checkpoint ordinal, else
//!   3. a strictly shorter distance to that checkpoint.
//! Equal keys are never ahead of each other.

use crate::{racer::Racer, route::Route, types::Vec3};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankKey {
    pub lap:                u32,
    pub checkpoint_ordinal: usize,
    pub distance:           f32,
}

impl RankKey {
    /// Key for `racer` standing at `position`. A non-checkpoint target is
    /// normalised to the checkpoint after it.
    pub fn for_racer(route: &Route, racer: &Racer, position: Vec3) -> Self {
        let checkpoint = route.normalized_checkpoint(racer.next_node);
        let node = route.node(checkpoint);
        Self {
            lap:                racer.lap,
            checkpoint_ordinal: node.ordinal.unwrap_or(0),
            distance:           position.distance(&node.position),
        }
    }
}

pub fn is_ahead(a: &RankKey, b: &RankKey) -> bool {
    if a.lap != b.lap {
        return a.lap > b.lap;
    }
    if a.checkpoint_ordinal != b.checkpoint_ordinal {
        return a.checkpoint_ordinal > b.checkpoint_ordinal;
    }
    a.distance < b.distance
}

/// 1-based position of `keys[index]` among `keys`.
pub fn rank_of(index: usize, keys: &[RankKey]) -> usize {
    let me = &keys[index];
    1 + keys
        .iter()
        .enumerate()
        .filter(|(j, other)| *j != index && is_ahead(other, me))
        .count()
}

/// Positions of every key, in input order.
pub fn standings(keys: &[RankKey]) -> Vec<usize> {
    (0..keys.len()).map(|i| rank_of(i, keys)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(lap: u32, ord: usize, dist: f32) -> RankKey {
        RankKey { lap, checkpoint_ordinal: ord, distance: dist }
    }

    #[test]
    fn lap_beats_checkpoint_beats_distance() {
        let keys = [key(1, 0, 90.0), key(0, 5, 1.0), key(0, 5, 2.0), key(0, 2, 0.5)];
        assert_eq!(standings(&keys), vec![1, 2, 3, 4]);
    }

    #[test]
    fn equal_keys_share_a_position() {
        let keys = [key(0, 1, 10.0), key(0, 1, 10.0), key(0, 0, 1.0)];
        assert_eq!(standings(&keys), vec![1, 1, 3]);
    }
}
