//! Race routes.
//!
//! A route is an ordered list of nodes. Some nodes are checkpoints; those
//! carry a dense ordinal (0, 1, 2, ...) in route order. Ordinals are
//! always assigned here, never read from input.

use crate::{
    error::{MissionError, MissionResult},
    types::{Millis, Vec3},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteNode {
    pub position:       Vec3,
    #[serde(default)]
    pub heading:        f32,
    /// Target speed; doubles as the posted limit for radar checkpoints.
    #[serde(default)]
    pub target_speed:   f32,
    #[serde(default)]
    pub is_checkpoint:  bool,
    #[serde(skip_deserializing, default)]
    pub ordinal:        Option<usize>,
    #[serde(default)]
    pub time_budget_ms: Option<Millis>,
}

impl RouteNode {
    pub fn waypoint(position: Vec3, heading: f32, target_speed: f32) -> Self {
        Self {
            position,
            heading,
            target_speed,
            is_checkpoint: false,
            ordinal: None,
            time_budget_ms: None,
        }
    }

    pub fn checkpoint(position: Vec3, heading: f32, target_speed: f32) -> Self {
        Self { is_checkpoint: true, ..Self::waypoint(position, heading, target_speed) }
    }

    pub fn with_time_budget(mut self, ms: Millis) -> Self {
        self.time_budget_ms = Some(ms);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Route {
    nodes:            Vec<RouteNode>,
    checkpoint_count: usize,
    first_checkpoint: usize,
    last_checkpoint:  usize,
}

impl Route {
    /// Build a route. Fails when it holds no checkpoint at all.
    pub fn new(mut nodes: Vec<RouteNode>) -> MissionResult<Self> {
        let mut ordinal = 0usize;
        let mut first = None;
        let mut last = 0usize;
        for (index, node) in nodes.iter_mut().enumerate() {
            if node.is_checkpoint {
                node.ordinal = Some(ordinal);
                ordinal += 1;
                first.get_or_insert(index);
                last = index;
            } else {
                node.ordinal = None;
            }
        }
        let Some(first_checkpoint) = first else {
            return Err(MissionError::InvalidRoute {
                reason: format!("route of {} nodes has no checkpoint", nodes.len()),
            });
        };
        Ok(Self {
            nodes,
            checkpoint_count: ordinal,
            first_checkpoint,
            last_checkpoint: last,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[RouteNode] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> &RouteNode {
        &self.nodes[id]
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoint_count
    }

    pub fn first_checkpoint_id(&self) -> usize {
        self.first_checkpoint
    }

    pub fn last_checkpoint_id(&self) -> usize {
        self.last_checkpoint
    }

    pub fn last_checkpoint_ordinal(&self) -> usize {
        self.checkpoint_count - 1
    }

    pub fn ordinal_of(&self, id: usize) -> Option<usize> {
        self.nodes.get(id).and_then(|n| n.ordinal)
    }

    /// The next checkpoint after `current`, wrapping to the start of the
    /// route. Total: a route always holds at least one checkpoint, so a
    /// single-checkpoint route returns that checkpoint for every input.
    pub fn find_next_checkpoint_id(&self, current: usize) -> usize {
        let len = self.nodes.len();
        let start = current.saturating_add(1).min(len);
        (start..len)
            .chain(0..=current.min(len - 1))
            .find(|&id| self.nodes[id].is_checkpoint)
            .unwrap_or(self.first_checkpoint)
    }

    /// `id` itself when it is a checkpoint, otherwise the checkpoint after it.
    pub fn normalized_checkpoint(&self, id: usize) -> usize {
        if self.nodes.get(id).is_some_and(|n| n.is_checkpoint) {
            id
        } else {
            self.find_next_checkpoint_id(id)
        }
    }

    pub fn checkpoint_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_checkpoint)
            .map(|(id, _)| id)
    }

    /// Sum of target speeds over every checkpoint of one lap.
    pub fn posted_speed_sum(&self) -> f32 {
        self.nodes
            .iter()
            .filter(|n| n.is_checkpoint)
            .map(|n| n.target_speed)
            .sum()
    }

    /// Target speeds still to be collected by a racer that has completed
    /// `laps_done` of `laps` laps and heads for checkpoint `next_ordinal`.
    pub fn remaining_checkpoint_speed(&self, next_ordinal: usize, laps_done: u32, laps: u32) -> f32 {
        if laps_done >= laps {
            return 0.0;
        }
        let this_lap: f32 = self
            .nodes
            .iter()
            .filter(|n| n.ordinal.is_some_and(|o| o >= next_ordinal))
            .map(|n| n.target_speed)
            .sum();
        let full_laps = (laps - laps_done - 1) as f32;
        this_lap + full_laps * self.posted_speed_sum()
    }
}
