use crate::{
    clock::HostClock,
    timer::Timer,
    types::{Handle, Millis, Vec3},
};
use serde::Serialize;

/// One participant in a race.
#[derive(Debug, Clone, Serialize)]
pub struct Racer {
    pub index:       usize,
    pub name:        String,
    pub actor:       Handle,
    pub vehicle:     Handle,
    pub is_player:   bool,
    pub last_node:   Option<usize>,
    /// Completed laps.
    pub lap:         u32,
    pub next_node:   usize,
    /// Speeds sampled at every checkpoint taken so far.
    pub speed_sum:   f32,
    pub time_budget: Option<Timer>,
    pub knocked_out: bool,
    pub finished:    bool,
    pub pace:        f32,
    pub on_recorded_path: bool,
    pub grid:        Vec3,
    pub grid_heading: f32,
    /// Node just taken that is also the next target; must be left first.
    #[serde(skip)]
    pub(crate) must_leave:      Option<usize>,
    #[serde(skip)]
    pub(crate) progress_anchor: Vec3,
    #[serde(skip)]
    pub(crate) progress_timer:  Option<Timer>,
}

impl Racer {
    pub fn new(index: usize, name: impl Into<String>, actor: Handle, vehicle: Handle, is_player: bool) -> Self {
        Self {
            index,
            name: name.into(),
            actor,
            vehicle,
            is_player,
            last_node: None,
            lap: 0,
            next_node: 0,
            speed_sum: 0.0,
            time_budget: None,
            knocked_out: false,
            finished: false,
            pace: 1.0,
            on_recorded_path: false,
            grid: Vec3::ZERO,
            grid_heading: 0.0,
            must_leave: None,
            progress_anchor: Vec3::ZERO,
            progress_timer: None,
        }
    }

    /// Still competing: neither knocked out nor past the finish.
    pub fn is_active(&self) -> bool {
        !self.knocked_out && !self.finished
    }

    /// Add a node's time allotment to the budget, opening one if needed.
    pub fn extend_time(&mut self, clock: &HostClock, ms: Millis) {
        match self.time_budget.as_mut() {
            Some(timer) => timer.extend(ms),
            None => self.time_budget = Some(Timer::start(clock, ms)),
        }
    }

    pub fn time_remaining(&self, clock: &HostClock) -> Option<Millis> {
        self.time_budget.map(|t| t.remaining(clock))
    }

    pub(crate) fn mark_progress(&mut self, clock: &HostClock, pos: Vec3) {
        self.progress_anchor = pos;
        self.progress_timer = Some(Timer::stopwatch(clock));
    }

    pub(crate) fn stalled_for(&self, clock: &HostClock) -> Millis {
        self.progress_timer.map(|t| t.elapsed(clock)).unwrap_or(0)
    }
}
