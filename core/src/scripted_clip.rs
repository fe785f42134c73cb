//! Scripted clips: small cutscene timelines.
//!
//! A clip is an ordered list of steps replayed front to back once:
//!   - `wait(ms)`        hold for a fixed time
//!   - `action(f)`       run `f` once, then hold for one tick
//!   - `wait_until(p)`   hold until `p` returns true
//!
//! Every tick spent inside a step first goes through `yield_tick`, which
//! checks the host's skip input. A skip unwinds the whole clip at once.
//!
//! While a clip plays it holds the mission's `Suspend` token, the only
//! capability that may sleep the script or trigger camera fades. Calls
//! made through the `SuspendSlot` in the meantime are shadowed and
//! logged; the token goes back to the slot exactly once when the clip
//! finishes, is skipped, or is aborted. If the mission leaves its Update
//! phase while a clip still holds the token, the runner reclaims it and
//! the token the clip hands back later is dropped as stale.

use crate::{
    event::MissionEvent,
    host::{FadeDirection, Host},
    timer::Timer,
    types::Millis,
};

/// Capability to suspend the script or fade the camera.
#[derive(Debug)]
pub struct Suspend {
    generation: u32,
}

impl Suspend {
    pub fn sleep(&self, host: &dyn Host, duration_ms: Millis) -> Timer {
        Timer::start(host.clock(), duration_ms)
    }

    pub fn fade(&self, host: &mut dyn Host, duration_ms: Millis, direction: FadeDirection) {
        host.fade(duration_ms, direction);
    }
}

/// Where a mission keeps its `Suspend` token between clips.
#[derive(Debug)]
pub struct SuspendSlot {
    token:          Option<Suspend>,
    generation:     u32,
    lends:          u32,
    restores:       u32,
    shadowed_calls: u32,
}

impl Default for SuspendSlot {
    fn default() -> Self {
        Self {
            token: Some(Suspend { generation: 0 }),
            generation: 0,
            lends: 0,
            restores: 0,
            shadowed_calls: 0,
        }
    }
}

impl SuspendSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a clip holds the token.
    pub fn is_lent(&self) -> bool {
        self.token.is_none()
    }

    pub fn lends(&self) -> u32 {
        self.lends
    }

    pub fn restores(&self) -> u32 {
        self.restores
    }

    pub fn shadowed_calls(&self) -> u32 {
        self.shadowed_calls
    }

    fn lend(&mut self) -> Option<Suspend> {
        let token = self.token.take()?;
        self.lends += 1;
        Some(token)
    }

    fn restore(&mut self, token: Suspend) {
        if token.generation != self.generation || self.token.is_some() {
            log::debug!("stale suspend token returned after reclaim, dropped");
            return;
        }
        self.token = Some(token);
        self.restores += 1;
    }

    /// Take the token back from whichever clip holds it. Returns true if
    /// it was lent. The holder's copy becomes stale: handing it back later
    /// is a no-op.
    pub fn reclaim(&mut self) -> bool {
        if self.token.is_some() {
            return false;
        }
        self.generation += 1;
        self.token = Some(Suspend { generation: self.generation });
        self.restores += 1;
        log::warn!("suspend token reclaimed from an unfinished scripted clip");
        true
    }

    /// Start a sleep. `None` means the call was shadowed by a running clip.
    pub fn sleep(&mut self, host: &dyn Host, duration_ms: Millis) -> Option<Timer> {
        match self.token.as_ref() {
            Some(token) => Some(token.sleep(host, duration_ms)),
            None => {
                self.shadowed_calls += 1;
                log::warn!("suspend({duration_ms}) ignored while a scripted clip is playing");
                None
            }
        }
    }

    /// Fade the camera. Returns false when the call was shadowed.
    pub fn fade(&mut self, host: &mut dyn Host, duration_ms: Millis, direction: FadeDirection) -> bool {
        match self.token.as_ref() {
            Some(token) => {
                token.fade(host, duration_ms, direction);
                true
            }
            None => {
                self.shadowed_calls += 1;
                log::warn!("fade({duration_ms}, {direction:?}) ignored while a scripted clip is playing");
                false
            }
        }
    }
}

/// Sentinel for "the skip input was raised". Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipSkipped;

/// The cancellable wait: the script has just been handed a fresh tick,
/// so check whether the player asked to skip.
pub fn yield_tick(host: &dyn Host) -> Result<(), ClipSkipped> {
    if host.skip_pressed() {
        Err(ClipSkipped)
    } else {
        Ok(())
    }
}

/// What a clip action may touch. `suspend` is `None` when the clip was
/// started while another clip held the token.
pub struct ClipCtx<'a> {
    pub host:    &'a mut dyn Host,
    pub suspend: Option<&'a Suspend>,
}

pub type ClipAction = Box<dyn FnMut(&mut ClipCtx<'_>)>;
pub type ClipCondition = Box<dyn FnMut(&dyn Host) -> bool>;

pub enum ClipStep {
    Wait {
        duration_ms: Millis,
        action:      Option<ClipAction>,
    },
    WaitUntil {
        condition: ClipCondition,
    },
}

impl std::fmt::Debug for ClipStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wait { duration_ms, action } => f
                .debug_struct("Wait")
                .field("duration_ms", duration_ms)
                .field("action", &action.is_some())
                .finish(),
            Self::WaitUntil { .. } => f.debug_struct("WaitUntil").finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ScriptedClip {
    steps: Vec<ClipStep>,
}

impl ScriptedClip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wait(mut self, duration_ms: Millis) -> Self {
        self.steps.push(ClipStep::Wait { duration_ms, action: None });
        self
    }

    pub fn action<F>(mut self, action: F) -> Self
    where
        F: FnMut(&mut ClipCtx<'_>) + 'static,
    {
        self.steps.push(ClipStep::Wait { duration_ms: 0, action: Some(Box::new(action)) });
        self
    }

    /// Run `action`, then hold for `duration_ms`.
    pub fn action_then_wait<F>(mut self, action: F, duration_ms: Millis) -> Self
    where
        F: FnMut(&mut ClipCtx<'_>) + 'static,
    {
        self.steps.push(ClipStep::Wait { duration_ms, action: Some(Box::new(action)) });
        self
    }

    pub fn wait_until<P>(mut self, condition: P) -> Self
    where
        P: FnMut(&dyn Host) -> bool + 'static,
    {
        self.steps.push(ClipStep::WaitUntil { condition: Box::new(condition) });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Take the suspend token and start playing. If another clip already
    /// holds the token this one plays without it and cannot sleep or fade.
    pub fn play(self, slot: &mut SuspendSlot) -> ClipPlayback {
        let token = slot.lend();
        if token.is_none() {
            log::warn!("scripted clip started while another clip holds the suspend token");
        }
        ClipPlayback {
            steps:    self.steps,
            cursor:   0,
            timer:    None,
            token,
            status:   ClipStatus::Running,
            events:   Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipStatus {
    Running,
    Finished,
    /// The scene ended early because the skip input was raised.
    Skipped,
}

impl ClipStatus {
    pub fn is_done(&self) -> bool {
        !matches!(self, ClipStatus::Running)
    }
}

#[derive(Debug)]
pub struct ClipPlayback {
    steps:  Vec<ClipStep>,
    cursor: usize,
    /// Set once the current step's action has run.
    timer:  Option<Timer>,
    token:  Option<Suspend>,
    status: ClipStatus,
    events: Vec<MissionEvent>,
}

impl ClipPlayback {
    pub fn status(&self) -> ClipStatus {
        self.status
    }

    /// Index of the step currently playing.
    pub fn current_step(&self) -> usize {
        self.cursor
    }

    /// Events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<MissionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance one host tick.
    pub fn tick(&mut self, host: &mut dyn Host, slot: &mut SuspendSlot) -> ClipStatus {
        if self.status.is_done() {
            return self.status;
        }

        if self.timer.is_none() {
            // First tick of the clip.
            if self.steps.is_empty() {
                return self.finish(host, slot, ClipStatus::Finished);
            }
            self.begin_step(host);
            return self.status;
        }

        if yield_tick(host).is_err() {
            log::info!("scripted clip skipped at step {}", self.cursor);
            return self.finish(host, slot, ClipStatus::Skipped);
        }

        if !self.step_done(host) {
            return self.status;
        }

        self.cursor += 1;
        if self.cursor >= self.steps.len() {
            return self.finish(host, slot, ClipStatus::Finished);
        }
        self.begin_step(host);
        self.status
    }

    /// Stop the clip from outside (mission failed mid-scene).
    pub fn abort(&mut self, slot: &mut SuspendSlot) {
        if self.status.is_done() {
            return;
        }
        if let Some(token) = self.token.take() {
            slot.restore(token);
        }
        self.status = ClipStatus::Skipped;
    }

    fn begin_step(&mut self, host: &mut dyn Host) {
        let tick = host.clock().frame;
        self.events.push(MissionEvent::ClipStepStarted { tick, step: self.cursor });

        let ClipPlayback { steps, cursor, token, .. } = self;
        if let ClipStep::Wait { action: Some(action), .. } = &mut steps[*cursor] {
            let mut ctx = ClipCtx { host: &mut *host, suspend: token.as_ref() };
            action(&mut ctx);
        }
        self.timer = Some(Timer::stopwatch(host.clock()));
    }

    fn step_done(&mut self, host: &mut dyn Host) -> bool {
        let elapsed = match self.timer {
            Some(timer) => timer.elapsed(host.clock()),
            None => return false,
        };
        match &mut self.steps[self.cursor] {
            ClipStep::Wait { duration_ms, .. } => elapsed >= *duration_ms,
            ClipStep::WaitUntil { condition } => condition(&*host),
        }
    }

    fn finish(&mut self, host: &mut dyn Host, slot: &mut SuspendSlot, status: ClipStatus) -> ClipStatus {
        let tick = host.clock().frame;
        self.events.push(match status {
            ClipStatus::Skipped => MissionEvent::ClipSkipped { tick, step: self.cursor },
            _ => MissionEvent::ClipFinished { tick },
        });
        if let Some(token) = self.token.take() {
            slot.restore(token);
        }
        self.status = status;
        status
    }
}
