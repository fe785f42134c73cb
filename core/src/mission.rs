//! The mission lifecycle: the heart of the framework.
//!
//! PHASES (fixed, never reordered):
//!   0. Start       telemetry, ambient world off, on_start, title banner
//!   1. Update      on_update once per tick until it returns an outcome
//!   2. Success     shared cleanup, on_success, reward, passed banner
//!   3. Failure     shared cleanup, on_failure, reason text, failed banner
//!   4. Cleanup     world toggles restored, entities removed, on_end
//!   5. Terminated  outcome observable, ticking does nothing
//!
//! RULES:
//!   - Exactly one phase handler runs per tick.
//!   - While in Start or Update, an inactive player (dead, arrested,
//!     disconnected) forces Failure before the handler is dispatched.
//!   - The outcome is written once; nothing can overwrite it.
//!   - An error from a hook never escapes: it is logged, journaled and
//!     turned into an ordinary failure.

use crate::{
    cleanup::{CleanupList, Ownership},
    clock::HostClock,
    config::MissionSettings,
    error::{MissionError, MissionResult},
    event::MissionEvent,
    host::{AmbientEvents, EntityKind, FadeDirection, Host, ModelId, TextMessage, TextStyle, WorldToggles},
    journal::Journal,
    scripted_clip::{ClipPlayback, ClipStatus, SuspendSlot},
    timer::Timer,
    types::{Handle, Millis, RunId, Tick, Vec3},
};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// How long failure reasons stay on screen unless the mission says otherwise.
pub const DEFAULT_REASON_MS: Millis = 4000;
pub const TITLE_BANNER_MS: Millis = 3000;
pub const UPDATE_ERROR_REASON: &str = "mission.error";
pub const PLAYER_INACTIVE_REASON: &str = "mission.player_inactive";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Phase {
    Start = 0,
    Update = 1,
    Success = 2,
    Failure = 3,
    Cleanup = 4,
    Terminated = 5,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start      => "start",
            Self::Update     => "update",
            Self::Success    => "success",
            Self::Failure    => "failure",
            Self::Cleanup    => "cleanup",
            Self::Terminated => "terminated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailReason {
    pub key:         String,
    pub duration_ms: Millis,
}

impl FailReason {
    pub fn new(key: impl Into<String>, duration_ms: Millis) -> Self {
        Self { key: key.into(), duration_ms }
    }
}

/// What an update hook decided this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Complete,
    Fail(FailReason),
}

impl Outcome {
    pub fn fail(key: impl Into<String>, duration_ms: Millis) -> Self {
        Outcome::Fail(FailReason::new(key, duration_ms))
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Outcome::Continue)
    }
}

/// The contract every mission type fulfills.
pub trait Mission: Any {
    fn settings(&self) -> &MissionSettings;

    /// Called once in Start. The only place `ctx.delegate` is honoured.
    fn on_start(&mut self, _ctx: &mut MissionContext<'_>) -> MissionResult<()> {
        Ok(())
    }

    /// Called once per tick in Update.
    fn on_update(&mut self, ctx: &mut MissionContext<'_>) -> MissionResult<Outcome>;

    fn on_success(&mut self, _ctx: &mut MissionContext<'_>) {}

    /// `reason` is `None` when the failure was forced by an inactive player.
    fn on_failure(&mut self, _ctx: &mut MissionContext<'_>, _reason: Option<&FailReason>) {}

    /// Shared cleanup, runs on both success and failure.
    fn on_cleanup(&mut self, _ctx: &mut MissionContext<'_>) {}

    fn on_end(&mut self, _ctx: &mut MissionContext<'_>) {}

    /// For downcasting in tests and tooling only.
    fn as_any(&self) -> &dyn Any;
}

#[derive(Default)]
struct DelegateSlot {
    open:    bool,
    request: Option<Box<dyn Mission>>,
}

/// Everything a hook may touch during one tick.
pub struct MissionContext<'a> {
    pub host: &'a mut dyn Host,
    journal:  &'a mut Journal,
    cleanup:  &'a mut CleanupList,
    suspend:  &'a mut SuspendSlot,
    delegate: &'a mut DelegateSlot,
    source:   &'static str,
}

impl<'a> MissionContext<'a> {
    pub fn tick(&self) -> Tick {
        self.host.clock().frame
    }

    pub fn clock(&self) -> &HostClock {
        self.host.clock()
    }

    pub fn emit(&mut self, event: MissionEvent) {
        let tick = self.tick();
        emit(self.journal, tick, self.source, &event);
    }

    pub fn journal(&self) -> &Journal {
        self.journal
    }

    pub fn save_snapshot(&mut self, state_json: String) {
        let tick = self.tick();
        self.journal.save_snapshot(tick, state_json);
    }

    /// Spawn an entity and put it on the cleanup list.
    pub fn spawn(
        &mut self,
        kind: EntityKind,
        model: ModelId,
        pos: Vec3,
        heading: f32,
        ownership: Ownership,
    ) -> Handle {
        let handle = self.host.spawn(kind, model, pos, heading);
        self.cleanup.track(handle, kind, ownership);
        handle
    }

    pub fn track(&mut self, handle: Handle, kind: EntityKind, ownership: Ownership) {
        self.cleanup.track(handle, kind, ownership);
    }

    pub fn forget(&mut self, handle: Handle) {
        self.cleanup.forget(handle);
    }

    /// Hand the rest of the lifecycle to `mission`. Only the first call
    /// made during Start counts; everything else is ignored.
    pub fn delegate(&mut self, mission: Box<dyn Mission>) -> bool {
        if !self.delegate.open {
            log::warn!("delegate({}) ignored outside of Start", mission.settings().title);
            return false;
        }
        if self.delegate.request.is_some() {
            log::warn!("delegate({}) ignored: a sub-mission is already set", mission.settings().title);
            return false;
        }
        self.delegate.request = Some(mission);
        true
    }

    pub fn suspend_slot(&mut self) -> &mut SuspendSlot {
        self.suspend
    }

    pub fn sleep(&mut self, duration_ms: Millis) -> Option<Timer> {
        self.suspend.sleep(&*self.host, duration_ms)
    }

    pub fn fade(&mut self, duration_ms: Millis, direction: FadeDirection) -> bool {
        self.suspend.fade(&mut *self.host, duration_ms, direction)
    }

    /// Advance a scripted clip one tick and journal what it did.
    pub fn play_clip(&mut self, playback: &mut ClipPlayback) -> ClipStatus {
        let status = playback.tick(&mut *self.host, self.suspend);
        for event in playback.drain_events() {
            self.emit(event);
        }
        status
    }
}

fn emit(journal: &mut Journal, tick: Tick, source: &str, event: &MissionEvent) {
    if let Err(err) = journal.append(tick, source, event) {
        log::error!("tick={tick} failed to journal {}: {err}", event.type_name());
    }
}

/// Drives one mission through its lifecycle, one tick at a time.
pub struct MissionRunner {
    mission:     Box<dyn Mission>,
    phase:       Phase,
    outcome:     Option<bool>,
    fail_reason: Option<FailReason>,
    saved_world: Option<WorldToggles>,
    cleanup:     CleanupList,
    suspend:     SuspendSlot,
    delegate:    DelegateSlot,
    sub:         Option<Box<MissionRunner>>,
    journal:     Journal,
    source:      &'static str,
}

impl MissionRunner {
    pub fn new<M: Mission>(run_id: impl Into<RunId>, mission: M) -> Self {
        Self::from_boxed(run_id, Box::new(mission))
    }

    pub fn from_boxed(run_id: impl Into<RunId>, mission: Box<dyn Mission>) -> Self {
        Self {
            mission,
            phase:       Phase::Start,
            outcome:     None,
            fail_reason: None,
            saved_world: None,
            cleanup:     CleanupList::new(),
            suspend:     SuspendSlot::new(),
            delegate:    DelegateSlot::default(),
            sub:         None,
            journal:     Journal::new(run_id),
            source:      "mission",
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }

    /// `Some(true)` passed, `Some(false)` failed, `None` still running.
    pub fn outcome(&self) -> Option<bool> {
        self.outcome
    }

    pub fn fail_reason(&self) -> Option<&FailReason> {
        self.fail_reason.as_ref()
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn cleanup_list(&self) -> &CleanupList {
        &self.cleanup
    }

    pub fn suspend_slot(&self) -> &SuspendSlot {
        &self.suspend
    }

    pub fn sub_mission(&self) -> Option<&MissionRunner> {
        self.sub.as_deref()
    }

    pub fn mission(&self) -> &dyn Mission {
        self.mission.as_ref()
    }

    pub fn mission_as<T: Mission>(&self) -> Option<&T> {
        self.mission.as_any().downcast_ref::<T>()
    }

    /// Advance one host tick. Returns the phase after the tick.
    pub fn tick(&mut self, host: &mut dyn Host) -> Phase {
        let mut journal = std::mem::take(&mut self.journal);
        let phase = self.step(host, &mut journal);
        self.journal = journal;
        phase
    }

    /// Tick `n` times (or until Terminated), yielding to the host between ticks.
    pub fn run_ticks(&mut self, host: &mut dyn Host, n: u64) -> Phase {
        for _ in 0..n {
            if self.is_terminated() {
                break;
            }
            self.tick(host);
            host.yield_frame();
        }
        self.phase
    }

    /// Thin driver loop. Returns the outcome, or `None` if `max_ticks` ran out.
    pub fn run_to_end(&mut self, host: &mut dyn Host, max_ticks: u64) -> Option<bool> {
        self.run_ticks(host, max_ticks);
        self.outcome
    }

    fn step(&mut self, host: &mut dyn Host, journal: &mut Journal) -> Phase {
        if self.phase == Phase::Terminated {
            return self.phase;
        }

        if let Some(child) = self.sub.as_mut() {
            if child.step(host, journal) == Phase::Terminated {
                let outcome = child.outcome.unwrap_or(false);
                self.fail_reason = child.fail_reason.clone();
                self.adopt_sub_outcome(host, journal, outcome);
            }
            return self.phase;
        }

        if matches!(self.phase, Phase::Start | Phase::Update) {
            let state = host.player_state();
            if !state.is_active() {
                let tick = host.clock().frame;
                log::info!("tick={tick} [{}] player {}, forcing failure", self.source, state.name());
                emit(journal, tick, self.source, &MissionEvent::ForcedFailure {
                    tick,
                    player: state.name().to_string(),
                });
                self.fail_reason = None;
                self.transition(host, journal, Phase::Failure);
                return self.phase;
            }
        }

        match self.phase {
            Phase::Start      => self.run_start(host, journal),
            Phase::Update     => self.run_update(host, journal),
            Phase::Success    => self.run_success(host, journal),
            Phase::Failure    => self.run_failure(host, journal),
            Phase::Cleanup    => self.run_cleanup(host, journal),
            Phase::Terminated => {}
        }
        self.phase
    }

    fn with_context<R>(
        &mut self,
        host: &mut dyn Host,
        journal: &mut Journal,
        f: impl FnOnce(&mut dyn Mission, &mut MissionContext<'_>) -> R,
    ) -> R {
        let MissionRunner { mission, cleanup, suspend, delegate, source, .. } = self;
        let mut ctx = MissionContext {
            host,
            journal,
            cleanup,
            suspend,
            delegate,
            source: *source,
        };
        f(mission.as_mut(), &mut ctx)
    }

    fn run_start(&mut self, host: &mut dyn Host, journal: &mut Journal) {
        let title = self.mission.settings().title.clone();
        host.register_mission_given(&title);
        self.saved_world = Some(host.world_toggles());
        host.set_ambient_events(AmbientEvents::NONE);

        self.delegate.open = true;
        let started = self.with_context(host, journal, |mission, ctx| mission.on_start(ctx));
        self.delegate.open = false;

        if let Err(err) = started {
            self.fail_on_error(host, journal, "on_start", err);
            return;
        }

        if self.mission.settings().flags.show_title {
            host.show_text(&TextMessage::key(title, TITLE_BANNER_MS), TextStyle::Banner);
        }

        if let Some(child) = self.delegate.request.take() {
            let tick = host.clock().frame;
            emit(journal, tick, self.source, &MissionEvent::SubMissionDelegated {
                tick,
                title: child.settings().title.clone(),
            });
            let mut runner = MissionRunner::from_boxed(journal.run_id().to_string(), child);
            runner.source = "sub_mission";
            self.sub = Some(Box::new(runner));
            return;
        }

        self.transition(host, journal, Phase::Update);
    }

    fn run_update(&mut self, host: &mut dyn Host, journal: &mut Journal) {
        let result = self.with_context(host, journal, |mission, ctx| mission.on_update(ctx));
        match result {
            Ok(Outcome::Continue) => {}
            Ok(Outcome::Complete) => self.transition(host, journal, Phase::Success),
            Ok(Outcome::Fail(reason)) => {
                self.fail_reason = Some(reason);
                self.transition(host, journal, Phase::Failure);
            }
            Err(err) => self.fail_on_error(host, journal, "on_update", err),
        }
    }

    fn run_success(&mut self, host: &mut dyn Host, journal: &mut Journal) {
        self.shared_cleanup(host, journal);
        self.with_context(host, journal, |mission, ctx| mission.on_success(ctx));

        let settings = self.mission.settings().clone();
        let reward = settings.reward;
        if reward.cash != 0 || reward.respect != 0 {
            host.add_reward(reward.cash, reward.respect);
        }
        if settings.flags.play_success_jingle {
            host.play_jingle();
        }
        if settings.flags.save_progress_on_success {
            host.request_progress_save(&settings.title);
        }
        host.show_text(&settings.success_message, TextStyle::Banner);

        let tick = host.clock().frame;
        emit(journal, tick, self.source, &MissionEvent::MissionPassed {
            tick,
            cash:    reward.cash,
            respect: reward.respect,
        });
        self.record_outcome(true);
        self.transition(host, journal, Phase::Cleanup);
    }

    fn run_failure(&mut self, host: &mut dyn Host, journal: &mut Journal) {
        self.shared_cleanup(host, journal);
        let reason = self.fail_reason.clone();
        self.with_context(host, journal, |mission, ctx| mission.on_failure(ctx, reason.as_ref()));

        if let Some(reason) = reason.as_ref() {
            host.show_text(&TextMessage::key(reason.key.clone(), reason.duration_ms), TextStyle::Small);
        }
        let failure_message = self.mission.settings().failure_message.clone();
        host.show_text(&failure_message, TextStyle::Banner);

        let tick = host.clock().frame;
        let reason_key = reason
            .map(|r| r.key)
            .unwrap_or_else(|| PLAYER_INACTIVE_REASON.to_string());
        log::info!("tick={tick} [{}] {} failed: {reason_key}", self.source, self.mission.settings().title);
        emit(journal, tick, self.source, &MissionEvent::MissionFailed { tick, reason_key });
        self.record_outcome(false);
        self.transition(host, journal, Phase::Cleanup);
    }

    fn run_cleanup(&mut self, host: &mut dyn Host, journal: &mut Journal) {
        if let Some(saved) = self.saved_world.take() {
            host.apply_world_toggles(&saved);
        }
        let removed = self.cleanup.release_all(host);
        log::debug!("[{}] cleanup removed {removed} entities", self.source);
        self.with_context(host, journal, |mission, ctx| mission.on_end(ctx));
        self.transition(host, journal, Phase::Terminated);
    }

    fn shared_cleanup(&mut self, host: &mut dyn Host, journal: &mut Journal) {
        host.clear_text();
        host.unload_mission_audio();
        self.with_context(host, journal, |mission, ctx| mission.on_cleanup(ctx));
    }

    fn adopt_sub_outcome(&mut self, host: &mut dyn Host, journal: &mut Journal, outcome: bool) {
        if let Some(saved) = self.saved_world.take() {
            host.apply_world_toggles(&saved);
        }
        self.cleanup.release_all(host);
        self.record_outcome(outcome);
        self.transition(host, journal, Phase::Terminated);
    }

    fn fail_on_error(&mut self, host: &mut dyn Host, journal: &mut Journal, hook: &str, err: MissionError) {
        let tick = host.clock().frame;
        log::error!("tick={tick} [{}] {hook} failed: {err}", self.source);
        emit(journal, tick, self.source, &MissionEvent::UpdateErrored {
            tick,
            message: err.to_string(),
        });
        self.fail_reason = Some(FailReason::new(UPDATE_ERROR_REASON, DEFAULT_REASON_MS));
        self.transition(host, journal, Phase::Failure);
    }

    fn record_outcome(&mut self, passed: bool) {
        if self.outcome.is_none() {
            self.outcome = Some(passed);
        }
    }

    fn transition(&mut self, host: &mut dyn Host, journal: &mut Journal, to: Phase) {
        let tick = host.clock().frame;
        let from = self.phase;
        log::info!(
            "tick={tick} [{}] {}: {} -> {}",
            self.source,
            self.mission.settings().title,
            from.name(),
            to.name()
        );
        emit(journal, tick, self.source, &MissionEvent::PhaseChanged {
            tick,
            from: from.name().to_string(),
            to:   to.name().to_string(),
        });
        if matches!(from, Phase::Start | Phase::Update) && to != Phase::Update && self.suspend.reclaim() {
            emit(journal, tick, self.source, &MissionEvent::SuspendReclaimed { tick });
        }
        self.phase = to;
    }
}
