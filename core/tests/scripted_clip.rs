//! Scripted clip tests: step order, skip unwinding and suspend-token accounting.

use mission_core::{
    config::MissionSettings,
    error::MissionResult,
    headless_host::HeadlessHost,
    host::{FadeDirection, FadeStatus, Host, PlayerState},
    mission::{Mission, MissionContext, MissionRunner, Outcome},
    scripted_clip::{ClipPlayback, ClipStatus, ScriptedClip, SuspendSlot},
};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

type Trace = Rc<RefCell<Vec<&'static str>>>;

fn traced_clip(trace: &Trace) -> ScriptedClip {
    let (a, b, c) = (trace.clone(), trace.clone(), trace.clone());
    ScriptedClip::new()
        .action(move |_| a.borrow_mut().push("a"))
        .wait(100)
        .action(move |_| b.borrow_mut().push("b"))
        .wait_until(|host| host.wanted_level() >= 2)
        .action(move |_| c.borrow_mut().push("c"))
}

/// Tick the clip until it is done or `max` ticks pass.
fn play_out(playback: &mut ClipPlayback, host: &mut HeadlessHost, slot: &mut SuspendSlot, max: u32) -> ClipStatus {
    for _ in 0..max {
        let status = playback.tick(host, slot);
        if status.is_done() {
            return status;
        }
        host.yield_frame();
    }
    playback.status()
}

#[test]
fn clip_runs_steps_in_order_and_returns_token_once() {
    let mut host = HeadlessHost::new(1);
    let mut slot = SuspendSlot::new();
    let trace: Trace = Rc::default();
    let mut playback = traced_clip(&trace).play(&mut slot);
    assert!(slot.is_lent());

    assert_eq!(play_out(&mut playback, &mut host, &mut slot, 50), ClipStatus::Running);
    assert_eq!(*trace.borrow(), vec!["a", "b"], "clip must hold at wait_until");
    assert_eq!(playback.current_step(), 3);

    host.set_wanted_level(2);
    assert_eq!(play_out(&mut playback, &mut host, &mut slot, 10), ClipStatus::Finished);
    assert_eq!(*trace.borrow(), vec!["a", "b", "c"]);

    assert!(!slot.is_lent());
    assert_eq!(slot.lends(), 1);
    assert_eq!(slot.restores(), 1);

    // Further ticks and an abort after the end change nothing.
    playback.tick(&mut host, &mut slot);
    playback.abort(&mut slot);
    assert_eq!(slot.restores(), 1);
}

#[test]
fn fixed_wait_holds_for_its_duration() {
    let mut host = HeadlessHost::new(1);
    let mut slot = SuspendSlot::new();
    let mut playback = ScriptedClip::new().wait(100).play(&mut slot);

    let started = host.clock().now();
    let status = play_out(&mut playback, &mut host, &mut slot, 20);
    assert_eq!(status, ClipStatus::Finished);
    assert!(
        host.clock().now() - started >= 100,
        "finished after only {}ms",
        host.clock().now() - started
    );
}

#[test]
fn skip_unwinds_without_running_later_steps() {
    let mut host = HeadlessHost::new(1);
    let mut slot = SuspendSlot::new();
    let trace: Trace = Rc::default();
    let mut playback = traced_clip(&trace).play(&mut slot);

    // Step 0 runs on the first tick; the next tick enters the 100ms wait.
    playback.tick(&mut host, &mut slot);
    host.yield_frame();
    playback.tick(&mut host, &mut slot);
    assert_eq!(playback.current_step(), 1);

    host.set_skip(true);
    host.yield_frame();
    assert_eq!(playback.tick(&mut host, &mut slot), ClipStatus::Skipped);
    assert_eq!(*trace.borrow(), vec!["a"]);
    assert_eq!(slot.restores(), 1);

    let events: Vec<String> = playback
        .drain_events()
        .iter()
        .map(|e| e.type_name().to_string())
        .collect();
    assert_eq!(events, ["clip_step_started", "clip_step_started", "clip_skipped"]);

    // Skipped stays skipped, and aborting afterwards restores nothing twice.
    host.set_skip(false);
    assert_eq!(playback.tick(&mut host, &mut slot), ClipStatus::Skipped);
    playback.abort(&mut slot);
    assert_eq!(slot.restores(), 1);
}

#[test]
fn abort_mid_clip_restores_token() {
    let mut host = HeadlessHost::new(1);
    let mut slot = SuspendSlot::new();
    let mut playback = ScriptedClip::new().wait(10_000).play(&mut slot);
    play_out(&mut playback, &mut host, &mut slot, 5);
    assert!(slot.is_lent());

    playback.abort(&mut slot);
    assert_eq!(playback.status(), ClipStatus::Skipped);
    assert!(!slot.is_lent());
    assert_eq!(slot.restores(), 1);
}

#[test]
fn suspend_calls_are_shadowed_while_a_clip_plays() {
    let mut host = HeadlessHost::new(1);
    let mut slot = SuspendSlot::new();
    let mut playback = ScriptedClip::new().wait(200).play(&mut slot);
    playback.tick(&mut host, &mut slot);

    assert!(slot.sleep(&host, 500).is_none());
    assert!(!slot.fade(&mut host, 500, FadeDirection::Out));
    assert_eq!(slot.shadowed_calls(), 2);
    assert_eq!(host.fade_status(), FadeStatus::Transparent, "shadowed fade must not reach the host");

    play_out(&mut playback, &mut host, &mut slot, 20);
    assert!(slot.sleep(&host, 500).is_some());
    assert!(slot.fade(&mut host, 500, FadeDirection::Out));
    assert_eq!(host.fade_status(), FadeStatus::Fading);
    assert_eq!(slot.shadowed_calls(), 2);
}

#[test]
fn second_clip_plays_without_the_token() {
    let mut host = HeadlessHost::new(1);
    let mut slot = SuspendSlot::new();
    let mut first = ScriptedClip::new().wait(200).play(&mut slot);

    let had_token = Rc::new(RefCell::new(None));
    let seen = had_token.clone();
    let mut second = ScriptedClip::new()
        .action(move |ctx| *seen.borrow_mut() = Some(ctx.suspend.is_some()))
        .play(&mut slot);

    assert_eq!(play_out(&mut second, &mut host, &mut slot, 10), ClipStatus::Finished);
    assert_eq!(*had_token.borrow(), Some(false));
    assert!(slot.is_lent(), "the first clip still holds the token");

    assert_eq!(play_out(&mut first, &mut host, &mut slot, 20), ClipStatus::Finished);
    assert_eq!(slot.lends(), 1);
    assert_eq!(slot.restores(), 1);
}

/// A mission that plays an intro clip and completes once it is over.
struct IntroMission {
    settings: MissionSettings,
    intro:    Option<ClipPlayback>,
    faded:    bool,
}

impl Mission for IntroMission {
    fn settings(&self) -> &MissionSettings {
        &self.settings
    }

    fn on_start(&mut self, ctx: &mut MissionContext<'_>) -> MissionResult<()> {
        let clip = ScriptedClip::new()
            .action(|ctx| {
                if let Some(suspend) = ctx.suspend {
                    suspend.fade(&mut *ctx.host, 100, FadeDirection::In);
                }
            })
            .wait(300);
        self.intro = Some(clip.play(ctx.suspend_slot()));
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut MissionContext<'_>) -> MissionResult<Outcome> {
        let Some(intro) = self.intro.as_mut() else {
            return Ok(Outcome::Complete);
        };
        if ctx.clock().now() > 0 && ctx.host.fade_status() == FadeStatus::Fading {
            self.faded = true;
        }
        Ok(match ctx.play_clip(intro) {
            ClipStatus::Running => Outcome::Continue,
            _ => Outcome::Complete,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn mission_clip_events_are_journaled() {
    let mut host = HeadlessHost::new(1);
    let mission = IntroMission {
        settings: MissionSettings::titled("INTRO"),
        intro:    None,
        faded:    false,
    };
    let mut runner = MissionRunner::new("clip-mission", mission);

    assert_eq!(runner.run_to_end(&mut host, 100), Some(true));
    assert_eq!(runner.journal().count_of("clip_step_started"), 2);
    assert_eq!(runner.journal().count_of("clip_finished"), 1);
    assert_eq!(runner.journal().count_of("clip_skipped"), 0);
    assert_eq!(runner.suspend_slot().restores(), 1);
    assert!(runner.mission_as::<IntroMission>().unwrap().faded);
}

/// Plays a long scene from Start and fades out in `on_end`.
struct LongSceneMission {
    settings: MissionSettings,
    scene:    Option<ClipPlayback>,
    end_fade: Option<bool>,
}

impl Mission for LongSceneMission {
    fn settings(&self) -> &MissionSettings {
        &self.settings
    }

    fn on_start(&mut self, ctx: &mut MissionContext<'_>) -> MissionResult<()> {
        self.scene = Some(ScriptedClip::new().wait(10_000).play(ctx.suspend_slot()));
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut MissionContext<'_>) -> MissionResult<Outcome> {
        if let Some(scene) = self.scene.as_mut() {
            ctx.play_clip(scene);
        }
        Ok(Outcome::Continue)
    }

    fn on_end(&mut self, ctx: &mut MissionContext<'_>) {
        self.end_fade = Some(ctx.fade(200, FadeDirection::Out));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A mission that dies mid-scene gets its suspend token back before the
/// failure hooks run, so fades in `on_end` are not shadowed.
#[test]
fn failing_mid_clip_returns_the_token_to_the_mission() {
    let mut host = HeadlessHost::new(1);
    let mission = LongSceneMission {
        settings: MissionSettings::titled("SCENE"),
        scene:    None,
        end_fade: None,
    };
    let mut runner = MissionRunner::new("mid-clip", mission);

    runner.run_ticks(&mut host, 5);
    assert!(runner.suspend_slot().is_lent(), "the scene should still hold the token");

    host.set_player_state(PlayerState::Dead);
    assert_eq!(runner.run_to_end(&mut host, 20), Some(false));

    let slot = runner.suspend_slot();
    assert!(!slot.is_lent(), "token still lent after the mission terminated");
    assert_eq!(slot.restores(), 1);
    assert_eq!(slot.shadowed_calls(), 0);
    assert_eq!(runner.journal().count_of("suspend_reclaimed"), 1);
    assert_eq!(runner.mission_as::<LongSceneMission>().unwrap().end_fade, Some(true));
}

/// Once reclaimed, the copy the clip still holds is stale: aborting the
/// clip afterwards does not count as a second restore.
#[test]
fn reclaimed_token_is_restored_only_once() {
    let mut slot = SuspendSlot::new();
    let mut playback = ScriptedClip::new().wait(1000).play(&mut slot);
    assert!(slot.is_lent());

    assert!(slot.reclaim());
    assert!(!slot.is_lent());
    assert!(!slot.reclaim(), "nothing left to reclaim");

    playback.abort(&mut slot);
    assert_eq!(slot.restores(), 1);
    assert_eq!(slot.lends(), 1);
}
