//! Headless harness — scripted hand choreography driving the tick loop.
//!
//! Stands in for a live tracking runtime: each scenario replays a fixed
//! hand choreography (approach, fist, rotate, open) against a small demo
//! scene, looping until a tick budget, exit timer, or signal stops it.
//! Runs on a calloop timer, with graceful SIGTERM/SIGINT handling and
//! periodic status logging.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use calloop::timer::{TimeoutAction, Timer};
use calloop::EventLoop;
use glam::{Quat, Vec3};
use tracing::info;

use crate::feedback::{display_name, FeedbackEvent, FeedbackSink, OverlayFeedback, VrPanelFeedback};
use crate::hand::HandFrame;
use crate::interaction::InteractionConfig;
use crate::scene::{NodeId, Pose};
use crate::state::RigState;

/// Global flag set by SIGTERM/SIGINT handlers.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Status log cadence, in ticks (~2 s at the default tick period).
const STATUS_LOG_EVERY: u64 = 125;

// ── Scenarios ──────────────────────────────────────────────

/// Available choreographies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Both hands grab, rotate, and release their nearest exhibit.
    Showcase,
    /// The left hand loses tracking mid-hold, forcing a release.
    TrackingLoss,
    /// Both fists close on the same object in the same tick.
    Contention,
}

impl Scenario {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "showcase" => Some(Self::Showcase),
            "tracking-loss" => Some(Self::TrackingLoss),
            "contention" => Some(Self::Contention),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Showcase => "showcase",
            Self::TrackingLoss => "tracking-loss",
            Self::Contention => "contention",
        }
    }

    /// Choreography length; the script loops past this point.
    fn cycle_ms(&self) -> f64 {
        match self {
            Self::Showcase => 8000.0,
            Self::TrackingLoss | Self::Contention => 6000.0,
        }
    }

    /// Hand samples at a point in the cycle.
    fn frames(&self, t: f64) -> (HandFrame, HandFrame) {
        match self {
            Self::Showcase => (
                HandScript {
                    appear: 500.0,
                    vanish: 7000.0,
                    start: Vec3::new(0.0, 1.1, 0.6),
                    rest: Vec3::new(0.1, 1.0, 0.0),
                    grip_from: 2000.0,
                    grip_to: 5000.0,
                    yaw_span: 1.2,
                }
                .sample(t),
                HandScript {
                    appear: 1000.0,
                    vanish: 7000.0,
                    start: Vec3::new(-0.3, 1.2, 0.3),
                    rest: Vec3::new(-0.6, 1.0, -0.2),
                    grip_from: 2500.0,
                    grip_to: 4500.0,
                    yaw_span: -0.8,
                }
                .sample(t),
            ),
            Self::TrackingLoss => {
                let mut left = HandScript {
                    appear: 500.0,
                    vanish: 6000.0,
                    start: Vec3::new(0.2, 1.1, 0.3),
                    rest: Vec3::new(0.2, 1.0, 0.0),
                    grip_from: 1500.0,
                    grip_to: 4500.0,
                    yaw_span: 0.9,
                }
                .sample(t);
                // Tracking drops mid-hold and comes back a second later.
                if (3500.0..4500.0).contains(&t) {
                    left = HandFrame::hidden();
                }
                (left, HandFrame::hidden())
            }
            Self::Contention => (
                HandScript {
                    appear: 500.0,
                    vanish: 5000.0,
                    start: Vec3::new(-0.25, 1.0, -0.5),
                    rest: Vec3::new(-0.25, 1.0, -0.5),
                    grip_from: 1500.0,
                    grip_to: 4000.0,
                    yaw_span: 0.6,
                }
                .sample(t),
                HandScript {
                    appear: 500.0,
                    vanish: 5000.0,
                    start: Vec3::new(0.2, 1.0, -0.5),
                    rest: Vec3::new(0.2, 1.0, -0.5),
                    grip_from: 1500.0,
                    grip_to: 4000.0,
                    yaw_span: -0.6,
                }
                .sample(t),
            ),
        }
    }
}

/// Scripted motion for one hand: hidden outside [appear, vanish),
/// approaching from `start` to `rest` until the grip window opens, then
/// fisted with a yaw ramp spanning `yaw_span` over the grip window.
struct HandScript {
    appear: f64,
    vanish: f64,
    start: Vec3,
    rest: Vec3,
    grip_from: f64,
    grip_to: f64,
    yaw_span: f32,
}

impl HandScript {
    fn sample(&self, t: f64) -> HandFrame {
        if !(self.appear..self.vanish).contains(&t) {
            return HandFrame::hidden();
        }
        let approach =
            ((t - self.appear) / (self.grip_from - self.appear)).clamp(0.0, 1.0) as f32;
        let position = self.start.lerp(self.rest, approach);
        let gripping = (self.grip_from..self.grip_to).contains(&t);
        let yaw = if gripping {
            ((t - self.grip_from) / (self.grip_to - self.grip_from)) as f32 * self.yaw_span
        } else {
            0.0
        };
        HandFrame::tracked(position, Quat::from_rotation_y(yaw), gripping)
    }
}

// ── Config ─────────────────────────────────────────────────

/// Harness run configuration.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub scenario: Scenario,
    /// Tick period in milliseconds.
    pub tick_ms: u64,
    /// Stop after this many ticks (`None` = run until interrupted).
    pub max_ticks: Option<u64>,
    /// Stop after this many seconds of wall time.
    pub exit_after_s: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::Showcase,
            tick_ms: 16,
            max_ticks: None,
            exit_after_s: None,
        }
    }
}

// ── Signal handling ────────────────────────────────────────

fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGINT, signal_handler as libc::sighandler_t);
    }
}

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

// ── Sim state ──────────────────────────────────────────────

/// Everything the tick timer drives: the rig plus the demo feedback
/// surfaces and the scripted one-shot cues.
struct SimState {
    rig: RigState,
    overlay: OverlayFeedback,
    panel: VrPanelFeedback,
    scenario: Scenario,
    tick_ms: f64,
    max_ticks: Option<u64>,
    amphora: NodeId,
    lantern: Option<NodeId>,
    lantern_ready_fired: bool,
}

impl SimState {
    fn new(config: &HarnessConfig) -> Self {
        let mut rig = RigState::new(InteractionConfig::default());
        let (amphora, lantern) = match config.scenario {
            Scenario::Showcase => {
                let amphora = rig.spawn_interactable(
                    None,
                    &display_name("amphora"),
                    Pose::from_position(Vec3::new(0.6, 1.0, -0.4)),
                    true,
                );
                // The lantern's model is still loading when the scenario
                // first reaches for it; readiness is cued mid-run.
                let lantern = rig.spawn_interactable(
                    None,
                    &display_name("oldLantern"),
                    Pose::from_position(Vec3::new(-0.8, 1.0, -0.6)),
                    false,
                );
                // Out of grab range; nobody should ever pick this up.
                rig.spawn_interactable(
                    None,
                    &display_name("statue"),
                    Pose::from_position(Vec3::new(0.0, 1.0, -3.0)),
                    true,
                );
                (amphora, Some(lantern))
            }
            Scenario::TrackingLoss => {
                let amphora = rig.spawn_interactable(
                    None,
                    &display_name("amphora"),
                    Pose::from_position(Vec3::new(0.6, 1.0, -0.4)),
                    true,
                );
                (amphora, None)
            }
            Scenario::Contention => {
                let amphora = rig.spawn_interactable(
                    None,
                    &display_name("amphora"),
                    Pose::from_position(Vec3::new(0.0, 1.0, -0.5)),
                    true,
                );
                let lantern = rig.spawn_interactable(
                    None,
                    &display_name("oldLantern"),
                    Pose::from_position(Vec3::new(0.5, 1.0, -0.9)),
                    true,
                );
                (amphora, Some(lantern))
            }
        };
        Self {
            rig,
            overlay: OverlayFeedback::new(),
            panel: VrPanelFeedback::new(),
            scenario: config.scenario,
            tick_ms: config.tick_ms as f64,
            max_ticks: config.max_ticks,
            amphora,
            lantern,
            lantern_ready_fired: false,
        }
    }

    fn forward(&mut self, events: &[FeedbackEvent]) {
        for event in events {
            self.overlay.on_event(event);
            self.panel.on_event(event);
        }
    }

    fn step(&mut self) {
        let t = self.rig.tick_count as f64 * self.tick_ms;
        let cycle = self.scenario.cycle_ms();
        let cycle_t = t % cycle;
        let prev_cycle_t = if self.rig.tick_count == 0 {
            -1.0
        } else {
            (t - self.tick_ms) % cycle
        };

        let (left, right) = self.scenario.frames(cycle_t);
        let events = self.rig.on_tick(self.tick_ms, left, right);
        self.overlay.on_tick(self.tick_ms);
        self.forward(&events);

        self.run_cues(prev_cycle_t, cycle_t);

        if self.rig.tick_count % STATUS_LOG_EVERY == 0 {
            info!("{}", self.rig.status_line());
        }
        if let Some(max) = self.max_ticks {
            if self.rig.tick_count >= max {
                info!("tick budget of {} reached", max);
                self.rig.running = false;
            }
        }
    }

    /// Scripted one-shot cues: pointer hover over the amphora early in
    /// the showcase cycle, and the lantern's asset-ready notification.
    fn run_cues(&mut self, prev: f64, now: f64) {
        if self.scenario == Scenario::Showcase {
            if crossed(prev, now, 800.0) {
                let events = self.rig.pointer_enter(self.amphora);
                self.forward(&events);
            }
            if crossed(prev, now, 1900.0) {
                let events = self.rig.pointer_leave(self.amphora);
                self.forward(&events);
            }
            if !self.lantern_ready_fired && crossed(prev, now, 3000.0) {
                if let Some(lantern) = self.lantern {
                    info!("lantern asset finished loading");
                    self.rig.scene.notify_asset_ready(lantern);
                    self.lantern_ready_fired = true;
                }
            }
        }
    }
}

/// Whether the scripted time `at` was passed between two cycle
/// timestamps, including across the loop seam.
fn crossed(prev: f64, now: f64, at: f64) -> bool {
    if now >= prev {
        prev < at && at <= now
    } else {
        at > prev || at <= now
    }
}

// ── Run loop ───────────────────────────────────────────────

/// Run a scenario to completion.
pub fn run(config: HarnessConfig) -> anyhow::Result<()> {
    install_signal_handlers();

    let mut sim = SimState::new(&config);
    let mut event_loop: EventLoop<SimState> = EventLoop::try_new()?;
    let period = Duration::from_millis(config.tick_ms.max(1));

    let timer = Timer::from_duration(period);
    event_loop
        .handle()
        .insert_source(timer, move |_deadline, _, sim: &mut SimState| {
            sim.step();
            if sim.rig.running {
                TimeoutAction::ToDuration(period)
            } else {
                TimeoutAction::Drop
            }
        })
        .map_err(|e| anyhow::anyhow!("failed to arm tick timer: {e}"))?;

    let start = Instant::now();
    info!(
        "running scenario '{}' at {}ms ticks",
        config.scenario.as_str(),
        config.tick_ms
    );

    while sim.rig.running {
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            info!("shutdown signal received, exiting");
            break;
        }
        if let Some(secs) = config.exit_after_s {
            if start.elapsed() >= Duration::from_secs(secs) {
                info!("exit timer fired after {}s", secs);
                break;
            }
        }
        event_loop.dispatch(Some(period), &mut sim)?;
    }

    info!("overlay status at shutdown:\n{}", sim.overlay.status());
    info!("vr panel at shutdown:\n{}", sim.panel.text());
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────
