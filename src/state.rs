//! Central runtime state — one struct owns everything.
//!
//! `RigState` holds the scene graph, hand tracking state, gesture
//! monitor, interaction coordinator, and feedback sinks, and runs the
//! per-tick pipeline: apply tracking samples, edge-detect transitions,
//! let the coordinator act on them, advance manipulation sessions, and
//! deliver feedback. Everything is synchronous inside the tick.

use tracing::info;

use crate::feedback::{FeedbackEvent, FeedbackSink};
use crate::hand::{Hand, HandFrame, TrackedHands};
use crate::interaction::{InteractionConfig, InteractionCoordinator};
use crate::monitor::{GestureMonitor, HandEvent};
use crate::scene::{NodeId, Pose, Scene};

/// Central interaction state, driven once per frame tick.
pub struct RigState {
    pub scene: Scene,
    pub hands: TrackedHands,
    pub monitor: GestureMonitor,
    pub coordinator: InteractionCoordinator,
    pub sinks: Vec<Box<dyn FeedbackSink>>,
    /// Scene anchors mirroring the tracked hand poses, left then right.
    hand_nodes: [NodeId; 2],
    pub tick_count: u64,
    pub running: bool,
}

impl RigState {
    pub fn new(config: InteractionConfig) -> Self {
        let mut scene = Scene::new();
        let left = scene.spawn(scene.root(), "left-hand");
        let right = scene.spawn(scene.root(), "right-hand");
        let coordinator = InteractionCoordinator::new(config, [left, right]);
        info!("rig initialized");
        Self {
            scene,
            hands: TrackedHands::new(),
            monitor: GestureMonitor::new(),
            coordinator,
            sinks: Vec::new(),
            hand_nodes: [left, right],
            tick_count: 0,
            running: true,
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn FeedbackSink>) {
        self.sinks.push(sink);
    }

    pub fn hand_node(&self, hand: Hand) -> NodeId {
        self.hand_nodes[hand.index()]
    }

    /// Spawn a grabbable object under `parent` (the scene root when
    /// `None`) at the given pose. `asset_ready: false` defers highlight
    /// effects until `notify_asset_ready` fires for the node.
    pub fn spawn_interactable(
        &mut self,
        parent: Option<NodeId>,
        label: &str,
        pose: Pose,
        asset_ready: bool,
    ) -> NodeId {
        let parent = parent.unwrap_or_else(|| self.scene.root());
        let id = if asset_ready {
            self.scene.spawn(parent, label)
        } else {
            self.scene.spawn_unloaded(parent, label)
        };
        self.scene.set_local_pose(id, pose);
        self.coordinator.register(id, label);
        id
    }

    /// One frame tick. Returns the feedback emitted this tick (also
    /// delivered to registered sinks).
    pub fn on_tick(&mut self, dt_ms: f64, left: HandFrame, right: HandFrame) -> Vec<FeedbackEvent> {
        self.tick_count += 1;

        // Tracking samples first; the hand anchors follow the tracked
        // pose so held objects move with the hand.
        self.hands.update(Hand::Left, &left);
        self.hands.update(Hand::Right, &right);
        for hand in Hand::BOTH {
            let state = self.hands.state(hand);
            if state.visible {
                self.scene.set_local_pose(
                    self.hand_nodes[hand.index()],
                    Pose::new(state.pose.position, state.pose.orientation),
                );
            }
        }

        // Edge-detect transitions, then let the coordinator act on each.
        let mut feedback = Vec::new();
        for event in self.monitor.on_tick(&self.hands) {
            match event {
                HandEvent::GripChanged { hand, gripping } => {
                    feedback.push(FeedbackEvent::GripChange { hand, gripping });
                }
                HandEvent::VisibilityChanged { hand, visible } => {
                    feedback.push(FeedbackEvent::VisibilityChange { hand, visible });
                }
                HandEvent::ReleaseRequested { .. } => {}
            }
            feedback.extend(
                self.coordinator
                    .handle_event(&mut self.scene, &self.hands, &event),
            );
        }

        // Advance open manipulation sessions.
        self.coordinator.on_tick(&mut self.scene, &self.hands);

        // Fire-and-forget delivery.
        for sink in &mut self.sinks {
            sink.on_tick(dt_ms);
            for event in &feedback {
                sink.on_event(event);
            }
        }
        feedback
    }

    /// Explicit proximity-grab request, outside the grip-edge path.
    pub fn request_grab(&mut self, hand: Hand) -> Vec<FeedbackEvent> {
        let events = self
            .coordinator
            .try_grab(&mut self.scene, &self.hands, hand);
        self.deliver(&events);
        events
    }

    /// Pointer/cursor moved onto an interactable.
    pub fn pointer_enter(&mut self, object: NodeId) -> Vec<FeedbackEvent> {
        let events = self.coordinator.pointer_enter(&mut self.scene, object);
        self.deliver(&events);
        events
    }

    /// Pointer/cursor left an interactable.
    pub fn pointer_leave(&mut self, object: NodeId) -> Vec<FeedbackEvent> {
        let events = self.coordinator.pointer_leave(&mut self.scene, object);
        self.deliver(&events);
        events
    }

    fn deliver(&mut self, events: &[FeedbackEvent]) {
        for sink in &mut self.sinks {
            for event in events {
                sink.on_event(event);
            }
        }
    }

    /// One-line status for periodic logging.
    pub fn status_line(&self) -> String {
        let describe = |hand: Hand| -> String {
            let state = self.hands.state(hand);
            if !state.visible {
                return "--".to_string();
            }
            match self.coordinator.held_object(hand) {
                Some(id) => format!("holding {}", self.scene.label(id).unwrap_or("?")),
                None => {
                    if state.gripping {
                        "fist".to_string()
                    } else {
                        "open".to_string()
                    }
                }
            }
        };
        format!(
            "tick {}: left {} | right {} | {} held",
            self.tick_count,
            describe(Hand::Left),
            describe(Hand::Right),
            self.coordinator.held_count(),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    /// Sink that records every event it sees.
    #[derive(Default)]
    struct RecordingSink(std::rc::Rc<std::cell::RefCell<Vec<FeedbackEvent>>>);

    impl FeedbackSink for RecordingSink {
        fn on_event(&mut self, event: &FeedbackEvent) {
            self.0.borrow_mut().push(event.clone());
        }
    }

    fn frame_at(x: f32, gripping: bool) -> HandFrame {
        HandFrame::tracked(Vec3::new(x, 1.0, 0.0), Quat::IDENTITY, gripping)
    }

    #[test]
    fn test_full_grab_release_cycle() {
        let mut rig = RigState::new(InteractionConfig::default());
        let amphora = rig.spawn_interactable(
            None,
            "Amphora",
            Pose::from_position(Vec3::new(1.0, 1.0, 0.0)),
            true,
        );

        // Hand appears at distance 1.0 and closes.
        rig.on_tick(16.0, frame_at(0.0, false), HandFrame::hidden());
        let events = rig.on_tick(16.0, frame_at(0.0, true), HandFrame::hidden());
        assert!(events
            .iter()
            .any(|e| matches!(e, FeedbackEvent::Grab { object, hand: Hand::Left, .. } if *object == amphora)));
        assert_eq!(rig.coordinator.held_object(Hand::Left), Some(amphora));
        assert_eq!(
            rig.coordinator.interactable(amphora).unwrap().original_parent,
            Some(rig.scene.root())
        );

        // Fist opens: released back to the root at the held world pose.
        let held_world = rig.scene.world_pose(amphora).unwrap();
        let events = rig.on_tick(16.0, frame_at(0.0, false), HandFrame::hidden());
        assert!(events
            .iter()
            .any(|e| matches!(e, FeedbackEvent::Release { object, hand: Hand::Left, .. } if *object == amphora)));
        assert_eq!(rig.coordinator.holder(amphora), None);
        assert_eq!(rig.scene.parent(amphora), Some(rig.scene.root()));
        let world = rig.scene.world_pose(amphora).unwrap();
        assert!(crate::scene::pose_approx(&held_world, &world));
    }

    #[test]
    fn test_tracking_loss_forces_release() {
        let mut rig = RigState::new(InteractionConfig::default());
        let amphora = rig.spawn_interactable(
            None,
            "Amphora",
            Pose::from_position(Vec3::new(0.5, 1.0, 0.0)),
            true,
        );
        rig.on_tick(16.0, frame_at(0.0, false), HandFrame::hidden());
        rig.on_tick(16.0, frame_at(0.0, true), HandFrame::hidden());
        assert_eq!(rig.coordinator.held_object(Hand::Left), Some(amphora));

        let events = rig.on_tick(16.0, HandFrame::hidden(), HandFrame::hidden());
        let releases = events
            .iter()
            .filter(|e| matches!(e, FeedbackEvent::Release { .. }))
            .count();
        assert_eq!(releases, 1, "exactly one release on tracking loss");
        assert_eq!(rig.coordinator.held_object(Hand::Left), None);
        assert!(rig.coordinator.invariants_hold());
    }

    #[test]
    fn test_held_object_follows_hand_and_rotates() {
        let mut rig = RigState::new(InteractionConfig::default());
        let amphora = rig.spawn_interactable(
            None,
            "Amphora",
            Pose::from_position(Vec3::new(0.5, 1.0, 0.0)),
            true,
        );
        rig.on_tick(16.0, frame_at(0.0, false), HandFrame::hidden());
        rig.on_tick(16.0, frame_at(0.0, true), HandFrame::hidden());

        // The hand translates and yaws; the held object follows and turns
        // by the amplified delta.
        let moved = HandFrame::tracked(
            Vec3::new(0.4, 1.2, -0.3),
            Quat::from_rotation_y(0.05),
            true,
        );
        rig.on_tick(16.0, moved, HandFrame::hidden());

        let world = rig.scene.world_pose(amphora).unwrap();
        let hand_world = rig.scene.world_pose(rig.hand_node(Hand::Left)).unwrap();
        assert!(
            world.position.distance(hand_world.position) < 0.5,
            "held object should ride near the hand"
        );
        let local_rot = rig.scene.local_pose(amphora).unwrap().rotation;
        let expected = Quat::from_rotation_y(0.05 * 6.0);
        assert!(local_rot.dot(expected).abs() > 1.0 - 1e-4);
    }

    #[test]
    fn test_events_reach_sinks() {
        let record = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut rig = RigState::new(InteractionConfig::default());
        rig.add_sink(Box::new(RecordingSink(record.clone())));
        let amphora = rig.spawn_interactable(
            None,
            "Amphora",
            Pose::from_position(Vec3::new(0.5, 1.0, 0.0)),
            true,
        );

        rig.on_tick(16.0, frame_at(0.0, false), HandFrame::hidden());
        rig.pointer_enter(amphora);
        rig.on_tick(16.0, frame_at(0.0, true), HandFrame::hidden());

        let seen = record.borrow();
        assert!(seen
            .iter()
            .any(|e| matches!(e, FeedbackEvent::VisibilityChange { visible: true, .. })));
        assert!(seen.iter().any(|e| matches!(e, FeedbackEvent::Hover { .. })));
        assert!(seen
            .iter()
            .any(|e| matches!(e, FeedbackEvent::GripChange { gripping: true, .. })));
        assert!(seen.iter().any(|e| matches!(e, FeedbackEvent::Grab { .. })));
    }

    #[test]
    fn test_request_grab_explicit_path() {
        let mut rig = RigState::new(InteractionConfig::default());
        let amphora = rig.spawn_interactable(
            None,
            "Amphora",
            Pose::from_position(Vec3::new(0.5, 1.0, 0.0)),
            true,
        );
        rig.on_tick(16.0, frame_at(0.0, false), HandFrame::hidden());

        let events = rig.request_grab(Hand::Left);
        assert_eq!(events.len(), 1);
        assert_eq!(rig.coordinator.held_object(Hand::Left), Some(amphora));
    }

    #[test]
    fn test_status_line() {
        let mut rig = RigState::new(InteractionConfig::default());
        rig.spawn_interactable(
            None,
            "Amphora",
            Pose::from_position(Vec3::new(0.5, 1.0, 0.0)),
            true,
        );
        rig.on_tick(16.0, frame_at(0.0, true), HandFrame::hidden());
        let line = rig.status_line();
        assert!(line.contains("left holding Amphora"), "got: {line}");
        assert!(line.contains("right --"));
        assert!(line.contains("1 held"));
    }
}
