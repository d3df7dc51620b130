//! Object grab/release/manipulate state machine.
//!
//! Owns the interactable registry (who holds what, and where each object
//! came from), turns grip edges into nearest-object grabs and
//! pose-preserving releases, tracks hover with held-object suppression,
//! and integrates hand yaw deltas into held-object rotation once per
//! tick. All anomalies degrade to no-ops; nothing in here can fail the
//! interaction loop.

use std::collections::BTreeMap;
use std::f32::consts::{PI, TAU};

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::feedback::FeedbackEvent;
use crate::hand::{Hand, TrackedHands};
use crate::monitor::HandEvent;
use crate::scene::{NodeId, Scene};

// ── Config ─────────────────────────────────────────────────

/// Tunable interaction thresholds.
#[derive(Debug, Clone)]
pub struct InteractionConfig {
    /// Maximum hand-to-object distance for a grab (exclusive bound).
    pub grab_radius: f32,
    /// User-facing rotation speed multiplier.
    pub rotation_speed: f32,
    /// Fixed amplification applied on top of `rotation_speed`.
    pub rotation_gain: f32,
    /// Local position a held object snaps to under the hand.
    pub held_offset: Vec3,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            grab_radius: 1.5,
            rotation_speed: 2.0,
            rotation_gain: 3.0,
            held_offset: Vec3::new(0.0, 0.0, -0.2),
        }
    }
}

// ── Registry entry ─────────────────────────────────────────

/// Registry entry for one interactable object. The registry is the single
/// source of truth for the holding relation; reparenting in the scene is
/// only its rendered materialization.
#[derive(Debug, Clone)]
pub struct Interactable {
    pub label: String,
    pub held_by: Option<Hand>,
    /// Container to restore on release, recorded at grab time.
    pub original_parent: Option<NodeId>,
    pub hovered: bool,
}

impl Interactable {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            held_by: None,
            original_parent: None,
            hovered: false,
        }
    }
}

// ── Manipulation session ───────────────────────────────────

/// Per-grab record driving rotation updates from hand yaw deltas. The
/// baseline advances every tick, so each step only needs the delta since
/// the previous one.
#[derive(Debug, Clone)]
struct ManipulationSession {
    object: NodeId,
    last_hand_yaw: f32,
}

// ── Coordinator ────────────────────────────────────────────

/// The grab/release/manipulate state machine for both hands.
pub struct InteractionCoordinator {
    pub config: InteractionConfig,
    /// Ordered by id, which is spawn order: the deterministic enumeration
    /// order that breaks grab-distance ties.
    registry: BTreeMap<NodeId, Interactable>,
    /// Scene anchors the held objects get attached to, left then right.
    hand_nodes: [NodeId; 2],
    held: [Option<NodeId>; 2],
    sessions: [Option<ManipulationSession>; 2],
}

impl InteractionCoordinator {
    pub fn new(config: InteractionConfig, hand_nodes: [NodeId; 2]) -> Self {
        Self {
            config,
            registry: BTreeMap::new(),
            hand_nodes,
            held: [None, None],
            sessions: [None, None],
        }
    }

    /// Make a scene node grabbable.
    pub fn register(&mut self, object: NodeId, label: &str) {
        self.registry.insert(object, Interactable::new(label));
    }

    pub fn interactable(&self, object: NodeId) -> Option<&Interactable> {
        self.registry.get(&object)
    }

    pub fn held_object(&self, hand: Hand) -> Option<NodeId> {
        self.held[hand.index()]
    }

    pub fn holder(&self, object: NodeId) -> Option<Hand> {
        self.registry.get(&object).and_then(|e| e.held_by)
    }

    pub fn held_count(&self) -> usize {
        self.held.iter().flatten().count()
    }

    // ── Event entry point ──────────────────────────────────

    /// React to one monitor transition. Grip closing grabs, grip opening
    /// and release requests release; visibility edges carry no action of
    /// their own (the release request covers tracking loss).
    pub fn handle_event(
        &mut self,
        scene: &mut Scene,
        hands: &TrackedHands,
        event: &HandEvent,
    ) -> Vec<FeedbackEvent> {
        match *event {
            HandEvent::GripChanged {
                hand,
                gripping: true,
            } => self.try_grab(scene, hands, hand),
            HandEvent::GripChanged {
                hand,
                gripping: false,
            } => self.release(scene, hand),
            HandEvent::ReleaseRequested { hand } => self.release(scene, hand),
            HandEvent::VisibilityChanged { .. } => Vec::new(),
        }
    }

    // ── Grab ───────────────────────────────────────────────

    /// Grab the nearest eligible object within the grab radius. Objects
    /// held by the other hand are skipped; the radius is an exclusive
    /// bound and ties break to the earliest-registered candidate. With
    /// nothing in range this is silently a no-op.
    pub fn try_grab(
        &mut self,
        scene: &mut Scene,
        hands: &TrackedHands,
        hand: Hand,
    ) -> Vec<FeedbackEvent> {
        if self.held[hand.index()].is_some() {
            debug!("{} hand already holding, grab ignored", hand.as_str());
            return Vec::new();
        }
        let hand_pos = hands.pose(hand).position;

        let mut closest: Option<NodeId> = None;
        let mut closest_dist = self.config.grab_radius;
        for (&id, entry) in &self.registry {
            if entry.held_by == Some(hand.other()) {
                continue;
            }
            let Some(world) = scene.world_pose(id) else {
                continue;
            };
            let dist = hand_pos.distance(world.position);
            if dist < closest_dist {
                closest_dist = dist;
                closest = Some(id);
            }
        }

        match closest {
            Some(object) => self.grab(scene, hands, hand, object),
            None => {
                debug!(
                    "no grab target within {:.2} of {} hand",
                    self.config.grab_radius,
                    hand.as_str()
                );
                Vec::new()
            }
        }
    }

    fn grab(
        &mut self,
        scene: &mut Scene,
        hands: &TrackedHands,
        hand: Hand,
        object: NodeId,
    ) -> Vec<FeedbackEvent> {
        let original_parent = scene.parent(object);
        let name = match self.registry.get_mut(&object) {
            Some(entry) => {
                entry.held_by = Some(hand);
                entry.original_parent = original_parent;
                entry.label.clone()
            }
            None => return Vec::new(),
        };
        self.held[hand.index()] = Some(object);

        // Attached under the hand, the object tracks the hand pose for
        // free; its local position snaps to just in front of the palm.
        scene.reparent(object, self.hand_nodes[hand.index()]);
        scene.set_local_position(object, self.config.held_offset);
        scene.set_visual_emphasis(object, true);

        self.sessions[hand.index()] = Some(ManipulationSession {
            object,
            last_hand_yaw: hands.pose(hand).yaw(),
        });

        info!("{} grabbed with {} hand", name, hand.as_str());
        vec![FeedbackEvent::Grab { object, name, hand }]
    }

    // ── Release ────────────────────────────────────────────

    /// Release whatever the hand holds. The object goes back to its
    /// original container at its current world pose, so nothing jumps on
    /// screen. An empty hand is a no-op with no events.
    pub fn release(&mut self, scene: &mut Scene, hand: Hand) -> Vec<FeedbackEvent> {
        let idx = hand.index();
        let Some(object) = self.held[idx].take() else {
            return Vec::new();
        };
        self.sessions[idx] = None;

        let (name, original_parent) = match self.registry.get_mut(&object) {
            Some(entry) => {
                entry.held_by = None;
                entry.hovered = false;
                (entry.label.clone(), entry.original_parent.take())
            }
            None => ("object".to_string(), None),
        };

        let mut target = original_parent.unwrap_or_else(|| scene.root());
        if !scene.contains(target) {
            warn!("original parent of '{}' vanished, restoring to root", name);
            target = scene.root();
        }
        scene.reparent_keep_world(object, target);
        scene.set_visual_emphasis(object, false);

        info!("{} released from {} hand", name, hand.as_str());
        vec![FeedbackEvent::Release { object, name, hand }]
    }

    // ── Hover ──────────────────────────────────────────────

    /// Pointer moved onto an interactable.
    pub fn pointer_enter(&mut self, scene: &mut Scene, object: NodeId) -> Vec<FeedbackEvent> {
        let Some(entry) = self.registry.get_mut(&object) else {
            return Vec::new();
        };
        entry.hovered = true;
        let name = entry.label.clone();
        scene.set_visual_emphasis(object, true);
        vec![FeedbackEvent::Hover { object, name }]
    }

    /// Pointer left an interactable. Suppressed while the object is held:
    /// held objects keep their highlight regardless of pointer focus.
    pub fn pointer_leave(&mut self, scene: &mut Scene, object: NodeId) -> Vec<FeedbackEvent> {
        let Some(entry) = self.registry.get_mut(&object) else {
            return Vec::new();
        };
        if entry.held_by.is_some() {
            return Vec::new();
        }
        entry.hovered = false;
        scene.set_visual_emphasis(object, false);
        vec![FeedbackEvent::Unhover { object }]
    }

    // ── Per-tick manipulation ──────────────────────────────

    /// Advance open manipulation sessions: rotate each held object about
    /// the vertical axis by the holding hand's yaw delta since the last
    /// tick, amplified by the configured speed. A session whose pairing
    /// no longer matches the registry is dropped on the spot.
    pub fn on_tick(&mut self, scene: &mut Scene, hands: &TrackedHands) {
        for hand in Hand::BOTH {
            let idx = hand.index();
            let Some(object) = self.sessions[idx].as_ref().map(|s| s.object) else {
                continue;
            };
            let paired = self.held[idx] == Some(object)
                && self
                    .registry
                    .get(&object)
                    .map_or(false, |e| e.held_by == Some(hand));
            if !paired {
                debug!(
                    "stale manipulation session for {} hand dropped",
                    hand.as_str()
                );
                self.sessions[idx] = None;
                continue;
            }

            let yaw = hands.pose(hand).yaw();
            let mut delta = 0.0;
            if let Some(session) = self.sessions[idx].as_mut() {
                delta = wrap_angle(yaw - session.last_hand_yaw);
                session.last_hand_yaw = yaw;
            }
            if delta != 0.0 {
                scene.rotate_local_y(
                    object,
                    delta * self.config.rotation_speed * self.config.rotation_gain,
                );
            }
        }
    }

    // ── Invariants ─────────────────────────────────────────

    /// Both directions of the holding relation: an object's holder must
    /// hold exactly that object, and a hand's held object must name that
    /// hand.
    pub fn invariants_hold(&self) -> bool {
        for (&id, entry) in &self.registry {
            if let Some(hand) = entry.held_by {
                if self.held[hand.index()] != Some(id) {
                    return false;
                }
            }
        }
        for hand in Hand::BOTH {
            if let Some(id) = self.held[hand.index()] {
                if self
                    .registry
                    .get(&id)
                    .map_or(true, |e| e.held_by != Some(hand))
                {
                    return false;
                }
            }
        }
        true
    }
}

/// Wrap an angle into (-PI, PI].
fn wrap_angle(mut angle: f32) -> f32 {
    angle %= TAU;
    if angle > PI {
        angle -= TAU;
    } else if angle < -PI {
        angle += TAU;
    }
    angle
}

// ── Test helpers ───────────────────────────────────────────

#[cfg(test)]
struct TestRig {
    scene: Scene,
    hands: TrackedHands,
    coord: InteractionCoordinator,
}

#[cfg(test)]
impl TestRig {
    fn new() -> Self {
        let mut scene = Scene::new();
        let left = scene.spawn(scene.root(), "left-hand");
        let right = scene.spawn(scene.root(), "right-hand");
        Self {
            scene,
            hands: TrackedHands::new(),
            coord: InteractionCoordinator::new(InteractionConfig::default(), [left, right]),
        }
    }

    fn add_object(&mut self, label: &str, position: Vec3) -> NodeId {
        let id = self.scene.spawn(self.scene.root(), label);
        self.scene
            .set_local_pose(id, crate::scene::Pose::from_position(position));
        self.coord.register(id, label);
        id
    }

    fn place_hand(&mut self, hand: Hand, position: Vec3, yaw: f32) {
        let frame = crate::hand::HandFrame::tracked(
            position,
            glam::Quat::from_rotation_y(yaw),
            self.hands.is_gripping(hand),
        );
        self.hands.update(hand, &frame);
        let node = self.coord.hand_nodes[hand.index()];
        self.scene.set_local_pose(
            node,
            crate::scene::Pose::new(position, glam::Quat::from_rotation_y(yaw)),
        );
    }
}

// ── Tests ──────────────────────────────────────────────────
