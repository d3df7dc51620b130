//! Scene graph for interactable objects and hand anchors.
//!
//! Parent/child node store with local poses, world-pose composition, and
//! reparenting that preserves world pose. Visual emphasis (the highlight a
//! renderer applies to hovered/held objects) is tracked here and deferred
//! until the node's underlying asset is ready. No rendering happens in
//! this module; a renderer consumes the poses and emphasis flags.

use std::collections::HashMap;

use glam::{Quat, Vec3};
use tracing::{debug, warn};

// ── Node identity ──────────────────────────────────────────

/// Identifier for a scene node. Allocated per-scene, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

// ── Pose ───────────────────────────────────────────────────

/// Position + orientation pair, in the parent's frame for local poses and
/// in the global frame for world poses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Compose a child's local pose under this pose.
    pub fn transform(&self, local: &Pose) -> Pose {
        Pose {
            position: self.position + self.rotation * local.position,
            rotation: self.rotation * local.rotation,
        }
    }

    /// Express a world pose relative to this pose.
    pub fn to_local(&self, world: &Pose) -> Pose {
        let inv = self.rotation.inverse();
        Pose {
            position: inv * (world.position - self.position),
            rotation: inv * world.rotation,
        }
    }
}

// ── Node ───────────────────────────────────────────────────

#[derive(Debug)]
struct Node {
    label: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Pose,
    /// Whether the node's underlying asset has finished loading.
    asset_ready: bool,
    /// Current highlight state, as a renderer would show it.
    emphasized: bool,
    /// Emphasis requested before the asset was ready; applied on readiness.
    pending_emphasis: Option<bool>,
}

impl Node {
    fn new(label: &str, parent: Option<NodeId>, asset_ready: bool) -> Self {
        Self {
            label: label.to_string(),
            parent,
            children: Vec::new(),
            local: Pose::IDENTITY,
            asset_ready,
            emphasized: false,
            pending_emphasis: None,
        }
    }
}

// ── Scene ──────────────────────────────────────────────────

/// Node store with a fixed root. Ids are allocated from a per-scene
/// counter so independent test scenes never collide.
pub struct Scene {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::new("root", None, true));
        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Create a node under `parent` with its asset already loaded.
    pub fn spawn(&mut self, parent: NodeId, label: &str) -> NodeId {
        self.spawn_inner(parent, label, true)
    }

    /// Create a node whose asset is still loading; emphasis requests are
    /// held back until `notify_asset_ready`.
    pub fn spawn_unloaded(&mut self, parent: NodeId, label: &str) -> NodeId {
        self.spawn_inner(parent, label, false)
    }

    fn spawn_inner(&mut self, parent: NodeId, label: &str, asset_ready: bool) -> NodeId {
        let parent = if self.nodes.contains_key(&parent) {
            parent
        } else {
            warn!("spawn under unknown node {:?}, using root", parent);
            self.root
        };
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(label, Some(parent), asset_ready));
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        id
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.label.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    // ── Poses ──────────────────────────────────────────────

    pub fn local_pose(&self, id: NodeId) -> Option<Pose> {
        self.nodes.get(&id).map(|n| n.local)
    }

    pub fn set_local_pose(&mut self, id: NodeId, pose: Pose) {
        match self.nodes.get_mut(&id) {
            Some(node) => node.local = pose,
            None => warn!("set_local_pose on unknown node {:?}", id),
        }
    }

    pub fn set_local_position(&mut self, id: NodeId, position: Vec3) {
        match self.nodes.get_mut(&id) {
            Some(node) => node.local.position = position,
            None => warn!("set_local_position on unknown node {:?}", id),
        }
    }

    /// Rotate a node about its parent's vertical axis by `radians`.
    pub fn rotate_local_y(&mut self, id: NodeId, radians: f32) {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.local.rotation = Quat::from_rotation_y(radians) * node.local.rotation;
            }
            None => warn!("rotate_local_y on unknown node {:?}", id),
        }
    }

    /// World pose composed from the ancestor chain.
    pub fn world_pose(&self, id: NodeId) -> Option<Pose> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(node_id) = cursor {
            let node = self.nodes.get(&node_id)?;
            chain.push(node.local);
            cursor = node.parent;
        }
        let mut world = Pose::IDENTITY;
        for local in chain.iter().rev() {
            world = world.transform(local);
        }
        Some(world)
    }

    // ── Reparenting ────────────────────────────────────────

    /// Move `id` under `new_parent`, keeping its local pose as-is.
    /// Rejected (with a warning) for the root, unknown nodes, or moves
    /// that would create a cycle.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> bool {
        if id == self.root {
            warn!("cannot reparent the scene root");
            return false;
        }
        if !self.nodes.contains_key(&id) || !self.nodes.contains_key(&new_parent) {
            warn!("reparent with unknown node ({:?} -> {:?})", id, new_parent);
            return false;
        }
        if self.is_ancestor(id, new_parent) {
            warn!(
                "reparent of {:?} under its own descendant {:?} rejected",
                id, new_parent
            );
            return false;
        }
        let old_parent = self.nodes[&id].parent;
        if let Some(old) = old_parent {
            if let Some(node) = self.nodes.get_mut(&old) {
                node.children.retain(|&c| c != id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&new_parent) {
            node.children.push(id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(new_parent);
        }
        true
    }

    /// Move `id` under `new_parent` while preserving its world pose: the
    /// world pose is captured before the move and re-expressed as a local
    /// pose under the new parent afterwards.
    pub fn reparent_keep_world(&mut self, id: NodeId, new_parent: NodeId) -> bool {
        let Some(world) = self.world_pose(id) else {
            warn!("reparent_keep_world on unknown node {:?}", id);
            return false;
        };
        let Some(parent_world) = self.world_pose(new_parent) else {
            warn!("reparent_keep_world to unknown parent {:?}", new_parent);
            return false;
        };
        if !self.reparent(id, new_parent) {
            return false;
        }
        self.set_local_pose(id, parent_world.to_local(&world));
        true
    }

    /// True if `ancestor` is `node` or appears on `node`'s parent chain.
    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    // ── Visual emphasis ────────────────────────────────────

    /// Request the highlight effect on or off. If the node's asset has not
    /// finished loading the request is held and applied on readiness;
    /// logical interaction state never waits on this.
    pub fn set_visual_emphasis(&mut self, id: NodeId, on: bool) {
        let Some(node) = self.nodes.get_mut(&id) else {
            warn!("set_visual_emphasis on unknown node {:?}", id);
            return;
        };
        if node.asset_ready {
            node.emphasized = on;
        } else {
            debug!("emphasis for '{}' deferred until asset ready", node.label);
            node.pending_emphasis = Some(on);
        }
    }

    /// Mark a node's asset as loaded and apply any deferred emphasis.
    pub fn notify_asset_ready(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            warn!("notify_asset_ready on unknown node {:?}", id);
            return;
        };
        node.asset_ready = true;
        if let Some(on) = node.pending_emphasis.take() {
            debug!("applying deferred emphasis to '{}'", node.label);
            node.emphasized = on;
        }
    }

    pub fn is_emphasized(&self, id: NodeId) -> bool {
        self.nodes.get(&id).map(|n| n.emphasized).unwrap_or(false)
    }

    pub fn is_asset_ready(&self, id: NodeId) -> bool {
        self.nodes.get(&id).map(|n| n.asset_ready).unwrap_or(false)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

// ── Test helpers ───────────────────────────────────────────

/// Approximate pose equality; quaternions compare up to sign.
#[cfg(test)]
pub fn pose_approx(a: &Pose, b: &Pose) -> bool {
    a.position.distance(b.position) < 1e-4 && a.rotation.dot(b.rotation).abs() > 1.0 - 1e-4
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_new_scene_has_root() {
        let scene = Scene::new();
        assert_eq!(scene.len(), 1);
        assert!(scene.contains(scene.root()));
        assert_eq!(scene.parent(scene.root()), None);
    }

    #[test]
    fn test_spawn_and_labels() {
        let mut scene = Scene::new();
        let a = scene.spawn(scene.root(), "amphora");
        let b = scene.spawn(a, "handle");
        assert_eq!(scene.label(a), Some("amphora"));
        assert_eq!(scene.parent(b), Some(a));
        assert_eq!(scene.len(), 3);
    }

    #[test]
    fn test_world_pose_composition() {
        let mut scene = Scene::new();
        let parent = scene.spawn(scene.root(), "parent");
        let child = scene.spawn(parent, "child");
        scene.set_local_pose(
            parent,
            Pose::new(Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_y(FRAC_PI_2)),
        );
        scene.set_local_pose(child, Pose::from_position(Vec3::new(0.0, 0.0, -1.0)));

        // A +90° yaw turns the child's -Z offset into -X, cancelling the
        // parent's +X translation.
        let world = scene.world_pose(child).unwrap();
        assert!(
            world.position.distance(Vec3::ZERO) < 1e-5,
            "unexpected world position {:?}",
            world.position
        );
    }

    #[test]
    fn test_reparent_keep_world_is_pose_preserving() {
        let mut scene = Scene::new();
        let shelf = scene.spawn(scene.root(), "shelf");
        let hand = scene.spawn(scene.root(), "hand");
        let cup = scene.spawn(shelf, "cup");
        scene.set_local_pose(
            shelf,
            Pose::new(Vec3::new(0.5, 1.0, -0.5), Quat::from_rotation_y(0.7)),
        );
        scene.set_local_pose(
            hand,
            Pose::new(Vec3::new(-0.2, 1.4, 0.1), Quat::from_rotation_y(-1.3)),
        );
        scene.set_local_pose(
            cup,
            Pose::new(Vec3::new(0.1, 0.2, 0.3), Quat::from_rotation_y(0.2)),
        );

        let before = scene.world_pose(cup).unwrap();
        assert!(scene.reparent_keep_world(cup, hand));
        let after = scene.world_pose(cup).unwrap();
        assert!(
            pose_approx(&before, &after),
            "world pose jumped: {:?} -> {:?}",
            before,
            after
        );
        assert_eq!(scene.parent(cup), Some(hand));

        // And back again.
        assert!(scene.reparent_keep_world(cup, shelf));
        let restored = scene.world_pose(cup).unwrap();
        assert!(pose_approx(&before, &restored));
    }

    #[test]
    fn test_reparent_rejects_cycles_and_root() {
        let mut scene = Scene::new();
        let a = scene.spawn(scene.root(), "a");
        let b = scene.spawn(a, "b");
        assert!(!scene.reparent(a, b), "cycle must be rejected");
        assert!(!scene.reparent(a, a), "self-parent must be rejected");
        assert!(!scene.reparent(scene.root(), a), "root must stay fixed");
        assert_eq!(scene.parent(b), Some(a));
    }

    #[test]
    fn test_rotate_local_y() {
        let mut scene = Scene::new();
        let a = scene.spawn(scene.root(), "a");
        scene.rotate_local_y(a, FRAC_PI_2);
        scene.rotate_local_y(a, FRAC_PI_2);
        let rot = scene.local_pose(a).unwrap().rotation;
        let expected = Quat::from_rotation_y(std::f32::consts::PI);
        assert!(rot.dot(expected).abs() > 1.0 - 1e-4, "got {:?}", rot);
    }

    #[test]
    fn test_emphasis_applied_when_asset_ready() {
        let mut scene = Scene::new();
        let a = scene.spawn(scene.root(), "a");
        scene.set_visual_emphasis(a, true);
        assert!(scene.is_emphasized(a));
        scene.set_visual_emphasis(a, false);
        assert!(!scene.is_emphasized(a));
    }

    #[test]
    fn test_emphasis_deferred_until_asset_ready() {
        let mut scene = Scene::new();
        let a = scene.spawn_unloaded(scene.root(), "a");
        scene.set_visual_emphasis(a, true);
        assert!(!scene.is_emphasized(a), "must not apply before asset load");

        scene.notify_asset_ready(a);
        assert!(scene.is_emphasized(a), "deferred emphasis must apply");
        assert!(scene.is_asset_ready(a));
    }

    #[test]
    fn test_deferred_emphasis_keeps_latest_request() {
        let mut scene = Scene::new();
        let a = scene.spawn_unloaded(scene.root(), "a");
        scene.set_visual_emphasis(a, true);
        scene.set_visual_emphasis(a, false);
        scene.notify_asset_ready(a);
        assert!(!scene.is_emphasized(a), "latest request wins");
    }

    #[test]
    fn test_unknown_node_queries_are_noops() {
        let mut scene = Scene::new();
        let ghost = NodeId(999);
        assert!(scene.world_pose(ghost).is_none());
        assert!(!scene.reparent_keep_world(ghost, scene.root()));
        scene.set_visual_emphasis(ghost, true);
        assert!(!scene.is_emphasized(ghost));
    }
}
