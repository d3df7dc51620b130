//! Hand identity and tracked state.
//!
//! Stores the per-hand pose, visibility, and grip booleans fed in once per
//! tick. Grip classification (the fist-closure heuristic) happens upstream
//! in the tracking runtime; each `HandFrame` sample carries its boolean
//! verdict and this crate only edge-detects it.

use glam::{EulerRot, Quat, Vec3};

// ── Hand enum ──────────────────────────────────────────────

/// Which hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    /// Processing order for same-tick contention: left before right.
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Array index (0 = left, 1 = right).
    pub fn index(&self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    pub fn other(&self) -> Hand {
        match self {
            Self::Left => Hand::Right,
            Self::Right => Hand::Left,
        }
    }
}

// ── Pose ───────────────────────────────────────────────────

/// World-space hand pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for HandPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl HandPose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Rotation about the vertical axis, in radians.
    pub fn yaw(&self) -> f32 {
        self.orientation.to_euler(EulerRot::YXZ).0
    }
}

// ── Per-tick sample ────────────────────────────────────────

/// One hand's tracking sample for a single tick.
#[derive(Debug, Clone, Copy)]
pub struct HandFrame {
    pub visible: bool,
    pub pose: HandPose,
    /// External fist-heuristic verdict; meaningless while not visible.
    pub gripping: bool,
}

impl HandFrame {
    pub fn hidden() -> Self {
        Self {
            visible: false,
            pose: HandPose::default(),
            gripping: false,
        }
    }

    pub fn tracked(position: Vec3, orientation: Quat, gripping: bool) -> Self {
        Self {
            visible: true,
            pose: HandPose::new(position, orientation),
            gripping,
        }
    }
}

// ── Tracked state ──────────────────────────────────────────

/// Current state of one hand.
#[derive(Debug, Clone, Default)]
pub struct HandState {
    pub visible: bool,
    pub gripping: bool,
    pub pose: HandPose,
}

/// Both hands, updated once per tick from tracking samples.
#[derive(Debug, Default)]
pub struct TrackedHands {
    left: HandState,
    right: HandState,
}

impl TrackedHands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, hand: Hand) -> &HandState {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    fn state_mut(&mut self, hand: Hand) -> &mut HandState {
        match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        }
    }

    /// Apply one tick's sample. The pose is only trusted while the hand is
    /// visible (the last tracked pose is retained across a loss), and grip
    /// cannot survive tracking loss.
    pub fn update(&mut self, hand: Hand, frame: &HandFrame) {
        let state = self.state_mut(hand);
        state.visible = frame.visible;
        if frame.visible {
            state.pose = frame.pose;
            state.gripping = frame.gripping;
        } else {
            state.gripping = false;
        }
    }

    pub fn is_visible(&self, hand: Hand) -> bool {
        self.state(hand).visible
    }

    pub fn is_gripping(&self, hand: Hand) -> bool {
        self.state(hand).gripping
    }

    pub fn pose(&self, hand: Hand) -> HandPose {
        self.state(hand).pose
    }
}

// ── Tests ──────────────────────────────────────────────────
