//! Feedback events and the debug surfaces that render them.
//!
//! The interaction core emits a fixed union of `FeedbackEvent`s,
//! fire-and-forget, into any number of `FeedbackSink`s. Two sinks are
//! provided: a 2D overlay (status line, auto-fading transient message,
//! hover hint) and an in-scene VR debug panel (rolling history capped at a
//! few lines). Neither builds real UI; they produce the strings a
//! renderer would display.

use std::collections::VecDeque;

use tracing::debug;

use crate::hand::Hand;
use crate::scene::NodeId;

// ── Events ─────────────────────────────────────────────────

/// Everything the interaction core reports outward.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackEvent {
    /// Pointer moved onto an interactable.
    Hover { object: NodeId, name: String },
    /// Pointer left an interactable (suppressed while it is held).
    Unhover { object: NodeId },
    /// An object was grabbed.
    Grab {
        object: NodeId,
        name: String,
        hand: Hand,
    },
    /// An object was released (explicitly or by tracking loss).
    Release {
        object: NodeId,
        name: String,
        hand: Hand,
    },
    /// A hand's fist closed or opened.
    GripChange { hand: Hand, gripping: bool },
    /// A hand's tracking was found or lost.
    VisibilityChange { hand: Hand, visible: bool },
}

impl FeedbackEvent {
    /// One-line description for the debug surfaces. Hover/unhover have no
    /// line of their own; they drive the interaction hint instead.
    pub fn describe(&self) -> Option<String> {
        match self {
            Self::Grab { name, hand, .. } => {
                Some(format!("{} grabbed with {} hand", name, hand.as_str()))
            }
            Self::Release { name, hand, .. } => {
                Some(format!("{} released from {} hand", name, hand.as_str()))
            }
            Self::GripChange { hand, gripping } => Some(format!(
                "{} hand {}",
                hand.as_str(),
                if *gripping { "closed" } else { "opened" }
            )),
            Self::VisibilityChange { hand, visible } => Some(format!(
                "{} hand {}",
                hand.as_str(),
                if *visible { "detected" } else { "lost" }
            )),
            Self::Hover { .. } | Self::Unhover { .. } => None,
        }
    }
}

// ── Sink trait ─────────────────────────────────────────────

/// Consumer of feedback events. Delivery is synchronous and
/// fire-and-forget; sinks must not fail.
pub trait FeedbackSink {
    fn on_event(&mut self, event: &FeedbackEvent);

    /// Advance time-based behavior such as message fade.
    fn on_tick(&mut self, dt_ms: f64) {
        let _ = dt_ms;
    }
}

// ── Overlay sink ───────────────────────────────────────────

/// Configuration for the 2D overlay.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// How long a transient message stays up before fading.
    pub message_fade_ms: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            message_fade_ms: 2000.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct OverlayHand {
    visible: bool,
    holding: Option<String>,
}

/// 2D debug overlay: a persistent status block, a transient message that
/// fades after a moment, and a hover hint.
#[derive(Debug, Default)]
pub struct OverlayFeedback {
    pub config: OverlayConfig,
    left: OverlayHand,
    right: OverlayHand,
    message: Option<String>,
    message_remaining_ms: f64,
    hint: Option<String>,
}

impl OverlayFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    fn hand_mut(&mut self, hand: Hand) -> &mut OverlayHand {
        match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        }
    }

    fn show_message(&mut self, text: String) {
        debug!("overlay message: {}", text);
        self.message = Some(text);
        self.message_remaining_ms = self.config.message_fade_ms;
    }

    /// The persistent status block.
    pub fn status(&self) -> String {
        if !self.left.visible && !self.right.visible {
            return "Hand tracking: not detected".to_string();
        }
        let mut text = format!(
            "Hand tracking: active\nleft: {} | right: {}",
            if self.left.visible { "ok" } else { "--" },
            if self.right.visible { "ok" } else { "--" },
        );
        if let Some(name) = &self.left.holding {
            text.push_str(&format!("\nholding (left): {name}"));
        }
        if let Some(name) = &self.right.holding {
            text.push_str(&format!("\nholding (right): {name}"));
        }
        text
    }

    /// The transient message, if it has not faded yet.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The hover hint, if a hovered object is asking for one.
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }
}

impl FeedbackSink for OverlayFeedback {
    fn on_event(&mut self, event: &FeedbackEvent) {
        match event {
            FeedbackEvent::VisibilityChange { hand, visible } => {
                self.hand_mut(*hand).visible = *visible;
            }
            FeedbackEvent::Grab { name, hand, .. } => {
                self.hand_mut(*hand).holding = Some(name.clone());
                self.show_message(format!("{name} grabbed"));
            }
            FeedbackEvent::Release { name, hand, .. } => {
                self.hand_mut(*hand).holding = None;
                self.show_message(format!("{name} released"));
            }
            FeedbackEvent::GripChange { .. } => {
                if let Some(line) = event.describe() {
                    self.show_message(line);
                }
            }
            FeedbackEvent::Hover { name, .. } => {
                self.hint = Some(format!("{name}: close your hand to grab"));
            }
            FeedbackEvent::Unhover { .. } => {
                self.hint = None;
            }
        }
    }

    fn on_tick(&mut self, dt_ms: f64) {
        if self.message.is_some() {
            self.message_remaining_ms -= dt_ms;
            if self.message_remaining_ms <= 0.0 {
                self.message = None;
            }
        }
    }
}

// ── VR panel sink ──────────────────────────────────────────

/// Configuration for the in-scene debug panel.
#[derive(Debug, Clone)]
pub struct VrPanelConfig {
    /// Maximum history lines kept on the panel.
    pub max_lines: usize,
}

impl Default for VrPanelConfig {
    fn default() -> Self {
        Self { max_lines: 5 }
    }
}

/// In-scene VR debug panel: a short rolling history of event lines.
#[derive(Debug)]
pub struct VrPanelFeedback {
    pub config: VrPanelConfig,
    lines: VecDeque<String>,
}

impl VrPanelFeedback {
    pub fn new() -> Self {
        let mut lines = VecDeque::new();
        lines.push_back("waiting for events...".to_string());
        Self {
            config: VrPanelConfig::default(),
            lines,
        }
    }

    fn push(&mut self, line: String) {
        // The placeholder goes away once real traffic arrives.
        if self.lines.front().map(String::as_str) == Some("waiting for events...") {
            self.lines.pop_front();
        }
        while self.lines.len() >= self.config.max_lines {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// The panel text, newest line last.
    pub fn text(&self) -> String {
        let lines: Vec<&str> = self.lines.iter().map(String::as_str).collect();
        lines.join("\n")
    }
}

impl Default for VrPanelFeedback {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackSink for VrPanelFeedback {
    fn on_event(&mut self, event: &FeedbackEvent) {
        if let Some(line) = event.describe() {
            self.push(line);
        }
    }
}

// ── Display names ──────────────────────────────────────────

/// Derive a display name from a raw model id: capitalize the first letter
/// and put spaces back in front of interior capitals.
pub fn display_name(model_id: &str) -> String {
    let mut out = String::with_capacity(model_id.len() + 4);
    for (i, c) in model_id.chars().enumerate() {
        if i == 0 {
            out.extend(c.to_uppercase());
        } else {
            if c.is_uppercase() {
                out.push(' ');
            }
            out.push(c);
        }
    }
    out
}

// ── Tests ──────────────────────────────────────────────────
