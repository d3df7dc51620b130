//! Gesture monitor — per-tick edge detection over hand tracking state.
//!
//! Compares each hand's visibility and grip booleans against the previous
//! tick and emits discrete transition events. Grip is only evaluated while
//! the hand is visible; a tracking loss resets grip silently and requests
//! a release so no object can stay attached to an untracked hand. The
//! monitor never touches the object registry.

use tracing::debug;

use crate::hand::{Hand, TrackedHands};

// ── Events ─────────────────────────────────────────────────

/// Transition events emitted by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandEvent {
    /// Hand tracking was found or lost.
    VisibilityChanged { hand: Hand, visible: bool },
    /// The fist closed (`true`) or opened (`false`) while tracked.
    GripChanged { hand: Hand, gripping: bool },
    /// Emitted on every tracking loss; releasing an empty hand is a no-op
    /// downstream, so this needs no holding check here.
    ReleaseRequested { hand: Hand },
}

// ── Monitor ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct PrevHand {
    visible: bool,
    gripping: bool,
}

/// Edge detector over both hands' visibility and grip state.
#[derive(Debug, Default)]
pub struct GestureMonitor {
    prev: [PrevHand; 2],
}

impl GestureMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect both hands once and return any transitions, left hand
    /// first. Visibility edges precede grip edges for the same hand.
    pub fn on_tick(&mut self, hands: &TrackedHands) -> Vec<HandEvent> {
        let mut events = Vec::new();
        for hand in Hand::BOTH {
            let current = hands.state(hand);
            let prev = &mut self.prev[hand.index()];

            if current.visible != prev.visible {
                debug!(
                    "{} hand {}",
                    hand.as_str(),
                    if current.visible { "detected" } else { "lost" }
                );
                events.push(HandEvent::VisibilityChanged {
                    hand,
                    visible: current.visible,
                });
                prev.visible = current.visible;
                if !current.visible {
                    events.push(HandEvent::ReleaseRequested { hand });
                    // Grip resets without an edge event; the release
                    // request already covers any held object.
                    prev.gripping = false;
                    continue;
                }
            }

            if current.visible && current.gripping != prev.gripping {
                debug!(
                    "{} hand fist {}",
                    hand.as_str(),
                    if current.gripping { "closed" } else { "opened" }
                );
                events.push(HandEvent::GripChanged {
                    hand,
                    gripping: current.gripping,
                });
                prev.gripping = current.gripping;
            }
        }
        events
    }

    pub fn reset(&mut self) {
        self.prev = [PrevHand::default(); 2];
    }
}

// ── Test helpers ───────────────────────────────────────────

#[cfg(test)]
fn tick_with(
    monitor: &mut GestureMonitor,
    hands: &mut TrackedHands,
    left: crate::hand::HandFrame,
    right: crate::hand::HandFrame,
) -> Vec<HandEvent> {
    hands.update(Hand::Left, &left);
    hands.update(Hand::Right, &right);
    monitor.on_tick(hands)
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::HandFrame;
    use glam::{Quat, Vec3};

    fn tracked(gripping: bool) -> HandFrame {
        HandFrame::tracked(Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY, gripping)
    }

    #[test]
    fn test_no_events_when_nothing_changes() {
        let mut monitor = GestureMonitor::new();
        let mut hands = TrackedHands::new();
        let events = tick_with(&mut monitor, &mut hands, HandFrame::hidden(), HandFrame::hidden());
        assert!(events.is_empty());
    }

    #[test]
    fn test_visibility_edges() {
        let mut monitor = GestureMonitor::new();
        let mut hands = TrackedHands::new();

        let events = tick_with(&mut monitor, &mut hands, tracked(false), HandFrame::hidden());
        assert_eq!(
            events,
            vec![HandEvent::VisibilityChanged {
                hand: Hand::Left,
                visible: true
            }]
        );

        // Steady state: no repeat events.
        let events = tick_with(&mut monitor, &mut hands, tracked(false), HandFrame::hidden());
        assert!(events.is_empty());
    }

    #[test]
    fn test_grip_edges_only_while_visible() {
        let mut monitor = GestureMonitor::new();
        let mut hands = TrackedHands::new();
        tick_with(&mut monitor, &mut hands, tracked(false), HandFrame::hidden());

        let events = tick_with(&mut monitor, &mut hands, tracked(true), HandFrame::hidden());
        assert_eq!(
            events,
            vec![HandEvent::GripChanged {
                hand: Hand::Left,
                gripping: true
            }]
        );

        let events = tick_with(&mut monitor, &mut hands, tracked(false), HandFrame::hidden());
        assert_eq!(
            events,
            vec![HandEvent::GripChanged {
                hand: Hand::Left,
                gripping: false
            }]
        );
    }

    #[test]
    fn test_tracking_loss_requests_release_without_grip_edge() {
        let mut monitor = GestureMonitor::new();
        let mut hands = TrackedHands::new();
        tick_with(&mut monitor, &mut hands, tracked(true), HandFrame::hidden());

        let events = tick_with(
            &mut monitor,
            &mut hands,
            HandFrame::hidden(),
            HandFrame::hidden(),
        );
        assert_eq!(
            events,
            vec![
                HandEvent::VisibilityChanged {
                    hand: Hand::Left,
                    visible: false
                },
                HandEvent::ReleaseRequested { hand: Hand::Left },
            ],
            "loss while gripping must not emit a grip edge"
        );

        // Reappearing with the fist still closed re-arms the grip edge.
        let events = tick_with(&mut monitor, &mut hands, tracked(true), HandFrame::hidden());
        assert_eq!(
            events,
            vec![
                HandEvent::VisibilityChanged {
                    hand: Hand::Left,
                    visible: true
                },
                HandEvent::GripChanged {
                    hand: Hand::Left,
                    gripping: true
                },
            ]
        );
    }

    #[test]
    fn test_left_processed_before_right() {
        let mut monitor = GestureMonitor::new();
        let mut hands = TrackedHands::new();
        let events = tick_with(&mut monitor, &mut hands, tracked(false), tracked(false));
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            HandEvent::VisibilityChanged {
                hand: Hand::Left,
                ..
            }
        ));
        assert!(matches!(
            events[1],
            HandEvent::VisibilityChanged {
                hand: Hand::Right,
                ..
            }
        ));
    }

    #[test]
    fn test_reset() {
        let mut monitor = GestureMonitor::new();
        let mut hands = TrackedHands::new();
        tick_with(&mut monitor, &mut hands, tracked(true), HandFrame::hidden());
        monitor.reset();
        // After reset the same state reads as fresh transitions.
        let events = monitor.on_tick(&hands);
        assert_eq!(events.len(), 2);
    }
}
