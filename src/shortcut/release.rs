//! Best-effort detection of "all shortcut keys released"
//!
//! X11 only delivers the grabbed key's own press and release to us. The
//! modifier releases that follow go to the focused client, so they can only
//! be observed as raw input events, and those cannot be told apart from
//! unrelated input such as mouse clicks. The tracker therefore counts events:
//! it remembers how many modifiers were held at key press and reports a full
//! release once the same number of raw events has been seen after the key
//! itself went up.
//!
//! Failure modes:
//! - a click or unrelated key after the release counts as a modifier release
//!   and can fire too early
//! - a shortcut without modifiers never fires (0 pressed, first event makes 1)
//! - if the raw events never arrive the tracker simply waits for the next press

use crate::input::InputEvent;
use crate::x11::relevant_modifiers;

#[derive(Debug, Default)]
pub struct ReleaseTracker {
    pressed_modifiers: u32,
    released_modifiers: u32,
    after_release: bool,
    armed: bool,
}

impl ReleaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one input event; returns true when a full release is inferred
    ///
    /// `activated` tells whether this event activated a shortcut. The tracker
    /// only reports releases for presses that did.
    pub fn observe(&mut self, event: &InputEvent, activated: bool) -> bool {
        match *event {
            InputEvent::KeyPress { state, .. } => {
                self.after_release = false;
                self.released_modifiers = 0;
                self.pressed_modifiers = (state & relevant_modifiers()).count_ones();
                self.armed = activated;
                false
            }
            InputEvent::KeyRelease { .. } => {
                self.after_release = true;
                false
            }
            InputEvent::Other => {
                if !self.after_release {
                    return false;
                }
                self.released_modifiers += 1;
                if self.pressed_modifiers != self.released_modifiers {
                    return false;
                }
                self.pressed_modifiers = 0;
                self.released_modifiers = 0;
                std::mem::take(&mut self.armed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIFT: u16 = 1;
    const LOCK: u16 = 2;
    const CONTROL: u16 = 4;
    const MOD1: u16 = 8;
    const MOD2: u16 = 16;

    fn press(state: u16) -> InputEvent {
        InputEvent::KeyPress { keycode: 55, state }
    }

    fn release() -> InputEvent {
        InputEvent::KeyRelease {
            keycode: 55,
            state: 0,
        }
    }

    #[test]
    fn test_fires_after_all_modifiers_released() {
        let mut tracker = ReleaseTracker::new();
        assert!(!tracker.observe(&press(CONTROL | MOD1), true));
        assert!(!tracker.observe(&release(), false));
        assert!(!tracker.observe(&InputEvent::Other, false));
        assert!(tracker.observe(&InputEvent::Other, false));
        assert!(!tracker.observe(&InputEvent::Other, false));
    }

    #[test]
    fn test_lock_masks_do_not_count_as_modifiers() {
        let mut tracker = ReleaseTracker::new();
        tracker.observe(&press(SHIFT | LOCK | MOD2), true);
        tracker.observe(&release(), false);
        assert!(tracker.observe(&InputEvent::Other, false));
    }

    #[test]
    fn test_events_before_key_release_are_ignored() {
        let mut tracker = ReleaseTracker::new();
        tracker.observe(&press(CONTROL), true);
        assert!(!tracker.observe(&InputEvent::Other, false));
        tracker.observe(&release(), false);
        assert!(tracker.observe(&InputEvent::Other, false));
    }

    #[test]
    fn test_fires_only_once_per_activation() {
        let mut tracker = ReleaseTracker::new();
        tracker.observe(&press(CONTROL), true);
        tracker.observe(&release(), false);
        assert!(tracker.observe(&InputEvent::Other, false));
        assert!(!tracker.observe(&InputEvent::Other, false));
    }

    #[test]
    fn test_not_armed_without_activation() {
        let mut tracker = ReleaseTracker::new();
        tracker.observe(&press(CONTROL), false);
        tracker.observe(&release(), false);
        assert!(!tracker.observe(&InputEvent::Other, false));
    }

    #[test]
    fn test_shortcut_without_modifiers_never_fires() {
        let mut tracker = ReleaseTracker::new();
        tracker.observe(&press(0), true);
        tracker.observe(&release(), false);
        for _ in 0..5 {
            assert!(!tracker.observe(&InputEvent::Other, false));
        }
    }

    #[test]
    fn test_new_press_resets_counts() {
        let mut tracker = ReleaseTracker::new();
        tracker.observe(&press(CONTROL | MOD1), true);
        tracker.observe(&release(), false);
        tracker.observe(&InputEvent::Other, false);
        tracker.observe(&press(CONTROL), true);
        tracker.observe(&release(), false);
        assert!(tracker.observe(&InputEvent::Other, false));
    }
}
