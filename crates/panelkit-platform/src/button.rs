//! Short/long press detection for the panel's momentary button.
//!
//! Feed the debounced button level once per poll. A press held for
//! [`LONG_PRESS_MS`] fires [`ButtonEvent::Long`] exactly once while still
//! held; releasing without a long press fires [`ButtonEvent::Short`].
//!
//! ```rust
//! use panelkit_platform::{ButtonEvent, ButtonTracker};
//!
//! let mut button = ButtonTracker::new();
//! assert_eq!(button.update(true, 0), None);
//! assert_eq!(button.update(false, 120), Some(ButtonEvent::Short));
//!
//! button.update(true, 1000);
//! assert_eq!(button.update(true, 3000), Some(ButtonEvent::Long));
//! assert_eq!(button.update(true, 9000), None);
//! assert_eq!(button.update(false, 9100), None);
//! ```

/// Hold time for a long press, in milliseconds.
pub const LONG_PRESS_MS: u32 = 2000;

/// A completed gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// Released before the long-press threshold.
    Short,
    /// Held past the threshold (fires while held).
    Long,
}

/// Edge and hold-time tracker.
#[derive(Debug, Clone, Default)]
pub struct ButtonTracker {
    pressed_at: Option<u32>,
    long_fired: bool,
}

impl ButtonTracker {
    /// Creates a tracker with the button released.
    pub const fn new() -> Self {
        Self {
            pressed_at: None,
            long_fired: false,
        }
    }

    /// Advances with the current level and clock; returns at most one event.
    pub fn update(&mut self, pressed: bool, now_ms: u32) -> Option<ButtonEvent> {
        match (self.pressed_at, pressed) {
            (None, true) => {
                self.pressed_at = Some(now_ms);
                self.long_fired = false;
                None
            }
            (Some(start), true) => {
                if !self.long_fired && now_ms.wrapping_sub(start) >= LONG_PRESS_MS {
                    self.long_fired = true;
                    Some(ButtonEvent::Long)
                } else {
                    None
                }
            }
            (Some(_), false) => {
                self.pressed_at = None;
                let fired = core::mem::replace(&mut self.long_fired, false);
                (!fired).then_some(ButtonEvent::Short)
            }
            (None, false) => None,
        }
    }

    /// True while the button is held.
    pub fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }

    /// Milliseconds the current press has lasted (0 when released).
    pub fn held_ms(&self, now_ms: u32) -> u32 {
        self.pressed_at.map_or(0, |start| now_ms.wrapping_sub(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_press_on_release() {
        let mut b = ButtonTracker::new();
        assert_eq!(b.update(true, 10), None);
        assert!(b.is_pressed());
        assert_eq!(b.update(true, 500), None);
        assert_eq!(b.update(false, 1999), Some(ButtonEvent::Short));
        assert!(!b.is_pressed());
    }

    #[test]
    fn long_press_fires_once_at_threshold() {
        let mut b = ButtonTracker::new();
        b.update(true, 0);
        assert_eq!(b.update(true, LONG_PRESS_MS - 1), None);
        assert_eq!(b.update(true, LONG_PRESS_MS), Some(ButtonEvent::Long));
        for t in (LONG_PRESS_MS..10_000).step_by(100) {
            assert_eq!(b.update(true, t), None);
        }
        assert_eq!(b.update(false, 10_000), None);
    }

    #[test]
    fn next_press_after_long_is_fresh() {
        let mut b = ButtonTracker::new();
        b.update(true, 0);
        b.update(true, 2500);
        b.update(false, 2600);
        b.update(true, 3000);
        assert_eq!(b.update(false, 3100), Some(ButtonEvent::Short));
    }

    #[test]
    fn hold_time_survives_clock_wrap() {
        let mut b = ButtonTracker::new();
        b.update(true, u32::MAX - 999);
        assert_eq!(b.held_ms(500), 1500);
        assert_eq!(b.update(true, 1000), Some(ButtonEvent::Long));
    }
}
