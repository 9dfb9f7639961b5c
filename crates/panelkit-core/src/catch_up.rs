//! Pick-up ("catch-up") behaviour for knobs shared across pages and modes.
//!
//! When one physical knob controls different parameters depending on the
//! current page, its position rarely matches the value restored for the new
//! page. Jumping straight to the knob position causes an audible step, so a
//! [`CatchUp`] controller freezes the parameter until the knob is touched and
//! then reconciles the two.
//!
//! # State machine
//!
//! ```text
//!             arm()/on_page_change()
//!   ┌──────────────────────────────────────────┐
//!   ▼                                          │
//! Waiting ──moved > 0.03──► CatchingUp ──|stored−knob| < 0.005──► Tracking
//!   │                          (Skew)                                ▲
//!   └───────────────moved > 0.03 (Immediate)─────────────────────────┘
//! ```
//!
//! - **Tracking**: output follows the filtered knob.
//! - **Waiting**: output is the frozen stored value until the knob moves.
//! - **CatchingUp**: the stored value moves with the knob, scaled by a skew
//!   ratio so it converges on the knob position by the time the knob reaches
//!   either end stop.
//!
//! # Skew ratio
//!
//! When the knob moves towards 1 the parameter has `1 − stored` of travel left
//! while the knob has `1 − baseline`. Scaling each knob step by
//! `(1.001 − stored) / (1.001 − baseline)` makes both arrive together; the
//! mirror formula applies when moving towards 0. The ratio is clamped to
//! `[0.1, 10]`.
//!
//! # Example
//!
//! ```rust
//! use panelkit_core::{CatchUp, CatchUpPolicy, CatchUpState};
//!
//! let mut knob = CatchUp::new(CatchUpPolicy::Skew);
//! knob.arm(0.2, 0.7);
//!
//! // Knob jitters around its rest position: parameter stays frozen.
//! assert_eq!(knob.process(0.71), 0.2);
//! assert_eq!(knob.state(), CatchUpState::Waiting);
//!
//! // A real turn leaves Waiting.
//! knob.process(0.75);
//! assert_eq!(knob.state(), CatchUpState::CatchingUp);
//! ```

use crate::math::{clamp_unit, distance};

/// Knob travel needed to leave [`CatchUpState::Waiting`].
pub const MOVEMENT_THRESHOLD: f32 = 0.03;

/// Smallest knob step processed while catching up; smaller steps accumulate.
pub const MIN_DELTA: f32 = 0.005;

/// Distance at which the stored value counts as caught up.
pub const CATCH_THRESHOLD: f32 = 0.005;

/// Lower clamp of the skew ratio.
pub const MIN_SKEW: f32 = 0.1;

/// Upper clamp of the skew ratio.
pub const MAX_SKEW: f32 = 10.0;

/// Current state of a [`CatchUp`] controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CatchUpState {
    /// Output follows the filtered knob.
    #[default]
    Tracking,
    /// Output is frozen at the stored value until the knob moves.
    Waiting,
    /// Output converges from the stored value towards the knob.
    CatchingUp,
}

impl CatchUpState {
    /// Three-letter label used in status lines.
    pub const fn label(self) -> &'static str {
        match self {
            CatchUpState::Tracking => "TRK",
            CatchUpState::Waiting => "WAI",
            CatchUpState::CatchingUp => "CAT",
        }
    }

    /// Compact encoding for lock-free publication.
    pub const fn to_bits(self) -> u8 {
        match self {
            CatchUpState::Tracking => 0,
            CatchUpState::Waiting => 1,
            CatchUpState::CatchingUp => 2,
        }
    }

    /// Inverse of [`to_bits`](Self::to_bits). Unknown codes decode as `Tracking`.
    pub const fn from_bits(bits: u8) -> Self {
        match bits {
            1 => CatchUpState::Waiting,
            2 => CatchUpState::CatchingUp,
            _ => CatchUpState::Tracking,
        }
    }
}

/// How a controller leaves [`CatchUpState::Waiting`] once the knob moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatchUpPolicy {
    /// Jump straight to tracking. Precise; used on editing pages.
    Immediate,
    /// Converge smoothly using the skew ratio. Continuous; used for performance.
    Skew,
}

/// Pick-up state machine for one parameter slot.
///
/// # Invariants
///
/// - `stored` is always in `[0, 1]`
/// - `process` does a constant amount of work
#[derive(Debug, Clone)]
pub struct CatchUp {
    state: CatchUpState,
    policy: CatchUpPolicy,
    stored: f32,
    baseline: f32,
    output: f32,
}

impl CatchUp {
    /// Creates a controller in the tracking state.
    pub const fn new(policy: CatchUpPolicy) -> Self {
        Self {
            state: CatchUpState::Tracking,
            policy,
            stored: 0.0,
            baseline: 0.0,
            output: 0.0,
        }
    }

    /// Enters `Waiting` with `stored` as both frozen output and baseline.
    pub fn on_page_change(&mut self, stored: f32) {
        self.arm(stored, stored);
    }

    /// Enters `Waiting` with an explicit movement baseline.
    ///
    /// `baseline` is the knob position at the moment of the context switch;
    /// movement is measured from there.
    pub fn arm(&mut self, stored: f32, baseline: f32) {
        self.stored = clamp_unit(stored);
        self.baseline = baseline;
        self.output = self.stored;
        self.state = CatchUpState::Waiting;
    }

    /// Forces the controller back to `Tracking`.
    pub fn force_tracking(&mut self) {
        self.state = CatchUpState::Tracking;
    }

    /// Returns to the power-on state: tracking, everything zeroed.
    pub fn reset(&mut self) {
        self.state = CatchUpState::Tracking;
        self.stored = 0.0;
        self.baseline = 0.0;
        self.output = 0.0;
    }

    /// Advances one tick with the current filtered knob reading and returns the
    /// parameter value to use.
    #[inline]
    pub fn process(&mut self, filtered: f32) -> f32 {
        self.output = match self.state {
            CatchUpState::Tracking => {
                self.baseline = filtered;
                filtered
            }
            CatchUpState::Waiting => self.process_waiting(filtered),
            CatchUpState::CatchingUp => self.process_catching_up(filtered),
        };
        self.output
    }

    fn process_waiting(&mut self, filtered: f32) -> f32 {
        if distance(filtered, self.baseline) <= MOVEMENT_THRESHOLD {
            return self.stored;
        }
        match self.policy {
            // The baseline stays at the armed position so the first skew
            // step covers the whole movement.
            CatchUpPolicy::Skew => {
                self.state = CatchUpState::CatchingUp;
                self.stored
            }
            CatchUpPolicy::Immediate => {
                self.baseline = filtered;
                self.state = CatchUpState::Tracking;
                filtered
            }
        }
    }

    fn process_catching_up(&mut self, filtered: f32) -> f32 {
        if distance(filtered, self.baseline) > MIN_DELTA {
            let delta = filtered - self.baseline;
            let skew = skew_ratio(self.stored, self.baseline, delta);
            self.stored = clamp_unit(self.stored + skew * delta);
            if distance(self.stored, filtered) < CATCH_THRESHOLD {
                self.state = CatchUpState::Tracking;
            }
            self.baseline = filtered;
        }
        self.stored
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> CatchUpState {
        self.state
    }

    /// Policy used when leaving `Waiting`.
    #[inline]
    pub fn policy(&self) -> CatchUpPolicy {
        self.policy
    }

    /// Changes the policy; takes effect on the next movement out of `Waiting`.
    pub fn set_policy(&mut self, policy: CatchUpPolicy) {
        self.policy = policy;
    }

    /// Stored (frozen or converging) value.
    #[inline]
    pub fn stored(&self) -> f32 {
        self.stored
    }

    /// Last knob position movement is measured from.
    #[inline]
    pub fn baseline(&self) -> f32 {
        self.baseline
    }

    /// Value returned by the last [`process`](Self::process) call.
    #[inline]
    pub fn value(&self) -> f32 {
        self.output
    }

    /// True while waiting for the knob to move.
    #[inline]
    pub fn is_waiting(&self) -> bool {
        self.state == CatchUpState::Waiting
    }

    /// True while converging on the knob.
    #[inline]
    pub fn is_catching_up(&self) -> bool {
        self.state == CatchUpState::CatchingUp
    }
}

/// Skew ratio for a catch-up step of `delta` from `baseline`, clamped to
/// `[MIN_SKEW, MAX_SKEW]`.
#[inline]
pub fn skew_ratio(stored: f32, baseline: f32, delta: f32) -> f32 {
    let ratio = if delta > 0.0 {
        (1.001 - stored) / (1.001 - baseline)
    } else {
        (0.001 + stored) / (0.001 + baseline)
    };
    if ratio.is_nan() {
        return MIN_SKEW;
    }
    ratio.clamp(MIN_SKEW, MAX_SKEW)
}

/// Fixed-capacity bank of controllers sharing one policy.
///
/// One bank serves one context (play mode, or the editing pages); each slot
/// corresponds to one physical knob.
#[derive(Debug, Clone)]
pub struct CatchUpBank<const N: usize> {
    slots: [CatchUp; N],
}

impl<const N: usize> CatchUpBank<N> {
    /// Creates a bank with every slot tracking.
    pub fn new(policy: CatchUpPolicy) -> Self {
        Self {
            slots: core::array::from_fn(|_| CatchUp::new(policy)),
        }
    }

    /// Arms every slot with its stored value and knob baseline.
    pub fn arm(&mut self, stored: &[f32; N], baseline: &[f32; N]) {
        for ((slot, &s), &b) in self.slots.iter_mut().zip(stored).zip(baseline) {
            slot.arm(s, b);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(?stored, ?baseline, "catch_up: bank armed");
    }

    /// Arms every slot with `stored` as both value and baseline.
    pub fn on_page_change(&mut self, stored: &[f32; N]) {
        self.arm(stored, stored);
    }

    /// Processes one slot. Out-of-range indices pass the reading through.
    #[inline]
    pub fn process(&mut self, index: usize, filtered: f32) -> f32 {
        match self.slots.get_mut(index) {
            Some(slot) => slot.process(filtered),
            None => filtered,
        }
    }

    /// Processes every slot in order.
    #[inline]
    pub fn process_all(&mut self, filtered: &[f32; N]) -> [f32; N] {
        core::array::from_fn(|i| self.slots[i].process(filtered[i]))
    }

    /// Forces every slot to tracking.
    pub fn force_all_tracking(&mut self) {
        for slot in &mut self.slots {
            slot.force_tracking();
        }
    }

    /// Resets every slot to the power-on state.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
    }

    /// State of one slot (`Tracking` for out-of-range indices).
    pub fn state(&self, index: usize) -> CatchUpState {
        self.slots.get(index).map_or(CatchUpState::Tracking, CatchUp::state)
    }

    /// States of every slot.
    pub fn states(&self) -> [CatchUpState; N] {
        core::array::from_fn(|i| self.slots[i].state())
    }

    /// Last output of every slot.
    pub fn values(&self) -> [f32; N] {
        core::array::from_fn(|i| self.slots[i].value())
    }

    /// Borrows one slot.
    pub fn slot(&self, index: usize) -> Option<&CatchUp> {
        self.slots.get(index)
    }

    /// Mutably borrows one slot.
    pub fn slot_mut(&mut self, index: usize) -> Option<&mut CatchUp> {
        self.slots.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_tracking() {
        let mut c = CatchUp::new(CatchUpPolicy::Skew);
        assert_eq!(c.state(), CatchUpState::Tracking);
        assert_eq!(c.process(0.42), 0.42);
        assert_eq!(c.baseline(), 0.42);
    }

    #[test]
    fn waiting_holds_stored_value() {
        let mut c = CatchUp::new(CatchUpPolicy::Immediate);
        c.on_page_change(0.3);
        for reading in [0.3, 0.31, 0.29, 0.33, 0.27] {
            assert_eq!(c.process(reading), 0.3);
            assert!(c.is_waiting());
        }
    }

    #[test]
    fn immediate_policy_jumps_to_knob() {
        let mut c = CatchUp::new(CatchUpPolicy::Immediate);
        c.arm(0.2, 0.6);
        assert_eq!(c.process(0.65), 0.65);
        assert_eq!(c.state(), CatchUpState::Tracking);
    }

    #[test]
    fn skew_policy_enters_catching_up_without_jumping() {
        let mut c = CatchUp::new(CatchUpPolicy::Skew);
        c.arm(0.2, 0.6);
        assert_eq!(c.process(0.65), 0.2);
        assert!(c.is_catching_up());
        assert_eq!(c.baseline(), 0.6);
    }

    #[test]
    fn catching_up_ignores_sub_threshold_jitter() {
        let mut c = CatchUp::new(CatchUpPolicy::Skew);
        c.arm(0.2, 0.6);
        c.process(0.65);
        let held = c.process(0.66);
        assert!(held > 0.2);
        assert_eq!(c.baseline(), 0.66);
        assert_eq!(c.process(0.662), held);
        assert_eq!(c.baseline(), 0.66);
    }

    #[test]
    fn skew_from_matching_position_picks_up_at_once() {
        let mut c = CatchUp::new(CatchUpPolicy::Skew);
        c.on_page_change(0.2);
        c.process(0.24);
        assert!(c.is_catching_up());
        assert_eq!(c.process(0.25), 0.25);
        assert_eq!(c.state(), CatchUpState::Tracking);
    }

    #[test]
    fn skew_converges_when_turning_up() {
        let mut c = CatchUp::new(CatchUpPolicy::Skew);
        c.arm(0.2, 0.6);
        let mut knob = 0.6;
        let mut steps = 0;
        while c.state() != CatchUpState::Tracking && steps < 1000 {
            knob = (knob + 0.01_f32).min(1.0);
            let out = c.process(knob);
            assert!((0.0..=1.0).contains(&out));
            steps += 1;
        }
        assert_eq!(c.state(), CatchUpState::Tracking);
        assert!((c.value() - knob).abs() < 0.02);
    }

    #[test]
    fn skew_ratio_formulas() {
        // Moving up from the same position: 1:1.
        assert!((skew_ratio(0.4, 0.4, 0.01) - 1.0).abs() < 1e-6);
        // Parameter far below the knob while turning down: slower than the knob.
        let down = skew_ratio(0.1, 0.8, -0.01);
        assert!((down - (0.101 / 0.801)).abs() < 1e-6);
        // Clamped at both ends.
        assert_eq!(skew_ratio(0.0, 1.0, -0.01), MIN_SKEW);
        assert_eq!(skew_ratio(0.0, 0.9999, 0.01), MAX_SKEW);
    }

    #[test]
    fn arm_clamps_stored() {
        let mut c = CatchUp::new(CatchUpPolicy::Skew);
        c.arm(1.7, 0.5);
        assert_eq!(c.stored(), 1.0);
        c.on_page_change(-0.4);
        assert_eq!(c.stored(), 0.0);
    }

    #[test]
    fn force_tracking_follows_knob() {
        let mut c = CatchUp::new(CatchUpPolicy::Skew);
        c.arm(0.1, 0.9);
        c.force_tracking();
        assert_eq!(c.process(0.9), 0.9);
    }

    #[test]
    fn state_bits_round_trip() {
        for s in [
            CatchUpState::Tracking,
            CatchUpState::Waiting,
            CatchUpState::CatchingUp,
        ] {
            assert_eq!(CatchUpState::from_bits(s.to_bits()), s);
        }
        assert_eq!(CatchUpState::from_bits(9), CatchUpState::Tracking);
        assert_eq!(CatchUpState::Waiting.label(), "WAI");
    }

    #[test]
    fn bank_arms_every_slot() {
        let mut bank = CatchUpBank::<4>::new(CatchUpPolicy::Immediate);
        bank.arm(&[0.1, 0.2, 0.3, 0.4], &[0.5; 4]);
        assert_eq!(bank.states(), [CatchUpState::Waiting; 4]);
        let out = bank.process_all(&[0.5, 0.5, 0.6, 0.5]);
        assert_eq!(out, [0.1, 0.2, 0.6, 0.4]);
        assert_eq!(bank.state(2), CatchUpState::Tracking);
        assert_eq!(bank.process(9, 0.33), 0.33);

        bank.force_all_tracking();
        assert_eq!(bank.states(), [CatchUpState::Tracking; 4]);
    }
}
