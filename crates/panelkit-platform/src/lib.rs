//! Panelkit Platform - front-panel state machine and control loop
//!
//! This crate wires the conditioning primitives of `panelkit-core` and the
//! settings of `panelkit-config` into the two execution contexts of an
//! instrument front panel:
//!
//! - [`ControlLoop`] runs once per audio block: it filters the analog lanes,
//!   runs the active catch-up bank, resolves CV mappings and produces the
//!   [`Patch`] and [`Modulations`] consumed by the synthesis [`Voice`].
//! - [`Panel`] runs in the slower polling loop: it tracks the mode toggle and
//!   the button, drives mode/page transitions, persists settings, and
//!   produces LED voltages and [`StatusReport`]s.
//!
//! The two never share `&mut` state. The polling loop publishes a packed
//! [`ContextSnapshot`] plus catch-up arm requests through [`SharedContext`],
//! and both sides read and write settings through
//! [`SharedSettings`](panelkit_config::SharedSettings).
//!
//! # Channel ID Namespaces
//!
//! Analog lanes use an 8-bit identifier with a namespace prefix:
//!
//! - `0x0X` - Knobs (manual controls)
//! - `0x1X` - CV jacks (external modulation)
//!
//! # no_std Support
//!
//! ```toml
//! [dependencies]
//! panelkit-platform = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod button;
pub mod calibration;
pub mod control_loop;
pub mod engine;
pub mod layout;
pub mod led;
pub mod pages;
pub mod panel;
pub mod shared;
pub mod status;
pub mod ui;
pub mod voice;

pub use button::{ButtonEvent, ButtonTracker, LONG_PRESS_MS};
pub use calibration::{
    Calibration, CalibrationError, CalibrationSession, CalibrationStep, CaptureOutcome,
};
pub use control_loop::ControlLoop;
pub use engine::{BANK_COUNT, ENGINE_COUNT, ENGINE_NAMES, ENGINES_PER_BANK, EngineSelector};
pub use layout::PanelLayout;
pub use led::LedController;
pub use pages::{LongPressAction, PAGES, PageSpec, SlotBinding, SlotScale};
pub use panel::{Panel, PanelEvent, PollInput, PollOutput};
pub use shared::{ArmRequest, ArmTarget, ContextSnapshot, SharedContext};
pub use status::StatusReport;
pub use ui::{Mode, PAGE_COUNT, Page, Transition, UiContext};
pub use voice::{ENGINE_BLOCK_SIZE, Frame, Modulations, Patch, Voice};

/// Number of manual knobs on the panel.
pub const KNOB_COUNT: usize = 4;

/// Number of CV jacks on the panel.
pub const CV_COUNT: usize = 4;

/// Namespace identifiers for analog lanes.
pub mod namespace {
    /// Manual knobs.
    pub const KNOB: u8 = 0x00;
    /// CV jacks.
    pub const CV: u8 = 0x10;
}

/// A namespaced analog lane identifier.
///
/// The high nibble is the namespace, the low nibble the lane index within it.
///
/// # Example
///
/// ```rust
/// use panelkit_platform::ChannelId;
///
/// let pitch = ChannelId::knob(0);
/// assert!(pitch.is_knob());
/// assert_eq!(pitch.raw(), 0x00);
///
/// assert_eq!(ChannelId::VOCT, ChannelId::cv(0));
/// assert_eq!(ChannelId::VOCT.raw(), 0x10);
/// assert!(ChannelId::MORPH_CV.is_cv());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(u8);

impl ChannelId {
    /// V/oct pitch input (CV5).
    pub const VOCT: Self = Self::cv(0);
    /// Timbre modulation input (CV6).
    pub const TIMBRE_CV: Self = Self::cv(1);
    /// Morph modulation input (CV7).
    pub const MORPH_CV: Self = Self::cv(2);
    /// Harmonics or level input (CV8).
    pub const HARMONICS_CV: Self = Self::cv(3);

    /// Creates a ChannelId from a raw 8-bit value.
    #[inline]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Creates a knob lane ID (namespace 0x0X).
    #[inline]
    pub const fn knob(index: u8) -> Self {
        Self(namespace::KNOB | (index & 0x0F))
    }

    /// Creates a CV lane ID (namespace 0x1X).
    #[inline]
    pub const fn cv(index: u8) -> Self {
        Self(namespace::CV | (index & 0x0F))
    }

    /// Returns the raw 8-bit value.
    #[inline]
    pub const fn raw(&self) -> u8 {
        self.0
    }

    /// Returns the namespace portion (high nibble).
    #[inline]
    pub const fn namespace(&self) -> u8 {
        self.0 & 0xF0
    }

    /// Returns the index within the namespace (low nibble).
    #[inline]
    pub const fn index(&self) -> u8 {
        self.0 & 0x0F
    }

    /// Returns true for a knob lane.
    #[inline]
    pub const fn is_knob(&self) -> bool {
        self.namespace() == namespace::KNOB
    }

    /// Returns true for a CV lane.
    #[inline]
    pub const fn is_cv(&self) -> bool {
        self.namespace() == namespace::CV
    }
}

/// Normalized analog reader.
///
/// Every lane reads `[0, 1]`. CV jacks read 0 V at `0.5`.
pub trait AnalogInputs {
    /// Reads one lane.
    fn read(&self, id: ChannelId) -> f32;

    /// Reads all knob lanes in order.
    fn read_knobs(&self) -> [f32; KNOB_COUNT] {
        core::array::from_fn(|i| self.read(ChannelId::knob(i as u8)))
    }

    /// Reads all CV lanes in order.
    fn read_cvs(&self) -> [f32; CV_COUNT] {
        core::array::from_fn(|i| self.read(ChannelId::cv(i as u8)))
    }
}

/// Digital gate/trigger input.
pub trait GateInput {
    /// Current gate state.
    fn gate(&self) -> bool;
}

/// LED driven by a DAC output.
pub trait LedOutput {
    /// Writes a voltage in `[0, 5]`.
    fn write_volts(&mut self, volts: f32);
}
