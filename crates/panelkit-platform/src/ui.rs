//! Mode and page state owned by the polling loop.
//!
//! [`UiContext`] is a pure state machine: it decides *which* transition
//! happened and records previous mode/page, while the
//! [`Panel`](crate::Panel) carries out the side effects in the required
//! order (capture, arm, publish, persist).
//!
//! ```text
//!            toggle            long press (Tuning page)
//!   Play ◄──────────► Edit ──────────────────────────► Calibration
//!                      ▲                                    │
//!                      └──── done / long press (cancel) ────┘
//! ```
//!
//! The toggle is ignored while calibrating.

/// Number of edit pages.
pub const PAGE_COUNT: usize = 3;

/// Top-level panel mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Performance: knobs drive the sound.
    #[default]
    Play,
    /// Parameter editing: knobs drive the current page's settings.
    Edit,
    /// V/oct calibration.
    Calibration,
}

impl Mode {
    /// Status-line name.
    pub const fn name(self) -> &'static str {
        match self {
            Mode::Play => "PLAY",
            Mode::Edit => "PARAM",
            Mode::Calibration => "CALIBRATE",
        }
    }

    /// Two-bit encoding for the packed snapshot.
    pub const fn to_bits(self) -> u32 {
        match self {
            Mode::Play => 0,
            Mode::Edit => 1,
            Mode::Calibration => 2,
        }
    }

    /// Inverse of [`to_bits`](Self::to_bits); unknown codes decode as `Play`.
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            1 => Mode::Edit,
            2 => Mode::Calibration,
            _ => Mode::Play,
        }
    }
}

/// Edit page index, always `< PAGE_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Page(u8);

impl Page {
    /// Attenuverter depths.
    pub const ATTENUVERTERS: Self = Self(0);
    /// LPG and output.
    pub const LPG: Self = Self(1);
    /// Tuning and calibration.
    pub const TUNING: Self = Self(2);

    /// Creates a page, wrapping out-of-range indices.
    pub const fn new(index: u8) -> Self {
        Self(index % PAGE_COUNT as u8)
    }

    /// Next page, wrapping.
    pub const fn next(self) -> Self {
        Self::new(self.0 + 1)
    }

    /// Page index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A mode or page change decided by [`UiContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Play → Edit.
    EnterEdit,
    /// Edit → Play.
    EnterPlay,
    /// Page switch inside Edit.
    PageChanged(Page),
    /// Edit → Calibration.
    EnterCalibration,
    /// Calibration → Edit (completed or cancelled).
    ExitCalibration,
}

/// Mode/page state with change tracking.
#[derive(Debug, Clone, Default)]
pub struct UiContext {
    mode: Mode,
    page: Page,
    previous_mode: Mode,
    previous_page: Page,
}

impl UiContext {
    /// Starts in Play on the first page.
    pub const fn new() -> Self {
        Self {
            mode: Mode::Play,
            page: Page::ATTENUVERTERS,
            previous_mode: Mode::Play,
            previous_page: Page::ATTENUVERTERS,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current page.
    pub fn page(&self) -> Page {
        self.page
    }

    /// Mode before the last transition.
    pub fn previous_mode(&self) -> Mode {
        self.previous_mode
    }

    /// Page before the last page change.
    pub fn previous_page(&self) -> Page {
        self.previous_page
    }

    /// Applies the toggle position (`true` = edit).
    pub fn set_toggle(&mut self, edit: bool) -> Option<Transition> {
        let target = if edit { Mode::Edit } else { Mode::Play };
        if self.mode == Mode::Calibration || self.mode == target {
            return None;
        }
        self.switch_mode(target);
        Some(if edit {
            Transition::EnterEdit
        } else {
            Transition::EnterPlay
        })
    }

    /// Advances to the next page. Only valid in Edit.
    pub fn next_page(&mut self) -> Option<Transition> {
        if self.mode != Mode::Edit {
            return None;
        }
        self.previous_page = self.page;
        self.page = self.page.next();
        Some(Transition::PageChanged(self.page))
    }

    /// Enters calibration. Only valid in Edit.
    pub fn enter_calibration(&mut self) -> Option<Transition> {
        if self.mode != Mode::Edit {
            return None;
        }
        self.switch_mode(Mode::Calibration);
        Some(Transition::EnterCalibration)
    }

    /// Leaves calibration back to Edit.
    pub fn exit_calibration(&mut self) -> Option<Transition> {
        if self.mode != Mode::Calibration {
            return None;
        }
        self.switch_mode(Mode::Edit);
        Some(Transition::ExitCalibration)
    }

    fn switch_mode(&mut self, mode: Mode) {
        self.previous_mode = self.mode;
        self.mode = mode;

        #[cfg(feature = "tracing")]
        tracing::info!(from = self.previous_mode.name(), to = mode.name(), "ui: mode change");
    }
}
