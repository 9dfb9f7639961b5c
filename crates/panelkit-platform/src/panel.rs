//! Polling-loop half of the panel.
//!
//! [`Panel::poll`] is called about once a millisecond with the toggle,
//! button and raw knob levels. It runs the [`UiContext`] state machine and
//! carries out each transition's side effects in order: capture the play
//! values, clear ready, update settings, publish an arm request with a new
//! generation, then persist. It also returns the LED voltage and, every
//! 200 ms, a [`StatusReport`].
//!
//! # Example
//!
//! ```rust
//! use panelkit_config::{MemoryPersistence, SettingsStore, SharedSettings};
//! use panelkit_platform::{Mode, Panel, PanelLayout, PollInput, SharedContext};
//!
//! let context = SharedContext::new();
//! let settings = SharedSettings::default();
//! let store = SettingsStore::open(MemoryPersistence::new());
//! let mut panel = Panel::new(&context, &settings, store, PanelLayout::default());
//!
//! let out = panel.poll(&PollInput {
//!     now_ms: 0,
//!     edit_toggle: true,
//!     button: false,
//!     knobs_raw: [0.5; 4],
//! });
//! assert_eq!(panel.mode(), Mode::Edit);
//! assert!(context.snapshot().ready);
//! assert!(out.status.is_some());
//! ```

use panelkit_config::{EnvelopeMode, Persistence, SettingsField, SettingsStore, SharedSettings};

use crate::KNOB_COUNT;
use crate::button::{ButtonEvent, ButtonTracker};
use crate::calibration::{CalibrationSession, CaptureOutcome};
use crate::engine::EngineSelector;
use crate::layout::PanelLayout;
use crate::led::LedController;
use crate::pages::{LongPressAction, PageSpec};
use crate::shared::{ArmRequest, ArmTarget, SharedContext};
use crate::status::StatusReport;
use crate::ui::{Mode, Page, Transition, UiContext};

/// Minimum interval between status reports.
pub const STATUS_INTERVAL_MS: u32 = 200;

/// Attenuverter depth fields reset by a long press on the first page.
const DEPTHS: [SettingsField; 4] = [
    SettingsField::FmAmount,
    SettingsField::TimbreMod,
    SettingsField::MorphMod,
    SettingsField::HarmonicsMod,
];

/// Knob position of a zero attenuverter depth.
const CENTRE: f32 = 0.5;

/// Inputs sampled for one poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollInput {
    /// Millisecond clock (wrapping).
    pub now_ms: u32,
    /// Mode toggle, `true` = parameter edit.
    pub edit_toggle: bool,
    /// Button level, `true` = pressed.
    pub button: bool,
    /// Unfiltered knob readings, used as catch-up baselines.
    pub knobs_raw: [f32; KNOB_COUNT],
}

/// Notable outcome of a poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelEvent {
    /// A mode or page transition.
    Transition(Transition),
    /// Short press in Play.
    EngineSelected {
        /// New global engine index.
        engine: u8,
        /// The selection wrapped to the start of its bank.
        wrapped: bool,
    },
    /// Long press in Play.
    BankSelected(usize),
    /// Long press on the attenuverter page.
    AttenuvertersReset,
    /// Long press on the LPG page.
    EnvelopeModeChanged(EnvelopeMode),
    /// Short press during calibration.
    CalibrationCapture(CaptureOutcome),
}

/// Results of one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutput {
    /// LED voltage, `[0, 5]`.
    pub led_volts: f32,
    /// Present every [`STATUS_INTERVAL_MS`].
    pub status: Option<StatusReport>,
    /// What this poll changed, if anything.
    pub event: Option<PanelEvent>,
}

/// UI state, persistence and LED for one panel.
pub struct Panel<'a, P: Persistence> {
    context: &'a SharedContext,
    settings: &'a SharedSettings,
    store: SettingsStore<P>,
    layout: PanelLayout,
    ui: UiContext,
    button: ButtonTracker,
    engine: EngineSelector,
    led: LedController,
    calibration: CalibrationSession,
    saved_play: [f32; KNOB_COUNT],
    last_status_ms: Option<u32>,
}

impl<'a, P: Persistence> Panel<'a, P> {
    /// Publishes the store's settings and starts in Play on engine 0.
    pub fn new(
        context: &'a SharedContext,
        settings: &'a SharedSettings,
        store: SettingsStore<P>,
        layout: PanelLayout,
    ) -> Self {
        settings.publish(store.settings());
        let engine = EngineSelector::new();
        context.set_engine(engine.engine());

        #[cfg(feature = "tracing")]
        tracing::info!(outcome = ?store.outcome(), "panel: started");

        Self {
            context,
            settings,
            store,
            layout,
            ui: UiContext::new(),
            button: ButtonTracker::new(),
            engine,
            led: LedController::new(),
            calibration: CalibrationSession::new(),
            saved_play: context.play_values(),
            last_status_ms: None,
        }
    }

    /// Runs one poll.
    pub fn poll(&mut self, input: &PollInput) -> PollOutput {
        let mut event = self.ui.set_toggle(input.edit_toggle).map(|transition| {
            self.on_toggle(transition, &input.knobs_raw);
            PanelEvent::Transition(transition)
        });

        if let Some(press) = self.button.update(input.button, input.now_ms) {
            let pressed = match press {
                ButtonEvent::Short => self.on_short_press(&input.knobs_raw),
                ButtonEvent::Long => self.on_long_press(&input.knobs_raw),
            };
            event = pressed.or(event);
        }

        let status = self
            .status_due(input.now_ms)
            .then(|| self.status(&input.knobs_raw));

        #[cfg(feature = "tracing")]
        {
            if let Some(report) = &status {
                tracing::info!(target: "panelkit::status", "{report}");
            }
        }

        PollOutput {
            led_volts: self.led_volts(input.now_ms),
            status,
            event,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.ui.mode()
    }

    /// Current edit page.
    pub fn page(&self) -> Page {
        self.ui.page()
    }

    /// Engine selection.
    pub fn engine(&self) -> &EngineSelector {
        &self.engine
    }

    /// Calibration progress.
    pub fn calibration(&self) -> &CalibrationSession {
        &self.calibration
    }

    /// Settings store.
    pub fn store(&self) -> &SettingsStore<P> {
        &self.store
    }

    /// Consumes the panel, returning the store.
    pub fn into_store(self) -> SettingsStore<P> {
        self.store
    }

    /// Builds the current status report.
    pub fn status(&self, knobs_raw: &[f32; KNOB_COUNT]) -> StatusReport {
        match self.ui.mode() {
            Mode::Play => StatusReport::Play {
                bank: self.engine.bank(),
                engine: self.engine.engine_in_bank(),
                name: self.engine.name(),
                knobs: *knobs_raw,
                states: self.context.catch_up_states(),
                patch: self.context.patch_values(),
            },
            Mode::Edit => StatusReport::Edit {
                page: self.ui.page(),
                knobs: *knobs_raw,
                states: self.context.catch_up_states(),
                settings: self.settings.snapshot(),
            },
            Mode::Calibration => StatusReport::Calibration {
                step: self.calibration.step(),
                cv5: self.context.cvs()[0],
                offset: self.settings.get(SettingsField::VoctOffset),
                scale: self.settings.get(SettingsField::VoctScale),
                error: self.calibration.last_error(),
            },
        }
    }

    fn on_toggle(&mut self, transition: Transition, knobs_raw: &[f32; KNOB_COUNT]) {
        match transition {
            Transition::EnterEdit => {
                self.saved_play = self.context.play_values();
                self.arm_edit(knobs_raw);
            }
            Transition::EnterPlay => {
                self.context.begin_transition();
                self.context.request_arm(
                    Mode::Play,
                    self.ui.page(),
                    &ArmRequest {
                        target: ArmTarget::Play,
                        stored: self.saved_play,
                        baseline: self.layout.condition_knobs(knobs_raw),
                    },
                );
                self.persist();
            }
            _ => {}
        }
    }

    fn on_short_press(&mut self, knobs_raw: &[f32; KNOB_COUNT]) -> Option<PanelEvent> {
        match self.ui.mode() {
            Mode::Play => {
                let wrapped = self.engine.next_engine();
                self.context.set_engine(self.engine.engine());
                Some(PanelEvent::EngineSelected {
                    engine: self.engine.engine(),
                    wrapped,
                })
            }
            Mode::Edit => self.ui.next_page().map(|transition| {
                self.arm_edit(knobs_raw);
                PanelEvent::Transition(transition)
            }),
            Mode::Calibration => self.capture(knobs_raw),
        }
    }

    fn on_long_press(&mut self, knobs_raw: &[f32; KNOB_COUNT]) -> Option<PanelEvent> {
        match self.ui.mode() {
            Mode::Play => {
                self.engine.next_bank();
                self.context.set_engine(self.engine.engine());
                self.led.indicate_bank(self.engine.bank());
                Some(PanelEvent::BankSelected(self.engine.bank()))
            }
            Mode::Edit => match PageSpec::of(self.ui.page()).long_press {
                LongPressAction::ResetAttenuverters => {
                    self.context.begin_transition();
                    for field in DEPTHS {
                        self.settings.set(field, 0.0);
                    }
                    self.publish_edit_request([CENTRE; KNOB_COUNT], knobs_raw);

                    #[cfg(feature = "tracing")]
                    tracing::info!("panel: attenuverters reset");

                    Some(PanelEvent::AttenuvertersReset)
                }
                LongPressAction::CycleEnvelopeMode => {
                    let mode = self.settings.snapshot().envelope_mode.next();
                    self.settings
                        .set(SettingsField::EnvelopeMode, f32::from(mode.to_bits()));

                    #[cfg(feature = "tracing")]
                    tracing::info!(mode = mode.name(), "panel: envelope mode");

                    Some(PanelEvent::EnvelopeModeChanged(mode))
                }
                LongPressAction::EnterCalibration => self.ui.enter_calibration().map(|transition| {
                    self.calibration = CalibrationSession::new();
                    self.arm_edit(knobs_raw);
                    PanelEvent::Transition(transition)
                }),
            },
            Mode::Calibration => {
                #[cfg(feature = "tracing")]
                tracing::info!("panel: calibration cancelled");

                self.exit_calibration(knobs_raw)
            }
        }
    }

    fn capture(&mut self, knobs_raw: &[f32; KNOB_COUNT]) -> Option<PanelEvent> {
        let reading = self.context.cvs()[0];
        let outcome = self.calibration.capture(reading);
        match outcome {
            CaptureOutcome::LowCaptured(_low) => {
                #[cfg(feature = "tracing")]
                tracing::info!(low = _low, "calibration: 1V captured");
            }
            CaptureOutcome::Calibrated(calibration) => {
                self.settings.set(SettingsField::VoctOffset, calibration.offset);
                self.settings.set(SettingsField::VoctScale, calibration.scale);

                #[cfg(feature = "tracing")]
                tracing::info!(
                    offset = calibration.offset,
                    scale = calibration.scale,
                    "calibration: accepted"
                );

                self.persist();
            }
            CaptureOutcome::Rejected(_error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_error, high = reading, "calibration: rejected");
            }
            CaptureOutcome::Finished => return self.exit_calibration(knobs_raw),
        }
        Some(PanelEvent::CalibrationCapture(outcome))
    }

    fn exit_calibration(&mut self, knobs_raw: &[f32; KNOB_COUNT]) -> Option<PanelEvent> {
        self.ui.exit_calibration().map(|transition| {
            self.arm_edit(knobs_raw);
            PanelEvent::Transition(transition)
        })
    }

    /// Re-arms the edit bank with the current page's stored values.
    fn arm_edit(&mut self, knobs_raw: &[f32; KNOB_COUNT]) {
        self.context.begin_transition();
        let stored = PageSpec::of(self.ui.page()).knob_values(&self.settings.snapshot());
        self.publish_edit_request(stored, knobs_raw);
    }

    fn publish_edit_request(&mut self, stored: [f32; KNOB_COUNT], knobs_raw: &[f32; KNOB_COUNT]) {
        self.context.request_arm(
            self.ui.mode(),
            self.ui.page(),
            &ArmRequest {
                target: ArmTarget::Edit,
                stored,
                baseline: self.layout.condition_knobs(knobs_raw),
            },
        );
    }

    /// Copies the shared settings into the store and saves if dirty.
    fn persist(&mut self) {
        self.store.update(self.settings.snapshot());
        match self.store.commit() {
            Ok(_written) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(written = _written, "panel: settings committed");
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_e, "panel: settings save failed, will retry");
            }
        }
    }

    fn led_volts(&mut self, now_ms: u32) -> f32 {
        match self.ui.mode() {
            Mode::Play => self.led.update(now_ms, &self.engine),
            Mode::Edit => {
                LedController::edit_blink(now_ms, PageSpec::of(self.ui.page()).blink_period_ms)
            }
            Mode::Calibration => LedController::calibration(now_ms, self.calibration.step()),
        }
    }

    fn status_due(&mut self, now_ms: u32) -> bool {
        let due = self
            .last_status_ms
            .is_none_or(|last| now_ms.wrapping_sub(last) >= STATUS_INTERVAL_MS);
        if due {
            self.last_status_ms = Some(now_ms);
        }
        due
    }
}
