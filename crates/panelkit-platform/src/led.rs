//! LED voltage patterns.
//!
//! One DAC-driven LED tells the player where they are:
//!
//! | Mode | Pattern |
//! |------|---------|
//! | Play | brightness by engine position in bank; 2 s pulse train after a bank change |
//! | Edit | blink between 3.5 V and 1.5 V at the page's period |
//! | Calibration | single pulse (1 V step), double pulse (3 V step), steady (done) |
//!
//! Every pattern is a pure function of the millisecond clock, so the polling
//! loop can call these at any rate.

use crate::calibration::CalibrationStep;
use crate::engine::{BANK_COUNT, ENGINES_PER_BANK, EngineSelector};

/// Full-scale LED voltage.
pub const LED_MAX_VOLTS: f32 = 5.0;

/// Play-mode brightness by engine position in the bank.
pub const ENGINE_BRIGHTNESS: [f32; ENGINES_PER_BANK] = [1.4, 1.7, 1.8, 2.1, 2.3, 2.6, 3.1, 5.0];

/// Pulse period announcing each bank.
pub const BANK_PULSE_PERIOD_MS: [u32; BANK_COUNT] = [250, 500, 1000];

/// How long the bank pulse train runs.
pub const BANK_INDICATION_MS: u32 = 2000;

const EDIT_HIGH_VOLTS: f32 = 3.5;
const EDIT_LOW_VOLTS: f32 = 1.5;
const CALIBRATION_LOW_VOLTS: f32 = 1.5;
const CALIBRATION_CYCLE_MS: u32 = 1500;

/// Play-mode LED state: engine brightness plus the bank indication.
#[derive(Debug, Clone, Default)]
pub struct LedController {
    indicated_bank: Option<usize>,
    started_at: Option<u32>,
}

impl LedController {
    /// Creates a controller showing engine brightness.
    pub const fn new() -> Self {
        Self {
            indicated_bank: None,
            started_at: None,
        }
    }

    /// Starts the pulse train for `bank`. The clock is latched on the next
    /// [`update`](Self::update).
    pub fn indicate_bank(&mut self, bank: usize) {
        self.indicated_bank = Some(bank % BANK_COUNT);
        self.started_at = None;
    }

    /// True while a bank pulse train is running.
    pub fn is_indicating(&self) -> bool {
        self.indicated_bank.is_some()
    }

    /// Play-mode voltage.
    pub fn update(&mut self, now_ms: u32, engine: &EngineSelector) -> f32 {
        if let Some(bank) = self.indicated_bank {
            let start = *self.started_at.get_or_insert(now_ms);
            let elapsed = now_ms.wrapping_sub(start);
            if elapsed < BANK_INDICATION_MS {
                let period = BANK_PULSE_PERIOD_MS[bank];
                return if elapsed % period < period / 2 {
                    LED_MAX_VOLTS
                } else {
                    0.0
                };
            }
            self.indicated_bank = None;
            self.started_at = None;
        }
        ENGINE_BRIGHTNESS[engine.engine_in_bank()]
    }

    /// Edit-mode blink for a page period.
    pub fn edit_blink(now_ms: u32, period_ms: u32) -> f32 {
        let period = period_ms.max(2);
        if now_ms % period < period / 2 {
            EDIT_HIGH_VOLTS
        } else {
            EDIT_LOW_VOLTS
        }
    }

    /// Calibration-mode pattern for a step.
    pub fn calibration(now_ms: u32, step: CalibrationStep) -> f32 {
        let phase = now_ms % CALIBRATION_CYCLE_MS;
        let on = match step {
            CalibrationStep::WaitingLow => phase < 200,
            CalibrationStep::WaitingHigh => phase < 150 || (phase > 300 && phase < 450),
            CalibrationStep::Done => true,
        };
        if on {
            LED_MAX_VOLTS
        } else {
            CALIBRATION_LOW_VOLTS
        }
    }
}
