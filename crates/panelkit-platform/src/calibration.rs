//! Two-point V/oct calibration.
//!
//! The user patches 1 V into the V/oct jack and presses the button, then 3 V
//! and presses again. From the two filtered readings:
//!
//! ```text
//! span   = high − low                  (2 V of travel)
//! scale  = 24 / span                   semitones per unit reading
//! offset = low − span / (24 / 12)      reading at 0 V
//! ```
//!
//! so that `(reading − offset) × scale` is 12 semitones at 1 V and 36 at 3 V.
//! Spans outside `(0.05, 0.5)` are rejected: too small means noise or
//! nothing patched, too large means the wrong jack.

use thiserror::Error;

/// Voltage expected at the first capture.
pub const LOW_VOLTS: f32 = 1.0;

/// Voltage expected at the second capture.
pub const HIGH_VOLTS: f32 = 3.0;

/// Semitones per volt.
pub const SEMITONES_PER_VOLT: f32 = 12.0;

/// Smallest plausible reading span between the two points (exclusive).
pub const MIN_SPAN: f32 = 0.05;

/// Largest plausible reading span between the two points (exclusive).
pub const MAX_SPAN: f32 = 0.5;

/// Why a calibration was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CalibrationError {
    /// The two readings are too close together or too far apart.
    #[error(
        "implausible calibration span {span:.3} (expected {min}..{max})",
        min = MIN_SPAN,
        max = MAX_SPAN
    )]
    ImplausibleSpan {
        /// Measured `high − low`.
        span: f32,
    },
}

/// Affine reading → semitone mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Reading at 0 V.
    pub offset: f32,
    /// Semitones per unit reading.
    pub scale: f32,
}

impl Calibration {
    /// Computes a calibration from readings at [`LOW_VOLTS`] and [`HIGH_VOLTS`].
    pub fn from_readings(low: f32, high: f32) -> Result<Self, CalibrationError> {
        let span = high - low;
        if !(span > MIN_SPAN && span < MAX_SPAN) {
            return Err(CalibrationError::ImplausibleSpan { span });
        }
        let interval = (HIGH_VOLTS - LOW_VOLTS) * SEMITONES_PER_VOLT;
        let scale = interval / span;
        let offset = low - span / (interval / SEMITONES_PER_VOLT) * LOW_VOLTS;
        Ok(Self { offset, scale })
    }

    /// Semitones for a reading.
    #[inline]
    pub fn semitones(&self, reading: f32) -> f32 {
        (reading - self.offset) * self.scale
    }
}

/// Progress through a calibration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationStep {
    /// Waiting for the 1 V capture.
    #[default]
    WaitingLow,
    /// Waiting for the 3 V capture.
    WaitingHigh,
    /// Finished; the next press exits.
    Done,
}

impl CalibrationStep {
    /// Status-line label.
    pub const fn label(self) -> &'static str {
        match self {
            CalibrationStep::WaitingLow => "1V",
            CalibrationStep::WaitingHigh => "3V",
            CalibrationStep::Done => "DONE",
        }
    }
}

/// Result of one capture press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureOutcome {
    /// The 1 V reading was stored.
    LowCaptured(f32),
    /// Both readings were captured and accepted.
    Calibrated(Calibration),
    /// The 3 V reading was rejected; the step is unchanged for a retry.
    Rejected(CalibrationError),
    /// The session was already done; the caller should exit calibration.
    Finished,
}

/// One pass through the calibration steps.
#[derive(Debug, Clone, Default)]
pub struct CalibrationSession {
    step: CalibrationStep,
    low: f32,
    last_error: Option<CalibrationError>,
}

impl CalibrationSession {
    /// Starts at [`CalibrationStep::WaitingLow`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current step.
    pub fn step(&self) -> CalibrationStep {
        self.step
    }

    /// Captured 1 V reading (meaningful once past `WaitingLow`).
    pub fn low_reading(&self) -> f32 {
        self.low
    }

    /// Most recent rejection, cleared by the next successful capture.
    pub fn last_error(&self) -> Option<CalibrationError> {
        self.last_error
    }

    /// Handles a short press with the current filtered V/oct reading.
    pub fn capture(&mut self, reading: f32) -> CaptureOutcome {
        match self.step {
            CalibrationStep::WaitingLow => {
                self.low = reading;
                self.last_error = None;
                self.step = CalibrationStep::WaitingHigh;
                CaptureOutcome::LowCaptured(reading)
            }
            CalibrationStep::WaitingHigh => match Calibration::from_readings(self.low, reading) {
                Ok(calibration) => {
                    self.last_error = None;
                    self.step = CalibrationStep::Done;
                    CaptureOutcome::Calibrated(calibration)
                }
                Err(e) => {
                    self.last_error = Some(e);
                    CaptureOutcome::Rejected(e)
                }
            },
            CalibrationStep::Done => CaptureOutcome::Finished,
        }
    }
}
