//! Filter configuration for the panel's analog lanes.
//!
//! Both execution contexts need the same view of the knobs: the control loop
//! filters them every block, and the polling loop conditions raw readings into
//! catch-up baselines. [`PanelLayout`] is the single description they share.

use panelkit_core::{ChannelBank, DeadZone};

use crate::{CV_COUNT, KNOB_COUNT};

/// Default per-knob smoothing coefficients (K1, K2 slower for pitch/harmonics).
pub const KNOB_COEFFS: [f32; KNOB_COUNT] = [0.005, 0.005, 0.01, 0.01];

/// Default CV smoothing coefficient.
pub const CV_COEFF: f32 = 0.01;

/// Filter coefficients and knob dead zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelLayout {
    /// Smoothing coefficient per knob.
    pub knob_coeffs: [f32; KNOB_COUNT],
    /// Smoothing coefficient shared by the CV lanes.
    pub cv_coeff: f32,
    /// Knob dead zone, for pots that do not reach their rails.
    pub knob_dead_zone: Option<DeadZone>,
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self {
            knob_coeffs: KNOB_COEFFS,
            cv_coeff: CV_COEFF,
            knob_dead_zone: None,
        }
    }
}

impl PanelLayout {
    /// Uses [`DeadZone::MEASURED`] on every knob.
    pub fn with_measured_dead_zone(mut self) -> Self {
        self.knob_dead_zone = Some(DeadZone::MEASURED);
        self
    }

    /// Knob filter bank.
    pub fn knob_bank(&self) -> ChannelBank<KNOB_COUNT> {
        let bank = ChannelBank::new(self.knob_coeffs);
        match self.knob_dead_zone {
            Some(dz) => bank.with_dead_zone(dz),
            None => bank,
        }
    }

    /// CV filter bank.
    pub fn cv_bank(&self) -> ChannelBank<CV_COUNT> {
        ChannelBank::uniform(self.cv_coeff)
    }

    /// Raw knob readings mapped into filtered space, for catch-up baselines.
    pub fn condition_knobs(&self, raw: &[f32; KNOB_COUNT]) -> [f32; KNOB_COUNT] {
        match self.knob_dead_zone {
            Some(dz) => raw.map(|r| dz.rescale(r)),
            None => *raw,
        }
    }
}
