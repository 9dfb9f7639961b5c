//! Two-line status report for a serial console or log.
//!
//! Fractions print as integer percent (`0.42` → `42`), calibration readings
//! in thousandths, so the lines stay readable on targets without float
//! formatting.

use core::fmt;

use panelkit_config::Settings;
use panelkit_core::CatchUpState;

use crate::KNOB_COUNT;
use crate::calibration::{CalibrationError, CalibrationStep};
use crate::pages::PageSpec;
use crate::ui::Page;

/// Snapshot of what the panel is doing, rendered with `Display`.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReport {
    /// Play mode.
    Play {
        /// Bank index.
        bank: usize,
        /// Engine index within the bank.
        engine: usize,
        /// Engine short name.
        name: &'static str,
        /// Raw knob readings.
        knobs: [f32; KNOB_COUNT],
        /// Play-bank catch-up states.
        states: [CatchUpState; KNOB_COUNT],
        /// Resolved note, harmonics, timbre and morph.
        patch: [f32; 4],
    },
    /// Parameter edit mode.
    Edit {
        /// Current page.
        page: Page,
        /// Raw knob readings.
        knobs: [f32; KNOB_COUNT],
        /// Edit-bank catch-up states.
        states: [CatchUpState; KNOB_COUNT],
        /// Current settings.
        settings: Settings,
    },
    /// Calibration mode.
    Calibration {
        /// Current step.
        step: CalibrationStep,
        /// Filtered V/oct reading.
        cv5: f32,
        /// Stored calibration offset.
        offset: f32,
        /// Stored calibration scale.
        scale: f32,
        /// Most recent rejection.
        error: Option<CalibrationError>,
    },
}

fn pct(value: f32) -> i32 {
    (value * 100.0) as i32
}

fn milli(value: f32) -> i32 {
    (value * 1000.0) as i32
}

struct Knobs<'a>(&'a [f32; KNOB_COUNT], &'a [CatchUpState; KNOB_COUNT]);

impl fmt::Display for Knobs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [k1, k2, k3, k4] = *self.0;
        let [s1, s2, s3, s4] = *self.1;
        write!(
            f,
            "K:{},{},{},{} | {},{},{},{}",
            pct(k1),
            pct(k2),
            pct(k3),
            pct(k4),
            s1.label(),
            s2.label(),
            s3.label(),
            s4.label()
        )
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusReport::Play {
                bank,
                engine,
                name,
                knobs,
                states,
                patch,
            } => {
                let [note, harmonics, timbre, morph] = *patch;
                writeln!(f, "PLAY B{bank} E{engine}({name}) | {}", Knobs(knobs, states))?;
                write!(
                    f,
                    "  Note:{} Harm:{} Timb:{} Morph:{}",
                    note as i32,
                    pct(harmonics),
                    pct(timbre),
                    pct(morph)
                )
            }
            StatusReport::Edit {
                page,
                knobs,
                states,
                settings: s,
            } => {
                writeln!(
                    f,
                    "PARAM P{}({}) | {}",
                    page.index(),
                    PageSpec::of(*page).name,
                    Knobs(knobs, states)
                )?;
                match *page {
                    Page::ATTENUVERTERS => write!(
                        f,
                        "  FM:{} TiMod:{} MoMod:{} HaMod:{}",
                        pct(s.fm_amount),
                        pct(s.timbre_mod),
                        pct(s.morph_mod),
                        pct(s.harmonics_mod)
                    ),
                    Page::LPG => write!(
                        f,
                        "  Decay:{} LPG:{} Level:{} EnvMode:{}",
                        pct(s.decay),
                        pct(s.lpg_colour),
                        pct(s.output_level),
                        s.envelope_mode.name()
                    ),
                    _ => write!(
                        f,
                        "  Octave:{} FineTune:{} | Cal:{},{}",
                        s.octave,
                        pct(s.fine_tune),
                        milli(s.voct_offset),
                        s.voct_scale as i32
                    ),
                }
            }
            StatusReport::Calibration {
                step,
                cv5,
                offset,
                scale,
                error,
            } => {
                writeln!(f, "CALIBRATE step:{} | CV5:{}/1000", step.label(), milli(*cv5))?;
                write!(f, "  Offset:{} Scale:{}", milli(*offset), *scale as i32)?;
                if let Some(e) = error {
                    write!(f, " | {e}")?;
                }
                Ok(())
            }
        }
    }
}
