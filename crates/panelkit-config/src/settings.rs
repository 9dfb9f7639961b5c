//! The persisted settings record.
//!
//! [`Settings`] holds everything the user can configure on the panel: the
//! four attenuverter depths of the first edit page, the envelope/output
//! shaping of the second, and tuning plus V/oct calibration on the third.
//!
//! # Record format
//!
//! Flash storage keeps a fixed-size little-endian record:
//!
//! | offset | size | field |
//! |--------|------|-------|
//! | 0 | 4 | signature (`0x504C5401`) |
//! | 4 | 40 | ten `f32` fields in [`SettingsField`] order |
//! | 44 | 1 | octave (`u8`, 0..=8) |
//! | 45 | 1 | envelope mode (`u8`) |
//!
//! A record whose signature does not match is treated as "no valid data".

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Signature marking a trusted settings record.
pub const SIGNATURE: u32 = 0x504C_5401;

/// Size of an encoded record in bytes.
pub const RECORD_SIZE: usize = 4 + 10 * 4 + 2;

/// Highest octave range setting. At this value the transposition knob sweeps
/// the full pitch range instead of selecting fifths.
pub const MAX_OCTAVE: u8 = 8;

/// Envelope/trigger routing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeMode {
    /// Free-running: trigger and level inputs ignored.
    Drone,
    /// Gate input pings the internal envelope.
    #[default]
    Ping,
    /// Gate input triggers, CV8 drives the level.
    External,
}

impl EnvelopeMode {
    /// All modes in cycle order.
    pub const ALL: [Self; 3] = [Self::Drone, Self::Ping, Self::External];

    /// Next mode in the Drone → Ping → External cycle.
    pub const fn next(self) -> Self {
        match self {
            Self::Drone => Self::Ping,
            Self::Ping => Self::External,
            Self::External => Self::Drone,
        }
    }

    /// Upper-case name for status lines.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Drone => "DRONE",
            Self::Ping => "PING",
            Self::External => "EXT",
        }
    }

    /// Whether the gate input is routed into the engine's trigger.
    pub const fn trigger_patched(self) -> bool {
        matches!(self, Self::Ping | Self::External)
    }

    /// Whether CV8 is routed into the engine's level.
    pub const fn level_patched(self) -> bool {
        matches!(self, Self::External)
    }

    /// Record encoding.
    pub const fn to_bits(self) -> u8 {
        match self {
            Self::Drone => 0,
            Self::Ping => 1,
            Self::External => 2,
        }
    }

    /// Decodes a record byte.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Drone),
            1 => Some(Self::Ping),
            2 => Some(Self::External),
            _ => None,
        }
    }
}

/// Addressable fields of [`Settings`].
///
/// Used by the page table to bind knob slots to settings and by
/// [`SharedSettings`](crate::SharedSettings) to index its atomics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsField {
    /// FM attenuverter depth, `[-1, 1]`.
    FmAmount,
    /// Timbre CV attenuverter depth, `[-1, 1]`.
    TimbreMod,
    /// Morph CV attenuverter depth, `[-1, 1]`.
    MorphMod,
    /// Harmonics CV attenuverter depth, `[-1, 1]`.
    HarmonicsMod,
    /// LPG decay, `[0, 1]`.
    Decay,
    /// LPG colour, `[0, 1]`.
    LpgColour,
    /// Output level, `[0, 1]`.
    OutputLevel,
    /// Fine tune in semitones, `[-1, 1]`.
    FineTune,
    /// V/oct calibration offset, `[0, 1]`.
    VoctOffset,
    /// V/oct calibration scale in semitones per unit reading.
    VoctScale,
    /// Octave range, integer `0..=8`.
    Octave,
    /// Envelope mode code.
    EnvelopeMode,
}

/// Number of [`SettingsField`] variants.
pub const FIELD_COUNT: usize = 12;

impl SettingsField {
    /// Every field, in record order.
    pub const ALL: [Self; FIELD_COUNT] = [
        Self::FmAmount,
        Self::TimbreMod,
        Self::MorphMod,
        Self::HarmonicsMod,
        Self::Decay,
        Self::LpgColour,
        Self::OutputLevel,
        Self::FineTune,
        Self::VoctOffset,
        Self::VoctScale,
        Self::Octave,
        Self::EnvelopeMode,
    ];

    /// Position in [`ALL`](Self::ALL).
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short name for status lines and errors.
    pub const fn name(self) -> &'static str {
        match self {
            Self::FmAmount => "fm",
            Self::TimbreMod => "timbre_mod",
            Self::MorphMod => "morph_mod",
            Self::HarmonicsMod => "harm_mod",
            Self::Decay => "decay",
            Self::LpgColour => "lpg_colour",
            Self::OutputLevel => "level",
            Self::FineTune => "fine",
            Self::VoctOffset => "voct_offset",
            Self::VoctScale => "voct_scale",
            Self::Octave => "octave",
            Self::EnvelopeMode => "env_mode",
        }
    }

    /// Inclusive numeric range of the field.
    pub const fn range(self) -> (f32, f32) {
        match self {
            Self::FmAmount | Self::TimbreMod | Self::MorphMod | Self::HarmonicsMod => (-1.0, 1.0),
            Self::FineTune => (-1.0, 1.0),
            Self::Decay | Self::LpgColour | Self::OutputLevel => (0.0, 1.0),
            // Readings at 0 V may sit below the bottom of the ADC range.
            Self::VoctOffset => (-1.0, 2.0),
            Self::VoctScale => (10.0, 1000.0),
            Self::Octave => (0.0, MAX_OCTAVE as f32),
            Self::EnvelopeMode => (0.0, 2.0),
        }
    }

    /// True for fields stored as integers.
    pub const fn is_discrete(self) -> bool {
        matches!(self, Self::Octave | Self::EnvelopeMode)
    }

    /// Clamps (and for discrete fields rounds) a value into range.
    /// NaN maps to the lower bound.
    pub fn clamp(self, value: f32) -> f32 {
        let (lo, hi) = self.range();
        if value.is_nan() {
            return lo;
        }
        let v = value.clamp(lo, hi);
        if self.is_discrete() { libm::roundf(v) } else { v }
    }
}

/// Complete user configuration.
///
/// # TOML Format
///
/// ```toml
/// signature = 1347179521
/// fm_amount = 0.0
/// timbre_mod = 0.0
/// morph_mod = 0.0
/// harmonics_mod = 0.0
/// decay = 0.5
/// lpg_colour = 0.5
/// output_level = 0.7
/// fine_tune = 0.0
/// voct_offset = 0.5
/// voct_scale = 120.0
/// octave = 4
/// envelope_mode = "ping"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Must equal [`SIGNATURE`] for the record to be trusted.
    pub signature: u32,
    /// FM attenuverter depth.
    pub fm_amount: f32,
    /// Timbre CV attenuverter depth.
    pub timbre_mod: f32,
    /// Morph CV attenuverter depth.
    pub morph_mod: f32,
    /// Harmonics CV attenuverter depth.
    pub harmonics_mod: f32,
    /// LPG decay.
    pub decay: f32,
    /// LPG colour.
    pub lpg_colour: f32,
    /// Output level.
    pub output_level: f32,
    /// Fine tune in semitones.
    pub fine_tune: f32,
    /// V/oct calibration offset.
    pub voct_offset: f32,
    /// V/oct calibration scale.
    pub voct_scale: f32,
    /// Octave range.
    pub octave: u8,
    /// Envelope/trigger routing.
    pub envelope_mode: EnvelopeMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            signature: SIGNATURE,
            fm_amount: 0.0,
            timbre_mod: 0.0,
            morph_mod: 0.0,
            harmonics_mod: 0.0,
            decay: 0.5,
            lpg_colour: 0.5,
            output_level: 0.7,
            fine_tune: 0.0,
            voct_offset: 0.5,
            voct_scale: 120.0,
            octave: 4,
            envelope_mode: EnvelopeMode::Ping,
        }
    }
}

impl Settings {
    /// True when the signature matches.
    pub fn is_valid(&self) -> bool {
        self.signature == SIGNATURE
    }

    /// Reads a field as a number (discrete fields as their integer value).
    pub fn get(&self, field: SettingsField) -> f32 {
        match field {
            SettingsField::FmAmount => self.fm_amount,
            SettingsField::TimbreMod => self.timbre_mod,
            SettingsField::MorphMod => self.morph_mod,
            SettingsField::HarmonicsMod => self.harmonics_mod,
            SettingsField::Decay => self.decay,
            SettingsField::LpgColour => self.lpg_colour,
            SettingsField::OutputLevel => self.output_level,
            SettingsField::FineTune => self.fine_tune,
            SettingsField::VoctOffset => self.voct_offset,
            SettingsField::VoctScale => self.voct_scale,
            SettingsField::Octave => f32::from(self.octave),
            SettingsField::EnvelopeMode => f32::from(self.envelope_mode.to_bits()),
        }
    }

    /// Writes a field, clamped to its range.
    pub fn set(&mut self, field: SettingsField, value: f32) {
        let v = field.clamp(value);
        match field {
            SettingsField::FmAmount => self.fm_amount = v,
            SettingsField::TimbreMod => self.timbre_mod = v,
            SettingsField::MorphMod => self.morph_mod = v,
            SettingsField::HarmonicsMod => self.harmonics_mod = v,
            SettingsField::Decay => self.decay = v,
            SettingsField::LpgColour => self.lpg_colour = v,
            SettingsField::OutputLevel => self.output_level = v,
            SettingsField::FineTune => self.fine_tune = v,
            SettingsField::VoctOffset => self.voct_offset = v,
            SettingsField::VoctScale => self.voct_scale = v,
            SettingsField::Octave => self.octave = v as u8,
            SettingsField::EnvelopeMode => {
                self.envelope_mode = EnvelopeMode::from_bits(v as u8).unwrap_or_default();
            }
        }
    }

    /// Returns a copy with every field clamped into range.
    pub fn clamped(mut self) -> Self {
        for field in SettingsField::ALL {
            let v = self.get(field);
            self.set(field, v);
        }
        self
    }

    /// Converts a filtered V/oct reading to semitones using the stored
    /// calibration: `(reading − offset) × scale`.
    #[inline]
    pub fn voct_semitones(&self, reading: f32) -> f32 {
        (reading - self.voct_offset) * self.voct_scale
    }

    /// Encodes the fixed-size storage record.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[0..4].copy_from_slice(&self.signature.to_le_bytes());
        for (i, field) in SettingsField::ALL[..10].iter().enumerate() {
            let at = 4 + i * 4;
            out[at..at + 4].copy_from_slice(&self.get(*field).to_le_bytes());
        }
        out[44] = self.octave;
        out[45] = self.envelope_mode.to_bits();
        out
    }

    /// Decodes a storage record.
    ///
    /// Octave values above [`MAX_OCTAVE`] are clamped; everything else that
    /// does not decode cleanly is an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() != RECORD_SIZE {
            return Err(ConfigError::RecordLength {
                expected: RECORD_SIZE,
                found: bytes.len(),
            });
        }
        let signature = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if signature != SIGNATURE {
            return Err(ConfigError::InvalidSignature { found: signature });
        }
        let envelope_mode =
            EnvelopeMode::from_bits(bytes[45]).ok_or(ConfigError::InvalidEnvelopeMode(bytes[45]))?;

        let mut settings = Self {
            envelope_mode,
            octave: bytes[44].min(MAX_OCTAVE),
            ..Self::default()
        };
        for (i, field) in SettingsField::ALL[..10].iter().enumerate() {
            let at = 4 + i * 4;
            let value =
                f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
            if !value.is_finite() {
                return Err(ConfigError::NonFinite(field.name()));
            }
            settings.set(*field, value);
        }
        Ok(settings)
    }
}
