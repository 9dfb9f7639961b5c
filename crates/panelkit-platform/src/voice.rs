//! Boundary to the external synthesis engine.
//!
//! The engine itself is out of scope; the control loop only fills a
//! [`Patch`] and [`Modulations`] each block and asks a [`Voice`] to render
//! [`Frame`]s in chunks of [`ENGINE_BLOCK_SIZE`].

/// Frames rendered per engine call.
pub const ENGINE_BLOCK_SIZE: usize = 16;

/// Parameter set the engine renders from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Patch {
    /// MIDI note number, `[0, 127]`.
    pub note: f32,
    /// Harmonics, `[0, 1]`.
    pub harmonics: f32,
    /// Timbre, `[0, 1]`.
    pub timbre: f32,
    /// Morph, `[0, 1]`.
    pub morph: f32,
    /// Internal FM depth, `[-1, 1]`.
    pub frequency_modulation_amount: f32,
    /// Timbre modulation depth, `[-1, 1]`.
    pub timbre_modulation_amount: f32,
    /// Morph modulation depth, `[-1, 1]`.
    pub morph_modulation_amount: f32,
    /// LPG decay, `[0, 1]`.
    pub decay: f32,
    /// LPG colour, `[0, 1]`.
    pub lpg_colour: f32,
    /// Global engine index, `0..24`.
    pub engine: u8,
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            note: 48.0,
            harmonics: 0.5,
            timbre: 0.5,
            morph: 0.5,
            frequency_modulation_amount: 0.0,
            timbre_modulation_amount: 0.0,
            morph_modulation_amount: 0.0,
            decay: 0.5,
            lpg_colour: 0.5,
            engine: 0,
        }
    }
}

/// External modulation values and their routing flags.
///
/// `timbre`, `morph` and `harmonics` are already attenuverted: they hold the
/// resolved parameter minus its base value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modulations {
    /// Engine offset.
    pub engine: f32,
    /// Note offset in semitones.
    pub note: f32,
    /// Frequency modulation.
    pub frequency: f32,
    /// Harmonics offset.
    pub harmonics: f32,
    /// Timbre offset.
    pub timbre: f32,
    /// Morph offset.
    pub morph: f32,
    /// Trigger input, 0.0 or 1.0.
    pub trigger: f32,
    /// Level input, `[0, 1]`.
    pub level: f32,
    /// Frequency input routed.
    pub frequency_patched: bool,
    /// Timbre input routed.
    pub timbre_patched: bool,
    /// Morph input routed.
    pub morph_patched: bool,
    /// Harmonics input routed.
    pub harmonics_patched: bool,
    /// Trigger input routed.
    pub trigger_patched: bool,
    /// Level input routed.
    pub level_patched: bool,
}

impl Default for Modulations {
    fn default() -> Self {
        Self {
            engine: 0.0,
            note: 0.0,
            frequency: 0.0,
            harmonics: 0.0,
            timbre: 0.0,
            morph: 0.0,
            trigger: 0.0,
            level: 1.0,
            frequency_patched: false,
            timbre_patched: false,
            morph_patched: false,
            harmonics_patched: false,
            trigger_patched: false,
            level_patched: false,
        }
    }
}

/// One stereo output frame as rendered by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    /// Main output.
    pub out: i16,
    /// Auxiliary output.
    pub aux: i16,
}

impl Frame {
    /// Converts to a float pair scaled by `gain`.
    #[inline]
    pub fn to_f32(self, gain: f32) -> (f32, f32) {
        (
            f32::from(self.out) / 32768.0 * gain,
            f32::from(self.aux) / 32768.0 * gain,
        )
    }
}

/// External synthesis engine.
pub trait Voice {
    /// Renders `frames.len()` frames (at most [`ENGINE_BLOCK_SIZE`]).
    fn render(&mut self, patch: &Patch, modulations: &Modulations, frames: &mut [Frame]);
}
