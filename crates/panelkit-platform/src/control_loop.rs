//! Per-block orchestration in the audio callback.
//!
//! [`ControlLoop::process`] runs once per audio block, before
//! [`ControlLoop::render`]:
//!
//! ```text
//! AnalogInputs ──► ChannelBank ──► CatchUpBank ──► CvMapping ──► Patch/Modulations ──► Voice
//!                                      ▲
//!                     SharedContext ───┘ (snapshot + arm requests)
//! ```
//!
//! Nothing here allocates, locks or loops over a variable count; the only
//! slice-length-dependent loop is [`render`](ControlLoop::render), which
//! walks the host buffer in fixed engine blocks.

use panelkit_config::{EnvelopeMode, Settings, SettingsField, SharedSettings};
use panelkit_core::{CatchUpBank, CatchUpPolicy, CatchUpState, ChannelBank, CvMapping, resolve};

use crate::layout::PanelLayout;
use crate::pages::PageSpec;
use crate::shared::{ArmRequest, ArmTarget, ContextSnapshot, SharedContext};
use crate::ui::Mode;
use crate::voice::{ENGINE_BLOCK_SIZE, Frame, Modulations, Patch, Voice};
use crate::{AnalogInputs, CV_COUNT, GateInput, KNOB_COUNT};

/// Play-bank slot order: pitch, harmonics, timbre, morph.
const PITCH: usize = 0;
const HARMONICS: usize = 1;
const TIMBRE: usize = 2;
const MORPH: usize = 3;

/// CV lanes (indices into the CV bank).
const VOCT_CV: usize = 0;
const TIMBRE_CV: u8 = 1;
const MORPH_CV: u8 = 2;
const HARMONICS_CV: u8 = 3;

/// MIDI note of octave 0 at centre transposition.
const BASE_NOTE: f32 = 12.0;
/// Octave setting that turns the pitch knob into a full-range sweep.
const FREE_OCTAVE: u8 = 8;
/// Range of the free sweep, in semitones.
const FREE_RANGE: f32 = 96.0;
/// Transposition range of the pitch knob, in semitones either way.
const TRANSPOSE_SEMITONES: f32 = 7.0;
const MAX_NOTE: f32 = 127.0;

/// Output gain at full level.
const OUTPUT_GAIN: f32 = 0.15;
/// Fraction of the output gain that remains at level 0.
const LEVEL_FLOOR: f32 = 0.1;

/// Audio-callback half of the panel.
pub struct ControlLoop<'a> {
    context: &'a SharedContext,
    settings: &'a SharedSettings,
    knobs: ChannelBank<KNOB_COUNT>,
    cvs: ChannelBank<CV_COUNT>,
    play: CatchUpBank<KNOB_COUNT>,
    edit: CatchUpBank<KNOB_COUNT>,
    timbre_cv: CvMapping,
    morph_cv: CvMapping,
    harmonics_cv: CvMapping,
    play_values: [f32; KNOB_COUNT],
    armed_generation: u16,
    patch: Patch,
    modulations: Modulations,
    frames: [Frame; ENGINE_BLOCK_SIZE],
}

impl<'a> ControlLoop<'a> {
    /// Creates the loop with filters from `layout`.
    ///
    /// CV mappings start armed around the centre; call
    /// [`prime`](Self::prime) with the first readings to start from the
    /// actual knob positions.
    pub fn new(
        context: &'a SharedContext,
        settings: &'a SharedSettings,
        layout: &PanelLayout,
    ) -> Self {
        let mut this = Self {
            context,
            settings,
            knobs: layout.knob_bank(),
            cvs: layout.cv_bank(),
            play: CatchUpBank::new(CatchUpPolicy::Skew),
            edit: CatchUpBank::new(CatchUpPolicy::Immediate),
            timbre_cv: CvMapping::unmapped(),
            morph_cv: CvMapping::unmapped(),
            harmonics_cv: CvMapping::unmapped(),
            play_values: [0.5; KNOB_COUNT],
            armed_generation: 0,
            patch: Patch::default(),
            modulations: Modulations::default(),
            frames: [Frame::default(); ENGINE_BLOCK_SIZE],
        };
        this.arm_mappings(&[0.5; KNOB_COUNT]);
        this
    }

    /// Primes the filters with current readings and centres the CV mappings
    /// on the knob positions, so the first blocks do not ramp up from zero.
    pub fn prime(&mut self, analog: &impl AnalogInputs) {
        self.knobs.reset(&analog.read_knobs());
        self.cvs.reset(&analog.read_cvs());
        let knobs = self.knobs.filtered();
        self.play.force_all_tracking();
        self.play_values = knobs;
        self.arm_mappings(&knobs);
    }

    /// Runs one control block.
    pub fn process(&mut self, analog: &impl AnalogInputs, gate: &impl GateInput) {
        self.knobs.update(&analog.read_knobs());
        self.cvs.update(&analog.read_cvs());
        let knobs = self.knobs.filtered();
        let cvs = self.cvs.filtered();

        let snapshot = self.context.snapshot();
        let armed = self.sync_arm_request(snapshot);

        if snapshot.mode != Mode::Play {
            let values = self.edit.process_all(&knobs);
            if snapshot.mode == Mode::Edit && snapshot.ready && armed {
                PageSpec::of(snapshot.page).write(&values, &self.edit.states(), self.settings);
            }
        }

        let settings = self.settings.snapshot();
        let states = if snapshot.mode == Mode::Play {
            self.process_play(&knobs, &cvs, &settings);
            self.play.states()
        } else {
            self.process_edit(&settings);
            self.edit.states()
        };

        self.patch.frequency_modulation_amount = settings.fm_amount;
        self.patch.timbre_modulation_amount = settings.timbre_mod;
        self.patch.morph_modulation_amount = settings.morph_mod;
        self.patch.decay = settings.decay;
        self.patch.lpg_colour = settings.lpg_colour;
        self.patch.engine = snapshot.engine;
        self.apply_envelope_mode(settings.envelope_mode, gate.gate());

        self.context.publish_channels(&knobs, &cvs);
        self.context.publish_states(&states);
        self.context.publish_patch(
            self.patch.note,
            self.patch.harmonics + self.modulations.harmonics,
            self.patch.timbre + self.modulations.timbre,
            self.patch.morph + self.modulations.morph,
        );
    }

    /// Renders the host buffers in [`ENGINE_BLOCK_SIZE`] chunks.
    ///
    /// Frames are converted with a gain of `0.15 × (0.1 + 0.9 × level)`.
    /// If the buffers differ in length, the extra samples of the longer one
    /// are left untouched.
    pub fn render<V: Voice>(&mut self, voice: &mut V, left: &mut [f32], right: &mut [f32]) {
        let level = self.settings.get(SettingsField::OutputLevel);
        let gain = OUTPUT_GAIN * (LEVEL_FLOOR + (1.0 - LEVEL_FLOOR) * level);

        for (l, r) in left
            .chunks_mut(ENGINE_BLOCK_SIZE)
            .zip(right.chunks_mut(ENGINE_BLOCK_SIZE))
        {
            let frames = &mut self.frames[..l.len().min(r.len())];
            voice.render(&self.patch, &self.modulations, frames);
            for ((frame, l), r) in frames.iter().zip(l.iter_mut()).zip(r.iter_mut()) {
                (*l, *r) = frame.to_f32(gain);
            }
        }
    }

    /// Patch from the last block.
    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    /// Modulations from the last block.
    pub fn modulations(&self) -> &Modulations {
        &self.modulations
    }

    /// Play-bank states.
    pub fn play_states(&self) -> [CatchUpState; KNOB_COUNT] {
        self.play.states()
    }

    /// Edit-bank states.
    pub fn edit_states(&self) -> [CatchUpState; KNOB_COUNT] {
        self.edit.states()
    }

    /// Generation of the last arm request applied.
    pub fn armed_generation(&self) -> u16 {
        self.armed_generation
    }

    /// Applies a pending arm request. Returns true when the loop is armed
    /// for the snapshot's generation.
    fn sync_arm_request(&mut self, snapshot: ContextSnapshot) -> bool {
        if snapshot.generation == self.armed_generation {
            return true;
        }
        let Some(request) = self.context.read_arm_request(snapshot.generation) else {
            return false;
        };
        self.apply(&request);
        self.armed_generation = snapshot.generation;
        true
    }

    fn apply(&mut self, request: &ArmRequest) {
        match request.target {
            ArmTarget::Play => {
                self.play.arm(&request.stored, &request.baseline);
                self.play_values = request.stored;
                self.arm_mappings(&request.stored);
            }
            ArmTarget::Edit => self.edit.arm(&request.stored, &request.baseline),
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(target = ?request.target, "control_loop: bank armed");
    }

    fn arm_mappings(&mut self, play: &[f32; KNOB_COUNT]) {
        self.timbre_cv.arm(TIMBRE_CV, play[TIMBRE]);
        self.morph_cv.arm(MORPH_CV, play[MORPH]);
        self.harmonics_cv.arm(HARMONICS_CV, play[HARMONICS]);
    }

    fn process_play(
        &mut self,
        knobs: &[f32; KNOB_COUNT],
        cvs: &[f32; CV_COUNT],
        settings: &Settings,
    ) {
        let values = self.play.process_all(knobs);

        // Origins follow their own base control only.
        for (mapping, slot) in [
            (&mut self.harmonics_cv, HARMONICS),
            (&mut self.timbre_cv, TIMBRE),
            (&mut self.morph_cv, MORPH),
        ] {
            if values[slot] != self.play_values[slot] {
                mapping.rebase(values[slot]);
            }
        }
        self.play_values = values;
        self.context.publish_play_values(&values);

        self.timbre_cv.set_attenuverter(settings.timbre_mod);
        self.morph_cv.set_attenuverter(settings.morph_mod);
        self.harmonics_cv.set_attenuverter(settings.harmonics_mod);

        let pitch = values[PITCH];
        let note = if settings.octave < FREE_OCTAVE {
            let transposition = 2.0 * pitch - 1.0;
            BASE_NOTE
                + 12.0 * f32::from(settings.octave)
                + TRANSPOSE_SEMITONES * transposition
                + settings.voct_semitones(cvs[VOCT_CV])
                + settings.fine_tune
        } else {
            BASE_NOTE + FREE_RANGE * pitch
        };

        self.patch.note = note.clamp(0.0, MAX_NOTE);
        self.patch.harmonics = values[HARMONICS];
        self.patch.timbre = values[TIMBRE];
        self.patch.morph = values[MORPH];

        let timbre = resolve(values[TIMBRE], cvs[usize::from(TIMBRE_CV)], &self.timbre_cv);
        let morph = resolve(values[MORPH], cvs[usize::from(MORPH_CV)], &self.morph_cv);
        let cv8 = cvs[usize::from(HARMONICS_CV)];

        let mut m = Modulations {
            timbre: timbre - values[TIMBRE],
            morph: morph - values[MORPH],
            timbre_patched: self.timbre_cv.is_active(),
            morph_patched: self.morph_cv.is_active(),
            ..Modulations::default()
        };
        if settings.envelope_mode == EnvelopeMode::External {
            m.level = cv8;
        } else {
            let harmonics = resolve(values[HARMONICS], cv8, &self.harmonics_cv);
            m.harmonics = harmonics - values[HARMONICS];
            m.harmonics_patched = self.harmonics_cv.is_active();
        }
        self.modulations = m;
    }

    fn process_edit(&mut self, settings: &Settings) {
        let note = BASE_NOTE + 12.0 * f32::from(settings.octave) + settings.fine_tune;
        self.patch.note = note.clamp(0.0, MAX_NOTE);
        self.modulations = Modulations::default();
    }

    fn apply_envelope_mode(&mut self, mode: EnvelopeMode, gate: bool) {
        self.modulations.trigger_patched = mode.trigger_patched();
        self.modulations.level_patched = mode.level_patched();
        self.modulations.trigger = if gate { 1.0 } else { 0.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::Page;
    use crate::{ChannelId, namespace};

    struct Inputs {
        knobs: [f32; KNOB_COUNT],
        cvs: [f32; CV_COUNT],
    }

    impl Inputs {
        fn centred() -> Self {
            Self {
                knobs: [0.5; KNOB_COUNT],
                cvs: [0.5; CV_COUNT],
            }
        }
    }

    impl AnalogInputs for Inputs {
        fn read(&self, id: ChannelId) -> f32 {
            let i = usize::from(id.index());
            match id.namespace() {
                namespace::KNOB => self.knobs[i],
                _ => self.cvs[i],
            }
        }
    }

    struct Gate(bool);

    impl GateInput for Gate {
        fn gate(&self) -> bool {
            self.0
        }
    }

    struct Dc(i16);

    impl Voice for Dc {
        fn render(&mut self, _: &Patch, _: &Modulations, frames: &mut [Frame]) {
            frames.fill(Frame {
                out: self.0,
                aux: -self.0,
            });
        }
    }

    fn primed<'a>(
        ctx: &'a SharedContext,
        settings: &'a SharedSettings,
        io: &Inputs,
    ) -> ControlLoop<'a> {
        let mut cl = ControlLoop::new(ctx, settings, &PanelLayout::default());
        cl.prime(io);
        cl
    }

    #[test]
    fn play_note_from_octave_and_pitch_knob() {
        let ctx = SharedContext::new();
        let settings = SharedSettings::default();
        let mut io = Inputs::centred();
        io.knobs[PITCH] = 1.0;
        let mut cl = primed(&ctx, &settings, &io);
        cl.process(&io, &Gate(false));
        // 12 + 12·4 + 7·1 with the default calibration centred at 0.5.
        assert!((cl.patch().note - 67.0).abs() < 1e-4, "{}", cl.patch().note);
    }

    #[test]
    fn free_octave_sweeps_pitch_knob() {
        let ctx = SharedContext::new();
        let settings = SharedSettings::default();
        settings.set(SettingsField::Octave, 8.0);
        let mut io = Inputs::centred();
        io.knobs[PITCH] = 0.25;
        let mut cl = primed(&ctx, &settings, &io);
        cl.process(&io, &Gate(false));
        assert!((cl.patch().note - 36.0).abs() < 1e-4);
    }

    #[test]
    fn note_is_clamped() {
        let ctx = SharedContext::new();
        let settings = SharedSettings::default();
        settings.set(SettingsField::Octave, 7.0);
        settings.set(SettingsField::VoctScale, 1000.0);
        let mut io = Inputs::centred();
        io.cvs[VOCT_CV] = 1.0;
        let mut cl = primed(&ctx, &settings, &io);
        cl.process(&io, &Gate(false));
        assert_eq!(cl.patch().note, 127.0);
    }

    #[test]
    fn cv_is_attenuverted_around_knob() {
        let ctx = SharedContext::new();
        let settings = SharedSettings::default();
        settings.set(SettingsField::TimbreMod, 0.5);
        let mut io = Inputs::centred();
        io.knobs[TIMBRE] = 0.4;
        let mut cl = primed(&ctx, &settings, &io);

        io.cvs[usize::from(TIMBRE_CV)] = 1.0;
        for _ in 0..2000 {
            cl.process(&io, &Gate(false));
        }
        let m = cl.modulations();
        assert!(m.timbre_patched);
        assert!((m.timbre - 0.5).abs() < 1e-3, "{}", m.timbre);
        assert!((cl.patch().timbre - 0.4).abs() < 1e-6);
    }

    #[test]
    fn zero_depth_leaves_parameter_at_knob() {
        let ctx = SharedContext::new();
        let settings = SharedSettings::default();
        let mut io = Inputs::centred();
        io.cvs = [0.9; CV_COUNT];
        let mut cl = primed(&ctx, &settings, &io);
        cl.process(&io, &Gate(false));
        let m = cl.modulations();
        assert_eq!(m.timbre, 0.0);
        assert_eq!(m.morph, 0.0);
        assert_eq!(m.harmonics, 0.0);
    }

    #[test]
    fn external_envelope_routes_cv8_to_level() {
        let ctx = SharedContext::new();
        let settings = SharedSettings::default();
        settings.set(SettingsField::HarmonicsMod, 1.0);
        settings.set(SettingsField::EnvelopeMode, f32::from(EnvelopeMode::External.to_bits()));
        let mut io = Inputs::centred();
        io.cvs[usize::from(HARMONICS_CV)] = 0.8;
        let mut cl = primed(&ctx, &settings, &io);
        cl.process(&io, &Gate(true));

        let m = cl.modulations();
        assert!((m.level - 0.8).abs() < 1e-6);
        assert_eq!(m.harmonics, 0.0);
        assert!(!m.harmonics_patched);
        assert!(m.trigger_patched && m.level_patched);
        assert_eq!(m.trigger, 1.0);
    }

    #[test]
    fn envelope_routing_table() {
        let ctx = SharedContext::new();
        let settings = SharedSettings::default();
        let io = Inputs::centred();
        let mut cl = primed(&ctx, &settings, &io);
        for (mode, trigger, level) in [
            (EnvelopeMode::Drone, false, false),
            (EnvelopeMode::Ping, true, false),
            (EnvelopeMode::External, true, true),
        ] {
            settings.set(SettingsField::EnvelopeMode, f32::from(mode.to_bits()));
            cl.process(&io, &Gate(false));
            assert_eq!(cl.modulations().trigger_patched, trigger, "{mode:?}");
            assert_eq!(cl.modulations().level_patched, level, "{mode:?}");
        }
    }

    #[test]
    fn edit_mode_writes_only_when_ready_and_armed() {
        let ctx = SharedContext::new();
        let settings = SharedSettings::default();
        let mut io = Inputs::centred();
        let mut cl = primed(&ctx, &settings, &io);

        let stored = PageSpec::of(Page::LPG).knob_values(&settings.snapshot());
        ctx.request_arm(
            Mode::Edit,
            Page::LPG,
            &ArmRequest {
                target: ArmTarget::Edit,
                stored,
                baseline: [0.5; KNOB_COUNT],
            },
        );
        ctx.begin_transition();
        io.knobs[0] = 0.9;
        for _ in 0..2000 {
            cl.process(&io, &Gate(false));
        }
        assert_eq!(settings.get(SettingsField::Decay), 0.5);

        let g = ctx.request_arm(
            Mode::Edit,
            Page::LPG,
            &ArmRequest {
                target: ArmTarget::Edit,
                stored,
                baseline: [0.9, 0.5, 0.5, 0.5],
            },
        );
        io.knobs[0] = 0.2;
        for _ in 0..2000 {
            cl.process(&io, &Gate(false));
        }
        assert_eq!(cl.armed_generation(), g);
        assert!((settings.get(SettingsField::Decay) - 0.2).abs() < 1e-3);
        assert_eq!(settings.get(SettingsField::LpgColour), 0.5);
    }

    #[test]
    fn edit_note_ignores_pitch_knob() {
        let ctx = SharedContext::new();
        let settings = SharedSettings::default();
        settings.set(SettingsField::FineTune, 0.5);
        let mut io = Inputs::centred();
        io.knobs[PITCH] = 1.0;
        let mut cl = primed(&ctx, &settings, &io);
        ctx.request_arm(
            Mode::Edit,
            Page::ATTENUVERTERS,
            &ArmRequest {
                target: ArmTarget::Edit,
                stored: [0.5; KNOB_COUNT],
                baseline: [1.0, 0.5, 0.5, 0.5],
            },
        );
        cl.process(&io, &Gate(false));
        assert!((cl.patch().note - 60.5).abs() < 1e-5);
        assert_eq!(cl.modulations().timbre, 0.0);
    }

    #[test]
    fn render_applies_level_gain_in_engine_blocks() {
        let ctx = SharedContext::new();
        let settings = SharedSettings::default();
        settings.set(SettingsField::OutputLevel, 1.0);
        let mut cl = ControlLoop::new(&ctx, &settings, &PanelLayout::default());
        let mut left = [0.0f32; 40];
        let mut right = [0.0f32; 40];
        cl.render(&mut Dc(16384), &mut left, &mut right);
        assert!(left.iter().all(|&l| (l - 0.075).abs() < 1e-6));
        assert!(right.iter().all(|&r| (r + 0.075).abs() < 1e-6));

        settings.set(SettingsField::OutputLevel, 0.0);
        cl.render(&mut Dc(16384), &mut left, &mut right);
        assert!((left[39] - 0.0075).abs() < 1e-6);
    }
}
