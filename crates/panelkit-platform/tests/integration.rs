//! Integration tests for panelkit-platform.
//!
//! Runs the polling loop and the control loop side by side against the same
//! shared state, the way firmware interleaves them.

use panelkit_config::{
    EnvelopeMode, MemoryPersistence, Persistence, Settings, SettingsField, SettingsStore,
    SharedSettings,
};
use panelkit_core::CatchUpState;
use panelkit_platform::{
    AnalogInputs, CV_COUNT, CalibrationStep, ChannelId, ControlLoop, Frame, GateInput,
    KNOB_COUNT, Mode, Modulations, Panel, PanelLayout, Patch, PollInput, SharedContext, Voice,
};

struct Inputs {
    knobs: [f32; KNOB_COUNT],
    cvs: [f32; CV_COUNT],
    gate: bool,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            knobs: [0.5; KNOB_COUNT],
            cvs: [0.5; CV_COUNT],
            gate: false,
        }
    }
}

impl AnalogInputs for Inputs {
    fn read(&self, id: ChannelId) -> f32 {
        let i = usize::from(id.index());
        if id.is_knob() { self.knobs[i] } else { self.cvs[i] }
    }
}

impl GateInput for Inputs {
    fn gate(&self) -> bool {
        self.gate
    }
}

struct Silence;

impl Voice for Silence {
    fn render(&mut self, _: &Patch, _: &Modulations, frames: &mut [Frame]) {
        frames.fill(Frame::default());
    }
}

/// Both loops plus the simulated panel hardware.
struct Rig<'a> {
    control: ControlLoop<'a>,
    panel: Panel<'a, MemoryPersistence>,
    io: Inputs,
    edit: bool,
    now_ms: u32,
}

impl<'a> Rig<'a> {
    fn new(
        context: &'a SharedContext,
        settings: &'a SharedSettings,
        backend: MemoryPersistence,
    ) -> Self {
        let io = Inputs::default();
        let store = SettingsStore::open(backend);
        let panel = Panel::new(context, settings, store, PanelLayout::default());
        let mut control = ControlLoop::new(context, settings, &PanelLayout::default());
        control.prime(&io);
        Self {
            control,
            panel,
            io,
            edit: false,
            now_ms: 0,
        }
    }

    fn blocks(&mut self, n: usize) {
        for _ in 0..n {
            self.control.process(&self.io, &self.io);
        }
    }

    fn poll(&mut self, button: bool) {
        self.now_ms += 1;
        self.panel.poll(&PollInput {
            now_ms: self.now_ms,
            edit_toggle: self.edit,
            button,
            knobs_raw: self.io.knobs,
        });
        self.blocks(3);
    }

    fn toggle(&mut self, edit: bool) {
        self.edit = edit;
        self.poll(false);
    }

    fn short_press(&mut self) {
        self.poll(true);
        self.poll(false);
    }

    fn long_press(&mut self) {
        self.poll(true);
        self.now_ms += 2000;
        self.poll(true);
        self.poll(false);
    }

    fn writes(&self) -> usize {
        self.panel.store().backend().write_count()
    }
}

fn page_zero_settings() -> Settings {
    Settings {
        fm_amount: 0.3,
        timbre_mod: -0.1,
        morph_mod: 0.0,
        harmonics_mod: 0.2,
        ..Settings::default()
    }
}

#[test]
fn entering_edit_on_page_zero_holds_then_tracks() {
    let context = SharedContext::new();
    let settings = SharedSettings::default();
    let stored = page_zero_settings();
    let mut rig = Rig::new(
        &context,
        &settings,
        MemoryPersistence::with_record(stored.to_bytes()),
    );
    let writes = rig.writes();
    rig.blocks(100);

    rig.toggle(true);
    assert_eq!(context.snapshot().mode, Mode::Edit);
    let request = context
        .read_arm_request(context.snapshot().generation)
        .unwrap();
    for (got, want) in request.stored.iter().zip([0.65, 0.45, 0.5, 0.6]) {
        assert!((got - want).abs() < 1e-6, "{got} vs {want}");
    }
    assert_eq!(rig.control.edit_states(), [CatchUpState::Waiting; KNOB_COUNT]);

    // Resting knobs never rewrite settings.
    rig.blocks(1000);
    assert_eq!(settings.snapshot(), stored);

    // A real turn of K1 takes over FM depth.
    rig.io.knobs[0] = 0.9;
    rig.blocks(4000);
    assert_eq!(rig.control.edit_states()[0], CatchUpState::Tracking);
    let k = context.knobs()[0];
    let fm = settings.get(SettingsField::FmAmount);
    assert!((fm - (2.0 * k - 1.0)).abs() < 1e-6);
    assert!((fm - 0.8).abs() < 1e-3);
    assert_eq!(settings.get(SettingsField::TimbreMod), stored.timbre_mod);
    assert_eq!(settings.get(SettingsField::HarmonicsMod), stored.harmonics_mod);

    // Leaving edit commits exactly once.
    rig.toggle(false);
    assert_eq!(rig.writes(), writes + 1);
    let saved = rig.panel.store().settings();
    assert!((saved.fm_amount - 0.8).abs() < 1e-3);

    rig.toggle(true);
    rig.toggle(false);
    assert_eq!(rig.writes(), writes + 1);
}

#[test]
fn play_values_survive_an_edit_round_trip() {
    let context = SharedContext::new();
    let settings = SharedSettings::default();
    let mut rig = Rig::new(&context, &settings, MemoryPersistence::new());

    rig.io.knobs = [0.3, 0.7, 0.2, 0.8];
    rig.blocks(4000);
    let before = *rig.control.patch();

    rig.toggle(true);
    rig.io.knobs = [0.9, 0.1, 0.9, 0.1];
    rig.blocks(4000);
    rig.toggle(false);
    rig.blocks(10);

    // Back in play the knobs disagree with the saved values, so the patch
    // holds them until each knob is touched.
    assert_eq!(rig.control.play_states(), [CatchUpState::Waiting; KNOB_COUNT]);
    let after = rig.control.patch();
    assert!((after.harmonics - before.harmonics).abs() < 1e-3);
    assert!((after.timbre - before.timbre).abs() < 1e-3);
    assert!((after.morph - before.morph).abs() < 1e-3);
    assert!((after.note - before.note).abs() < 0.05);
}

#[test]
fn calibration_through_both_loops() {
    let context = SharedContext::new();
    let settings = SharedSettings::default();
    let mut rig = Rig::new(&context, &settings, MemoryPersistence::new());

    rig.toggle(true);
    rig.short_press();
    rig.short_press();
    rig.long_press();
    assert_eq!(rig.panel.mode(), Mode::Calibration);

    rig.io.cvs[0] = 0.52;
    rig.blocks(3000);
    rig.short_press();
    assert_eq!(rig.panel.calibration().step(), CalibrationStep::WaitingHigh);

    let writes = rig.writes();
    rig.io.cvs[0] = 0.72;
    rig.blocks(3000);
    rig.short_press();
    assert_eq!(rig.panel.calibration().step(), CalibrationStep::Done);
    assert_eq!(rig.writes(), writes + 1);

    let s = settings.snapshot();
    assert!((s.voct_offset - 0.42).abs() < 1e-3);
    assert!((s.voct_scale - 120.0).abs() < 0.5);

    rig.short_press();
    assert_eq!(rig.panel.mode(), Mode::Edit);
    assert_eq!(context.snapshot().mode, Mode::Edit);

    let record = rig.panel.store().backend().record().copied().unwrap();
    let persisted = Settings::from_bytes(&record).unwrap();
    assert!((persisted.voct_offset - 0.42).abs() < 1e-3);
}

#[test]
fn engine_selection_reaches_the_patch() {
    let context = SharedContext::new();
    let settings = SharedSettings::default();
    let mut rig = Rig::new(&context, &settings, MemoryPersistence::new());

    rig.short_press();
    assert_eq!(rig.control.patch().engine, 1);
    rig.long_press();
    assert_eq!(rig.control.patch().engine, 9);
    for _ in 0..7 {
        rig.short_press();
    }
    assert_eq!(rig.control.patch().engine, 8);
}

#[test]
fn envelope_mode_cycle_reroutes_cv8() {
    let context = SharedContext::new();
    let settings = SharedSettings::default();
    let mut rig = Rig::new(&context, &settings, MemoryPersistence::new());

    rig.toggle(true);
    rig.short_press();
    rig.long_press();
    assert_eq!(settings.snapshot().envelope_mode, EnvelopeMode::External);
    rig.toggle(false);

    rig.io.cvs[3] = 0.25;
    rig.io.gate = true;
    rig.blocks(3000);
    let m = rig.control.modulations();
    assert!(m.level_patched && m.trigger_patched);
    assert!((m.level - 0.25).abs() < 1e-3);
    assert_eq!(m.trigger, 1.0);
}

#[test]
fn failed_save_is_retried_on_next_exit() {
    let context = SharedContext::new();
    let settings = SharedSettings::default();
    let mut backend = MemoryPersistence::new();
    backend.set_fail_writes(true);
    let mut rig = Rig::new(&context, &settings, backend);

    rig.toggle(true);
    settings.set(SettingsField::Decay, 0.9);
    rig.toggle(false);
    assert!(rig.panel.store().is_dirty());

    let mut store = rig.panel.into_store();
    assert!(store.commit().is_err());
}

#[test]
fn render_fills_host_buffer() {
    let context = SharedContext::new();
    let settings = SharedSettings::default();
    let mut rig = Rig::new(&context, &settings, MemoryPersistence::new());
    let mut left = vec![1.0f32; 100];
    let mut right = vec![1.0f32; 100];
    rig.control.render(&mut Silence, &mut left, &mut right);
    assert!(left.iter().chain(&right).all(|&s| s == 0.0));
}

#[test]
fn memory_backend_round_trip_through_trait() {
    let mut backend = MemoryPersistence::new();
    backend.save(&page_zero_settings()).unwrap();
    assert_eq!(backend.load().unwrap(), Some(page_zero_settings()));
}
