//! Scripted panel session.
//!
//! Runs both loops of a panel against simulated hardware: the control loop
//! at 48 kHz in 16-frame blocks, the polling loop once per millisecond.
//! A TOML script moves the toggle, knobs, CV jacks, button and gate at
//! given times.
//!
//! ```toml
//! duration_ms = 3000
//! knobs = [0.5, 0.5, 0.5, 0.5]
//!
//! [[event]]
//! at_ms = 500
//! action = "toggle"
//! edit = true
//!
//! [[event]]
//! at_ms = 800
//! action = "knob"
//! index = 0
//! value = 0.9
//!
//! [[event]]
//! at_ms = 1500
//! action = "press"
//! hold_ms = 2500
//! ```

use std::f32::consts::TAU;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Args;
use panelkit_config::{
    FilePersistence, MemoryPersistence, Persistence, SettingsStore, SharedSettings,
};
use panelkit_platform::{
    AnalogInputs, CV_COUNT, ChannelId, ControlLoop, ENGINE_BLOCK_SIZE, Frame, GateInput,
    KNOB_COUNT, Mode, Modulations, Panel, PanelLayout, Patch, PollInput, SharedContext, Voice,
};
use serde::Deserialize;

/// Host sample rate.
pub const SAMPLE_RATE: u32 = 48_000;

const BLOCKS_PER_MS: u32 = SAMPLE_RATE / 1000 / ENGINE_BLOCK_SIZE as u32;

/// Button hold for a press without an explicit `hold_ms`.
const TAP_MS: u32 = 50;

#[derive(Args)]
pub struct SimulateArgs {
    /// Session script (TOML)
    script: PathBuf,

    /// Settings file; an in-memory record is used when omitted
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Override the script duration in milliseconds
    #[arg(short, long)]
    duration: Option<u32>,

    /// Print events and the summary only, no status reports
    #[arg(short, long)]
    quiet: bool,
}

pub fn run(args: SimulateArgs) -> anyhow::Result<()> {
    let script = Script::load(&args.script)?;
    let duration_ms = args.duration.unwrap_or(script.duration_ms);

    tracing::info!(
        script = %args.script.display(),
        duration_ms,
        events = script.events.len(),
        "simulate: starting"
    );

    let summary = match &args.settings {
        Some(path) => simulate(&script, duration_ms, FilePersistence::new(path), args.quiet)?,
        None => simulate(&script, duration_ms, MemoryPersistence::new(), args.quiet)?,
    };
    println!("{summary}");
    Ok(())
}

fn centred() -> [f32; 4] {
    [0.5; 4]
}

fn tap() -> u32 {
    TAP_MS
}

/// A session script.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Session length.
    pub duration_ms: u32,
    /// Initial knob positions.
    #[serde(default = "centred")]
    pub knobs: [f32; KNOB_COUNT],
    /// Initial CV readings (0 V at 0.5).
    #[serde(default = "centred")]
    pub cvs: [f32; CV_COUNT],
    /// Timed hardware changes.
    #[serde(default, rename = "event")]
    pub events: Vec<ScriptEvent>,
}

/// One timed hardware change.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScriptEvent {
    /// Time at which the change is applied, before that millisecond's poll.
    pub at_ms: u32,
    /// What changes.
    #[serde(flatten)]
    pub action: Action,
}

/// Hardware change applied by a script event.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Flip the mode toggle.
    Toggle {
        /// `true` = parameter edit.
        edit: bool,
    },
    /// Move a knob.
    Knob {
        /// Knob index, `0..4`.
        index: usize,
        /// New position, `[0, 1]`.
        value: f32,
    },
    /// Change a CV reading.
    Cv {
        /// Jack index, `0..4` (CV5..CV8).
        index: usize,
        /// New reading, `[0, 1]`.
        value: f32,
    },
    /// Press and release the button.
    Press {
        /// How long the button is held.
        #[serde(default = "tap")]
        hold_ms: u32,
    },
    /// Set the gate input.
    Gate {
        /// Gate level.
        high: bool,
    },
}

impl Script {
    /// Reads and validates a script file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid script {}", path.display()))
    }

    /// Parses and validates a script. Events are sorted by time.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let mut script: Script = toml::from_str(text)?;
        for value in script.knobs.iter().chain(&script.cvs) {
            check_unit(*value)?;
        }
        for event in &script.events {
            match event.action {
                Action::Knob { index, value } => {
                    if index >= KNOB_COUNT {
                        bail!("knob index {index} at {} ms out of range", event.at_ms);
                    }
                    check_unit(value)?;
                }
                Action::Cv { index, value } => {
                    if index >= CV_COUNT {
                        bail!("cv index {index} at {} ms out of range", event.at_ms);
                    }
                    check_unit(value)?;
                }
                _ => {}
            }
        }
        script.events.sort_by_key(|e| e.at_ms);
        Ok(script)
    }
}

fn check_unit(value: f32) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("reading {value} outside [0, 1]");
    }
    Ok(())
}

/// Simulated panel hardware.
#[derive(Debug, Clone)]
struct Hardware {
    knobs: [f32; KNOB_COUNT],
    cvs: [f32; CV_COUNT],
    gate: bool,
    edit: bool,
    button_until: Option<u32>,
}

impl Hardware {
    fn new(script: &Script) -> Self {
        Self {
            knobs: script.knobs,
            cvs: script.cvs,
            gate: false,
            edit: false,
            button_until: None,
        }
    }

    fn apply(&mut self, event: &ScriptEvent) {
        match event.action {
            Action::Toggle { edit } => self.edit = edit,
            Action::Knob { index, value } => self.knobs[index] = value,
            Action::Cv { index, value } => self.cvs[index] = value,
            Action::Press { hold_ms } => {
                self.button_until = Some(event.at_ms.saturating_add(hold_ms.max(1)));
            }
            Action::Gate { high } => self.gate = high,
        }
    }

    fn button(&self, now_ms: u32) -> bool {
        self.button_until.is_some_and(|until| now_ms < until)
    }
}

impl AnalogInputs for Hardware {
    fn read(&self, id: ChannelId) -> f32 {
        let i = usize::from(id.index());
        if id.is_knob() { self.knobs[i] } else { self.cvs[i] }
    }
}

impl GateInput for Hardware {
    fn gate(&self) -> bool {
        self.gate
    }
}

/// Sine on the main output, saw on aux, at the patch's pitch.
#[derive(Debug, Default)]
struct TestTone {
    phase: f32,
}

impl Voice for TestTone {
    fn render(&mut self, patch: &Patch, modulations: &Modulations, frames: &mut [Frame]) {
        let note = patch.note + modulations.note;
        let increment = 440.0 * ((note - 69.0) / 12.0).exp2() / SAMPLE_RATE as f32;
        let level = if modulations.level_patched {
            modulations.level
        } else {
            1.0
        };
        let amplitude = level * f32::from(i16::MAX);

        for frame in frames {
            let sine = (self.phase * TAU).sin();
            let saw = 2.0 * self.phase - 1.0;
            *frame = Frame {
                out: (sine * amplitude) as i16,
                aux: (saw * amplitude) as i16,
            };
            self.phase = (self.phase + increment).fract();
        }
    }
}

/// End state of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Simulated length.
    pub duration_ms: u32,
    /// Audio blocks processed.
    pub blocks: u64,
    /// Final mode.
    pub mode: Mode,
    /// Final bank and engine within the bank.
    pub engine: (usize, usize, &'static str),
    /// Final patch.
    pub patch: Patch,
    /// Largest output sample magnitude.
    pub peak: f32,
    /// Edits not yet written to storage.
    pub unsaved: bool,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (bank, engine, name) = self.engine;
        writeln!(f, "--- {} ms, {} blocks ---", self.duration_ms, self.blocks)?;
        writeln!(
            f,
            "mode: {}  engine: B{bank} E{engine} ({name})",
            self.mode.name()
        )?;
        writeln!(
            f,
            "note: {:.1}  harmonics: {:.2}  timbre: {:.2}  morph: {:.2}",
            self.patch.note, self.patch.harmonics, self.patch.timbre, self.patch.morph
        )?;
        writeln!(f, "peak: {:.3}", self.peak)?;
        write!(
            f,
            "settings: {}",
            if self.unsaved { "unsaved edits" } else { "saved" }
        )
    }
}

/// Runs `script` for `duration_ms` against `backend`.
pub fn simulate<P: Persistence>(
    script: &Script,
    duration_ms: u32,
    backend: P,
    quiet: bool,
) -> anyhow::Result<Summary> {
    let context = SharedContext::new();
    let settings = SharedSettings::default();
    let layout = PanelLayout::default();
    let store = SettingsStore::open(backend);
    let mut panel = Panel::new(&context, &settings, store, layout);
    let mut control = ControlLoop::new(&context, &settings, &layout);
    let mut hardware = Hardware::new(script);
    let mut voice = TestTone::default();
    let mut left = [0.0f32; ENGINE_BLOCK_SIZE];
    let mut right = [0.0f32; ENGINE_BLOCK_SIZE];
    let mut peak = 0.0f32;
    let mut blocks = 0u64;

    control.prime(&hardware);

    let mut pending = script.events.iter().peekable();
    for now_ms in 0..=duration_ms {
        while let Some(event) = pending.next_if(|e| e.at_ms <= now_ms) {
            hardware.apply(event);
        }

        let out = panel.poll(&PollInput {
            now_ms,
            edit_toggle: hardware.edit,
            button: hardware.button(now_ms),
            knobs_raw: hardware.knobs,
        });
        if let Some(event) = out.event {
            println!("[{now_ms:>6} ms] {event:?}");
        }
        if !quiet && let Some(report) = out.status {
            println!("[{now_ms:>6} ms] {report}");
        }

        for _ in 0..BLOCKS_PER_MS {
            control.process(&hardware, &hardware);
            control.render(&mut voice, &mut left, &mut right);
            peak = left.iter().chain(&right).fold(peak, |p, s| p.max(s.abs()));
            blocks += 1;
        }
    }

    let engine = panel.engine();
    let summary = Summary {
        duration_ms,
        blocks,
        mode: panel.mode(),
        engine: (engine.bank(), engine.engine_in_bank(), engine.name()),
        patch: *control.patch(),
        peak,
        unsaved: panel.store().is_dirty() || settings.snapshot() != *panel.store().settings(),
    };
    if summary.unsaved {
        tracing::warn!("simulate: session ended with uncommitted settings");
    }
    Ok(summary)
}
