//! Lock-free handoff between the polling loop and the control loop.
//!
//! The polling loop is the only writer of the context: mode, page, engine
//! and the catch-up arm requests. The control loop is the only writer of the
//! telemetry: live play values, filtered lanes and catch-up states.
//!
//! # Snapshot word
//!
//! Mode, page, readiness, engine and a generation counter are packed into a
//! single `AtomicU32` so the control loop never sees a half-updated
//! context:
//!
//! ```text
//!  31            16 15      8 7   5  4   3 2  1 0
//! ┌────────────────┬─────────┬─────┬───┬────┬────┐
//! │   generation   │ engine  │  -  │ R │page│mode│
//! └────────────────┴─────────┴─────┴───┴────┴────┘
//! ```
//!
//! # Arm requests
//!
//! A mode or page transition arms one catch-up bank with stored values and
//! knob baselines. These eight floats cannot be swapped atomically, so they
//! sit behind a sequence word. The writer flags the word while copying and
//! publishes the request's generation when done. The reader accepts a copy
//! only if the word is unflagged, equal before and after the copy, and
//! equal to the snapshot's generation. A rejected copy is retried next block.
//!
//! Transition order on the polling side:
//!
//! 1. [`begin_transition`](SharedContext::begin_transition) clears ready
//! 2. the caller updates settings
//! 3. [`request_arm`](SharedContext::request_arm) writes the request and
//!    publishes `{mode, page, ready, generation + 1}`

use core::sync::atomic::{AtomicU32, Ordering, fence};

use panelkit_core::CatchUpState;

use crate::ui::{Mode, Page};
use crate::{CV_COUNT, KNOB_COUNT};

/// Sequence-word flag set while an arm request is being written.
const WRITING: u32 = 1 << 31;

const MODE_MASK: u32 = 0b11;
const PAGE_SHIFT: u32 = 2;
const PAGE_MASK: u32 = 0b11;
const READY_BIT: u32 = 1 << 4;
const ENGINE_SHIFT: u32 = 8;
const ENGINE_MASK: u32 = 0xFF;
const GENERATION_SHIFT: u32 = 16;

/// Default live play value before the first block.
const NEUTRAL: f32 = 0.5;

/// Decoded snapshot word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextSnapshot {
    /// Current mode.
    pub mode: Mode,
    /// Current edit page.
    pub page: Page,
    /// Settings writes are allowed.
    pub ready: bool,
    /// Selected engine.
    pub engine: u8,
    /// Generation of the latest arm request (0 = none yet).
    pub generation: u16,
}

impl ContextSnapshot {
    /// Packs into the snapshot word.
    pub const fn pack(self) -> u32 {
        let ready = if self.ready { READY_BIT } else { 0 };
        self.mode.to_bits()
            | ((self.page.index() as u32 & PAGE_MASK) << PAGE_SHIFT)
            | ready
            | ((self.engine as u32) << ENGINE_SHIFT)
            | ((self.generation as u32) << GENERATION_SHIFT)
    }

    /// Unpacks a snapshot word.
    pub const fn unpack(word: u32) -> Self {
        Self {
            mode: Mode::from_bits(word & MODE_MASK),
            page: Page::new(((word >> PAGE_SHIFT) & PAGE_MASK) as u8),
            ready: word & READY_BIT != 0,
            engine: ((word >> ENGINE_SHIFT) & ENGINE_MASK) as u8,
            generation: (word >> GENERATION_SHIFT) as u16,
        }
    }
}

/// Which catch-up bank a request arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmTarget {
    /// The play bank (skew policy).
    Play,
    /// The edit bank (immediate policy).
    Edit,
}

impl ArmTarget {
    const fn to_bits(self) -> u32 {
        match self {
            ArmTarget::Play => 0,
            ArmTarget::Edit => 1,
        }
    }

    const fn from_bits(bits: u32) -> Self {
        if bits == 1 {
            ArmTarget::Edit
        } else {
            ArmTarget::Play
        }
    }
}

/// Stored values and baselines for one bank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmRequest {
    /// Bank to arm.
    pub target: ArmTarget,
    /// Value each slot holds until its knob moves.
    pub stored: [f32; KNOB_COUNT],
    /// Conditioned knob positions at the moment of the transition.
    pub baseline: [f32; KNOB_COUNT],
}

/// Context and telemetry shared by both loops.
#[derive(Debug)]
pub struct SharedContext {
    snapshot: AtomicU32,
    arm_sequence: AtomicU32,
    arm_target: AtomicU32,
    arm_stored: [AtomicU32; KNOB_COUNT],
    arm_baseline: [AtomicU32; KNOB_COUNT],
    play_values: [AtomicU32; KNOB_COUNT],
    knobs: [AtomicU32; KNOB_COUNT],
    cvs: [AtomicU32; CV_COUNT],
    states: AtomicU32,
    patch_values: [AtomicU32; 4],
}

fn atomics<const N: usize>(value: f32) -> [AtomicU32; N] {
    core::array::from_fn(|_| AtomicU32::new(value.to_bits()))
}

fn load_all<const N: usize>(slots: &[AtomicU32; N], order: Ordering) -> [f32; N] {
    core::array::from_fn(|i| f32::from_bits(slots[i].load(order)))
}

fn store_all<const N: usize>(slots: &[AtomicU32; N], values: &[f32; N], order: Ordering) {
    for (slot, v) in slots.iter().zip(values) {
        slot.store(v.to_bits(), order);
    }
}

impl Default for SharedContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedContext {
    /// Play mode, page 0, engine 0, not ready, no arm request.
    pub fn new() -> Self {
        Self {
            snapshot: AtomicU32::new(ContextSnapshot::default().pack()),
            arm_sequence: AtomicU32::new(0),
            arm_target: AtomicU32::new(0),
            arm_stored: atomics(NEUTRAL),
            arm_baseline: atomics(NEUTRAL),
            play_values: atomics(NEUTRAL),
            knobs: atomics(0.0),
            cvs: atomics(NEUTRAL),
            states: AtomicU32::new(0),
            patch_values: atomics(0.0),
        }
    }

    /// Current snapshot.
    #[inline]
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot::unpack(self.snapshot.load(Ordering::Acquire))
    }

    fn store_snapshot(&self, snapshot: ContextSnapshot) {
        self.snapshot.store(snapshot.pack(), Ordering::Release);
    }

    // ---- polling-loop side ----

    /// Clears ready, keeping everything else. Settings writes from the
    /// control loop stop from the next block on.
    pub fn begin_transition(&self) {
        let snapshot = self.snapshot();
        self.store_snapshot(ContextSnapshot {
            ready: false,
            ..snapshot
        });
    }

    /// Writes an arm request and publishes a ready snapshot for `mode`/`page`
    /// under a new generation. Returns that generation.
    pub fn request_arm(&self, mode: Mode, page: Page, request: &ArmRequest) -> u16 {
        let current = self.snapshot();
        let generation = match current.generation.wrapping_add(1) {
            0 => 1,
            g => g,
        };
        let tag = u32::from(generation);

        self.arm_sequence.store(tag | WRITING, Ordering::Relaxed);
        fence(Ordering::Release);
        self.arm_target.store(request.target.to_bits(), Ordering::Relaxed);
        store_all(&self.arm_stored, &request.stored, Ordering::Relaxed);
        store_all(&self.arm_baseline, &request.baseline, Ordering::Relaxed);
        self.arm_sequence.store(tag, Ordering::Release);

        self.store_snapshot(ContextSnapshot {
            mode,
            page,
            ready: true,
            engine: current.engine,
            generation,
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(generation, target = ?request.target, "shared: arm request published");

        generation
    }

    /// Publishes the selected engine. Mode, page, ready and generation are kept.
    pub fn set_engine(&self, engine: u8) {
        let snapshot = self.snapshot();
        self.store_snapshot(ContextSnapshot { engine, ..snapshot });
    }

    // ---- control-loop side ----

    /// Copies the arm request for `generation`.
    ///
    /// Returns `None` while the request is being written or when a newer one
    /// has replaced it; the caller retries on the next block.
    pub fn read_arm_request(&self, generation: u16) -> Option<ArmRequest> {
        let before = self.arm_sequence.load(Ordering::Acquire);
        if before & WRITING != 0 || before != u32::from(generation) {
            return None;
        }
        let target = ArmTarget::from_bits(self.arm_target.load(Ordering::Relaxed));
        let stored = load_all(&self.arm_stored, Ordering::Relaxed);
        let baseline = load_all(&self.arm_baseline, Ordering::Relaxed);
        fence(Ordering::Acquire);
        let after = self.arm_sequence.load(Ordering::Relaxed);
        (before == after).then_some(ArmRequest {
            target,
            stored,
            baseline,
        })
    }

    /// Publishes the play bank outputs (pitch knob, harmonics, timbre, morph).
    pub fn publish_play_values(&self, values: &[f32; KNOB_COUNT]) {
        store_all(&self.play_values, values, Ordering::Release);
    }

    /// Publishes filtered knob and CV lanes.
    pub fn publish_channels(&self, knobs: &[f32; KNOB_COUNT], cvs: &[f32; CV_COUNT]) {
        store_all(&self.knobs, knobs, Ordering::Release);
        store_all(&self.cvs, cvs, Ordering::Release);
    }

    /// Publishes the active bank's catch-up states.
    pub fn publish_states(&self, states: &[CatchUpState; KNOB_COUNT]) {
        let packed = states
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, s)| acc | (u32::from(s.to_bits()) << (i * 8)));
        self.states.store(packed, Ordering::Release);
    }

    /// Publishes resolved note, harmonics, timbre and morph.
    pub fn publish_patch(&self, note: f32, harmonics: f32, timbre: f32, morph: f32) {
        store_all(
            &self.patch_values,
            &[note, harmonics, timbre, morph],
            Ordering::Release,
        );
    }

    // ---- telemetry reads ----

    /// Last published play values.
    pub fn play_values(&self) -> [f32; KNOB_COUNT] {
        load_all(&self.play_values, Ordering::Acquire)
    }

    /// Last published filtered knobs.
    pub fn knobs(&self) -> [f32; KNOB_COUNT] {
        load_all(&self.knobs, Ordering::Acquire)
    }

    /// Last published filtered CVs.
    pub fn cvs(&self) -> [f32; CV_COUNT] {
        load_all(&self.cvs, Ordering::Acquire)
    }

    /// Last published catch-up states.
    pub fn catch_up_states(&self) -> [CatchUpState; KNOB_COUNT] {
        let packed = self.states.load(Ordering::Acquire);
        core::array::from_fn(|i| CatchUpState::from_bits((packed >> (i * 8)) as u8))
    }

    /// Last published `[note, harmonics, timbre, morph]`.
    pub fn patch_values(&self) -> [f32; 4] {
        load_all(&self.patch_values, Ordering::Acquire)
    }
}
