//! Table-driven edit pages.
//!
//! Each [`PageSpec`] binds the four knobs to settings fields and names the
//! page's long-press action. Both the polling loop (arming catch-up with the
//! page's stored values) and the control loop (writing knob values back)
//! dispatch through [`PAGES`], so adding a page means adding a row.
//!
//! | Page | K1 | K2 | K3 | K4 | Long press |
//! |------|----|----|----|----|------------|
//! | ATTEN | FM | Timbre mod | Morph mod | Harm mod | reset depths |
//! | LPG | Decay | Colour | Level | - | cycle envelope |
//! | TUNE | Octave | Fine | - | - | calibrate |

use panelkit_config::{MAX_OCTAVE, Settings, SettingsField, SharedSettings};
use panelkit_core::{CatchUpState, clamp_unit};

use crate::KNOB_COUNT;
use crate::ui::{PAGE_COUNT, Page};

/// Knob position of reserved slots.
const RESERVED_POSITION: f32 = 0.5;

/// Divisor quantizing a knob into `MAX_OCTAVE + 1` octave buckets.
const OCTAVE_SPAN: f32 = MAX_OCTAVE as f32 + 0.99;

/// How a settings value maps onto knob travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotScale {
    /// `[0, 1]` value, knob position as-is.
    Unipolar,
    /// `[-1, 1]` value, centre detent at half travel.
    Bipolar,
    /// Integer octave `0..=8`, quantized.
    Octave,
}

impl SlotScale {
    /// Knob position representing `value`.
    pub fn to_knob(self, value: f32) -> f32 {
        match self {
            SlotScale::Unipolar => clamp_unit(value),
            SlotScale::Bipolar => clamp_unit((value + 1.0) * 0.5),
            // Centre of the bucket so that from_knob(to_knob(o)) == o.
            SlotScale::Octave => clamp_unit((value + 0.5) / OCTAVE_SPAN),
        }
    }

    /// Settings value for knob position `knob`.
    pub fn from_knob(self, knob: f32) -> f32 {
        let k = clamp_unit(knob);
        match self {
            SlotScale::Unipolar => k,
            SlotScale::Bipolar => k * 2.0 - 1.0,
            SlotScale::Octave => libm::floorf(k * OCTAVE_SPAN).min(f32::from(MAX_OCTAVE)),
        }
    }
}

/// One knob's binding on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotBinding {
    /// Settings field the knob edits.
    pub field: SettingsField,
    /// Knob-to-value mapping.
    pub scale: SlotScale,
}

impl SlotBinding {
    const fn new(field: SettingsField, scale: SlotScale) -> Self {
        Self { field, scale }
    }
}

/// Action fired by a long press on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongPressAction {
    /// Zero all four attenuverters and re-arm the knobs at centre.
    ResetAttenuverters,
    /// Drone → Ping → External.
    CycleEnvelopeMode,
    /// Start V/oct calibration.
    EnterCalibration,
}

/// Static description of one edit page.
#[derive(Debug, Clone, Copy)]
pub struct PageSpec {
    /// Short name for status lines.
    pub name: &'static str,
    /// Knob bindings; `None` is a reserved slot.
    pub slots: [Option<SlotBinding>; KNOB_COUNT],
    /// Long-press behaviour.
    pub long_press: LongPressAction,
    /// LED blink period identifying the page.
    pub blink_period_ms: u32,
}

/// The edit pages, indexed by [`Page::index`].
pub const PAGES: [PageSpec; PAGE_COUNT] = [
    PageSpec {
        name: "ATTEN",
        slots: [
            Some(SlotBinding::new(SettingsField::FmAmount, SlotScale::Bipolar)),
            Some(SlotBinding::new(SettingsField::TimbreMod, SlotScale::Bipolar)),
            Some(SlotBinding::new(SettingsField::MorphMod, SlotScale::Bipolar)),
            Some(SlotBinding::new(SettingsField::HarmonicsMod, SlotScale::Bipolar)),
        ],
        long_press: LongPressAction::ResetAttenuverters,
        blink_period_ms: 1000,
    },
    PageSpec {
        name: "LPG",
        slots: [
            Some(SlotBinding::new(SettingsField::Decay, SlotScale::Unipolar)),
            Some(SlotBinding::new(SettingsField::LpgColour, SlotScale::Unipolar)),
            Some(SlotBinding::new(SettingsField::OutputLevel, SlotScale::Unipolar)),
            None,
        ],
        long_press: LongPressAction::CycleEnvelopeMode,
        blink_period_ms: 500,
    },
    PageSpec {
        name: "TUNE",
        slots: [
            Some(SlotBinding::new(SettingsField::Octave, SlotScale::Octave)),
            Some(SlotBinding::new(SettingsField::FineTune, SlotScale::Bipolar)),
            None,
            None,
        ],
        long_press: LongPressAction::EnterCalibration,
        blink_period_ms: 250,
    },
];

impl PageSpec {
    /// Looks up a page.
    pub fn of(page: Page) -> &'static PageSpec {
        &PAGES[page.index()]
    }

    /// Knob positions representing the page's stored settings.
    pub fn knob_values(&self, settings: &Settings) -> [f32; KNOB_COUNT] {
        core::array::from_fn(|i| {
            self.slots[i].map_or(RESERVED_POSITION, |slot| {
                slot.scale.to_knob(settings.get(slot.field))
            })
        })
    }

    /// Writes knob values back to settings.
    ///
    /// Slots whose controller is still waiting are skipped, so an untouched
    /// knob never rewrites its setting.
    pub fn write(
        &self,
        knobs: &[f32; KNOB_COUNT],
        states: &[CatchUpState; KNOB_COUNT],
        settings: &SharedSettings,
    ) {
        for ((slot, &knob), &state) in self.slots.iter().zip(knobs).zip(states) {
            if let Some(binding) = slot
                && state != CatchUpState::Waiting
            {
                settings.set(binding.field, binding.scale.from_knob(knob));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bipolar_mapping() {
        assert_eq!(SlotScale::Bipolar.to_knob(0.3), 0.65);
        assert_eq!(SlotScale::Bipolar.to_knob(-1.0), 0.0);
        assert_eq!(SlotScale::Bipolar.from_knob(1.0), 1.0);
        assert_eq!(SlotScale::Bipolar.from_knob(0.5), 0.0);
    }

    #[test]
    fn octave_round_trips_every_setting() {
        for octave in 0..=MAX_OCTAVE {
            let o = f32::from(octave);
            assert_eq!(SlotScale::Octave.from_knob(SlotScale::Octave.to_knob(o)), o);
        }
        assert_eq!(SlotScale::Octave.from_knob(0.0), 0.0);
        assert_eq!(SlotScale::Octave.from_knob(1.0), 8.0);
    }

    #[test]
    fn page_zero_stored_values_are_mapped_to_knob_space() {
        let settings = Settings {
            fm_amount: 0.3,
            timbre_mod: -0.1,
            morph_mod: 0.0,
            harmonics_mod: 0.2,
            ..Settings::default()
        };
        let values = PAGES[0].knob_values(&settings);
        let expected = [0.65, 0.45, 0.5, 0.6];
        for (v, e) in values.iter().zip(expected) {
            assert!((v - e).abs() < 1e-6, "{v} vs {e}");
        }
    }

    #[test]
    fn reserved_slots_read_centre() {
        let values = PageSpec::of(Page::TUNING).knob_values(&Settings::default());
        assert_eq!(values[2], 0.5);
        assert_eq!(values[3], 0.5);
    }

    #[test]
    fn write_skips_waiting_and_reserved_slots() {
        let shared = SharedSettings::default();
        let states = [
            CatchUpState::Tracking,
            CatchUpState::Waiting,
            CatchUpState::Tracking,
            CatchUpState::Tracking,
        ];
        PageSpec::of(Page::LPG).write(&[0.9, 0.9, 0.2, 0.9], &states, &shared);
        let s = shared.snapshot();
        assert_eq!(s.decay, 0.9);
        assert_eq!(s.lpg_colour, Settings::default().lpg_colour);
        assert_eq!(s.output_level, 0.2);
    }

    #[test]
    fn long_press_actions_by_page() {
        assert_eq!(PAGES[0].long_press, LongPressAction::ResetAttenuverters);
        assert_eq!(PAGES[1].long_press, LongPressAction::CycleEnvelopeMode);
        assert_eq!(PAGES[2].long_press, LongPressAction::EnterCalibration);
    }
}
