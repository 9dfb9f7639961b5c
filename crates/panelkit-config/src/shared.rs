//! Lock-free settings shared between the audio callback and the polling loop.
//!
//! [`SharedSettings`] stores each [`SettingsField`] as an `f32` bit pattern in
//! its own `AtomicU32`. The audio callback writes the fields of the page being
//! edited; the polling loop takes [`snapshot`](SharedSettings::snapshot)s for
//! display and persistence and publishes whole records after loads,
//! resets and calibration.
//!
//! Individual fields are never torn. A snapshot taken while the callback is
//! mid-block may mix old and new fields of the edited page, which is harmless
//! because the next snapshot catches up and persistence is debounced.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::settings::{FIELD_COUNT, SIGNATURE, Settings, SettingsField};

/// Atomic mirror of a [`Settings`] record.
#[derive(Debug)]
pub struct SharedSettings {
    values: [AtomicU32; FIELD_COUNT],
}

impl SharedSettings {
    /// Creates a mirror initialized from `settings`.
    pub fn new(settings: &Settings) -> Self {
        let shared = Self {
            values: core::array::from_fn(|_| AtomicU32::new(0)),
        };
        shared.publish(settings);
        shared
    }

    /// Reads one field.
    #[inline]
    pub fn get(&self, field: SettingsField) -> f32 {
        f32::from_bits(self.values[field.index()].load(Ordering::Acquire))
    }

    /// Writes one field, clamped to its range.
    #[inline]
    pub fn set(&self, field: SettingsField, value: f32) {
        self.values[field.index()].store(field.clamp(value).to_bits(), Ordering::Release);
    }

    /// Publishes a whole record.
    pub fn publish(&self, settings: &Settings) {
        for field in SettingsField::ALL {
            self.set(field, settings.get(field));
        }
    }

    /// Assembles a record from the current field values.
    pub fn snapshot(&self) -> Settings {
        let mut settings = Settings {
            signature: SIGNATURE,
            ..Settings::default()
        };
        for field in SettingsField::ALL {
            settings.set(field, self.get(field));
        }
        settings
    }
}

impl Default for SharedSettings {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}
