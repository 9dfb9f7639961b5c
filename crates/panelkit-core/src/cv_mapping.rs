//! Attenuverter emulation for CV inputs routed to parameters.
//!
//! A [`CvMapping`] links one parameter to one CV lane. The CV reading
//! (normalized `[0, 1]`, 0 V at `0.5`) is converted to bipolar, scaled by the
//! attenuverter depth and added to a captured *origin*:
//!
//! ```text
//! effective = clamp(origin + (2·reading − 1) · depth, lo, hi)
//! ```
//!
//! The origin is captured once, when the mapping is armed. It is not
//! re-captured when unrelated parameters change, otherwise the centre of the
//! attenuverted swing drifts.
//!
//! # Example
//!
//! ```rust
//! use panelkit_core::{CvMapping, resolve};
//!
//! let mut timbre = CvMapping::unmapped();
//! assert_eq!(resolve(0.3, 0.9, &timbre), 0.3);
//!
//! timbre.arm(1, 0.4);
//! timbre.set_attenuverter(-0.5);
//! // CV at +full scale, inverted at half depth: 0.4 - 0.5
//! let v = resolve(0.3, 1.0, &timbre);
//! assert!((v - 0.0).abs() < 1e-6);
//! ```

use crate::math::{clamp_bipolar, clamp_unit, to_bipolar};

/// Inclusive value range a mapping result is clamped to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Lower bound.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
}

impl Bounds {
    /// The normalized range `[0, 1]`.
    pub const UNIT: Self = Self { min: 0.0, max: 1.0 };

    /// The bipolar range `[-1, 1]`.
    pub const BIPOLAR: Self = Self {
        min: -1.0,
        max: 1.0,
    };

    /// Clamps a value into these bounds. NaN maps to `min`.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

/// One parameter's link to an external modulation lane.
///
/// # Invariants
///
/// - `attenuverter` is in `[-1, 1]`
/// - `origin` is in `[0, 1]`
/// - an active mapping always has a channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CvMapping {
    channel: Option<u8>,
    attenuverter: f32,
    origin: f32,
    active: bool,
}

impl CvMapping {
    /// Creates an inactive, unmapped link (depth 1.0, origin 0.5).
    pub const fn unmapped() -> Self {
        Self {
            channel: None,
            attenuverter: 1.0,
            origin: 0.5,
            active: false,
        }
    }

    /// Routes `channel` to this parameter and captures `origin` as the centre.
    ///
    /// Call exactly once per arming; see the module docs.
    pub fn arm(&mut self, channel: u8, origin: f32) {
        self.channel = Some(channel);
        self.origin = clamp_unit(origin);
        self.active = true;

        #[cfg(feature = "tracing")]
        tracing::debug!(channel, origin = self.origin, "cv_mapping: armed");
    }

    /// Deactivates the mapping. The channel assignment and depth are kept so
    /// a later [`arm`](Self::arm) restores the same routing.
    pub fn disarm(&mut self) {
        self.active = false;
    }

    /// Moves the centre after the parameter's own base control moved.
    ///
    /// This is for related changes only; it is a no-op on inactive mappings.
    pub fn rebase(&mut self, origin: f32) {
        if self.active {
            self.origin = clamp_unit(origin);
        }
    }

    /// Sets the attenuverter depth, clamped to `[-1, 1]`.
    pub fn set_attenuverter(&mut self, depth: f32) {
        self.attenuverter = clamp_bipolar(depth);
    }

    /// Routed channel, if any.
    #[inline]
    pub fn channel(&self) -> Option<u8> {
        self.channel
    }

    /// Attenuverter depth.
    #[inline]
    pub fn attenuverter(&self) -> f32 {
        self.attenuverter
    }

    /// Captured origin.
    #[inline]
    pub fn origin(&self) -> f32 {
        self.origin
    }

    /// True when routed and active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active && self.channel.is_some()
    }

    /// Bipolar contribution of a CV reading at the current depth.
    #[inline]
    pub fn contribution(&self, reading: f32) -> f32 {
        to_bipolar(reading) * self.attenuverter
    }
}

impl Default for CvMapping {
    fn default() -> Self {
        Self::unmapped()
    }
}

/// Resolves a parameter value through its CV mapping, clamped to `[0, 1]`.
///
/// Inactive mappings return `base` unchanged.
#[inline]
pub fn resolve(base: f32, reading: f32, mapping: &CvMapping) -> f32 {
    resolve_within(base, reading, mapping, Bounds::UNIT)
}

/// Resolves a parameter value through its CV mapping, clamped to `bounds`.
#[inline]
pub fn resolve_within(base: f32, reading: f32, mapping: &CvMapping, bounds: Bounds) -> f32 {
    if !mapping.is_active() {
        return base;
    }
    bounds.clamp(mapping.origin + mapping.contribution(reading))
}
