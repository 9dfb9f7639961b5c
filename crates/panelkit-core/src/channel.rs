//! Per-lane smoothing of normalized analog readings.
//!
//! Each physical analog input (knob or CV jack) gets one [`ChannelFilter`]: a
//! one-pole exponential smoother with the difference equation
//!
//! ```text
//! y[n] = y[n-1] + coeff * (x[n] - y[n-1])
//! ```
//!
//! Unlike an audio one-pole, `coeff` is specified directly rather than derived
//! from a cutoff frequency: the filter runs once per audio *block*, so the
//! useful tuning knob is "fraction of the remaining distance per block".
//!
//! | Lane class | Typical `coeff` | Character |
//! |------------|-----------------|-----------|
//! | Pitch knobs | 0.005 | silky, slow |
//! | Timbre knobs | 0.01 | medium |
//! | CV jacks | 0.01 - 0.05 | responsive |
//!
//! # Dead-zone rescaling
//!
//! Some pots never reach the rails electrically (e.g. `[0.025, 0.97]`).
//! A [`DeadZone`] rescales that measured span to `[0, 1]` before filtering and
//! snaps the output to exact 0/1 near the edges.
//!
//! ```rust
//! use panelkit_core::ChannelFilter;
//!
//! let mut knob = ChannelFilter::new(0.05);
//! for _ in 0..500 {
//!     knob.update(0.8);
//! }
//! assert!((knob.filtered() - 0.8).abs() < 1e-3);
//! ```

use crate::math::{clamp_unit, snap_to_edges};

/// Distance from the rails within which a dead-zone channel snaps to 0 or 1.
pub const EDGE_SNAP_MARGIN: f32 = 0.01;

/// Measured electrical span of a pot that does not reach its rails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeadZone {
    /// Raw reading at the counter-clockwise stop.
    pub low: f32,
    /// Raw reading at the clockwise stop.
    pub high: f32,
}

impl DeadZone {
    /// The span measured on the reference panel.
    pub const MEASURED: Self = Self {
        low: 0.025,
        high: 0.97,
    };

    /// Creates a dead zone. `high` must be greater than `low`; a degenerate
    /// span falls back to the identity mapping.
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    /// Rescales a raw reading from `[low, high]` to `[0, 1]`, clamped.
    #[inline]
    pub fn rescale(&self, raw: f32) -> f32 {
        let span = self.high - self.low;
        if span <= f32::EPSILON {
            return clamp_unit(raw);
        }
        clamp_unit((raw - self.low) / span)
    }
}

/// One-pole smoother for a single analog lane.
///
/// # Invariants
///
/// - `coeff` is in `(0, 1]`
/// - with a dead zone configured, `filtered()` is always in `[0, 1]`
#[derive(Debug, Clone)]
pub struct ChannelFilter {
    coeff: f32,
    raw: f32,
    state: f32,
    dead_zone: Option<DeadZone>,
}

impl ChannelFilter {
    /// Creates a filter starting at 0.0.
    ///
    /// `coeff` is clamped to `(0, 1]`; 1.0 disables smoothing.
    pub fn new(coeff: f32) -> Self {
        Self {
            coeff: coeff.clamp(f32::EPSILON, 1.0),
            raw: 0.0,
            state: 0.0,
            dead_zone: None,
        }
    }

    /// Adds dead-zone rescaling and edge snapping to this lane.
    pub fn with_dead_zone(mut self, dead_zone: DeadZone) -> Self {
        self.dead_zone = Some(dead_zone);
        self
    }

    /// Returns the smoothing coefficient.
    #[inline]
    pub fn coeff(&self) -> f32 {
        self.coeff
    }

    /// Returns the configured dead zone, if any.
    pub fn dead_zone(&self) -> Option<DeadZone> {
        self.dead_zone
    }

    /// Maps a raw reading into the space the filter integrates in.
    ///
    /// This is the same conditioning [`update`](Self::update) applies before
    /// smoothing; the UI uses it to build catch-up baselines that are
    /// comparable with filtered output.
    #[inline]
    pub fn condition(&self, raw: f32) -> f32 {
        match self.dead_zone {
            Some(dz) => dz.rescale(raw),
            None => raw,
        }
    }

    /// Feeds one raw reading and returns the new filtered value.
    #[inline]
    pub fn update(&mut self, raw: f32) -> f32 {
        self.raw = raw;
        let input = self.condition(raw);
        self.state += self.coeff * (input - self.state);
        self.filtered()
    }

    /// Returns the current filtered value without advancing.
    #[inline]
    pub fn filtered(&self) -> f32 {
        match self.dead_zone {
            Some(_) => snap_to_edges(clamp_unit(self.state), EDGE_SNAP_MARGIN),
            None => self.state,
        }
    }

    /// Returns the last raw reading passed to [`update`](Self::update).
    #[inline]
    pub fn raw(&self) -> f32 {
        self.raw
    }

    /// Primes the filter so its output starts at `value` (no ramp from 0).
    pub fn reset(&mut self, value: f32) {
        self.raw = value;
        self.state = self.condition(value);
    }
}

/// Fixed-size group of channel filters updated together every block.
#[derive(Debug, Clone)]
pub struct ChannelBank<const N: usize> {
    filters: [ChannelFilter; N],
}

impl<const N: usize> ChannelBank<N> {
    /// Creates a bank with one coefficient per lane.
    pub fn new(coeffs: [f32; N]) -> Self {
        Self {
            filters: coeffs.map(ChannelFilter::new),
        }
    }

    /// Creates a bank with the same coefficient on every lane.
    pub fn uniform(coeff: f32) -> Self {
        Self::new([coeff; N])
    }

    /// Applies a dead zone to every lane.
    pub fn with_dead_zone(mut self, dead_zone: DeadZone) -> Self {
        for filter in &mut self.filters {
            filter.dead_zone = Some(dead_zone);
        }
        self
    }

    /// Updates every lane from a block of raw readings.
    #[inline]
    pub fn update(&mut self, raw: &[f32; N]) {
        for (filter, &r) in self.filters.iter_mut().zip(raw) {
            filter.update(r);
        }
    }

    /// Returns all filtered values.
    #[inline]
    pub fn filtered(&self) -> [f32; N] {
        core::array::from_fn(|i| self.filters[i].filtered())
    }

    /// Returns the filtered value of one lane (0.0 for out-of-range lanes).
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.filters.get(index).map_or(0.0, ChannelFilter::filtered)
    }

    /// Returns the last raw value of one lane (0.0 for out-of-range lanes).
    #[inline]
    pub fn raw(&self, index: usize) -> f32 {
        self.filters.get(index).map_or(0.0, ChannelFilter::raw)
    }

    /// Returns a lane's filter.
    pub fn lane(&self, index: usize) -> Option<&ChannelFilter> {
        self.filters.get(index)
    }

    /// Conditions raw readings the way each lane would (see [`ChannelFilter::condition`]).
    pub fn condition(&self, raw: &[f32; N]) -> [f32; N] {
        core::array::from_fn(|i| self.filters[i].condition(raw[i]))
    }

    /// Primes every lane to the given readings.
    pub fn reset(&mut self, values: &[f32; N]) {
        for (filter, &v) in self.filters.iter_mut().zip(values) {
            filter.reset(v);
        }
    }

    /// Number of lanes.
    pub const fn len(&self) -> usize {
        N
    }

    /// Returns true for a zero-lane bank.
    pub const fn is_empty(&self) -> bool {
        N == 0
    }
}
