//! Small numeric helpers shared by the control path.
//!
//! Every control value in this crate lives in one of two spaces:
//!
//! - **unipolar** `[0, 1]`: what the ADC reports for knobs and CV jacks
//! - **bipolar** `[-1, 1]`: attenuverter depths and centred CV
//!
//! All helpers are branch-light and allocation-free so they can run inside
//! the audio callback.

/// Clamps a value to the unit range `[0, 1]`.
///
/// NaN maps to `0.0` so a glitching ADC can never poison downstream state.
///
/// # Example
///
/// ```rust
/// use panelkit_core::clamp_unit;
///
/// assert_eq!(clamp_unit(1.3), 1.0);
/// assert_eq!(clamp_unit(-0.2), 0.0);
/// assert_eq!(clamp_unit(f32::NAN), 0.0);
/// ```
#[inline]
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Clamps a value to the bipolar range `[-1, 1]`. NaN maps to `0.0`.
#[inline]
pub fn clamp_bipolar(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Converts a unipolar reading `[0, 1]` to bipolar `[-1, 1]`.
///
/// `0.5` (a CV jack at 0 V) maps to exactly `0.0`.
#[inline]
pub fn to_bipolar(unipolar: f32) -> f32 {
    (unipolar - 0.5) * 2.0
}

/// Converts a bipolar value `[-1, 1]` to unipolar `[0, 1]`.
#[inline]
pub fn to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}

/// Absolute difference between two values.
#[inline]
pub fn distance(a: f32, b: f32) -> f32 {
    libm::fabsf(a - b)
}

/// Snaps values within `margin` of the unit range edges to exactly 0 or 1.
///
/// Pots rarely reach their mechanical end stops electrically; this lets a
/// displayed value read exactly 0% / 100%.
#[inline]
pub fn snap_to_edges(value: f32, margin: f32) -> f32 {
    if value < margin {
        0.0
    } else if value > 1.0 - margin {
        1.0
    } else {
        value
    }
}
