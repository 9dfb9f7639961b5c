//! Panelkit Core - control-conditioning primitives for instrument front panels
//!
//! This crate turns raw, noisy, shared analog readings into clean parameter
//! values. Everything here runs inside the audio callback: no allocation, no
//! locks, constant work per call.
//!
//! # Core Abstractions
//!
//! ## Channel Filtering
//!
//! - [`ChannelFilter`] - One-pole smoothing of a normalized ADC lane
//! - [`DeadZone`] - Rescales pots that never reach their rails
//! - [`ChannelBank`] - Fixed-size group of lanes updated per block
//!
//! ## Pick-up / Catch-up
//!
//! - [`CatchUp`] - Reconciles a knob position with a stored value after a
//!   page or mode switch
//! - [`CatchUpBank`] - One controller per knob for a whole context
//! - [`CatchUpPolicy`] - Immediate tracking or skew-based convergence
//!
//! ## CV Mapping
//!
//! - [`CvMapping`] - Attenuverter link from a CV lane to a parameter
//! - [`resolve`] - Applies a mapping to a base value
//!
//! # no_std Support
//!
//! Disable the default `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! panelkit-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use panelkit_core::{CatchUpBank, CatchUpPolicy, ChannelBank};
//!
//! let mut knobs = ChannelBank::<4>::uniform(0.01);
//! let mut catchers = CatchUpBank::<4>::new(CatchUpPolicy::Skew);
//!
//! // Every audio block:
//! knobs.update(&[0.5, 0.5, 0.5, 0.5]);
//! let values = catchers.process_all(&knobs.filtered());
//! assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod catch_up;
pub mod channel;
pub mod cv_mapping;
pub mod math;

pub use catch_up::{
    CATCH_THRESHOLD, CatchUp, CatchUpBank, CatchUpPolicy, CatchUpState, MAX_SKEW, MIN_DELTA,
    MIN_SKEW, MOVEMENT_THRESHOLD, skew_ratio,
};
pub use channel::{ChannelBank, ChannelFilter, DeadZone, EDGE_SNAP_MARGIN};
pub use cv_mapping::{Bounds, CvMapping, resolve, resolve_within};
pub use math::{clamp_bipolar, clamp_unit, distance, snap_to_edges, to_bipolar, to_unipolar};
