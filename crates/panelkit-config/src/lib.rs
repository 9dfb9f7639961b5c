//! Settings record, storage and sharing for panelkit.
//!
//! This crate owns everything the panel persists:
//!
//! - **Settings**: the fixed-size, signature-checked record of user
//!   configuration and its binary codec
//! - **Persistence**: backend trait plus an in-memory (flash stand-in) and a
//!   TOML file backend
//! - **SettingsStore**: defaults-on-corruption loading and dirty-checked saving
//! - **SharedSettings**: per-field atomics read and written from both the
//!   audio callback and the polling loop
//!
//! # Example
//!
//! ```rust
//! use panelkit_config::{LoadOutcome, MemoryPersistence, SettingsStore, SharedSettings};
//!
//! let mut store = SettingsStore::open(MemoryPersistence::new());
//! assert_eq!(store.outcome(), LoadOutcome::Initialized);
//!
//! let shared = SharedSettings::new(store.settings());
//! // ... audio callback edits fields through `shared` ...
//! store.update(shared.snapshot());
//! store.commit().unwrap();
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

mod error;
mod persistence;
mod settings;
mod shared;

pub use error::ConfigError;
#[cfg(feature = "std")]
pub use persistence::FilePersistence;
pub use persistence::{LoadOutcome, MemoryPersistence, Persistence, SettingsStore};
pub use settings::{
    EnvelopeMode, FIELD_COUNT, MAX_OCTAVE, RECORD_SIZE, SIGNATURE, Settings, SettingsField,
};
pub use shared::SharedSettings;
