//! Settings storage backends and the debounced store.
//!
//! A [`Persistence`] backend moves whole [`Settings`] records in and out of
//! non-volatile storage. [`SettingsStore`] sits on top and owns the policy:
//!
//! - on open, an absent or invalid record is replaced by defaults and
//!   re-saved immediately;
//! - [`commit`](SettingsStore::commit) writes only when the record differs
//!   from what was last saved, bounding flash wear.
//!
//! # Backends
//!
//! | Backend | Encoding | Feature |
//! |---------|----------|---------|
//! | [`MemoryPersistence`] | fixed-size binary record | always |
//! | [`FilePersistence`] | TOML file | `std` |

use crate::error::ConfigError;
use crate::settings::{RECORD_SIZE, Settings};

/// Non-volatile storage for one settings record.
pub trait Persistence {
    /// Reads the stored record. `Ok(None)` means storage is empty.
    fn load(&mut self) -> Result<Option<Settings>, ConfigError>;

    /// Replaces the stored record.
    fn save(&mut self, settings: &Settings) -> Result<(), ConfigError>;
}

/// How [`SettingsStore::open`] obtained its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A valid record was read from storage.
    Restored,
    /// Storage was empty; defaults were written.
    Initialized,
    /// Storage held an invalid record; defaults were written over it.
    Recovered,
}

/// Debounced owner of the working settings record.
#[derive(Debug)]
pub struct SettingsStore<P: Persistence> {
    backend: P,
    current: Settings,
    saved: Settings,
    outcome: LoadOutcome,
}

impl<P: Persistence> SettingsStore<P> {
    /// Loads settings from `backend`, falling back to defaults.
    ///
    /// Never fails: invalid or unreadable data is replaced by defaults and
    /// re-saved immediately. A failing re-save is retried by the next
    /// [`commit`](Self::commit).
    pub fn open(mut backend: P) -> Self {
        let (current, outcome) = match backend.load() {
            Ok(Some(settings)) if settings.is_valid() => {
                (settings.clamped(), LoadOutcome::Restored)
            }
            Ok(Some(_invalid)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    signature = _invalid.signature,
                    "settings: signature mismatch, restoring defaults"
                );
                (Settings::default(), LoadOutcome::Recovered)
            }
            Ok(None) => (Settings::default(), LoadOutcome::Initialized),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_e, "settings: stored record rejected, restoring defaults");
                (Settings::default(), LoadOutcome::Recovered)
            }
        };

        let mut store = Self {
            backend,
            current,
            saved: current,
            outcome,
        };
        if outcome != LoadOutcome::Restored {
            // Force a write even though current == saved.
            if let Err(_e) = store.force_save() {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_e, "settings: could not write defaults");
            }
        }
        store
    }

    /// How the record was obtained at open.
    pub fn outcome(&self) -> LoadOutcome {
        self.outcome
    }

    /// The working record.
    pub fn settings(&self) -> &Settings {
        &self.current
    }

    /// Replaces the working record (clamped). Not saved until committed.
    pub fn update(&mut self, settings: Settings) {
        self.current = Settings {
            signature: crate::settings::SIGNATURE,
            ..settings.clamped()
        };
    }

    /// True when the working record differs from the last saved one.
    pub fn is_dirty(&self) -> bool {
        self.current != self.saved
    }

    /// Saves the working record if it is dirty. Returns whether a write
    /// happened.
    pub fn commit(&mut self) -> Result<bool, ConfigError> {
        if !self.is_dirty() {
            return Ok(false);
        }
        self.force_save()?;
        Ok(true)
    }

    /// Saves the working record unconditionally.
    pub fn force_save(&mut self) -> Result<(), ConfigError> {
        match self.backend.save(&self.current) {
            Ok(()) => {
                self.saved = self.current;
                #[cfg(feature = "tracing")]
                tracing::debug!("settings: saved");
                Ok(())
            }
            Err(e) => {
                // Leave `saved` stale so the next commit retries.
                self.saved = Settings {
                    signature: 0,
                    ..self.current
                };
                Err(e)
            }
        }
    }

    /// Resets the working record to defaults. Not saved until committed.
    pub fn reset_to_defaults(&mut self) {
        self.current = Settings::default();
    }

    /// Borrows the backend.
    pub fn backend(&self) -> &P {
        &self.backend
    }

    /// Consumes the store, returning the backend.
    pub fn into_backend(self) -> P {
        self.backend
    }
}

/// In-memory backend holding one binary record, standing in for a flash
/// sector.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    record: Option<[u8; RECORD_SIZE]>,
    writes: usize,
    fail_writes: bool,
}

impl MemoryPersistence {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage pre-filled with raw bytes.
    pub fn with_record(record: [u8; RECORD_SIZE]) -> Self {
        Self {
            record: Some(record),
            ..Self::default()
        }
    }

    /// Raw stored bytes, if any.
    pub fn record(&self) -> Option<&[u8; RECORD_SIZE]> {
        self.record.as_ref()
    }

    /// Number of successful saves.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Makes subsequent saves fail (for exercising retry paths).
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl Persistence for MemoryPersistence {
    fn load(&mut self) -> Result<Option<Settings>, ConfigError> {
        self.record
            .as_ref()
            .map(|bytes| Settings::from_bytes(bytes.as_slice()))
            .transpose()
    }

    fn save(&mut self, settings: &Settings) -> Result<(), ConfigError> {
        if self.fail_writes {
            return Err(ConfigError::Storage("write rejected"));
        }
        self.record = Some(settings.to_bytes());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(feature = "std")]
mod file {
    use std::path::{Path, PathBuf};

    use super::Persistence;
    use crate::error::ConfigError;
    use crate::settings::Settings;

    /// TOML file backend for hosted builds.
    #[derive(Debug, Clone)]
    pub struct FilePersistence {
        path: PathBuf,
    }

    impl FilePersistence {
        /// Creates a backend for `path`. The file need not exist yet.
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        /// Path of the settings file.
        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Persistence for FilePersistence {
        fn load(&mut self) -> Result<Option<Settings>, ConfigError> {
            if !self.path.exists() {
                return Ok(None);
            }
            let content = std::fs::read_to_string(&self.path)
                .map_err(|e| ConfigError::read_file(&self.path, e))?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(Some(settings))
        }

        fn save(&mut self, settings: &Settings) -> Result<(), ConfigError> {
            if let Some(parent) = self.path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
            }
            let content = toml::to_string_pretty(settings)?;
            std::fs::write(&self.path, content)
                .map_err(|e| ConfigError::write_file(&self.path, e))?;
            Ok(())
        }
    }
}

#[cfg(feature = "std")]
pub use file::FilePersistence;
