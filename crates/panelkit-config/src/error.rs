//! Error types for settings storage.

#[cfg(feature = "std")]
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while decoding, loading or saving settings.
///
/// None of these are fatal to the instrument: a failed load falls back to
/// defaults and a failed save is retried on the next commit.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Stored record has the wrong size
    #[error("record is {found} bytes, expected {expected}")]
    RecordLength {
        /// Size of a valid record.
        expected: usize,
        /// Size that was found.
        found: usize,
    },

    /// Stored record does not carry the settings signature
    #[error("signature mismatch: found {found:#010x}")]
    InvalidSignature {
        /// Signature read from storage.
        found: u32,
    },

    /// Stored envelope mode code is unknown
    #[error("unknown envelope mode code {0}")]
    InvalidEnvelopeMode(u8),

    /// A float field decoded to NaN or infinity
    #[error("field '{0}' is not a finite number")]
    NonFinite(&'static str),

    /// Storage backend reported a failure
    #[error("storage backend failed: {0}")]
    Storage(&'static str),

    /// Failed to read a file
    #[cfg(feature = "std")]
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[cfg(feature = "std")]
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create directory
    #[cfg(feature = "std")]
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[cfg(feature = "std")]
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[cfg(feature = "std")]
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

#[cfg(feature = "std")]
impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }
}
