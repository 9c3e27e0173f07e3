//! Error types for the backup engine.
//!
//! There are three layers:
//! - `EngineError`: the cause of a failure, either job-level (returned as `Err`
//!   from an entry point) or the underlying reason for a per-file error.
//! - `CopyError`: an entry in `CopyResult::errors`. Tagged so that the copy loop
//!   can tell "record and continue" apart from "record and stop".
//! - `ConfigError`: loading, merging and saving configuration.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by engine operations.
///
/// Job-level variants (`SourceNotFound`, `NoSource`, `MultipleSources`, ...)
/// prevent a run from starting. I/O variants carry the path they happened on
/// so that a caller can show something meaningful to the user.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Source directory does not exist
    #[error("Source directory not found: {}", .path.display())]
    SourceNotFound { path: PathBuf },

    /// No mounted card with a DCIM folder was found under the source roots
    #[error("No media source found under {} root(s)", .roots.len())]
    NoSource { roots: Vec<PathBuf> },

    /// More than one card is mounted; the session refuses to guess
    #[error("{} media sources found, remove all but one", .mounts.len())]
    MultipleSources { mounts: Vec<PathBuf> },

    /// Failed to read from a file
    #[error("Failed to read file: {}", .path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write to a file
    #[error("Failed to write file: {}", .path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to enumerate a directory
    #[error("Failed to enumerate directory: {}", .path.display())]
    EnumerationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to create a directory
    #[error("Failed to create directory: {}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Free space on the destination volume could not be determined
    #[error("Failed to query free space for: {}", .path.display())]
    SpaceQueryFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The external transcoder could not produce a proxy
    #[error("Transcode failed for {}: {reason}", .path.display())]
    TranscodeFailed { path: PathBuf, reason: String },

    /// A photo could not be decoded, resized or encoded
    #[error("Thumbnail failed for {}", .path.display())]
    ThumbnailFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<u32> {
        match self {
            Self::ReadError { source, .. }
            | Self::WriteError { source, .. }
            | Self::EnumerationFailed { source, .. }
            | Self::DirectoryCreationFailed { source, .. }
            | Self::SpaceQueryFailed { source, .. } => source.raw_os_error().map(|e| e as u32),
            _ => None,
        }
    }
}

/// One entry in a copy run's error list.
///
/// `LowSpace` and `VerifyFailed` end the run; `File` is recorded and the run
/// moves on to the next file.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("Low space: stopping backup ({available} bytes free, {required} bytes needed)")]
    LowSpace {
        path: PathBuf,
        available: u64,
        required: u64,
    },

    #[error("Verify failed: {}", .path.display())]
    VerifyFailed { path: PathBuf },

    #[error("Error copying {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: EngineError,
    },
}

impl CopyError {
    /// True when this error stops the rest of the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CopyError::LowSpace { .. } | CopyError::VerifyFailed { .. })
    }

    /// The source file this error is about.
    pub fn path(&self) -> &std::path::Path {
        match self {
            CopyError::LowSpace { path, .. }
            | CopyError::VerifyFailed { path }
            | CopyError::File { path, .. } => path,
        }
    }
}

/// Configuration loading and saving errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Failed to write config file {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
