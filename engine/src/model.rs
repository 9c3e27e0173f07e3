//! Core data model for backup runs.
//!
//! This module defines the main data structures shared by the engine:
//! - MediaFile: a photo or video found on a card or in the trip tree
//! - DeviceCode: the camera family a card was classified as
//! - VerifyMode: how a written file is checked
//! - CopyResult / FileOutcome: what a copy run did

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::CopyError;

/// Photo extensions recognised by the engine (lower case, no dot).
pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "rw2", "cr2", "nef", "raf", "dng", "arw"];

/// Video extensions recognised by the engine (lower case, no dot).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v"];

/// Whether a media file is a still or a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Classify a path by its extension, case-insensitively.
    ///
    /// Returns `None` for anything outside the allow-list.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if PHOTO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Photo)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// A media file found during a scan. Read fresh from the filesystem each run.
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Full path to the file
    pub path: PathBuf,

    /// Photo or video, from the extension
    pub kind: MediaKind,

    /// File size in bytes
    pub size: u64,

    /// Last modification time
    pub modified: SystemTime,
}

/// Device family of a source card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCode {
    GoPro,
    Drone,
    ThreeSixty,
    LumixG7,
    Camera,
}

impl DeviceCode {
    /// The code string used as a `device_labels` key.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCode::GoPro => "gopro",
            DeviceCode::Drone => "drone",
            DeviceCode::ThreeSixty => "360",
            DeviceCode::LumixG7 => "lumix_g7",
            DeviceCode::Camera => "camera",
        }
    }
}

impl fmt::Display for DeviceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post-write verification method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    /// Compare file sizes only
    #[default]
    Fast,
    /// Compare full-content SHA-256 hashes
    Sha256,
}

impl VerifyMode {
    /// Parse mode from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fast" => Some(Self::Fast),
            "sha256" => Some(Self::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for VerifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyMode::Fast => write!(f, "fast"),
            VerifyMode::Sha256 => write!(f, "sha256"),
        }
    }
}

/// What happened to a single file that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// New file written and verified
    Copied { bytes: u64 },
    /// Existing destination differed; overwritten and verified
    Replaced { bytes: u64 },
    /// Existing destination is identical; nothing written
    Skipped,
}

/// Summary of one copy run.
///
/// Built up while the run progresses and handed to the caller at the end.
/// A non-empty `errors` list means the session should be treated as failed,
/// even though the counters reflect real partial progress.
#[derive(Debug, Default)]
pub struct CopyResult {
    pub copied_files: usize,
    pub skipped_files: usize,
    pub replaced_files: usize,

    /// Bytes written by verified copies (skips contribute nothing)
    pub bytes_copied: u64,

    /// Label the videos were filed under
    pub device_label: String,

    /// Errors in the order they happened
    pub errors: Vec<CopyError>,

    /// The caller asked the run to stop before all files were processed
    pub cancelled: bool,
}

impl CopyResult {
    /// Fold a successful file outcome into the counters.
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Copied { bytes } => {
                self.copied_files += 1;
                self.bytes_copied += bytes;
            }
            FileOutcome::Replaced { bytes } => {
                self.replaced_files += 1;
                self.bytes_copied += bytes;
            }
            FileOutcome::Skipped => self.skipped_files += 1,
        }
    }

    /// True when every file was handled and nothing went wrong.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }

    /// Error list rendered for display.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }

    /// The fatal error that ended the run early, if any.
    pub fn fatal_error(&self) -> Option<&CopyError> {
        self.errors.iter().find(|e| e.is_fatal())
    }
}
