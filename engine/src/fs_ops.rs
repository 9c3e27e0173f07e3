//! Filesystem operations module.
//!
//! This module provides low-level operations for:
//! - Enumerating media files under a directory tree
//! - Copying files with modification time preservation
//! - Creating directories recursively
//! - Querying free space on the destination volume
//!
//! Free space and the copy primitive sit behind small traits so a run can be
//! driven against a simulated volume.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

use crate::error::{CopyError, EngineError};
use crate::model::{MediaFile, MediaKind};

/// Source of free-space figures for the destination volume.
pub trait SpaceProbe: Send {
    /// Bytes available to the current user on the volume holding `path`.
    fn available_bytes(&self, path: &Path) -> io::Result<u64>;
}

/// Queries the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct VolumeSpace;

impl SpaceProbe for VolumeSpace {
    fn available_bytes(&self, path: &Path) -> io::Result<u64> {
        fs2::available_space(path)
    }
}

/// Writes one file's content from `src` to `dst`.
pub trait FileCopier: Send {
    /// Copy and return the number of bytes written.
    fn copy(&self, src: &Path, dst: &Path) -> Result<u64, EngineError>;
}

/// Copies through `copy_file_with_metadata`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataCopier;

impl FileCopier for MetadataCopier {
    fn copy(&self, src: &Path, dst: &Path) -> Result<u64, EngineError> {
        copy_file_with_metadata(src, dst)
    }
}

/// Result of walking a tree for media.
#[derive(Debug, Default)]
pub struct MediaScan {
    /// Media files in discovery order
    pub files: Vec<MediaFile>,

    /// Entries that could not be read
    pub errors: Vec<CopyError>,
}

/// Enumerate media files under `root`, recursively.
///
/// Entries are visited in file-name order within each directory. Files
/// outside the photo/video allow-list are ignored. Unreadable entries below
/// the root are collected in `MediaScan::errors`.
///
/// # Errors
/// Returns EngineError if the root itself cannot be read.
pub fn enumerate_media(root: &Path) -> Result<MediaScan, EngineError> {
    let mut scan = MediaScan::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                let at_root = e.depth() == 0;
                let source = EngineError::EnumerationFailed {
                    path: path.clone(),
                    source: e.into(),
                };
                if at_root {
                    return Err(source);
                }
                scan.errors.push(CopyError::File { path, source });
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let Some(kind) = MediaKind::from_path(entry.path()) else {
            continue;
        };

        let metadata = entry
            .metadata()
            .map_err(io::Error::from)
            .and_then(|m| Ok((m.len(), m.modified()?)));
        match metadata {
            Ok((size, modified)) => scan.files.push(MediaFile {
                path: entry.into_path(),
                kind,
                size,
                modified,
            }),
            Err(e) => {
                let path = entry.into_path();
                scan.errors.push(CopyError::File {
                    path: path.clone(),
                    source: EngineError::ReadError { path, source: e },
                });
            }
        }
    }

    Ok(scan)
}

/// Copy a file from source to destination with metadata preservation.
///
/// The content is written to a hidden sibling first, flushed to disk, given
/// the source's modification time and only then renamed over `dst`. A copy
/// that fails partway leaves `dst` as it was and removes the partial file.
///
/// # Returns
/// Number of bytes copied
///
/// # Errors
/// Returns EngineError if the copy fails
pub fn copy_file_with_metadata(src: &Path, dst: &Path) -> Result<u64, EngineError> {
    ensure_parent_dir_exists(dst)?;
    let partial = partial_path_for(dst);

    let result = write_partial(src, &partial).and_then(|bytes_copied| {
        fs::rename(&partial, dst).map_err(|e| EngineError::WriteError {
            path: dst.to_path_buf(),
            source: e,
        })?;
        Ok(bytes_copied)
    });

    if result.is_err() {
        if let Err(e) = remove_file_if_exists(&partial) {
            warn!("Could not remove partial copy: {}", e);
        }
    }
    result
}

/// Hidden sibling of `path` that receives content before it is renamed into place.
pub fn partial_path_for(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    path.with_file_name(format!(".{}.partial", name))
}

fn write_partial(src: &Path, partial: &Path) -> Result<u64, EngineError> {
    let mut src_file = fs::File::open(src).map_err(|e| EngineError::ReadError {
        path: src.to_path_buf(),
        source: e,
    })?;

    let src_mtime = src_file
        .metadata()
        .map_err(|e| EngineError::ReadError {
            path: src.to_path_buf(),
            source: e,
        })?
        .modified()
        .ok();

    let mut dst_file = fs::File::create(partial).map_err(|e| EngineError::WriteError {
        path: partial.to_path_buf(),
        source: e,
    })?;

    let bytes_copied = io::copy(&mut src_file, &mut dst_file).map_err(|e| {
        if e.kind() == ErrorKind::PermissionDenied {
            EngineError::WriteError {
                path: partial.to_path_buf(),
                source: e,
            }
        } else {
            EngineError::ReadError {
                path: src.to_path_buf(),
                source: e,
            }
        }
    })?;

    dst_file.sync_all().map_err(|e| EngineError::WriteError {
        path: partial.to_path_buf(),
        source: e,
    })?;
    drop(dst_file);

    if let Some(mtime) = src_mtime {
        filetime::set_file_mtime(partial, filetime::FileTime::from_system_time(mtime)).map_err(|e| {
            EngineError::WriteError {
                path: partial.to_path_buf(),
                source: e,
            }
        })?;
    }

    Ok(bytes_copied)
}

/// Remove a file, treating "already gone" as success.
pub fn remove_file_if_exists(path: &Path) -> Result<(), EngineError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EngineError::WriteError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Ensure the parent directory of a path exists, creating it if necessary.
///
/// # Errors
/// Returns EngineError if directory creation fails
pub fn ensure_parent_dir_exists(path: &Path) -> Result<(), EngineError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Create `dir` and its ancestors if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), EngineError> {
    match fs::metadata(dir) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(EngineError::DirectoryCreationFailed {
            path: dir.to_path_buf(),
            source: io::Error::new(ErrorKind::InvalidInput, "Path exists but is not a directory"),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|e| EngineError::DirectoryCreationFailed {
                path: dir.to_path_buf(),
                source: e,
            })
        }
        Err(e) => Err(EngineError::DirectoryCreationFailed {
            path: dir.to_path_buf(),
            source: e,
        }),
    }
}
