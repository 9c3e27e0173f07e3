//! Checksum and verification functionality.
//!
//! This module provides:
//! - Streaming SHA-256 of a file
//! - Content comparison of two files (used for dedup)
//! - Post-write verification in either `fast` or `sha256` mode

use crate::error::EngineError;
use crate::model::VerifyMode;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// Read block size for hashing.
const HASH_BLOCK_SIZE: usize = 1024 * 1024;

/// A computed SHA-256 checksum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumValue {
    hex: String,
}

impl ChecksumValue {
    /// Get the hex string representation
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for ChecksumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex)
    }
}

/// Compute the SHA-256 of a file, reading it in fixed-size blocks.
pub fn compute_file_checksum(path: &Path) -> Result<ChecksumValue, EngineError> {
    let read_err = |e| EngineError::ReadError {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = File::open(path).map_err(read_err)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BLOCK_SIZE];

    loop {
        let n = file.read(&mut buffer).map_err(read_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(ChecksumValue {
        hex: format!("{:x}", hasher.finalize()),
    })
}

/// True when both files have identical SHA-256 hashes.
///
/// Two empty files always match.
pub fn contents_match(a: &Path, b: &Path) -> Result<bool, EngineError> {
    Ok(compute_file_checksum(a)? == compute_file_checksum(b)?)
}

/// Check a freshly written destination against its source.
///
/// `Fast` compares sizes, `Sha256` compares full hashes.
pub fn verify_copy(src: &Path, dst: &Path, mode: VerifyMode) -> Result<bool, EngineError> {
    match mode {
        VerifyMode::Fast => {
            let size = |p: &Path| {
                fs::metadata(p).map(|m| m.len()).map_err(|e| EngineError::ReadError {
                    path: p.to_path_buf(),
                    source: e,
                })
            };
            Ok(size(src)? == size(dst)?)
        }
        VerifyMode::Sha256 => contents_match(src, dst),
    }
}
