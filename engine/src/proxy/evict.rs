//! Cache eviction sweep.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, info, warn};
use walkdir::WalkDir;

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Cache size before the sweep
    pub bytes_before: u64,

    /// Cache size after the sweep
    pub bytes_after: u64,

    pub removed_files: usize,
    pub removed_bytes: u64,

    /// Files that could not be deleted and were left in place
    pub failed_deletions: usize,
}

struct CacheEntry {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

/// Delete the oldest files under `cache_dir` until it holds at most `max_bytes`.
///
/// Age is modification time, so the policy is least-recently-created. A file
/// that cannot be deleted is logged and kept; its bytes still count, so the
/// cache can stay over budget when deletions keep failing.
pub fn ensure_cache_limit(cache_dir: &Path, max_bytes: u64) -> EvictionReport {
    let mut entries: Vec<CacheEntry> = WalkDir::new(cache_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            Some(CacheEntry {
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                path: entry.into_path(),
            })
        })
        .collect();

    let total: u64 = entries.iter().map(|e| e.size).sum();
    let mut report = EvictionReport {
        bytes_before: total,
        bytes_after: total,
        ..EvictionReport::default()
    };
    if total <= max_bytes {
        return report;
    }

    entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));

    for entry in entries {
        if report.bytes_after <= max_bytes {
            break;
        }
        match std::fs::remove_file(&entry.path) {
            Ok(()) => {
                debug!("Evicted {} ({} bytes)", entry.path.display(), entry.size);
                report.bytes_after -= entry.size;
                report.removed_files += 1;
                report.removed_bytes += entry.size;
            }
            Err(e) => {
                warn!("Could not evict {}: {}", entry.path.display(), e);
                report.failed_deletions += 1;
            }
        }
    }

    info!(
        "Cache sweep: {} files removed, {} -> {} bytes (budget {})",
        report.removed_files, report.bytes_before, report.bytes_after, max_bytes
    );
    report
}
