//! # Field Backup Engine - Card to SSD Backup Library
//!
//! A headless backup engine for a field device that offloads camera cards
//! (GoPro, drone, 360, mirrorless) onto a local SSD during a trip.
//! Designed as the foundation for different front ends (CLI, kiosk display).
//!
//! ## Overview
//!
//! A session runs in three stages:
//! - Source classification: find the mounted card and name its device family
//! - Copy: files go into a per-trip tree with dedup, a free-space floor and
//!   post-write verification
//! - Proxy cache: low-resolution previews of the trip, bounded in size
//!
//! ## Basic Usage
//!
//! ```no_run
//! use fieldbackup_engine::{run_backup, select_source, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(Some("/etc/fieldbackup.toml".as_ref()))?;
//!
//! // Exactly one card must be mounted
//! let source = select_source(&config.paths.source_roots)?;
//!
//! let progress = |index: usize, total: usize| println!("{}/{}", index, total);
//! let report = run_backup(&config, &source, Some(&progress), true)?;
//!
//! println!(
//!     "{} copied, {} skipped, {} errors",
//!     report.copy.copied_files,
//!     report.copy.skipped_files,
//!     report.copy.errors.len()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (MediaFile, DeviceCode, CopyResult)
//! - **error**: Error types and handling
//! - **config**: TOML configuration, base template plus override
//! - **layout**: Directory layout on the backup volume
//! - **classify**: Card discovery and device classification
//! - **fs_ops**: Low-level filesystem operations
//! - **checksums**: Checksum computation and verification
//! - **copy**: The copy engine
//! - **proxy**: Proxy and thumbnail cache
//! - **progress**: Progress callback trait
//! - **session**: Source selection and the full backup flow

pub mod model;
pub mod error;
pub mod config;
pub mod layout;
pub mod classify;
pub mod fs_ops;
pub mod checksums;
pub mod copy;
pub mod proxy;
pub mod progress;
pub mod session;

// Re-export main types and functions
pub use model::{CopyResult, DeviceCode, FileOutcome, MediaFile, MediaKind, VerifyMode};
pub use error::{ConfigError, CopyError, EngineError};
pub use config::Config;
pub use layout::{Paths, TripLayout};
pub use classify::{classify_device_code, find_dcim_mounts, find_first_dcim, iter_mounts};
pub use copy::{copy_from_source, CopyEngine, CopyOptions};
pub use proxy::{ensure_cache_limit, ProxyCache, ProxyReport, ProxySettings};
pub use progress::ProgressCallback;
pub use session::{regenerate_proxies, run_backup, select_source, SessionReport};
pub use checksums::{compute_file_checksum, verify_copy, ChecksumValue};
