//! One backup session: pick the card, copy it, refresh proxies.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::classify::find_dcim_mounts;
use crate::config::Config;
use crate::copy::CopyEngine;
use crate::error::EngineError;
use crate::layout::Paths;
use crate::model::CopyResult;
use crate::progress::ProgressCallback;
use crate::proxy::{ProxyCache, ProxyReport};

/// Outcome of `run_backup`.
#[derive(Debug)]
pub struct SessionReport {
    pub copy: CopyResult,

    /// `None` when proxies were disabled or the copy did not finish cleanly
    pub proxies: Option<ProxyReport>,
}

impl SessionReport {
    /// The copy ran to completion without errors.
    pub fn is_success(&self) -> bool {
        self.copy.is_success()
    }
}

/// The single mounted card to back up.
///
/// Refuses to guess when several cards are mounted.
pub fn select_source<P: AsRef<Path>>(source_roots: &[P]) -> Result<PathBuf, EngineError> {
    let mut mounts = find_dcim_mounts(source_roots);
    match mounts.len() {
        0 => Err(EngineError::NoSource {
            roots: source_roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        }),
        1 => Ok(mounts.remove(0)),
        _ => Err(EngineError::MultipleSources { mounts }),
    }
}

/// Copy `source` into the configured trip and, if that went cleanly,
/// generate proxies for the trip.
pub fn run_backup(
    config: &Config,
    source: &Path,
    progress: Option<&dyn ProgressCallback>,
    with_proxies: bool,
) -> Result<SessionReport, EngineError> {
    let paths = Paths::from_config(config);
    paths.ensure()?;

    let copy = CopyEngine::from_config(config).copy(source, progress)?;

    let proxies = if !with_proxies {
        None
    } else if !copy.is_success() {
        warn!("Skipping proxy generation: copy did not complete cleanly");
        None
    } else {
        Some(ProxyCache::from_config(config).generate(&paths.trip_root())?)
    };

    info!("Session for {} finished", source.display());
    Ok(SessionReport { copy, proxies })
}

/// Generate missing proxies for the current trip and sweep the cache.
pub fn regenerate_proxies(config: &Config) -> Result<ProxyReport, EngineError> {
    let paths = Paths::from_config(config);
    paths.ensure()?;
    ProxyCache::from_config(config).generate(&paths.trip_root())
}
