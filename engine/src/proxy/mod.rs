//! Proxy cache: low-resolution previews of backed-up media.
//!
//! Every video under a root gets an H.264 proxy and every photo a JPEG
//! thumbnail, stored flat in one cache directory under a name derived from
//! the source's absolute path. An artifact's existence is the only record
//! that it was generated: artifacts are produced once and never refreshed.
//!
//! After each pass the cache is swept back under its byte budget, oldest
//! artifacts first.

mod evict;
mod thumbnail;
mod transcode;

pub use evict::{ensure_cache_limit, EvictionReport};
pub use thumbnail::{make_thumbnail, THUMBNAIL_MAX_SIZE};
pub use transcode::{ffmpeg_args, FfmpegTranscoder, ProxySettings, VideoTranscoder};

use std::path::{Component, Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::EngineError;
use crate::fs_ops;
use crate::layout::Paths;
use crate::model::MediaKind;

const PROXY_EXTENSION: &str = "mp4";
const THUMB_EXTENSION: &str = "jpg";

/// What one `generate` pass did.
#[derive(Debug, Default)]
pub struct ProxyReport {
    pub videos_generated: usize,
    pub thumbnails_generated: usize,

    /// Sources whose artifact already existed
    pub skipped_existing: usize,

    /// Sources that failed; no artifact was left behind for them
    pub errors: Vec<EngineError>,

    pub eviction: EvictionReport,
}

/// Generates and bounds the proxy cache.
pub struct ProxyCache {
    cache_dir: PathBuf,
    max_bytes: u64,
    settings: ProxySettings,
    transcoder: Box<dyn VideoTranscoder>,
}

impl ProxyCache {
    pub fn new<P: Into<PathBuf>>(cache_dir: P, max_bytes: u64, settings: ProxySettings) -> Self {
        ProxyCache {
            cache_dir: cache_dir.into(),
            max_bytes,
            settings,
            transcoder: Box::new(FfmpegTranscoder::default()),
        }
    }

    /// Cache in the configured proxies directory, using the configured ffmpeg.
    pub fn from_config(config: &Config) -> Self {
        let settings = ProxySettings {
            height: config.previews.video_height,
            bitrate: config.previews.video_bitrate.clone(),
        };
        Self::new(Paths::from_config(config).proxies, config.max_cache_bytes(), settings)
            .with_transcoder(FfmpegTranscoder::new(&config.previews.ffmpeg))
    }

    pub fn with_transcoder(mut self, transcoder: impl VideoTranscoder + 'static) -> Self {
        self.transcoder = Box::new(transcoder);
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Produce missing artifacts for all media under `root`, then sweep.
    ///
    /// Per-file failures are collected in the report and never stop the pass.
    ///
    /// # Errors
    /// Returns EngineError only if the cache directory cannot be created.
    pub fn generate(&self, root: &Path) -> Result<ProxyReport, EngineError> {
        fs_ops::ensure_dir(&self.cache_dir)?;
        let mut report = ProxyReport::default();

        info!(
            "Generating proxies for {} into {}",
            root.display(),
            self.cache_dir.display()
        );

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.path() != self.cache_dir.as_path());

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry during proxy pass: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(kind) = MediaKind::from_path(entry.path()) else {
                continue;
            };

            let src = entry.path();
            let dst = match kind {
                MediaKind::Video => proxy_path_for(src, &self.cache_dir),
                MediaKind::Photo => thumb_path_for(src, &self.cache_dir),
            };
            if dst.exists() {
                report.skipped_existing += 1;
                continue;
            }

            let staging = staging_path_for(&dst);
            match self.produce(kind, src, &staging, &dst) {
                Ok(()) => {
                    debug!("Generated {}", dst.display());
                    match kind {
                        MediaKind::Video => report.videos_generated += 1,
                        MediaKind::Photo => report.thumbnails_generated += 1,
                    }
                }
                Err(e) => {
                    warn!("{}", e);
                    if let Err(cleanup) = fs_ops::remove_file_if_exists(&staging) {
                        warn!("Could not remove partial artifact: {}", cleanup);
                    }
                    report.errors.push(e);
                }
            }
        }

        report.eviction = ensure_cache_limit(&self.cache_dir, self.max_bytes);

        info!(
            "Proxy pass finished: {} videos, {} thumbnails, {} existing, {} failed",
            report.videos_generated,
            report.thumbnails_generated,
            report.skipped_existing,
            report.errors.len()
        );
        Ok(report)
    }

    /// Encode into `staging` and rename it to `dst` once the encoder
    /// succeeded and left a file. An interrupted encode never appears under
    /// the final name.
    fn produce(&self, kind: MediaKind, src: &Path, staging: &Path, dst: &Path) -> Result<(), EngineError> {
        match kind {
            MediaKind::Video => self.transcoder.transcode(src, staging, &self.settings)?,
            MediaKind::Photo => make_thumbnail(src, staging)?,
        }
        if !staging.is_file() {
            return Err(EngineError::TranscodeFailed {
                path: src.to_path_buf(),
                reason: "encoder reported success but wrote no output".to_string(),
            });
        }
        std::fs::rename(staging, dst).map_err(|e| EngineError::WriteError {
            path: dst.to_path_buf(),
            source: e,
        })
    }
}

/// Cache path of the video proxy for `src`.
pub fn proxy_path_for(src: &Path, cache_dir: &Path) -> PathBuf {
    cache_dir.join(flattened_name(src, PROXY_EXTENSION))
}

/// Cache path of the photo thumbnail for `src`.
pub fn thumb_path_for(src: &Path, cache_dir: &Path) -> PathBuf {
    cache_dir.join(flattened_name(src, THUMB_EXTENSION))
}

/// Hidden name an artifact is encoded under. The extension is kept so the
/// encoder still picks the right container.
fn staging_path_for(dst: &Path) -> PathBuf {
    let name = dst.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    dst.with_file_name(format!(".partial.{}", name))
}

/// The absolute path of `src` as one file name: root and drive dropped,
/// components joined with `_`, extension replaced.
fn flattened_name(src: &Path, extension: &str) -> String {
    let absolute = std::path::absolute(src).unwrap_or_else(|_| src.to_path_buf());
    absolute
        .with_extension(extension)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("_")
}
