//! Copy engine: card -> trip directory with dedup and verification.
//!
//! One run walks the card's media, and for each file:
//! 1. computes the destination from the trip layout,
//! 2. checks the free-space floor on the destination volume,
//! 3. skips the file if an identical copy is already there, otherwise writes it,
//! 4. verifies the write, retrying once before giving up.
//!
//! Running out of space and failing verification twice stop the run. Any
//! other per-file problem is recorded and the run moves on.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::checksums;
use crate::classify::classify_device_code;
use crate::config::{self, Config};
use crate::error::{CopyError, EngineError};
use crate::fs_ops::{self, FileCopier, MetadataCopier, SpaceProbe, VolumeSpace};
use crate::layout::{Paths, TripLayout};
use crate::model::{CopyResult, FileOutcome, MediaFile, VerifyMode};
use crate::progress::ProgressCallback;

/// A write is attempted at most this many times before verification is
/// declared failed.
const MAX_WRITE_ATTEMPTS: u32 = 2;

/// Settings a copy run needs from the configuration.
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Post-write check
    pub verify_mode: VerifyMode,

    /// Bytes that must stay free on the destination after each file
    pub min_free_bytes: u64,

    /// Device code -> label
    pub device_labels: BTreeMap<String, String>,
}

impl CopyOptions {
    pub fn from_config(config: &Config) -> Self {
        CopyOptions {
            verify_mode: config.verify.mode,
            min_free_bytes: config.min_free_bytes(),
            device_labels: config.device_labels.clone(),
        }
    }
}

/// Copies media from a card into one trip.
pub struct CopyEngine {
    layout: TripLayout,
    options: CopyOptions,
    space: Box<dyn SpaceProbe>,
    copier: Box<dyn FileCopier>,
}

impl CopyEngine {
    /// Engine writing into `layout`, measuring the real volume.
    pub fn new(layout: TripLayout, options: CopyOptions) -> Self {
        CopyEngine {
            layout,
            options,
            space: Box::new(VolumeSpace),
            copier: Box::new(MetadataCopier),
        }
    }

    /// Engine for the configured trip.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Paths::from_config(config).trip_layout(),
            CopyOptions::from_config(config),
        )
    }

    /// Replace the free-space source.
    pub fn with_space_probe(mut self, probe: impl SpaceProbe + 'static) -> Self {
        self.space = Box::new(probe);
        self
    }

    /// Replace the copy primitive.
    pub fn with_copier(mut self, copier: impl FileCopier + 'static) -> Self {
        self.copier = Box::new(copier);
        self
    }

    pub fn layout(&self) -> &TripLayout {
        &self.layout
    }

    /// Copy every media file from `source_root` into the trip.
    ///
    /// Per-file problems end up in `CopyResult::errors`; the `Err` side is
    /// only for problems that prevent the run from starting.
    ///
    /// The progress callback is called after every file, including the one
    /// that ended the run. Its `should_stop` is checked before each file.
    ///
    /// # Errors
    /// Returns EngineError if the source is missing, the trip directory
    /// cannot be created, or the media folder cannot be read.
    pub fn copy(
        &self,
        source_root: &Path,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<CopyResult, EngineError> {
        if !source_root.is_dir() {
            return Err(EngineError::SourceNotFound {
                path: source_root.to_path_buf(),
            });
        }
        fs_ops::ensure_dir(self.layout.root())?;

        let code = classify_device_code(source_root);
        let label = config::label_for(&self.options.device_labels, code);

        let scan = fs_ops::enumerate_media(&media_root(source_root))?;
        let total = scan.files.len();

        let mut result = CopyResult {
            device_label: label.clone(),
            errors: scan.errors,
            ..CopyResult::default()
        };

        info!(
            "Copying {} files from {} ({}, label {}) to {}, verify={}",
            total,
            source_root.display(),
            code,
            label,
            self.layout.root().display(),
            self.options.verify_mode
        );
        if let Some(callback) = progress {
            callback.on_run_started(total);
        }

        for (file_index, file) in scan.files.iter().enumerate() {
            // Only place a run can be interrupted: before any decision about
            // the next file.
            if progress.is_some_and(|callback| callback.should_stop()) {
                info!("Stop requested; {} of {} files processed", file_index, total);
                result.cancelled = true;
                break;
            }

            let fatal = match self.process_file(file, &label) {
                Ok(outcome) => {
                    debug!("{}: {:?}", file.path.display(), outcome);
                    result.record(outcome);
                    false
                }
                Err(err) if err.is_fatal() => {
                    error!("{}", err);
                    result.errors.push(err);
                    true
                }
                Err(err) => {
                    warn!("{}", err);
                    result.errors.push(err);
                    false
                }
            };

            if let Some(callback) = progress {
                callback.on_file_processed(file_index + 1, total);
            }
            if fatal {
                break;
            }
        }

        info!(
            "Copy finished: {} copied, {} replaced, {} skipped, {} bytes, {} errors",
            result.copied_files,
            result.replaced_files,
            result.skipped_files,
            result.bytes_copied,
            result.errors.len()
        );
        Ok(result)
    }

    fn process_file(&self, file: &MediaFile, label: &str) -> Result<FileOutcome, CopyError> {
        let dst = self.layout.destination_for(file, label);

        self.check_free_space(file)?;

        if dst.exists() {
            let identical = checksums::contents_match(&file.path, &dst)
                .map_err(|e| file_error(file, e))?;
            if identical {
                return Ok(FileOutcome::Skipped);
            }
            debug!("{} differs from {}; replacing", dst.display(), file.path.display());
            let bytes = self.write_verified(file, &dst)?;
            return Ok(FileOutcome::Replaced { bytes });
        }

        let bytes = self.write_verified(file, &dst)?;
        Ok(FileOutcome::Copied { bytes })
    }

    /// Fails when writing `file` would leave less than the floor free.
    fn check_free_space(&self, file: &MediaFile) -> Result<(), CopyError> {
        let root = self.layout.root();
        let available = self.space.available_bytes(root).map_err(|e| {
            file_error(
                file,
                EngineError::SpaceQueryFailed {
                    path: root.to_path_buf(),
                    source: e,
                },
            )
        })?;

        let required = file.size.saturating_add(self.options.min_free_bytes);
        if available < required {
            return Err(CopyError::LowSpace {
                path: file.path.clone(),
                available,
                required,
            });
        }
        Ok(())
    }

    /// Write `file` to `dst` and verify it, with one retry.
    ///
    /// Whenever a write was attempted and did not verify, `dst` is removed,
    /// so a corrupt or partial copy is never left behind to be mistaken for a
    /// good one.
    fn write_verified(&self, file: &MediaFile, dst: &Path) -> Result<u64, CopyError> {
        let mode = self.options.verify_mode;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let written = self.copier.copy(&file.path, dst).and_then(|bytes| {
                let verified = checksums::verify_copy(&file.path, dst, mode)?;
                Ok((bytes, verified))
            });

            let bytes = match written {
                Ok((bytes, true)) => return Ok(bytes),
                Ok((bytes, false)) => bytes,
                Err(e) => {
                    discard_unverified(dst);
                    return Err(file_error(file, e));
                }
            };

            warn!(
                "Verification ({}) mismatch for {} on attempt {} ({} bytes written)",
                mode,
                dst.display(),
                attempt,
                bytes
            );
            discard_unverified(dst);

            if attempt >= MAX_WRITE_ATTEMPTS {
                return Err(CopyError::VerifyFailed {
                    path: file.path.clone(),
                });
            }
        }
    }
}

/// Remove a destination that did not verify. Failure is logged only; the
/// next write replaces the file anyway.
fn discard_unverified(dst: &Path) {
    if let Err(e) = fs_ops::remove_file_if_exists(dst) {
        warn!("Could not remove unverified copy: {}", e);
    }
}

fn file_error(file: &MediaFile, source: EngineError) -> CopyError {
    CopyError::File {
        path: file.path.clone(),
        source,
    }
}

/// `<root>/DCIM` when the card has one, else the root itself.
pub fn media_root(source_root: &Path) -> PathBuf {
    let dcim = source_root.join("DCIM");
    if dcim.is_dir() {
        dcim
    } else {
        source_root.to_path_buf()
    }
}

/// Copy a card into the configured trip with default volume access.
pub fn copy_from_source(
    source_root: &Path,
    config: &Config,
    progress: Option<&dyn ProgressCallback>,
) -> Result<CopyResult, EngineError> {
    CopyEngine::from_config(config).copy(source_root, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use std::collections::VecDeque;
    use std::fs;
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::SystemTime;

    /// Reports a fixed sequence of free-space readings, then repeats the last.
    struct SequenceSpace {
        readings: Mutex<VecDeque<u64>>,
    }

    impl SequenceSpace {
        fn new(readings: &[u64]) -> Self {
            SequenceSpace {
                readings: Mutex::new(readings.iter().copied().collect()),
            }
        }
    }

    impl SpaceProbe for SequenceSpace {
        fn available_bytes(&self, _path: &Path) -> io::Result<u64> {
            let mut readings = self.readings.lock().unwrap();
            if readings.len() > 1 {
                Ok(readings.pop_front().unwrap())
            } else {
                Ok(*readings.front().unwrap())
            }
        }
    }

    /// Writes only the first half of every file.
    struct TruncatingCopier {
        calls: Arc<AtomicUsize>,
    }

    impl FileCopier for TruncatingCopier {
        fn copy(&self, src: &Path, dst: &Path) -> Result<u64, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let data = fs::read(src).unwrap();
            let half = &data[..data.len() / 2];
            fs_ops::ensure_parent_dir_exists(dst)?;
            fs::write(dst, half).unwrap();
            Ok(half.len() as u64)
        }
    }

    /// Truncates the first write, copies correctly afterwards.
    struct FlakyCopier {
        calls: Arc<AtomicUsize>,
    }

    impl FileCopier for FlakyCopier {
        fn copy(&self, src: &Path, dst: &Path) -> Result<u64, EngineError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                TruncatingCopier {
                    calls: Arc::new(AtomicUsize::new(0)),
                }
                .copy(src, dst)
            } else {
                fs_ops::copy_file_with_metadata(src, dst)
            }
        }
    }

    /// Writes half of the first file, then fails as if the card went away.
    struct FailingMidCopy {
        calls: Arc<AtomicUsize>,
    }

    impl FileCopier for FailingMidCopy {
        fn copy(&self, src: &Path, dst: &Path) -> Result<u64, EngineError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
                return fs_ops::copy_file_with_metadata(src, dst);
            }
            let data = fs::read(src).unwrap();
            fs_ops::ensure_parent_dir_exists(dst)?;
            fs::write(dst, &data[..data.len() / 2]).unwrap();
            Err(EngineError::ReadError {
                path: src.to_path_buf(),
                source: io::Error::new(io::ErrorKind::UnexpectedEof, "card removed"),
            })
        }
    }

    /// Records progress and asks to stop after `stop_after` files.
    struct StoppingProgress {
        calls: Mutex<Vec<(usize, usize)>>,
        stop: AtomicBool,
        stop_after: usize,
    }

    impl ProgressCallback for StoppingProgress {
        fn on_file_processed(&self, index: usize, total: usize) {
            self.calls.lock().unwrap().push((index, total));
            if index >= self.stop_after {
                self.stop.store(true, Ordering::SeqCst);
            }
        }

        fn should_stop(&self) -> bool {
            self.stop.load(Ordering::SeqCst)
        }
    }

    struct Fixture {
        _temp_dir: tempfile::TempDir,
        card: PathBuf,
        trip: PathBuf,
    }

    impl Fixture {
        fn new(card_name: &str) -> Self {
            let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
            let card = temp_dir.path().join("media").join(card_name);
            fs::create_dir_all(card.join("DCIM/100CAMRA")).expect("Failed to create card");
            let trip = temp_dir.path().join("nvme/trips/test");
            Fixture {
                _temp_dir: temp_dir,
                card,
                trip,
            }
        }

        fn add(&self, rel: &str, content: &[u8]) -> PathBuf {
            let path = self.card.join("DCIM/100CAMRA").join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn engine(&self, verify_mode: VerifyMode) -> CopyEngine {
            let mut device_labels = BTreeMap::new();
            device_labels.insert("gopro".to_string(), "GoPro".to_string());
            CopyEngine::new(
                TripLayout::new(&self.trip),
                CopyOptions {
                    verify_mode,
                    min_free_bytes: 0,
                    device_labels,
                },
            )
        }
    }

    fn local_time(y: i32, m: u32, d: u32, h: u32) -> SystemTime {
        Local
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .single()
            .expect("Unambiguous local time")
            .into()
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        filetime::set_file_mtime(path, filetime::FileTime::from_system_time(time))
            .expect("Failed to set mtime");
    }

    #[test]
    fn test_copies_into_trip_layout() {
        let fx = Fixture::new("GoPro10");
        let video = fx.add("GX010001.MP4", b"video-bytes");
        fx.add("GOPR0001.JPG", b"photo");
        set_mtime(&video, local_time(2024, 3, 2, 10));

        let result = fx
            .engine(VerifyMode::Sha256)
            .copy(&fx.card, None)
            .expect("Run should start");

        assert!(result.is_success(), "errors: {:?}", result.error_messages());
        assert_eq!(result.copied_files, 2);
        assert_eq!(result.bytes_copied, 16);
        assert_eq!(result.device_label, "GoPro");

        let video_dst = fx.trip.join("2024-03-02/GoPro/GX010001.MP4");
        assert_eq!(fs::read(&video_dst).unwrap(), b"video-bytes");
        assert_eq!(fs::read(fx.trip.join("photos/GOPR0001.JPG")).unwrap(), b"photo");

        let mtime = fs::metadata(&video_dst).unwrap().modified().unwrap();
        assert_eq!(layout_date(mtime), "2024-03-02");
    }

    fn layout_date(time: SystemTime) -> String {
        crate::layout::date_folder(time)
    }

    #[test]
    fn test_second_run_skips_everything() {
        let fx = Fixture::new("SD_CARD");
        fx.add("DSC0001.ARW", b"raw one");
        fx.add("DSC0002.ARW", b"raw two");
        fx.add("C0001.MP4", b"clip");

        let engine = fx.engine(VerifyMode::Fast);
        let first = engine.copy(&fx.card, None).expect("First run");
        assert_eq!(first.copied_files, 3);

        let second = engine.copy(&fx.card, None).expect("Second run");
        assert!(second.is_success());
        assert_eq!(second.copied_files, 0);
        assert_eq!(second.replaced_files, 0);
        assert_eq!(second.skipped_files, 3);
        assert_eq!(second.bytes_copied, 0);
    }

    #[test]
    fn test_identical_existing_file_is_skipped() {
        let fx = Fixture::new("camera");
        let src = fx.add("IMG_0001.JPG", b"same content");
        set_mtime(&src, local_time(2024, 1, 1, 12));

        let existing = fx.trip.join("photos/IMG_0001.JPG");
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, b"same content").unwrap();
        let before = local_time(2020, 6, 1, 12);
        set_mtime(&existing, before);

        let result = fx.engine(VerifyMode::Sha256).copy(&fx.card, None).unwrap();

        assert!(result.is_success());
        assert_eq!(result.skipped_files, 1);
        assert_eq!(result.replaced_files, 0);
        // Not rewritten
        assert_eq!(fs::metadata(&existing).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn test_drifted_destination_is_replaced() {
        let fx = Fixture::new("camera");
        fx.add("IMG_0002.JPG", b"original pixels");

        let existing = fx.trip.join("photos/IMG_0002.JPG");
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, b"bitrot pixels!!").unwrap();

        let result = fx.engine(VerifyMode::Sha256).copy(&fx.card, None).unwrap();

        assert!(result.is_success());
        assert_eq!(result.replaced_files, 1);
        assert_eq!(result.bytes_copied, 15);
        assert_eq!(fs::read(&existing).unwrap(), b"original pixels");
    }

    #[test]
    fn test_zero_length_files_compare_equal() {
        let fx = Fixture::new("camera");
        fx.add("EMPTY.JPG", b"");

        let engine = fx.engine(VerifyMode::Sha256);
        let first = engine.copy(&fx.card, None).unwrap();
        assert_eq!(first.copied_files, 1);
        assert_eq!(first.bytes_copied, 0);

        let second = engine.copy(&fx.card, None).unwrap();
        assert_eq!(second.skipped_files, 1);
    }

    #[test]
    fn test_low_space_stops_run() {
        let fx = Fixture::new("camera");
        fx.add("A.JPG", b"0123456789");
        fx.add("B.JPG", b"0123456789");
        fx.add("C.JPG", b"0123456789");

        let mut engine = fx.engine(VerifyMode::Fast);
        engine.options.min_free_bytes = 100;
        let engine = engine.with_space_probe(SequenceSpace::new(&[1_000, 105]));

        let calls = Mutex::new(Vec::new());
        let progress = |i: usize, t: usize| calls.lock().unwrap().push((i, t));
        let result = engine.copy(&fx.card, Some(&progress)).unwrap();

        assert_eq!(result.copied_files, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(
            result.errors[0],
            CopyError::LowSpace { available: 105, required: 110, .. }
        ));
        assert!(fx.trip.join("photos/A.JPG").exists());
        assert!(!fx.trip.join("photos/B.JPG").exists());
        assert!(!fx.trip.join("photos/C.JPG").exists());
        assert_eq!(*calls.lock().unwrap(), vec![(1, 3), (2, 3)]);
    }

    #[test]
    fn test_space_floor_applies_before_dedup() {
        let fx = Fixture::new("camera");
        fx.add("A.JPG", b"0123456789");

        let engine = fx.engine(VerifyMode::Fast);
        engine.copy(&fx.card, None).unwrap();

        let engine = fx.engine(VerifyMode::Fast).with_space_probe(SequenceSpace::new(&[5]));
        let result = engine.copy(&fx.card, None).unwrap();

        assert_eq!(result.skipped_files, 0);
        assert!(matches!(result.fatal_error(), Some(CopyError::LowSpace { .. })));
    }

    #[test]
    fn test_verify_failure_after_retry_halts() {
        let fx = Fixture::new("camera");
        let first = fx.add("A.MOV", b"first clip bytes");
        fx.add("B.MOV", b"second clip bytes");

        let calls = Arc::new(AtomicUsize::new(0));
        let engine = fx.engine(VerifyMode::Fast).with_copier(TruncatingCopier {
            calls: Arc::clone(&calls),
        });
        let result = engine.copy(&fx.card, None).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2, "one write plus one retry");
        assert_eq!(result.errors.len(), 1);
        match &result.errors[0] {
            CopyError::VerifyFailed { path } => assert_eq!(path, &first),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(result.copied_files, 0);
        assert_eq!(result.bytes_copied, 0);

        // Nothing left behind, and the second file was never touched
        let date = layout_date(fs::metadata(&first).unwrap().modified().unwrap());
        assert!(!fx.trip.join(&date).join("camera/A.MOV").exists());
        assert!(!fx.trip.join(&date).join("camera/B.MOV").exists());
    }

    #[test]
    fn test_verify_retry_recovers() {
        let fx = Fixture::new("camera");
        fx.add("A.MOV", b"clip that needs a second try");

        let calls = Arc::new(AtomicUsize::new(0));
        let engine = fx.engine(VerifyMode::Sha256).with_copier(FlakyCopier {
            calls: Arc::clone(&calls),
        });
        let result = engine.copy(&fx.card, None).unwrap();

        assert!(result.is_success(), "errors: {:?}", result.error_messages());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.copied_files, 1);
        assert_eq!(result.bytes_copied, 28);
    }

    #[test]
    fn test_per_file_error_does_not_stop_run() {
        let fx = Fixture::new("camera");
        fx.add("A.JPG", b"aaaa");
        fx.add("B.JPG", b"bbbb");

        // A directory squatting on A's destination cannot be hashed
        fs::create_dir_all(fx.trip.join("photos/A.JPG")).unwrap();

        let calls = Mutex::new(Vec::new());
        let progress = |i: usize, t: usize| calls.lock().unwrap().push((i, t));
        let result = fx.engine(VerifyMode::Fast).copy(&fx.card, Some(&progress)).unwrap();

        assert_eq!(result.errors.len(), 1);
        assert!(matches!(result.errors[0], CopyError::File { .. }));
        assert!(result.fatal_error().is_none());
        assert_eq!(result.copied_files, 1);
        assert!(fx.trip.join("photos/B.JPG").is_file());
        assert_eq!(*calls.lock().unwrap(), vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn test_interrupted_write_leaves_no_destination() {
        let fx = Fixture::new("camera");
        fx.add("A.JPG", b"0123456789abcdef");
        fx.add("B.JPG", b"second");

        let calls = Arc::new(AtomicUsize::new(0));
        let engine = fx.engine(VerifyMode::Fast).with_copier(FailingMidCopy {
            calls: Arc::clone(&calls),
        });
        let result = engine.copy(&fx.card, None).unwrap();

        assert_eq!(result.errors.len(), 1);
        assert!(matches!(
            result.errors[0],
            CopyError::File { source: EngineError::ReadError { .. }, .. }
        ));
        assert!(result.fatal_error().is_none());
        assert!(!fx.trip.join("photos/A.JPG").exists());
        assert_eq!(result.copied_files, 1);
        assert_eq!(fs::read(fx.trip.join("photos/B.JPG")).unwrap(), b"second");
    }

    #[test]
    fn test_interrupted_replace_removes_drifted_copy() {
        let fx = Fixture::new("camera");
        fx.add("A.JPG", b"0123456789abcdef");

        let existing = fx.trip.join("photos/A.JPG");
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, b"drifted").unwrap();

        let engine = fx.engine(VerifyMode::Sha256).with_copier(FailingMidCopy {
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let result = engine.copy(&fx.card, None).unwrap();

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.replaced_files, 0);
        assert!(!existing.exists());

        // The next run copies it cleanly
        let again = fx.engine(VerifyMode::Sha256).copy(&fx.card, None).unwrap();
        assert_eq!(again.copied_files, 1);
        assert_eq!(fs::read(&existing).unwrap(), b"0123456789abcdef");
    }

    #[test]
    fn test_stop_request_is_honoured_between_files() {
        let fx = Fixture::new("camera");
        fx.add("A.JPG", b"a");
        fx.add("B.JPG", b"b");
        fx.add("C.JPG", b"c");

        let progress = StoppingProgress {
            calls: Mutex::new(Vec::new()),
            stop: AtomicBool::new(false),
            stop_after: 1,
        };
        let result = fx.engine(VerifyMode::Fast).copy(&fx.card, Some(&progress)).unwrap();

        assert!(result.cancelled);
        assert!(!result.is_success());
        assert_eq!(result.copied_files, 1);
        assert_eq!(*progress.calls.lock().unwrap(), vec![(1, 3)]);
        assert!(!fx.trip.join("photos/B.JPG").exists());
    }

    #[test]
    fn test_reads_card_root_without_dcim() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let card = temp_dir.path().join("USB");
        fs::create_dir_all(card.join("exports")).unwrap();
        fs::write(card.join("exports/pano.jpg"), b"pano").unwrap();
        fs::write(card.join("readme.txt"), b"ignored").unwrap();

        let engine = CopyEngine::new(TripLayout::new(temp_dir.path().join("trip")), CopyOptions::default());
        let result = engine.copy(&card, None).unwrap();

        assert_eq!(result.copied_files, 1);
        assert_eq!(result.device_label, "camera");
        assert!(temp_dir.path().join("trip/photos/pano.jpg").exists());
    }

    #[test]
    fn test_dcim_limits_the_scan() {
        let fx = Fixture::new("camera");
        fx.add("A.JPG", b"a");
        fs::create_dir_all(fx.card.join("MISC")).unwrap();
        fs::write(fx.card.join("MISC/outside.jpg"), b"x").unwrap();

        let result = fx.engine(VerifyMode::Fast).copy(&fx.card, None).unwrap();
        assert_eq!(result.copied_files, 1);
        assert!(!fx.trip.join("photos/outside.jpg").exists());
    }

    #[test]
    fn test_missing_source_is_job_error() {
        let fx = Fixture::new("camera");
        let result = fx.engine(VerifyMode::Fast).copy(&fx.card.join("gone"), None);
        assert!(matches!(result, Err(EngineError::SourceNotFound { .. })));
    }
}
