//! Destination layout on the backup volume.
//!
//! ```text
//! <nvme_mount>/Blackbox/
//!     trips/<trip>/photos/<file>
//!     trips/<trip>/<YYYY-MM-DD>/<device label>/<file>
//!     <proxies_subdir>/<flattened source path>.mp4|.jpg
//! ```
//!
//! These paths are read by other tools on the device and must not change.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

use crate::config::Config;
use crate::error::EngineError;
use crate::fs_ops;
use crate::model::{MediaFile, MediaKind};

const BACKUP_DIR: &str = "Blackbox";
const TRIPS_DIR: &str = "trips";
const PHOTOS_DIR: &str = "photos";

/// Resolved directory layout for one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Mount point of the backup volume
    pub nvme_mount: PathBuf,
    /// `<mount>/Blackbox`
    pub root: PathBuf,
    /// `<root>/trips`
    pub trips: PathBuf,
    /// Proxy cache directory
    pub proxies: PathBuf,
    trip_name: String,
}

impl Paths {
    pub fn from_config(config: &Config) -> Self {
        let nvme_mount = config.paths.nvme_mount.clone();
        let root = nvme_mount.join(BACKUP_DIR);
        Paths {
            trips: root.join(TRIPS_DIR),
            proxies: root.join(&config.paths.proxies_subdir),
            root,
            nvme_mount,
            trip_name: config.trip.name.clone(),
        }
    }

    /// Create the backup root, trips and proxy directories.
    pub fn ensure(&self) -> Result<&Self, EngineError> {
        for dir in [&self.root, &self.trips, &self.proxies] {
            fs_ops::ensure_dir(dir)?;
        }
        Ok(self)
    }

    pub fn trip_root(&self) -> PathBuf {
        self.trips.join(&self.trip_name)
    }

    pub fn trip_layout(&self) -> TripLayout {
        TripLayout::new(self.trip_root())
    }
}

/// Where files of one trip go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripLayout {
    root: PathBuf,
}

impl TripLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        TripLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All photos of a trip share one flat directory.
    pub fn photos_dir(&self) -> PathBuf {
        self.root.join(PHOTOS_DIR)
    }

    /// Videos are bucketed by day, then by device.
    pub fn videos_dir(&self, date: &str, device_label: &str) -> PathBuf {
        self.root.join(date).join(device_label)
    }

    /// Destination for a media file.
    ///
    /// The video date comes from the source modification time in local time,
    /// never from the time of the copy.
    pub fn destination_for(&self, file: &MediaFile, device_label: &str) -> PathBuf {
        let dir = match file.kind {
            MediaKind::Photo => self.photos_dir(),
            MediaKind::Video => self.videos_dir(&date_folder(file.modified), device_label),
        };
        match file.path.file_name() {
            Some(name) => dir.join(name),
            None => dir,
        }
    }
}

/// `YYYY-MM-DD` for a timestamp, in local time.
pub fn date_folder(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local_time(y: i32, m: u32, d: u32, h: u32) -> SystemTime {
        Local
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .single()
            .expect("Unambiguous local time")
            .into()
    }

    #[test]
    fn test_paths_from_config() {
        let mut config = Config::default();
        config.paths.nvme_mount = PathBuf::from("/mnt/ssd");
        config.trip.name = "patagonia".to_string();

        let paths = Paths::from_config(&config);
        assert_eq!(paths.root, PathBuf::from("/mnt/ssd/Blackbox"));
        assert_eq!(paths.proxies, PathBuf::from("/mnt/ssd/Blackbox/proxies"));
        assert_eq!(paths.trip_root(), PathBuf::from("/mnt/ssd/Blackbox/trips/patagonia"));
    }

    #[test]
    fn test_video_bucketed_by_source_date_and_label() {
        let layout = TripLayout::new("/trip");
        let file = MediaFile {
            path: PathBuf::from("/card/DCIM/100GOPRO/GX010001.MP4"),
            kind: MediaKind::Video,
            size: 1,
            modified: local_time(2024, 3, 2, 10),
        };

        assert_eq!(
            layout.destination_for(&file, "gopro"),
            PathBuf::from("/trip/2024-03-02/gopro/GX010001.MP4")
        );
    }

    #[test]
    fn test_photos_are_flat() {
        let layout = TripLayout::new("/trip");
        let file = MediaFile {
            path: PathBuf::from("/card/DCIM/101MSDCF/DSC00042.ARW"),
            kind: MediaKind::Photo,
            size: 1,
            modified: local_time(2023, 12, 31, 23),
        };

        assert_eq!(
            layout.destination_for(&file, "camera"),
            PathBuf::from("/trip/photos/DSC00042.ARW")
        );
    }

    #[test]
    fn test_ensure_creates_directories() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = Config::default();
        config.paths.nvme_mount = temp_dir.path().to_path_buf();

        let paths = Paths::from_config(&config);
        paths.ensure().expect("Failed to create layout");

        assert!(paths.trips.is_dir());
        assert!(paths.proxies.is_dir());
    }
}
