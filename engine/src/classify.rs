//! Source card discovery and classification.
//!
//! Both operations only look at directory names and the presence of a few
//! folders; nothing is read or written.

use std::fs;
use std::path::{Path, PathBuf};

use crate::model::DeviceCode;

/// Names of the camera media folder at the top of a card.
const DCIM_NAMES: &[&str] = &["DCIM", "dcim"];

/// DJI cards keep footage in `DCIM/100MEDIA`.
const DJI_MEDIA_DIR: &str = "100MEDIA";

const THREE_SIXTY_HINTS: &[&str] = &["360", "max", "fusion"];
const LUMIX_HINTS: &[&str] = &["lumix", "panasonic", "g7"];

/// Classify a card by its mount name and folder layout.
///
/// Heuristics run most-distinctive first and the first match wins:
/// GoPro name, DJI folder or name, 360 camera names, Lumix/Panasonic names,
/// then `camera`. The order is part of the contract.
pub fn classify_device_code(root: &Path) -> DeviceCode {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if name.contains("gopro") {
        return DeviceCode::GoPro;
    }
    if root.join("DCIM").join(DJI_MEDIA_DIR).is_dir() || name.contains("dji") {
        return DeviceCode::Drone;
    }
    if THREE_SIXTY_HINTS.iter().any(|hint| name.contains(hint)) {
        return DeviceCode::ThreeSixty;
    }
    if LUMIX_HINTS.iter().any(|hint| name.contains(hint)) {
        return DeviceCode::LumixG7;
    }
    DeviceCode::Camera
}

/// Candidate mounts: the immediate child directories of every existing root.
///
/// One level is enough for `/media/$USER/*`-style automounters when the user
/// directory itself is listed as a root. Results are sorted per root.
pub fn iter_mounts<P: AsRef<Path>>(source_roots: &[P]) -> Vec<PathBuf> {
    let mut mounts = Vec::new();

    for root in source_roots {
        let root = root.as_ref();
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        let mut children: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        children.sort();
        mounts.extend(children);
    }

    mounts
}

/// Mounts that carry a DCIM folder directly below them.
pub fn find_dcim_mounts<P: AsRef<Path>>(source_roots: &[P]) -> Vec<PathBuf> {
    iter_mounts(source_roots)
        .into_iter()
        .filter(|mount| DCIM_NAMES.iter().any(|dcim| mount.join(dcim).is_dir()))
        .collect()
}

/// The first DCIM mount, if any.
pub fn find_first_dcim<P: AsRef<Path>>(source_roots: &[P]) -> Option<PathBuf> {
    find_dcim_mounts(source_roots).into_iter().next()
}
