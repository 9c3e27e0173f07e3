//! Configuration for a backup device.
//!
//! Configuration is a typed `Config` value built from the embedded base
//! template (`config.default.toml`) with an optional user override file merged
//! over it, table by table. Keys the override does not mention keep their base
//! value; keys neither file knows about are ignored.
//!
//! There is no process-wide config: callers load a `Config` and pass it (or
//! the pieces they need) into the engine explicitly.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use toml::{Table, Value};

use crate::error::ConfigError;
use crate::model::{DeviceCode, VerifyMode};

/// The base template every configuration starts from.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config.default.toml");

/// Gigabytes in config are decimal.
const BYTES_PER_GB: u64 = 1_000_000_000;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub trip: TripConfig,
    pub verify: VerifyConfig,
    pub limits: LimitsConfig,
    pub previews: PreviewsConfig,

    /// Device code -> label used in destination paths
    pub device_labels: BTreeMap<String, String>,

    pub logging: LoggingConfig,
}

/// Mount points and directory names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Mount point of the backup volume
    pub nvme_mount: PathBuf,

    /// Directories whose children are candidate card mounts
    pub source_roots: Vec<PathBuf>,

    /// Proxy cache directory name, under the backup root
    pub proxies_subdir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            nvme_mount: PathBuf::from("/mnt/nvme"),
            source_roots: vec![
                PathBuf::from("/media"),
                PathBuf::from("/run/media"),
                PathBuf::from("/Volumes"),
            ],
            proxies_subdir: "proxies".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripConfig {
    pub name: String,
}

impl Default for TripConfig {
    fn default() -> Self {
        TripConfig {
            name: "trip".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub mode: VerifyMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Free space to keep on the backup volume, in GB
    pub min_free_gb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig { min_free_gb: 10 }
    }
}

/// Proxy cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewsConfig {
    /// Cache budget, in GB
    pub max_cache_gb: u64,

    /// Proxy height in pixels; width follows the aspect ratio
    pub video_height: u32,

    /// Target video bitrate in ffmpeg notation (`1200k`)
    #[serde(deserialize_with = "bitrate_from_any")]
    pub video_bitrate: String,

    /// Transcoder program
    pub ffmpeg: PathBuf,
}

impl Default for PreviewsConfig {
    fn default() -> Self {
        PreviewsConfig {
            max_cache_gb: 20,
            video_height: 480,
            video_bitrate: "1200k".to_string(),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

/// Accept `video_bitrate = "1200k"` as well as `video_bitrate = 1200000`.
fn bitrate_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Bitrate {
        Text(String),
        Number(u64),
    }

    Ok(match Bitrate::deserialize(deserializer)? {
        Bitrate::Text(s) => s,
        Bitrate::Number(n) => n.to_string(),
    })
}

impl Config {
    /// Load the base template, merging `override_path` over it if given and present.
    pub fn load(override_path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut table = parse_table(DEFAULT_CONFIG_TOML, "default template")?;

        if let Some(path) = override_path.filter(|p| p.exists()) {
            let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            })?;
            let overrides = parse_table(&text, &path.display().to_string())?;
            merge(&mut table, overrides);
            log::debug!("Merged config override from {}", path.display());
        }

        let config = from_table(table, "merged config")?;
        config.validate()?;
        Ok(config)
    }

    /// Build a config from override text merged over the base template.
    pub fn from_toml_str(text: &str) -> Result<Config, ConfigError> {
        let mut table = parse_table(DEFAULT_CONFIG_TOML, "default template")?;
        merge(&mut table, parse_table(text, "inline config")?);
        let config = from_table(table, "inline config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break the directory layout or the transcoder.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_dir_name("trip.name", &self.trip.name)?;
        check_dir_name("paths.proxies_subdir", &self.paths.proxies_subdir)?;
        for (code, label) in &self.device_labels {
            if let Some(problem) = dir_name_problem(label) {
                return Err(ConfigError::Invalid {
                    key: "device_labels",
                    reason: format!("label for {} {}", code, problem),
                });
            }
        }
        if self.previews.video_height == 0 {
            return Err(ConfigError::Invalid {
                key: "previews.video_height",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.previews.video_bitrate.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "previews.video_bitrate",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Write the effective configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = self.to_toml_string()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        fs::write(path, text).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// The effective configuration as TOML text.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The free-space floor in bytes.
    pub fn min_free_bytes(&self) -> u64 {
        self.limits.min_free_gb.saturating_mul(BYTES_PER_GB)
    }

    /// The proxy cache budget in bytes.
    pub fn max_cache_bytes(&self) -> u64 {
        self.previews.max_cache_gb.saturating_mul(BYTES_PER_GB)
    }

    /// Label for a device code; the code itself when unmapped.
    pub fn device_label(&self, code: DeviceCode) -> String {
        label_for(&self.device_labels, code)
    }
}

/// Look up `code` in a label map, falling back to the code.
pub fn label_for(labels: &BTreeMap<String, String>, code: DeviceCode) -> String {
    labels
        .get(code.as_str())
        .cloned()
        .unwrap_or_else(|| code.as_str().to_string())
}

/// A single path component: not empty, no separators, not `.` or `..`.
fn check_dir_name(key: &'static str, name: &str) -> Result<(), ConfigError> {
    match dir_name_problem(name) {
        Some(problem) => Err(ConfigError::Invalid {
            key,
            reason: problem.to_string(),
        }),
        None => Ok(()),
    }
}

/// Why `name` cannot be used as one path component, if it cannot.
fn dir_name_problem(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        Some("must not be empty")
    } else if name.contains(['/', '\\']) {
        Some("must be a single directory name")
    } else if name == "." || name == ".." {
        Some("must not be a relative path marker")
    } else {
        None
    }
}

fn parse_table(text: &str, origin: &str) -> Result<Table, ConfigError> {
    let mut table: Table = text.parse().map_err(|e| ConfigError::Parse {
        origin: origin.to_string(),
        source: e,
    })?;
    normalize_aliases(&mut table);
    Ok(table)
}

fn from_table(table: Table, origin: &str) -> Result<Config, ConfigError> {
    Value::Table(table).try_into::<Config>().map_err(|e| ConfigError::Parse {
        origin: origin.to_string(),
        source: e,
    })
}

/// Older config files spell the verify mode `verify.default_mode`.
fn normalize_aliases(table: &mut Table) {
    if let Some(Value::Table(verify)) = table.get_mut("verify") {
        if let Some(mode) = verify.remove("default_mode") {
            verify.entry("mode").or_insert(mode);
        }
    }
}

/// Deep-merge `overrides` into `base`. Nested tables merge; anything else replaces.
fn merge(base: &mut Table, overrides: Table) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(base_table)), Value::Table(override_table)) => {
                merge(base_table, override_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
