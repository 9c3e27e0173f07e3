//! Video proxy transcoding through an external program.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::EngineError;

/// Size and rate of generated video proxies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    /// Output height in pixels; width follows the source aspect ratio
    pub height: u32,

    /// Target bitrate in ffmpeg notation
    pub bitrate: String,
}

impl Default for ProxySettings {
    fn default() -> Self {
        ProxySettings {
            height: 480,
            bitrate: "1200k".to_string(),
        }
    }
}

/// Produces a video proxy for one source file.
pub trait VideoTranscoder: Send {
    /// Write a proxy of `src` to `dst`.
    ///
    /// On error `dst` may hold partial output; the caller removes it.
    fn transcode(&self, src: &Path, dst: &Path, settings: &ProxySettings) -> Result<(), EngineError>;
}

/// Runs `ffmpeg` (or a compatible program) to completion.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        FfmpegTranscoder {
            program: program.into(),
        }
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl VideoTranscoder for FfmpegTranscoder {
    fn transcode(&self, src: &Path, dst: &Path, settings: &ProxySettings) -> Result<(), EngineError> {
        let output = Command::new(&self.program)
            .args(ffmpeg_args(src, dst, settings))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| EngineError::TranscodeFailed {
                path: src.to_path_buf(),
                reason: format!("Failed to run {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("no diagnostic output");
            return Err(EngineError::TranscodeFailed {
                path: src.to_path_buf(),
                reason: format!("{} ({})", last_line.trim(), output.status),
            });
        }

        Ok(())
    }
}

/// H.264 at a capped height, fast preset, moov atom up front, no audio.
pub fn ffmpeg_args(src: &Path, dst: &Path, settings: &ProxySettings) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-nostdin".into(), "-i".into(), src.into()];
    args.extend(
        [
            "-vf".to_string(),
            format!("scale=-2:{}", settings.height),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-b:v".to_string(),
            settings.bitrate.clone(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-an".to_string(),
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(dst.into());
    args
}
