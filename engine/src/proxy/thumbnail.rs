//! Photo thumbnails.

use std::fs;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use crate::error::EngineError;

/// Thumbnails fit inside a square of this many pixels.
pub const THUMBNAIL_MAX_SIZE: u32 = 720;

const THUMBNAIL_QUALITY: u8 = 85;

/// Decode `src`, shrink it to fit the thumbnail box and write a JPEG to `dst`.
///
/// Images already inside the box keep their size.
pub fn make_thumbnail(src: &Path, dst: &Path) -> Result<(), EngineError> {
    let thumbnail_error = |source: image::ImageError| EngineError::ThumbnailFailed {
        path: src.to_path_buf(),
        source,
    };

    let img = ImageReader::open(src)
        .map_err(|e| EngineError::ReadError {
            path: src.to_path_buf(),
            source: e,
        })?
        .with_guessed_format()
        .map_err(|e| EngineError::ReadError {
            path: src.to_path_buf(),
            source: e,
        })?
        .decode()
        .map_err(thumbnail_error)?;

    let img = if img.width() > THUMBNAIL_MAX_SIZE || img.height() > THUMBNAIL_MAX_SIZE {
        img.resize(THUMBNAIL_MAX_SIZE, THUMBNAIL_MAX_SIZE, FilterType::Triangle)
    } else {
        img
    };
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let file = fs::File::create(dst).map_err(|e| EngineError::WriteError {
        path: dst.to_path_buf(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, THUMBNAIL_QUALITY);
    rgb.write_with_encoder(encoder).map_err(thumbnail_error)?;

    writer
        .into_inner()
        .map_err(|e| EngineError::WriteError {
            path: dst.to_path_buf(),
            source: e.into_error(),
        })?
        .sync_all()
        .map_err(|e| EngineError::WriteError {
            path: dst.to_path_buf(),
            source: e,
        })
}
