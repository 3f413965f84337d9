//! File-level decode/encode around the pipeline.
//!
//! The pipeline itself only sees [`RasterBuffer`]s; this module turns image
//! files into rasters and writes finished rasters back out as PNG.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader};

use crate::raster::RasterBuffer;

/// Decoded images larger than this many pixels are rejected before decoding.
pub const MAX_DECODE_PIXELS: u64 = 1 << 28;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{path} is {width}x{height}, above the {max} pixel decode limit")]
    TooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max: u64,
    },
    #[error("failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },
}

/// Decode any supported image file to straight-alpha RGBA.
pub fn decode_file(path: &Path) -> Result<RasterBuffer, CodecError> {
    let bytes = fs::read(path).map_err(|source| CodecError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode_bytes(&bytes, path)
}

/// Decode in-memory bytes; `origin` is only used in error messages.
pub fn decode_bytes(bytes: &[u8], origin: &Path) -> Result<RasterBuffer, CodecError> {
    let decode_error = |source| CodecError::Decode {
        path: origin.to_path_buf(),
        source,
    };

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|source| CodecError::Read {
            path: origin.to_path_buf(),
            source,
        })?;
    let (width, height) = reader.into_dimensions().map_err(decode_error)?;
    if u64::from(width) * u64::from(height) > MAX_DECODE_PIXELS {
        return Err(CodecError::TooLarge {
            path: origin.to_path_buf(),
            width,
            height,
            max: MAX_DECODE_PIXELS,
        });
    }

    let decoded = image::load_from_memory(bytes).map_err(decode_error)?;
    let raster = RasterBuffer::from_image(decoded.to_rgba8());
    log::debug!(
        "decoded {} ({}x{})",
        origin.display(),
        raster.width(),
        raster.height()
    );
    Ok(raster)
}

/// Load an optional overlay. Failures are logged and reported as "no overlay".
pub fn load_overlay(path: &Path) -> Option<RasterBuffer> {
    match decode_file(path) {
        Ok(raster) if !raster.is_empty() => Some(raster),
        Ok(_) => {
            log::warn!("logo {} is empty, rendering without it", path.display());
            None
        }
        Err(error) => {
            log::warn!("logo unavailable, rendering without it: {error}");
            None
        }
    }
}

/// PNG-encode `raster` in memory.
pub fn encode_png_bytes(raster: &RasterBuffer, origin: &Path) -> Result<Vec<u8>, CodecError> {
    let encode_error = |message: String| CodecError::Encode {
        path: origin.to_path_buf(),
        message,
    };
    let image = raster
        .to_image()
        .ok_or_else(|| encode_error("raster buffer does not match its dimensions".to_owned()))?;
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|error| encode_error(error.to_string()))?;
    Ok(out.into_inner())
}

/// Write `raster` to `path` as PNG, creating parent directories.
pub fn encode_png(raster: &RasterBuffer, path: &Path) -> Result<(), CodecError> {
    let bytes = encode_png_bytes(raster, path)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|error| CodecError::Encode {
                path: path.to_path_buf(),
                message: format!("failed to create output dir {}: {error}", parent.display()),
            })?;
        }
    }
    fs::write(path, bytes).map_err(|error| CodecError::Encode {
        path: path.to_path_buf(),
        message: error.to_string(),
    })
}
