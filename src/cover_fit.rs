//! Cover-fit sampling with optional pixelation.
//!
//! The source is cropped to the target aspect ratio (centered, no distortion),
//! resampled smoothly to a reduced intermediate raster, then blown back up to
//! the target with nearest-neighbour so the reduction shows as blocks.

use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};

use crate::raster::{RasterBuffer, RasterError};

/// Source-space crop rectangle. May have fractional edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Centered crop of the source whose aspect equals the target aspect.
pub fn cover_crop(target_width: u32, target_height: u32, source_width: u32, source_height: u32) -> CropRect {
    let target_width = f64::from(target_width.max(1));
    let target_height = f64::from(target_height.max(1));
    let source_width = f64::from(source_width.max(1));
    let source_height = f64::from(source_height.max(1));

    let source_aspect = source_width / source_height;
    let target_aspect = target_width / target_height;

    if source_aspect > target_aspect {
        let width = source_height * target_aspect;
        CropRect {
            x: (source_width - width) / 2.0,
            y: 0.0,
            width,
            height: source_height,
        }
    } else {
        let height = source_width / target_aspect;
        CropRect {
            x: 0.0,
            y: (source_height - height) / 2.0,
            width: source_width,
            height,
        }
    }
}

/// Reduction factor for the intermediate raster; 1.0 disables pixelation.
pub fn pixelate_scale(pixelate: u32) -> f64 {
    if pixelate == 0 {
        return 1.0;
    }
    let amount = f64::from(pixelate.min(100)) / 100.0;
    (1.0 - amount * 0.98).max(0.01)
}

/// Intermediate raster size, never smaller than 1x1.
pub fn intermediate_size(target_width: u32, target_height: u32, scale: f64) -> (u32, u32) {
    let width = (f64::from(target_width) * scale).floor() as u32;
    let height = (f64::from(target_height) * scale).floor() as u32;
    (width.max(1), height.max(1))
}

/// Sample `source` into `target` (source-over onto whatever `target` holds).
pub fn draw_cover_fit(target: &mut Pixmap, source: &RasterBuffer, pixelate: u32) -> Result<(), RasterError> {
    if source.is_empty() {
        return Ok(());
    }

    let (target_width, target_height) = (target.width(), target.height());
    let crop = cover_crop(target_width, target_height, source.width(), source.height());
    let (small_width, small_height) = intermediate_size(target_width, target_height, pixelate_scale(pixelate));

    let source_pixmap = source.to_pixmap()?;
    let mut small = Pixmap::new(small_width, small_height).ok_or(RasterError::SurfaceAllocation {
        width: small_width,
        height: small_height,
    })?;

    let smooth = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    small.draw_pixmap(0, 0, source_pixmap.as_ref(), &smooth, crop_transform(&crop, small_width, small_height), None);

    let blocky = PixmapPaint {
        quality: FilterQuality::Nearest,
        ..PixmapPaint::default()
    };
    let upscale = Transform::from_scale(
        target_width as f32 / small_width as f32,
        target_height as f32 / small_height as f32,
    );
    target.draw_pixmap(0, 0, small.as_ref(), &blocky, upscale, None);

    log::debug!(
        "cover-fit: crop {:.1},{:.1} {:.1}x{:.1} -> {}x{} -> {}x{}",
        crop.x,
        crop.y,
        crop.width,
        crop.height,
        small_width,
        small_height,
        target_width,
        target_height
    );
    Ok(())
}

/// Transform mapping `crop` in source space onto `(0, 0, width, height)`.
fn crop_transform(crop: &CropRect, width: u32, height: u32) -> Transform {
    let scale_x = f64::from(width) / crop.width;
    let scale_y = f64::from(height) / crop.height;
    Transform::from_row(
        scale_x as f32,
        0.0,
        0.0,
        scale_y as f32,
        (-crop.x * scale_x) as f32,
        (-crop.y * scale_y) as f32,
    )
}
