//! Anchored logo placement and source-over blending.

use tiny_skia::{BlendMode, FilterQuality, Pixmap, PixmapPaint, Transform};

use crate::raster::{RasterBuffer, RasterError};
use crate::settings::{LogoPosition, LogoSettings};

/// Target-space rectangle the overlay is drawn into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoPlacement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

/// Placement for an `overlay_width` x `overlay_height` logo, or `None` when
/// the overlay has no area.
pub fn logo_placement(
    target_width: u32,
    target_height: u32,
    overlay_width: u32,
    overlay_height: u32,
    settings: &LogoSettings,
) -> Option<LogoPlacement> {
    if overlay_width == 0 || overlay_height == 0 {
        return None;
    }

    let target_w = f64::from(target_width);
    let target_h = f64::from(target_height);
    let width = target_w * f64::from(settings.size) / 100.0;
    let height = width * f64::from(overlay_height) / f64::from(overlay_width);
    let padding = target_w * 5.0 / 100.0;

    let (x, y) = match settings.position {
        LogoPosition::TopLeft => (padding, padding),
        LogoPosition::TopRight => (target_w - width - padding, padding),
        LogoPosition::BottomLeft => (padding, target_h - height - padding),
        LogoPosition::BottomRight => (target_w - width - padding, target_h - height - padding),
        LogoPosition::Center => ((target_w - width) / 2.0, (target_h - height) / 2.0),
    };

    Some(LogoPlacement {
        x,
        y,
        width,
        height,
        padding,
    })
}

/// Blend `overlay` onto `target` at its anchored placement.
///
/// The overlay's own alpha is multiplied by `opacity / 100`. Returns the
/// placement used, or `None` when nothing was drawn.
pub fn composite_logo(
    target: &mut Pixmap,
    overlay: &RasterBuffer,
    settings: &LogoSettings,
) -> Result<Option<LogoPlacement>, RasterError> {
    let Some(placement) = logo_placement(
        target.width(),
        target.height(),
        overlay.width(),
        overlay.height(),
        settings,
    ) else {
        log::warn!(
            "logo overlay {}x{} has no area, skipping",
            overlay.width(),
            overlay.height()
        );
        return Ok(None);
    };

    if settings.opacity == 0 {
        return Ok(Some(placement));
    }

    let overlay_pixmap = overlay.to_pixmap()?;
    let paint = PixmapPaint {
        opacity: settings.opacity.min(100) as f32 / 100.0,
        blend_mode: BlendMode::SourceOver,
        quality: FilterQuality::Nearest,
    };
    let transform = Transform::from_row(
        (placement.width / f64::from(overlay.width())) as f32,
        0.0,
        0.0,
        (placement.height / f64::from(overlay.height())) as f32,
        placement.x as f32,
        placement.y as f32,
    );
    target.draw_pixmap(0, 0, overlay_pixmap.as_ref(), &paint, transform, None);

    log::debug!(
        "logo: {:.1}x{:.1} at {:.1},{:.1} ({:?}, opacity {})",
        placement.width,
        placement.height,
        placement.x,
        placement.y,
        settings.position,
        settings.opacity
    );
    Ok(Some(placement))
}
