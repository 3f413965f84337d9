use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::glitch::plan_slices;
use crate::pixel_pass::rgb_shift_amount;
use crate::raster::RasterBuffer;
use crate::settings::{DitherType, ImageSettings, LogoSettings};

/// Machine-readable summary of one finished render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    pub ok: bool,
    /// Where the PNG was written
    pub output: String,
    pub width: u32,
    pub height: u32,
    pub glitch_seed: f64,
    pub image: ImageSettings,
    /// Absent when no logo was available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<LogoSettings>,
    pub stages: StageSummary,
    /// sha256 of the raw RGBA bytes (for determinism tracking)
    pub rgba_sha256: String,
}

/// Which stages did work, derived from the settings actually used.
#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub pixelated: bool,
    pub glitch_slices: usize,
    pub rgb_shift_px: usize,
    pub grayscale: bool,
    pub noise: bool,
    pub dither: &'static str,
}

impl StageSummary {
    pub fn from_settings(image: &ImageSettings, width: u32, height: u32) -> Self {
        let image = image.normalized();
        Self {
            pixelated: image.pixelate > 0,
            glitch_slices: plan_slices(image.glitch, 0.0, width, height).len(),
            rgb_shift_px: rgb_shift_amount(image.rgb_shift, width),
            grayscale: !image.color_mode,
            noise: image.noise > 0,
            dither: image.dither_type.keyword(),
        }
    }

    /// Nothing but the background fill ran.
    pub fn background_only() -> Self {
        Self {
            pixelated: false,
            glitch_slices: 0,
            rgb_shift_px: 0,
            grayscale: false,
            noise: false,
            dither: DitherType::None.keyword(),
        }
    }
}

impl RenderReport {
    /// `had_source` is false when the render was background only; the stage
    /// summary and logo are then reported as skipped.
    pub fn new(
        output: String,
        raster: &RasterBuffer,
        glitch_seed: f64,
        image: ImageSettings,
        logo: Option<LogoSettings>,
        had_source: bool,
    ) -> Self {
        let stages = if had_source {
            StageSummary::from_settings(&image, raster.width(), raster.height())
        } else {
            StageSummary::background_only()
        };
        Self {
            ok: true,
            output,
            width: raster.width(),
            height: raster.height(),
            glitch_seed,
            image,
            logo: logo.filter(|_| had_source),
            stages,
            rgba_sha256: sha256_hex(raster.data()),
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
