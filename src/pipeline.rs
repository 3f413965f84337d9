//! Single entry point sequencing every stage of the effect pipeline.
//!
//! Order: background fill, cover-fit (with pixelation), glitch slices, pixel
//! pass, logo. Each call allocates its own buffers and drops them on return;
//! the only input that carries over between calls is the caller's glitch seed.

use rand::Rng;
use tiny_skia::{Color, Pixmap};

use crate::cover_fit::draw_cover_fit;
use crate::glitch::apply_glitch;
use crate::logo::composite_logo;
use crate::pixel_pass::apply_pixel_pass;
use crate::raster::{FloatRaster, RasterBuffer, RasterError};
use crate::settings::{ImageSettings, LogoSettings, BACKGROUND_RGBA};

/// Largest target accepted, in pixels (16384 x 16384).
pub const MAX_TARGET_PIXELS: u64 = 1 << 28;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("target {width}x{height} exceeds the {max} pixel limit")]
    TargetTooLarge { width: u32, height: u32, max: u64 },
    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Inputs for one render.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub width: u32,
    pub height: u32,
    pub source: Option<&'a RasterBuffer>,
    pub overlay: Option<&'a RasterBuffer>,
    pub image: ImageSettings,
    pub logo: LogoSettings,
    pub glitch_seed: f64,
}

impl<'a> RenderRequest<'a> {
    pub fn new(width: u32, height: u32, source: Option<&'a RasterBuffer>) -> Self {
        Self {
            width,
            height,
            source,
            overlay: None,
            image: ImageSettings::default(),
            logo: LogoSettings::default(),
            glitch_seed: 0.0,
        }
    }

    pub fn with_overlay(mut self, overlay: Option<&'a RasterBuffer>) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn with_image(mut self, image: ImageSettings) -> Self {
        self.image = image;
        self
    }

    pub fn with_logo(mut self, logo: LogoSettings) -> Self {
        self.logo = logo;
        self
    }

    pub fn with_glitch_seed(mut self, glitch_seed: f64) -> Self {
        self.glitch_seed = glitch_seed;
        self
    }
}

/// Render with the thread-local generator feeding the noise stage.
pub fn render(request: &RenderRequest<'_>) -> Result<RasterBuffer, PipelineError> {
    render_with_rng(request, &mut rand::rng())
}

/// Render with an explicit noise generator.
pub fn render_with_rng<R: Rng + ?Sized>(
    request: &RenderRequest<'_>,
    noise: &mut R,
) -> Result<RasterBuffer, PipelineError> {
    // Zero-sized targets are clamped rather than rejected.
    let width = request.width.max(1);
    let height = request.height.max(1);
    if u64::from(width) * u64::from(height) > MAX_TARGET_PIXELS {
        return Err(PipelineError::TargetTooLarge {
            width,
            height,
            max: MAX_TARGET_PIXELS,
        });
    }

    let image = request.image.normalized();
    let logo = request.logo.normalized();

    let mut canvas = Pixmap::new(width, height).ok_or(RasterError::SurfaceAllocation { width, height })?;
    let [r, g, b, a] = BACKGROUND_RGBA;
    canvas.fill(Color::from_rgba8(r, g, b, a));

    let Some(source) = request.source.filter(|source| !source.is_empty()) else {
        log::debug!("no source image, rendering background only");
        return Ok(RasterBuffer::from_pixmap(&canvas));
    };

    draw_cover_fit(&mut canvas, source, image.pixelate)?;
    let mut raster = RasterBuffer::from_pixmap(&canvas);
    drop(canvas);

    apply_glitch(&mut raster, image.glitch, request.glitch_seed);

    let mut working = FloatRaster::from_raster(&raster);
    let snapshot = working.clone();
    apply_pixel_pass(&mut working, &snapshot, &image, noise);
    working.commit(&mut raster)?;

    if let Some(overlay) = request.overlay {
        let mut canvas = raster.to_pixmap()?;
        if composite_logo(&mut canvas, overlay, &logo)?.is_some() {
            raster = RasterBuffer::from_pixmap(&canvas);
        }
    }

    Ok(raster)
}
