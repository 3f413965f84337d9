//! Still-image effect pipeline: cover-fit, pixelate, glitch, RGB shift,
//! grayscale, noise, dithering and logo overlay, applied in that order.
//!
//! [`pipeline::render`] is the entry point; everything else is a stage it
//! sequences or a helper for callers that load and save images.

pub mod codec;
pub mod cover_fit;
pub mod error_codes;
pub mod glitch;
pub mod logo;
pub mod look;
pub mod pipeline;
pub mod pixel_pass;
pub mod prng;
pub mod raster;
pub mod report;
pub mod settings;

pub use pipeline::{render, render_with_rng, PipelineError, RenderRequest};
pub use raster::{FloatRaster, RasterBuffer, RasterError};
pub use settings::{DitherType, GlitchSeed, ImageSettings, LogoPosition, LogoSettings};
