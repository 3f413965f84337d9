//! Owned RGBA rasters used by every pipeline stage.
//!
//! [`RasterBuffer`] is the byte surface (straight alpha, row-major, 4 bytes per
//! pixel). [`FloatRaster`] is the unclamped `f32` working copy used by the
//! pixel pass so diffused error is never clipped early.

use image::RgbaImage;
use tiny_skia::{ColorU8, Pixmap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RasterError {
    #[error("raster dimensions {width}x{height} overflowed usize")]
    DimensionsOverflow { width: u32, height: u32 },
    #[error("RGBA buffer length mismatch: expected {expected} bytes, got {actual} bytes")]
    BufferLengthMismatch { expected: usize, actual: usize },
    #[error("failed to allocate drawing surface {width}x{height}")]
    SurfaceAllocation { width: u32, height: u32 },
}

fn byte_len(width: u32, height: u32) -> Result<usize, RasterError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or(RasterError::DimensionsOverflow { width, height })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterBuffer {
    /// Fully transparent raster.
    pub fn new(width: u32, height: u32) -> Result<Self, RasterError> {
        Ok(Self {
            width,
            height,
            data: vec![0; byte_len(width, height)?],
        })
    }

    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, RasterError> {
        let len = byte_len(width, height)?;
        let mut data = Vec::with_capacity(len);
        for _ in 0..len / 4 {
            data.extend_from_slice(&rgba);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap raw straight-alpha RGBA bytes.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RasterError> {
        let expected = byte_len(width, height)?;
        if data.len() != expected {
            return Err(RasterError::BufferLengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    #[inline(always)]
    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize * self.width as usize) + x as usize) << 2
    }

    /// Pixel at `(x, y)`. Panics when out of bounds, like slice indexing.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let idx = self.index(x, y);
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let idx = self.index(x, y);
        self.data[idx..idx + 4].copy_from_slice(&rgba);
    }

    /// Row `y` as a flat RGBA slice.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * 4;
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.width as usize * 4;
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Premultiplied drawing surface holding the same pixels.
    pub fn to_pixmap(&self) -> Result<Pixmap, RasterError> {
        let mut pixmap = Pixmap::new(self.width, self.height).ok_or(
            RasterError::SurfaceAllocation {
                width: self.width,
                height: self.height,
            },
        )?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(self.data.chunks_exact(4)) {
            *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
        }
        Ok(pixmap)
    }

    pub fn from_pixmap(pixmap: &Pixmap) -> Self {
        let mut data = Vec::with_capacity(pixmap.pixels().len() * 4);
        for pixel in pixmap.pixels() {
            let color = pixel.demultiply();
            data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
        Self {
            width: pixmap.width(),
            height: pixmap.height(),
            data,
        }
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }
}

/// Unclamped floating-point RGBA raster.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatRaster {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl FloatRaster {
    pub fn from_raster(raster: &RasterBuffer) -> Self {
        Self {
            width: raster.width,
            height: raster.height,
            data: raster.data.iter().map(|&byte| f32::from(byte)).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline(always)]
    pub fn index(&self, x: usize, y: usize) -> usize {
        ((y * self.width as usize) + x) << 2
    }

    /// Channel value at `(x, y)`; `channel` is 0..4 for R, G, B, A.
    #[inline(always)]
    pub fn channel(&self, x: usize, y: usize, channel: usize) -> f32 {
        self.data[self.index(x, y) + channel]
    }

    #[inline(always)]
    pub fn rgb(&self, x: usize, y: usize) -> [f32; 3] {
        let idx = self.index(x, y);
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    #[inline(always)]
    pub fn set_rgb(&mut self, x: usize, y: usize, rgb: [f32; 3]) {
        let idx = self.index(x, y);
        self.data[idx..idx + 3].copy_from_slice(&rgb);
    }

    /// Add `rgb * weight` to the colour channels at `(x, y)`.
    #[inline(always)]
    pub fn accumulate_rgb(&mut self, x: usize, y: usize, rgb: [f32; 3], weight: f32) {
        let idx = self.index(x, y);
        for (offset, value) in rgb.iter().enumerate() {
            self.data[idx + offset] += value * weight;
        }
    }

    /// Clamp to [0, 255], round to nearest and write into `target`.
    pub fn commit(&self, target: &mut RasterBuffer) -> Result<(), RasterError> {
        if target.data.len() != self.data.len() {
            return Err(RasterError::BufferLengthMismatch {
                expected: self.data.len(),
                actual: target.data.len(),
            });
        }
        for (dst, &value) in target.data.iter_mut().zip(&self.data) {
            *dst = value.clamp(0.0, 255.0).round() as u8;
        }
        Ok(())
    }
}
