//! Seed-locked horizontal slice displacement.
//!
//! Each slice is a full-width band of rows copied onto itself with a signed
//! horizontal offset. Slices are applied in order and each one reads the
//! raster as left by the previous slice, so overlapping bands compound.

use crate::prng::SeedSequence;
use crate::raster::RasterBuffer;

/// Geometry of one displaced band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlitchSlice {
    pub y: u32,
    pub height: u32,
    /// Horizontal shift in pixels; may be fractional and negative.
    pub offset: f64,
}

/// Slice geometry for `glitch` (0..=100) on a `width` x `height` raster.
///
/// Slice `n` consumes seeds `seed + 3n`, `seed + 3n + 1`, `seed + 3n + 2` for
/// position, height and offset respectively. Empty when `glitch == 0`.
pub fn plan_slices(glitch: u32, seed: f64, width: u32, height: u32) -> Vec<GlitchSlice> {
    if glitch == 0 {
        return Vec::new();
    }

    let intensity = f64::from(glitch.min(100)) / 100.0;
    let count = (intensity * 20.0).floor() as usize + 1;
    let width = f64::from(width);
    let height_f = f64::from(height);
    let mut sequence = SeedSequence::new(seed);

    (0..count)
        .map(|_| {
            let r_y = sequence.next_unit();
            let r_h = sequence.next_unit();
            let r_o = sequence.next_unit();
            GlitchSlice {
                y: (r_y * height_f).floor() as u32,
                height: (r_h * (height_f / 5.0)).floor() as u32 + 5,
                offset: (r_o - 0.5) * (width * intensity * 0.5),
            }
        })
        .collect()
}

/// Apply the planned slices in place. Alpha moves with its pixel.
pub fn apply_glitch(raster: &mut RasterBuffer, glitch: u32, seed: f64) {
    if raster.is_empty() {
        return;
    }
    let slices = plan_slices(glitch, seed, raster.width(), raster.height());
    for slice in &slices {
        shift_slice(raster, slice);
    }
    if !slices.is_empty() {
        log::debug!("glitch: {} slices (amount {glitch}, seed {seed})", slices.len());
    }
}

fn shift_slice(raster: &mut RasterBuffer, slice: &GlitchSlice) {
    let width = raster.width() as usize;
    let end = slice.y.saturating_add(slice.height).min(raster.height());
    let mut source_row = vec![0_u8; width * 4];

    for y in slice.y..end {
        source_row.copy_from_slice(raster.row(y));
        let row = raster.row_mut(y);
        for x in 0..width {
            // Nearest sample of the shifted band; columns with no source stay as they are.
            let src_x = (x as f64 + 0.5 - slice.offset).floor();
            if src_x < 0.0 || src_x >= width as f64 {
                continue;
            }
            let src = (src_x as usize) << 2;
            let dst = x << 2;
            row[dst..dst + 4].copy_from_slice(&source_row[src..src + 4]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::seeded_random;

    fn column_coded(width: u32, height: u32) -> RasterBuffer {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 7, 255]);
            }
        }
        RasterBuffer::from_rgba(width, height, data).expect("raster should wrap")
    }

    #[test]
    fn zero_glitch_plans_nothing() {
        assert!(plan_slices(0, 42.0, 100, 100).is_empty());
    }

    #[test]
    fn slice_count_follows_intensity() {
        assert_eq!(plan_slices(1, 1.0, 64, 64).len(), 1);
        assert_eq!(plan_slices(50, 1.0, 64, 64).len(), 11);
        assert_eq!(plan_slices(100, 1.0, 64, 64).len(), 21);
    }

    #[test]
    fn slice_n_uses_seed_offsets_3n() {
        let seed = 77.0;
        let slices = plan_slices(40, seed, 200, 100);
        for (n, slice) in slices.iter().enumerate() {
            let base = seed + 3.0 * n as f64;
            assert_eq!(slice.y, (seeded_random(base) * 100.0).floor() as u32);
            assert_eq!(slice.height, (seeded_random(base + 1.0) * 20.0).floor() as u32 + 5);
            let expected = (seeded_random(base + 2.0) - 0.5) * (200.0 * 0.4 * 0.5);
            assert_eq!(slice.offset, expected);
        }
    }

    #[test]
    fn slice_bounds_hold() {
        for seed in [0.0, 3.5, 1_700_000_000_123.0] {
            for slice in plan_slices(100, seed, 400, 300) {
                assert!(slice.y < 300);
                assert!(slice.height >= 5 && slice.height <= 65);
                assert!(slice.offset.abs() <= 100.0);
            }
        }
    }

    #[test]
    fn positive_offset_moves_band_right_and_keeps_uncovered_columns() {
        let mut raster = column_coded(10, 8);
        let slice = GlitchSlice {
            y: 2,
            height: 3,
            offset: 3.0,
        };
        shift_slice(&mut raster, &slice);

        for y in 2..5 {
            assert_eq!(raster.pixel(0, y), [0, y as u8, 7, 255], "uncovered column unchanged");
            assert_eq!(raster.pixel(2, y), [2, y as u8, 7, 255]);
            assert_eq!(raster.pixel(3, y), [0, y as u8, 7, 255]);
            assert_eq!(raster.pixel(9, y), [6, y as u8, 7, 255]);
        }
        assert_eq!(raster.pixel(5, 1), [5, 1, 7, 255], "rows outside band unchanged");
        assert_eq!(raster.pixel(5, 5), [5, 5, 7, 255]);
    }

    #[test]
    fn negative_offset_clips_without_wraparound() {
        let mut raster = column_coded(10, 4);
        let slice = GlitchSlice {
            y: 0,
            height: 2,
            offset: -4.0,
        };
        shift_slice(&mut raster, &slice);
        assert_eq!(raster.pixel(0, 0), [4, 0, 7, 255]);
        assert_eq!(raster.pixel(5, 1), [9, 1, 7, 255]);
        assert_eq!(raster.pixel(6, 1), [6, 1, 7, 255], "no source column, left as is");
    }

    #[test]
    fn band_past_bottom_edge_is_clipped() {
        let mut raster = column_coded(6, 6);
        let slice = GlitchSlice {
            y: 4,
            height: 20,
            offset: 1.0,
        };
        shift_slice(&mut raster, &slice);
        assert_eq!(raster.pixel(1, 5), [0, 5, 7, 255]);
    }

    #[test]
    fn apply_is_deterministic_for_same_seed() {
        let source = column_coded(48, 32);
        let mut a = source.clone();
        let mut b = source.clone();
        apply_glitch(&mut a, 65, 1234.5);
        apply_glitch(&mut b, 65, 1234.5);
        assert_eq!(a, b, "same seed must produce byte-identical output");
    }
}
