//! Per-pixel transform pass: RGB shift, grayscale, noise and dithering.
//!
//! The pass walks the working raster once in raster order. Per pixel the
//! stages run in a fixed order (shift, luma, colour mode, noise, clamp,
//! dither, write back). Shifted channels are read from a frozen snapshot so
//! earlier writes never leak into later reads; Floyd–Steinberg error is pushed
//! into the working raster ahead of the cursor.

use rand::Rng;

use crate::raster::FloatRaster;
use crate::settings::{DitherType, ImageSettings, BAYER_4X4};

/// Error share for the right, bottom-left, bottom and bottom-right neighbours.
pub const FLOYD_STEINBERG_WEIGHTS: [(isize, usize, f32); 4] = [
    (1, 0, 7.0 / 16.0),
    (-1, 1, 3.0 / 16.0),
    (0, 1, 5.0 / 16.0),
    (1, 1, 1.0 / 16.0),
];

/// Fixed quantisation midpoint for error diffusion.
const FS_MIDPOINT: f32 = 128.0;

/// Channel shift in pixels: up to 4% of the width at `rgb_shift = 100`.
pub fn rgb_shift_amount(rgb_shift: u32, width: u32) -> usize {
    ((f64::from(rgb_shift.min(100)) / 100.0) * (f64::from(width) * 0.04)).floor() as usize
}

/// Columns read for red, green and blue at `x`.
#[inline(always)]
pub fn shifted_columns(x: usize, amount: usize, width: usize) -> (usize, usize, usize) {
    (x.saturating_sub(amount), x, (x + amount).min(width.saturating_sub(1)))
}

#[inline(always)]
pub fn luma(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

#[inline(always)]
fn binarize(value: f32, threshold: f32) -> f32 {
    if value < threshold {
        0.0
    } else {
        255.0
    }
}

/// Per-pixel threshold for ordered dithering at `(x, y)`.
#[inline(always)]
pub fn bayer_threshold(x: usize, y: usize, intensity: u32) -> f32 {
    let cell = f32::from(BAYER_4X4[y % 4][x % 4]);
    let normalized = cell / 16.0 - 0.5;
    let spread = (intensity.min(100) as f32 / 100.0) * 255.0;
    128.0 + normalized * spread
}

/// Run the pass over `working`, reading shifted channels from `snapshot`.
///
/// `snapshot` must be a copy of `working` taken before the pass; `noise`
/// supplies the per-pixel grain draws.
pub fn apply_pixel_pass<R: Rng + ?Sized>(
    working: &mut FloatRaster,
    snapshot: &FloatRaster,
    settings: &ImageSettings,
    noise: &mut R,
) {
    debug_assert_eq!(working.width(), snapshot.width());
    debug_assert_eq!(working.height(), snapshot.height());

    let width = working.width() as usize;
    let height = working.height() as usize;
    let shift = rgb_shift_amount(settings.rgb_shift, working.width());
    let noise_span = settings.noise.min(100) as f32 * 2.55;
    let intensity = settings.dither_intensity.min(100);
    let threshold = (intensity as f32 / 100.0) * 255.0;
    let error_mult = intensity as f32 / 100.0;

    for y in 0..height {
        for x in 0..width {
            let [mut r, mut g, mut b] = if shift > 0 {
                let (red_x, green_x, blue_x) = shifted_columns(x, shift, width);
                [
                    snapshot.channel(red_x, y, 0),
                    snapshot.channel(green_x, y, 1),
                    snapshot.channel(blue_x, y, 2),
                ]
            } else {
                working.rgb(x, y)
            };

            let lum = luma(r, g, b);
            if !settings.color_mode {
                r = lum;
                g = lum;
                b = lum;
            }

            if settings.noise > 0 {
                let grain = (noise.random::<f32>() - 0.5) * noise_span;
                r += grain;
                g += grain;
                b += grain;
            }

            r = r.clamp(0.0, 255.0);
            g = g.clamp(0.0, 255.0);
            b = b.clamp(0.0, 255.0);

            let out = match settings.dither_type {
                DitherType::None => [r, g, b],
                DitherType::Threshold => [
                    binarize(r, threshold),
                    binarize(g, threshold),
                    binarize(b, threshold),
                ],
                DitherType::Ordered => {
                    let local = bayer_threshold(x, y, intensity);
                    [binarize(r, local), binarize(g, local), binarize(b, local)]
                }
                DitherType::FloydSteinberg => {
                    let quantized = [
                        binarize(r, FS_MIDPOINT),
                        binarize(g, FS_MIDPOINT),
                        binarize(b, FS_MIDPOINT),
                    ];
                    if error_mult > 0.0 {
                        let error = [
                            (r - quantized[0]) * error_mult,
                            (g - quantized[1]) * error_mult,
                            (b - quantized[2]) * error_mult,
                        ];
                        diffuse_error(working, x, y, error);
                    }
                    quantized
                }
            };

            working.set_rgb(x, y, out);
        }
    }
}

/// Push `error` to the pending neighbours of `(x, y)`; off-raster shares are dropped.
pub fn diffuse_error(working: &mut FloatRaster, x: usize, y: usize, error: [f32; 3]) {
    let width = working.width() as usize;
    let height = working.height() as usize;
    for (dx, dy, weight) in FLOYD_STEINBERG_WEIGHTS {
        let Some(nx) = x.checked_add_signed(dx) else {
            continue;
        };
        let ny = y + dy;
        if nx >= width || ny >= height {
            continue;
        }
        working.accumulate_rgb(nx, ny, error, weight);
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::raster::RasterBuffer;

    fn raster_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> RasterBuffer {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        RasterBuffer::from_rgba(width, height, data).expect("raster should wrap")
    }

    fn run(raster: &RasterBuffer, settings: ImageSettings) -> RasterBuffer {
        let mut working = FloatRaster::from_raster(raster);
        let snapshot = working.clone();
        let mut rng = StdRng::seed_from_u64(5);
        apply_pixel_pass(&mut working, &snapshot, &settings, &mut rng);
        let mut out = raster.clone();
        working.commit(&mut out).expect("commit should succeed");
        out
    }

    #[test]
    fn floyd_steinberg_weights_sum_to_one() {
        let total: f32 = FLOYD_STEINBERG_WEIGHTS.iter().map(|(_, _, w)| w).sum();
        assert_eq!(total, 1.0);
        assert_eq!(
            FLOYD_STEINBERG_WEIGHTS.map(|(_, _, w)| w),
            [0.4375, 0.1875, 0.3125, 0.0625]
        );
    }

    #[test]
    fn rgb_shift_reads_expected_columns() {
        let amount = rgb_shift_amount(100, 1000);
        assert_eq!(amount, 40);
        assert_eq!(shifted_columns(500, amount, 1000), (460, 500, 540));
        assert_eq!(shifted_columns(10, amount, 1000), (0, 10, 50));
        assert_eq!(shifted_columns(990, amount, 1000), (950, 990, 999));
        assert_eq!(rgb_shift_amount(100, 20), 0);
    }

    #[test]
    fn rgb_shift_reads_from_snapshot_not_working_buffer() {
        // Each column has a unique red value; a smeared read would repeat values.
        let raster = raster_from_fn(100, 1, |x, _| [x as u8 * 2, 50, 255 - x as u8, 255]);
        let settings = ImageSettings {
            rgb_shift: 100,
            ..ImageSettings::default()
        };
        let out = run(&raster, settings);
        // amount = floor(100 * 0.04) = 4
        assert_eq!(out.pixel(50, 0), [92, 50, 255 - 54, 255]);
        assert_eq!(out.pixel(0, 0), [0, 50, 255 - 4, 255]);
        assert_eq!(out.pixel(99, 0), [190, 50, 255 - 99, 255]);
    }

    #[test]
    fn grayscale_makes_channels_equal() {
        let raster = raster_from_fn(8, 8, |x, y| [x as u8 * 30, y as u8 * 20, 200, 255]);
        let settings = ImageSettings {
            color_mode: false,
            ..ImageSettings::default()
        };
        let out = run(&raster, settings);
        for px in out.data().chunks_exact(4) {
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
        }
        let expected = luma(30.0, 40.0, 200.0).round() as u8;
        assert_eq!(out.pixel(1, 2)[0], expected);
    }

    #[test]
    fn noise_is_added_equally_to_every_channel() {
        let raster = raster_from_fn(16, 4, |_, _| [120, 120, 120, 255]);
        let settings = ImageSettings {
            noise: 60,
            ..ImageSettings::default()
        };
        let out = run(&raster, settings);
        let mut varied = false;
        for px in out.data().chunks_exact(4) {
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
            assert!(px[0].abs_diff(120) <= 77, "noise span is +/- 76.5");
            varied |= px[0] != 120;
        }
        assert!(varied, "noise should perturb at least one pixel");
    }

    #[test]
    fn threshold_maps_each_channel_independently() {
        let raster = raster_from_fn(1, 1, |_, _| [127, 128, 200, 77]);
        let settings = ImageSettings {
            dither_type: DitherType::Threshold,
            dither_intensity: 50,
            ..ImageSettings::default()
        };
        // threshold = 127.5
        assert_eq!(run(&raster, settings).pixel(0, 0), [0, 255, 255, 77]);
    }

    #[test]
    fn ordered_dither_uses_bayer_thresholds() {
        assert_eq!(bayer_threshold(0, 0, 100), 128.0 - 127.5);
        assert_eq!(bayer_threshold(0, 3, 100), 128.0 + (15.0 / 16.0 - 0.5) * 255.0);
        assert_eq!(bayer_threshold(5, 6, 0), 128.0);

        let raster = raster_from_fn(4, 4, |_, _| [100, 100, 100, 255]);
        let settings = ImageSettings {
            dither_type: DitherType::Ordered,
            dither_intensity: 100,
            ..ImageSettings::default()
        };
        let out = run(&raster, settings);
        let lit = out.data().chunks_exact(4).filter(|px| px[0] == 255).count();
        // 100 >= 128 + (v/16 - 0.5) * 255 holds for v <= 6.
        assert_eq!(lit, 7);
    }

    #[test]
    fn floyd_steinberg_spreads_error_into_pending_pixels() {
        let raster = raster_from_fn(4, 4, |_, _| [100, 100, 100, 255]);
        let settings = ImageSettings {
            dither_type: DitherType::FloydSteinberg,
            dither_intensity: 100,
            ..ImageSettings::default()
        };
        let out = run(&raster, settings);
        // 100 -> 0 leaves +100 error; the right neighbour sees 143.75 -> 255.
        assert_eq!(out.pixel(0, 0)[0], 0);
        assert_eq!(out.pixel(1, 0)[0], 255);
        assert!(out.data().chunks_exact(4).all(|px| px[0] == 0 || px[0] == 255));
    }

    #[test]
    fn floyd_steinberg_without_intensity_is_plain_quantization() {
        let raster = raster_from_fn(4, 1, |_, _| [127, 128, 100, 255]);
        let settings = ImageSettings {
            dither_type: DitherType::FloydSteinberg,
            dither_intensity: 0,
            ..ImageSettings::default()
        };
        let out = run(&raster, settings);
        assert!(out.data().chunks_exact(4).all(|px| px[..3] == [0, 255, 0]));
    }

    #[test]
    fn edge_error_is_dropped() {
        let raster = raster_from_fn(2, 2, |_, _| [0, 0, 0, 255]);
        let mut working = FloatRaster::from_raster(&raster);
        diffuse_error(&mut working, 1, 1, [16.0, 16.0, 16.0]);
        assert_eq!(working, FloatRaster::from_raster(&raster), "corner has no pending neighbours");

        diffuse_error(&mut working, 0, 1, [16.0, 0.0, 0.0]);
        assert_eq!(working.channel(1, 1, 0), 7.0);
        assert_eq!(working.channel(0, 0, 0), 0.0);

        let mut left_edge = FloatRaster::from_raster(&raster);
        diffuse_error(&mut left_edge, 0, 0, [16.0, 0.0, 0.0]);
        assert_eq!(left_edge.channel(1, 0, 0), 7.0);
        assert_eq!(left_edge.channel(0, 1, 0), 5.0);
        assert_eq!(left_edge.channel(1, 1, 0), 1.0);
        let total: f32 = left_edge.data().iter().step_by(4).sum();
        assert_eq!(total, 13.0, "bottom-left share falls off the raster");
    }

    #[test]
    fn alpha_is_never_touched() {
        let raster = raster_from_fn(6, 3, |x, y| [x as u8 * 40, 90, y as u8 * 70, (x * 30 + y) as u8]);
        let settings = ImageSettings {
            dither_type: DitherType::FloydSteinberg,
            color_mode: false,
            noise: 30,
            rgb_shift: 100,
            ..ImageSettings::default()
        };
        let out = run(&raster, settings);
        let before: Vec<u8> = raster.data().chunks_exact(4).map(|px| px[3]).collect();
        let after: Vec<u8> = out.data().chunks_exact(4).map(|px| px[3]).collect();
        assert_eq!(before, after);
    }
}
