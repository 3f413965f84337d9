//! Still render benchmarks.
//! Run: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glitchkit::settings::{DitherType, ImageSettings};
use glitchkit::{render, RasterBuffer, RenderRequest};

fn synthetic_source(width: u32, height: u32) -> RasterBuffer {
    let mut raster = RasterBuffer::new(width, height).expect("allocate source");
    for y in 0..height {
        for x in 0..width {
            raster.set_pixel(
                x,
                y,
                [(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8, 255],
            );
        }
    }
    raster
}

fn bench_still_render(c: &mut Criterion) {
    let source = synthetic_source(1600, 1000);
    let logo = RasterBuffer::filled(200, 80, [255, 255, 255, 220]).expect("allocate logo");

    let mut group = c.benchmark_group("render_frame");
    group.sample_size(20);

    group.bench_function("cover_fit_720p", |b| {
        let request = RenderRequest::new(1280, 720, Some(&source));
        b.iter(|| black_box(render(&request).expect("render")));
    });

    group.bench_function("full_stack_720p_floyd_steinberg", |b| {
        let request = RenderRequest::new(1280, 720, Some(&source))
            .with_overlay(Some(&logo))
            .with_image(ImageSettings {
                dither_type: DitherType::FloydSteinberg,
                pixelate: 20,
                glitch: 50,
                rgb_shift: 30,
                ..ImageSettings::default()
            })
            .with_glitch_seed(42.0);
        b.iter(|| black_box(render(&request).expect("render")));
    });

    group.finish();
}

criterion_group!(benches, bench_still_render);
criterion_main!(benches);
