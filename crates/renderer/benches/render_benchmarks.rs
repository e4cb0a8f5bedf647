//! Benchmarks for the renderer crate - assembly, overlays, histograms and PNG export.
//!
//! Run with: cargo bench --package renderer -- assemble
//! Or: cargo bench --package renderer --bench render_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use renderer::assemble::assemble_quiet;
use renderer::{
    composite, create_color_indexed_image, histogram, png, ColorPalette, DisplayRange,
    HistogramMatching, ImageBuffer, ImageInfo, OverlayLayer, PaletteMode, PalettePoint,
    ThresholdEvaluator, TiledHistogramTransform,
};
use scene_common::{Color, NullProgressMonitor, SampleBand};

const SIZES: [(usize, usize); 3] = [(256, 256), (512, 512), (1024, 1024)];

/// Brightness temperature in Kelvin with latitude trend, a wave and noise.
fn generate_temperature_band(width: usize, height: usize) -> SampleBand {
    let mut rng = rand::thread_rng();
    let mut data = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let lat_factor = (y as f32 / height as f32 - 0.5) * 60.0;
            let lon_factor = ((x as f32 / width as f32) * std::f32::consts::PI * 4.0).sin() * 5.0;
            let noise = rng.gen_range(-3.0..3.0);
            data[y * width + x] = 273.15 + lat_factor + lon_factor + noise;
        }
    }
    SampleBand::new("tb", width, height, data).expect("valid band")
}

/// Reflectance in [0, 1] with a few percent of NaN pixels.
fn generate_reflectance_band(name: &str, width: usize, height: usize) -> SampleBand {
    let mut rng = rand::thread_rng();
    let data = (0..width * height)
        .map(|_| {
            if rng.gen_bool(0.03) {
                f32::NAN
            } else {
                rng.gen_range(0.0..1.0)
            }
        })
        .collect();
    SampleBand::new(name, width, height, data).expect("valid band")
}

/// Quality flags with random bits 0..3.
fn generate_flag_band(width: usize, height: usize) -> SampleBand {
    let mut rng = rand::thread_rng();
    let data = (0..width * height).map(|_| rng.gen_range(0u8..16) as f32).collect();
    SampleBand::new("flags", width, height, data).expect("valid band")
}

fn temperature_palette() -> ColorPalette {
    ColorPalette::new(vec![
        PalettePoint::new(233.15, Color::rgb(30, 0, 130)),
        PalettePoint::new(253.15, Color::rgb(0, 150, 255)),
        PalettePoint::new(273.15, Color::rgb(150, 255, 200)),
        PalettePoint::new(293.15, Color::rgb(255, 150, 0)),
        PalettePoint::new(313.15, Color::rgb(150, 0, 0)),
    ])
    .expect("sorted palette")
}

fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble");
    let palette_info = ImageInfo::with_palette(PaletteMode::Ramp(temperature_palette()));
    let rgb_info = ImageInfo::with_rgb_ranges([DisplayRange::new(0.0, 1.0).with_gamma(1.8); 3]);

    for (width, height) in SIZES {
        let tb = generate_temperature_band(width, height);
        let r = generate_reflectance_band("r", width, height);
        let g = generate_reflectance_band("g", width, height);
        let b = generate_reflectance_band("b", width, height);
        group.throughput(Throughput::Elements((width * height) as u64));

        group.bench_with_input(
            BenchmarkId::new("palette", format!("{}x{}", width, height)),
            &tb,
            |bench, tb| bench.iter(|| assemble_quiet(&[black_box(tb)], &palette_info)),
        );

        group.bench_with_input(
            BenchmarkId::new("rgb", format!("{}x{}", width, height)),
            &(r, g, b),
            |bench, (r, g, b)| bench.iter(|| assemble_quiet(&[black_box(r), g, b], &rgb_info)),
        );

        let palette = temperature_palette();
        group.bench_with_input(
            BenchmarkId::new("color_indexed", format!("{}x{}", width, height)),
            &tb,
            |bench, tb| bench.iter(|| create_color_indexed_image(black_box(tb), &palette, &NullProgressMonitor)),
        );
    }
    group.finish();
}

fn bench_overlay(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlay");
    let layers = [
        OverlayLayer::new("cloud", "flags & 0x04", Color::WHITE, 0.5),
        OverlayLayer::new("cold", "tb < 260 && !(flags & 0x01)", Color::rgb(0, 0, 255), 0.3),
    ];

    for (width, height) in SIZES {
        let tb = generate_temperature_band(width, height);
        let flags = generate_flag_band(width, height);
        let evaluator = ThresholdEvaluator::new().with_band("tb", &tb).with_band("flags", &flags);
        let info = ImageInfo::with_palette(PaletteMode::Ramp(temperature_palette()));
        let image = assemble_quiet(&[&tb], &info).expect("assembled image");
        group.throughput(Throughput::Elements((width * height) as u64));

        group.bench_with_input(
            BenchmarkId::new("two_layers", format!("{}x{}", width, height)),
            &image,
            |bench, image: &ImageBuffer| {
                bench.iter(|| composite(black_box(image.clone()), &layers, &evaluator, &NullProgressMonitor))
            },
        );
    }
    group.finish();
}

fn bench_histogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("histogram");
    let info = ImageInfo::with_rgb_ranges([DisplayRange::new(0.0, 1.0); 3]);

    for (width, height) in SIZES {
        let r = generate_reflectance_band("r", width, height);
        let image = assemble_quiet(&[&r, &r, &r], &info).expect("assembled image");
        group.throughput(Throughput::Elements((width * height) as u64));

        for tile_size in [128usize, 512] {
            let transform = TiledHistogramTransform::new(tile_size).expect("positive tile size");
            group.bench_with_input(
                BenchmarkId::new(format!("equalize_tile{}", tile_size), format!("{}x{}", width, height)),
                &image,
                |bench, image| {
                    bench.iter(|| {
                        histogram::adjust(
                            black_box(image.clone()),
                            HistogramMatching::Equalize,
                            &transform,
                            &NullProgressMonitor,
                        )
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_png_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("png_export");
    let info = ImageInfo::with_palette(PaletteMode::Ramp(temperature_palette()));

    for (width, height) in SIZES {
        let tb = generate_temperature_band(width, height);
        let image = assemble_quiet(&[&tb], &info).expect("assembled image");
        let indexed = create_color_indexed_image(&tb, &temperature_palette(), &NullProgressMonitor)
            .expect("indexed image");
        group.throughput(Throughput::Bytes((width * height * 4) as u64));

        // extracts the palette at runtime
        group.bench_with_input(
            BenchmarkId::new("auto_extract", format!("{}x{}", width, height)),
            &image,
            |bench, image| bench.iter(|| png::encode_image(black_box(image))),
        );

        group.bench_with_input(
            BenchmarkId::new("indexed", format!("{}x{}", width, height)),
            &indexed,
            |bench, indexed| bench.iter(|| png::encode_indexed(black_box(indexed))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_assemble, bench_overlay, bench_histogram, bench_png_export);
criterion_main!(benches);
