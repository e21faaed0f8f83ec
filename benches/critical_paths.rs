//! Criterion benchmarks for provmap critical paths
//!
//! Benchmarks the core performance-critical operations:
//! - Legend: definition file parsing
//! - Index: stride-sampled spatial index construction
//! - Locator: the exact/nearest/pixel fallback chain
//! - Nearest: radius-bounded nearest-neighbor scans

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use provmap::index::{CancelToken, IndexBuilder, SpatialIndex};
use provmap::legend::{parse_legend, LegendTable};
use provmap::locator::ProvinceLocator;
use provmap::models::Rgb;
use provmap::raster::PixelBuffer;
use std::io::Cursor;
use std::sync::Mutex;

// =============================================================================
// Test Data Generators
// =============================================================================

/// Generate a definition file with n provinces, colors spread over the cube
fn make_legend_text(n: usize) -> String {
    let mut text = String::from("id;r;g;b;kind;coastal;terrain;continent\n");
    for i in 0..n {
        let (r, g, b) = province_color(i);
        let kind = if i % 3 == 0 { "sea" } else { "land" };
        text.push_str(&format!(
            "{};{};{};{};{};{};plains;Europa\n",
            i + 1,
            r,
            g,
            b,
            kind,
            i % 2
        ));
    }
    text
}

fn province_color(i: usize) -> (u8, u8, u8) {
    ((i % 251) as u8, ((i / 251) % 251) as u8, ((i / 63001) % 251) as u8)
}

fn make_legend(n: usize) -> LegendTable {
    parse_legend(Cursor::new(make_legend_text(n))).table
}

/// Raster tiled into 16x16 blocks, each block one province color
fn make_raster(width: u32, height: u32, provinces: usize) -> PixelBuffer {
    let image = image::RgbImage::from_fn(width, height, |x, y| {
        let block = ((y / 16) * (width / 16).max(1) + x / 16) as usize % provinces;
        let (r, g, b) = province_color(block);
        image::Rgb([r, g, b])
    });
    PixelBuffer::from_image(image)
}

// =============================================================================
// Legend Benchmarks
// =============================================================================

fn bench_legend(c: &mut Criterion) {
    let mut group = c.benchmark_group("legend");

    for size in [100, 1_000, 10_000].iter() {
        let text = make_legend_text(*size);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", size), &text, |b, text| {
            b.iter(|| parse_legend(Cursor::new(black_box(text))))
        });
    }

    // Tolerant lookup scans the whole table on a miss
    let legend = make_legend(10_000);
    group.bench_function("find_within_tolerance_miss", |b| {
        b.iter(|| legend.find_within_tolerance(black_box(Rgb([253, 254, 255])), 1))
    });

    group.finish();
}

// =============================================================================
// Index Benchmarks
// =============================================================================

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    group.sample_size(20);

    let legend = make_legend(500);
    let raster = make_raster(1024, 1024, 500);
    let cancel = CancelToken::new();

    for stride in [4, 10, 32].iter() {
        group.bench_with_input(BenchmarkId::new("1024px_stride", stride), stride, |b, &stride| {
            b.iter(|| {
                IndexBuilder::new()
                    .with_stride(stride)
                    .build(black_box(&raster), &legend, &cancel)
            })
        });
    }

    group.finish();
}

// =============================================================================
// Locator Benchmarks
// =============================================================================

fn bench_locator(c: &mut Criterion) {
    let mut group = c.benchmark_group("locator");

    let legend = make_legend(500);
    let raster = make_raster(1024, 1024, 500);
    let cancel = CancelToken::new();
    let built = IndexBuilder::new()
        .with_stride(10)
        .build(&raster, &legend, &cancel)
        .unwrap();

    // Stride-10 sampling indexes every multiple-of-10 coordinate
    let index = Mutex::new(built.clone());
    let locator = ProvinceLocator::new(&legend, &raster, &index);
    group.bench_function("locate_exact_hit", |b| {
        b.iter(|| locator.locate(black_box(500), black_box(500)))
    });

    // Off-grid coordinate resolved by the nearest stage
    group.bench_function("locate_nearest_hit", |b| {
        b.iter(|| locator.locate(black_box(503), black_box(497)))
    });

    // Index bypassed entirely: pixel probe plus legend lookup every time
    let empty = Mutex::new(SpatialIndex::default());
    let slow = ProvinceLocator::new(&legend, &raster, &empty);
    group.bench_function("locate_pixel_probe", |b| {
        b.iter(|| slow.locate_exact(black_box(777), black_box(333)))
    });

    group.finish();
}

fn bench_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest");

    let legend = make_legend(500);
    let raster = make_raster(1024, 1024, 500);
    let index = IndexBuilder::new()
        .with_stride(10)
        .build(&raster, &legend, &CancelToken::new())
        .unwrap();

    for radius in [5, 15, 50].iter() {
        group.bench_with_input(BenchmarkId::new("radius", radius), radius, |b, &radius| {
            b.iter(|| index.nearest_within(black_box(503), black_box(497), radius))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_legend, bench_index_build, bench_locator, bench_nearest);
criterion_main!(benches);
