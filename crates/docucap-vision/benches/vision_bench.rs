// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the docucap-vision crate.
// Covers the per-frame analysis hot path and Sauvola binarization on
// synthetic frames.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{GrayImage, Luma};

use docucap_core::types::{FrameRef, PixelFormat, Rotation};
use docucap_vision::{CaptureEngine, SauvolaParams, sauvola_binarize};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Packed BGRA frame: dark background with a light page from 15% to 85%.
fn synthetic_frame(width: u32, height: u32) -> Vec<u8> {
    let (x0, x1) = (width * 15 / 100, width * 85 / 100);
    let (y0, y1) = (height * 15 / 100, height * 85 / 100);
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let v = if (x0..x1).contains(&x) && (y0..y1).contains(&y) { 235 } else { 35 };
            data.extend_from_slice(&[v, v, v, 255]);
        }
    }
    data
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Full `analyze` call on a 640x480 preview frame (no downsampling).
fn bench_analyze(c: &mut Criterion) {
    let data = synthetic_frame(640, 480);
    let mut engine = CaptureEngine::new();

    c.bench_function("analyze (640x480 BGRA)", |b| {
        b.iter(|| {
            let frame = FrameRef::new(black_box(&data), 640, 480, PixelFormat::Bgra);
            black_box(engine.analyze(&frame, Rotation::None, None).ok());
        });
    });
}

/// Sauvola binarization of a 1024x768 page with a ruled-text pattern.
fn bench_sauvola(c: &mut Criterion) {
    let page = GrayImage::from_fn(1024, 768, |x, y| {
        let ink = y % 24 < 3 && x % 9 != 0;
        Luma([if ink { 40 } else { 210 }])
    });

    c.bench_function("sauvola_binarize (1024x768)", |b| {
        b.iter(|| black_box(sauvola_binarize(black_box(&page), SauvolaParams::default())));
    });
}

criterion_group!(benches, bench_analyze, bench_sauvola);
criterion_main!(benches);
