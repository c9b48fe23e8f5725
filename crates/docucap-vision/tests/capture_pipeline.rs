// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end tests of the analyze → enhance protocol on synthetic frames.

use docucap_core::geometry::{CornerSet, Point2};
use docucap_core::types::{
    EnhanceMode, EnhancementOptions, FrameRef, GuideRect, PixelFormat, Rotation,
};
use docucap_vision::{CaptureEngine, virtual_trapezoid};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const PAGE: (u32, u32, u32, u32) = (100, 80, 540, 400);

/// BGRA preview frame with a light page on a dark desk.
fn page_frame() -> Vec<u8> {
    let mut data = Vec::with_capacity((WIDTH * HEIGHT * 4) as usize);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let on_page = x >= PAGE.0 && x < PAGE.2 && y >= PAGE.1 && y < PAGE.3;
            let v = if on_page { 230 } else { 25 };
            data.extend_from_slice(&[v, v, v, 255]);
        }
    }
    data
}

fn close_to(actual: Point2, expected: (f32, f32), tolerance: f32) -> bool {
    (actual.x - expected.0).abs() <= tolerance && (actual.y - expected.1).abs() <= tolerance
}

#[test]
fn analyze_finds_page_outline() {
    let data = page_frame();
    let frame = FrameRef::new(&data, WIDTH, HEIGHT, PixelFormat::Bgra);
    let mut engine = CaptureEngine::new();

    let result = engine.analyze(&frame, Rotation::None, None).unwrap();
    assert!(result.document_found());
    assert!(result.table_found);
    assert!(!result.text_region_found);
    assert!(result.detection.confidence > 0.0);
    assert_eq!(result.frame_size, (WIDTH, HEIGHT));

    let corners = result.detection.corners.unwrap();
    let expected = [
        (PAGE.0 as f32, PAGE.1 as f32),
        (PAGE.2 as f32, PAGE.1 as f32),
        (PAGE.2 as f32, PAGE.3 as f32),
        (PAGE.0 as f32, PAGE.3 as f32),
    ];
    for (point, want) in corners.points().iter().zip(expected) {
        assert!(close_to(*point, want, 12.0), "{point:?} vs {want:?}");
    }

    // An upright page is not a trapezoid.
    assert!(!result.trapezoid.is_trapezoid);
    assert_eq!(engine.last_analysis(), &result);
}

#[test]
fn steady_page_becomes_stable_after_warm_up() {
    let data = page_frame();
    let frame = FrameRef::new(&data, WIDTH, HEIGHT, PixelFormat::Bgra);
    let mut engine = CaptureEngine::new();

    let stability: Vec<f32> = (0..5)
        .map(|_| engine.analyze(&frame, Rotation::None, None).unwrap().quality.stability)
        .collect();
    assert_eq!(&stability[..3], &[0.0, 0.0, 0.0]);
    assert!(stability[3] > 0.99);
    assert!(stability[4] > 0.99);

    engine.reset();
    let after_reset = engine.analyze(&frame, Rotation::None, None).unwrap();
    assert_eq!(after_reset.quality.stability, 0.0);
}

#[test]
fn enhance_rectifies_to_estimated_or_requested_size() {
    let data = page_frame();
    let frame = FrameRef::new(&data, WIDTH, HEIGHT, PixelFormat::Bgra);
    let engine = CaptureEngine::new();
    let corners = CornerSet::from_rect(100.0, 80.0, 540.0, 400.0);

    let estimated = engine
        .enhance(&frame, corners.points(), &EnhancementOptions::default())
        .unwrap();
    assert_eq!((estimated.width, estimated.height), (440, 320));
    assert_eq!(estimated.format, PixelFormat::Bgr);
    assert_eq!(estimated.pixels.len(), estimated.stride * 320);

    let requested = EnhancementOptions {
        output_width: 300,
        output_height: 200,
        ..EnhancementOptions::default()
    };
    let sized = engine.enhance(&frame, corners.points(), &requested).unwrap();
    assert_eq!((sized.width, sized.height), (300, 200));
}

#[test]
fn small_quads_are_rectified_to_minimum_side() {
    let data = page_frame();
    let frame = FrameRef::new(&data, WIDTH, HEIGHT, PixelFormat::Bgra);
    let engine = CaptureEngine::new();
    let corners = CornerSet::from_rect(200.0, 200.0, 240.0, 230.0);

    let out = engine
        .enhance(&frame, corners.points(), &EnhancementOptions::default())
        .unwrap();
    assert_eq!((out.width, out.height), (100, 100));
}

#[test]
fn crop_only_output_keeps_bgr_channel_order() {
    let mut data = Vec::new();
    for _ in 0..(64 * 48) {
        data.extend_from_slice(&[10u8, 20, 200, 255]);
    }
    let frame = FrameRef::new(&data, 64, 48, PixelFormat::Bgra);
    let engine = CaptureEngine::new();
    let options = EnhancementOptions {
        apply_perspective_correction: false,
        apply_crop: true,
        ..EnhancementOptions::default()
    };
    let corners = CornerSet::from_rect(4.0, 4.0, 36.0, 28.0);

    let out = engine.enhance(&frame, corners.points(), &options).unwrap();
    assert_eq!((out.width, out.height), (32, 24));
    assert_eq!(&out.pixels[..3], &[10, 20, 200]);
}

#[test]
fn sauvola_output_is_binary() {
    let data = page_frame();
    let frame = FrameRef::new(&data, WIDTH, HEIGHT, PixelFormat::Bgra);
    let engine = CaptureEngine::new();
    let options = EnhancementOptions {
        enhance_mode: EnhanceMode::Sauvola,
        ..EnhancementOptions::default()
    };
    let corners = CornerSet::from_rect(50.0, 40.0, 590.0, 440.0);

    let out = engine.enhance(&frame, corners.points(), &options).unwrap();
    assert!(out.pixels.iter().all(|&v| v == 0 || v == 255));
}

#[test]
fn guide_frame_for_upright_page_is_plain_crop() {
    let data = page_frame();
    let frame = FrameRef::new(&data, WIDTH, HEIGHT, PixelFormat::Bgra);
    let mut engine = CaptureEngine::new();
    let analysis = engine.analyze(&frame, Rotation::None, None).unwrap();

    let guide = GuideRect::new(80.0, 60.0, 560.0, 420.0);
    assert_eq!(virtual_trapezoid(&guide, &analysis), guide.corners());

    let out = engine
        .enhance_with_guide_frame(&frame, &guide, &EnhancementOptions::default(), Rotation::None)
        .unwrap();
    assert_eq!((out.width, out.height), (480, 360));
}

#[test]
fn rejected_frames_do_not_disturb_the_session() {
    let data = page_frame();
    let frame = FrameRef::new(&data, WIDTH, HEIGHT, PixelFormat::Bgra);
    let mut engine = CaptureEngine::new();
    let first = engine.analyze(&frame, Rotation::None, None).unwrap();

    let short = FrameRef::new(&data[..100], WIDTH, HEIGHT, PixelFormat::Bgra);
    assert!(engine.analyze(&short, Rotation::None, None).is_err());
    assert_eq!(engine.last_analysis(), &first);
}
