// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `docucap analyze` — run the real-time analysis stage on a still image.

use std::path::PathBuf;

use clap::Args;
use docucap_bridge::AnalysisRecord;
use docucap_core::error::Result;
use docucap_core::types::{FrameRef, PixelFormat, PixelRect, Rotation};
use docucap_vision::CaptureEngine;

use super::{load_rgb, parse_list, parse_rotation};

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Image to analyze
    pub image: PathBuf,

    /// Feed the image this many times, as if it were a steady preview stream
    #[arg(short = 'n', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub frames: u32,

    /// Clockwise rotation applied before analysis (0, 90, 180, 270)
    #[arg(short, long, default_value = "0", value_parser = parse_rotation)]
    pub rotate: Rotation,

    /// Crop after rotation: x,y,width,height
    #[arg(long, value_parser = parse_list::<4>)]
    pub crop: Option<[f32; 4]>,
}

/// Print one JSON record per analysed frame.
pub fn run(engine: &mut CaptureEngine, args: &AnalyzeArgs) -> Result<()> {
    let rgb = load_rgb(&args.image)?;
    let frame = FrameRef::new(rgb.as_raw(), rgb.width(), rgb.height(), PixelFormat::Rgb);
    let crop = args
        .crop
        .map(|rect| rect.map(|v| v.max(0.0) as u32))
        .map(|[x, y, w, h]| PixelRect::new(x, y, w, h));

    for index in 0..args.frames {
        let result = engine.analyze(&frame, args.rotate, crop)?;
        tracing::debug!(index, ready = result.capture_ready, "Frame done");
        println!("{}", AnalysisRecord::from(&result).to_json()?);
    }
    Ok(())
}
