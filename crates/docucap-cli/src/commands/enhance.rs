// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `docucap enhance` — rectify and clean up a captured image.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use docucap_core::error::{CaptureError, Result};
use docucap_core::geometry::CornerSet;
use docucap_core::types::{
    EnhanceMode, EnhancedFrame, EnhancementOptions, FrameRef, GuideRect, PixelFormat, Rotation,
};
use docucap_vision::CaptureEngine;
use image::RgbImage;
use tracing::info;

use super::{load_rgb, parse_list, parse_rotation};

#[derive(Args, Debug)]
pub struct EnhanceArgs {
    /// Captured image
    pub image: PathBuf,

    /// Where to write the result (format from the extension)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Document corners x0,y0,..,x3,y3; detected automatically when omitted
    #[arg(long, value_parser = parse_list::<8>, conflicts_with = "guide")]
    pub corners: Option<[f32; 8]>,

    /// On-screen guide box left,top,right,bottom
    #[arg(long, value_parser = parse_list::<4>)]
    pub guide: Option<[f32; 4]>,

    /// Clockwise rotation for the guide-frame path (0, 90, 180, 270)
    #[arg(short, long, default_value = "0", value_parser = parse_rotation, requires = "guide")]
    pub rotate: Rotation,

    /// Enhancement applied after rectification
    #[arg(short, long, value_enum, default_value_t = ModeArg::None)]
    pub mode: ModeArg,

    /// Crop to the corners' bounding box instead of correcting perspective
    #[arg(long)]
    pub no_perspective: bool,

    /// Equalise and normalise brightness before the mode
    #[arg(long)]
    pub auto_enhance: bool,

    /// Unsharp-mask strength; sharpening is off when omitted
    #[arg(long)]
    pub sharpen: Option<f32>,

    /// Output width in pixels (with --height); estimated when omitted
    #[arg(long, default_value_t = 0, requires = "height")]
    pub width: u32,

    /// Output height in pixels (with --width)
    #[arg(long, default_value_t = 0, requires = "width")]
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    None,
    Whiten,
    Contrast,
    Adaptive,
    Sauvola,
}

impl From<ModeArg> for EnhanceMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::None => EnhanceMode::None,
            ModeArg::Whiten => EnhanceMode::WhitenBackground,
            ModeArg::Contrast => EnhanceMode::ContrastStretch,
            ModeArg::Adaptive => EnhanceMode::AdaptiveBinarize,
            ModeArg::Sauvola => EnhanceMode::Sauvola,
        }
    }
}

impl EnhanceArgs {
    fn options(&self) -> EnhancementOptions {
        EnhancementOptions {
            apply_crop: self.no_perspective,
            apply_perspective_correction: !self.no_perspective,
            apply_auto_enhance: self.auto_enhance,
            apply_sharpening: self.sharpen.is_some(),
            sharpening_strength: self.sharpen.unwrap_or(0.0),
            enhance_mode: self.mode.into(),
            output_width: self.width,
            output_height: self.height,
        }
    }
}

pub fn run(engine: &mut CaptureEngine, args: &EnhanceArgs) -> Result<()> {
    let rgb = load_rgb(&args.image)?;
    let frame = FrameRef::new(rgb.as_raw(), rgb.width(), rgb.height(), PixelFormat::Rgb);
    let options = args.options();

    let enhanced = match (args.corners, args.guide) {
        (Some(flat), _) => {
            let corners = CornerSet::from_flat(&flat);
            engine.enhance(&frame, corners.points(), &options)?
        }
        (None, Some([left, top, right, bottom])) => {
            // The guide path reads the trapezoid of the latest analysis.
            engine.analyze(&frame, args.rotate, None)?;
            let guide = GuideRect::new(left, top, right, bottom);
            engine.enhance_with_guide_frame(&frame, &guide, &options, args.rotate)?
        }
        (None, None) => {
            let analysis = engine.analyze(&frame, Rotation::None, None)?;
            let corners = analysis.tracked_corners().ok_or_else(|| {
                CaptureError::InvalidInput(
                    "no document or text found; pass --corners or --guide".into(),
                )
            })?;
            info!(?corners, "Using detected corners");
            engine.enhance(&frame, corners.points(), &options)?
        }
    };

    save(&enhanced, &args.output)?;
    println!(
        "{}",
        serde_json::json!({
            "output": args.output.display().to_string(),
            "width": enhanced.width,
            "height": enhanced.height,
        })
    );
    Ok(())
}

/// Write an RGB-ordered enhanced frame to disk.
fn save(frame: &EnhancedFrame, path: &std::path::Path) -> Result<()> {
    let image = RgbImage::from_raw(frame.width, frame.height, frame.pixels.clone())
        .ok_or_else(|| CaptureError::Image("enhanced buffer does not match its size".into()))?;
    image
        .save(path)
        .map_err(|e| CaptureError::Image(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), "Enhanced image written");
    Ok(())
}
