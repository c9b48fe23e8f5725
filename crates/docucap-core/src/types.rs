// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Docucap capture engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CaptureError, Result};
use crate::geometry::CornerSet;

/// Identifier of one capture session (engine lifetime between resets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Byte layout of an incoming camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 4 bytes per pixel, blue first (iOS camera buffers).
    Bgra,
    /// 3 bytes per pixel, blue first.
    Bgr,
    /// 3 bytes per pixel, red first.
    Rgb,
    /// 1 byte per pixel luminance.
    Gray,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Bgra => 4,
            Self::Bgr | Self::Rgb => 3,
            Self::Gray => 1,
        }
    }

    /// Numeric code used across the host boundary (0 BGRA, 1 BGR, 2 RGB, 3 gray).
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Bgra),
            1 => Some(Self::Bgr),
            2 => Some(Self::Rgb),
            3 => Some(Self::Gray),
            _ => None,
        }
    }

    /// Whether the colour channels are stored blue-first.
    pub fn is_bgr_order(&self) -> bool {
        matches!(self, Self::Bgra | Self::Bgr)
    }
}

/// Clockwise rotation applied to a frame before analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Map a degree value onto a rotation. Only exact quarter turns are
    /// recognised.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::None),
            90 => Some(Self::Cw90),
            180 => Some(Self::Cw180),
            270 => Some(Self::Cw270),
            _ => None,
        }
    }

    pub fn degrees(&self) -> i32 {
        match self {
            Self::None => 0,
            Self::Cw90 => 90,
            Self::Cw180 => 180,
            Self::Cw270 => 270,
        }
    }
}

/// Integer pixel rectangle (crop regions, text-region bounds).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Intersection with an image of the given size.
    pub fn clip_to(&self, image_width: u32, image_height: u32) -> PixelRect {
        let x = self.x.min(image_width);
        let y = self.y.min(image_height);
        let right = self.right().min(image_width);
        let bottom = self.bottom().min(image_height);
        PixelRect::new(x, y, right - x, bottom - y)
    }

    /// Corners of the rectangle in canonical order.
    pub fn corners(&self) -> CornerSet {
        CornerSet::from_rect(
            self.x as f32,
            self.y as f32,
            self.right() as f32,
            self.bottom() as f32,
        )
    }

    /// `[x, y, width, height]` as floats, the wire layout for bounds.
    pub fn to_array(&self) -> [f32; 4] {
        [
            self.x as f32,
            self.y as f32,
            self.width as f32,
            self.height as f32,
        ]
    }
}

/// Static on-screen guide overlay, in frame coordinates after rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GuideRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl GuideRect {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn corners(&self) -> CornerSet {
        CornerSet::from_rect(self.left, self.top, self.right, self.bottom)
    }
}

/// Borrowed view of a raw, tightly packed camera frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameRef<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl<'a> FrameRef<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data,
            width,
            height,
            format,
        }
    }

    /// Number of bytes a packed frame of this size and format occupies.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Reject empty buffers, zero dimensions and short buffers.
    pub fn validate(&self) -> Result<()> {
        if self.data.is_empty() {
            return Err(CaptureError::InvalidInput("empty image buffer".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::InvalidInput(format!(
                "invalid frame dimensions {}x{}",
                self.width, self.height
            )));
        }
        if self.data.len() < self.expected_len() {
            return Err(CaptureError::InvalidInput(format!(
                "buffer holds {} bytes, {}x{} {:?} needs {}",
                self.data.len(),
                self.width,
                self.height,
                self.format,
                self.expected_len()
            )));
        }
        Ok(())
    }
}

/// Outcome of quadrilateral detection for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub found: bool,
    /// Ordered corners in original-frame coordinates, present iff `found`.
    pub corners: Option<CornerSet>,
    /// 0.0-1.0.
    pub confidence: f32,
}

impl DetectionResult {
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn hit(corners: CornerSet, confidence: f32) -> Self {
        Self {
            found: true,
            corners: Some(corners),
            confidence,
        }
    }
}

/// Relative weights of the four quality components in an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub blur: f32,
    pub brightness: f32,
    pub stability: f32,
    pub corner_confidence: f32,
}

impl ScoreWeights {
    /// Weights used when a document boundary anchors the frame.
    pub const FRAME: Self = Self {
        blur: 0.3,
        brightness: 0.2,
        stability: 0.3,
        corner_confidence: 0.2,
    };

    /// Weights used on the text-region fallback path.
    pub const TEXT_REGION: Self = Self {
        blur: 0.4,
        brightness: 0.2,
        stability: 0.2,
        corner_confidence: 0.2,
    };
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::FRAME
    }
}

/// Per-frame quality components, each in 0.0-1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Higher is sharper.
    pub blur: f32,
    /// Peaks at mid-gray exposure.
    pub brightness: f32,
    /// Higher is steadier; 0 until the stability window warms up.
    pub stability: f32,
    pub corner_confidence: f32,
}

impl QualityScore {
    /// Weighted sum with the frame-level weights.
    pub fn overall(&self) -> f32 {
        self.weighted(&ScoreWeights::FRAME)
    }

    pub fn weighted(&self, weights: &ScoreWeights) -> f32 {
        self.blur * weights.blur
            + self.brightness * weights.brightness
            + self.stability * weights.stability
            + self.corner_confidence * weights.corner_confidence
    }

    /// Strict readiness: confident corners, sharp, well exposed and steady.
    pub fn is_capture_ready(&self) -> bool {
        self.corner_confidence > 0.8
            && self.blur > 0.6
            && self.brightness > 0.5
            && self.stability > 0.9
    }
}

/// Skew measurements of a detected quadrilateral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrapezoidMetrics {
    pub top_width: f32,
    pub bottom_width: f32,
    pub left_height: f32,
    pub right_height: f32,
    /// `|top - bottom| / avg(top, bottom)`: front-back tilt.
    pub vertical_skew: f32,
    /// `|left - right| / avg(left, right)`: left-right offset.
    pub horizontal_skew: f32,
    /// Larger of the two skews.
    pub skew_ratio: f32,
    pub is_trapezoid: bool,
}

/// A block of text found by the morphology heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub bounds: PixelRect,
    pub corners: CornerSet,
    /// 0.0-1.0, from the block's share of the frame.
    pub confidence: f32,
    /// Contour area in pixels.
    pub area: f32,
}

/// Aggregate of every text block found in a frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRegionSummary {
    /// Blocks sorted by descending area.
    pub regions: Vec<TextRegion>,
    /// Union of all blocks, padded and clipped to the frame.
    pub overall_bounds: PixelRect,
    pub total_area: f32,
    /// `total_area / frame_area`.
    pub coverage_ratio: f32,
}

impl TextRegionSummary {
    pub fn is_found(&self) -> bool {
        !self.regions.is_empty()
    }

    pub fn count(&self) -> usize {
        self.regions.len()
    }

    pub fn overall_corners(&self) -> CornerSet {
        self.overall_bounds.corners()
    }
}

/// Everything the analyze stage learned about one frame.
///
/// The engine keeps the most recent value so the enhance stage can decide
/// whether perspective correction is warranted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysisResult {
    pub detection: DetectionResult,
    /// A document/table boundary was found and measured.
    pub table_found: bool,
    /// The text-region fallback produced at least one block.
    pub text_region_found: bool,
    pub quality: QualityScore,
    pub overall_score: f32,
    pub capture_ready: bool,
    pub trapezoid: TrapezoidMetrics,
    pub text_regions: TextRegionSummary,
    /// Width and height of the analysed frame after rotation and crop.
    pub frame_size: (u32, u32),
}

impl FrameAnalysisResult {
    pub fn document_found(&self) -> bool {
        self.detection.found
    }

    /// Corners tracked for this frame: the document quad when found,
    /// otherwise the text-region union.
    pub fn tracked_corners(&self) -> Option<CornerSet> {
        if let Some(corners) = self.detection.corners {
            Some(corners)
        } else if self.text_region_found {
            Some(self.text_regions.overall_corners())
        } else {
            None
        }
    }
}

/// OCR-oriented post-processing applied by the enhance stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhanceMode {
    #[default]
    None,
    /// Push light background pixels to pure white.
    WhitenBackground,
    /// Stretch the luminance range to 0-255.
    ContrastStretch,
    /// Gaussian-weighted local mean threshold.
    AdaptiveBinarize,
    /// Sauvola local mean/deviation threshold.
    Sauvola,
}

impl EnhanceMode {
    /// Numeric code used across the host boundary.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::WhitenBackground),
            2 => Some(Self::ContrastStretch),
            3 => Some(Self::AdaptiveBinarize),
            4 => Some(Self::Sauvola),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::None => 0,
            Self::WhitenBackground => 1,
            Self::ContrastStretch => 2,
            Self::AdaptiveBinarize => 3,
            Self::Sauvola => 4,
        }
    }
}

/// Settings for one enhance call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementOptions {
    /// Crop to the corners' bounding box (ignored when perspective
    /// correction runs).
    pub apply_crop: bool,
    pub apply_perspective_correction: bool,
    /// CLAHE on luminance followed by brightness normalisation.
    pub apply_auto_enhance: bool,
    pub apply_sharpening: bool,
    /// Unsharp-mask amount, typically 0.0-1.0.
    pub sharpening_strength: f32,
    pub enhance_mode: EnhanceMode,
    /// Requested output width; 0 = estimate from the corners.
    pub output_width: u32,
    /// Requested output height; 0 = estimate from the corners.
    pub output_height: u32,
}

impl Default for EnhancementOptions {
    fn default() -> Self {
        Self {
            apply_crop: false,
            apply_perspective_correction: true,
            apply_auto_enhance: false,
            apply_sharpening: false,
            sharpening_strength: 0.5,
            enhance_mode: EnhanceMode::None,
            output_width: 0,
            output_height: 0,
        }
    }
}

impl EnhancementOptions {
    /// Both output dimensions, when the caller fixed them.
    pub fn requested_size(&self) -> Option<(u32, u32)> {
        (self.output_width > 0 && self.output_height > 0)
            .then_some((self.output_width, self.output_height))
    }
}

/// Packed 3-channel output of the enhance stage, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancedFrame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    /// Bytes per row.
    pub stride: usize,
    /// Channel order of `pixels` (`Bgr` or `Rgb`).
    pub format: PixelFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_validation_rejects_bad_input() {
        let data = vec![0u8; 12];
        assert!(FrameRef::new(&[], 2, 2, PixelFormat::Rgb).validate().is_err());
        assert!(FrameRef::new(&data, 0, 2, PixelFormat::Rgb).validate().is_err());
        assert!(FrameRef::new(&data, 2, 2, PixelFormat::Bgra).validate().is_err());
        assert!(FrameRef::new(&data, 2, 2, PixelFormat::Rgb).validate().is_ok());
    }

    #[test]
    fn rotation_accepts_only_quarter_turns() {
        assert_eq!(Rotation::from_degrees(90), Some(Rotation::Cw90));
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Cw270));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn pixel_rect_clips_to_image() {
        let rect = PixelRect::new(90, 40, 50, 50).clip_to(100, 60);
        assert_eq!(rect, PixelRect::new(90, 40, 10, 20));

        let outside = PixelRect::new(200, 10, 5, 5).clip_to(100, 60);
        assert!(outside.is_empty());
    }

    #[test]
    fn overall_uses_path_specific_weights() {
        let q = QualityScore {
            blur: 1.0,
            brightness: 0.0,
            stability: 0.0,
            corner_confidence: 0.0,
        };
        assert!((q.overall() - 0.3).abs() < 1e-6);
        assert!((q.weighted(&ScoreWeights::TEXT_REGION) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn strict_readiness_needs_every_component() {
        let ready = QualityScore {
            blur: 0.7,
            brightness: 0.6,
            stability: 0.95,
            corner_confidence: 0.85,
        };
        assert!(ready.is_capture_ready());
        let shaky = QualityScore {
            stability: 0.85,
            ..ready
        };
        assert!(!shaky.is_capture_ready());
    }

    #[test]
    fn requested_size_needs_both_dimensions() {
        let mut opts = EnhancementOptions {
            output_width: 640,
            ..EnhancementOptions::default()
        };
        assert_eq!(opts.requested_size(), None);
        opts.output_height = 480;
        assert_eq!(opts.requested_size(), Some((640, 480)));
    }

    #[test]
    fn enhance_mode_codes_are_stable() {
        for code in 0..5 {
            let mode = EnhanceMode::from_code(code).unwrap();
            assert_eq!(mode.code(), code);
        }
        assert_eq!(EnhanceMode::from_code(9), None);
    }
}
