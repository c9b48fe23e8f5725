// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture engine — the two-stage analyze → enhance protocol.
//
// `analyze` runs on every preview frame: it finds the document, scores the
// frame and decides whether it is ready to capture. `enhance` runs once on the
// captured frame: it rectifies, cleans up and packs the result for OCR.

use docucap_core::config::EngineConfig;
use docucap_core::error::{CaptureError, Result};
use docucap_core::geometry::{CornerSet, Point2};
use docucap_core::types::{
    EnhancedFrame, EnhancementOptions, FrameAnalysisResult, FrameRef, GuideRect, PixelRect,
    QualityScore, Rotation, SessionId,
};
use image::GrayImage;
use tracing::{debug, info, instrument};

use crate::detector::QuadDetector;
use crate::image::processor::FrameProcessor;
use crate::perspective::{PerspectiveCorrector, measure_trapezoid, virtual_trapezoid};
use crate::quality::assessor::QualityAssessor;
use crate::scan::enhance::ScanEnhancer;

/// Owns the pipeline stages and the state carried between frames.
///
/// The cross-call state is the stability history (inside the assessor) and
/// the most recent analysis, which the guide-frame enhance path consults.
/// `analyze` and `reset` need `&mut self`; both enhance entry points only read.
pub struct CaptureEngine {
    config: EngineConfig,
    detector: QuadDetector,
    assessor: QualityAssessor,
    corrector: PerspectiveCorrector,
    last_analysis: FrameAnalysisResult,
    session: SessionId,
}

impl CaptureEngine {
    /// Engine with the default configuration.
    pub fn new() -> Self {
        Self::build(EngineConfig::default())
    }

    /// Engine with a validated custom configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        let session = SessionId::new();
        info!(%session, "Capture engine created");
        Self {
            detector: QuadDetector::new(config.detector.clone()),
            assessor: QualityAssessor::new(config.quality.clone(), config.text_regions.clone()),
            corrector: PerspectiveCorrector::new(),
            last_analysis: FrameAnalysisResult::default(),
            session,
            config,
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// Result of the most recent successful `analyze` call.
    pub fn last_analysis(&self) -> &FrameAnalysisResult {
        &self.last_analysis
    }

    /// Number of corner sets currently held for stability scoring.
    pub fn stability_history_len(&self) -> usize {
        self.assessor.stability_tracker().len()
    }

    // -- Analyze --------------------------------------------------------------

    /// Analyze one preview frame.
    ///
    /// The frame is rotated clockwise by `rotation`, then cropped to `crop`
    /// (clamped to the rotated frame, ignored when empty). Invalid input is
    /// rejected without touching the engine state.
    #[instrument(skip(self, frame), fields(session = %self.session, width = frame.width, height = frame.height))]
    pub fn analyze(
        &mut self,
        frame: &FrameRef<'_>,
        rotation: Rotation,
        crop: Option<PixelRect>,
    ) -> Result<FrameAnalysisResult> {
        let mut processor = FrameProcessor::from_frame(frame)?.rotate(rotation);
        if let Some(rect) = crop.filter(|r| !r.is_empty()) {
            processor = processor.crop(rect);
        }
        let gray = processor.grayscale();

        let detection = self.detector.detect(&gray);
        let mut result = FrameAnalysisResult {
            detection: detection.clone(),
            frame_size: gray.dimensions(),
            ..FrameAnalysisResult::default()
        };

        match detection.corners.filter(|_| detection.found) {
            Some(corners) => self.score_document(&gray, &corners, detection.confidence, &mut result),
            None => self.score_text_regions(&gray, &mut result),
        }

        debug!(
            table_found = result.table_found,
            text_region_found = result.text_region_found,
            overall = result.overall_score,
            ready = result.capture_ready,
            "Frame analyzed"
        );
        self.last_analysis = result.clone();
        Ok(result)
    }

    fn score_document(
        &mut self,
        gray: &GrayImage,
        corners: &CornerSet,
        confidence: f32,
        result: &mut FrameAnalysisResult,
    ) {
        let quality = self.assessor.assess(gray, Some(corners), confidence);
        let policy = &self.config.quality;

        result.table_found = true;
        result.trapezoid = measure_trapezoid(corners);
        result.quality = quality;
        result.overall_score = quality.weighted(&policy.frame_weights);
        result.capture_ready = policy.document_readiness.is_met(&quality);
    }

    fn score_text_regions(&mut self, gray: &GrayImage, result: &mut FrameAnalysisResult) {
        let summary = self.assessor.detect_text_regions(gray);
        let policy = &self.config.quality;

        let quality = if summary.is_found() {
            let bounds = summary.overall_bounds;
            let quality = QualityScore {
                blur: self.assessor.detect_blur_in_region(gray, bounds),
                brightness: self.assessor.check_brightness_in_region(gray, bounds),
                stability: self.assessor.check_stability(&summary.overall_corners()),
                corner_confidence: summary.coverage_ratio,
            };
            result.text_region_found = true;
            result.overall_score = quality.weighted(&policy.text_region_weights);
            quality
        } else {
            QualityScore {
                blur: self.assessor.detect_blur(gray),
                brightness: self.assessor.check_brightness(gray),
                ..QualityScore::default()
            }
        };

        result.quality = quality;
        result.capture_ready = policy.text_region_readiness.is_met(&quality);
        result.text_regions = summary;
    }

    // -- Enhance --------------------------------------------------------------

    /// Rectify and enhance a captured frame bounded by explicit `corners`.
    #[instrument(skip(self, frame, corners, options), fields(session = %self.session))]
    pub fn enhance(
        &self,
        frame: &FrameRef<'_>,
        corners: &[Point2],
        options: &EnhancementOptions,
    ) -> Result<EnhancedFrame> {
        if corners.is_empty() {
            return Err(CaptureError::InvalidInput("corners not provided".into()));
        }
        let processor = FrameProcessor::from_frame(frame)?;
        self.run_enhancement(processor, corners, options)
    }

    /// Enhance a captured frame using the on-screen guide box.
    ///
    /// The frame is rotated first. When the last analysis saw a trapezoidal
    /// table the guide is turned into a virtual trapezoid and rectified;
    /// otherwise the frame is simply cropped to the guide.
    #[instrument(skip(self, frame, options), fields(session = %self.session))]
    pub fn enhance_with_guide_frame(
        &self,
        frame: &FrameRef<'_>,
        guide: &GuideRect,
        options: &EnhancementOptions,
        rotation: Rotation,
    ) -> Result<EnhancedFrame> {
        let processor = FrameProcessor::from_frame(frame)?.rotate(rotation);

        let corners = virtual_trapezoid(guide, &self.last_analysis);
        let rectify = self.last_analysis.table_found && self.last_analysis.trapezoid.is_trapezoid;
        let adjusted = EnhancementOptions {
            apply_perspective_correction: rectify,
            apply_crop: !rectify,
            ..*options
        };
        info!(rectify, ?corners, "Guide frame resolved");

        self.run_enhancement(processor, corners.points(), &adjusted)
    }

    /// Crop or rectify, then auto-enhance, mode and sharpening.
    fn run_enhancement(
        &self,
        processor: FrameProcessor,
        corners: &[Point2],
        options: &EnhancementOptions,
    ) -> Result<EnhancedFrame> {
        let format = processor.source_format();
        let mut processor = processor;

        if options.apply_crop && !options.apply_perspective_correction {
            processor = processor.crop(corner_bounds(corners));
        }

        if options.apply_perspective_correction {
            let rectified =
                self.corrector
                    .correct(processor.as_rgb(), corners, options.requested_size())?;
            processor = processor.map_image(|_| rectified);
        }

        let mut enhancer = ScanEnhancer::new(processor.into_rgb(), &self.config.enhance);
        if options.apply_auto_enhance {
            enhancer = enhancer.auto_enhance();
        }
        enhancer = enhancer.apply_mode(options.enhance_mode);
        if options.apply_sharpening {
            enhancer = enhancer.sharpen(options.sharpening_strength);
        }

        let output = FrameProcessor::from_rgb(enhancer.into_rgb(), format).into_enhanced()?;
        info!(
            width = output.width,
            height = output.height,
            mode = ?options.enhance_mode,
            "Enhancement complete"
        );
        Ok(output)
    }

    // -- Session --------------------------------------------------------------

    /// Forget the stability history and start a new session.
    pub fn reset(&mut self) {
        self.assessor.reset();
        self.session = SessionId::new();
        info!(session = %self.session, "Capture session reset");
    }
}

impl Default for CaptureEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Upright bounding box of `corners`, truncated to whole pixels.
fn corner_bounds(corners: &[Point2]) -> PixelRect {
    let (x0, y0, x1, y1) = corners.iter().fold(
        (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
        |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
    );
    PixelRect::new(
        x0.max(0.0) as u32,
        y0.max(0.0) as u32,
        (x1 - x0).max(0.0) as u32,
        (y1 - y0).max(0.0) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use docucap_core::types::{EnhanceMode, PixelFormat};

    /// Packed RGB frame: dark background with a bright axis-aligned rectangle.
    fn rgb_frame(w: u32, h: u32, rect: (u32, u32, u32, u32)) -> Vec<u8> {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                let inside = x >= rect.0 && x < rect.2 && y >= rect.1 && y < rect.3;
                let v = if inside { 220 } else { 30 };
                data.extend_from_slice(&[v, v, v]);
            }
        }
        data
    }

    #[test]
    fn invalid_frame_leaves_state_untouched() {
        let mut engine = CaptureEngine::new();
        let data = rgb_frame(120, 90, (20, 20, 100, 70));
        let frame = FrameRef::new(&data, 120, 90, PixelFormat::Rgb);
        engine.analyze(&frame, Rotation::None, None).unwrap();
        let before = engine.last_analysis().clone();

        let empty = FrameRef::new(&[], 120, 90, PixelFormat::Rgb);
        let err = engine.analyze(&empty, Rotation::None, None).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert_eq!(engine.last_analysis(), &before);
    }

    #[test]
    fn analyze_records_frame_size_after_rotation_and_crop() {
        let mut engine = CaptureEngine::new();
        let data = rgb_frame(160, 120, (0, 0, 0, 0));
        let frame = FrameRef::new(&data, 160, 120, PixelFormat::Rgb);

        let rotated = engine.analyze(&frame, Rotation::Cw90, None).unwrap();
        assert_eq!(rotated.frame_size, (120, 160));

        let cropped = engine
            .analyze(&frame, Rotation::None, Some(PixelRect::new(100, 100, 500, 500)))
            .unwrap();
        assert_eq!(cropped.frame_size, (60, 20));

        let empty_crop = engine
            .analyze(&frame, Rotation::None, Some(PixelRect::new(10, 10, 0, 5)))
            .unwrap();
        assert_eq!(empty_crop.frame_size, (160, 120));
    }

    #[test]
    fn blank_frame_has_zero_overall_score() {
        let mut engine = CaptureEngine::new();
        let data = vec![128u8; 100 * 80 * 3];
        let frame = FrameRef::new(&data, 100, 80, PixelFormat::Rgb);
        let result = engine.analyze(&frame, Rotation::None, None).unwrap();

        assert!(!result.document_found());
        assert!(!result.text_region_found);
        assert_eq!(result.overall_score, 0.0);
        assert_eq!(result.quality.stability, 0.0);
        assert!(!result.capture_ready);
        assert!(result.quality.brightness > 0.99);
    }

    #[test]
    fn enhance_requires_corners() {
        let engine = CaptureEngine::new();
        let data = rgb_frame(50, 50, (0, 0, 0, 0));
        let frame = FrameRef::new(&data, 50, 50, PixelFormat::Rgb);
        let err = engine
            .enhance(&frame, &[], &EnhancementOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn enhance_rejects_three_corners() {
        let engine = CaptureEngine::new();
        let data = rgb_frame(50, 50, (0, 0, 0, 0));
        let frame = FrameRef::new(&data, 50, 50, PixelFormat::Rgb);
        let corners = [Point2::new(0.0, 0.0), Point2::new(40.0, 0.0), Point2::new(40.0, 40.0)];
        let err = engine
            .enhance(&frame, &corners, &EnhancementOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), "rectification");
    }

    #[test]
    fn crop_only_enhance_uses_corner_bounds() {
        let engine = CaptureEngine::new();
        let data = rgb_frame(200, 150, (0, 0, 0, 0));
        let frame = FrameRef::new(&data, 200, 150, PixelFormat::Bgr);
        let corners = CornerSet::from_rect(20.5, 10.0, 120.9, 90.0);
        let options = EnhancementOptions {
            apply_crop: true,
            apply_perspective_correction: false,
            ..EnhancementOptions::default()
        };
        let out = engine.enhance(&frame, corners.points(), &options).unwrap();
        assert_eq!((out.width, out.height), (100, 80));
        assert_eq!(out.format, PixelFormat::Bgr);
        assert_eq!(out.channels, 3);
        assert_eq!(out.pixels.len(), out.stride * out.height as usize);
    }

    #[test]
    fn guide_frame_without_analysis_crops_to_guide() {
        let engine = CaptureEngine::new();
        let data = rgb_frame(200, 150, (0, 0, 0, 0));
        let frame = FrameRef::new(&data, 200, 150, PixelFormat::Rgb);
        let guide = GuideRect::new(10.0, 20.0, 110.0, 100.0);
        let options = EnhancementOptions {
            enhance_mode: EnhanceMode::Sauvola,
            ..EnhancementOptions::default()
        };
        let out = engine
            .enhance_with_guide_frame(&frame, &guide, &options, Rotation::None)
            .unwrap();
        assert_eq!((out.width, out.height), (100, 80));
    }

    #[test]
    fn reset_starts_new_session_and_clears_history() {
        let mut engine = CaptureEngine::new();
        let data = rgb_frame(320, 240, (60, 50, 260, 190));
        let frame = FrameRef::new(&data, 320, 240, PixelFormat::Rgb);
        engine.analyze(&frame, Rotation::None, None).unwrap();
        assert!(engine.stability_history_len() > 0);

        let first = engine.session_id();
        engine.reset();
        assert_ne!(engine.session_id(), first);
        assert_eq!(engine.stability_history_len(), 0);
    }

    #[test]
    fn with_config_rejects_invalid_settings() {
        let mut config = EngineConfig::default();
        config.quality.stability_window = 0;
        assert!(CaptureEngine::with_config(config).is_err());
    }
}
