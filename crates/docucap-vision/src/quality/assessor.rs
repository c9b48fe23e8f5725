// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frame quality assessment — sharpness, exposure and stability scoring.

use docucap_core::config::{QualityConfig, TextRegionConfig};
use docucap_core::geometry::CornerSet;
use docucap_core::types::{PixelRect, QualityScore, TextRegion, TextRegionSummary};
use image::GrayImage;
use tracing::{debug, instrument};

use crate::image::primitives;
use crate::quality::stability::StabilityTracker;
use crate::quality::text_regions;

/// Regions smaller than this on either side are scored over the whole frame.
const MIN_REGION_SIDE: u32 = 10;

/// Scores frames for capture readiness.
///
/// Holds the only mutable state of the analysis path: the stability history.
#[derive(Debug, Clone)]
pub struct QualityAssessor {
    config: QualityConfig,
    text_config: TextRegionConfig,
    stability: StabilityTracker,
}

impl QualityAssessor {
    pub fn new(config: QualityConfig, text_config: TextRegionConfig) -> Self {
        let stability = StabilityTracker::from_config(&config);
        Self {
            config,
            text_config,
            stability,
        }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    pub fn stability_tracker(&self) -> &StabilityTracker {
        &self.stability
    }

    // -- Whole-frame scores ---------------------------------------------------

    /// Sharpness from the Laplacian variance, saturating at
    /// `blur_variance_scale`.
    pub fn detect_blur(&self, gray: &GrayImage) -> f32 {
        let variance = primitives::laplacian_variance(gray);
        (variance / self.config.blur_variance_scale as f64).min(1.0) as f32
    }

    /// Exposure score: 1 at mid-gray, falling to 0 at black or white.
    pub fn check_brightness(&self, gray: &GrayImage) -> f32 {
        let brightness = primitives::mean_intensity(gray) / 255.0;
        (1.0 - 2.0 * (brightness - 0.5).abs()).max(0.0) as f32
    }

    // -- Region scores --------------------------------------------------------

    pub fn detect_blur_in_region(&self, gray: &GrayImage, region: PixelRect) -> f32 {
        match clip_region(gray, region) {
            Some(rect) => self.detect_blur(&primitives::region(gray, rect)),
            None => self.detect_blur(gray),
        }
    }

    pub fn check_brightness_in_region(&self, gray: &GrayImage, region: PixelRect) -> f32 {
        match clip_region(gray, region) {
            Some(rect) => self.check_brightness(&primitives::region(gray, rect)),
            None => self.check_brightness(gray),
        }
    }

    // -- Temporal -------------------------------------------------------------

    /// Record `corners` in the stability history and score this frame.
    pub fn check_stability(&mut self, corners: &CornerSet) -> f32 {
        self.stability.observe(corners)
    }

    /// Whole-frame sharpness and exposure plus stability of `corners`.
    #[instrument(skip_all, fields(confidence))]
    pub fn assess(
        &mut self,
        gray: &GrayImage,
        corners: Option<&CornerSet>,
        confidence: f32,
    ) -> QualityScore {
        let score = QualityScore {
            blur: self.detect_blur(gray),
            brightness: self.check_brightness(gray),
            stability: corners.map_or(0.0, |c| self.check_stability(c)),
            corner_confidence: confidence,
        };
        debug!(?score, "Frame assessed");
        score
    }

    // -- Text regions ---------------------------------------------------------

    pub fn detect_text_regions(&self, gray: &GrayImage) -> TextRegionSummary {
        text_regions::find_text_regions(gray, &self.text_config)
    }

    pub fn detect_text_region(&self, gray: &GrayImage) -> Option<TextRegion> {
        text_regions::find_text_block(gray, &self.text_config)
    }

    /// Score a frame around its largest text block; whole-frame scores with
    /// zero stability when there is no block.
    pub fn assess_with_text_region(&mut self, gray: &GrayImage) -> (QualityScore, Option<TextRegion>) {
        let Some(block) = self.detect_text_region(gray) else {
            let score = QualityScore {
                blur: self.detect_blur(gray),
                brightness: self.check_brightness(gray),
                ..QualityScore::default()
            };
            return (score, None);
        };

        let score = QualityScore {
            blur: self.detect_blur_in_region(gray, block.bounds),
            brightness: self.check_brightness_in_region(gray, block.bounds),
            stability: self.check_stability(&block.corners),
            corner_confidence: block.confidence,
        };
        (score, Some(block))
    }

    /// Forget the stability history.
    pub fn reset(&mut self) {
        self.stability.reset();
    }
}

impl Default for QualityAssessor {
    fn default() -> Self {
        Self::new(QualityConfig::default(), TextRegionConfig::default())
    }
}

/// Clip `region` to the image; `None` when the result is too small to score.
fn clip_region(gray: &GrayImage, region: PixelRect) -> Option<PixelRect> {
    let clipped = region.clip_to(gray.width(), gray.height());
    (clipped.width >= MIN_REGION_SIDE && clipped.height >= MIN_REGION_SIDE).then_some(clipped)
}
