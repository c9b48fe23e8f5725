// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.
//
// Every section defaults to the tuned constants of the capture pipeline, so a
// partial JSON document only needs to name the values it overrides.

use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result};
use crate::types::{QualityScore, ScoreWeights};

/// Complete engine settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub detector: DetectorConfig,
    pub quality: QualityConfig,
    pub text_regions: TextRegionConfig,
    pub enhance: EnhanceConfig,
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON document and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.quality.validate()?;
        self.text_regions.validate()?;
        self.enhance.validate()
    }
}

fn check(ok: bool, message: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(CaptureError::Config(message.to_owned()))
    }
}

fn unit(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Quadrilateral detector tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Frames wider than this are downsampled before edge detection.
    pub target_width: u32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Contours smaller than this share of the frame are ignored.
    pub min_area_ratio: f32,
    /// Minimum contour/rectangle area ratio for the bounding-box fallback.
    pub min_fill_ratio: f32,
    /// CLAHE clip limit applied before blurring.
    pub clahe_clip_limit: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            target_width: 480,
            canny_low: 30.0,
            canny_high: 100.0,
            min_area_ratio: 0.05,
            min_fill_ratio: 0.7,
            clahe_clip_limit: 2.0,
        }
    }
}

impl DetectorConfig {
    fn validate(&self) -> Result<()> {
        check(self.target_width >= 32, "detector.target_width must be >= 32")?;
        check(
            self.canny_low >= 0.0 && self.canny_low <= self.canny_high,
            "detector.canny_low must be in [0, canny_high]",
        )?;
        check(unit(self.min_area_ratio), "detector.min_area_ratio must be in [0, 1]")?;
        check(unit(self.min_fill_ratio), "detector.min_fill_ratio must be in [0, 1]")?;
        check(self.clahe_clip_limit > 0.0, "detector.clahe_clip_limit must be > 0")
    }
}

/// Component thresholds a frame must exceed to be capture ready.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadinessThresholds {
    pub blur: f32,
    pub brightness: f32,
    pub stability: f32,
}

impl ReadinessThresholds {
    /// All three components strictly above their thresholds.
    pub fn is_met(&self, score: &QualityScore) -> bool {
        score.blur > self.blur
            && score.brightness > self.brightness
            && score.stability > self.stability
    }
}

/// Scoring weights, readiness gates and stability tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Weights when a document boundary was found.
    pub frame_weights: ScoreWeights,
    /// Weights on the text-region fallback.
    pub text_region_weights: ScoreWeights,
    pub document_readiness: ReadinessThresholds,
    pub text_region_readiness: ReadinessThresholds,
    /// Laplacian variance that maps to a blur score of 1.
    pub blur_variance_scale: f32,
    /// Retained corner sets.
    pub stability_window: usize,
    /// Corner sets needed before stability is scored.
    pub stability_warmup: usize,
    /// Mean corner displacement (pixels) that maps to a stability of 0.
    pub stability_max_displacement: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            frame_weights: ScoreWeights::FRAME,
            text_region_weights: ScoreWeights::TEXT_REGION,
            document_readiness: ReadinessThresholds {
                blur: 0.6,
                brightness: 0.5,
                stability: 0.8,
            },
            text_region_readiness: ReadinessThresholds {
                blur: 0.6,
                brightness: 0.5,
                stability: 0.9,
            },
            blur_variance_scale: 500.0,
            stability_window: 5,
            stability_warmup: 3,
            stability_max_displacement: 20.0,
        }
    }
}

impl QualityConfig {
    fn validate(&self) -> Result<()> {
        check(self.blur_variance_scale > 0.0, "quality.blur_variance_scale must be > 0")?;
        check(self.stability_window >= 1, "quality.stability_window must be >= 1")?;
        check(
            self.stability_warmup <= self.stability_window,
            "quality.stability_warmup must not exceed stability_window",
        )?;
        check(
            self.stability_max_displacement > 0.0,
            "quality.stability_max_displacement must be > 0",
        )
    }
}

/// Text-block morphology heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextRegionConfig {
    /// Adaptive threshold neighbourhood (odd).
    pub block_size: u32,
    /// Constant subtracted from the local mean.
    pub threshold_offset: f32,
    pub min_area_ratio: f32,
    pub max_area_ratio: f32,
    pub min_width: u32,
    pub min_height: u32,
    /// Padding added around the union of all blocks, as a share of the frame.
    pub padding_ratio: f32,
    /// Regions reported across the host boundary.
    pub max_reported: usize,
}

impl Default for TextRegionConfig {
    fn default() -> Self {
        Self {
            block_size: 11,
            threshold_offset: 2.0,
            min_area_ratio: 0.005,
            max_area_ratio: 0.95,
            min_width: 20,
            min_height: 10,
            padding_ratio: 0.02,
            max_reported: 8,
        }
    }
}

impl TextRegionConfig {
    fn validate(&self) -> Result<()> {
        check(
            self.block_size >= 3 && self.block_size % 2 == 1,
            "text_regions.block_size must be odd and >= 3",
        )?;
        check(
            unit(self.min_area_ratio)
                && unit(self.max_area_ratio)
                && self.min_area_ratio < self.max_area_ratio,
            "text_regions area ratios must satisfy 0 <= min < max <= 1",
        )?;
        check(unit(self.padding_ratio), "text_regions.padding_ratio must be in [0, 1]")
    }
}

/// Enhancement-mode parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    pub sauvola_window: u32,
    pub sauvola_k: f32,
    pub sauvola_dynamic_range: f32,
    /// Luma above which pixels become white in whiten-background mode.
    pub whiten_threshold: u8,
    pub adaptive_block_size: u32,
    pub adaptive_offset: f32,
    /// Gaussian sigma of the unsharp mask.
    pub sharpen_sigma: f32,
    /// CLAHE clip limit used by auto-enhance.
    pub clahe_clip_limit: f32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            sauvola_window: 15,
            sauvola_k: 0.2,
            sauvola_dynamic_range: 128.0,
            whiten_threshold: 200,
            adaptive_block_size: 11,
            adaptive_offset: 2.0,
            sharpen_sigma: 3.0,
            clahe_clip_limit: 2.0,
        }
    }
}

impl EnhanceConfig {
    fn validate(&self) -> Result<()> {
        check(self.sauvola_window >= 1, "enhance.sauvola_window must be >= 1")?;
        check(
            self.sauvola_dynamic_range > 0.0,
            "enhance.sauvola_dynamic_range must be > 0",
        )?;
        check(
            self.adaptive_block_size >= 3 && self.adaptive_block_size % 2 == 1,
            "enhance.adaptive_block_size must be odd and >= 3",
        )?;
        check(self.sharpen_sigma > 0.0, "enhance.sharpen_sigma must be > 0")?;
        check(self.clahe_clip_limit > 0.0, "enhance.clahe_clip_limit must be > 0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let cfg = EngineConfig::from_json(r#"{"detector": {"canny_low": 20.0}}"#).unwrap();
        assert_eq!(cfg.detector.canny_low, 20.0);
        assert_eq!(cfg.detector.canny_high, 100.0);
        assert_eq!(cfg.quality.stability_window, 5);
        assert_eq!(cfg.enhance.sauvola_window, 15);
    }

    #[test]
    fn rejects_inverted_canny_thresholds() {
        let err = EngineConfig::from_json(r#"{"detector": {"canny_low": 150.0}}"#).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn rejects_even_block_size() {
        let mut cfg = EngineConfig::default();
        cfg.text_regions.block_size = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn readiness_is_strict() {
        let gate = QualityConfig::default().document_readiness;
        let at_threshold = QualityScore {
            blur: 0.6,
            brightness: 0.9,
            stability: 0.9,
            corner_confidence: 0.0,
        };
        assert!(!gate.is_met(&at_threshold));
        let above = QualityScore {
            blur: 0.61,
            ..at_threshold
        };
        assert!(gate.is_met(&above));
    }
}
