// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Flat wire form of a frame analysis, as consumed by camera host code.

use docucap_core::error::{CaptureError, Result};
use docucap_core::types::FrameAnalysisResult;
use serde::{Deserialize, Serialize};

/// One analysed frame, flattened to primitives and fixed-size arrays.
///
/// Corners use the `x0,y0,..,x3,y3` layout (TL, TR, BR, BL) and are all zero
/// when nothing was tracked. Rectangles are `[x, y, width, height]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub document_found: bool,
    pub table_found: bool,
    pub text_region_found: bool,
    pub corners: [f32; 8],
    pub corner_confidence: f32,
    pub blur_score: f32,
    pub brightness_score: f32,
    pub stability_score: f32,
    pub overall_score: f32,
    pub capture_ready: bool,

    // -- Trapezoid --
    pub is_trapezoid: bool,
    pub skew_ratio: f32,
    pub top_width: f32,
    pub bottom_width: f32,
    pub left_height: f32,
    pub right_height: f32,
    pub vertical_skew: f32,
    pub horizontal_skew: f32,

    // -- Text regions --
    pub text_region_count: usize,
    pub coverage_ratio: f32,
    pub overall_bounds: [f32; 4],
    pub text_regions: Vec<[f32; 4]>,
}

impl From<&FrameAnalysisResult> for AnalysisRecord {
    fn from(result: &FrameAnalysisResult) -> Self {
        let quality = &result.quality;
        let trapezoid = &result.trapezoid;
        let regions = &result.text_regions;

        Self {
            document_found: result.document_found(),
            table_found: result.table_found,
            text_region_found: result.text_region_found,
            corners: result
                .tracked_corners()
                .map(|c| c.to_flat())
                .unwrap_or_default(),
            corner_confidence: quality.corner_confidence,
            blur_score: quality.blur,
            brightness_score: quality.brightness,
            stability_score: quality.stability,
            overall_score: result.overall_score,
            capture_ready: result.capture_ready,

            is_trapezoid: trapezoid.is_trapezoid,
            skew_ratio: trapezoid.skew_ratio,
            top_width: trapezoid.top_width,
            bottom_width: trapezoid.bottom_width,
            left_height: trapezoid.left_height,
            right_height: trapezoid.right_height,
            vertical_skew: trapezoid.vertical_skew,
            horizontal_skew: trapezoid.horizontal_skew,

            text_region_count: regions.count(),
            coverage_ratio: regions.coverage_ratio,
            overall_bounds: regions.overall_bounds.to_array(),
            text_regions: regions.regions.iter().map(|r| r.bounds.to_array()).collect(),
        }
    }
}

impl AnalysisRecord {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Error payload returned in place of an [`AnalysisRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub error: String,
    pub kind: String,
}

impl From<&CaptureError> for ErrorRecord {
    fn from(err: &CaptureError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind().to_string(),
        }
    }
}

/// Encode an analysis outcome; failures become an [`ErrorRecord`].
pub fn encode_analysis(outcome: &Result<FrameAnalysisResult>) -> String {
    let encoded = match outcome {
        Ok(result) => AnalysisRecord::from(result).to_json(),
        Err(err) => serde_json::to_string(&ErrorRecord::from(err)).map_err(CaptureError::from),
    };
    encoded.unwrap_or_else(|err| {
        tracing::warn!(%err, "Failed to encode analysis");
        format!(r#"{{"error":"encoding failed","kind":"{}"}}"#, err.kind())
    })
}
