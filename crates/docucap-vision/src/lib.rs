// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docucap-vision — Vision pipeline for the Docucap capture engine.
//
// Provides quad detection on preview frames, quality scoring (sharpness,
// exposure, stability, text-region fallback), trapezoid analysis and
// perspective rectification, and OCR-oriented enhancement (whitening,
// contrast stretch, adaptive and Sauvola binarization, sharpening).

pub mod detector;
pub mod engine;
pub mod image;
pub mod perspective;
pub mod quality;
pub mod scan;

// Re-export the primary structs so callers can use `docucap_vision::CaptureEngine` etc.
pub use detector::QuadDetector;
pub use engine::CaptureEngine;
pub use self::image::processor::FrameProcessor;
pub use perspective::{PerspectiveCorrector, measure_trapezoid, virtual_trapezoid};
pub use quality::{QualityAssessor, StabilityTracker};
pub use scan::{SauvolaParams, ScanEnhancer, sauvola_binarize};
