// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quality module — sharpness/exposure scoring, temporal corner stability and
// text-region heuristics.

pub mod assessor;
pub mod stability;
pub mod text_regions;

pub use assessor::QualityAssessor;
pub use stability::StabilityTracker;
