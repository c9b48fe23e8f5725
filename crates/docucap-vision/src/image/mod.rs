// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — frame decoding/rotation/cropping and the low-level
// primitives (CLAHE, rectangular dilation, adaptive threshold, contours,
// pixel statistics) the detector and assessor build on.

pub mod primitives;
pub mod processor;

pub use processor::FrameProcessor;
