// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — OCR-oriented enhancement of rectified captures and
// Sauvola local binarization.

pub mod enhance;
pub mod sauvola;

pub use enhance::ScanEnhancer;
pub use sauvola::{SauvolaParams, sauvola_binarize};
