// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Docucap — Core types, geometry and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod geometry;
pub mod types;

pub use config::EngineConfig;
pub use error::{CaptureError, Result};
pub use geometry::{Corner, CornerSet, Point2, order_corners};
pub use types::*;
