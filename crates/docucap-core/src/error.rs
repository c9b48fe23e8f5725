// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Docucap.

use thiserror::Error;

/// Top-level error type for all Docucap operations.
///
/// A missing document in a frame is not represented here: detection misses are
/// a normal outcome that sends analysis down the text-region path.
#[derive(Debug, Error)]
pub enum CaptureError {
    // -- Input validation --
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // -- Enhancement stage --
    #[error("perspective correction failed: {0}")]
    Rectification(String),

    #[error("image processing failed: {0}")]
    Image(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage / encoding --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CaptureError {
    /// Short machine-friendly tag for the error category, used by the host
    /// bridge when it flattens errors into status strings.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Rectification(_) => "rectification",
            Self::Image(_) => "image",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CaptureError>;
