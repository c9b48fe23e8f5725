// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CLI command definitions and shared helpers.

pub mod analyze;
pub mod enhance;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use docucap_core::config::EngineConfig;
use docucap_core::error::{CaptureError, Result};
use docucap_core::types::Rotation;
use docucap_vision::CaptureEngine;
use image::RgbImage;

/// Docucap - document and table capture from camera frames
#[derive(Parser)]
#[command(name = "docucap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Engine configuration (JSON); missing keys keep their defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Run frame analysis and print the result as JSON
    Analyze(analyze::AnalyzeArgs),
    /// Rectify and enhance an image for OCR
    Enhance(enhance::EnhanceArgs),
}

/// Build an engine from the optional JSON config file.
pub fn load_engine(config: Option<&Path>) -> Result<CaptureEngine> {
    let config = match config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            tracing::info!(path = %path.display(), "Loaded engine configuration");
            EngineConfig::from_json(&text)?
        }
        None => EngineConfig::default(),
    };
    CaptureEngine::with_config(config)
}

/// Decode an image file to packed RGB.
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    let image = image::open(path)
        .map_err(|e| CaptureError::Image(format!("{}: {e}", path.display())))?;
    Ok(image.to_rgb8())
}

/// Parse a clockwise rotation in degrees.
pub fn parse_rotation(value: &str) -> std::result::Result<Rotation, String> {
    let degrees: i32 = value.parse().map_err(|_| format!("not a number: {value}"))?;
    Rotation::from_degrees(degrees)
        .ok_or_else(|| format!("rotation must be 0, 90, 180 or 270 (got {degrees})"))
}

/// Parse a comma-separated list of exactly `N` numbers.
pub fn parse_list<const N: usize>(value: &str) -> std::result::Result<[f32; N], String> {
    let numbers = value
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in '{value}': {e}"))?;
    <[f32; N]>::try_from(numbers)
        .map_err(|found| format!("expected {N} comma-separated values, got {}", found.len()))
}
