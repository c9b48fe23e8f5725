// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text-block heuristics used when no document boundary is visible: dark
// strokes are thresholded, smeared into blocks with rectangular dilation and
// boxed.

use docucap_core::config::TextRegionConfig;
use docucap_core::types::{PixelRect, TextRegion, TextRegionSummary};
use image::GrayImage;

use crate::image::primitives::{self, Contour};

/// Find every plausible text block in a frame.
///
/// Blocks are kept when their contour covers between `min_area_ratio` and
/// `max_area_ratio` of the frame and their bounds are at least
/// `min_width` x `min_height`. The summary lists the largest
/// `max_reported` blocks; totals and the overall bounds cover all of them.
pub fn find_text_regions(gray: &GrayImage, config: &TextRegionConfig) -> TextRegionSummary {
    let (width, height) = gray.dimensions();
    let frame_area = width as f32 * height as f32;
    if frame_area == 0.0 {
        return TextRegionSummary::default();
    }

    let blocks = text_blocks(gray, config.block_size, config.threshold_offset, (15, 3), (3, 8));
    let min_area = frame_area * config.min_area_ratio;
    let max_area = frame_area * config.max_area_ratio;

    let mut regions: Vec<TextRegion> = blocks
        .iter()
        .filter_map(|contour| {
            let area = primitives::contour_area(contour);
            if area < min_area || area > max_area {
                return None;
            }
            let bounds = primitives::bounding_rect(contour);
            if bounds.width < config.min_width || bounds.height < config.min_height {
                return None;
            }
            Some(TextRegion {
                bounds,
                corners: bounds.corners(),
                confidence: (area / (frame_area * 0.5)).min(1.0),
                area,
            })
        })
        .collect();

    if regions.is_empty() {
        return TextRegionSummary::default();
    }

    regions.sort_by(|a, b| b.area.total_cmp(&a.area));
    let total_area: f32 = regions.iter().map(|r| r.area).sum();
    let overall_bounds = padded_union(&regions, config.padding_ratio, width, height);
    regions.truncate(config.max_reported.max(1));

    TextRegionSummary {
        regions,
        overall_bounds,
        total_area,
        coverage_ratio: total_area / frame_area,
    }
}

/// The single largest text block, padded by 5 % of its own size.
///
/// Uses a wider smear (25x3 then 5x15) than [`find_text_regions`] so that a
/// whole paragraph or table collapses into one block. Confidence is 1 for
/// blocks covering 10-90 % of the frame and ramps to 0 at 5 % and 95 %.
pub fn find_text_block(gray: &GrayImage, config: &TextRegionConfig) -> Option<TextRegion> {
    let (width, height) = gray.dimensions();
    let frame_area = width as f32 * height as f32;
    if frame_area == 0.0 {
        return None;
    }

    let blocks = text_blocks(gray, config.block_size, config.threshold_offset, (25, 3), (5, 15));
    let (contour, area) = blocks
        .iter()
        .map(|c| (c, primitives::contour_area(c)))
        .filter(|(_, area)| *area > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    let raw = primitives::bounding_rect(contour);
    let pad_x = (raw.width as f32 * 0.05) as u32;
    let pad_y = (raw.height as f32 * 0.05) as u32;
    let x = raw.x.saturating_sub(pad_x);
    let y = raw.y.saturating_sub(pad_y);
    let bounds = PixelRect::new(
        x,
        y,
        (raw.width + 2 * pad_x).min(width - x),
        (raw.height + 2 * pad_y).min(height - y),
    );

    Some(TextRegion {
        bounds,
        corners: bounds.corners(),
        confidence: block_confidence(area / frame_area),
        area,
    })
}

fn block_confidence(ratio: f32) -> f32 {
    if (0.10..=0.90).contains(&ratio) {
        1.0
    } else if (0.05..0.10).contains(&ratio) {
        (ratio - 0.05) / 0.05
    } else if ratio > 0.90 && ratio <= 0.95 {
        (0.95 - ratio) / 0.05
    } else {
        0.0
    }
}

/// Threshold dark strokes, smear them with two rectangular dilations and
/// return the outlines of the resulting blobs.
fn text_blocks(
    gray: &GrayImage,
    block_size: u32,
    offset: f32,
    first_kernel: (u32, u32),
    second_kernel: (u32, u32),
) -> Vec<Contour> {
    let strokes = primitives::adaptive_threshold_gaussian(gray, block_size, offset, true);
    let lines = primitives::dilate_rect(&strokes, first_kernel.0, first_kernel.1);
    let blocks = primitives::dilate_rect(&lines, second_kernel.0, second_kernel.1);
    primitives::external_contours(&blocks)
}

/// Union of all region bounds, grown by `padding_ratio` of its own size and
/// clipped to the frame.
fn padded_union(regions: &[TextRegion], padding_ratio: f32, width: u32, height: u32) -> PixelRect {
    let (mut x0, mut y0, mut x1, mut y1) = (width, height, 0u32, 0u32);
    for region in regions {
        x0 = x0.min(region.bounds.x);
        y0 = y0.min(region.bounds.y);
        x1 = x1.max(region.bounds.right());
        y1 = y1.max(region.bounds.bottom());
    }
    let pad_x = (x1.saturating_sub(x0) as f32 * padding_ratio) as u32;
    let pad_y = (y1.saturating_sub(y0) as f32 * padding_ratio) as u32;

    let x0 = x0.saturating_sub(pad_x);
    let y0 = y0.saturating_sub(pad_y);
    let x1 = (x1 + pad_x).min(width);
    let y1 = (y1 + pad_y).min(height);
    PixelRect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
}
