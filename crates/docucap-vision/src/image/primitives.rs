// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Thin adapter over `image` / `imageproc` for the primitives the capture
// pipeline needs: contrast-limited histogram equalisation, rectangular
// dilation, Gaussian adaptive thresholding, contour helpers and pixel
// statistics.

use docucap_core::geometry::{Point2, polygon_area};
use docucap_core::types::PixelRect;
use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use imageproc::filter::{gaussian_blur_f32, laplacian_filter};
use imageproc::point::Point;

/// Integer contour as returned by the border follower.
pub type Contour = Vec<Point<i32>>;

// -- Histogram equalisation ---------------------------------------------------

/// Contrast-limited adaptive histogram equalisation.
///
/// The image is split into a grid of at most `grid` x `grid` tiles. Each tile
/// gets a clipped, redistributed histogram and its own lookup table; pixels are
/// mapped by bilinear interpolation between the four nearest tile tables.
pub fn clahe(gray: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let tile_w = width.div_ceil(grid.max(1));
    let tile_h = height.div_ceil(grid.max(1));
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            let area = (x1 - x0) * (y1 - y0);
            clip_histogram(&mut hist, clip_limit, area);
            luts[(ty * tiles_x + tx) as usize] = equalisation_lut(&hist, area);
        }
    }

    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let ty0 = fy.floor().max(0.0) as u32;
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let wy = (fy - ty0 as f32).clamp(0.0, 1.0);

        for x in 0..width {
            let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
            let tx0 = fx.floor().max(0.0) as u32;
            let tx1 = (tx0 + 1).min(tiles_x - 1);
            let wx = (fx - tx0 as f32).clamp(0.0, 1.0);

            let v = gray.get_pixel(x, y).0[0] as usize;
            let lut = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][v] as f32;

            let top = lut(tx0, ty0) * (1.0 - wx) + lut(tx1, ty0) * wx;
            let bottom = lut(tx0, ty1) * (1.0 - wx) + lut(tx1, ty1) * wx;
            let mapped = top * (1.0 - wy) + bottom * wy;
            out.put_pixel(x, y, Luma([mapped.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

fn clip_histogram(hist: &mut [u32; 256], clip_limit: f32, area: u32) {
    let limit = ((clip_limit * area as f32) / 256.0).max(1.0) as u32;

    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let batch = excess / 256;
    let residual = excess % 256;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (256 / residual).max(1) as usize;
        for bin in hist.iter_mut().step_by(step).take(residual as usize) {
            *bin += 1;
        }
    }
}

fn equalisation_lut(hist: &[u32; 256], area: u32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    let scale = 255.0 / area.max(1) as f32;
    let mut cdf = 0u32;
    for (value, &count) in hist.iter().enumerate() {
        cdf += count;
        lut[value] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

// -- Morphology & thresholding ------------------------------------------------

/// Dilate with a `kernel_w` x `kernel_h` rectangle anchored at `(w/2, h/2)`.
///
/// Separable max filter; pixels outside the image do not contribute.
pub fn dilate_rect(gray: &GrayImage, kernel_w: u32, kernel_h: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let mut horizontal = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let (start, end) = kernel_span(x, kernel_w, width);
            let value = (start..=end).map(|i| gray.get_pixel(i, y).0[0]).max().unwrap_or(0);
            horizontal.put_pixel(x, y, Luma([value]));
        }
    }

    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        let (start, end) = kernel_span(y, kernel_h, height);
        for x in 0..width {
            let value = (start..=end)
                .map(|j| horizontal.get_pixel(x, j).0[0])
                .max()
                .unwrap_or(0);
            out.put_pixel(x, y, Luma([value]));
        }
    }
    out
}

/// Inclusive source range covered by a kernel of `size` at `pos`.
fn kernel_span(pos: u32, size: u32, len: u32) -> (u32, u32) {
    let size = size.max(1);
    let before = size / 2;
    let after = size - 1 - before;
    (pos.saturating_sub(before), (pos + after).min(len - 1))
}

/// Gaussian sigma matching a square `block_size` neighbourhood.
pub fn gaussian_sigma_for_block(block_size: u32) -> f32 {
    0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Threshold each pixel against its Gaussian-weighted local mean minus
/// `offset`.
///
/// Pixels brighter than the local threshold become 255. With `invert` the
/// polarity flips, so dark strokes on a light page come out white.
pub fn adaptive_threshold_gaussian(
    gray: &GrayImage,
    block_size: u32,
    offset: f32,
    invert: bool,
) -> GrayImage {
    let block = if block_size % 2 == 0 { block_size + 1 } else { block_size };
    let local_mean = gaussian_blur_f32(gray, gaussian_sigma_for_block(block));

    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let mean = local_mean.get_pixel(x, y).0[0] as f32;
        let above = pixel.0[0] as f32 - mean > -offset;
        let on = above != invert;
        out.put_pixel(x, y, Luma([if on { 255 } else { 0 }]));
    }
    out
}

// -- Contours -----------------------------------------------------------------

/// Outermost borders of the foreground blobs in a binary image.
pub fn external_contours(binary: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| c.points)
        .collect()
}

pub fn to_points(contour: &[Point<i32>]) -> Vec<Point2> {
    contour
        .iter()
        .map(|p| Point2::new(p.x as f32, p.y as f32))
        .collect()
}

/// Area enclosed by a contour polygon.
pub fn contour_area(contour: &[Point<i32>]) -> f32 {
    polygon_area(&to_points(contour))
}

/// Smallest upright rectangle containing every contour point (inclusive).
pub fn bounding_rect(contour: &[Point<i32>]) -> PixelRect {
    let Some(first) = contour.first() else {
        return PixelRect::default();
    };
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in contour {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    PixelRect::new(
        x0.max(0) as u32,
        y0.max(0) as u32,
        (x1 - x0 + 1) as u32,
        (y1 - y0 + 1) as u32,
    )
}

/// Whether a closed polygon turns consistently in one direction.
pub fn is_convex(polygon: &[Point2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f32;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        let c = polygon[(i + 2) % n];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    sign != 0.0
}

// -- Statistics ---------------------------------------------------------------

/// Mean pixel intensity (0-255).
pub fn mean_intensity(gray: &GrayImage) -> f64 {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    sum as f64 / count as f64
}

/// Variance of the 4-neighbour Laplacian response, a sharpness measure.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    if gray.width() == 0 || gray.height() == 0 {
        return 0.0;
    }
    let response = laplacian_filter(gray);
    let n = (gray.width() as u64 * gray.height() as u64) as f64;

    let (mut sum, mut sum_sq) = (0.0f64, 0.0f64);
    for p in response.pixels() {
        let v = p.0[0] as f64;
        sum += v;
        sum_sq += v * v;
    }
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

/// Copy out a sub-rectangle (already clipped by the caller).
pub fn region(gray: &GrayImage, rect: PixelRect) -> GrayImage {
    image::imageops::crop_imm(gray, rect.x, rect.y, rect.width, rect.height).to_image()
}
