// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sauvola local adaptive binarization.

use image::{GrayImage, Luma};
use tracing::{debug, instrument};

/// Parameters of the Sauvola threshold `mean * (1 + k * (stddev / r - 1))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SauvolaParams {
    /// Side of the square window; even values are bumped to the next odd one.
    pub window: u32,
    /// Sensitivity to local contrast.
    pub k: f64,
    /// Dynamic range of the standard deviation.
    pub dynamic_range: f64,
}

impl Default for SauvolaParams {
    fn default() -> Self {
        Self {
            window: 15,
            k: 0.2,
            dynamic_range: 128.0,
        }
    }
}

/// Summed-area tables of intensities and squared intensities.
///
/// Both tables are `(width + 1) x (height + 1)` with a zero top row and left
/// column, so any window sum is four lookups.
#[derive(Debug, Clone)]
pub struct IntegralTables {
    width: u32,
    height: u32,
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
}

impl IntegralTables {
    pub fn new(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        let stride = (width + 1) as usize;
        let len = stride * (height + 1) as usize;
        let mut sum = vec![0u64; len];
        let mut sq_sum = vec![0u64; len];

        for y in 0..height {
            let mut row_sum: u64 = 0;
            let mut row_sq: u64 = 0;
            for x in 0..width {
                let v = gray.get_pixel(x, y).0[0] as u64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) as usize * stride + (x + 1) as usize;
                let above = y as usize * stride + (x + 1) as usize;
                sum[idx] = row_sum + sum[above];
                sq_sum[idx] = row_sq + sq_sum[above];
            }
        }

        Self {
            width,
            height,
            sum,
            sq_sum,
        }
    }

    /// Mean and standard deviation over the `window` x `window` square
    /// centred on `(cx, cy)`, clipped to the image.
    pub fn window_stats(&self, cx: u32, cy: u32, window: u32) -> (f64, f64) {
        let half = window / 2;
        let stride = (self.width + 1) as usize;

        let x1 = cx.saturating_sub(half) as usize;
        let y1 = cy.saturating_sub(half) as usize;
        let x2 = ((cx + half + 1) as usize).min(self.width as usize);
        let y2 = ((cy + half + 1) as usize).min(self.height as usize);

        let area = ((x2 - x1) * (y2 - y1)) as f64;
        if area == 0.0 {
            return (0.0, 0.0);
        }

        let rect = |table: &[u64]| {
            (table[y2 * stride + x2] + table[y1 * stride + x1]) as f64
                - table[y1 * stride + x2] as f64
                - table[y2 * stride + x1] as f64
        };

        let mean = rect(&self.sum) / area;
        let variance = rect(&self.sq_sum) / area - mean * mean;
        (mean, variance.max(0.0).sqrt())
    }
}

/// Binarize with Sauvola's local threshold.
///
/// Pixels strictly brighter than their local threshold become 255, others 0.
/// Windows near the border shrink to the part inside the image rather than
/// being padded.
#[instrument(skip(gray), fields(width = gray.width(), height = gray.height()))]
pub fn sauvola_binarize(gray: &GrayImage, params: SauvolaParams) -> GrayImage {
    let window = if params.window % 2 == 0 {
        params.window + 1
    } else {
        params.window
    };
    let tables = IntegralTables::new(gray);
    let (width, height) = gray.dimensions();

    let output = GrayImage::from_fn(width, height, |x, y| {
        let (mean, stddev) = tables.window_stats(x, y, window);
        let threshold = mean * (1.0 + params.k * (stddev / params.dynamic_range - 1.0));
        let value = gray.get_pixel(x, y).0[0] as f64;
        Luma([if value > threshold { 255 } else { 0 }])
    });

    debug!(window, k = params.k, "Sauvola binarization complete");
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_image_gives_uniform_output() {
        for level in [0u8, 40, 128, 255] {
            let img = GrayImage::from_pixel(37, 23, Luma([level]));
            let out = sauvola_binarize(&img, SauvolaParams::default());
            let first = out.get_pixel(0, 0).0[0];
            assert!(out.pixels().all(|p| p.0[0] == first), "level {level}");
        }
    }

    #[test]
    fn uniform_nonzero_image_is_background() {
        // stddev 0 puts the threshold at 0.8 * mean, below every pixel.
        let img = GrayImage::from_pixel(20, 20, Luma([128u8]));
        let out = sauvola_binarize(&img, SauvolaParams::default());
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn dark_text_on_light_page_is_foreground() {
        let mut img = GrayImage::from_pixel(60, 40, Luma([210u8]));
        for x in 10..50 {
            for y in 18..21 {
                img.put_pixel(x, y, Luma([30u8]));
            }
        }
        let out = sauvola_binarize(&img, SauvolaParams::default());
        assert_eq!(out.get_pixel(30, 19).0[0], 0);
        assert_eq!(out.get_pixel(30, 5).0[0], 255);
    }

    #[test]
    fn even_window_matches_next_odd() {
        let img = GrayImage::from_fn(30, 30, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]));
        let even = sauvola_binarize(
            &img,
            SauvolaParams {
                window: 14,
                ..SauvolaParams::default()
            },
        );
        let odd = sauvola_binarize(&img, SauvolaParams::default());
        assert_eq!(even, odd);
    }

    #[test]
    fn window_stats_clip_at_corner() {
        let img = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 5 { 0 } else { 100 }]));
        let tables = IntegralTables::new(&img);
        // Window 5 at the origin covers 3x3 pixels, all zero.
        assert_eq!(tables.window_stats(0, 0, 5), (0.0, 0.0));
        // At (4, 4) it spans x in 2..=6: three zeros and two hundreds per row.
        let (mean, stddev) = tables.window_stats(4, 4, 5);
        assert!((mean - 40.0).abs() < 1e-9);
        assert!((stddev - (2400.0f64).sqrt()).abs() < 1e-6);
    }
}
