// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quadrilateral detector — finds the outline of a document or table in a
// camera frame and scores how plausible the outline is.

use docucap_core::config::DetectorConfig;
use docucap_core::geometry::{CornerSet, Point2, polygon_area};
use docucap_core::types::DetectionResult;
use image::GrayImage;
use image::imageops::{self, FilterType};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length, min_area_rect};
use imageproc::morphology::{close, dilate};
use imageproc::point::Point;
use tracing::{debug, instrument, trace};

use crate::image::primitives::{self, Contour};

/// Tile grid used by the equalisation step.
const CLAHE_GRID: u32 = 8;
/// Sigma equivalent to a 5x5 Gaussian kernel.
const EDGE_BLUR_SIGMA: f32 = 1.1;
/// Simplification tolerances tried per contour, in 2 % steps of the perimeter.
const EPSILON_STEPS: [f64; 5] = [0.02, 0.04, 0.06, 0.08, 0.10];

/// Locates the dominant convex quadrilateral in a frame.
///
/// The frame is downsampled to at most `target_width` pixels wide, turned into
/// a closed edge map, and its external contours are searched largest first.
/// Corners are reported in the coordinates of the frame passed to
/// [`QuadDetector::detect`].
#[derive(Debug, Clone, Default)]
pub struct QuadDetector {
    config: DetectorConfig,
}

impl QuadDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Override the Canny hysteresis thresholds.
    pub fn set_canny_thresholds(&mut self, low: f32, high: f32) {
        self.config.canny_low = low;
        self.config.canny_high = high;
    }

    /// Override the minimum contour share of the frame.
    pub fn set_min_area_ratio(&mut self, ratio: f32) {
        self.config.min_area_ratio = ratio;
    }

    /// Detect a document quadrilateral in a grayscale frame.
    #[instrument(skip(self, gray), fields(width = gray.width(), height = gray.height()))]
    pub fn detect(&self, gray: &GrayImage) -> DetectionResult {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return DetectionResult::miss();
        }

        let (work, scale) = self.downsample(gray);
        let edges = self.edge_map(&work);
        let candidates = self.candidate_contours(&edges);
        debug!(candidates = candidates.len(), scale, "Contours collected");

        let Some(quad) = find_quadrilateral(&candidates, self.config.min_fill_ratio) else {
            debug!("No document quadrilateral");
            return DetectionResult::miss();
        };

        let corners = CornerSet::from_unordered(quad.map(|p| p.scaled(1.0 / scale)));
        let confidence = corner_confidence(&corners, width, height);
        debug!(?corners, confidence, "Document quadrilateral found");
        DetectionResult::hit(corners, confidence)
    }

    /// Shrink wide frames to `target_width`, preserving aspect ratio.
    fn downsample(&self, gray: &GrayImage) -> (GrayImage, f32) {
        let (width, height) = gray.dimensions();
        let target = self.config.target_width;
        if width <= target {
            return (gray.clone(), 1.0);
        }
        let scale = target as f32 / width as f32;
        let new_height = ((height as f32 * scale).round() as u32).max(1);
        (
            imageops::resize(gray, target, new_height, FilterType::Triangle),
            scale,
        )
    }

    /// Equalise, smooth, find edges, then bridge small gaps.
    pub fn edge_map(&self, gray: &GrayImage) -> GrayImage {
        let equalised = primitives::clahe(gray, self.config.clahe_clip_limit, CLAHE_GRID);
        let blurred = gaussian_blur_f32(&equalised, EDGE_BLUR_SIGMA);
        let edges = canny(&blurred, self.config.canny_low, self.config.canny_high);
        let joined = dilate(&edges, Norm::LInf, 1);
        close(&joined, Norm::LInf, 2)
    }

    /// External contours large enough to be a document, largest first.
    fn candidate_contours(&self, edges: &GrayImage) -> Vec<(Contour, f32)> {
        let min_area =
            edges.width() as f32 * edges.height() as f32 * self.config.min_area_ratio;

        let mut candidates: Vec<(Contour, f32)> = primitives::external_contours(edges)
            .into_iter()
            .map(|c| {
                let area = primitives::contour_area(&c);
                (c, area)
            })
            .filter(|(_, area)| *area >= min_area)
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        candidates
    }
}

/// Two passes over the candidates: polygon simplification on every contour,
/// then the rotated-rectangle fallback.
fn find_quadrilateral(
    candidates: &[(Contour, f32)],
    min_fill_ratio: f32,
) -> Option<[Point2; 4]> {
    for (contour, _) in candidates {
        if let Some(quad) = simplify_to_quad(contour) {
            return Some(quad);
        }
    }
    for (contour, area) in candidates {
        if let Some(quad) = bounding_quad(contour, *area, min_fill_ratio) {
            trace!(area, "Using bounding-rectangle fallback");
            return Some(quad);
        }
    }
    None
}

/// Simplify with growing tolerance until a convex four-point polygon appears.
fn simplify_to_quad(contour: &[Point<i32>]) -> Option<[Point2; 4]> {
    if contour.len() < 4 {
        return None;
    }
    let perimeter = arc_length(contour, true);
    if perimeter <= 0.0 {
        return None;
    }

    for factor in EPSILON_STEPS {
        let approx = simplify_closed(contour, factor * perimeter);
        if approx.len() != 4 {
            continue;
        }
        let points = primitives::to_points(&approx);
        if primitives::is_convex(&points) {
            return Some([points[0], points[1], points[2], points[3]]);
        }
    }
    None
}

/// Douglas–Peucker on a closed curve.
///
/// The ring is started at its top-left-most point and split at the point
/// farthest from it, so both halves are simplified as open curves with
/// non-degenerate end chords.
fn simplify_closed(contour: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let n = contour.len();
    let Some(start) = (0..n).min_by_key(|&i| contour[i].x + contour[i].y) else {
        return Vec::new();
    };
    let ring: Vec<Point<i32>> = contour[start..]
        .iter()
        .chain(&contour[..start])
        .copied()
        .collect();

    let origin = ring[0];
    let far = (0..n)
        .max_by_key(|&i| {
            let dx = (ring[i].x - origin.x) as i64;
            let dy = (ring[i].y - origin.y) as i64;
            dx * dx + dy * dy
        })
        .unwrap_or(0);
    if far == 0 {
        return vec![origin];
    }

    let mut head = approximate_polygon_dp(&ring[..=far], epsilon, false);
    let mut tail = ring[far..].to_vec();
    tail.push(origin);
    let back = approximate_polygon_dp(&tail, epsilon, false);

    head.pop();
    head.extend(back);
    head.pop();
    head
}

/// Minimum-area rectangle around a contour, if the contour fills enough of it.
fn bounding_quad(
    contour: &[Point<i32>],
    contour_area: f32,
    min_fill_ratio: f32,
) -> Option<[Point2; 4]> {
    if contour.len() < 4 {
        return None;
    }
    let rect = min_area_rect(contour);
    let points = rect.map(|p| Point2::new(p.x as f32, p.y as f32));
    let rect_area = polygon_area(&points);
    if rect_area <= 0.0 {
        return None;
    }
    (contour_area / rect_area > min_fill_ratio).then_some(points)
}

/// Plausibility of a detected quadrilateral in a `width` x `height` frame.
///
/// `0.6 * area fit + 0.4 * corner separation`. Area fit peaks when the quad
/// covers half the frame; separation saturates once the closest corner pair is
/// a tenth of the frame's side length apart.
pub fn corner_confidence(corners: &CornerSet, width: u32, height: u32) -> f32 {
    let frame_area = width as f32 * height as f32;
    if frame_area <= 0.0 {
        return 0.0;
    }

    let ratio = corners.area() / frame_area;
    let min_expected = frame_area.sqrt() * 0.1;
    let separation = (corners.min_pairwise_distance() / min_expected).min(1.0);

    area_fit(ratio) * 0.6 + separation * 0.4
}

fn area_fit(ratio: f32) -> f32 {
    if (0.2..=0.8).contains(&ratio) {
        1.0 - (ratio - 0.5).abs()
    } else if ratio > 0.1 && ratio < 0.2 {
        0.5
    } else {
        0.0
    }
}
