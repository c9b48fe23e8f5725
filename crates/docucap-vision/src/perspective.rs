// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trapezoid geometry and perspective rectification.
//
// Skew metrics describe how far a detected quadrilateral departs from a
// rectangle. They size the rectified output and let a fixed on-screen guide
// box stand in for a fresh detection when the enhance stage runs.

use docucap_core::error::{CaptureError, Result};
use docucap_core::geometry::{CornerSet, Point2};
use docucap_core::types::{FrameAnalysisResult, GuideRect, TrapezoidMetrics};
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, info, instrument};

/// Skew above which a quadrilateral is treated as a trapezoid.
pub const TRAPEZOID_SKEW_THRESHOLD: f32 = 0.05;
/// Skew above which the virtual trapezoid adjusts an edge.
const GUIDE_SKEW_THRESHOLD: f32 = 0.01;
/// Smallest side of an estimated output image.
pub const MIN_OUTPUT_SIDE: u32 = 100;

/// `|a - b| / avg(a, b)`, or 0 when both are 0.
fn relative_difference(a: f32, b: f32) -> f32 {
    let avg = (a + b) / 2.0;
    if avg > 0.0 { (a - b).abs() / avg } else { 0.0 }
}

pub fn is_trapezoid_skew(skew_ratio: f32) -> bool {
    skew_ratio > TRAPEZOID_SKEW_THRESHOLD
}

/// Edge lengths and skews of an ordered corner set.
pub fn measure_trapezoid(corners: &CornerSet) -> TrapezoidMetrics {
    let top_width = corners.top_width();
    let bottom_width = corners.bottom_width();
    let left_height = corners.left_height();
    let right_height = corners.right_height();

    let vertical_skew = relative_difference(top_width, bottom_width);
    let horizontal_skew = relative_difference(left_height, right_height);
    let skew_ratio = vertical_skew.max(horizontal_skew);

    TrapezoidMetrics {
        top_width,
        bottom_width,
        left_height,
        right_height,
        vertical_skew,
        horizontal_skew,
        skew_ratio,
        is_trapezoid: is_trapezoid_skew(skew_ratio),
    }
}

/// Output size for rectifying `corners`: mean width by mean height,
/// truncated, never below 100x100.
pub fn estimate_output_size(corners: &CornerSet) -> (u32, u32) {
    let width = (corners.top_width() + corners.bottom_width()) / 2.0;
    let height = (corners.left_height() + corners.right_height()) / 2.0;
    (
        (width as u32).max(MIN_OUTPUT_SIDE),
        (height as u32).max(MIN_OUTPUT_SIDE),
    )
}

/// Source quadrilateral implied by a rectangular guide overlay.
///
/// Starts from the guide's corners. Only when `last` found a table and
/// flagged it trapezoidal, the narrower of top/bottom is pulled inward by
/// `guide_width * |(bottom - top) / avg| / 2` per side, and the shorter of
/// left/right likewise by the guide height.
pub fn virtual_trapezoid(guide: &GuideRect, last: &FrameAnalysisResult) -> CornerSet {
    let mut corners = guide.corners();
    let metrics = &last.trapezoid;
    if !(last.table_found && metrics.is_trapezoid) {
        return corners;
    }

    let [tl, tr, br, bl] = &mut corners.0;

    if metrics.vertical_skew > GUIDE_SKEW_THRESHOLD {
        let avg = (metrics.top_width + metrics.bottom_width) / 2.0;
        if avg > 0.0 {
            let skew = (metrics.bottom_width - metrics.top_width) / avg;
            let adjust = guide.width() * skew.abs() / 2.0;
            if metrics.bottom_width > metrics.top_width {
                tl.x += adjust;
                tr.x -= adjust;
            } else {
                bl.x += adjust;
                br.x -= adjust;
            }
        }
    }

    if metrics.horizontal_skew > GUIDE_SKEW_THRESHOLD {
        let avg = (metrics.left_height + metrics.right_height) / 2.0;
        if avg > 0.0 {
            let skew = (metrics.right_height - metrics.left_height) / avg;
            let adjust = guide.height() * skew.abs() / 2.0;
            if metrics.right_height > metrics.left_height {
                tl.y += adjust;
                bl.y -= adjust;
            } else {
                tr.y += adjust;
                br.y -= adjust;
            }
        }
    }

    corners
}

/// Warps a quadrilateral region to an upright rectangle.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerspectiveCorrector;

impl PerspectiveCorrector {
    pub fn new() -> Self {
        Self
    }

    /// Rectify the region bounded by `corners`.
    ///
    /// Exactly four corners are required; they are re-ordered before use.
    /// `requested` wins over the estimated size when given. Areas of the output
    /// that map outside the source are black.
    #[instrument(skip(self, image, corners), fields(width = image.width(), height = image.height()))]
    pub fn correct(
        &self,
        image: &RgbImage,
        corners: &[Point2],
        requested: Option<(u32, u32)>,
    ) -> Result<RgbImage> {
        let points: [Point2; 4] = corners.try_into().map_err(|_| {
            CaptureError::Rectification(format!("expected 4 corners, got {}", corners.len()))
        })?;
        let ordered = CornerSet::from_unordered(points);

        let (out_w, out_h) = requested.unwrap_or_else(|| estimate_output_size(&ordered));
        if out_w == 0 || out_h == 0 {
            return Err(CaptureError::Rectification(format!(
                "invalid output size {out_w}x{out_h}"
            )));
        }
        debug!(?ordered, out_w, out_h, "Rectification target computed");

        let right = out_w.saturating_sub(1) as f32;
        let bottom = out_h.saturating_sub(1) as f32;
        let src = ordered.0.map(|p| (p.x, p.y));
        let dst = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];

        let projection = Projection::from_control_points(src, dst).ok_or_else(|| {
            CaptureError::Rectification("corners do not define a valid homography".into())
        })?;

        let mut output = RgbImage::new(out_w, out_h);
        warp_into(
            image,
            &projection,
            Interpolation::Bilinear,
            Rgb([0, 0, 0]),
            &mut output,
        );

        info!(out_w, out_h, "Perspective correction applied");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trapezoid(top: f32, bottom: f32, height: f32) -> CornerSet {
        let cx = 200.0;
        CornerSet::new([
            Point2::new(cx - top / 2.0, 0.0),
            Point2::new(cx + top / 2.0, 0.0),
            Point2::new(cx + bottom / 2.0, height),
            Point2::new(cx - bottom / 2.0, height),
        ])
    }

    fn analysis_with(metrics: TrapezoidMetrics, table_found: bool) -> FrameAnalysisResult {
        FrameAnalysisResult {
            table_found,
            trapezoid: metrics,
            ..FrameAnalysisResult::default()
        }
    }

    #[test]
    fn rectangle_has_no_skew() {
        let m = measure_trapezoid(&CornerSet::from_rect(0.0, 0.0, 300.0, 200.0));
        assert_eq!(m.vertical_skew, 0.0);
        assert_eq!(m.horizontal_skew, 0.0);
        assert!(!m.is_trapezoid);
    }

    #[test]
    fn skew_is_scale_invariant() {
        let base = trapezoid(180.0, 220.0, 150.0);
        let a = measure_trapezoid(&base);
        let b = measure_trapezoid(&base.scaled(3.5));
        assert!((a.vertical_skew - b.vertical_skew).abs() < 1e-5);
        assert!((a.horizontal_skew - b.horizontal_skew).abs() < 1e-5);
        assert!((a.vertical_skew - 0.2).abs() < 1e-5);
    }

    #[test]
    fn trapezoid_threshold_is_strict() {
        assert!(!is_trapezoid_skew(0.0499));
        assert!(!is_trapezoid_skew(0.05));
        assert!(is_trapezoid_skew(0.0501));
    }

    #[test]
    fn degenerate_edges_give_zero_skew() {
        let point = Point2::new(5.0, 5.0);
        let m = measure_trapezoid(&CornerSet::new([point; 4]));
        assert_eq!(m.skew_ratio, 0.0);
        assert!(!m.is_trapezoid);
    }

    #[test]
    fn output_size_averages_and_clamps() {
        assert_eq!(
            estimate_output_size(&trapezoid(180.0, 220.0, 150.0)),
            (200, 151)
        );
        assert_eq!(
            estimate_output_size(&CornerSet::from_rect(0.0, 0.0, 40.0, 30.0)),
            (100, 100)
        );
    }

    #[test]
    fn virtual_trapezoid_without_table_is_the_guide() {
        let guide = GuideRect::new(50.0, 60.0, 350.0, 460.0);
        let metrics = measure_trapezoid(&trapezoid(100.0, 300.0, 200.0));
        assert!(metrics.is_trapezoid);

        let no_table = analysis_with(metrics, false);
        assert_eq!(virtual_trapezoid(&guide, &no_table), guide.corners());

        let flat = analysis_with(measure_trapezoid(&CornerSet::from_rect(0.0, 0.0, 10.0, 10.0)), true);
        assert_eq!(virtual_trapezoid(&guide, &flat), guide.corners());
    }

    #[test]
    fn virtual_trapezoid_narrows_top_when_bottom_is_wider() {
        let guide = GuideRect::new(0.0, 0.0, 400.0, 300.0);
        // top 180, bottom 220: skew 0.2, adjustment 400 * 0.2 / 2 = 40.
        let last = analysis_with(measure_trapezoid(&trapezoid(180.0, 220.0, 150.0)), true);
        let v = virtual_trapezoid(&guide, &last);
        assert!((v.0[0].x - 40.0).abs() < 1e-3);
        assert!((v.0[1].x - 360.0).abs() < 1e-3);
        assert_eq!(v.0[2], Point2::new(400.0, 300.0));
        assert_eq!(v.0[3], Point2::new(0.0, 300.0));
    }

    #[test]
    fn virtual_trapezoid_shrinks_shorter_side() {
        let guide = GuideRect::new(0.0, 0.0, 400.0, 200.0);
        let metrics = TrapezoidMetrics {
            top_width: 300.0,
            bottom_width: 300.0,
            left_height: 220.0,
            right_height: 180.0,
            vertical_skew: 0.0,
            horizontal_skew: 0.2,
            skew_ratio: 0.2,
            is_trapezoid: true,
        };
        // Left is taller, so the right edge shrinks by 200 * 0.2 / 2 = 20.
        let v = virtual_trapezoid(&guide, &analysis_with(metrics, true));
        assert_eq!(v.0[0], Point2::new(0.0, 0.0));
        assert!((v.0[1].y - 20.0).abs() < 1e-3);
        assert!((v.0[2].y - 180.0).abs() < 1e-3);
        assert_eq!(v.0[3], Point2::new(0.0, 200.0));
    }

    #[test]
    fn correct_uses_requested_size() {
        let img = RgbImage::from_pixel(200, 150, Rgb([200, 200, 200]));
        let corners = CornerSet::from_rect(10.0, 10.0, 190.0, 140.0);
        let out = PerspectiveCorrector::new()
            .correct(&img, corners.points(), Some((320, 240)))
            .unwrap();
        assert_eq!(out.dimensions(), (320, 240));
        assert_eq!(out.get_pixel(160, 120), &Rgb([200, 200, 200]));
    }

    #[test]
    fn correct_estimates_size_when_not_requested() {
        let img = RgbImage::new(400, 300);
        let corners = trapezoid(180.0, 220.0, 150.0);
        let out = PerspectiveCorrector::new()
            .correct(&img, corners.points(), None)
            .unwrap();
        // Slanted sides are ~151.3 px long.
        assert_eq!(out.dimensions(), (200, 151));
    }

    #[test]
    fn correct_rejects_wrong_corner_count() {
        let img = RgbImage::new(50, 50);
        let three = [Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), Point2::new(10.0, 10.0)];
        let err = PerspectiveCorrector::new().correct(&img, &three, None).unwrap_err();
        assert_eq!(err.kind(), "rectification");
    }
}
