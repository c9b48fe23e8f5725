// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Planar geometry shared by detection, quality tracking and rectification:
// points, canonical 4-corner sets, corner ordering and edge measurements.

use serde::{Deserialize, Serialize};

/// A point in image pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Multiply both coordinates by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl From<(f32, f32)> for Point2 {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// Names of the four corners in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft = 0,
    TopRight = 1,
    BottomRight = 2,
    BottomLeft = 3,
}

/// Exactly four points, canonically ordered top-left, top-right,
/// bottom-right, bottom-left.
///
/// Construct through [`CornerSet::from_unordered`] unless the caller already
/// guarantees the canonical order (e.g. corners of an axis-aligned rectangle).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CornerSet(pub [Point2; 4]);

impl CornerSet {
    /// Wrap points that are already in TL, TR, BR, BL order.
    pub const fn new(points: [Point2; 4]) -> Self {
        Self(points)
    }

    /// Order arbitrary points with [`order_corners`].
    pub fn from_unordered(points: [Point2; 4]) -> Self {
        Self(order_corners(&points))
    }

    /// Corners of the axis-aligned rectangle `(left, top)`..`(right, bottom)`.
    pub fn from_rect(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self([
            Point2::new(left, top),
            Point2::new(right, top),
            Point2::new(right, bottom),
            Point2::new(left, bottom),
        ])
    }

    /// Parse the flat `x0,y0,..,x3,y3` layout used on the wire.
    pub fn from_flat(flat: &[f32; 8]) -> Self {
        Self([
            Point2::new(flat[0], flat[1]),
            Point2::new(flat[2], flat[3]),
            Point2::new(flat[4], flat[5]),
            Point2::new(flat[6], flat[7]),
        ])
    }

    pub fn to_flat(&self) -> [f32; 8] {
        let mut flat = [0.0; 8];
        for (i, p) in self.0.iter().enumerate() {
            flat[i * 2] = p.x;
            flat[i * 2 + 1] = p.y;
        }
        flat
    }

    pub fn points(&self) -> &[Point2; 4] {
        &self.0
    }

    pub fn corner(&self, which: Corner) -> Point2 {
        self.0[which as usize]
    }

    /// Uniformly scale every coordinate.
    pub fn scaled(&self, factor: f32) -> Self {
        Self(self.0.map(|p| p.scaled(factor)))
    }

    /// Length of the TL–TR edge.
    pub fn top_width(&self) -> f32 {
        edge_length(self, Corner::TopLeft, Corner::TopRight)
    }

    /// Length of the BL–BR edge.
    pub fn bottom_width(&self) -> f32 {
        edge_length(self, Corner::BottomLeft, Corner::BottomRight)
    }

    /// Length of the TL–BL edge.
    pub fn left_height(&self) -> f32 {
        edge_length(self, Corner::TopLeft, Corner::BottomLeft)
    }

    /// Length of the TR–BR edge.
    pub fn right_height(&self) -> f32 {
        edge_length(self, Corner::TopRight, Corner::BottomRight)
    }

    /// Enclosed area (shoelace formula).
    pub fn area(&self) -> f32 {
        polygon_area(&self.0)
    }

    /// Smallest distance between any two of the four corners.
    pub fn min_pairwise_distance(&self) -> f32 {
        let mut min = f32::MAX;
        for i in 0..4 {
            for j in (i + 1)..4 {
                min = min.min(self.0[i].distance(&self.0[j]));
            }
        }
        min
    }

    /// Axis-aligned bounding box as `(min_x, min_y, max_x, max_y)`.
    pub fn bounding_box(&self) -> (f32, f32, f32, f32) {
        self.0.iter().fold(
            (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        )
    }
}

/// Euclidean distance between two named corners.
pub fn edge_length(corners: &CornerSet, a: Corner, b: Corner) -> f32 {
    corners.corner(a).distance(&corners.corner(b))
}

/// Classify four points into TL/TR/BR/BL slots relative to their centroid.
///
/// Returns `None` when two points land in the same quadrant (collinear or
/// otherwise degenerate input). The first point seen keeps a contested slot.
pub fn try_order_corners(points: &[Point2; 4]) -> Option<[Point2; 4]> {
    let cx = points.iter().map(|p| p.x).sum::<f32>() * 0.25;
    let cy = points.iter().map(|p| p.y).sum::<f32>() * 0.25;

    let mut slots: [Option<Point2>; 4] = [None; 4];
    for p in points {
        let slot = if p.x < cx && p.y < cy {
            Corner::TopLeft
        } else if p.x >= cx && p.y < cy {
            Corner::TopRight
        } else if p.x >= cx && p.y >= cy {
            Corner::BottomRight
        } else {
            Corner::BottomLeft
        };

        let idx = slot as usize;
        if slots[idx].is_none() {
            slots[idx] = Some(*p);
        }
    }

    Some([slots[0]?, slots[1]?, slots[2]?, slots[3]?])
}

/// Order four points as TL, TR, BR, BL.
///
/// Falls back to the input sequence unchanged when the quadrant
/// classification is ambiguous; use [`try_order_corners`] to detect that case.
pub fn order_corners(points: &[Point2; 4]) -> [Point2; 4] {
    try_order_corners(points).unwrap_or(*points)
}

/// Area of a simple polygon given by its vertices in order (CW or CCW).
pub fn polygon_area(vertices: &[Point2]) -> f32 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0f32;
    for i in 0..n {
        let j = (i + 1) % n;
        area += vertices[i].x * vertices[j].y;
        area -= vertices[j].x * vertices[i].y;
    }
    area.abs() / 2.0
}
