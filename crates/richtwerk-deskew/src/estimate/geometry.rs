// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry estimator — tilt of the minimum-area rectangle around the largest
// foreground body on the page.

use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::point::Point;
use richtwerk_core::config::GeometryConfig;
use richtwerk_core::error::Result;
use richtwerk_core::types::{AngleEstimate, EstimatorId, fold_quarter_turn};
use tracing::{debug, instrument, warn};

use crate::image::check_dimensions;
use crate::image::emphasize::{is_external, polygon_area};
use crate::image::threshold::binarize_with_policy;

/// A rotated rectangle: centre, side lengths, and the direction of its
/// `width` side in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinAreaRect {
    pub center: (f64, f64),
    pub width: f64,
    pub height: f64,
    pub angle: f64,
}

impl MinAreaRect {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Estimate skew from the largest external contour's bounding rectangle.
///
/// Confidence is the contour's share of the image area.
#[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
pub fn estimate_by_geometry(gray: &GrayImage, config: &GeometryConfig) -> Result<AngleEstimate> {
    check_dimensions(gray.width(), gray.height())?;

    let Some(binary) = binarize_with_policy(gray, config.threshold, config.min_contrast) else {
        warn!("No ink on the page; abstaining");
        return Ok(AngleEstimate::abstain(EstimatorId::Geometry));
    };
    let contours = find_contours::<i32>(&binary);

    let largest = contours
        .iter()
        .filter(|c| is_external(c) && c.points.len() >= config.min_contour_points)
        .map(|c| (polygon_area(&c.points), c))
        .max_by(|a, b| a.0.total_cmp(&b.0));

    let Some((area, contour)) = largest else {
        warn!("No foreground contour found; abstaining");
        return Ok(AngleEstimate::abstain(EstimatorId::Geometry));
    };
    let Some(rect) = min_area_rect(&contour.points) else {
        return Ok(AngleEstimate::abstain(EstimatorId::Geometry));
    };

    let angle = fold_quarter_turn(rect.angle);
    let image_area = gray.width() as f64 * gray.height() as f64;
    let confidence = (area / image_area).clamp(0.0, 1.0);

    debug!(area, rect_angle = rect.angle, angle, confidence, "Minimum-area rectangle fitted");
    Ok(AngleEstimate::new(EstimatorId::Geometry, angle, confidence))
}

/// Minimum-area enclosing rectangle via rotating calipers over the convex hull.
///
/// Returns `None` for an empty point set.
pub fn min_area_rect(points: &[Point<i32>]) -> Option<MinAreaRect> {
    let hull = convex_hull(points);
    match hull.len() {
        0 => return None,
        1 => {
            let (x, y) = hull[0];
            return Some(MinAreaRect { center: (x, y), width: 0.0, height: 0.0, angle: 0.0 });
        }
        _ => {}
    }

    let mut best: Option<MinAreaRect> = None;
    for i in 0..hull.len() {
        let (x0, y0) = hull[i];
        let (x1, y1) = hull[(i + 1) % hull.len()];
        let (ex, ey) = (x1 - x0, y1 - y0);
        let len = (ex * ex + ey * ey).sqrt();
        if len == 0.0 {
            continue;
        }
        let (ux, uy) = (ex / len, ey / len);

        // Project every hull point onto the edge direction and its normal.
        let (mut min_u, mut max_u, mut min_v, mut max_v) =
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
        for &(px, py) in &hull {
            let u = px * ux + py * uy;
            let v = -px * uy + py * ux;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }

        let (cu, cv) = ((min_u + max_u) / 2.0, (min_v + max_v) / 2.0);
        let candidate = MinAreaRect {
            center: (cu * ux - cv * uy, cu * uy + cv * ux),
            width: max_u - min_u,
            height: max_v - min_v,
            angle: uy.atan2(ux).to_degrees(),
        };
        if best.is_none_or(|b| candidate.area() < b.area()) {
            best = Some(candidate);
        }
    }
    best
}

/// Andrew's monotone chain; collinear points are dropped.
fn convex_hull(points: &[Point<i32>]) -> Vec<(f64, f64)> {
    let mut pts: Vec<(i64, i64)> = points.iter().map(|p| (p.x as i64, p.y as i64)).collect();
    pts.sort_unstable();
    pts.dedup();
    if pts.len() < 3 {
        return pts.into_iter().map(|(x, y)| (x as f64, y as f64)).collect();
    }

    let cross = |o: (i64, i64), a: (i64, i64), b: (i64, i64)| {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };

    let mut hull: Vec<(i64, i64)> = Vec::with_capacity(pts.len() * 2);
    for &p in pts.iter().chain(pts.iter().rev().skip(1)) {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull.into_iter().map(|(x, y)| (x as f64, y as f64)).collect()
}
