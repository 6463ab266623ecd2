// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Principal-axis estimator — orientation of the dominant eigenvector of the
// edge-pixel covariance.

use image::GrayImage;
use imageproc::edges::canny;
use nalgebra::{Matrix2, SymmetricEigen};
use richtwerk_core::config::PcaConfig;
use richtwerk_core::error::Result;
use richtwerk_core::types::{AngleEstimate, EstimatorId, fold_quarter_turn};
use tracing::{debug, instrument, warn};

use crate::image::check_dimensions;

/// Estimate skew from the principal axis of the page's edge pixels.
///
/// Confidence is the share of variance explained by the first axis, so a
/// usable estimate always reports at least 0.5.
#[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
pub fn estimate_by_pca(gray: &GrayImage, config: &PcaConfig) -> Result<AngleEstimate> {
    check_dimensions(gray.width(), gray.height())?;

    let edges = canny(gray, config.canny_low, config.canny_high);
    let points: Vec<(f64, f64)> = edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] != 0)
        .map(|(x, y, _)| (x as f64, y as f64))
        .collect();

    if points.len() < config.min_points.max(2) {
        warn!(points = points.len(), "Too few edge points; abstaining");
        return Ok(AngleEstimate::abstain(EstimatorId::PrincipalAxis));
    }

    match principal_axis(&points) {
        Some((angle, ratio)) => {
            let folded = fold_quarter_turn(angle);
            debug!(points = points.len(), raw_angle = angle, angle = folded, ratio, "Principal axis found");
            Ok(AngleEstimate::new(EstimatorId::PrincipalAxis, folded, ratio))
        }
        None => {
            warn!("Degenerate point cloud; abstaining");
            Ok(AngleEstimate::abstain(EstimatorId::PrincipalAxis))
        }
    }
}

/// Direction of the first principal component (degrees, `atan2(dy, dx)`) and
/// its explained-variance ratio `λ1 / (λ1 + λ2)`.
pub fn principal_axis(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let n = points.len() as f64;
    if n < 2.0 {
        return None;
    }
    let (mx, my) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
    let (mx, my) = (mx / n, my / n);

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in points {
        let (dx, dy) = (x - mx, y - my);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    let cov = Matrix2::new(sxx, sxy, sxy, syy) / (n - 1.0);

    let eig = SymmetricEigen::new(cov);
    let (major, l1, l2) = if eig.eigenvalues[0] >= eig.eigenvalues[1] {
        (eig.eigenvectors.column(0), eig.eigenvalues[0], eig.eigenvalues[1])
    } else {
        (eig.eigenvectors.column(1), eig.eigenvalues[1], eig.eigenvalues[0])
    };
    let total = l1 + l2.max(0.0);
    if !(l1.is_finite() && total > 0.0) {
        return None;
    }

    let angle = major[1].atan2(major[0]).to_degrees();
    Some((angle, l1 / total))
}
