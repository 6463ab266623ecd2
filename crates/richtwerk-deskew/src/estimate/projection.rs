// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Projection-variance estimator.
//
// Level text lines give sharply peaked row sums; a tilted page smears ink
// across neighbouring rows. The candidate rotation with the most peaked
// horizontal projection wins.

use image::imageops::{FilterType, resize};
use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use richtwerk_core::config::ProjectionConfig;
use richtwerk_core::error::Result;
use richtwerk_core::types::{AngleEstimate, EstimatorId};
use tracing::{debug, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::candidate_angles;
use crate::image::check_dimensions;
use crate::image::threshold::binarize_with_policy;

/// Estimate skew by maximizing horizontal projection variance over
/// `±config.window` degrees.
#[instrument(skip_all, fields(width = gray.width(), height = gray.height(), window = config.window))]
pub fn estimate_by_projection(gray: &GrayImage, config: &ProjectionConfig) -> Result<AngleEstimate> {
    check_dimensions(gray.width(), gray.height())?;

    let candidates = candidate_angles(-config.window, config.window, config.step);
    if candidates.is_empty() {
        warn!("Projection window yields no candidate angles; abstaining");
        return Ok(AngleEstimate::abstain(EstimatorId::Projection));
    }

    let Some(binary) = binarize_with_policy(gray, config.threshold, config.min_contrast) else {
        warn!("No ink on the page; abstaining");
        return Ok(AngleEstimate::abstain(EstimatorId::Projection));
    };
    let small = downsample(&binary, config.downsample);

    let scores = score_angles(&small, &candidates);
    let mean = scores.iter().map(|(_, v)| v).sum::<f64>() / scores.len() as f64;
    let best = scores.iter().copied().max_by(|(aa, va), (ab, vb)| {
        va.total_cmp(vb).then_with(|| ab.abs().total_cmp(&aa.abs()))
    });

    match best {
        Some((angle, max_variance)) if mean > 0.0 => {
            let confidence = ((max_variance - mean) / mean).clamp(0.0, 1.0);
            debug!(angle, max_variance, mean, confidence, "Projection peak found");
            Ok(AngleEstimate::new(EstimatorId::Projection, angle, confidence))
        }
        _ => {
            warn!("Flat projection at every angle; abstaining");
            Ok(AngleEstimate::abstain(EstimatorId::Projection))
        }
    }
}

/// Projection variance for each candidate angle.
pub fn score_angles(binary: &GrayImage, candidates: &[f64]) -> Vec<(f64, f64)> {
    #[cfg(feature = "parallel")]
    {
        candidates
            .par_iter()
            .map(|&angle| (angle, projection_variance(binary, angle)))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        candidates
            .iter()
            .map(|&angle| (angle, projection_variance(binary, angle)))
            .collect()
    }
}

/// Rotate the binary page counter-clockwise by `angle` and return the
/// variance of its row sums.
pub fn projection_variance(binary: &GrayImage, angle: f64) -> f64 {
    let rotated;
    let view = if angle == 0.0 {
        binary
    } else {
        // imageproc rotates clockwise for positive theta.
        rotated = rotate_about_center(
            binary,
            (-angle).to_radians() as f32,
            Interpolation::Bilinear,
            Luma([0u8]),
        );
        &rotated
    };
    variance(&row_sums(view))
}

fn row_sums(binary: &GrayImage) -> Vec<f64> {
    binary
        .rows()
        .map(|row| row.map(|p| p.0[0] as f64 / 255.0).sum())
        .collect()
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

fn downsample(binary: &GrayImage, factor: f64) -> GrayImage {
    if !(factor > 0.0 && factor < 1.0) {
        return binary.clone();
    }
    let width = ((binary.width() as f64 * factor).round() as u32).max(1);
    let height = ((binary.height() as f64 * factor).round() as u32).max(1);
    resize(binary, width, height, FilterType::Triangle)
}
