// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edge/line estimator — Canny edges, probabilistic Hough segments, and a
// length-weighted vote over segment angles.

use std::collections::HashMap;

use image::GrayImage;
use imageproc::edges::canny;
use richtwerk_core::config::{LineAggregation, LineConfig};
use richtwerk_core::error::Result;
use richtwerk_core::types::{AngleEstimate, EstimatorId, LineSegment};
use tracing::{debug, instrument, warn};

use super::hough::detect_segments;
use crate::image::check_dimensions;

/// Estimate skew from the line segments of an emphasized page.
///
/// Returns the estimate together with the segments that voted (longest
/// first), so callers can draw them. No surviving segment is an abstention.
#[instrument(skip_all, fields(width = emphasized.width(), height = emphasized.height()))]
pub fn estimate_by_lines(
    emphasized: &GrayImage,
    config: &LineConfig,
) -> Result<(AngleEstimate, Vec<LineSegment>)> {
    check_dimensions(emphasized.width(), emphasized.height())?;
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !positive(config.theta_step_deg) || !positive(config.bucket_resolution) {
        warn!(theta_step = config.theta_step_deg, bucket = config.bucket_resolution, "Unusable line sweep settings; abstaining");
        return Ok((AngleEstimate::abstain(EstimatorId::Lines), Vec::new()));
    }

    let edges = canny(emphasized, config.canny_low, config.canny_high);
    let detected = detect_segments(&edges, config);
    let kept = select_segments(detected, config);

    if kept.is_empty() {
        warn!("No line segments survived filtering; abstaining");
        return Ok((AngleEstimate::abstain(EstimatorId::Lines), kept));
    }

    let angle = match config.aggregation {
        LineAggregation::LengthWeightedMode => length_weighted_mode(&kept, config.bucket_resolution),
        LineAggregation::Median => median_angle(&kept),
    };
    let confidence = (1.0 - angular_std(&kept) / 45.0).max(0.0);

    debug!(segments = kept.len(), angle, confidence, "Line vote complete");
    Ok((AngleEstimate::new(EstimatorId::Lines, angle, confidence), kept))
}

/// Length floor, optional angle window, then the longest `top_n`.
fn select_segments(mut segments: Vec<LineSegment>, config: &LineConfig) -> Vec<LineSegment> {
    segments.retain(|s| s.length >= config.min_segment_length);
    if let Some(window) = config.angle_window {
        segments.retain(|s| s.angle.abs() <= window);
    }
    segments.sort_by(|a, b| b.length.total_cmp(&a.length));
    segments.truncate(config.top_n);
    segments
}

/// The bucket whose segments have the largest summed length. Ties go to the
/// bucket nearest zero, then to the negative side.
fn length_weighted_mode(segments: &[LineSegment], resolution: f64) -> f64 {
    let mut buckets: HashMap<i64, f64> = HashMap::new();
    for s in segments {
        let key = (s.angle / resolution).round() as i64;
        *buckets.entry(key).or_default() += s.length;
    }
    buckets
        .into_iter()
        .max_by(|(ka, wa), (kb, wb)| {
            wa.total_cmp(wb)
                .then_with(|| kb.abs().cmp(&ka.abs()))
                .then_with(|| kb.cmp(ka))
        })
        .map(|(key, _)| key as f64 * resolution)
        .unwrap_or(0.0)
}

fn median_angle(segments: &[LineSegment]) -> f64 {
    let mut angles: Vec<f64> = segments.iter().map(|s| s.angle).collect();
    angles.sort_by(f64::total_cmp);
    let mid = angles.len() / 2;
    match angles.len() {
        0 => 0.0,
        n if n % 2 == 1 => angles[mid],
        _ => (angles[mid - 1] + angles[mid]) / 2.0,
    }
}

/// Population standard deviation of the kept segment angles.
fn angular_std(segments: &[LineSegment]) -> f64 {
    let n = segments.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = segments.iter().map(|s| s.angle).sum::<f64>() / n;
    let variance = segments.iter().map(|s| (s.angle - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
