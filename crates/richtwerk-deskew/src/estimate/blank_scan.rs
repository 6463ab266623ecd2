// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Exhaustive blank-scan estimator.
//
// For every candidate angle, cast parallel scan-lines across the page and
// count the ones that cross no dark pixel at all. On ruled forms and text
// pages the gaps between lines only open up fully at the true skew, so the
// angle with the highest blank-line rate wins.
//
// The blank test is an absolute floor on the minimum pixel value along the
// line. The per-pixel white rate is collected for diagnostics only.

use image::GrayImage;
use richtwerk_core::config::BlankScanConfig;
use richtwerk_core::error::{Result, RichtwerkError};
use richtwerk_core::types::{AngleEstimate, AngleScanStats, EstimatorId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::candidate_angles;
use super::scanline::parallel_scan_lines;
use crate::image::check_dimensions;

/// Per-angle statistics from one sweep, in sweep order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlankScanReport {
    pub stats: Vec<AngleScanStats>,
}

impl BlankScanReport {
    /// The `top_n` angles by blank rate. Ties go to the smaller |angle|.
    pub fn ranked(&self, top_n: usize) -> Vec<AngleScanStats> {
        let mut ranked = self.stats.clone();
        ranked.sort_by(|a, b| {
            b.blank_rate
                .total_cmp(&a.blank_rate)
                .then_with(|| a.angle.abs().total_cmp(&b.angle.abs()))
                .then_with(|| a.angle.total_cmp(&b.angle))
        });
        ranked.truncate(top_n);
        ranked
    }

    /// The winning angle's statistics, if any scan-line touched the page.
    pub fn best(&self) -> Option<AngleScanStats> {
        self.ranked(1)
            .into_iter()
            .next()
            .filter(|s| s.scan_lines > 0)
    }

    /// Statistics recorded for the candidate closest to `angle`.
    pub fn at(&self, angle: f64) -> Option<&AngleScanStats> {
        self.stats
            .iter()
            .min_by(|a, b| (a.angle - angle).abs().total_cmp(&(b.angle - angle).abs()))
    }
}

/// Sweep `config.angle_start..=config.angle_end` and pick the angle with the
/// highest blank-line rate.
///
/// Confidence is how far the winner stands above the sweep average,
/// `(best - mean) / best`. A page with no blank scan-lines at any angle, or
/// one where every angle scores the same, abstains.
#[instrument(skip_all, fields(
    width = gray.width(),
    height = gray.height(),
    start = config.angle_start,
    end = config.angle_end,
    step = config.angle_step,
))]
pub fn estimate_by_blank_scan(
    gray: &GrayImage,
    config: &BlankScanConfig,
) -> Result<(AngleEstimate, BlankScanReport)> {
    check_dimensions(gray.width(), gray.height())?;
    if config.scan_step == 0 {
        return Err(RichtwerkError::InvalidInput("scan_step must be at least 1".into()));
    }

    let candidates = candidate_angles(config.angle_start, config.angle_end, config.angle_step);
    let report = BlankScanReport { stats: sweep(gray, &candidates, config) };

    let Some(best) = report.best() else {
        warn!("Blank scan produced no candidates; abstaining");
        return Ok((AngleEstimate::abstain(EstimatorId::BlankScan), report));
    };

    let mean = report.stats.iter().map(|s| s.blank_rate).sum::<f64>() / report.stats.len() as f64;
    let confidence = if best.blank_rate > 0.0 {
        ((best.blank_rate - mean) / best.blank_rate).clamp(0.0, 1.0)
    } else {
        0.0
    };

    if confidence == 0.0 {
        warn!(blank_rate = best.blank_rate, "No angle stands out; abstaining");
        return Ok((AngleEstimate::abstain(EstimatorId::BlankScan), report));
    }

    info!(
        angle = best.angle,
        blank_rate = best.blank_rate,
        confidence,
        candidates = report.stats.len(),
        "Blank scan complete"
    );
    Ok((AngleEstimate::new(EstimatorId::BlankScan, best.angle, confidence), report))
}

fn sweep(gray: &GrayImage, candidates: &[f64], config: &BlankScanConfig) -> Vec<AngleScanStats> {
    #[cfg(feature = "parallel")]
    {
        candidates.par_iter().map(|&angle| scan_at_angle(gray, angle, config)).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        candidates.iter().map(|&angle| scan_at_angle(gray, angle, config)).collect()
    }
}

/// Cast every scan-line at one angle and tally blank lines and white pixels.
pub fn scan_at_angle(gray: &GrayImage, angle: f64, config: &BlankScanConfig) -> AngleScanStats {
    let (width, height) = gray.dimensions();
    let mut stats = AngleScanStats {
        angle,
        scan_lines: 0,
        blank_lines: 0,
        blank_rate: 0.0,
        total_pixels: 0,
        white_pixels: 0,
        white_pixel_rate: 0.0,
    };

    for line in parallel_scan_lines(width, height, angle, config.scan_step) {
        let mut visited = 0usize;
        let mut white = 0usize;
        let mut min_value = u8::MAX;
        for (x, y) in line.clipped(width, height) {
            let value = gray.get_pixel(x, y).0[0];
            visited += 1;
            if value >= config.white_threshold {
                white += 1;
            }
            min_value = min_value.min(value);
        }
        if visited == 0 {
            continue;
        }
        stats.scan_lines += 1;
        stats.total_pixels += visited;
        stats.white_pixels += white;
        if min_value >= config.blank_floor {
            stats.blank_lines += 1;
        }
    }

    if stats.scan_lines > 0 {
        stats.blank_rate = stats.blank_lines as f64 / stats.scan_lines as f64;
    }
    if stats.total_pixels > 0 {
        stats.white_pixel_rate = stats.white_pixels as f64 / stats.total_pixels as f64;
    }
    debug!(angle, blank_rate = stats.blank_rate, scan_lines = stats.scan_lines, "Angle scanned");
    stats
}
