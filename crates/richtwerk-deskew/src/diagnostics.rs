// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QA helpers — blank-region extraction and overlays for eyeballing what the
// estimators saw. Nothing here feeds back into the angle decision.

use std::path::Path;

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use richtwerk_core::config::BlankScanConfig;
use richtwerk_core::error::{Result, RichtwerkError};
use richtwerk_core::types::{BlankRegion, BlankRegionKind, LineSegment};
use tracing::debug;

use crate::estimate::scanline::parallel_scan_lines;

const SEGMENT_COLOUR: Rgb<u8> = Rgb([255, 0, 0]);
const BLANK_COLOUR: Rgb<u8> = Rgb([0, 200, 0]);

/// Tolerance for classifying a scan direction as horizontal or vertical.
const AXIS_TOLERANCE_DEG: f64 = 1e-6;

/// Every blank scan-line at `angle`, in sweep order.
///
/// Uses the same scan geometry and blank floor as the blank-scan estimator,
/// so the regions drawn for an angle are exactly the lines it counted.
pub fn blank_regions(gray: &GrayImage, angle: f64, config: &BlankScanConfig) -> Vec<BlankRegion> {
    let (width, height) = gray.dimensions();
    let kind = region_kind(angle);
    let mut regions = Vec::new();

    for line in parallel_scan_lines(width, height, angle, config.scan_step) {
        let mut first = None;
        let mut last = (0u32, 0u32);
        let mut length = 0usize;
        let mut blank = true;
        for (x, y) in line.clipped(width, height) {
            if gray.get_pixel(x, y).0[0] < config.blank_floor {
                blank = false;
                break;
            }
            first.get_or_insert((x, y));
            last = (x, y);
            length += 1;
        }
        if let (true, Some(start)) = (blank, first) {
            regions.push(BlankRegion {
                kind,
                start: (start.0 as i32, start.1 as i32),
                end: (last.0 as i32, last.1 as i32),
                length,
            });
        }
    }

    debug!(angle, regions = regions.len(), "Blank regions extracted");
    regions
}

fn region_kind(angle: f64) -> BlankRegionKind {
    let residue = angle.rem_euclid(180.0);
    if residue < AXIS_TOLERANCE_DEG || 180.0 - residue < AXIS_TOLERANCE_DEG {
        BlankRegionKind::Horizontal
    } else if (residue - 90.0).abs() < AXIS_TOLERANCE_DEG {
        BlankRegionKind::Vertical
    } else {
        BlankRegionKind::Angled
    }
}

/// RGB copy of the page with each segment drawn in red.
pub fn draw_segments(image: &DynamicImage, segments: &[LineSegment]) -> RgbImage {
    let mut canvas = image.to_rgb8();
    for s in segments {
        draw_line_segment_mut(
            &mut canvas,
            (s.x1 as f32, s.y1 as f32),
            (s.x2 as f32, s.y2 as f32),
            SEGMENT_COLOUR,
        );
    }
    canvas
}

/// RGB copy of the page with each blank region drawn in green.
pub fn draw_blank_regions(image: &DynamicImage, regions: &[BlankRegion]) -> RgbImage {
    let mut canvas = image.to_rgb8();
    for r in regions {
        draw_line_segment_mut(
            &mut canvas,
            (r.start.0 as f32, r.start.1 as f32),
            (r.end.0 as f32, r.end.1 as f32),
            BLANK_COLOUR,
        );
    }
    canvas
}

/// Write an overlay to disk; the format follows the file extension.
pub fn save_overlay(overlay: &RgbImage, path: impl AsRef<Path>) -> Result<()> {
    overlay
        .save(path.as_ref())
        .map_err(|e| RichtwerkError::ImageError(format!("{}: {e}", path.as_ref().display())))
}
