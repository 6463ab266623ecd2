// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text-region emphasizer — flattens letterforms into solid line-shaped blobs.
//
// Raw glyph edges point in every direction and drown the line transform.
// Fusing each text line into one dark blob leaves a single dominant
// orientation: the baseline.

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::drawing::draw_polygon_mut;
use imageproc::map::map_colors2;
use imageproc::morphology::{Mask, grayscale_dilate};
use imageproc::point::Point;
use richtwerk_core::config::EmphasizeConfig;
use richtwerk_core::error::Result;
use tracing::{debug, instrument};

use super::check_dimensions;
use super::threshold::adaptive_binarize_inverted;

/// Paint every sufficiently large text region solid black onto a copy of the
/// normalized page.
#[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
pub fn emphasize(gray: &GrayImage, config: &EmphasizeConfig) -> Result<GrayImage> {
    check_dimensions(gray.width(), gray.height())?;

    let mask = text_mask(gray, config);
    let mut result = gray.clone();
    for (dst, m) in result.pixels_mut().zip(mask.pixels()) {
        if m.0[0] == 255 {
            dst.0[0] = 0;
        }
    }
    Ok(result)
}

/// Binary mask (255 = text region) of the filled, area-filtered blobs.
pub fn text_mask(gray: &GrayImage, config: &EmphasizeConfig) -> GrayImage {
    let binary = adaptive_binarize_inverted(gray, config.block_radius, config.offset);

    let horizontal = grayscale_dilate(&binary, &rect_mask(config.horizontal_kernel));
    let vertical = grayscale_dilate(&binary, &rect_mask(config.vertical_kernel));
    let combined = map_colors2(&horizontal, &vertical, |h, v| Luma([h.0[0].max(v.0[0])]));
    let filled = grayscale_dilate(&combined, &rect_mask(config.fill_kernel));

    let contours = find_contours::<i32>(&filled);
    let mut mask = GrayImage::new(gray.width(), gray.height());
    let mut kept = 0usize;
    for contour in contours.iter().filter(|c| is_external(c)) {
        let area = polygon_area(&contour.points);
        if area <= config.min_area {
            continue;
        }
        if let Some(polygon) = closed_polygon(&contour.points) {
            draw_polygon_mut(&mut mask, &polygon, Luma([255u8]));
            kept += 1;
        }
    }

    debug!(contours = contours.len(), kept, min_area = config.min_area, "Text regions filled");
    mask
}

/// Solid `(width, height)` structuring element anchored at
/// `(width / 2, height / 2)`.
fn rect_mask((width, height): (u32, u32)) -> Mask {
    let (w, h) = (width.clamp(1, 511), height.clamp(1, 511));
    let solid = GrayImage::from_pixel(w, h, Luma([255u8]));
    Mask::from_image(&solid, (w / 2) as u8, (h / 2) as u8)
}

/// Outermost borders only; holes and anything nested inside are ignored.
pub(crate) fn is_external(contour: &Contour<i32>) -> bool {
    matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none()
}

/// Area enclosed by a contour polygon (shoelace formula).
pub(crate) fn polygon_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x as f64 * points[j].y as f64;
        area -= points[j].x as f64 * points[i].y as f64;
    }
    area.abs() / 2.0
}

/// `draw_polygon_mut` needs at least three points and rejects a polygon whose
/// last point repeats the first.
fn closed_polygon(points: &[Point<i32>]) -> Option<Vec<Point<i32>>> {
    let mut polygon = points.to_vec();
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    (polygon.len() >= 3).then_some(polygon)
}
