// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binarization helpers — global Otsu, fixed, and locally adaptive thresholds.
//
// Every binarizer here is inverted: dark ink becomes foreground (255) and
// paper becomes background (0), which is what contour tracing, projections
// and dilation all expect.

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::filter::gaussian_blur_f32;
use imageproc::map::map_colors2;
use richtwerk_core::config::ThresholdPolicy;
use tracing::debug;

const FOREGROUND: u8 = 255;
const BACKGROUND: u8 = 0;

/// Otsu level separating ink from paper, or `None` when the two classes'
/// mean intensities lie closer than `min_contrast` gray levels.
///
/// Flat pages, including the few-level ripple contrast equalization leaves
/// on blank paper, have no ink to separate.
pub fn ink_level(gray: &GrayImage, min_contrast: f64) -> Option<u8> {
    let level = otsu_level(gray);
    let (mut dark_sum, mut dark_n, mut light_sum, mut light_n) = (0u64, 0u64, 0u64, 0u64);
    for p in gray.pixels() {
        let v = p.0[0] as u64;
        if p.0[0] <= level {
            dark_sum += v;
            dark_n += 1;
        } else {
            light_sum += v;
            light_n += 1;
        }
    }
    if dark_n == 0 || light_n == 0 {
        return None;
    }
    let separation = light_sum as f64 / light_n as f64 - dark_sum as f64 / dark_n as f64;
    debug!(level, separation, min_contrast, "Otsu split");
    (separation >= min_contrast).then_some(level)
}

/// Resolve a policy to a concrete level for this image. A fixed level is
/// taken as given; Otsu yields `None` on a page without ink.
pub fn resolve_level(gray: &GrayImage, policy: ThresholdPolicy, min_contrast: f64) -> Option<u8> {
    match policy {
        ThresholdPolicy::Otsu => ink_level(gray, min_contrast),
        ThresholdPolicy::Fixed(level) => Some(level),
    }
}

/// Global inverted binarization: pixels at or below `level` become foreground.
pub fn binarize_inverted(gray: &GrayImage, level: u8) -> GrayImage {
    let mut output = gray.clone();
    for pixel in output.pixels_mut() {
        pixel.0[0] = if pixel.0[0] <= level { FOREGROUND } else { BACKGROUND };
    }
    output
}

/// Inverted binarization under a threshold policy, `None` when there is no
/// ink to separate.
pub fn binarize_with_policy(
    gray: &GrayImage,
    policy: ThresholdPolicy,
    min_contrast: f64,
) -> Option<GrayImage> {
    let level = resolve_level(gray, policy, min_contrast)?;
    debug!(level, ?policy, "Global threshold resolved");
    Some(binarize_inverted(gray, level))
}

/// Locally adaptive inverted binarization.
///
/// The local threshold is a Gaussian-weighted mean over a
/// `(2 * block_radius + 1)`-wide neighbourhood minus `offset`; pixels at or
/// below it become foreground.
pub fn adaptive_binarize_inverted(gray: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    // Sigma a Gaussian window of this size gets when none is given.
    let sigma = 0.3 * (block_radius as f32 - 1.0) + 0.8;
    let local_mean = gaussian_blur_f32(gray, sigma.max(0.3));
    map_colors2(gray, &local_mean, |p, m| {
        let threshold = m.0[0] as i32 - offset;
        Luma([if (p.0[0] as i32) <= threshold { FOREGROUND } else { BACKGROUND }])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bimodal() -> GrayImage {
        GrayImage::from_fn(40, 40, |x, _| if x < 20 { Luma([30u8]) } else { Luma([220u8]) })
    }

    #[test]
    fn ink_level_splits_bimodal_page() {
        let level = ink_level(&bimodal(), 24.0).unwrap();
        assert!((30..220).contains(&level), "level {level} should split the modes");
    }

    #[test]
    fn flat_page_has_no_ink() {
        let white = GrayImage::from_pixel(10, 10, Luma([255u8]));
        assert_eq!(ink_level(&white, 24.0), None);
        let black = GrayImage::from_pixel(10, 10, Luma([0u8]));
        assert_eq!(ink_level(&black, 24.0), None);
    }

    #[test]
    fn low_ripple_is_not_ink() {
        // Three neighbouring levels, like equalized blank paper.
        let ripple = GrayImage::from_fn(30, 30, |x, y| Luma([249 + ((x + y) % 3) as u8]));
        assert_eq!(ink_level(&ripple, 24.0), None);
        assert!(ink_level(&ripple, 1.0).is_some());
        assert!(binarize_with_policy(&ripple, ThresholdPolicy::Otsu, 24.0).is_none());
    }

    #[test]
    fn binarize_inverted_marks_dark_as_foreground() {
        let binary = binarize_with_policy(&bimodal(), ThresholdPolicy::Otsu, 24.0).unwrap();
        assert_eq!(binary.get_pixel(5, 5).0[0], 255);
        assert_eq!(binary.get_pixel(35, 5).0[0], 0);
    }

    #[test]
    fn fixed_policy_ignores_histogram() {
        let binary = binarize_with_policy(&bimodal(), ThresholdPolicy::Fixed(10), 24.0).unwrap();
        assert!(binary.pixels().all(|p| p.0[0] == 0));
        let flat = GrayImage::from_pixel(8, 8, Luma([200u8]));
        assert!(binarize_with_policy(&flat, ThresholdPolicy::Fixed(220), 24.0).is_some());
    }

    #[test]
    fn adaptive_keeps_flat_paper_as_background() {
        let paper = GrayImage::from_pixel(30, 30, Luma([240u8]));
        let binary = adaptive_binarize_inverted(&paper, 5, 2);
        assert!(binary.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn adaptive_picks_out_dark_stroke() {
        let mut page = GrayImage::from_pixel(30, 30, Luma([240u8]));
        for x in 5..25 {
            page.put_pixel(x, 15, Luma([20u8]));
        }
        let binary = adaptive_binarize_inverted(&page, 5, 2);
        assert_eq!(binary.get_pixel(15, 15).0[0], 255);
        assert_eq!(binary.get_pixel(15, 5).0[0], 0);
    }
}
