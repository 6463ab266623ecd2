// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image normalizer — turns an arbitrary scan into the canonical grayscale
// buffer every estimator starts from.
//
// Order matters: denoise while colour is still available, collapse to luma,
// equalize contrast per tile to flatten uneven scanner lighting, then sharpen
// the strokes the equalization softened.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use richtwerk_core::config::NormalizeConfig;
use richtwerk_core::error::Result;
use tracing::{debug, instrument};

use super::check_dimensions;

/// Produce the normalized grayscale page.
///
/// Fails only on an empty image.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn normalize(image: &DynamicImage, config: &NormalizeConfig) -> Result<GrayImage> {
    check_dimensions(image.width(), image.height())?;

    let gray = denoise_to_gray(image, config.denoise_radius);
    let equalized = equalize_tiles(&gray, config.clahe_tiles, config.clahe_clip_limit);
    let sharpened = unsharp_mask(&equalized, config.unsharp_sigma, config.unsharp_amount);

    debug!("Normalization complete");
    Ok(sharpened)
}

/// Median-denoise (edge preserving, keeps thin strokes) and convert to luma.
fn denoise_to_gray(image: &DynamicImage, radius: u32) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) if radius > 0 => median_filter(gray, radius, radius),
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        _ if radius > 0 => {
            let rgb = median_filter(&image.to_rgb8(), radius, radius);
            DynamicImage::ImageRgb8(rgb).to_luma8()
        }
        _ => image.to_luma8(),
    }
}

/// Contrast-limited adaptive histogram equalization over a `tiles x tiles`
/// grid, bilinearly blending neighbouring tile mappings.
pub fn equalize_tiles(gray: &GrayImage, tiles: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let tiles = tiles.max(1);
    let tile_w = width.div_ceil(tiles.min(width));
    let tile_h = height.div_ceil(tiles.min(height));
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            luts.push(tile_lut(gray, (x0, y0, x1, y1), clip_limit));
        }
    }

    let lut_at = |tx: i64, ty: i64| -> &[u8; 256] {
        let tx = tx.clamp(0, tiles_x as i64 - 1) as u32;
        let ty = ty.clamp(0, tiles_y as i64 - 1) as u32;
        &luts[(ty * tiles_x + tx) as usize]
    };

    GrayImage::from_fn(width, height, |x, y| {
        let v = gray.get_pixel(x, y).0[0] as usize;

        let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let tx0 = fx.floor();
        let ty0 = fy.floor();
        let ax = fx - tx0;
        let ay = fy - ty0;
        let (tx0, ty0) = (tx0 as i64, ty0 as i64);

        let top = lut_at(tx0, ty0)[v] as f32 * (1.0 - ax) + lut_at(tx0 + 1, ty0)[v] as f32 * ax;
        let bottom =
            lut_at(tx0, ty0 + 1)[v] as f32 * (1.0 - ax) + lut_at(tx0 + 1, ty0 + 1)[v] as f32 * ax;
        let blended = top * (1.0 - ay) + bottom * ay;
        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Clipped-histogram equalization mapping for one tile `(x0, y0, x1, y1)`.
fn tile_lut(gray: &GrayImage, (x0, y0, x1, y1): (u32, u32, u32, u32), clip_limit: f32) -> [u8; 256] {
    let mut histogram = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            histogram[gray.get_pixel(x, y).0[0] as usize] += 1;
        }
    }
    let area = (x1 - x0) * (y1 - y0);

    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in histogram.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }
        let share = excess / 256;
        let residual = (excess % 256) as usize;
        for bin in histogram.iter_mut() {
            *bin += share;
        }
        if residual > 0 {
            let stride = (256 / residual).max(1);
            for i in (0..256).step_by(stride).take(residual) {
                histogram[i] += 1;
            }
        }
    }

    let mut lut = [0u8; 256];
    let scale = 255.0 / area.max(1) as f32;
    let mut cdf = 0u32;
    for (i, &count) in histogram.iter().enumerate() {
        cdf += count;
        lut[i] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// `orig * amount - blur * (amount - 1)`, clipped to the valid range.
pub fn unsharp_mask(gray: &GrayImage, sigma: f32, amount: f32) -> GrayImage {
    if sigma <= 0.0 || amount == 1.0 {
        return gray.clone();
    }
    let blurred = gaussian_blur_f32(gray, sigma);
    let mut out = gray.clone();
    for (dst, blur) in out.pixels_mut().zip(blurred.pixels()) {
        let orig = dst.0[0] as f32;
        let value = orig * amount - blur.0[0] as f32 * (amount - 1.0);
        dst.0[0] = value.round().clamp(0.0, 255.0) as u8;
    }
    out
}
