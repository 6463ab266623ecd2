// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rotator — applies the final correction about the image centre.
//
// Positive angles rotate counter-clockwise as seen on screen, so passing an
// estimator's angle straight through levels the page. Resampling is
// imageproc's bicubic warp; pixels pulled in from outside the page either
// replicate the nearest edge or take a constant fill (white by default).

use image::{DynamicImage, GrayImage, ImageBuffer, Pixel};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into_with};
use richtwerk_core::config::{BorderMode, RotateConfig};
use tracing::{debug, instrument};

/// Edge-replicated margin around the source so the 4x4 bicubic window never
/// leaves the buffer for points on the page.
const PAD: u32 = 3;

/// Rotate a page by `angle` degrees (counter-clockwise positive).
///
/// Angles within `config.epsilon` of zero return an identical copy; exact
/// quarter turns are performed losslessly (±90° swaps the canvas dimensions).
/// 16-bit and float images are resampled as 8-bit RGBA.
#[instrument(skip(image, config), fields(width = image.width(), height = image.height()))]
pub fn rotate(image: &DynamicImage, angle: f64, config: &RotateConfig) -> DynamicImage {
    if is_identity(angle, config.epsilon) {
        debug!("Angle below epsilon; identity");
        return image.clone();
    }
    if let Some(turns) = quarter_turns(angle, config.epsilon) {
        debug!(turns, "Lossless quarter-turn rotation");
        return match turns {
            1 => image.rotate270(),
            2 => image.rotate180(),
            3 => image.rotate90(),
            _ => image.clone(),
        };
    }

    match image {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(rotate_buffer(buf, angle, config)),
        DynamicImage::ImageLumaA8(buf) => {
            DynamicImage::ImageLumaA8(rotate_buffer(buf, angle, config))
        }
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(rotate_buffer(buf, angle, config)),
        DynamicImage::ImageRgba8(buf) => {
            DynamicImage::ImageRgba8(rotate_buffer(buf, angle, config))
        }
        other => DynamicImage::ImageRgba8(rotate_buffer(&other.to_rgba8(), angle, config)),
    }
}

/// Rotate a page in place, returning whether any resampling happened.
///
/// Used by batch callers that write the corrected page back over the input.
pub fn rotate_in_place(image: &mut DynamicImage, angle: f64, config: &RotateConfig) -> bool {
    if is_identity(angle, config.epsilon) {
        return false;
    }
    *image = rotate(image, angle, config);
    true
}

/// Grayscale convenience wrapper around [`rotate`].
pub fn rotate_gray(gray: &GrayImage, angle: f64, config: &RotateConfig) -> GrayImage {
    if is_identity(angle, config.epsilon) {
        return gray.clone();
    }
    match rotate(&DynamicImage::ImageLuma8(gray.clone()), angle, config) {
        DynamicImage::ImageLuma8(out) => out,
        other => other.to_luma8(),
    }
}

fn is_identity(angle: f64, epsilon: f64) -> bool {
    !angle.is_finite() || angle.abs() < epsilon
}

/// Counter-clockwise quarter turns (1..=3) if `angle` is a whole multiple of 90°.
fn quarter_turns(angle: f64, epsilon: f64) -> Option<i64> {
    let turns = angle / 90.0;
    let nearest = turns.round();
    if ((turns - nearest) * 90.0).abs() < epsilon {
        Some((nearest as i64).rem_euclid(4))
    } else {
        None
    }
}

/// Output canvas for a rotation: unchanged, or grown to hold every corner.
fn output_size(width: u32, height: u32, angle: f64, expand: bool) -> (u32, u32) {
    if !expand {
        return (width, height);
    }
    let (sin, cos) = angle.to_radians().sin_cos();
    let (w, h) = (width as f64, height as f64);
    let new_w = (w * cos.abs() + h * sin.abs() - 1e-6).ceil().max(1.0);
    let new_h = (w * sin.abs() + h * cos.abs() - 1e-6).ceil().max(1.0);
    (new_w as u32, new_h as u32)
}

/// Source-to-output mapping: the page centre lands on the canvas centre,
/// turned counter-clockwise by `angle` degrees.
fn page_projection(src: (u32, u32), out: (u32, u32), angle: f64) -> Projection {
    let centre = |(w, h): (u32, u32)| ((w as f32 - 1.0) / 2.0, (h as f32 - 1.0) / 2.0);
    let (cx, cy) = centre(src);
    let (ocx, ocy) = centre(out);
    // `Projection::rotate` turns clockwise on screen.
    Projection::translate(ocx, ocy)
        * Projection::rotate(-angle.to_radians() as f32)
        * Projection::translate(-cx, -cy)
}

/// Copy of `src` with a `PAD`-pixel border repeating its edge pixels.
fn replicate_pad<P>(src: &ImageBuffer<P, Vec<u8>>) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = src.dimensions();
    ImageBuffer::from_fn(width + 2 * PAD, height + 2 * PAD, |x, y| {
        let sx = x.saturating_sub(PAD).min(width - 1);
        let sy = y.saturating_sub(PAD).min(height - 1);
        *src.get_pixel(sx, sy)
    })
}

/// Bicubic rotation of any 8-bit pixel buffer about its centre.
fn rotate_buffer<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    angle: f64,
    config: &RotateConfig,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Send + Sync,
{
    let (width, height) = src.dimensions();
    let (out_w, out_h) = output_size(width, height, angle, config.expand);
    let to_source = page_projection((width, height), (out_w, out_h), angle).invert();

    let fill_channels = vec![match config.border {
        BorderMode::Fill(v) => v,
        BorderMode::Replicate => 255,
    }; P::CHANNEL_COUNT as usize];
    let fill = *P::from_slice(&fill_channels);

    let (max_x, max_y) = (width as f32 - 0.5, height as f32 - 0.5);
    let pad = PAD as f32;
    let border = config.border;
    let mapping = move |x: f32, y: f32| {
        let (sx, sy) = to_source * (x, y);
        let on_page = (-0.5..=max_x).contains(&sx) && (-0.5..=max_y).contains(&sy);
        match border {
            BorderMode::Fill(_) if !on_page => (f32::NAN, f32::NAN),
            BorderMode::Fill(_) => (sx + pad, sy + pad),
            BorderMode::Replicate => (sx.clamp(-0.5, max_x) + pad, sy.clamp(-0.5, max_y) + pad),
        }
    };

    let padded = replicate_pad(src);
    let mut out = ImageBuffer::new(out_w, out_h);
    warp_into_with(&padded, mapping, Interpolation::Bicubic, fill, &mut out);
    out
}
