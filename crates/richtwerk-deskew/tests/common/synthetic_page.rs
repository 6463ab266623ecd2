// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic pages with a known skew for integration tests.

#![allow(dead_code)]

use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use rand::Rng;

pub const PAPER: u8 = 245;
pub const INK: u8 = 15;

/// A `width x height` page of dark text-line bars whose baselines run at
/// `angle` degrees (positive descends to the right). The block is drawn
/// directly at the angle, so the skew is exact rather than resampled.
pub fn text_page(width: u32, height: u32, angle: f64) -> GrayImage {
    let mut page = GrayImage::from_pixel(width, height, Luma([PAPER]));
    let pitch = 40.0;
    let lines = ((height as f64 * 0.6) / pitch).floor().max(1.0) as i32;
    let bars = Bars { angle, lines, pitch, half_len: width as f64 * 0.375, half_thickness: 5.0 };
    bars.draw(&mut page, INK);
    page
}

/// A block of parallel bars centred on the page.
struct Bars {
    angle: f64,
    lines: i32,
    pitch: f64,
    half_len: f64,
    half_thickness: f64,
}

impl Bars {
    fn draw(&self, page: &mut GrayImage, ink: u8) {
        let (s, c) = self.angle.to_radians().sin_cos();
        let (cx, cy) = (page.width() as f64 / 2.0, page.height() as f64 / 2.0);
        for i in 0..self.lines {
            let v0 = (i as f64 - (self.lines - 1) as f64 / 2.0) * self.pitch;
            let corner = |u: f64, v: f64| {
                let v = v0 + v;
                Point::new((cx + u * c - v * s).round() as i32, (cy + u * s + v * c).round() as i32)
            };
            let (l, t) = (self.half_len, self.half_thickness);
            let poly = [corner(-l, -t), corner(l, -t), corner(l, t), corner(-l, t)];
            draw_polygon_mut(page, &poly, Luma([ink]));
        }
    }
}

/// The standard 480x360 test page.
pub fn standard_page(angle: f64) -> GrayImage {
    text_page(480, 360, angle)
}

/// A small random page: uniform, noise, a few bars, or a lone dot.
pub fn random_page<R: Rng>(rng: &mut R) -> GrayImage {
    let width = rng.gen_range(1..=24);
    let height = rng.gen_range(1..=24);
    match rng.gen_range(0..4) {
        0 => GrayImage::from_pixel(width, height, Luma([rng.gen_range(0..=255)])),
        1 => GrayImage::from_fn(width, height, |_, _| Luma([rng.gen_range(0..=255)])),
        2 => {
            let mut page = GrayImage::from_pixel(width, height, Luma([PAPER]));
            for _ in 0..rng.gen_range(1..4) {
                let y = rng.gen_range(0..height);
                let x0 = rng.gen_range(0..width);
                let x1 = rng.gen_range(x0..width);
                let drop = rng.gen_range(-2i32..=2);
                for x in x0..=x1 {
                    let t = (x - x0) as f64 / (x1 - x0 + 1) as f64;
                    let yy = (y as i32 + (t * drop as f64).round() as i32).clamp(0, height as i32 - 1);
                    page.put_pixel(x, yy as u32, Luma([INK]));
                }
            }
            page
        }
        _ => {
            let mut page = GrayImage::from_pixel(width, height, Luma([255]));
            let (x, y) = (rng.gen_range(0..width), rng.gen_range(0..height));
            page.put_pixel(x, y, Luma([0]));
            page
        }
    }
}

/// A scan-sized page (64 to 300 px a side): bars at a random angle, random
/// paper and ink levels, and additive noise. Some pages carry no bars.
pub fn random_text_page<R: Rng>(rng: &mut R) -> GrayImage {
    let width = rng.gen_range(64..=300);
    let height = rng.gen_range(64..=300);
    let mut page = GrayImage::from_pixel(width, height, Luma([rng.gen_range(170..=255)]));

    let pitch = rng.gen_range(12.0..40.0);
    let max_lines = ((height as f64 * 0.8 / pitch) as i32).max(1);
    let bars = Bars {
        angle: rng.gen_range(-60.0..60.0),
        lines: rng.gen_range(0..=max_lines),
        pitch,
        half_len: width as f64 * rng.gen_range(0.2..0.5),
        half_thickness: rng.gen_range(1.0..pitch / 4.0),
    };
    bars.draw(&mut page, rng.gen_range(0..=120));

    let noise = rng.gen_range(0..=40i32);
    if noise > 0 {
        for p in page.pixels_mut() {
            p.0[0] = (p.0[0] as i32 + rng.gen_range(-noise..=noise)).clamp(0, 255) as u8;
        }
    }
    page
}
