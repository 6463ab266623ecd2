// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan-line rasterization for the blank-scan sweep.
//
// Integer-only Bresenham stepping, generated lazily and never stored.

/// Bresenham walk from one integer endpoint to another, inclusive.
#[derive(Debug, Clone)]
pub struct ScanLine {
    x: i32,
    y: i32,
    end_x: i32,
    end_y: i32,
    dx: i32,
    dy: i32,
    sx: i32,
    sy: i32,
    err: i32,
    done: bool,
}

impl ScanLine {
    pub fn new(start: (i32, i32), end: (i32, i32)) -> Self {
        let dx = (end.0 - start.0).abs();
        let dy = -(end.1 - start.1).abs();
        Self {
            x: start.0,
            y: start.1,
            end_x: end.0,
            end_y: end.1,
            dx,
            dy,
            sx: if start.0 < end.0 { 1 } else { -1 },
            sy: if start.1 < end.1 { 1 } else { -1 },
            err: dx + dy,
            done: false,
        }
    }

    /// Only the pixels inside a `width x height` image.
    ///
    /// Both coordinates move monotonically along a Bresenham walk, so the
    /// in-bounds pixels form one contiguous run and the walk stops as soon as
    /// it leaves the image again.
    pub fn clipped(self, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
        let (w, h) = (width as i32, height as i32);
        let inside = move |&(x, y): &(i32, i32)| x >= 0 && y >= 0 && x < w && y < h;
        self.skip_while(move |p| !inside(p))
            .take_while(inside)
            .map(|(x, y)| (x as u32, y as u32))
    }
}

impl Iterator for ScanLine {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let point = (self.x, self.y);
        if self.x == self.end_x && self.y == self.end_y {
            self.done = true;
            return Some(point);
        }
        let e2 = 2 * self.err;
        if e2 >= self.dy {
            self.err += self.dy;
            self.x += self.sx;
        }
        if e2 <= self.dx {
            self.err += self.dx;
            self.y += self.sy;
        }
        Some(point)
    }
}

/// Parallel scan-lines running along `angle` degrees across a `width x height`
/// image, spaced `scan_step` pixels apart along the perpendicular.
///
/// Each line passes through `centre + offset * perpendicular` and extends one
/// diagonal either way, so every pixel of the image is covered at any angle.
/// Offsets far enough from the centre that the line cannot touch the image
/// are skipped.
pub fn parallel_scan_lines(
    width: u32,
    height: u32,
    angle: f64,
    scan_step: u32,
) -> impl Iterator<Item = ScanLine> {
    let (sin, cos) = angle.to_radians().sin_cos();
    let (perp_sin, perp_cos) = (angle + 90.0).to_radians().sin_cos();
    let diagonal = ((width as f64).powi(2) + (height as f64).powi(2)).sqrt() as i32;
    let (cx, cy) = ((width / 2) as f64, (height / 2) as f64);
    let reach = diagonal as f64 / 2.0 + 3.0;
    let step = scan_step.max(1) as usize;

    (-diagonal..diagonal)
        .step_by(step)
        .filter(move |&offset| (offset as f64).abs() <= reach)
        .map(move |offset| {
            let mid_x = cx + offset as f64 * perp_cos;
            let mid_y = cy + offset as f64 * perp_sin;
            let d = diagonal as f64;
            let start = ((mid_x - d * cos) as i32, (mid_y - d * sin) as i32);
            let end = ((mid_x + d * cos) as i32, (mid_y + d * sin) as i32);
            ScanLine::new(start, end)
        })
}
