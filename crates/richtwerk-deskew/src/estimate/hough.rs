// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Progressive probabilistic Hough transform.
//
// `imageproc::hough` only detects infinite polar lines; deskewing wants finite
// segments with lengths, so edge points are visited in a seeded random order,
// vote into an angle/offset accumulator, and any cell that crosses the vote
// threshold is traced along the image into a segment. Points consumed by an
// accepted segment are withdrawn so they cannot seed a second, duplicate line.

use image::GrayImage;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use richtwerk_core::config::LineConfig;
use richtwerk_core::types::LineSegment;
use tracing::debug;

/// Fixed-point fraction bits used while tracing a line.
const SHIFT: u32 = 16;

/// Finest angular resolution the accumulator is built with.
const MIN_THETA_STEP_DEG: f64 = 0.05;

/// Accumulator over `(theta, rho)` with 1-pixel rho resolution.
struct Accumulator {
    cos: Vec<f64>,
    sin: Vec<f64>,
    num_rho: usize,
    votes: Vec<i32>,
}

impl Accumulator {
    fn new(width: u32, height: u32, theta_step_deg: f64) -> Self {
        let theta_step_deg = theta_step_deg.max(MIN_THETA_STEP_DEG);
        let num_angle = ((180.0 / theta_step_deg).round() as usize).max(1);
        let step = theta_step_deg.to_radians();
        let (sin, cos) = (0..num_angle).map(|n| (n as f64 * step).sin_cos()).unzip();
        let num_rho = ((width + height) * 2 + 1) as usize;
        Self {
            cos,
            sin,
            num_rho,
            votes: vec![0; num_angle * num_rho],
        }
    }

    fn rho_index(&self, n: usize, x: u32, y: u32) -> usize {
        let r = (x as f64 * self.cos[n] + y as f64 * self.sin[n]).round() as i64;
        (r + (self.num_rho as i64 - 1) / 2) as usize
    }

    /// Add one point's votes; returns the strongest cell it touched.
    fn vote(&mut self, x: u32, y: u32) -> (usize, i32) {
        let mut best = (0usize, i32::MIN);
        for n in 0..self.cos.len() {
            let idx = n * self.num_rho + self.rho_index(n, x, y);
            self.votes[idx] += 1;
            if self.votes[idx] > best.1 {
                best = (n, self.votes[idx]);
            }
        }
        best
    }

    fn unvote(&mut self, x: u32, y: u32) {
        for n in 0..self.cos.len() {
            let idx = n * self.num_rho + self.rho_index(n, x, y);
            self.votes[idx] -= 1;
        }
    }
}

/// Per-pixel state of the edge map while the transform runs.
#[derive(Clone, Copy, PartialEq, Eq)]
enum PointState {
    Empty,
    Pending,
    Voted,
}

/// Detect finite line segments in a binary edge map (non-zero = edge).
///
/// A non-finite or non-positive `theta_step_deg` finds nothing.
pub fn detect_segments(edges: &GrayImage, config: &LineConfig) -> Vec<LineSegment> {
    let (width, height) = edges.dimensions();
    if width == 0 || height == 0 || !(config.theta_step_deg.is_finite() && config.theta_step_deg > 0.0) {
        return Vec::new();
    }

    let mut state = vec![PointState::Empty; (width * height) as usize];
    let mut points = Vec::new();
    for (x, y, p) in edges.enumerate_pixels() {
        if p.0[0] != 0 {
            state[(y * width + x) as usize] = PointState::Pending;
            points.push((x, y));
        }
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    points.shuffle(&mut rng);

    let mut acc = Accumulator::new(width, height, config.theta_step_deg);
    let threshold = config.vote_threshold.max(1) as i32;
    let mut segments = Vec::new();

    for &(x, y) in &points {
        let idx = (y * width + x) as usize;
        if state[idx] != PointState::Pending {
            continue;
        }
        state[idx] = PointState::Voted;
        let (best_n, best_votes) = acc.vote(x, y);
        if best_votes < threshold {
            continue;
        }

        // Direction along the line for accumulator angle n is (-sin, cos).
        let a = -acc.sin[best_n];
        let b = acc.cos[best_n];
        let ends = trace(&state, width, height, (x, y), a, b, config.max_line_gap);

        let good = (ends[1].0 - ends[0].0).unsigned_abs() >= config.min_line_length
            || (ends[1].1 - ends[0].1).unsigned_abs() >= config.min_line_length;

        withdraw(&mut state, &mut acc, width, (x, y), a, b, ends, good);

        if good {
            segments.push(LineSegment::from_endpoints(ends[0].0, ends[0].1, ends[1].0, ends[1].1));
        }
    }

    debug!(edge_points = points.len(), segments = segments.len(), "Probabilistic Hough complete");
    segments
}

/// Fixed-point stepping setup: the major axis advances by one pixel, the
/// minor axis by a `SHIFT`-bit fraction.
struct Stepper {
    x_major: bool,
    start: (i64, i64),
    step: (i64, i64),
}

impl Stepper {
    fn new(origin: (u32, u32), a: f64, b: f64) -> Self {
        let (x0, y0) = (origin.0 as i64, origin.1 as i64);
        let one = (1i64 << SHIFT) as f64;
        let half = 1i64 << (SHIFT - 1);
        if a.abs() > b.abs() {
            let dx = if a > 0.0 { 1 } else { -1 };
            let dy = (b * one / a.abs()).round() as i64;
            Self { x_major: true, start: (x0, (y0 << SHIFT) + half), step: (dx, dy) }
        } else {
            let dy = if b > 0.0 { 1 } else { -1 };
            let dx = (a * one / b.abs()).round() as i64;
            Self { x_major: false, start: ((x0 << SHIFT) + half, y0), step: (dx, dy) }
        }
    }

    fn pixel(&self, (x, y): (i64, i64)) -> (i64, i64) {
        if self.x_major { (x, y >> SHIFT) } else { (x >> SHIFT, y) }
    }
}

/// Walk both ways from `origin`, bridging up to `max_gap` missing pixels, and
/// return the last edge pixel found in each direction.
fn trace(
    state: &[PointState],
    width: u32,
    height: u32,
    origin: (u32, u32),
    a: f64,
    b: f64,
    max_gap: u32,
) -> [(i32, i32); 2] {
    let stepper = Stepper::new(origin, a, b);
    let mut ends = [(origin.0 as i32, origin.1 as i32); 2];

    for (k, end) in ends.iter_mut().enumerate() {
        let (mut dx, mut dy) = stepper.step;
        if k > 0 {
            dx = -dx;
            dy = -dy;
        }
        let mut pos = stepper.start;
        let mut gap = 0u32;
        loop {
            let (px, py) = stepper.pixel(pos);
            if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                break;
            }
            if state[(py as u32 * width + px as u32) as usize] != PointState::Empty {
                gap = 0;
                *end = (px as i32, py as i32);
            } else {
                gap += 1;
                if gap > max_gap {
                    break;
                }
            }
            pos = (pos.0 + dx, pos.1 + dy);
        }
    }
    ends
}

/// Clear every point between the traced ends. For accepted segments, points
/// that already voted take their votes back.
#[allow(clippy::too_many_arguments)]
fn withdraw(
    state: &mut [PointState],
    acc: &mut Accumulator,
    width: u32,
    origin: (u32, u32),
    a: f64,
    b: f64,
    ends: [(i32, i32); 2],
    good: bool,
) {
    let stepper = Stepper::new(origin, a, b);
    for (k, end) in ends.iter().enumerate() {
        let (mut dx, mut dy) = stepper.step;
        if k > 0 {
            dx = -dx;
            dy = -dy;
        }
        let mut pos = stepper.start;
        loop {
            let (px, py) = stepper.pixel(pos);
            let idx = (py as u32 * width + px as u32) as usize;
            match state[idx] {
                PointState::Voted if good => {
                    acc.unvote(px as u32, py as u32);
                    state[idx] = PointState::Empty;
                }
                PointState::Voted | PointState::Pending => state[idx] = PointState::Empty,
                PointState::Empty => {}
            }
            if (px as i32, py as i32) == *end {
                break;
            }
            pos = (pos.0 + dx, pos.1 + dy);
        }
    }
}
