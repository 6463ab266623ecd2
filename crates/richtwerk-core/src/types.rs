// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Richtwerk deskew engine.
//
// Angles are in degrees, measured in image coordinates (x right, y down) as
// `atan2(dy, dx)`: a positive angle means the baseline descends to the right.
// Rotating a page by its estimated angle (counter-clockwise positive) levels it.

use serde::{Deserialize, Serialize};

/// Identifies which strategy produced an [`AngleEstimate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EstimatorId {
    /// Edge detection + probabilistic line transform over emphasized text blobs.
    Lines,
    /// Minimum-area rectangle around the largest foreground contour.
    Geometry,
    /// Horizontal projection variance over a small angle window.
    Projection,
    /// Principal axis of the edge-pixel point cloud.
    PrincipalAxis,
    /// Exhaustive blank scan-line sweep.
    BlankScan,
    /// Any caller-supplied estimator (e.g. a trained orientation classifier).
    External(String),
}

impl EstimatorId {
    /// Short, stable name used in logs and reports.
    pub fn name(&self) -> &str {
        match self {
            Self::Lines => "lines",
            Self::Geometry => "geometry",
            Self::Projection => "projection",
            Self::PrincipalAxis => "principal-axis",
            Self::BlankScan => "blank-scan",
            Self::External(name) => name.as_str(),
        }
    }
}

impl std::fmt::Display for EstimatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One estimator's vote: an angle and how much it trusts it.
///
/// Confidence is always within `[0, 1]`. A confidence of zero is an abstention
/// ("no usable signal"), never a claim that the page is level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleEstimate {
    /// Skew angle in degrees.
    pub angle: f64,
    /// Self-reported reliability in `[0, 1]`.
    pub confidence: f64,
    /// Which estimator produced this estimate.
    pub estimator: EstimatorId,
}

impl AngleEstimate {
    /// Build an estimate, clamping confidence into `[0, 1]`.
    ///
    /// Non-finite angles or confidences collapse into an abstention.
    pub fn new(estimator: EstimatorId, angle: f64, confidence: f64) -> Self {
        if !angle.is_finite() || !confidence.is_finite() {
            return Self::abstain(estimator);
        }
        Self {
            angle,
            confidence: confidence.clamp(0.0, 1.0),
            estimator,
        }
    }

    /// The "no information" estimate: angle 0, confidence 0.
    pub fn abstain(estimator: EstimatorId) -> Self {
        Self {
            angle: 0.0,
            confidence: 0.0,
            estimator,
        }
    }

    /// Whether this estimate carries no weight.
    pub fn is_abstention(&self) -> bool {
        self.confidence <= 0.0
    }
}

/// A detected straight segment, endpoints in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    /// Signed angle from horizontal in degrees, folded into (-45, 45].
    pub angle: f64,
    /// Euclidean length in pixels.
    pub length: f64,
}

impl LineSegment {
    /// Build a segment from its endpoints, deriving angle and length.
    pub fn from_endpoints(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        let dx = (x2 - x1) as f64;
        let dy = (y2 - y1) as f64;
        Self {
            x1,
            y1,
            x2,
            y2,
            angle: fold_quarter_turn(dy.atan2(dx).to_degrees()),
            length: (dx * dx + dy * dy).sqrt(),
        }
    }
}

/// Orientation class of a [`BlankRegion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlankRegionKind {
    Horizontal,
    Vertical,
    Angled,
}

/// A scan-line that crossed no dark content, clipped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlankRegion {
    pub kind: BlankRegionKind,
    /// First in-bounds pixel of the scan-line.
    pub start: (i32, i32),
    /// Last in-bounds pixel of the scan-line.
    pub end: (i32, i32),
    /// Number of in-bounds pixels the scan-line visited.
    pub length: usize,
}

/// Blank-scan statistics for one candidate angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleScanStats {
    pub angle: f64,
    /// Scan-lines that touched the image at all.
    pub scan_lines: usize,
    /// Scan-lines whose minimum pixel value reached the blank floor.
    pub blank_lines: usize,
    /// `blank_lines / scan_lines`, the statistic used to pick the angle.
    pub blank_rate: f64,
    pub total_pixels: usize,
    pub white_pixels: usize,
    /// Diagnostic only; never used for angle selection.
    pub white_pixel_rate: f64,
}

/// Fold any angle into `(-45, 45]` by whole quarter turns.
///
/// Text baselines and their perpendicular rules carry the same skew, so an
/// estimator that cannot tell them apart reports the quarter-turn residue.
pub fn fold_quarter_turn(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let folded = (angle + 45.0).rem_euclid(90.0) - 45.0;
    if folded <= -45.0 { folded + 90.0 } else { folded }
}
