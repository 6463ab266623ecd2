// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// richtwerk-deskew — Skew estimation and correction for scanned pages.
//
// Provides the normalizer and text-region emphasizer, five independent skew
// estimators (line voting, minimum-area rectangle, projection variance,
// principal axis, exhaustive blank scan), confidence-weighted fusion, and a
// bicubic rotator. `Deskewer` wires them together.

pub mod deskewer;
pub mod diagnostics;
pub mod estimate;
pub mod fusion;
pub mod image;

// Re-export the primary entry points so callers can use `richtwerk_deskew::Deskewer` etc.
pub use deskewer::{DeskewReport, Deskewer};
pub use estimate::{
    AngleEstimator, BlankScanEstimator, BlankScanReport, FnEstimator, GeometryEstimator,
    InputView, LineEstimator, PrincipalAxisEstimator, ProjectionEstimator, estimate_by_blank_scan,
    estimate_by_geometry, estimate_by_lines, estimate_by_pca, estimate_by_projection,
};
pub use fusion::{Decision, SkipReason, decide, decide_single, fuse};
pub use self::image::{emphasize, normalize, rotate, rotate_in_place};
