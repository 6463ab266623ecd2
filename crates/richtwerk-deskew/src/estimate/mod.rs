// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Skew estimators and the common interface fusion iterates over.
//
// Every estimator is a pure function of a borrowed grayscale page. Missing
// evidence is an abstention (angle 0, confidence 0), never an error; only an
// empty image or a meaningless request fails.

pub mod blank_scan;
pub mod geometry;
pub mod hough;
pub mod lines;
pub mod pca;
pub mod projection;
pub mod scanline;

pub use blank_scan::{BlankScanReport, estimate_by_blank_scan};
pub use geometry::estimate_by_geometry;
pub use lines::estimate_by_lines;
pub use pca::estimate_by_pca;
pub use projection::estimate_by_projection;

use image::GrayImage;
use richtwerk_core::config::{
    BlankScanConfig, DeskewConfig, EmphasizeConfig, GeometryConfig, LineConfig, PcaConfig,
    ProjectionConfig,
};
use richtwerk_core::error::Result;
use richtwerk_core::types::{AngleEstimate, EstimatorId};
use tracing::warn;

use crate::image::emphasize;

/// Which rendition of the page an estimator wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputView {
    /// Denoised, equalized and sharpened grayscale.
    Normalized,
    /// Plain luma of the input, with paper at its scanned brightness.
    Grayscale,
}

/// A skew estimation strategy.
pub trait AngleEstimator: Send + Sync {
    fn id(&self) -> EstimatorId;

    fn estimate(&self, gray: &GrayImage) -> Result<AngleEstimate>;

    /// The page rendition [`estimate`](Self::estimate) expects.
    fn input_view(&self) -> InputView {
        InputView::Normalized
    }
}

/// Emphasize text regions, then vote over line segments.
#[derive(Debug, Clone, Default)]
pub struct LineEstimator {
    pub emphasize: EmphasizeConfig,
    pub lines: LineConfig,
}

impl AngleEstimator for LineEstimator {
    fn id(&self) -> EstimatorId {
        EstimatorId::Lines
    }

    fn estimate(&self, gray: &GrayImage) -> Result<AngleEstimate> {
        let emphasized = emphasize(gray, &self.emphasize)?;
        estimate_by_lines(&emphasized, &self.lines).map(|(estimate, _)| estimate)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeometryEstimator(pub GeometryConfig);

impl AngleEstimator for GeometryEstimator {
    fn id(&self) -> EstimatorId {
        EstimatorId::Geometry
    }

    fn estimate(&self, gray: &GrayImage) -> Result<AngleEstimate> {
        estimate_by_geometry(gray, &self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectionEstimator(pub ProjectionConfig);

impl AngleEstimator for ProjectionEstimator {
    fn id(&self) -> EstimatorId {
        EstimatorId::Projection
    }

    fn estimate(&self, gray: &GrayImage) -> Result<AngleEstimate> {
        estimate_by_projection(gray, &self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrincipalAxisEstimator(pub PcaConfig);

impl AngleEstimator for PrincipalAxisEstimator {
    fn id(&self) -> EstimatorId {
        EstimatorId::PrincipalAxis
    }

    fn estimate(&self, gray: &GrayImage) -> Result<AngleEstimate> {
        estimate_by_pca(gray, &self.0)
    }
}

/// Blank-line sweep. Reads the plain grayscale page so the absolute blank
/// floor applies to the paper as scanned.
#[derive(Debug, Clone, Default)]
pub struct BlankScanEstimator(pub BlankScanConfig);

impl AngleEstimator for BlankScanEstimator {
    fn id(&self) -> EstimatorId {
        EstimatorId::BlankScan
    }

    fn estimate(&self, gray: &GrayImage) -> Result<AngleEstimate> {
        estimate_by_blank_scan(gray, &self.0).map(|(estimate, _)| estimate)
    }

    fn input_view(&self) -> InputView {
        InputView::Grayscale
    }
}

type EstimateFn = dyn Fn(&GrayImage) -> AngleEstimate + Send + Sync;

/// Adapter that lets any closure (a trained orientation classifier, say)
/// take part in fusion.
pub struct FnEstimator {
    name: String,
    view: InputView,
    f: Box<EstimateFn>,
}

impl FnEstimator {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&GrayImage) -> AngleEstimate + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            view: InputView::Normalized,
            f: Box::new(f),
        }
    }

    /// Feed the closure the plain grayscale page instead of the normalized one.
    pub fn with_view(mut self, view: InputView) -> Self {
        self.view = view;
        self
    }
}

impl std::fmt::Debug for FnEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnEstimator").field("name", &self.name).finish_non_exhaustive()
    }
}

impl AngleEstimator for FnEstimator {
    fn id(&self) -> EstimatorId {
        EstimatorId::External(self.name.clone())
    }

    /// The closure's estimate is re-tagged with this adapter's id and its
    /// confidence clamped like any built-in estimator's.
    fn estimate(&self, gray: &GrayImage) -> Result<AngleEstimate> {
        let raw = (self.f)(gray);
        Ok(AngleEstimate::new(self.id(), raw.angle, raw.confidence))
    }

    fn input_view(&self) -> InputView {
        self.view
    }
}

/// Instantiate the built-in estimators a configuration enables, in order.
///
/// External ids cannot be built from configuration alone; they are skipped
/// with a warning and must be registered on the deskewer directly.
pub fn build_estimators(config: &DeskewConfig) -> Vec<Box<dyn AngleEstimator>> {
    let mut estimators: Vec<Box<dyn AngleEstimator>> = Vec::with_capacity(config.estimators.len());
    for id in &config.estimators {
        match id {
            EstimatorId::Lines => estimators.push(Box::new(LineEstimator {
                emphasize: config.emphasize.clone(),
                lines: config.lines.clone(),
            })),
            EstimatorId::Geometry => {
                estimators.push(Box::new(GeometryEstimator(config.geometry.clone())))
            }
            EstimatorId::Projection => {
                estimators.push(Box::new(ProjectionEstimator(config.projection.clone())))
            }
            EstimatorId::PrincipalAxis => {
                estimators.push(Box::new(PrincipalAxisEstimator(config.pca.clone())))
            }
            EstimatorId::BlankScan => {
                estimators.push(Box::new(BlankScanEstimator(config.blank_scan.clone())))
            }
            EstimatorId::External(name) => {
                warn!(name = %name, "External estimator listed in config; register it explicitly");
            }
        }
    }
    estimators
}

/// Candidate angles `start, start + step, ...` up to and including `end`.
///
/// Empty when the range is inverted or any bound is not finite.
pub fn candidate_angles(start: f64, end: f64, step: f64) -> Vec<f64> {
    if !(start.is_finite() && end.is_finite() && step.is_finite() && step > 0.0) || start > end {
        return Vec::new();
    }
    let count = ((end - start) / step + 1e-9).floor() as usize + 1;
    (0..count).map(|i| start + i as f64 * step).collect()
}
