// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deskewer — composes normalization, the enabled estimators, fusion and the
// rotator into one in-process call.

use std::path::Path;

use image::{DynamicImage, GrayImage};
use richtwerk_core::config::DeskewConfig;
use richtwerk_core::error::{Result, RichtwerkError};
use richtwerk_core::types::{AngleEstimate, EstimatorId, fold_quarter_turn};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::estimate::{AngleEstimator, InputView, build_estimators, estimate_by_blank_scan};
use crate::fusion::{self, Decision, SkipReason};
use crate::image::{check_dimensions, normalize, rotate, rotate_in_place};

/// Everything decided about one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeskewReport {
    /// Decided skew in degrees; the page is rotated by this when applied.
    pub angle: f64,
    pub confidence: f64,
    /// Every estimator's vote, including the blank-scan fallback if it ran.
    pub estimates: Vec<AngleEstimate>,
    pub applied: bool,
    pub skipped: Option<SkipReason>,
    /// The line and geometry estimators disagreed and the blank scan decided.
    pub fallback: bool,
}

impl DeskewReport {
    fn from_decision(decision: Decision, estimates: Vec<AngleEstimate>, fallback: bool) -> Self {
        Self {
            angle: decision.angle,
            confidence: decision.confidence,
            estimates,
            applied: decision.should_rotate(),
            skipped: decision.skipped,
            fallback,
        }
    }

    /// The vote a given estimator cast, if it ran.
    pub fn estimate_for(&self, id: &EstimatorId) -> Option<&AngleEstimate> {
        self.estimates.iter().find(|e| &e.estimator == id)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Skew detection and correction with a fixed configuration.
pub struct Deskewer {
    config: DeskewConfig,
    estimators: Vec<Box<dyn AngleEstimator>>,
}

impl Deskewer {
    /// Validate the configuration and build its estimators.
    pub fn new(config: DeskewConfig) -> Result<Self> {
        config.validate()?;
        let estimators = build_estimators(&config);
        Ok(Self { config, estimators })
    }

    /// Add a caller-supplied estimator to the vote.
    pub fn with_estimator(mut self, estimator: impl AngleEstimator + 'static) -> Self {
        self.estimators.push(Box::new(estimator));
        self
    }

    pub fn config(&self) -> &DeskewConfig {
        &self.config
    }

    pub fn estimator_ids(&self) -> Vec<EstimatorId> {
        self.estimators.iter().map(|e| e.id()).collect()
    }

    /// Estimate the page's skew and decide whether to correct it, without
    /// touching the image.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn detect(&self, image: &DynamicImage) -> Result<DeskewReport> {
        check_dimensions(image.width(), image.height())?;
        let views = PageViews::build(image, &self.estimators, &self.config)?;

        let mut estimates = self.run_estimators(&views)?;

        if let Some(fallback) = self.fallback_estimate(&estimates, &views)? {
            let decision = fusion::decide_single(&fallback, &self.config.fusion);
            estimates.push(fallback);
            let report = DeskewReport::from_decision(decision, estimates, true);
            info!(angle = report.angle, applied = report.applied, "Blank-scan fallback decided");
            return Ok(report);
        }

        let decision = fusion::decide(&estimates, &self.config.fusion);
        let report = DeskewReport::from_decision(decision, estimates, false);
        info!(
            angle = report.angle,
            confidence = report.confidence,
            applied = report.applied,
            skipped = ?report.skipped,
            "Skew decided"
        );
        Ok(report)
    }

    /// Return a corrected copy of the page and the report behind it.
    ///
    /// A skipped decision returns an unchanged copy.
    pub fn deskew(&self, image: &DynamicImage) -> Result<(DynamicImage, DeskewReport)> {
        let report = self.detect(image)?;
        let corrected = if report.applied {
            rotate(image, report.angle, &self.config.rotate)
        } else {
            image.clone()
        };
        Ok((corrected, report))
    }

    /// Correct the page in place.
    pub fn deskew_in_place(&self, image: &mut DynamicImage) -> Result<DeskewReport> {
        let mut report = self.detect(image)?;
        if report.applied {
            report.applied = rotate_in_place(image, report.angle, &self.config.rotate);
        }
        Ok(report)
    }

    /// Decode a page from disk, correct it, and write the result to `output`
    /// (format from its extension).
    #[instrument(skip(self, input, output), fields(path = %input.as_ref().display()))]
    pub fn deskew_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<DeskewReport> {
        let mut page = image::open(input.as_ref()).map_err(|e| {
            RichtwerkError::ImageError(format!("{}: {e}", input.as_ref().display()))
        })?;
        let report = self.deskew_in_place(&mut page)?;
        page.save(output.as_ref()).map_err(|e| {
            RichtwerkError::ImageError(format!("{}: {e}", output.as_ref().display()))
        })?;
        Ok(report)
    }

    /// Correct every page in place, one report per page in input order.
    ///
    /// A failing page does not stop the others.
    #[instrument(skip_all, fields(pages = pages.len()))]
    pub fn deskew_batch(&self, pages: &mut [DynamicImage]) -> Vec<Result<DeskewReport>> {
        #[cfg(feature = "parallel")]
        let reports: Vec<_> = pages.par_iter_mut().map(|page| self.deskew_in_place(page)).collect();
        #[cfg(not(feature = "parallel"))]
        let reports: Vec<_> = pages.iter_mut().map(|page| self.deskew_in_place(page)).collect();

        let corrected = reports.iter().filter(|r| matches!(r, Ok(report) if report.applied)).count();
        info!(corrected, total = reports.len(), "Batch deskew complete");
        reports
    }

    fn run_estimators(&self, views: &PageViews) -> Result<Vec<AngleEstimate>> {
        let run = |estimator: &dyn AngleEstimator| -> Result<AngleEstimate> {
            let estimate = estimator.estimate(views.get(estimator.input_view()))?;
            if estimate.is_abstention() {
                warn!(estimator = %estimator.id(), "Estimator abstained");
            }
            Ok(estimate)
        };

        #[cfg(feature = "parallel")]
        {
            self.estimators.par_iter().map(|e| run(e.as_ref())).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            self.estimators.iter().map(|e| run(e.as_ref())).collect()
        }
    }

    /// When lines and geometry both voted and disagree by more than the
    /// configured spread, rerun the blank scan over the projection window.
    fn fallback_estimate(
        &self,
        estimates: &[AngleEstimate],
        views: &PageViews,
    ) -> Result<Option<AngleEstimate>> {
        let Some(limit) = self.config.fusion.fallback_disagreement else {
            return Ok(None);
        };
        let vote = |id: EstimatorId| estimates.iter().find(|e| e.estimator == id && !e.is_abstention());
        let (Some(lines), Some(geometry)) = (vote(EstimatorId::Lines), vote(EstimatorId::Geometry)) else {
            return Ok(None);
        };
        let spread = fold_quarter_turn(lines.angle - geometry.angle).abs();
        if spread <= limit {
            return Ok(None);
        }

        warn!(lines = lines.angle, geometry = geometry.angle, spread, "Estimators disagree; running blank scan");
        let window = self.config.projection.window;
        let config = self.config.blank_scan.with_range(-window, window);
        let (estimate, _) = estimate_by_blank_scan(views.get(InputView::Grayscale), &config)?;
        Ok((!estimate.is_abstention()).then_some(estimate))
    }
}

impl Default for Deskewer {
    fn default() -> Self {
        let config = DeskewConfig::default();
        let estimators = build_estimators(&config);
        Self { config, estimators }
    }
}

impl std::fmt::Debug for Deskewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deskewer")
            .field("estimators", &self.estimator_ids())
            .finish_non_exhaustive()
    }
}

/// The page renditions estimators read, each derived once per page.
struct PageViews {
    normalized: Option<GrayImage>,
    grayscale: GrayImage,
}

impl PageViews {
    fn build(
        image: &DynamicImage,
        estimators: &[Box<dyn AngleEstimator>],
        config: &DeskewConfig,
    ) -> Result<Self> {
        let wants_normalized = estimators.iter().any(|e| e.input_view() == InputView::Normalized);
        let normalized = if wants_normalized {
            Some(normalize(image, &config.normalize)?)
        } else {
            None
        };
        Ok(Self {
            normalized,
            grayscale: image.to_luma8(),
        })
    }

    fn get(&self, view: InputView) -> &GrayImage {
        match (view, &self.normalized) {
            (InputView::Normalized, Some(normalized)) => normalized,
            _ => &self.grayscale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::FnEstimator;
    use image::{GenericImageView, GrayImage, Luma};

    fn fixed(name: &str, angle: f64, confidence: f64) -> FnEstimator {
        let id = EstimatorId::External(name.to_string());
        FnEstimator::new(name, move |_| AngleEstimate::new(id.clone(), angle, confidence))
    }

    fn only_external() -> Deskewer {
        let config = DeskewConfig { estimators: Vec::new(), ..DeskewConfig::default() };
        Deskewer::new(config).unwrap()
    }

    fn page() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(64, 48, |x, y| Luma([((x + y) % 200 + 40) as u8])))
    }

    /// Reports a fixed vote under a built-in estimator's id.
    struct Tagged(EstimatorId, f64);

    impl AngleEstimator for Tagged {
        fn id(&self) -> EstimatorId {
            self.0.clone()
        }

        fn estimate(&self, _: &GrayImage) -> Result<AngleEstimate> {
            Ok(AngleEstimate::new(self.0.clone(), self.1, 0.9))
        }
    }

    fn ruled_page() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(160, 120, |_, y| Luma([if y % 20 < 3 { 0 } else { 255 }])))
    }

    fn lines_versus_geometry(lines: f64, geometry: f64) -> DeskewReport {
        only_external()
            .with_estimator(Tagged(EstimatorId::Lines, lines))
            .with_estimator(Tagged(EstimatorId::Geometry, geometry))
            .detect(&ruled_page())
            .unwrap()
    }

    #[test]
    fn real_disagreement_triggers_blank_scan() {
        let report = lines_versus_geometry(8.0, -8.0);
        assert!(report.fallback);
        assert_eq!(report.angle, 0.0);
    }

    #[test]
    fn same_axis_across_the_fold_is_not_a_disagreement() {
        let report = lines_versus_geometry(44.9, -44.9);
        assert!(!report.fallback, "{report:?}");
        assert!(report.estimate_for(&EstimatorId::BlankScan).is_none());
    }

    #[test]
    fn fuses_external_estimators() {
        let deskewer = only_external().with_estimator(fixed("a", 10.0, 0.8)).with_estimator(fixed("b", 12.0, 0.2));
        let report = deskewer.detect(&page()).unwrap();
        assert!((report.angle - 10.4).abs() < 1e-12);
        assert!(report.applied);
        assert!(!report.fallback);
        assert_eq!(report.estimates.len(), 2);
    }

    #[test]
    fn abstaining_pipeline_leaves_page_untouched() {
        let deskewer = only_external().with_estimator(fixed("a", 0.0, 0.0));
        let original = page();
        let (out, report) = deskewer.deskew(&original).unwrap();
        assert_eq!(report.angle, 0.0);
        assert_eq!(report.skipped, Some(SkipReason::NoEvidence));
        assert_eq!(out, original);
    }

    #[test]
    fn in_place_and_batch_rotate_applied_pages() {
        let deskewer = only_external().with_estimator(fixed("a", 3.0, 0.9));
        let mut single = page();
        let report = deskewer.deskew_in_place(&mut single).unwrap();
        assert!(report.applied);
        assert_ne!(single, page());

        let mut pages = vec![page(), DynamicImage::ImageLuma8(GrayImage::new(0, 0))];
        let reports = deskewer.deskew_batch(&mut pages);
        assert!(reports[0].as_ref().unwrap().applied);
        assert!(matches!(reports[1], Err(RichtwerkError::InvalidInput(_))));
        assert_ne!(pages[0], page());
    }

    #[test]
    fn empty_image_is_rejected() {
        let err = Deskewer::default().detect(&DynamicImage::ImageLuma8(GrayImage::new(10, 0))).unwrap_err();
        assert!(matches!(err, RichtwerkError::InvalidInput(_)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = DeskewConfig::default();
        config.blank_scan.scan_step = 0;
        assert!(matches!(Deskewer::new(config), Err(RichtwerkError::Config(_))));
    }

    #[test]
    fn report_serializes_to_json() {
        let deskewer = only_external().with_estimator(fixed("a", 2.0, 0.5));
        let report = deskewer.detect(&page()).unwrap();
        let json = report.to_json().unwrap();
        let back: DeskewReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.png");
        let output = dir.path().join("level.png");
        page().save(&input).unwrap();

        let deskewer = only_external().with_estimator(fixed("a", 2.0, 0.9));
        let report = deskewer.deskew_file(&input, &output).unwrap();
        assert!(report.applied);
        assert_eq!(image::open(&output).unwrap().dimensions(), (64, 48));

        let missing = deskewer.deskew_file(dir.path().join("absent.png"), &output);
        assert!(matches!(missing, Err(RichtwerkError::ImageError(_))));
    }

    #[test]
    fn default_uses_configured_estimators() {
        assert_eq!(Deskewer::default().estimator_ids().len(), 4);
    }
}
