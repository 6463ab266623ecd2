// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end scenarios on synthetic pages with a known skew.

mod common;

use common::synthetic_page::{PAPER, standard_page};
use image::{DynamicImage, GrayImage, Luma};
use richtwerk_core::config::{BlankScanConfig, DeskewConfig, ProjectionConfig, RotateConfig};
use richtwerk_core::types::{AngleEstimate, EstimatorId};
use richtwerk_deskew::fusion::SkipReason;
use richtwerk_deskew::{Deskewer, FnEstimator, estimate_by_blank_scan, estimate_by_projection, fuse, rotate};

#[test]
fn detected_angle_matches_ground_truth() {
    let deskewer = Deskewer::default();
    for truth in [-6.0, -2.0, 3.0, 7.0] {
        let page = DynamicImage::ImageLuma8(standard_page(truth));
        let report = deskewer.detect(&page).unwrap();
        assert!(report.applied, "truth {truth}: {report:?}");
        assert!((report.angle - truth).abs() <= 0.5, "truth {truth}: fused {}", report.angle);
    }
}

#[test]
fn correcting_by_the_estimate_levels_the_page() {
    let deskewer = Deskewer::default();
    for truth in [-4.0, 5.0] {
        let page = DynamicImage::ImageLuma8(standard_page(truth));
        let (corrected, report) = deskewer.deskew(&page).unwrap();
        assert!(report.applied);
        let residual = deskewer.detect(&corrected).unwrap();
        assert!(residual.angle.abs() <= 0.5, "truth {truth}: residual {}", residual.angle);
    }
}

#[test]
fn inverse_rotation_of_known_skew_estimates_level() {
    for truth in [-3.0, 4.0] {
        let skewed = DynamicImage::ImageLuma8(standard_page(truth));
        let leveled = rotate(&skewed, truth, &RotateConfig::default()).to_luma8();
        let estimate = estimate_by_projection(&leveled, &ProjectionConfig::default()).unwrap();
        assert!(estimate.angle.abs() <= 0.5, "truth {truth}: got {}", estimate.angle);
    }
}

#[test]
fn blank_scan_prefers_level_rules_in_narrow_range() {
    let page = standard_page(0.0);
    let config = BlankScanConfig::default().with_range(-5.0, 5.0);
    let (estimate, report) = estimate_by_blank_scan(&page, &config).unwrap();

    assert!(estimate.angle.abs() <= 0.5, "got {}", estimate.angle);
    let best = report.best().unwrap();
    for edge in [-5.0, 5.0] {
        assert!(best.blank_rate > report.at(edge).unwrap().blank_rate, "not above {edge}°");
    }
    // Ranking is by blank rate alone.
    let ranked = report.ranked(report.stats.len());
    assert!(ranked.windows(2).all(|w| w[0].blank_rate >= w[1].blank_rate));
}

#[test]
fn fusion_weighted_mean() {
    let estimates = [
        AngleEstimate::new(EstimatorId::Lines, 10.0, 0.8),
        AngleEstimate::new(EstimatorId::Projection, 12.0, 0.2),
    ];
    assert!((fuse(&estimates) - 10.4).abs() < 1e-12);
}

#[test]
fn blank_page_abstains_everywhere_and_stays_untouched() {
    let page = DynamicImage::ImageLuma8(GrayImage::from_pixel(200, 150, Luma([PAPER])));
    let (out, report) = Deskewer::default().deskew(&page).unwrap();

    assert!(report.estimates.iter().all(AngleEstimate::is_abstention), "{report:?}");
    assert_eq!(report.angle, 0.0);
    assert_eq!(report.skipped, Some(SkipReason::NoEvidence));
    assert!(!report.applied);
    assert_eq!(out, page);
}

#[test]
fn small_skew_is_left_alone() {
    let page = DynamicImage::ImageLuma8(standard_page(0.0));
    let (out, report) = Deskewer::default().deskew(&page).unwrap();
    assert_eq!(report.skipped, Some(SkipReason::AlreadyLevel));
    assert_eq!(out, page);
}

#[test]
fn forced_fallback_uses_blank_scan() {
    let mut config = DeskewConfig::default();
    // Any disagreement at all exceeds a negative spread.
    config.fusion.fallback_disagreement = Some(-1.0);
    let deskewer = Deskewer::new(config).unwrap();

    let report = deskewer.detect(&DynamicImage::ImageLuma8(standard_page(2.0))).unwrap();
    assert!(report.fallback);
    let blank = report.estimate_for(&EstimatorId::BlankScan).unwrap();
    assert!((blank.angle - 2.0).abs() <= 0.5, "blank scan chose {}", blank.angle);
    assert_eq!(report.angle, blank.angle);
}

#[test]
fn external_classifier_joins_the_vote() {
    let config = DeskewConfig { estimators: vec![EstimatorId::Projection], ..DeskewConfig::default() };
    let deskewer = Deskewer::new(config)
        .unwrap()
        .with_estimator(FnEstimator::new("orientation-net", |_| {
            AngleEstimate::new(EstimatorId::External("orientation-net".into()), 3.0, 1.0)
        }));

    let report = deskewer.detect(&DynamicImage::ImageLuma8(standard_page(3.0))).unwrap();
    assert_eq!(report.estimates.len(), 2);
    let external = report.estimate_for(&EstimatorId::External("orientation-net".into())).unwrap();
    assert_eq!(external.angle, 3.0);
    assert!((report.angle - 3.0).abs() <= 0.5);
}

#[test]
fn batch_corrects_pages_in_place() {
    let deskewer = Deskewer::default();
    let mut pages = vec![
        DynamicImage::ImageLuma8(standard_page(4.0)),
        DynamicImage::ImageLuma8(GrayImage::from_pixel(120, 90, Luma([PAPER]))),
    ];
    let originals = pages.clone();

    let reports = deskewer.deskew_batch(&mut pages);
    assert_eq!(reports.len(), 2);
    assert!(reports[0].as_ref().unwrap().applied);
    assert_ne!(pages[0], originals[0]);
    assert!(!reports[1].as_ref().unwrap().applied);
    assert_eq!(pages[1], originals[1]);
}

#[test]
fn config_file_drives_the_deskewer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("richtwerk.json");
    std::fs::write(&path, r#"{ "estimators": ["Projection"], "fusion": { "min_angle": 10.0 } }"#).unwrap();

    let deskewer = Deskewer::new(DeskewConfig::load(&path).unwrap()).unwrap();
    assert_eq!(deskewer.estimator_ids(), vec![EstimatorId::Projection]);
    let report = deskewer.detect(&DynamicImage::ImageLuma8(standard_page(3.0))).unwrap();
    assert_eq!(report.skipped, Some(SkipReason::AlreadyLevel));
}
