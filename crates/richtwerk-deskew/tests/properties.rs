// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Invariants every estimator and the rotator must hold on arbitrary input.

mod common;

use common::synthetic_page::{random_page, random_text_page, standard_page};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use richtwerk_core::config::{BlankScanConfig, NormalizeConfig, RotateConfig};
use richtwerk_core::types::{AngleEstimate, EstimatorId};
use richtwerk_deskew::{
    AngleEstimator, BlankScanEstimator, GeometryEstimator, LineEstimator, PrincipalAxisEstimator,
    ProjectionEstimator, normalize, rotate,
};

fn quarter_range_estimators() -> Vec<Box<dyn AngleEstimator>> {
    vec![
        Box::new(LineEstimator::default()),
        Box::new(GeometryEstimator::default()),
        Box::new(ProjectionEstimator::default()),
        Box::new(PrincipalAxisEstimator::default()),
        Box::new(BlankScanEstimator(BlankScanConfig::default().with_range(-45.0, 45.0))),
    ]
}

#[test]
fn zero_angle_rotation_is_bit_identical() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let gray = DynamicImage::ImageLuma8(random_page(&mut rng));
        assert_eq!(rotate(&gray, 0.0, &RotateConfig::default()), gray);
    }
    let rgb = DynamicImage::ImageRgb8(RgbImage::from_fn(33, 21, |x, y| Rgb([x as u8, y as u8, 9])));
    assert_eq!(rotate(&rgb, 0.0, &RotateConfig::default()), rgb);
}

/// Every estimator with the blank scan held to a narrow ±5° sweep.
fn sweep_estimators() -> Vec<Box<dyn AngleEstimator>> {
    vec![
        Box::new(LineEstimator::default()),
        Box::new(GeometryEstimator::default()),
        Box::new(ProjectionEstimator::default()),
        Box::new(PrincipalAxisEstimator::default()),
        Box::new(BlankScanEstimator(BlankScanConfig::default().with_range(-5.0, 5.0))),
    ]
}

fn assert_well_formed(case: &str, estimate: &AngleEstimate) {
    assert!(
        (0.0..=1.0).contains(&estimate.confidence),
        "{case}: {} confidence {}",
        estimate.estimator,
        estimate.confidence
    );
    assert!(estimate.angle.is_finite(), "{case}: {} angle not finite", estimate.estimator);
    let limit = if estimate.estimator == EstimatorId::BlankScan { 5.0 } else { 45.0 };
    assert!(estimate.angle.abs() <= limit, "{case}: {} angle {}", estimate.estimator, estimate.angle);
}

#[test]
fn confidence_stays_in_unit_interval_over_ten_thousand_pages() {
    let mut rng = StdRng::seed_from_u64(0x00DE_5CE7);
    let estimators = sweep_estimators();

    for case in 0..10_000 {
        let page = random_page(&mut rng);
        for estimator in &estimators {
            let estimate = estimator
                .estimate(&page)
                .unwrap_or_else(|e| panic!("case {case}: {} failed: {e}", estimator.id()));
            assert_well_formed(&format!("case {case}"), &estimate);
        }
    }
}

#[test]
fn scan_sized_pages_stay_well_formed_raw_and_normalized() {
    let mut rng = StdRng::seed_from_u64(0x5CA7_7E12);
    let estimators = sweep_estimators();

    for case in 0..200 {
        let raw = random_text_page(&mut rng);
        let normalized = normalize(&DynamicImage::ImageLuma8(raw.clone()), &NormalizeConfig::default())
            .unwrap_or_else(|e| panic!("case {case}: normalize failed: {e}"));
        for (view, page) in [("raw", &raw), ("normalized", &normalized)] {
            for estimator in &estimators {
                let estimate = estimator
                    .estimate(page)
                    .unwrap_or_else(|e| panic!("case {case} ({view}): {} failed: {e}", estimator.id()));
                assert_well_formed(&format!("case {case} ({view}, {:?})", page.dimensions()), &estimate);
            }
        }
    }
}

#[test]
fn pathological_pages_stay_within_quarter_range() {
    let pages = [
        GrayImage::from_pixel(64, 48, Luma([255u8])),
        GrayImage::from_pixel(64, 48, Luma([0u8])),
        GrayImage::from_pixel(1, 1, Luma([255u8])),
        GrayImage::from_pixel(1, 1, Luma([0u8])),
    ];
    for page in &pages {
        for estimator in quarter_range_estimators() {
            let estimate = estimator.estimate(page).unwrap();
            assert!(
                (-45.0..=45.0).contains(&estimate.angle),
                "{} returned {} on a {:?} page",
                estimator.id(),
                estimate.angle,
                page.dimensions()
            );
        }
    }
}

#[test]
fn quarter_range_holds_on_steep_pages() {
    for truth in [-80.0, -50.0, 47.0, 89.0] {
        let page = standard_page(truth);
        for estimator in quarter_range_estimators() {
            let estimate = estimator.estimate(&page).unwrap();
            assert!(
                (-45.0..=45.0).contains(&estimate.angle),
                "{} returned {} for a {truth}° page",
                estimator.id(),
                estimate.angle
            );
        }
    }
}

#[test]
fn empty_images_are_rejected_by_every_estimator() {
    let empty = GrayImage::new(0, 5);
    for estimator in quarter_range_estimators() {
        assert!(estimator.estimate(&empty).is_err(), "{} accepted an empty image", estimator.id());
    }
}
