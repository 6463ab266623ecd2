// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fusion and decision — combine estimator votes into one correction angle and
// decide whether it is worth applying.

use richtwerk_core::config::{FusionConfig, FusionPolicy};
use richtwerk_core::types::AngleEstimate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Why a decided angle was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Every estimator abstained.
    NoEvidence,
    /// Fused confidence fell below `min_confidence`.
    LowConfidence,
    /// The page is already within `min_angle` of level.
    AlreadyLevel,
}

/// The outcome of fusion plus gating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub angle: f64,
    pub confidence: f64,
    pub skipped: Option<SkipReason>,
}

impl Decision {
    pub fn should_rotate(&self) -> bool {
        self.skipped.is_none()
    }
}

/// Confidence-weighted mean: `Σ(angle·confidence) / Σ(confidence)`.
///
/// Returns 0.0 when the confidences sum to zero.
pub fn fuse(estimates: &[AngleEstimate]) -> f64 {
    fuse_with(estimates, FusionPolicy::WeightedMean).0
}

/// Fuse under a policy, returning `(angle, confidence)`.
///
/// The weighted mean reports the confidence-weighted mean of the
/// confidences; best-of reports the winner's own. Ties in best-of go to the
/// smaller |angle|.
pub fn fuse_with(estimates: &[AngleEstimate], policy: FusionPolicy) -> (f64, f64) {
    let total: f64 = estimates.iter().map(|e| e.confidence).sum();
    if total <= 0.0 {
        return (0.0, 0.0);
    }

    match policy {
        FusionPolicy::WeightedMean => {
            let angle = estimates.iter().map(|e| e.angle * e.confidence).sum::<f64>() / total;
            let confidence = estimates.iter().map(|e| e.confidence * e.confidence).sum::<f64>() / total;
            (angle, confidence)
        }
        FusionPolicy::BestConfidence => estimates
            .iter()
            .filter(|e| !e.is_abstention())
            .max_by(|a, b| {
                a.confidence
                    .total_cmp(&b.confidence)
                    .then_with(|| b.angle.abs().total_cmp(&a.angle.abs()))
            })
            .map(|e| (e.angle, e.confidence))
            .unwrap_or((0.0, 0.0)),
    }
}

/// Fuse every estimate and gate the result.
pub fn decide(estimates: &[AngleEstimate], config: &FusionConfig) -> Decision {
    let (angle, confidence) = fuse_with(estimates, config.policy);
    debug!(estimates = estimates.len(), angle, confidence, policy = ?config.policy, "Estimates fused");
    gate(angle, confidence, config)
}

/// Single-estimator callers skip fusion and take the estimate as is, gated
/// by the same floors.
pub fn decide_single(estimate: &AngleEstimate, config: &FusionConfig) -> Decision {
    gate(estimate.angle, estimate.confidence, config)
}

fn gate(angle: f64, confidence: f64, config: &FusionConfig) -> Decision {
    let skipped = if confidence <= 0.0 {
        Some(SkipReason::NoEvidence)
    } else if confidence < config.min_confidence {
        Some(SkipReason::LowConfidence)
    } else if angle.abs() < config.min_angle {
        Some(SkipReason::AlreadyLevel)
    } else {
        None
    };
    Decision { angle, confidence, skipped }
}
