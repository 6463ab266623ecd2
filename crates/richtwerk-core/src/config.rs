// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deskew configuration. One immutable struct per stage, gathered into
// `DeskewConfig`. Every field has a default and the whole tree round-trips
// through JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RichtwerkError};
use crate::types::EstimatorId;

/// Image normalizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Radius of the edge-preserving median denoise (0 disables it).
    pub denoise_radius: u32,
    /// CLAHE clip limit, as a multiple of the mean histogram bin height.
    pub clahe_clip_limit: f32,
    /// Tiles per axis for local contrast equalization.
    pub clahe_tiles: u32,
    /// Gaussian sigma of the unsharp-mask blur.
    pub unsharp_sigma: f32,
    /// Weight of the original in `orig * amount - blur * (amount - 1)`.
    pub unsharp_amount: f32,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            denoise_radius: 1,
            clahe_clip_limit: 2.0,
            clahe_tiles: 8,
            unsharp_sigma: 1.0,
            unsharp_amount: 1.5,
        }
    }
}

/// Text-region emphasizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmphasizeConfig {
    /// Half-size of the adaptive threshold neighbourhood (5 gives 11x11).
    pub block_radius: u32,
    /// Constant subtracted from the local mean.
    pub offset: i32,
    /// Wide-short dilation kernel, `(width, height)`.
    pub horizontal_kernel: (u32, u32),
    /// Narrow-tall dilation kernel, `(width, height)`.
    pub vertical_kernel: (u32, u32),
    /// Small isotropic-ish kernel closing the remaining gaps.
    pub fill_kernel: (u32, u32),
    /// Contours enclosing less area than this (px²) are treated as specks.
    pub min_area: f64,
}

impl Default for EmphasizeConfig {
    fn default() -> Self {
        Self {
            block_radius: 5,
            offset: 2,
            horizontal_kernel: (5, 1),
            vertical_kernel: (1, 4),
            fill_kernel: (3, 2),
            min_area: 2000.0,
        }
    }
}

/// How the line estimator turns kept segments into one angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineAggregation {
    /// Bucket angles and pick the bucket with the largest summed length.
    #[default]
    LengthWeightedMode,
    /// Median of the kept segment angles.
    Median,
}

/// Edge/line estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub canny_low: f32,
    pub canny_high: f32,
    /// Angular resolution of the line-transform accumulator, in degrees.
    pub theta_step_deg: f64,
    /// Minimum accumulator votes before a line is traced.
    pub vote_threshold: u32,
    /// Minimum extent (along x or y) for a traced segment to be accepted.
    pub min_line_length: u32,
    /// Largest run of missing edge pixels bridged inside one segment.
    pub max_line_gap: u32,
    /// Segments shorter than this are dropped before aggregation.
    pub min_segment_length: f64,
    /// Only the longest `top_n` segments vote.
    pub top_n: usize,
    /// Bucket width for the length-weighted mode, in degrees.
    pub bucket_resolution: f64,
    /// Discard segments whose angle lies outside `±angle_window`.
    pub angle_window: Option<f64>,
    pub aggregation: LineAggregation,
    /// Seed for the randomized point order of the line transform.
    pub seed: u64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            canny_low: 30.0,
            canny_high: 100.0,
            theta_step_deg: 1.0,
            vote_threshold: 50,
            min_line_length: 100,
            max_line_gap: 20,
            min_segment_length: 50.0,
            top_n: 20,
            bucket_resolution: 0.1,
            angle_window: None,
            aggregation: LineAggregation::LengthWeightedMode,
            seed: 0x5EED_1DE5,
        }
    }
}

/// Global binarization threshold used by the projection and geometry estimators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThresholdPolicy {
    /// Variance-maximizing threshold derived from each image's histogram.
    #[default]
    Otsu,
    /// Pixels at or below this level are foreground.
    Fixed(u8),
}

/// Geometry (minimum-area rectangle) estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub threshold: ThresholdPolicy,
    /// Under Otsu, dark and light class means closer than this many gray
    /// levels mean the page carries no ink.
    pub min_contrast: f64,
    /// Contours with fewer points than this cannot define a rectangle.
    pub min_contour_points: usize,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            threshold: ThresholdPolicy::Otsu,
            min_contrast: 24.0,
            min_contour_points: 3,
        }
    }
}

/// Projection-variance estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Candidate angles span `[-window, window]`.
    pub window: f64,
    pub step: f64,
    /// Scale factor applied before the sweep (1.0 keeps full resolution).
    pub downsample: f64,
    pub threshold: ThresholdPolicy,
    /// See [`GeometryConfig::min_contrast`].
    pub min_contrast: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            window: 10.0,
            step: 0.5,
            downsample: 0.5,
            threshold: ThresholdPolicy::Otsu,
            min_contrast: 24.0,
        }
    }
}

/// Principal-axis estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcaConfig {
    pub canny_low: f32,
    pub canny_high: f32,
    /// Fewer edge pixels than this is insufficient evidence.
    pub min_points: usize,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            min_points: 10,
        }
    }
}

/// Exhaustive blank-scan estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlankScanConfig {
    pub angle_start: f64,
    pub angle_end: f64,
    pub angle_step: f64,
    /// Spacing between parallel scan-lines, in pixels.
    pub scan_step: u32,
    /// A scan-line is blank iff its darkest pixel is at least this bright.
    pub blank_floor: u8,
    /// Pixels at or above this count as white in the diagnostic pixel rate.
    pub white_threshold: u8,
}

impl Default for BlankScanConfig {
    fn default() -> Self {
        Self {
            angle_start: -90.0,
            angle_end: 90.0,
            angle_step: 1.0,
            scan_step: 1,
            blank_floor: 220,
            white_threshold: 199,
        }
    }
}

impl BlankScanConfig {
    /// The same settings restricted to `[start, end]`.
    pub fn with_range(&self, start: f64, end: f64) -> Self {
        Self {
            angle_start: start,
            angle_end: end,
            ..self.clone()
        }
    }
}

/// How estimates are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FusionPolicy {
    /// `Σ(angle·confidence) / Σ(confidence)`.
    #[default]
    WeightedMean,
    /// Take the single most confident estimate.
    BestConfidence,
}

/// Fusion and decision settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub policy: FusionPolicy,
    /// Fused confidence below this leaves the page untouched.
    pub min_confidence: f64,
    /// Angles with a smaller magnitude are treated as already aligned.
    pub min_angle: f64,
    /// When the line and geometry estimators disagree by more than this many
    /// degrees, the blank-scan estimator decides. `None` disables it.
    pub fallback_disagreement: Option<f64>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            policy: FusionPolicy::WeightedMean,
            min_confidence: 0.0,
            min_angle: 0.5,
            fallback_disagreement: Some(5.0),
        }
    }
}

/// Fill policy for pixels the rotation pulls in from outside the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorderMode {
    /// Repeat the nearest edge pixel.
    Replicate,
    /// Constant gray level on every channel (255 is white, opaque).
    Fill(u8),
}

impl Default for BorderMode {
    fn default() -> Self {
        Self::Fill(255)
    }
}

/// Rotator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateConfig {
    pub border: BorderMode,
    /// Grow the canvas so no corner of the page is cropped.
    pub expand: bool,
    /// Angles with a smaller magnitude return the input unchanged.
    pub epsilon: f64,
}

impl Default for RotateConfig {
    fn default() -> Self {
        Self {
            border: BorderMode::default(),
            expand: false,
            epsilon: 1e-3,
        }
    }
}

/// Complete configuration of the deskew pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskewConfig {
    /// Estimators run on every page, in this order.
    pub estimators: Vec<EstimatorId>,
    pub normalize: NormalizeConfig,
    pub emphasize: EmphasizeConfig,
    pub lines: LineConfig,
    pub geometry: GeometryConfig,
    pub projection: ProjectionConfig,
    pub pca: PcaConfig,
    pub blank_scan: BlankScanConfig,
    pub fusion: FusionConfig,
    pub rotate: RotateConfig,
}

impl Default for DeskewConfig {
    fn default() -> Self {
        Self {
            estimators: vec![
                EstimatorId::Lines,
                EstimatorId::Geometry,
                EstimatorId::Projection,
                EstimatorId::PrincipalAxis,
            ],
            normalize: NormalizeConfig::default(),
            emphasize: EmphasizeConfig::default(),
            lines: LineConfig::default(),
            geometry: GeometryConfig::default(),
            projection: ProjectionConfig::default(),
            pca: PcaConfig::default(),
            blank_scan: BlankScanConfig::default(),
            fusion: FusionConfig::default(),
            rotate: RotateConfig::default(),
        }
    }
}

impl DeskewConfig {
    /// Parse and validate a configuration from JSON. Missing fields take their
    /// defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings that make a request meaningless.
    pub fn validate(&self) -> Result<()> {
        let bs = &self.blank_scan;
        if !(bs.angle_step.is_finite() && bs.angle_step > 0.0) {
            return Err(invalid("blank_scan.angle_step must be positive"));
        }
        if !(bs.angle_start.is_finite() && bs.angle_end.is_finite())
            || bs.angle_start > bs.angle_end
        {
            return Err(invalid("blank_scan angle range must be finite and ordered"));
        }
        if bs.scan_step == 0 {
            return Err(invalid("blank_scan.scan_step must be at least 1"));
        }
        let proj = &self.projection;
        if !(proj.step.is_finite() && proj.step > 0.0) {
            return Err(invalid("projection.step must be positive"));
        }
        if !(proj.downsample.is_finite() && proj.downsample > 0.0 && proj.downsample <= 1.0) {
            return Err(invalid("projection.downsample must lie in (0, 1]"));
        }
        if !(self.lines.theta_step_deg.is_finite() && self.lines.theta_step_deg > 0.0) {
            return Err(invalid("lines.theta_step_deg must be positive"));
        }
        if !(self.lines.bucket_resolution.is_finite() && self.lines.bucket_resolution > 0.0) {
            return Err(invalid("lines.bucket_resolution must be positive"));
        }
        if self.normalize.clahe_tiles == 0 {
            return Err(invalid("normalize.clahe_tiles must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> RichtwerkError {
    RichtwerkError::Config(msg.to_string())
}
