// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Richtwerk.
//
// Only hard failures live here. An estimator that finds no usable signal does
// not error: it abstains with `AngleEstimate::abstain`.

use thiserror::Error;

/// Top-level error type for all Richtwerk operations.
#[derive(Debug, Error)]
pub enum RichtwerkError {
    // -- Input errors --
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RichtwerkError {
    /// Shorthand for the empty-image precondition violation.
    pub fn empty_image(width: u32, height: u32) -> Self {
        Self::InvalidInput(format!(
            "image must have positive dimensions, got {}x{}",
            width, height
        ))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RichtwerkError>;
