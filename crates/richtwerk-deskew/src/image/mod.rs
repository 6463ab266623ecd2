// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — normalization, text-region emphasis, thresholding and
// rotation.

pub mod emphasize;
pub mod normalize;
pub mod rotate;
pub mod threshold;

pub use emphasize::emphasize;
pub use normalize::normalize;
pub use rotate::{rotate, rotate_in_place};

use richtwerk_core::error::{Result, RichtwerkError};

/// Reject zero-sized images before any stage touches them.
pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(RichtwerkError::empty_image(width, height));
    }
    Ok(())
}
