// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Richtwerk — Core types, configuration and error definitions shared by the
// deskew engine and its callers.

pub mod config;
pub mod error;
pub mod types;

pub use config::DeskewConfig;
pub use error::{Result, RichtwerkError};
pub use types::*;
