// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Process Exit Codes
//!
//! Maps a terminal [`copytree_domain::CopyTreeError`] category to the
//! process exit code the CLI returns: 0 success, 1 generic failure, 2
//! configuration/validation error, 3 cancelled, 4 secrets rejected.

use copytree_domain::CopyTreeError;
use std::process::ExitCode as StdExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    Failure = 1,
    ConfigurationError = 2,
    Cancelled = 3,
    SecretsRejected = 4,
}

impl ExitCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<ExitCode> for StdExitCode {
    fn from(code: ExitCode) -> Self {
        StdExitCode::from(code.as_u8())
    }
}

/// Classifies a terminal error into its exit code. `category()` returns
/// the same string tags `CopyTreeError` uses for metrics labeling, so this
/// stays in lockstep with the error taxonomy without matching on variants
/// directly.
pub fn map_error_category_to_exit_code(error: &CopyTreeError) -> ExitCode {
    match error.category() {
        "cancelled" => ExitCode::Cancelled,
        "secrets" => ExitCode::SecretsRejected,
        "configuration" | "pattern" | "validation" => ExitCode::ConfigurationError,
        _ => ExitCode::Failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_maps_to_three() {
        let err = CopyTreeError::Cancelled("user interrupt".to_string());
        assert_eq!(map_error_category_to_exit_code(&err), ExitCode::Cancelled);
    }

    #[test]
    fn secrets_detected_maps_to_four() {
        let err = CopyTreeError::SecretsDetected { count: 3 };
        assert_eq!(map_error_category_to_exit_code(&err), ExitCode::SecretsRejected);
    }

    #[test]
    fn configuration_maps_to_two() {
        let err = CopyTreeError::Configuration("bad option".to_string());
        assert_eq!(map_error_category_to_exit_code(&err), ExitCode::ConfigurationError);
    }

    #[test]
    fn generic_io_maps_to_one() {
        let err = CopyTreeError::Internal("boom".to_string());
        assert_eq!(map_error_category_to_exit_code(&err), ExitCode::Failure);
    }

    #[test]
    fn exit_code_as_u8() {
        assert_eq!(ExitCode::Success.as_u8(), 0);
        assert_eq!(ExitCode::Failure.as_u8(), 1);
        assert_eq!(ExitCode::ConfigurationError.as_u8(), 2);
        assert_eq!(ExitCode::Cancelled.as_u8(), 3);
        assert_eq!(ExitCode::SecretsRejected.as_u8(), 4);
    }
}
