// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Module
//!
//! Sits outside the domain/application/infrastructure layers and owns
//! everything the process needs before a pipeline exists: CLI parsing,
//! signal handling, platform abstraction, and exit-code mapping. This
//! crate depends only on `copytree-domain` (for `CopyTreeError`); it never
//! depends on `copytree`. `copytree`'s binary target depends on
//! `copytree-bootstrap` to build its `main`.
//!
//! ## Module structure
//!
//! - `cli` — clap-based argument parsing into [`ValidatedCli`].
//! - `config` — immutable, builder-constructed `AppConfig`.
//! - `exit_code` — maps a `CopyTreeError` category to the process exit code
//!   (spec §6: 0 success, 1 generic, 2 validation/config, 3 cancelled, 4
//!   secrets rejected).
//! - `logger` — bootstrap-phase console logging, independent of the
//!   `tracing` subscriber the `copytree` crate installs once options are
//!   known.
//! - `platform` — OS abstraction (Unix/Windows).
//! - `shutdown` — graceful shutdown coordination for signal handlers.

pub mod cli;
pub mod config;
pub mod exit_code;
pub mod logger;
pub mod platform;
pub mod shutdown;

pub use cli::{parse_and_validate, Cli, CliError, ValidatedCli};
pub use config::AppConfig;
pub use exit_code::{map_error_category_to_exit_code, ExitCode};

/// Parses and validates CLI arguments. The sole entry point callers in
/// `copytree::main` invoke before any pipeline is constructed.
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::CliError> {
    cli::parse_and_validate()
}
