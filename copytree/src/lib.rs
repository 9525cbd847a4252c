// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CopyTree
//!
//! Selects a relevant subset of files from a source tree, optionally
//! transforms their content, and emits a single serialized artifact
//! (XML, JSON, Markdown, tree, NDJSON, SARIF) sized for an LLM context
//! window.
//!
//! ## Layers
//!
//! - [`application`] — the stage pipeline and its use cases (build, run,
//!   dry-run, ask).
//! - [`infrastructure`] — adapters the application layer depends on
//!   through `copytree_domain`'s ports: the walker, rule compiler,
//!   transformer registry and built-ins, streaming formatters, cache,
//!   secret scanner, git, external source resolver, conversation store,
//!   AI providers, profile loading, logging, and metrics.
//!
//! `copytree_domain` supplies the types and ports both layers share;
//! `copytree_bootstrap` supplies the composition root (`main.rs` calls
//! into it before anything here runs).

pub mod application;
pub mod infrastructure;

pub use application::pipeline::Pipeline;
