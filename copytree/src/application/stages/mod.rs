// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline stages (§4.1)
//!
//! One `Stage` implementation per topology step: Discovery → GitFilter →
//! RulesetFilter → AlwaysInclude → ExternalSourceMerge → LimitAndCharLimit →
//! Load → Transform → MetadataInjection → DedupAndSort → Format. Each
//! module owns only the adapters it needs; wiring them into a concrete
//! `Pipeline` is the job of `application::use_cases`.

pub mod always_include;
pub mod dedup_sort;
pub mod discovery;
pub mod external_source_merge;
pub mod format;
pub mod git_filter;
pub mod limit;
pub mod load;
pub mod metadata_injection;
pub mod ruleset_filter;
pub mod transform;

use copytree_domain::payload::PipelineOptions;
use crate::infrastructure::walker::WalkOptions;

/// Shared translation from the domain-level run options to the walker's own
/// option struct, used by both the Discovery stage and the AlwaysInclude
/// stage's supplementary walk.
pub(crate) fn walk_options_from(options: &PipelineOptions) -> WalkOptions {
    WalkOptions {
        include_hidden: options.include_hidden,
        follow_symlinks: options.follow_symlinks,
        max_depth: options.max_depth,
        max_file_size: options.max_file_size,
        max_total_size: options.max_total_size,
        max_file_count: options.max_file_count,
        respect_gitignore: options.respect_gitignore,
        concurrency: options.walker_concurrency,
        case_insensitive: crate::infrastructure::walker::ignore::platform_case_insensitive(),
    }
}
