// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # RulesetFilterStage (§4.1 step 3, §4.3)
//!
//! Compiles `--include`/`--exclude`/`--always` into one
//! [`RulesetFilter`] and narrows `payload.files` to the accepted set.
//! `--always` patterns are folded in here too (an always-matched file
//! already present from Discovery is kept) — [`super::always_include`]
//! only has to pull back files this stage dropped.

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::payload::PipelinePayload;
use copytree_domain::ports::stage::{PipelineContext, Stage};
use copytree_domain::rules::{Rule, RulesetFilter};

pub struct RulesetFilterStage;

/// Builds a `RulesetFilter` from the run's include/exclude/always patterns,
/// each bucket compiled as one rule-set so later negations inside the same
/// bucket can override earlier matches (spec §4.3 tie-break rules).
pub(crate) fn build_filter(
    include: &[String],
    exclude: &[String],
    always: &[String],
    case_insensitive: bool,
) -> RulesetFilter {
    let mut filter = RulesetFilter::new();

    if !include.is_empty() {
        let set: Vec<Rule> = include
            .iter()
            .enumerate()
            .filter_map(|(i, p)| Rule::compile(p, "--include", i + 1, case_insensitive).ok())
            .collect();
        filter.include_sets.push(set);
    }

    filter.exclude = exclude
        .iter()
        .enumerate()
        .filter_map(|(i, p)| Rule::compile(p, "--exclude", i + 1, case_insensitive).ok())
        .collect();

    filter.always = always
        .iter()
        .enumerate()
        .filter_map(|(i, p)| Rule::compile(p, "--always", i + 1, case_insensitive).ok())
        .collect();

    filter
}

#[async_trait]
impl Stage for RulesetFilterStage {
    fn name(&self) -> &str {
        "ruleset_filter"
    }

    async fn process(&self, input: PipelinePayload, _ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
        let case_insensitive = crate::infrastructure::walker::ignore::platform_case_insensitive();
        let filter = build_filter(&input.options.include, &input.options.exclude, &input.options.always, case_insensitive);

        let files = input
            .files
            .into_iter()
            .filter(|file| filter.accept(file.relative_path().as_str(), false))
            .collect();

        Ok(input.with_files(files))
    }
}
