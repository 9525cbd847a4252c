// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # AlwaysIncludeStage (§4.1 step 4, §4.3, §9 open question)
//!
//! `--always` patterns must win even over files `RulesetFilterStage` or the
//! walker's own gitignore layering already dropped, so this stage re-walks
//! `base_dir` with gitignore/hidden-file exclusion disabled, keeps only
//! entries matching an `--always` glob, and merges any not already present
//! in `payload.files` by `relative_path`. The original discovery budget
//! (size/count caps) still applies — always-include pulls files back from
//! under exclusion, not past the run's resource limits.

use super::walk_options_from;
use crate::infrastructure::walker::sequential;
use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::payload::PipelinePayload;
use copytree_domain::ports::stage::{PipelineContext, Stage};
use copytree_domain::rules::Rule;
use std::collections::HashSet;

pub struct AlwaysIncludeStage;

#[async_trait]
impl Stage for AlwaysIncludeStage {
    fn name(&self) -> &str {
        "always_include"
    }

    async fn process(&self, mut input: PipelinePayload, _ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
        if input.options.always.is_empty() {
            return Ok(input);
        }

        let mut options = walk_options_from(&input.options);
        options.respect_gitignore = false;
        options.include_hidden = true;

        let case_insensitive = options.case_insensitive;
        let always_rules: Vec<Rule> = input
            .options
            .always
            .iter()
            .enumerate()
            .filter_map(|(i, p)| Rule::compile(p, "--always", i + 1, case_insensitive).ok())
            .collect();

        let base_dir = input.base_dir.clone();
        let outcome = tokio::task::spawn_blocking(move || sequential::walk(&base_dir, &options))
            .await
            .map_err(|err| CopyTreeError::internal(format!("always-include walker task panicked: {err}")))?;

        let mut files = std::mem::take(&mut input.files);
        let mut present: HashSet<String> = files.iter().map(|f| f.relative_path().as_str().to_string()).collect();

        for file in outcome.files {
            let path = file.relative_path().as_str();
            if present.contains(path) {
                continue;
            }
            if always_rules.iter().any(|r| r.matches(path, false)) {
                present.insert(path.to_string());
                files.push(file);
            }
        }

        Ok(input.with_files(files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytree_domain::payload::PipelineOptions;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn always_pattern_pulls_back_a_gitignored_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "secrets.env\n").unwrap();
        std::fs::write(dir.path().join("secrets.env"), "KEY=1\n").unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();

        let options = PipelineOptions { always: vec!["secrets.env".to_string()], respect_gitignore: true, ..PipelineOptions::default() };
        let payload = copytree_domain::payload::PipelinePayload::new(dir.path().to_path_buf(), Arc::new(options));

        let out = AlwaysIncludeStage.process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert!(out.files.iter().any(|f| f.relative_path().as_str() == "secrets.env"));
    }

    #[tokio::test]
    async fn already_present_files_are_not_duplicated() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}\n").unwrap();

        let options = PipelineOptions { always: vec!["a.rs".to_string()], ..PipelineOptions::default() };
        let existing = copytree_domain::file_record::FileRecord::discovered(
            copytree_domain::value_objects::RelativePath::new("a.rs").unwrap(),
            dir.path().join("a.rs"),
            0,
            None,
        );
        let payload = copytree_domain::payload::PipelinePayload::new(dir.path().to_path_buf(), Arc::new(options)).with_files(vec![existing]);

        let out = AlwaysIncludeStage.process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert_eq!(out.files.len(), 1);
    }

    #[tokio::test]
    async fn empty_always_list_is_a_passthrough() {
        let dir = tempdir().unwrap();
        let options = PipelineOptions::default();
        let payload = copytree_domain::payload::PipelinePayload::new(dir.path().to_path_buf(), Arc::new(options));
        let out = AlwaysIncludeStage.process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert!(out.files.is_empty());
    }
}
