// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # ExternalSourceMergeStage (§4.1 step 5, §4.11)
//!
//! Resolves every configured external-source entry and appends its
//! already-`destination/`-remapped files onto `payload.files`. A no-op run
//! with zero configured sources (the common case) never touches the
//! resolver or the network.

use crate::infrastructure::external_source::{ExternalSourceResolver, ExternalSourceSpec};
use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::payload::PipelinePayload;
use copytree_domain::ports::stage::{PipelineContext, Stage};

pub struct ExternalSourceMergeStage {
    resolver: ExternalSourceResolver,
    specs: Vec<ExternalSourceSpec>,
}

impl ExternalSourceMergeStage {
    pub fn new(resolver: ExternalSourceResolver, specs: Vec<ExternalSourceSpec>) -> Self {
        Self { resolver, specs }
    }
}

#[async_trait]
impl Stage for ExternalSourceMergeStage {
    fn name(&self) -> &str {
        "external_source_merge"
    }

    async fn process(&self, mut input: PipelinePayload, _ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
        if self.specs.is_empty() {
            return Ok(input);
        }

        let walk_options = super::walk_options_from(&input.options);
        let merged = self.resolver.resolve_all(&self.specs, &walk_options).await?;
        input.files.extend(merged);
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytree_domain::payload::PipelineOptions;
    use copytree_domain::ports::{GitFileChange, GitService};
    use std::sync::Arc;
    use tempfile::tempdir;

    struct UnreachableGit;

    #[async_trait]
    impl GitService for UnreachableGit {
        async fn modified_files(&self, _repo_root: &std::path::Path) -> Result<Vec<GitFileChange>, CopyTreeError> {
            unreachable!("no external sources configured, git must not be consulted")
        }

        async fn changed_files_between(&self, _repo_root: &std::path::Path, _changes: &str) -> Result<Vec<GitFileChange>, CopyTreeError> {
            unreachable!("no external sources configured, git must not be consulted")
        }

        async fn clone_or_update(&self, _url: &str, _branch: Option<&str>, _into: &std::path::PathBuf) -> Result<std::path::PathBuf, CopyTreeError> {
            unreachable!("no external sources configured, git must not be consulted")
        }
    }

    #[tokio::test]
    async fn zero_configured_sources_never_touches_the_resolver() {
        let dir = tempdir().unwrap();
        let resolver = ExternalSourceResolver::new(Arc::new(UnreachableGit), dir.path().join("cache"));
        let payload = PipelinePayload::new(dir.path().to_path_buf(), Arc::new(PipelineOptions::default()));

        let out = ExternalSourceMergeStage::new(resolver, Vec::new()).process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert!(out.files.is_empty());
    }
}
