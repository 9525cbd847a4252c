// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # GitFilterStage (§4.1 step 2, §4.8)
//!
//! A no-op unless `--modified` or `--changes` was given. When either is
//! set, narrows `payload.files` to the changed set reported by
//! [`GitService`] and, when `with_git_status` is also requested, tags every
//! surviving record with its [`GitStatus`]. Deleted paths are dropped
//! outright — there is nothing left on disk for later stages to load.

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::file_record::GitStatus;
use copytree_domain::payload::PipelinePayload;
use copytree_domain::ports::stage::{PipelineContext, Stage};
use copytree_domain::ports::{parse_changes_spec, GitFileStatus, GitService};
use std::collections::HashMap;
use std::sync::Arc;

pub struct GitFilterStage {
    git: Arc<dyn GitService>,
}

impl GitFilterStage {
    pub fn new(git: Arc<dyn GitService>) -> Self {
        Self { git }
    }
}

fn to_domain_status(status: GitFileStatus) -> GitStatus {
    match status {
        GitFileStatus::Modified => GitStatus::Modified,
        GitFileStatus::Untracked => GitStatus::Untracked,
        GitFileStatus::Staged => GitStatus::Staged,
        GitFileStatus::Deleted => GitStatus::Deleted,
    }
}

#[async_trait]
impl Stage for GitFilterStage {
    fn name(&self) -> &str {
        "git_filter"
    }

    async fn validate(&self, input: &PipelinePayload) -> Result<(), CopyTreeError> {
        if input.options.modified_only && input.options.changes.is_some() {
            return Err(CopyTreeError::configuration("--modified and --changes are mutually exclusive"));
        }
        Ok(())
    }

    async fn process(&self, input: PipelinePayload, _ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
        if !input.options.modified_only && input.options.changes.is_none() {
            return Ok(input);
        }

        let changes = if let Some(changes) = &input.options.changes {
            let (from, to) = parse_changes_spec(changes)?;
            self.git
                .changed_files_between(&input.base_dir, &format!("{from}:{to}"))
                .await?
        } else {
            self.git.modified_files(&input.base_dir).await?
        };

        let by_path: HashMap<String, GitFileStatus> = changes
            .into_iter()
            .filter(|c| c.status != GitFileStatus::Deleted)
            .map(|c| (c.relative_path, c.status))
            .collect();

        let with_git_status = input.options.with_git_status;
        let files = input
            .files
            .into_iter()
            .filter_map(|file| {
                let status = by_path.get(file.relative_path().as_str())?;
                Some(if with_git_status {
                    file.with_git_status(to_domain_status(*status))
                } else {
                    file
                })
            })
            .collect();

        Ok(input.with_files(files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytree_domain::payload::PipelineOptions;
    use copytree_domain::ports::GitFileChange;
    use copytree_domain::value_objects::RelativePath;
    use copytree_domain::FileRecord;
    use std::sync::Arc;

    struct FakeGit(Vec<GitFileChange>);

    #[async_trait]
    impl GitService for FakeGit {
        async fn modified_files(&self, _repo_root: &std::path::Path) -> Result<Vec<GitFileChange>, CopyTreeError> {
            Ok(self.0.clone())
        }

        async fn changed_files_between(&self, _repo_root: &std::path::Path, _changes: &str) -> Result<Vec<GitFileChange>, CopyTreeError> {
            Ok(self.0.clone())
        }

        async fn clone_or_update(&self, _url: &str, _branch: Option<&str>, into: &std::path::PathBuf) -> Result<std::path::PathBuf, CopyTreeError> {
            Ok(into.clone())
        }
    }

    fn file(path: &str) -> FileRecord {
        FileRecord::discovered(RelativePath::new(path).unwrap(), std::path::PathBuf::from(path), 0, None)
    }

    #[tokio::test]
    async fn modified_only_narrows_to_changed_files_and_tags_status() {
        let git: Arc<dyn GitService> = Arc::new(FakeGit(vec![GitFileChange { relative_path: "a.rs".to_string(), status: GitFileStatus::Modified }]));
        let options = PipelineOptions { modified_only: true, with_git_status: true, ..PipelineOptions::default() };
        let payload = copytree_domain::payload::PipelinePayload::new(std::path::PathBuf::from("/repo"), Arc::new(options))
            .with_files(vec![file("a.rs"), file("b.rs")]);

        let out = GitFilterStage::new(git).process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert_eq!(out.files.len(), 1);
        assert_eq!(out.files[0].git_status(), Some(GitStatus::Modified));
    }

    #[tokio::test]
    async fn deleted_paths_are_dropped() {
        let git: Arc<dyn GitService> = Arc::new(FakeGit(vec![GitFileChange { relative_path: "a.rs".to_string(), status: GitFileStatus::Deleted }]));
        let options = PipelineOptions { modified_only: true, ..PipelineOptions::default() };
        let payload = copytree_domain::payload::PipelinePayload::new(std::path::PathBuf::from("/repo"), Arc::new(options)).with_files(vec![file("a.rs")]);

        let out = GitFilterStage::new(git).process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert!(out.files.is_empty());
    }

    #[tokio::test]
    async fn modified_and_changes_together_fail_validation() {
        let git: Arc<dyn GitService> = Arc::new(FakeGit(vec![]));
        let options = PipelineOptions { modified_only: true, changes: Some("main:HEAD".to_string()), ..PipelineOptions::default() };
        let payload = copytree_domain::payload::PipelinePayload::new(std::path::PathBuf::from("/repo"), Arc::new(options));

        let err = GitFilterStage::new(git).validate(&payload).await.unwrap_err();
        assert!(matches!(err, CopyTreeError::Configuration(_)));
    }

    #[tokio::test]
    async fn neither_modified_nor_changes_is_a_passthrough() {
        let git: Arc<dyn GitService> = Arc::new(FakeGit(vec![]));
        let payload = copytree_domain::payload::PipelinePayload::new(std::path::PathBuf::from("/repo"), Arc::new(PipelineOptions::default()))
            .with_files(vec![file("a.rs")]);

        let out = GitFilterStage::new(git).process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert_eq!(out.files.len(), 1);
    }
}
