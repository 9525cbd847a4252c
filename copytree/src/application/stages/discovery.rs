// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # DiscoveryStage (§4.1 step 1, §4.2)
//!
//! Walks `payload.base_dir` into `payload.files`, choosing the sequential or
//! parallel walker by `walker_concurrency`. This is the only stage that
//! touches the filesystem tree shape; every later stage only filters or
//! annotates the list this one produces.

use super::walk_options_from;
use crate::infrastructure::walker::{parallel, sequential};
use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::events::PipelineEvent;
use copytree_domain::payload::PipelinePayload;
use copytree_domain::ports::stage::{PipelineContext, Stage};

pub struct DiscoveryStage;

#[async_trait]
impl Stage for DiscoveryStage {
    fn name(&self) -> &str {
        "discovery"
    }

    async fn process(&self, input: PipelinePayload, ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
        let options = walk_options_from(&input.options);
        let base_dir = input.base_dir.clone();

        let outcome = if options.concurrency > 1 {
            tokio::task::spawn_blocking(move || parallel::walk(&base_dir, &options))
                .await
                .map_err(|err| CopyTreeError::internal(format!("discovery walker task panicked: {err}")))?
        } else {
            tokio::task::spawn_blocking(move || sequential::walk(&base_dir, &options))
                .await
                .map_err(|err| CopyTreeError::internal(format!("discovery walker task panicked: {err}")))?
        };

        let total = outcome.files.len();
        let mut payload = input.with_files(outcome.files);
        for warning in outcome.warnings {
            payload.push_warning(format!("{}: {}", warning.path.display(), warning.message));
        }
        ctx.events.emit(PipelineEvent::FileBatch { processed: total, total });
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytree_domain::payload::PipelineOptions;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn walks_the_base_dir_into_file_records() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}\n").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.rs"), "fn helper() {}\n").unwrap();

        let payload = copytree_domain::payload::PipelinePayload::new(dir.path().to_path_buf(), Arc::new(PipelineOptions::default()));
        let out = DiscoveryStage.process(payload, &PipelineContext::for_testing()).await.unwrap();

        let paths: Vec<&str> = out.files.iter().map(|f| f.relative_path().as_str()).collect();
        assert!(paths.contains(&"a.rs"));
        assert!(paths.contains(&"sub/b.rs"));
    }

    #[tokio::test]
    async fn empty_directory_yields_no_files() {
        let dir = tempdir().unwrap();
        let payload = copytree_domain::payload::PipelinePayload::new(dir.path().to_path_buf(), Arc::new(PipelineOptions::default()));
        let out = DiscoveryStage.process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert!(out.files.is_empty());
    }
}
