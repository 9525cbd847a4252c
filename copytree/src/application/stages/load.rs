// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # LoadStage (§4.1 step 7, §4.4)
//!
//! Materializes content for every `FileRecord` still `FileContent::Absent`
//! by running the registry's `loader` transformer, fanned out with bounded
//! concurrency (spec §5.1 default worker count of 5). A per-file read
//! failure is recorded on the record itself (`read_error`) rather than
//! aborting the run — it is not a pipeline-fatal condition.

use crate::infrastructure::transformers::TransformerRegistry;
use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::payload::PipelinePayload;
use copytree_domain::ports::stage::{PipelineContext, Stage};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

const LOAD_CONCURRENCY: usize = 5;

pub struct LoadStage {
    registry: Arc<TransformerRegistry>,
}

impl LoadStage {
    pub fn new(registry: Arc<TransformerRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Stage for LoadStage {
    fn name(&self) -> &str {
        "load"
    }

    async fn process(&self, mut input: PipelinePayload, _ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
        let loader = self
            .registry
            .get("loader")
            .ok_or_else(|| CopyTreeError::internal("loader transformer not registered"))?;

        let files = std::mem::take(&mut input.files);
        let loaded = stream::iter(files.into_iter())
            .map(|file| {
                let loader = Arc::clone(&loader);
                async move {
                    if file.content().is_absent() {
                        loader.transform(file).await
                    } else {
                        Ok(file)
                    }
                }
            })
            .buffer_unordered(LOAD_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        let mut files = Vec::with_capacity(loaded.len());
        for result in loaded {
            files.push(result?);
        }
        input.files = files;
        Ok(input)
    }
}
