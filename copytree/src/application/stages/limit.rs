// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # LimitAndCharLimitStage (§4.1 step 6, §4.10)
//!
//! Discovery's `Budget` already enforces `max_total_size`/`max_file_count`
//! during the walk; this stage applies the one cap that can only be known
//! after `AlwaysInclude`/`ExternalSourceMerge` may have grown the list
//! further: `--char-limit`. Files are kept in their current order until the
//! running byte total (used as a character-count proxy before any text is
//! decoded) would exceed the limit; the remainder is dropped with a
//! warning recording how many were cut.

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::payload::PipelinePayload;
use copytree_domain::ports::stage::{PipelineContext, Stage};

pub struct LimitAndCharLimitStage;

#[async_trait]
impl Stage for LimitAndCharLimitStage {
    fn name(&self) -> &str {
        "limit_and_char_limit"
    }

    async fn process(&self, mut input: PipelinePayload, _ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
        let Some(limit) = input.options.char_limit else {
            return Ok(input);
        };

        let mut running = 0usize;
        let mut cut = 0usize;
        let kept: Vec<_> = input
            .files
            .into_iter()
            .filter(|file| {
                if running >= limit {
                    cut += 1;
                    return false;
                }
                running = running.saturating_add(file.size() as usize);
                true
            })
            .collect();

        if cut > 0 {
            input.warnings.push(format!("char_limit reached: {cut} file(s) dropped from the tail"));
        }
        input.files = kept;
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytree_domain::payload::PipelineOptions;
    use copytree_domain::value_objects::RelativePath;
    use copytree_domain::FileRecord;
    use std::sync::Arc;

    fn file(path: &str, size: u64) -> FileRecord {
        FileRecord::discovered(RelativePath::new(path).unwrap(), std::path::PathBuf::from(path), size, None)
    }

    #[tokio::test]
    async fn drops_tail_once_running_total_exceeds_limit() {
        let options = PipelineOptions { char_limit: Some(15), ..PipelineOptions::default() };
        let payload = copytree_domain::payload::PipelinePayload::new(std::path::PathBuf::from("/repo"), Arc::new(options))
            .with_files(vec![file("a.rs", 10), file("b.rs", 10), file("c.rs", 10)]);

        let out = LimitAndCharLimitStage.process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert_eq!(out.files.len(), 2);
        assert_eq!(out.warnings.len(), 1);
    }

    #[tokio::test]
    async fn no_limit_set_is_a_passthrough() {
        let options = PipelineOptions::default();
        let payload = copytree_domain::payload::PipelinePayload::new(std::path::PathBuf::from("/repo"), Arc::new(options))
            .with_files(vec![file("a.rs", 10)]);

        let out = LimitAndCharLimitStage.process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert_eq!(out.files.len(), 1);
        assert!(out.warnings.is_empty());
    }
}
