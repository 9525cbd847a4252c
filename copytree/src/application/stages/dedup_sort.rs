// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # DedupAndSort (§4.1 step 10, §8 properties 5-6, §9 open question)
//!
//! Two independent `Stage`s for one conceptual topology step.
//! [`DedupStage`] first drops exact `relative_path` duplicates (a safety
//! net — `ExternalSourceMerge` is the only stage that could produce one),
//! then content-hash-dedupes *text* files only: binary files are exempt
//! from content-based dedup per the resolved open question, since
//! comparing binary payloads byte-for-byte is not something the CLI's
//! dedup flag was ever meant to do. When two text files share a hash, the
//! one with the shortest `relative_path` survives (lexicographic tie
//! break). [`SortStage`] then orders the survivors by `--sort`.

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::file_record::FileContent;
use copytree_domain::payload::{PipelinePayload, SortOrder};
use copytree_domain::ports::stage::{PipelineContext, Stage};
use copytree_domain::FileRecord;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

pub struct DedupStage;

fn content_hash(file: &FileRecord) -> Option<String> {
    let text = file.content().as_text()?;
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    Some(hex::encode(hasher.finalize()))
}

#[async_trait]
impl Stage for DedupStage {
    fn name(&self) -> &str {
        "dedup"
    }

    async fn process(&self, mut input: PipelinePayload, _ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
        if !input.options.dedupe {
            return Ok(input);
        }

        let mut seen_paths = std::collections::HashSet::new();
        let files: Vec<FileRecord> = std::mem::take(&mut input.files)
            .into_iter()
            .filter(|f| seen_paths.insert(f.relative_path().as_str().to_string()))
            .collect();

        let mut by_hash: HashMap<String, Vec<FileRecord>> = HashMap::new();
        let mut passthrough: Vec<FileRecord> = Vec::new();

        for file in files {
            match content_hash(&file) {
                Some(hash) if matches!(file.content(), FileContent::Text(_)) => {
                    by_hash.entry(hash).or_default().push(file);
                }
                _ => passthrough.push(file),
            }
        }

        let mut deduped = passthrough;
        for (_, mut group) in by_hash {
            if group.len() == 1 {
                deduped.push(group.pop().unwrap());
                continue;
            }
            group.sort_by(|a, b| {
                a.relative_path()
                    .as_str()
                    .len()
                    .cmp(&b.relative_path().as_str().len())
                    .then_with(|| a.relative_path().as_str().cmp(b.relative_path().as_str()))
            });
            deduped.push(group.into_iter().next().unwrap());
        }

        input.files = deduped;
        Ok(input)
    }
}

pub struct SortStage;

#[async_trait]
impl Stage for SortStage {
    fn name(&self) -> &str {
        "sort"
    }

    async fn process(&self, mut input: PipelinePayload, _ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
        let Some(order) = input.options.sort else {
            return Ok(input);
        };

        input.files.sort_by(|a, b| match order {
            SortOrder::Path => a.relative_path().compare_path_order(b.relative_path()),
            SortOrder::Size => a.size().cmp(&b.size()),
            SortOrder::Modified => a.modified_time().cmp(&b.modified_time()),
            SortOrder::Name => file_name(a).cmp(file_name(b)),
            SortOrder::Extension => extension(a).cmp(extension(b)).then_with(|| file_name(a).cmp(file_name(b))),
            SortOrder::Depth => a.relative_path().depth().cmp(&b.relative_path().depth()).then_with(|| a.relative_path().as_str().cmp(b.relative_path().as_str())),
        });

        Ok(input)
    }
}

fn file_name(file: &FileRecord) -> &str {
    file.relative_path().as_str().rsplit('/').next().unwrap_or("")
}

fn extension(file: &FileRecord) -> &str {
    std::path::Path::new(file.relative_path().as_str())
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytree_domain::payload::PipelineOptions;
    use copytree_domain::value_objects::RelativePath;
    use std::sync::Arc;

    fn text_file(path: &str, content: &str) -> FileRecord {
        FileRecord::discovered(RelativePath::new(path).unwrap(), std::path::PathBuf::from(path), content.len() as u64, None)
            .with_content(FileContent::Text(content.to_string()), false, None)
    }

    fn binary_file(path: &str, bytes: &[u8]) -> FileRecord {
        FileRecord::discovered(RelativePath::new(path).unwrap(), std::path::PathBuf::from(path), bytes.len() as u64, None)
            .with_content(FileContent::Binary(bytes.to_vec()), true, None)
    }

    fn payload(files: Vec<FileRecord>, options: PipelineOptions) -> PipelinePayload {
        PipelinePayload::new(std::path::PathBuf::from("/repo"), Arc::new(options)).with_files(files)
    }

    #[tokio::test]
    async fn content_duplicates_keep_shortest_path() {
        let files = vec![text_file("b/long/nested.rs", "same"), text_file("a.rs", "same"), text_file("c.rs", "different")];
        let opts = PipelineOptions { dedupe: true, ..PipelineOptions::default() };
        let out = DedupStage.process(payload(files, opts), &PipelineContext::for_testing()).await.unwrap();
        assert_eq!(out.files.len(), 2);
        assert!(out.files.iter().any(|f| f.relative_path().as_str() == "a.rs"));
        assert!(out.files.iter().any(|f| f.relative_path().as_str() == "c.rs"));
    }

    #[tokio::test]
    async fn binary_files_are_exempt_from_content_dedup() {
        let files = vec![binary_file("a.bin", &[0, 1, 2]), binary_file("b.bin", &[0, 1, 2])];
        let opts = PipelineOptions { dedupe: true, ..PipelineOptions::default() };
        let out = DedupStage.process(payload(files, opts), &PipelineContext::for_testing()).await.unwrap();
        assert_eq!(out.files.len(), 2, "identical binary content must not collapse the two records");
    }

    #[tokio::test]
    async fn dedup_disabled_is_a_passthrough() {
        let files = vec![text_file("a.rs", "same"), text_file("b.rs", "same")];
        let opts = PipelineOptions { dedupe: false, ..PipelineOptions::default() };
        let out = DedupStage.process(payload(files, opts), &PipelineContext::for_testing()).await.unwrap();
        assert_eq!(out.files.len(), 2);
    }

    #[tokio::test]
    async fn sort_by_size_orders_ascending() {
        let files = vec![text_file("big.rs", "xxxxxxxxxx"), text_file("small.rs", "x")];
        let opts = PipelineOptions { sort: Some(SortOrder::Size), ..PipelineOptions::default() };
        let out = SortStage.process(payload(files, opts), &PipelineContext::for_testing()).await.unwrap();
        assert_eq!(out.files[0].relative_path().as_str(), "small.rs");
        assert_eq!(out.files[1].relative_path().as_str(), "big.rs");
    }

    #[tokio::test]
    async fn sort_by_name_ignores_directory_prefix() {
        let files = vec![text_file("z/aardvark.rs", "x"), text_file("a/zebra.rs", "x")];
        let opts = PipelineOptions { sort: Some(SortOrder::Name), ..PipelineOptions::default() };
        let out = SortStage.process(payload(files, opts), &PipelineContext::for_testing()).await.unwrap();
        assert_eq!(out.files[0].relative_path().as_str(), "z/aardvark.rs");
        assert_eq!(out.files[1].relative_path().as_str(), "a/zebra.rs");
    }

    #[tokio::test]
    async fn no_sort_order_is_a_passthrough() {
        let files = vec![text_file("b.rs", "x"), text_file("a.rs", "x")];
        let opts = PipelineOptions { sort: None, ..PipelineOptions::default() };
        let out = SortStage.process(payload(files, opts), &PipelineContext::for_testing()).await.unwrap();
        assert_eq!(out.files[0].relative_path().as_str(), "b.rs");
    }
}
