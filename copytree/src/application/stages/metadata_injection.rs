// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # MetadataInjectionStage (§4.1 step 9, §4.6)
//!
//! Enriches `package.json`/`composer.json` records with package metadata
//! (`name`, `version`, `description`) parsed straight from their own
//! content, so the Format stage can surface it without re-reading the
//! manifest. Every other file passes through untouched — this stage never
//! fails the run; a malformed manifest just gets skipped.

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::payload::PipelinePayload;
use copytree_domain::ports::stage::{PipelineContext, Stage};
use copytree_domain::value_objects::MetadataValue;
use copytree_domain::FileRecord;

pub struct MetadataInjectionStage;

fn manifest_kind(file: &FileRecord) -> Option<&'static str> {
    match file.relative_path().as_str().rsplit('/').next()? {
        "package.json" => Some("npm"),
        "composer.json" => Some("composer"),
        _ => None,
    }
}

fn inject(file: &mut FileRecord, kind: &str) {
    let Some(text) = file.content().as_text() else { return };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else { return };

    file.insert_metadata("package_manager", MetadataValue::String(kind.to_string()));
    for field in ["name", "version", "description"] {
        if let Some(s) = value.get(field).and_then(|v| v.as_str()) {
            file.insert_metadata(field, MetadataValue::String(s.to_string()));
        }
    }
}

#[async_trait]
impl Stage for MetadataInjectionStage {
    fn name(&self) -> &str {
        "metadata_injection"
    }

    async fn process(&self, mut input: PipelinePayload, _ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
        for file in &mut input.files {
            if let Some(kind) = manifest_kind(file) {
                inject(file, kind);
            }
        }
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytree_domain::file_record::FileContent;
    use copytree_domain::payload::PipelineOptions;
    use copytree_domain::value_objects::RelativePath;
    use std::sync::Arc;

    fn manifest(path: &str, json: &str) -> FileRecord {
        FileRecord::discovered(RelativePath::new(path).unwrap(), std::path::PathBuf::from(path), json.len() as u64, None)
            .with_content(FileContent::Text(json.to_string()), false, None)
    }

    #[tokio::test]
    async fn package_json_fields_are_injected_as_metadata() {
        let file = manifest("package.json", r#"{"name": "copytree", "version": "0.1.0"}"#);
        let payload = copytree_domain::payload::PipelinePayload::new(std::path::PathBuf::from("/repo"), Arc::new(PipelineOptions::default())).with_files(vec![file]);

        let out = MetadataInjectionStage.process(payload, &PipelineContext::for_testing()).await.unwrap();
        let metadata = out.files[0].metadata();
        assert_eq!(metadata.get("name").and_then(|v| v.as_str()), Some("copytree"));
        assert_eq!(metadata.get("package_manager").and_then(|v| v.as_str()), Some("npm"));
    }

    #[tokio::test]
    async fn malformed_manifest_is_skipped_without_failing_the_stage() {
        let file = manifest("package.json", "not json");
        let payload = copytree_domain::payload::PipelinePayload::new(std::path::PathBuf::from("/repo"), Arc::new(PipelineOptions::default())).with_files(vec![file]);

        let out = MetadataInjectionStage.process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert!(out.files[0].metadata().is_empty());
    }

    #[tokio::test]
    async fn unrelated_files_are_untouched() {
        let file = manifest("src/lib.rs", "fn main() {}");
        let payload = copytree_domain::payload::PipelinePayload::new(std::path::PathBuf::from("/repo"), Arc::new(PipelineOptions::default())).with_files(vec![file]);

        let out = MetadataInjectionStage.process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert!(out.files[0].metadata().is_empty());
    }
}
