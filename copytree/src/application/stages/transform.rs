// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # TransformStage (§4.1 step 8, §4.4, §4.5)
//!
//! A no-op unless `--transform` was given. With an explicit
//! `--transformers` plan, validates it (aborting on any fatal
//! [`PlanIssue`]) and optimizes its order before applying every entry whose
//! `can_transform` accepts the file. With no explicit plan, each file gets
//! the registry's single best dispatch match (`get_for_file`) — the loader
//! itself never re-runs here since `Load` already materialized content.
//!
//! A transformer failure is a `TransformError`, recoverable by default
//! (§7): the offending file is kept untransformed rather than discarding
//! the whole stage's output, and the failure is recorded on the payload's
//! `errors`/`warnings` rather than aborting the pipeline.

use crate::infrastructure::transformers::TransformerRegistry;
use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::file_record::FileRecord;
use copytree_domain::payload::PipelinePayload;
use copytree_domain::ports::stage::{PipelineContext, Stage};
use copytree_domain::transformer::EnvironmentCapabilities;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

const TRANSFORM_CONCURRENCY: usize = 5;

pub struct TransformStage {
    registry: Arc<TransformerRegistry>,
}

impl TransformStage {
    pub fn new(registry: Arc<TransformerRegistry>) -> Self {
        Self { registry }
    }

    fn environment(&self) -> EnvironmentCapabilities {
        EnvironmentCapabilities {
            has_api_key: std::env::var("COPYTREE_AI_API_KEY").is_ok(),
            has_network: true,
            memory_class: None,
        }
    }
}

#[async_trait]
impl Stage for TransformStage {
    fn name(&self) -> &str {
        "transform"
    }

    async fn validate(&self, input: &PipelinePayload) -> Result<(), CopyTreeError> {
        if !input.options.transform || input.options.transformers.is_empty() {
            return Ok(());
        }
        let issues = self.registry.validate_plan(&input.options.transformers, &self.environment());
        let fatal: Vec<String> = issues.iter().filter(|i| i.is_fatal()).map(|i| i.message.clone()).collect();
        if !fatal.is_empty() {
            return Err(CopyTreeError::configuration(format!("invalid transformer plan: {}", fatal.join("; "))));
        }
        Ok(())
    }

    async fn process(&self, mut input: PipelinePayload, _ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
        if !input.options.transform {
            return Ok(input);
        }

        let plan: Vec<Arc<dyn copytree_domain::transformer::Transformer>> = if !input.options.transformers.is_empty() {
            let (ordered, _reasons) = self.registry.optimize_plan(&input.options.transformers);
            ordered.iter().filter_map(|name| self.registry.get(name)).collect()
        } else {
            Vec::new()
        };

        let registry = Arc::clone(&self.registry);
        let use_default_dispatch = input.options.transformers.is_empty();
        let files = std::mem::take(&mut input.files);

        let results: Vec<(FileRecord, Option<CopyTreeError>)> = stream::iter(files.into_iter())
            .map(|file| {
                let plan = plan.clone();
                let registry = Arc::clone(&registry);
                async move {
                    let original = file.clone();
                    let outcome = if use_default_dispatch {
                        match registry.get_for_file(&file) {
                            Some(t) if t.name() != "loader" && t.can_transform(&file) => t.transform(file).await,
                            _ => Ok(file),
                        }
                    } else {
                        let mut current = file;
                        let mut failed = None;
                        for transformer in &plan {
                            if transformer.can_transform(&current) {
                                match transformer.transform(current).await {
                                    Ok(next) => current = next,
                                    Err(err) => {
                                        failed = Some(err);
                                        break;
                                    }
                                }
                            }
                        }
                        match failed {
                            Some(err) => Err(err),
                            None => Ok(current),
                        }
                    };
                    match outcome {
                        Ok(transformed) => (transformed, None),
                        Err(err) => (original, Some(err)),
                    }
                }
            })
            .buffer_unordered(TRANSFORM_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        let mut files = Vec::with_capacity(results.len());
        for (file, error) in results {
            if let Some(err) = error {
                input.push_warning(format!("{}: transform failed, keeping untransformed: {err}", file.relative_path().as_str()));
                input.push_error(err);
            }
            files.push(file);
        }
        input.files = files;
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transformers::markdown::MarkdownTransformer;
    use copytree_domain::file_record::FileContent;
    use copytree_domain::payload::PipelineOptions;
    use copytree_domain::value_objects::RelativePath;
    use copytree_domain::FileRecord;

    fn registry() -> Arc<TransformerRegistry> {
        Arc::new(
            TransformerRegistry::builder()
                .register(Arc::new(MarkdownTransformer), &["md"], &["text/markdown"])
                .default_transformer("markdown")
                .build()
                .unwrap(),
        )
    }

    fn markdown_file() -> FileRecord {
        FileRecord::discovered(RelativePath::new("doc.md").unwrap(), std::path::PathBuf::from("doc.md"), 0, None)
            .with_content(FileContent::Text("# Title\n\nBody text.\n".to_string()), false, None)
    }

    #[tokio::test]
    async fn disabled_transform_is_a_passthrough() {
        let payload = PipelinePayload::new(std::path::PathBuf::from("/repo"), Arc::new(PipelineOptions::default())).with_files(vec![markdown_file()]);
        let out = TransformStage::new(registry()).process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert!(out.files[0].content().as_text().unwrap().contains("# Title"));
        assert!(!out.files[0].transformed());
    }

    #[tokio::test]
    async fn default_dispatch_applies_the_best_match_transformer() {
        let options = PipelineOptions { transform: true, ..PipelineOptions::default() };
        let payload = PipelinePayload::new(std::path::PathBuf::from("/repo"), Arc::new(options)).with_files(vec![markdown_file()]);
        let out = TransformStage::new(registry()).process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert!(out.files[0].transformed());
        assert_eq!(out.files[0].transformed_by(), &["markdown".to_string()]);
    }

    #[tokio::test]
    async fn unregistered_plan_entries_are_dropped_rather_than_applied() {
        let options = PipelineOptions { transform: true, transformers: vec!["does-not-exist".to_string()], ..PipelineOptions::default() };
        let payload = PipelinePayload::new(std::path::PathBuf::from("/repo"), Arc::new(options)).with_files(vec![markdown_file()]);
        let out = TransformStage::new(registry()).process(payload, &PipelineContext::for_testing()).await.unwrap();
        assert!(!out.files[0].transformed(), "an unresolvable plan entry must not silently fall back to default dispatch");
    }

    struct AlwaysFailsTransformer;

    #[async_trait]
    impl copytree_domain::transformer::Transformer for AlwaysFailsTransformer {
        fn name(&self) -> &str {
            "always-fails"
        }
        fn traits(&self) -> &copytree_domain::transformer::TransformerTraits {
            use std::sync::OnceLock;
            static TRAITS: OnceLock<copytree_domain::transformer::TransformerTraits> = OnceLock::new();
            TRAITS.get_or_init(copytree_domain::transformer::TransformerTraits::default)
        }
        fn can_transform(&self, _file: &FileRecord) -> bool {
            true
        }
        async fn transform(&self, _file: FileRecord) -> Result<FileRecord, CopyTreeError> {
            Err(CopyTreeError::internal("transformer exploded"))
        }
    }

    /// §7: a `TransformError` is recoverable by default. One file failing
    /// to transform must not discard the rest of the stage's output, and
    /// the offending file is kept untransformed with the failure recorded.
    #[tokio::test]
    async fn a_failing_transformer_is_recovered_and_file_kept_untransformed() {
        let registry = Arc::new(
            TransformerRegistry::builder()
                .register(Arc::new(AlwaysFailsTransformer), &["md"], &[])
                .build()
                .unwrap(),
        );
        let options = PipelineOptions { transform: true, transformers: vec!["always-fails".to_string()], ..PipelineOptions::default() };
        let payload = PipelinePayload::new(std::path::PathBuf::from("/repo"), Arc::new(options)).with_files(vec![markdown_file()]);

        let out = TransformStage::new(registry).process(payload, &PipelineContext::for_testing()).await.unwrap();

        assert_eq!(out.files.len(), 1, "the failing file must still be present in the output");
        assert!(!out.files[0].transformed(), "a failed transform must leave the file untransformed");
        assert!(out.files[0].content().as_text().unwrap().contains("# Title"), "original content must survive a transform failure");
        assert_eq!(out.errors.len(), 1, "the transform failure must be recorded on payload.errors");
        assert_eq!(out.warnings.len(), 1, "the transform failure must be recorded on payload.warnings");
    }
}
