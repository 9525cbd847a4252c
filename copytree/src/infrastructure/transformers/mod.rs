// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transformer registry (§4.4)
//!
//! Registers `Arc<dyn Transformer>` instances by name, dispatches by
//! extension → MIME type → default, and exposes the pure validation/plan
//! optimization logic from `copytree_domain::transformer` over the live
//! registered set.

pub mod ai_summary;
pub mod binary;
pub mod csv;
pub mod image_ocr;
pub mod loader;
pub mod markdown;
pub mod pdf;

use copytree_domain::error::CopyTreeError;
use copytree_domain::transformer::{EnvironmentCapabilities, PlanIssue, Transformer, TransformerDescriptor};
use copytree_domain::FileRecord;
use std::collections::HashMap;
use std::sync::Arc;

/// One registered transformer plus the extensions/MIME types it claims.
struct Registration {
    instance: Arc<dyn Transformer>,
    extensions: Vec<String>,
    mime_types: Vec<String>,
}

/// Holds every registered transformer, read-only after construction (spec
/// §5: "the transformer registry is read-only after initialization").
pub struct TransformerRegistry {
    entries: HashMap<String, Registration>,
    default_transformer: Option<String>,
}

impl TransformerRegistry {
    pub fn builder() -> TransformerRegistryBuilder {
        TransformerRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Transformer>> {
        self.entries.get(name).map(|r| Arc::clone(&r.instance))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Dispatch order (§4.4): exact extension map, then MIME type map, then
    /// the configured default, else `None`.
    pub fn get_for_file(&self, file: &FileRecord) -> Option<Arc<dyn Transformer>> {
        let ext = std::path::Path::new(file.relative_path().as_str())
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        if let Some(ext) = &ext {
            let mut candidates: Vec<(&str, i32)> = self
                .entries
                .iter()
                .filter(|(_, reg)| reg.extensions.iter().any(|e| e == ext))
                .map(|(name, reg)| (name.as_str(), reg.instance.traits().priority))
                .collect();
            if !candidates.is_empty() {
                candidates.sort_by(|a, b| b.1.cmp(&a.1));
                return self.get(candidates[0].0);
            }
        }

        if let Some(mime) = guess_mime(file) {
            let mut candidates: Vec<(&str, i32)> = self
                .entries
                .iter()
                .filter(|(_, reg)| reg.mime_types.iter().any(|m| m == &mime))
                .map(|(name, reg)| (name.as_str(), reg.instance.traits().priority))
                .collect();
            if !candidates.is_empty() {
                candidates.sort_by(|a, b| b.1.cmp(&a.1));
                return self.get(candidates[0].0);
            }
        }

        self.default_transformer.as_deref().and_then(|name| self.get(name))
    }

    pub fn descriptors(&self) -> HashMap<String, TransformerDescriptor> {
        self.entries
            .iter()
            .map(|(name, reg)| {
                (
                    name.clone(),
                    TransformerDescriptor {
                        name: name.clone(),
                        traits: reg.instance.traits().clone(),
                    },
                )
            })
            .collect()
    }

    pub fn validate_plan(&self, plan: &[String], env: &EnvironmentCapabilities) -> Vec<PlanIssue> {
        copytree_domain::transformer::plan::validate_plan(plan, &self.descriptors(), env)
    }

    pub fn optimize_plan(&self, plan: &[String]) -> (Vec<String>, Vec<String>) {
        copytree_domain::transformer::plan::optimize_plan(plan, &self.descriptors())
    }
}

#[derive(Default)]
pub struct TransformerRegistryBuilder {
    entries: HashMap<String, Registration>,
    default_transformer: Option<String>,
}

impl TransformerRegistryBuilder {
    pub fn register(mut self, instance: Arc<dyn Transformer>, extensions: &[&str], mime_types: &[&str]) -> Self {
        let name = instance.name().to_string();
        self.entries.insert(
            name,
            Registration {
                instance,
                extensions: extensions.iter().map(|s| s.to_lowercase()).collect(),
                mime_types: mime_types.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn default_transformer(mut self, name: impl Into<String>) -> Self {
        self.default_transformer = Some(name.into());
        self
    }

    /// Builds the registry, failing if the registered set's transitive
    /// `dependencies` graph contains a cycle (spec §4.4, §8 property 10).
    pub fn build(self) -> Result<TransformerRegistry, CopyTreeError> {
        let descriptors: HashMap<String, TransformerDescriptor> = self
            .entries
            .iter()
            .map(|(name, reg)| {
                (
                    name.clone(),
                    TransformerDescriptor {
                        name: name.clone(),
                        traits: reg.instance.traits().clone(),
                    },
                )
            })
            .collect();
        if let Some(cycle) = copytree_domain::transformer::plan::detect_cycle(&descriptors) {
            return Err(CopyTreeError::configuration(format!(
                "circular transformer dependency: {}",
                cycle.join(" -> ")
            )));
        }
        Ok(TransformerRegistry {
            entries: self.entries,
            default_transformer: self.default_transformer,
        })
    }
}

/// Builds the standard registry: loader, markdown, csv, binary, pdf,
/// image-ocr, ai-summary (spec §4.5 built-in set), with the loader as the
/// fallback default (everything can at least be loaded and classified).
/// `cache`, when given, backs the ai-summary transformer's content-hash
/// memoization (§4.7).
pub fn standard_registry(
    ai_provider: Option<Arc<dyn copytree_domain::ports::AiProvider>>,
    cache: Option<Arc<dyn copytree_domain::ports::Cache>>,
) -> Result<TransformerRegistry, CopyTreeError> {
    let mut builder = TransformerRegistry::builder()
        .register(Arc::new(loader::LoaderTransformer), &[], &[])
        .register(Arc::new(markdown::MarkdownTransformer), &["md", "markdown"], &["text/markdown"])
        .register(Arc::new(csv::CsvTransformer::default()), &["csv"], &["text/csv"])
        .register(Arc::new(binary::BinaryTransformer), &[], &[])
        .register(
            Arc::new(pdf::PdfTransformer),
            &["pdf"],
            &["application/pdf"],
        )
        .register(
            Arc::new(image_ocr::ImageOcrTransformer::default()),
            &["png", "jpg", "jpeg", "tiff", "bmp"],
            &["image/png", "image/jpeg", "image/tiff", "image/bmp"],
        )
        .default_transformer("loader");

    if let Some(provider) = ai_provider {
        let mut summary = ai_summary::AiSummaryTransformer::new(provider);
        if let Some(cache) = cache {
            summary = summary.with_cache(cache);
        }
        builder = builder.register(Arc::new(summary), &[], &[]);
    }

    builder.build()
}

/// A minimal extension→MIME lookup, used only when no exact extension
/// match claims the file (spec §4.4 dispatch step (b)).
fn guess_mime(file: &FileRecord) -> Option<String> {
    let ext = std::path::Path::new(file.relative_path().as_str())
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    let mime = match ext.as_str() {
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(mime.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_prefers_highest_priority_on_extension_tie() {
        use async_trait::async_trait;
        use copytree_domain::transformer::TransformerTraits;

        struct Low;
        #[async_trait]
        impl Transformer for Low {
            fn name(&self) -> &str {
                "low"
            }
            fn traits(&self) -> &TransformerTraits {
                static T: std::sync::OnceLock<TransformerTraits> = std::sync::OnceLock::new();
                T.get_or_init(|| TransformerTraits {
                    priority: 1,
                    ..Default::default()
                })
            }
            fn can_transform(&self, _file: &FileRecord) -> bool {
                true
            }
            async fn transform(&self, file: FileRecord) -> Result<FileRecord, CopyTreeError> {
                Ok(file)
            }
        }

        struct High;
        #[async_trait]
        impl Transformer for High {
            fn name(&self) -> &str {
                "high"
            }
            fn traits(&self) -> &TransformerTraits {
                static T: std::sync::OnceLock<TransformerTraits> = std::sync::OnceLock::new();
                T.get_or_init(|| TransformerTraits {
                    priority: 10,
                    ..Default::default()
                })
            }
            fn can_transform(&self, _file: &FileRecord) -> bool {
                true
            }
            async fn transform(&self, file: FileRecord) -> Result<FileRecord, CopyTreeError> {
                Ok(file)
            }
        }

        let registry = TransformerRegistry::builder()
            .register(Arc::new(Low), &["txt"], &[])
            .register(Arc::new(High), &["txt"], &[])
            .build()
            .unwrap();

        let file = FileRecord::discovered(
            copytree_domain::value_objects::RelativePath::new("a.txt").unwrap(),
            std::path::PathBuf::from("a.txt"),
            1,
            None,
        );
        let chosen = registry.get_for_file(&file).unwrap();
        assert_eq!(chosen.name(), "high");
    }

    #[test]
    fn detects_cycle_at_build_time() {
        use async_trait::async_trait;
        use copytree_domain::transformer::TransformerTraits;

        struct A;
        #[async_trait]
        impl Transformer for A {
            fn name(&self) -> &str {
                "a"
            }
            fn traits(&self) -> &TransformerTraits {
                static T: std::sync::OnceLock<TransformerTraits> = std::sync::OnceLock::new();
                T.get_or_init(|| TransformerTraits {
                    dependencies: vec!["b".to_string()],
                    ..Default::default()
                })
            }
            fn can_transform(&self, _file: &FileRecord) -> bool {
                true
            }
            async fn transform(&self, file: FileRecord) -> Result<FileRecord, CopyTreeError> {
                Ok(file)
            }
        }
        struct B;
        #[async_trait]
        impl Transformer for B {
            fn name(&self) -> &str {
                "b"
            }
            fn traits(&self) -> &TransformerTraits {
                static T: std::sync::OnceLock<TransformerTraits> = std::sync::OnceLock::new();
                T.get_or_init(|| TransformerTraits {
                    dependencies: vec!["a".to_string()],
                    ..Default::default()
                })
            }
            fn can_transform(&self, _file: &FileRecord) -> bool {
                true
            }
            async fn transform(&self, file: FileRecord) -> Result<FileRecord, CopyTreeError> {
                Ok(file)
            }
        }

        let result = TransformerRegistry::builder().register(Arc::new(A), &[], &[]).register(Arc::new(B), &[], &[]).build();
        assert!(result.is_err());
    }
}
