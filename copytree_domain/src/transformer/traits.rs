// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `Transformer` capability interface and its declarative `TransformerTraits`.
//!
//! Concrete transformers (loader, markdown, csv, binary, pdf, image-ocr,
//! ai-summary — see `copytree::infrastructure::transformers`) implement
//! this trait directly rather than through a base-class hierarchy (design
//! note §9: "deep inheritance of transformers" → capability interface with
//! shared helpers composed via free functions).

use crate::error::CopyTreeError;
use crate::file_record::FileRecord;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Text,
    Binary,
    Pdf,
    Image,
    Any,
}

#[derive(Debug, Clone, Default)]
pub struct Requirements {
    pub api_key: bool,
    pub network: bool,
    /// Coarse memory-class gate (e.g. "high") rather than a byte count —
    /// the registry only needs to know whether the environment satisfies
    /// it, not schedule around an exact figure.
    pub memory_class: Option<String>,
}

/// Declarative metadata about a transformer, used for registry validation
/// and plan-ordering decisions. Missing fields get the defaults noted next
/// to each (matching spec §4.4's registration normalization rules).
#[derive(Debug, Clone)]
pub struct TransformerTraits {
    pub input_types: Vec<ContentType>,  // default: [Text]
    pub output_types: Vec<ContentType>, // default: [Text]
    pub idempotent: bool,               // default: true
    pub heavy: bool,                    // default: false
    pub order_sensitive: bool,          // default: false
    pub stateful: bool,                 // default: false
    pub dependencies: Vec<String>,      // default: []
    pub conflicts_with: Vec<String>,    // default: []
    pub requirements: Requirements,
    pub tags: Vec<String>, // default: []
    pub priority: i32,     // default: 0
}

impl Default for TransformerTraits {
    fn default() -> Self {
        Self {
            input_types: vec![ContentType::Text],
            output_types: vec![ContentType::Text],
            idempotent: true,
            heavy: false,
            order_sensitive: false,
            stateful: false,
            dependencies: Vec::new(),
            conflicts_with: Vec::new(),
            requirements: Requirements::default(),
            tags: Vec::new(),
            priority: 0,
        }
    }
}

impl TransformerTraits {
    /// `true` if `self`'s declared outputs are type-compatible with
    /// `other`'s declared inputs, honoring the `Any` wildcard on either
    /// side as specified in §4.4 ("incompatible_types").
    pub fn outputs_compatible_with(&self, other: &TransformerTraits) -> bool {
        if self.output_types.contains(&ContentType::Any) || other.input_types.contains(&ContentType::Any) {
            return true;
        }
        self.output_types.iter().any(|t| other.input_types.contains(t))
    }
}

/// The capability interface every transformer implements. `can_transform`
/// is a cheap synchronous predicate; `transform` is async because several
/// built-ins (PDF extraction, OCR, AI summary) shell out or call a network
/// service.
#[async_trait]
pub trait Transformer: Send + Sync {
    fn name(&self) -> &str;
    fn traits(&self) -> &TransformerTraits;
    fn can_transform(&self, file: &FileRecord) -> bool;
    async fn transform(&self, file: FileRecord) -> Result<FileRecord, CopyTreeError>;
}
