// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Replaces binary file content with a one-line placeholder so formatters
//! never have to special-case raw bytes (spec §4.5: "binary placeholder").
//! Runs on anything the loader marked `is_binary == true` that no more
//! specific transformer (pdf, image-ocr) has already claimed.

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::file_record::FileContent;
use copytree_domain::transformer::{ContentType, Transformer, TransformerTraits};
use copytree_domain::value_objects::MetadataValue;
use copytree_domain::FileRecord;
use std::sync::OnceLock;

pub struct BinaryTransformer;

fn traits() -> &'static TransformerTraits {
    static TRAITS: OnceLock<TransformerTraits> = OnceLock::new();
    TRAITS.get_or_init(|| TransformerTraits {
        input_types: vec![ContentType::Binary],
        output_types: vec![ContentType::Text],
        priority: -10,
        ..Default::default()
    })
}

#[async_trait]
impl Transformer for BinaryTransformer {
    fn name(&self) -> &str {
        "binary"
    }

    fn traits(&self) -> &TransformerTraits {
        traits()
    }

    fn can_transform(&self, file: &FileRecord) -> bool {
        file.is_binary() == Some(true)
    }

    async fn transform(&self, mut file: FileRecord) -> Result<FileRecord, CopyTreeError> {
        let size = file.size();
        file.insert_metadata("binary.byteSize", MetadataValue::Integer(size as i64));
        file = file.with_content(FileContent::Text(format!("[binary file, {size} bytes]")), false, None);
        file.mark_transformed(self.name());
        Ok(file)
    }
}
