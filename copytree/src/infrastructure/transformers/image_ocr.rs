// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Extracts text from images via Tesseract OCR, shelling out the same way
//! the PDF transformer does. Declared `heavy` and conflicting with
//! `ai-image-description` (not yet built — both would describe the same
//! image in incompatible ways, spec §4.5: "image transformer conflicts").

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::file_record::FileContent;
use copytree_domain::transformer::{ContentType, Transformer, TransformerTraits};
use copytree_domain::FileRecord;
use std::sync::OnceLock;
use tokio::process::Command;

pub struct ImageOcrTransformer {
    binary: String,
}

impl Default for ImageOcrTransformer {
    fn default() -> Self {
        Self { binary: "tesseract".to_string() }
    }
}

fn traits() -> &'static TransformerTraits {
    static TRAITS: OnceLock<TransformerTraits> = OnceLock::new();
    TRAITS.get_or_init(|| TransformerTraits {
        input_types: vec![ContentType::Image],
        output_types: vec![ContentType::Text],
        heavy: true,
        conflicts_with: vec!["image-description".to_string()],
        ..Default::default()
    })
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "bmp"];

#[async_trait]
impl Transformer for ImageOcrTransformer {
    fn name(&self) -> &str {
        "image-ocr"
    }

    fn traits(&self) -> &TransformerTraits {
        traits()
    }

    fn can_transform(&self, file: &FileRecord) -> bool {
        std::path::Path::new(file.relative_path().as_str())
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    async fn transform(&self, mut file: FileRecord) -> Result<FileRecord, CopyTreeError> {
        let output = Command::new(&self.binary)
            .arg(file.absolute_path())
            .arg("stdout")
            .output()
            .await
            .map_err(|err| CopyTreeError::transform("image-ocr", format!("failed to spawn {}: {err}", self.binary)))?;

        if !output.status.success() {
            return Ok(file.with_read_error(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        file = file.with_content(FileContent::Text(text), false, Some("utf-8".to_string()));
        file.mark_transformed(self.name());
        Ok(file)
    }
}
