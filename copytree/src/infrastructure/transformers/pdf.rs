// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Extracts plain text from PDF documents by shelling out to `pdftotext`
//! (poppler-utils), the same external-tool pattern the image-ocr
//! transformer uses for Tesseract (spec §4.5: "PDF text extraction").
//! Marked `heavy` since it forks a subprocess per file.

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::file_record::FileContent;
use copytree_domain::transformer::{ContentType, Transformer, TransformerTraits};
use copytree_domain::FileRecord;
use std::sync::OnceLock;
use tokio::process::Command;

pub struct PdfTransformer;

fn traits() -> &'static TransformerTraits {
    static TRAITS: OnceLock<TransformerTraits> = OnceLock::new();
    TRAITS.get_or_init(|| TransformerTraits {
        input_types: vec![ContentType::Binary],
        output_types: vec![ContentType::Text],
        heavy: true,
        ..Default::default()
    })
}

#[async_trait]
impl Transformer for PdfTransformer {
    fn name(&self) -> &str {
        "pdf"
    }

    fn traits(&self) -> &TransformerTraits {
        traits()
    }

    fn can_transform(&self, file: &FileRecord) -> bool {
        file.relative_path().as_str().to_ascii_lowercase().ends_with(".pdf")
    }

    async fn transform(&self, mut file: FileRecord) -> Result<FileRecord, CopyTreeError> {
        let output = Command::new("pdftotext")
            .arg("-layout")
            .arg(file.absolute_path())
            .arg("-")
            .output()
            .await
            .map_err(|err| CopyTreeError::transform("pdf", format!("failed to spawn pdftotext: {err}")))?;

        if !output.status.success() {
            return Ok(file.with_read_error(format!(
                "pdftotext exited with {}: {}",
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
