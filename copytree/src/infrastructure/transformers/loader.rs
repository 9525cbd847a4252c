// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The always-applicable transformer: reads file bytes from disk,
//! classifies binary-vs-text via a null-byte heuristic over the first 8 KiB
//! (spec §4.3), and decodes text as UTF-8 with lossy replacement. Runs
//! first in every plan — every other built-in assumes content is already
//! materialized.

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::file_record::FileContent;
use copytree_domain::transformer::{Transformer, TransformerTraits};
use copytree_domain::FileRecord;
use std::sync::OnceLock;

const SNIFF_LEN: usize = 8192;

pub struct LoaderTransformer;

fn traits() -> &'static TransformerTraits {
    static TRAITS: OnceLock<TransformerTraits> = OnceLock::new();
    TRAITS.get_or_init(|| TransformerTraits {
        order_sensitive: true,
        priority: 1000,
        ..Default::default()
    })
}

#[async_trait]
impl Transformer for LoaderTransformer {
    fn name(&self) -> &str {
        "loader"
    }

    fn traits(&self) -> &TransformerTraits {
        traits()
    }

    fn can_transform(&self, file: &FileRecord) -> bool {
        file.content().is_absent()
    }

    async fn transform(&self, mut file: FileRecord) -> Result<FileRecord, CopyTreeError> {
        let path = file.absolute_path().to_path_buf();
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(err) => {
                return Ok(file.with_read_error(format!("read failed: {err}")));
            }
        };

        let is_binary = is_binary_content(&bytes);
        file = if is_binary {
            file.with_content(FileContent::Binary(bytes), true, None)
        } else {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            file.with_content(FileContent::Text(text), false, Some("utf-8".to_string()))
        };
        file.mark_transformed(self.name());
        Ok(file)
    }
}

/// Null-byte sniff over the first `SNIFF_LEN` bytes, the same heuristic
/// `file(1)` and most editors use to flag binary content.
fn is_binary_content(bytes: &[u8]) -> bool {
    bytes.iter().take(SNIFF_LEN).any(|&b| b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_null_byte_as_binary() {
        assert!(is_binary_content(&[0x00, 0x01, 0x02]));
        assert!(!is_binary_content(b"hello world"));
    }
}
