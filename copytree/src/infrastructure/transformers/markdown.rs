// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Normalizes fenced code block language tags to lowercase and strips a
//! trailing byte-order mark some editors still emit (spec §4.5: "markdown
//! normalization").

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::file_record::FileContent;
use copytree_domain::transformer::{ContentType, Transformer, TransformerTraits};
use copytree_domain::FileRecord;
use std::sync::OnceLock;

pub struct MarkdownTransformer;

fn traits() -> &'static TransformerTraits {
    static TRAITS: OnceLock<TransformerTraits> = OnceLock::new();
    TRAITS.get_or_init(|| TransformerTraits {
        input_types: vec![ContentType::Text],
        output_types: vec![ContentType::Text],
        ..Default::default()
    })
}

#[async_trait]
impl Transformer for MarkdownTransformer {
    fn name(&self) -> &str {
        "markdown"
    }

    fn traits(&self) -> &TransformerTraits {
        traits()
    }

    fn can_transform(&self, file: &FileRecord) -> bool {
        file.is_binary() == Some(false)
            && file
                .relative_path()
                .as_str()
                .rsplit('.')
                .next()
                .map(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"))
                .unwrap_or(false)
    }

    async fn transform(&self, mut file: FileRecord) -> Result<FileRecord, CopyTreeError> {
        let Some(text) = file.content().as_text() else {
            return Ok(file);
        };
        let normalized = normalize_fences(text.trim_start_matches('\u{feff}'));
        file = file.with_content(FileContent::Text(normalized), false, Some("utf-8".to_string()));
        file.mark_transformed(self.name());
        Ok(file)
    }
}

/// Lowercases the language tag on opening code fences (` ```Rust ` →
/// ` ```rust `) so downstream formatters get consistent syntax-highlight
/// hints regardless of source casing.
fn normalize_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_fence = false;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_end_matches('\n');
        if trimmed.trim_start().starts_with("```") {
            if !in_fence {
                let indent_len = trimmed.len() - trimmed.trim_start().len();
                let (indent, rest) = trimmed.split_at(indent_len);
                let lang = rest.trim_start_matches("```");
                out.push_str(indent);
                out.push_str("```");
                out.push_str(&lang.to_ascii_lowercase());
            } else {
                out.push_str(trimmed);
            }
            in_fence = !in_fence;
        } else {
            out.push_str(trimmed);
        }
        if line.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_fence_language() {
        let input = "text\n```Rust\nfn main() {}\n```\nmore\n";
        let out = normalize_fences(input);
        assert!(out.contains("```rust\n"));
    }

    #[test]
    fn leaves_closing_fence_untouched() {
        let input = "```js\ncode\n```\n";
        let out = normalize_fences(input);
        assert_eq!(out, "```js\ncode\n```\n");
    }
}
