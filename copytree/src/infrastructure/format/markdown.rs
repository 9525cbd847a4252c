// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! YAML front-matter, a fenced tree block, then per-file blocks bracketed
//! by `copytree:file-begin`/`copytree:file-end` HTML comments carrying
//! `path="@<relativePath>"`. An `instructions` block, when present, is
//! bracketed the same way (spec §4.6, §6).

use super::{build_tree, fence_language, numbered_lines, render_tree_lines, FormatWriter, RenderContext};
use copytree_domain::file_record::FileContent;
use copytree_domain::FileRecord;

pub struct MarkdownWriter;

impl FormatWriter for MarkdownWriter {
    fn prologue(&self, files: &[FileRecord], ctx: &RenderContext) -> String {
        let tree = build_tree(files);
        let mut tree_lines = String::new();
        render_tree_lines(&tree, "", &mut tree_lines);

        let mut out = format!(
            "---\nbase: {}\ngenerated: {}\nfile_count: {}\n---\n\n```text\n{}```\n\n",
            ctx.base_dir.display(),
            chrono::Utc::now().to_rfc3339(),
            files.len(),
            tree_lines,
        );

        if let Some(instructions) = &ctx.options.instructions {
            out.push_str("<!-- copytree:instructions-begin -->\n");
            out.push_str(instructions);
            out.push_str("\n<!-- copytree:instructions-end -->\n\n");
        }
        out
    }

    fn file_chunk(&self, file: &FileRecord, _index: usize, ctx: &RenderContext) -> String {
        if ctx.options.only_tree {
            return String::new();
        }
        let path = file.relative_path().as_str();
        let lang = fence_language(path).unwrap_or("");

        let body = match file.content() {
            FileContent::Text(text) => {
                if ctx.options.add_line_numbers {
                    numbered_lines(text)
                } else {
                    text.clone()
                }
            }
            FileContent::Binary(bytes) => format!("[binary, {} bytes]", bytes.len()),
            FileContent::Absent => String::new(),
        };

        format!(
            "<!-- copytree:file-begin path=\"@{path}\" -->\n```{lang}\n{body}\n```\n<!-- copytree:file-end path=\"@{path}\" -->\n\n"
        )
    }

    fn epilogue(&self, _files: &[FileRecord], _ctx: &RenderContext) -> String {
        String::new()
    }
}
