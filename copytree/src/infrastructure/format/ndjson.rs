// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! One JSON object per line: `{"type":"meta", …}`, `{"type":"tree", …}`,
//! then one `{"type":"file", …}` line per file (spec §4.6, §6).

use super::{build_tree, numbered_lines, FormatWriter, RenderContext};
use copytree_domain::file_record::FileContent;
use copytree_domain::FileRecord;
use serde_json::json;

pub struct NdjsonWriter;

impl FormatWriter for NdjsonWriter {
    fn prologue(&self, files: &[FileRecord], ctx: &RenderContext) -> String {
        let meta = json!({ "type": "meta", "base": ctx.base_dir.display().to_string(), "file_count": files.len() });
        let tree = build_tree(files);
        let tree_line = json!({ "type": "tree", "root": tree_names(&tree) });
        format!("{}\n{}\n", serde_json::to_string(&meta).unwrap_or_default(), serde_json::to_string(&tree_line).unwrap_or_default())
    }

    fn file_chunk(&self, file: &FileRecord, _index: usize, ctx: &RenderContext) -> String {
        if ctx.options.only_tree {
            return String::new();
        }
        let content = match file.content() {
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
        let mut line = json!({
            "type": "file",
            "path": file.relative_path().as_str(),
            "content": content,
        });
        if ctx.options.show_size {
            line["size"] = json!(file.size());
        }
        format!("{}\n", serde_json::to_string(&line).unwrap_or_default())
    }

    fn epilogue(&self, _files: &[FileRecord], _ctx: &RenderContext) -> String {
        String::new()
    }
}

fn tree_names(node: &super::TreeNode) -> Vec<String> {
    let mut names: Vec<&super::TreeNode> = node.children.iter().collect();
    names.sort_by(|a, b| a.name.cmp(&b.name));
    names.iter().map(|c| c.name.clone()).collect()
}
