// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `{ tree, files: [{path, size, content, …}], stats }` (spec §4.6).
//! Streamed as three phases whose concatenation is itself valid JSON: the
//! prologue opens the `files` array, each chunk appends one element (with
//! its own leading comma except the first), and the epilogue closes the
//! array and appends `stats`.

use super::{build_tree, numbered_lines, FormatWriter, RenderContext, TreeNode};
use copytree_domain::file_record::FileContent;
use copytree_domain::FileRecord;
use serde_json::{json, Value};

fn tree_to_value(node: &TreeNode) -> Value {
    let mut children: Vec<&TreeNode> = node.children.iter().collect();
    children.sort_by(|a, b| a.name.cmp(&b.name));
    json!({
        "name": node.name,
        "type": if node.is_dir { "dir" } else { "file" },
        "children": children.iter().map(|c| tree_to_value(c)).collect::<Vec<_>>(),
    })
}

pub struct JsonWriter;

impl FormatWriter for JsonWriter {
    fn prologue(&self, files: &[FileRecord], ctx: &RenderContext) -> String {
        let tree = build_tree(files);
        let header = json!({ "tree": tree_to_value(&tree) });
        // Strip the trailing `}` so the prologue stays an open object that
        // the epilogue later closes.
        let rendered = serde_json::to_string_pretty(&header).unwrap_or_default();
        let opened = rendered.trim_end().trim_end_matches('}').trim_end().to_string();
        if ctx.options.only_tree {
            format!("{opened},\n  \"files\": []")
        } else {
            format!("{opened},\n  \"files\": [\n")
        }
    }

    fn file_chunk(&self, file: &FileRecord, index: usize, ctx: &RenderContext) -> String {
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
        let mut entry = json!({
            "path": file.relative_path().as_str(),
            "content": content,
        });
        if ctx.options.show_size {
            entry["size"] = json!(file.size());
        }
        let separator = if index == 0 { "" } else { ",\n" };
        format!("{separator}    {}", serde_json::to_string(&entry).unwrap_or_default())
    }

    fn epilogue(&self, files: &[FileRecord], ctx: &RenderContext) -> String {
        if ctx.options.only_tree {
            return "\n}".to_string();
        }
        format!("\n  ],\n  \"stats\": {{ \"file_count\": {} }}\n}}", files.len())
    }
}
