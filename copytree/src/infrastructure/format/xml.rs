// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `<copytree base="…" generated="…"><tree>…</tree><files><file path="…">…</file>…</files></copytree>`
//! (spec §4.6, §6). Content is CDATA-wrapped; an embedded `]]>` is split
//! across adjacent CDATA sections so it can never terminate the section
//! early.

use super::{build_tree, numbered_lines, render_tree_lines, FormatWriter, RenderContext};
use copytree_domain::file_record::FileContent;
use copytree_domain::FileRecord;

pub struct XmlWriter;

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;").replace('>', "&gt;")
}

fn cdata(content: &str) -> String {
    format!("<![CDATA[{}]]>", content.replace("]]>", "]]]]><![CDATA[>"))
}

impl FormatWriter for XmlWriter {
    fn prologue(&self, files: &[FileRecord], ctx: &RenderContext) -> String {
        let tree = build_tree(files);
        let mut tree_lines = String::new();
        render_tree_lines(&tree, "", &mut tree_lines);

        let mut out = format!(
            "<copytree base=\"{}\" generated=\"{}\">\n<tree>\n{}</tree>\n<files>\n",
            escape_attr(&ctx.base_dir.display().to_string()),
            chrono::Utc::now().to_rfc3339(),
            tree_lines,
        );
        if let Some(instructions) = &ctx.options.instructions {
            out.push_str(&format!("<instructions>{}</instructions>\n", cdata(instructions)));
        }
        out
    }

    fn file_chunk(&self, file: &FileRecord, _index: usize, ctx: &RenderContext) -> String {
        if ctx.options.only_tree {
            return String::new();
        }
        let mut attrs = format!("path=\"{}\"", escape_attr(file.relative_path().as_str()));
        if ctx.options.show_size {
            attrs.push_str(&format!(" size=\"{}\"", file.size()));
        }

        let body = match file.content() {
            FileContent::Text(text) => {
                let rendered = if ctx.options.add_line_numbers { numbered_lines(text) } else { text.clone() };
                cdata(&rendered)
            }
            FileContent::Binary(bytes) => cdata(&format!("[binary, {} bytes]", bytes.len())),
            FileContent::Absent => cdata(""),
        };
        format!("<file {attrs}>{body}</file>\n")
    }

    fn epilogue(&self, _files: &[FileRecord], _ctx: &RenderContext) -> String {
        "</files>\n</copytree>".to_string()
    }
}
