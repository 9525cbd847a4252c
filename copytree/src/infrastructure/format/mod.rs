// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Streaming output formatters (§4.6)
//!
//! Each format writer implements a three-phase contract — prologue, one
//! chunk per file, epilogue — so [`render`] (full buffer) and
//! [`stream_chunks`] (one chunk at a time) are guaranteed to produce
//! byte-identical output: `render` is defined as the concatenation of
//! `stream_chunks`, never an independent code path.

pub mod json;
pub mod markdown;
pub mod ndjson;
pub mod sarif;
pub mod tree;
pub mod xml;

use copytree_domain::payload::PipelineOptions;
use copytree_domain::ports::secrets::SecretFinding;
use copytree_domain::FileRecord;
use std::path::Path;

/// Everything a writer needs beyond the file list itself.
pub struct RenderContext<'a> {
    pub base_dir: &'a Path,
    pub options: &'a PipelineOptions,
    pub secret_findings: &'a [SecretFinding],
}

/// One node of the directory tree assembled from every file's
/// `relative_path`, shared by every format that renders a tree block.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub is_dir: bool,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn root() -> Self {
        Self { name: String::new(), is_dir: true, children: Vec::new() }
    }

    fn child_mut(&mut self, name: &str, is_dir: bool) -> &mut TreeNode {
        if let Some(pos) = self.children.iter().position(|c| c.name == name) {
            return &mut self.children[pos];
        }
        self.children.push(TreeNode { name: name.to_string(), is_dir, children: Vec::new() });
        self.children.last_mut().unwrap()
    }
}

/// Builds the directory tree for `files`, in the order given (callers sort
/// first if a deterministic tree is required).
pub fn build_tree(files: &[FileRecord]) -> TreeNode {
    let mut root = TreeNode::root();
    for file in files {
        let segments: Vec<&str> = file.relative_path().as_str().split('/').collect();
        let mut node = &mut root;
        for (i, segment) in segments.iter().enumerate() {
            let is_last = i == segments.len() - 1;
            node = node.child_mut(segment, !is_last);
        }
    }
    root
}

/// One begin/content/end chunk, or a prologue/epilogue chunk with no file.
pub trait FormatWriter: Send + Sync {
    fn prologue(&self, files: &[FileRecord], ctx: &RenderContext) -> String;
    fn file_chunk(&self, file: &FileRecord, index: usize, ctx: &RenderContext) -> String;
    fn epilogue(&self, files: &[FileRecord], ctx: &RenderContext) -> String;
}

/// Non-streaming rendering: the full artifact in one buffer.
pub fn render(writer: &dyn FormatWriter, files: &[FileRecord], ctx: &RenderContext) -> Vec<u8> {
    stream_chunks(writer, files, ctx).concat().into_bytes()
}

/// Streaming rendering: prologue, then one chunk per file, then epilogue.
/// `render` is defined purely in terms of this so the two can never drift.
pub fn stream_chunks<'a>(writer: &'a dyn FormatWriter, files: &'a [FileRecord], ctx: &'a RenderContext<'a>) -> Vec<String> {
    let mut chunks = Vec::with_capacity(files.len() + 2);
    chunks.push(writer.prologue(files, ctx));
    for (index, file) in files.iter().enumerate() {
        chunks.push(writer.file_chunk(file, index, ctx));
    }
    chunks.push(writer.epilogue(files, ctx));
    chunks
}

/// Dispatches to the writer selected by `options.format`, fully rendering
/// the artifact as bytes.
pub fn render_for_format(files: &[FileRecord], ctx: &RenderContext) -> Vec<u8> {
    use copytree_domain::payload::OutputFormat;
    match ctx.options.format {
        OutputFormat::Xml => render(&xml::XmlWriter, files, ctx),
        OutputFormat::Json => render(&json::JsonWriter, files, ctx),
        OutputFormat::Markdown => render(&markdown::MarkdownWriter, files, ctx),
        OutputFormat::Tree => render(&tree::TreeWriter, files, ctx),
        OutputFormat::Ndjson => render(&ndjson::NdjsonWriter, files, ctx),
        OutputFormat::Sarif => render(&sarif::SarifWriter, files, ctx),
    }
}

/// Maps a file extension to a Markdown fenced-code-block language tag
/// (spec §4.6); `None` means "no language tag".
pub(crate) fn fence_language(relative_path: &str) -> Option<&'static str> {
    let ext = Path::new(relative_path).extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "js" => "js",
        "css" => "css",
        "json" => "json",
        "yml" | "yaml" => "yaml",
        "py" => "python",
        "go" => "go",
        "rs" => "rust",
        "sh" => "bash",
        "txt" => "text",
        _ => return None,
    })
}

/// Prefixes each line with a 1-based line number, right-aligned to the
/// total line count's width (`--add-line-numbers`).
pub(crate) fn numbered_lines(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let width = lines.len().max(1).to_string().len();
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}  {line}", i + 1, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders box-drawing lines for `node`'s children, recursively, matching
/// the conventional `├──`/`└──`/`│   `/`    ` prefixes.
pub(crate) fn render_tree_lines(node: &TreeNode, prefix: &str, out: &mut String) {
    let mut children = node.children.clone();
    children.sort_by(|a, b| a.name.cmp(&b.name));
    let count = children.len();
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == count;
        let connector = if last { "└── " } else { "├── " };
        out.push_str(prefix);
        out.push_str(connector);
        out.push_str(&child.name);
        out.push('\n');
        let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
        render_tree_lines(child, &child_prefix, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytree_domain::file_record::FileContent;
    use copytree_domain::payload::{OutputFormat, PipelineOptions};
    use copytree_domain::value_objects::RelativePath;
    use std::path::PathBuf;

    fn file(path: &str, text: &str) -> FileRecord {
        FileRecord::discovered(RelativePath::new(path).unwrap(), PathBuf::from(path), text.len() as u64, None)
            .with_content(FileContent::Text(text.to_string()), false, None)
    }

    fn files() -> Vec<FileRecord> {
        vec![file("src/lib.rs", "fn main() {}\n"), file("README.md", "# hello\n"), file("src/bin/tool.rs", "fn main() {}\n")]
    }

    fn options(format: OutputFormat) -> PipelineOptions {
        PipelineOptions { format, ..PipelineOptions::default() }
    }

    /// §8 property 7: `render` must equal the concatenation of
    /// `stream_chunks`, for every writer, not just by construction but as a
    /// regression guard if a writer is ever rewritten to bypass `render`.
    fn assert_streaming_matches(writer: &dyn FormatWriter, format: OutputFormat) {
        let files = files();
        let base_dir = PathBuf::from("/repo");
        let opts = options(format);
        let ctx = RenderContext { base_dir: &base_dir, options: &opts, secret_findings: &[] };
        let full = render(writer, &files, &ctx);
        let streamed: String = stream_chunks(writer, &files, &ctx).concat();
        assert_eq!(full, streamed.into_bytes());
    }

    #[test]
    fn xml_streaming_matches_full_render() {
        assert_streaming_matches(&xml::XmlWriter, OutputFormat::Xml);
    }

    #[test]
    fn json_streaming_matches_full_render() {
        assert_streaming_matches(&json::JsonWriter, OutputFormat::Json);
    }

    #[test]
    fn markdown_streaming_matches_full_render() {
        assert_streaming_matches(&markdown::MarkdownWriter, OutputFormat::Markdown);
    }

    #[test]
    fn tree_streaming_matches_full_render() {
        assert_streaming_matches(&tree::TreeWriter, OutputFormat::Tree);
    }

    #[test]
    fn ndjson_streaming_matches_full_render() {
        assert_streaming_matches(&ndjson::NdjsonWriter, OutputFormat::Ndjson);
    }

    #[test]
    fn sarif_streaming_matches_full_render() {
        assert_streaming_matches(&sarif::SarifWriter, OutputFormat::Sarif);
    }

    #[test]
    fn render_for_format_dispatches_to_selected_writer() {
        let files = files();
        let base_dir = PathBuf::from("/repo");
        let xml_opts = options(OutputFormat::Xml);
        let xml_ctx = RenderContext { base_dir: &base_dir, options: &xml_opts, secret_findings: &[] };
        let xml_bytes = render_for_format(&files, &xml_ctx);
        assert!(String::from_utf8(xml_bytes).unwrap().starts_with("<copytree"));

        let json_opts = options(OutputFormat::Json);
        let json_ctx = RenderContext { base_dir: &base_dir, options: &json_opts, secret_findings: &[] };
        let json_bytes = render_for_format(&files, &json_ctx);
        serde_json::from_slice::<serde_json::Value>(&json_bytes).expect("json writer must emit valid JSON");
    }

    #[test]
    fn build_tree_groups_siblings_under_shared_directories() {
        let tree = build_tree(&files());
        let src = tree.children.iter().find(|c| c.name == "src").expect("src dir present");
        assert!(src.is_dir);
        assert_eq!(src.children.len(), 2);
    }

    #[test]
    fn numbered_lines_right_aligns_to_total_width() {
        let text = "a\nb\nc\nd\ne\nf\ng\nh\ni\nj";
        let out = numbered_lines(text);
        assert!(out.lines().next().unwrap().starts_with(" 1  a"));
        assert!(out.lines().last().unwrap().starts_with("10  j"));
    }

    #[test]
    fn fence_language_maps_known_extensions_and_falls_back_to_none() {
        assert_eq!(fence_language("src/lib.rs"), Some("rust"));
        assert_eq!(fence_language("Makefile"), None);
    }
}
