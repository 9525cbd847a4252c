// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Plain UTF-8 box-drawing tree; no file contents at all (spec §4.6).

use super::{build_tree, render_tree_lines, FormatWriter, RenderContext};
use copytree_domain::FileRecord;

pub struct TreeWriter;

impl FormatWriter for TreeWriter {
    fn prologue(&self, files: &[FileRecord], ctx: &RenderContext) -> String {
        let tree = build_tree(files);
        let mut out = format!("{}\n", ctx.base_dir.display());
        render_tree_lines(&tree, "", &mut out);
        out
    }

    fn file_chunk(&self, _file: &FileRecord, _index: usize, _ctx: &RenderContext) -> String {
        String::new()
    }

    fn epilogue(&self, _files: &[FileRecord], _ctx: &RenderContext) -> String {
        String::new()
    }
}
