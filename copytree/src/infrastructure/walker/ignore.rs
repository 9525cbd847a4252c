// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Named ignore-file discovery (`.copytreeignore`, `.gitignore`, ...). Each
//! directory visited by the walker contributes at most one layer per ignore
//! file name; `copytree_domain::rules::LayeredIgnore` evaluates them
//! deepest-first once the walk completes.

use copytree_domain::rules::Rule;
use std::path::Path;

/// The default ignore-file names consulted while walking, in the order
/// they are read (later names do not override earlier ones — all
/// contribute rules to the same layer for their directory).
pub const DEFAULT_IGNORE_FILE_NAMES: &[&str] = &[".gitignore", ".copytreeignore"];

/// VCS directories excluded from traversal unconditionally (spec §4.2).
pub const VCS_DIR_NAMES: &[&str] = &[".git", ".hg", ".svn"];

/// Reads and compiles every ignore file named in `file_names` that exists
/// directly inside `dir`, returning the combined rule set for that single
/// directory (empty if none exist or none parsed).
pub fn load_layer_rules(dir: &Path, file_names: &[&str], case_insensitive: bool) -> Vec<Rule> {
    let mut rules = Vec::new();
    for file_name in file_names {
        let path = dir.join(file_name);
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Ok(rule) = Rule::compile(line, *file_name, idx + 1, case_insensitive) {
                rules.push(rule);
            }
        }
    }
    rules
}

/// Whether the filesystem this path lives on is conventionally
/// case-insensitive (spec §4.3: Windows/macOS).
pub fn platform_case_insensitive() -> bool {
    cfg!(target_os = "windows") || cfg!(target_os = "macos")
}
