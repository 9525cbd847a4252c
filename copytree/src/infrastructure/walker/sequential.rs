// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Depth-first, lexicographically-sorted-per-directory traversal.
//! Deterministic across runs and platforms (spec §8 property 1).

use super::{ignore, is_hidden, is_vcs_dir, relative_of, Budget, WalkOptions, WalkOutcome, WalkWarning};
use copytree_domain::rules::{LayeredIgnore, Rule};
use copytree_domain::FileRecord;
use std::path::{Path, PathBuf};

/// Walks `root` synchronously. Intended to run inside
/// `tokio::task::spawn_blocking` — every operation here is blocking
/// filesystem I/O.
pub fn walk(root: &Path, options: &WalkOptions) -> WalkOutcome {
    let budget = Budget::new(options.max_total_size, options.max_file_count);
    let mut outcome = WalkOutcome::default();
    let layered = LayeredIgnore::new();

    if options.follow_symlinks {
        if let Ok(real) = root.canonicalize() {
            budget.mark_visited(real);
        }
    }

    visit_dir(root, root, 0, options, &budget, layered, &mut outcome);
    outcome
}

/// `layered` is owned and cloned onto each child directory call rather than
/// mutated in place: ignore layers must stay scoped to their directory and
/// its descendants, so sibling subtrees must not see each other's layers.
#[allow(clippy::too_many_arguments)]
fn visit_dir(
    root: &Path,
    dir: &Path,
    depth: usize,
    options: &WalkOptions,
    budget: &Budget,
    mut layered: LayeredIgnore,
    outcome: &mut WalkOutcome,
) {
    if let Some(max_depth) = options.max_depth {
        if depth > max_depth {
            return;
        }
    }

    let layer_rules: Vec<Rule> = if options.respect_gitignore {
        ignore::load_layer_rules(dir, ignore::DEFAULT_IGNORE_FILE_NAMES, options.case_insensitive)
    } else {
        Vec::new()
    };
    if !layer_rules.is_empty() {
        layered.push_layer(depth, layer_rules);
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            outcome.warnings.push(WalkWarning {
                path: dir.to_path_buf(),
                message: format!("unreadable directory: {err}"),
            });
            return;
        }
    };

    let mut names: Vec<(String, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .map(|e| (e.file_name().to_string_lossy().to_string(), e.path()))
        .collect();
    names.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, path) in names {
        if is_vcs_dir(&name) {
            continue;
        }
        if !options.include_hidden && is_hidden(&name) {
            continue;
        }

        let metadata = if options.follow_symlinks {
            std::fs::metadata(&path)
        } else {
            std::fs::symlink_metadata(&path)
        };
        let metadata = match metadata {
            Ok(m) => m,
            Err(err) => {
                outcome.warnings.push(WalkWarning {
                    path: path.clone(),
                    message: format!("unreadable entry: {err}"),
                });
                continue;
            }
        };

        let Some(rel) = relative_of(root, &path) else { continue };

        if metadata.is_dir() {
            if super::ignored_by_layers(&layered, rel.as_str(), true) {
                continue;
            }
            if options.follow_symlinks {
                if let Ok(real) = path.canonicalize() {
                    if !budget.mark_visited(real) {
                        continue; // symlink cycle
                    }
                }
            }
            visit_dir(root, &path, depth + 1, options, budget, layered.clone(), outcome);
        } else if metadata.is_file() || metadata.file_type().is_symlink() {
            if super::ignored_by_layers(&layered, rel.as_str(), false) {
                continue;
            }
            let size = metadata.len();
            if let Some(max_size) = options.max_file_size {
                if size > max_size {
                    continue;
                }
            }
            if !budget.try_reserve(size) {
                continue;
            }
            let modified = metadata.modified().ok().map(chrono::DateTime::<chrono::Utc>::from);
            outcome.files.push(FileRecord::discovered(rel, path, size, modified));
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn deterministic_sorted_order() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("b.txt"), "b");
        touch(&dir.path().join("a.txt"), "a");
        touch(&dir.path().join("src/app.js"), "x");

        let outcome = walk(dir.path(), &WalkOptions::default());
        let paths: Vec<String> = outcome.files.iter().map(|f| f.relative_path().as_str().to_string()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
        assert_eq!(paths.len(), 3);
    }

    #[test]
    fn vcs_dirs_are_excluded() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join(".git/config"), "x");
        touch(&dir.path().join("README.md"), "x");
        let outcome = walk(dir.path(), &WalkOptions::default());
        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].relative_path().as_str(), "README.md");
    }

    #[test]
    fn hidden_files_excluded_by_default() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join(".env"), "x");
        touch(&dir.path().join("main.rs"), "x");
        let outcome = walk(dir.path(), &WalkOptions::default());
        assert_eq!(outcome.files.len(), 1);

        let mut opts = WalkOptions::default();
        opts.include_hidden = true;
        let outcome = walk(dir.path(), &opts);
        assert_eq!(outcome.files.len(), 2);
    }

    #[test]
    fn respects_gitignore_layer() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join(".gitignore"), "*.log\n");
        touch(&dir.path().join("debug.log"), "x");
        touch(&dir.path().join("main.rs"), "x");
        let outcome = walk(dir.path(), &WalkOptions::default());
        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].relative_path().as_str(), "main.rs");
    }

    #[test]
    fn max_file_count_caps_total() {
        let dir = tempdir().unwrap();
        for i in 0..5 {
            touch(&dir.path().join(format!("f{i}.txt")), "x");
        }
        let mut opts = WalkOptions::default();
        opts.max_file_count = Some(2);
        let outcome = walk(dir.path(), &opts);
        assert_eq!(outcome.files.len(), 2);
    }
}
