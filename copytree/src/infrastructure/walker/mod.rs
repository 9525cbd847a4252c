// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File discovery walker (§4.2)
//!
//! Two implementations sharing one output contract: [`sequential::walk`]
//! (deterministic, depth-first, lexicographically sorted per directory) and
//! [`parallel::walk`] (bounded worker pool over a `crossbeam::deque` work
//! queue; emission order is not guaranteed). Both emit path-and-stat-only
//! `FileRecord`s — content is materialized later, by the Load stage.

pub mod ignore;
pub mod parallel;
pub mod sequential;

use copytree_domain::rules::LayeredIgnore;
use copytree_domain::value_objects::RelativePath;
use copytree_domain::FileRecord;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Options shared by both walker implementations, translated from
/// `copytree_domain::PipelineOptions` by the Discovery stage.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub include_hidden: bool,
    pub follow_symlinks: bool,
    pub max_depth: Option<usize>,
    pub max_file_size: Option<u64>,
    pub max_total_size: Option<u64>,
    pub max_file_count: Option<usize>,
    pub respect_gitignore: bool,
    pub concurrency: usize,
    pub case_insensitive: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            include_hidden: false,
            follow_symlinks: false,
            max_depth: None,
            max_file_size: None,
            max_total_size: None,
            max_file_count: None,
            respect_gitignore: true,
            concurrency: 5,
            case_insensitive: ignore::platform_case_insensitive(),
        }
    }
}

/// A warning collected during traversal (unreadable directory skipped,
/// unreadable file emitted with a read error) — surfaced by the Discovery
/// stage onto `PipelinePayload::warnings`.
#[derive(Debug, Clone)]
pub struct WalkWarning {
    pub path: PathBuf,
    pub message: String,
}

/// The result of a complete traversal: the discovered records plus any
/// non-fatal warnings collected along the way.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub files: Vec<FileRecord>,
    pub warnings: Vec<WalkWarning>,
}

/// Shared, thread-safe traversal state: a running total-size/file-count
/// budget (so both walkers can stop early once a cap is hit) and the set
/// of canonicalized real paths already visited, used for symlink-cycle
/// detection regardless of platform (spec §4.2: "inode/device or
/// resolved-path set").
pub(crate) struct Budget {
    pub total_size: AtomicUsize,
    pub file_count: AtomicUsize,
    pub max_total_size: Option<u64>,
    pub max_file_count: Option<usize>,
    pub visited_real_paths: Mutex<HashSet<PathBuf>>,
}

impl Budget {
    pub fn new(max_total_size: Option<u64>, max_file_count: Option<usize>) -> Self {
        Self {
            total_size: AtomicUsize::new(0),
            file_count: AtomicUsize::new(0),
            max_total_size,
            max_file_count,
            visited_real_paths: Mutex::new(HashSet::new()),
        }
    }

    /// Reserves room for one more file of `size` bytes; `false` means a cap
    /// has already been exceeded and traversal should stop emitting.
    pub fn try_reserve(&self, size: u64) -> bool {
        if let Some(max_count) = self.max_file_count {
            if self.file_count.load(Ordering::Relaxed) >= max_count {
                return false;
            }
        }
        if let Some(max_total) = self.max_total_size {
            let current = self.total_size.load(Ordering::Relaxed) as u64;
            if current.saturating_add(size) > max_total {
                return false;
            }
        }
        self.file_count.fetch_add(1, Ordering::Relaxed);
        self.total_size.fetch_add(size as usize, Ordering::Relaxed);
        true
    }

    /// Marks `real_path` visited, returning `false` if it was already
    /// present (a symlink cycle or a second hard link to the same inode by
    /// way of the same resolved path).
    pub fn mark_visited(&self, real_path: PathBuf) -> bool {
        self.visited_real_paths.lock().unwrap().insert(real_path)
    }
}

/// `true` if `name` should never be descended into, regardless of ignore
/// rules (spec §4.2: VCS directories excluded by default).
pub(crate) fn is_vcs_dir(name: &str) -> bool {
    ignore::VCS_DIR_NAMES.contains(&name)
}

/// `true` if `name` is a dotfile/dot-directory and hidden entries are not
/// being included.
pub(crate) fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Builds the canonical `RelativePath` for `absolute` relative to `root`,
/// forward-slash normalized.
pub(crate) fn relative_of(root: &Path, absolute: &Path) -> Option<RelativePath> {
    let rel = absolute.strip_prefix(root).ok()?;
    let s = rel.to_string_lossy().replace('\\', "/");
    RelativePath::new(s).ok()
}

/// Resolves the per-path ignore verdict using the directory's own `.`-entry
/// check (a directory name match should also exclude its contents), given
/// the accumulated layered-ignore rules plus whatever `RulesetFilter` the
/// caller layers on afterward (the walker only applies ignore-file layers;
/// include/exclude/always CLI rules are a separate pipeline stage).
pub(crate) fn ignored_by_layers(layered: &LayeredIgnore, relative_path: &str, is_dir: bool) -> bool {
    layered.is_ignored(relative_path, is_dir)
}
