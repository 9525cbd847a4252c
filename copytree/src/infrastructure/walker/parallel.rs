// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Bounded worker-pool traversal over a `crossbeam::deque` work-stealing
//! queue (spec §4.2, §5.1). Workers pull a directory, emit its files, and
//! push its child directories; emission order is not guaranteed — callers
//! needing determinism apply the Sort stage downstream (spec §5:
//! "Ordering guarantees").

use super::{ignore, is_hidden, is_vcs_dir, relative_of, Budget, WalkOptions, WalkOutcome, WalkWarning};
use copytree_domain::rules::LayeredIgnore;
use copytree_domain::FileRecord;
use crossbeam::deque::{Injector, Steal, Stealer, Worker};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

struct Job {
    dir: PathBuf,
    depth: usize,
    layered: LayeredIgnore,
}

/// Walks `root` using `options.concurrency` worker threads (clamped to
/// 1..=50 per spec §5). Intended to run inside
/// `tokio::task::spawn_blocking`.
pub fn walk(root: &Path, options: &WalkOptions) -> WalkOutcome {
    let concurrency = options.concurrency.clamp(1, 50);
    let budget = Arc::new(Budget::new(options.max_total_size, options.max_file_count));

    if options.follow_symlinks {
        if let Ok(real) = root.canonicalize() {
            budget.mark_visited(real);
        }
    }

    let injector: Arc<Injector<Job>> = Arc::new(Injector::new());
    injector.push(Job {
        dir: root.to_path_buf(),
        depth: 0,
        layered: LayeredIgnore::new(),
    });

    let workers: Vec<Worker<Job>> = (0..concurrency).map(|_| Worker::new_fifo()).collect();
    let stealers: Vec<Stealer<Job>> = workers.iter().map(|w| w.stealer()).collect();

    let files = Arc::new(Mutex::new(Vec::<FileRecord>::new()));
    let warnings = Arc::new(Mutex::new(Vec::<WalkWarning>::new()));
    // Tracks how many jobs are outstanding (queued or in-flight) so workers
    // know when the whole traversal is exhausted rather than merely quiet.
    let outstanding = Arc::new(std::sync::atomic::AtomicUsize::new(1));

    std::thread::scope(|scope| {
        for worker in workers {
            let injector = Arc::clone(&injector);
            let stealers = stealers.clone();
            let budget = Arc::clone(&budget);
            let files = Arc::clone(&files);
            let warnings = Arc::clone(&warnings);
            let outstanding = Arc::clone(&outstanding);
            let root = root.to_path_buf();
            let options = options.clone();

            scope.spawn(move || {
                run_worker(worker, injector, &stealers, &root, &options, &budget, &files, &warnings, &outstanding);
            });
        }
    });

    WalkOutcome {
        files: Arc::try_unwrap(files).unwrap().into_inner().unwrap(),
        warnings: Arc::try_unwrap(warnings).unwrap().into_inner().unwrap(),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    local: Worker<Job>,
    injector: Arc<Injector<Job>>,
    stealers: &[Stealer<Job>],
    root: &Path,
    options: &WalkOptions,
    budget: &Budget,
    files: &Mutex<Vec<FileRecord>>,
    warnings: &Mutex<Vec<WalkWarning>>,
    outstanding: &std::sync::atomic::AtomicUsize,
) {
    use std::sync::atomic::Ordering;

    loop {
        let job = local.pop().or_else(|| loop {
            match injector.steal_batch_and_pop(&local) {
                Steal::Success(job) => return Some(job),
                Steal::Empty => break None,
                Steal::Retry => continue,
            }
        });

        let job = match job {
            Some(job) => job,
            None => {
                // Nothing local or in the injector; try stealing from peers
                // before concluding the traversal is finished.
                let stolen = stealers.iter().find_map(|s| match s.steal() {
                    Steal::Success(job) => Some(job),
                    _ => None,
                });
                match stolen {
                    Some(job) => job,
                    None => {
                        if outstanding.load(Ordering::Acquire) == 0 {
                            return;
                        }
                        std::thread::yield_now();
                        continue;
                    }
                }
            }
        };

        process_job(job, &injector, root, options, budget, files, warnings, outstanding, &local);
        outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}

#[allow(clippy::too_many_arguments)]
fn process_job(
    job: Job,
    injector: &Injector<Job>,
    root: &Path,
    options: &WalkOptions,
    budget: &Budget,
    files: &Mutex<Vec<FileRecord>>,
    warnings: &Mutex<Vec<WalkWarning>>,
    outstanding: &std::sync::atomic::AtomicUsize,
    local: &Worker<Job>,
) {
    use std::sync::atomic::Ordering;

    if let Some(max_depth) = options.max_depth {
        if job.depth > max_depth {
            return;
        }
    }

    let layer_rules = if options.respect_gitignore {
        ignore::load_layer_rules(&job.dir, ignore::DEFAULT_IGNORE_FILE_NAMES, options.case_insensitive)
    } else {
        Vec::new()
    };
    let mut layered = job.layered;
    if !layer_rules.is_empty() {
        layered.push_layer(job.depth, layer_rules);
    }

    let entries = match std::fs::read_dir(&job.dir) {
        Ok(entries) => entries,
        Err(err) => {
            warnings.lock().unwrap().push(WalkWarning {
                path: job.dir.clone(),
                message: format!("unreadable directory: {err}"),
            });
            return;
        }
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().to_string();
        let path = entry.path();

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
                warnings.lock().unwrap().push(WalkWarning {
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
                        continue;
                    }
                }
            }
            let child = Job {
                dir: path,
                depth: job.depth + 1,
                layered: layered.clone(),
            };
            outstanding.fetch_add(1, Ordering::AcqRel);
            local.push(child);
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
            files.lock().unwrap().push(FileRecord::discovered(rel, path, size, modified));
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn touch(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn walker_equivalence_with_sequential() {
        let dir = tempdir().unwrap();
        for i in 0..20 {
            touch(&dir.path().join(format!("dir{}/file{}.txt", i % 4, i)), "x");
        }

        let mut opts = WalkOptions::default();
        opts.concurrency = 4;
        let seq = super::super::sequential::walk(dir.path(), &WalkOptions::default());
        let par = walk(dir.path(), &opts);

        let seq_set: HashSet<String> = seq.files.iter().map(|f| f.relative_path().as_str().to_string()).collect();
        let par_set: HashSet<String> = par.files.iter().map(|f| f.relative_path().as_str().to_string()).collect();
        assert_eq!(seq_set, par_set);
    }

    #[test]
    fn respects_max_file_count() {
        let dir = tempdir().unwrap();
        for i in 0..10 {
            touch(&dir.path().join(format!("f{i}.txt")), "x");
        }
        let mut opts = WalkOptions::default();
        opts.max_file_count = Some(3);
        let outcome = walk(dir.path(), &opts);
        assert_eq!(outcome.files.len(), 3);
    }
}
