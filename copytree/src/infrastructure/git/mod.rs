// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Git integration (§4.8)
//!
//! Shells out to the `git` binary via `tokio::process` rather than
//! bundling `git2`, avoiding an otherwise-unused dependency (see
//! DESIGN.md).

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::ports::git::{parse_changes_spec, GitFileChange, GitFileStatus};
use copytree_domain::ports::GitService;
use std::path::{Path, PathBuf};
use tokio::process::Command;

pub struct ProcessGitService {
    git_binary: String,
}

impl Default for ProcessGitService {
    fn default() -> Self {
        Self { git_binary: "git".to_string() }
    }
}

impl ProcessGitService {
    pub fn with_binary(git_binary: impl Into<String>) -> Self {
        Self { git_binary: git_binary.into() }
    }

    async fn run(&self, repo_root: &Path, args: &[&str]) -> Result<String, CopyTreeError> {
        let output = Command::new(&self.git_binary)
            .current_dir(repo_root)
            .args(args)
            .output()
            .await
            .map_err(|err| CopyTreeError::Git(format!("failed to spawn git: {err}")))?;
        if !output.status.success() {
            return Err(CopyTreeError::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parses `git status --porcelain=v1` lines into `GitFileChange`s.
fn parse_porcelain(output: &str) -> Vec<GitFileChange> {
    let mut changes = Vec::new();
    for line in output.lines() {
        if line.len() < 4 {
            continue;
        }
        let index_status = line.as_bytes()[0];
        let worktree_status = line.as_bytes()[1];
        let path = line[3..].to_string();

        let status = if index_status == b'?' && worktree_status == b'?' {
            GitFileStatus::Untracked
        } else if index_status == b'D' || worktree_status == b'D' {
            GitFileStatus::Deleted
        } else if index_status != b' ' && index_status != b'?' {
            GitFileStatus::Staged
        } else {
            GitFileStatus::Modified
        };

        changes.push(GitFileChange {
            relative_path: path.replace('\\', "/"),
            status,
        });
    }
    changes
}

#[async_trait]
impl GitService for ProcessGitService {
    async fn modified_files(&self, repo_root: &Path) -> Result<Vec<GitFileChange>, CopyTreeError> {
        let output = self.run(repo_root, &["status", "--porcelain=v1"]).await?;
        Ok(parse_porcelain(&output))
    }

    async fn changed_files_between(&self, repo_root: &Path, changes: &str) -> Result<Vec<GitFileChange>, CopyTreeError> {
        let (from, to) = parse_changes_spec(changes)?;
        let range = format!("{from}..{to}");
        let output = self.run(repo_root, &["diff", "--name-status", &range]).await?;

        let mut result = Vec::new();
        for line in output.lines() {
            let mut parts = line.splitn(2, '\t');
            let Some(code) = parts.next() else { continue };
            let Some(path) = parts.next() else { continue };
            let status = match code.chars().next() {
                Some('D') => GitFileStatus::Deleted,
                Some('A') => GitFileStatus::Staged,
                _ => GitFileStatus::Modified,
            };
            result.push(GitFileChange {
                relative_path: path.replace('\\', "/"),
                status,
            });
        }
        Ok(result)
    }

    async fn clone_or_update(&self, url: &str, branch: Option<&str>, into: &PathBuf) -> Result<PathBuf, CopyTreeError> {
        if tokio::fs::metadata(into.join(".git")).await.is_ok() {
            self.run(into, &["fetch", "--all", "--prune"]).await?;
            let target = branch.unwrap_or("HEAD");
            self.run(into, &["reset", "--hard", &format!("origin/{target}")]).await?;
        } else {
            tokio::fs::create_dir_all(into)
                .await
                .map_err(|err| CopyTreeError::Git(format!("creating clone dir: {err}")))?;
            let mut args = vec!["clone"];
            if let Some(branch) = branch {
                args.push("--branch");
                args.push(branch);
            }
            args.push(url);
            args.push(".");

            let output = Command::new(&self.git_binary)
                .current_dir(into)
                .args(&args)
                .output()
                .await
                .map_err(|err| CopyTreeError::Git(format!("failed to spawn git: {err}")))?;
            if !output.status.success() {
                return Err(CopyTreeError::Git(format!(
                    "git clone of '{url}' failed: {}",
                    String::from_utf8_lossy(&output.stderr)
                )));
            }
        }
        Ok(into.clone())
    }
}

/// `true` if `source` looks like a remote repository URL rather than a
/// local path (spec §4.11).
pub fn is_remote_source(source: &str) -> bool {
    source.starts_with("http://")
        || source.starts_with("https://")
        || source.starts_with("git@")
        || source.starts_with("ssh://")
        || source.ends_with(".git")
}
