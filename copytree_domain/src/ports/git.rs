// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `GitService` port (§4.8).

use crate::error::CopyTreeError;
use async_trait::async_trait;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitFileStatus {
    Modified,
    Untracked,
    Staged,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct GitFileChange {
    pub relative_path: String,
    pub status: GitFileStatus,
}

#[async_trait]
pub trait GitService: Send + Sync {
    async fn modified_files(&self, repo_root: &std::path::Path) -> Result<Vec<GitFileChange>, CopyTreeError>;

    /// Parses `changes` as `"<from>[:<to>]"`, defaulting `to` to `HEAD`,
    /// and returns the changed files between the two revisions.
    async fn changed_files_between(
        &self,
        repo_root: &std::path::Path,
        changes: &str,
    ) -> Result<Vec<GitFileChange>, CopyTreeError>;

    /// Clones or updates a cached checkout of `url` at `branch`, returning
    /// its local path, for use by the external-source resolver.
    async fn clone_or_update(&self, url: &str, branch: Option<&str>, into: &PathBuf) -> Result<PathBuf, CopyTreeError>;
}

/// Parses the `"<from>[:<to>]"` changes-option grammar (§4.8), failing
/// distinguishably on malformed input.
pub fn parse_changes_spec(spec: &str) -> Result<(String, String), CopyTreeError> {
    if spec.trim().is_empty() {
        return Err(CopyTreeError::Validation("changes spec must not be empty".to_string()));
    }
    match spec.split_once(':') {
        Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
            Ok((from.trim().to_string(), to.trim().to_string()))
        }
        Some(_) => Err(CopyTreeError::Validation(format!("invalid changes spec '{spec}'"))),
        None => Ok((spec.trim().to_string(), "HEAD".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_head() {
        assert_eq!(parse_changes_spec("main").unwrap(), ("main".to_string(), "HEAD".to_string()));
    }

    #[test]
    fn explicit_range() {
        assert_eq!(parse_changes_spec("a:b").unwrap(), ("a".to_string(), "b".to_string()));
    }

    #[test]
    fn rejects_malformed() {
        assert!(parse_changes_spec("a:").is_err());
        assert!(parse_changes_spec("").is_err());
    }
}
