// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # External source resolver (§4.11)
//!
//! Given `{source, destination, rules?}` entries, clones remote sources
//! (via [`crate::infrastructure::git`]) into a cache directory keyed by
//! `sha256(url + branch)`, or treats `source` as a local directory.
//! Discovers files with the sequential walker, optionally filters them
//! with the entry's own `RulesetFilter`, and remaps each survivor's
//! `relative_path` by prefixing `destination/` before the caller merges
//! the results into the main payload.

use crate::infrastructure::git::is_remote_source;
use crate::infrastructure::walker::{sequential, WalkOptions};
use copytree_domain::error::CopyTreeError;
use copytree_domain::ports::GitService;
use copytree_domain::rules::RulesetFilter;
use copytree_domain::value_objects::RelativePath;
use copytree_domain::FileRecord;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ExternalSourceSpec {
    pub source: String,
    pub destination: String,
    pub branch: Option<String>,
    pub rules: Option<RulesetFilter>,
}

pub struct ExternalSourceResolver {
    git: Arc<dyn GitService>,
    cache_root: PathBuf,
}

impl ExternalSourceResolver {
    pub fn new(git: Arc<dyn GitService>, cache_root: PathBuf) -> Self {
        Self { git, cache_root }
    }

    /// Resolves every spec into a combined, already-remapped file list.
    pub async fn resolve_all(&self, specs: &[ExternalSourceSpec], walk_options: &WalkOptions) -> Result<Vec<FileRecord>, CopyTreeError> {
        let mut combined = Vec::new();
        for spec in specs {
            combined.extend(self.resolve_one(spec, walk_options).await?);
        }
        Ok(combined)
    }

    async fn resolve_one(&self, spec: &ExternalSourceSpec, walk_options: &WalkOptions) -> Result<Vec<FileRecord>, CopyTreeError> {
        let root = if is_remote_source(&spec.source) {
            let key = cache_key(&spec.source, spec.branch.as_deref());
            let into = self.cache_root.join(key);
            self.git.clone_or_update(&spec.source, spec.branch.as_deref(), &into).await?
        } else {
            PathBuf::from(&spec.source)
        };

        let options = walk_options.clone();
        let root_for_walk = root.clone();
        let outcome = tokio::task::spawn_blocking(move || sequential::walk(&root_for_walk, &options))
            .await
            .map_err(|err| CopyTreeError::ExternalSource(format!("walker task panicked: {err}")))?;

        let mut remapped = Vec::new();
        for mut file in outcome.files {
            if let Some(rules) = &spec.rules {
                if !rules.accept(file.relative_path().as_str(), false) {
                    continue;
                }
            }
            let new_path = format!("{}/{}", spec.destination.trim_end_matches('/'), file.relative_path().as_str());
            file.reparent(RelativePath::new(new_path).map_err(CopyTreeError::Validation)?);
            remapped.push(file);
        }
        Ok(remapped)
    }
}

/// `sha256(url + branch)`, truncated to 16 hex characters for a readable
/// but still-unique cache directory name (spec §4.11).
fn cache_key(url: &str, branch: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    if let Some(branch) = branch {
        hasher.update(branch.as_bytes());
    }
    let digest = hasher.finalize();
    hex::encode(digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_deterministic_and_branch_sensitive() {
        let a = cache_key("https://example.com/repo.git", Some("main"));
        let b = cache_key("https://example.com/repo.git", Some("dev"));
        let c = cache_key("https://example.com/repo.git", Some("main"));
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(a.len(), 16);
    }
}
