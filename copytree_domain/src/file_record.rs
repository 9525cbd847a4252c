// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # FileRecord
//!
//! The unit of work that flows through the pipeline from Discovery to
//! Format. Invariants are enforced in constructors rather than left to
//! caller discipline:
//!
//! - `relative_path` is canonicalized on construction (no `..`, forward
//!   slashes only — see [`RelativePath`]).
//! - `content` can only be set through [`FileRecord::with_content`], which
//!   clears `transformed`/`transformed_by` so stale transform state never
//!   survives a content replacement.
//! - [`FileRecord::mark_transformed`] is the only way to set `transformed`,
//!   and it requires a non-empty transformer name — enforcing invariant (d).

use crate::value_objects::{Metadata, RelativePath};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Optional git status tag attached to a file during the git-filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitStatus {
    Modified,
    Untracked,
    Staged,
    Deleted,
}

/// Text vs. binary content, or not-yet-loaded.
#[derive(Debug, Clone)]
pub enum FileContent {
    Absent,
    Text(String),
    Binary(Vec<u8>),
}

impl FileContent {
    pub fn is_absent(&self) -> bool {
        matches!(self, FileContent::Absent)
    }

    pub fn len(&self) -> usize {
        match self {
            FileContent::Absent => 0,
            FileContent::Text(s) => s.len(),
            FileContent::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FileContent::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FileContent::Text(s) => Some(s.as_bytes()),
            FileContent::Binary(b) => Some(b),
            FileContent::Absent => None,
        }
    }
}

/// A single file flowing through the pipeline.
#[derive(Debug, Clone)]
pub struct FileRecord {
    relative_path: RelativePath,
    absolute_path: PathBuf,
    size: u64,
    modified_time: Option<DateTime<Utc>>,
    content: FileContent,
    is_binary: Option<bool>,
    encoding: Option<String>,
    git_status: Option<GitStatus>,
    transformed: bool,
    transformed_by: Vec<String>,
    metadata: Metadata,
    read_error: Option<String>,
}

impl FileRecord {
    /// Constructs a path-and-stat-only record, as emitted by the discovery
    /// walker before the Load stage runs.
    pub fn discovered(relative_path: RelativePath, absolute_path: PathBuf, size: u64, modified_time: Option<DateTime<Utc>>) -> Self {
        Self {
            relative_path,
            absolute_path,
            size,
            modified_time,
            content: FileContent::Absent,
            is_binary: None,
            encoding: None,
            git_status: None,
            transformed: false,
            transformed_by: Vec::new(),
            metadata: Metadata::new(),
            read_error: None,
        }
    }

    pub fn relative_path(&self) -> &RelativePath {
        &self.relative_path
    }

    pub fn absolute_path(&self) -> &std::path::Path {
        &self.absolute_path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        self.modified_time
    }

    pub fn content(&self) -> &FileContent {
        &self.content
    }

    pub fn is_binary(&self) -> Option<bool> {
        self.is_binary
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn git_status(&self) -> Option<GitStatus> {
        self.git_status
    }

    pub fn transformed(&self) -> bool {
        self.transformed
    }

    pub fn transformed_by(&self) -> &[String] {
        &self.transformed_by
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn read_error(&self) -> Option<&str> {
        self.read_error.as_deref()
    }

    /// Materializes content once per record (invariant (c): once set it is
    /// not re-read from disk by later stages). Replacing content resets the
    /// transform state, since a transform applied to the old content no
    /// longer describes the new one.
    pub fn with_content(mut self, content: FileContent, is_binary: bool, encoding: Option<String>) -> Self {
        self.content = content;
        self.is_binary = Some(is_binary);
        self.encoding = encoding;
        self.transformed = false;
        self.transformed_by.clear();
        self
    }

    pub fn with_git_status(mut self, status: GitStatus) -> Self {
        self.git_status = Some(status);
        self
    }

    pub fn with_read_error(mut self, message: impl Into<String>) -> Self {
        self.read_error = Some(message.into());
        self
    }

    /// The only way to mark a record as transformed — enforces invariant
    /// (d): `transformed` implies at least one `transformed_by` entry.
    pub fn mark_transformed(&mut self, transformer_name: impl Into<String>) {
        let name = transformer_name.into();
        debug_assert!(!name.is_empty(), "transformer name must not be empty");
        self.transformed_by.push(name);
        self.transformed = true;
    }

    pub fn set_content_text(&mut self, text: String) {
        self.content = FileContent::Text(text);
    }

    pub fn insert_metadata(&mut self, key: impl Into<String>, value: crate::value_objects::MetadataValue) {
        self.metadata.insert(key.into(), value);
    }

    /// Rename this record's identity, as the external-source resolver does
    /// when it prefixes `destination/` onto a merged file's path.
    pub fn reparent(&mut self, new_path: RelativePath) {
        self.relative_path = new_path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str) -> FileRecord {
        FileRecord::discovered(RelativePath::new(path).unwrap(), PathBuf::from(path), 10, None)
    }

    #[test]
    fn replacing_content_clears_transform_state() {
        let mut r = record("a.txt");
        r.mark_transformed("loader");
        assert!(r.transformed());
        let r = r.with_content(FileContent::Text("x".into()), false, None);
        assert!(!r.transformed());
        assert!(r.transformed_by().is_empty());
    }

    #[test]
    fn mark_transformed_requires_name_invariant() {
        let mut r = record("a.txt");
        r.mark_transformed("markdown");
        assert_eq!(r.transformed_by(), &["markdown".to_string()]);
        assert!(r.transformed());
    }
}
