// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # PipelinePayload
//!
//! The single mutable record flowing between pipeline stages. Each stage's
//! `process` takes ownership of a payload and returns a (possibly narrowed,
//! augmented, or reordered) one — a consume-and-return-an-owned-value
//! shape throughout.

use crate::error::CopyTreeError;
use crate::file_record::FileRecord;
use std::path::PathBuf;
use std::sync::Arc;

/// Options shared read-only across every stage of a single pipeline run.
/// Constructed once by the bootstrap layer; never mutated during a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub always: Vec<String>,
    pub modified_only: bool,
    pub changes: Option<String>,
    pub respect_gitignore: bool,
    pub max_depth: Option<usize>,
    pub max_file_size: Option<u64>,
    pub max_total_size: Option<u64>,
    pub max_file_count: Option<usize>,
    pub transform: bool,
    pub transformers: Vec<String>,
    pub include_hidden: bool,
    pub follow_symlinks: bool,
    pub with_git_status: bool,
    pub dedupe: bool,
    pub sort: Option<SortOrder>,
    pub format: OutputFormat,
    pub only_tree: bool,
    pub add_line_numbers: bool,
    pub show_size: bool,
    pub instructions: Option<String>,
    pub char_limit: Option<usize>,
    pub stream: bool,
    pub secrets_policy: SecretsPolicy,
    pub dry_run: bool,
    pub walker_concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            always: Vec::new(),
            modified_only: false,
            changes: None,
            respect_gitignore: true,
            max_depth: None,
            max_file_size: None,
            max_total_size: None,
            max_file_count: None,
            transform: false,
            transformers: Vec::new(),
            include_hidden: false,
            follow_symlinks: false,
            with_git_status: false,
            dedupe: true,
            sort: None,
            format: OutputFormat::Xml,
            only_tree: false,
            add_line_numbers: false,
            show_size: false,
            instructions: None,
            char_limit: None,
            stream: false,
            secrets_policy: SecretsPolicy::Redact,
            dry_run: false,
            walker_concurrency: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Path,
    Size,
    Modified,
    Name,
    Extension,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xml,
    Json,
    Markdown,
    Tree,
    Ndjson,
    Sarif,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretsPolicy {
    Redact,
    Reject,
    ReportOnly,
}

/// The in-flight record carrying the file list and accumulated
/// errors/warnings between stages. The Format stage is the only one that
/// populates `artifact`; every earlier stage leaves it `None`.
#[derive(Debug, Clone)]
pub struct PipelinePayload {
    pub base_dir: PathBuf,
    pub options: Arc<PipelineOptions>,
    pub files: Vec<FileRecord>,
    pub errors: Vec<CopyTreeError>,
    pub warnings: Vec<String>,
    pub artifact: Option<Vec<u8>>,
    pub secret_findings: Vec<crate::ports::secrets::SecretFinding>,
}

impl PipelinePayload {
    pub fn new(base_dir: PathBuf, options: Arc<PipelineOptions>) -> Self {
        Self {
            base_dir,
            options,
            files: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            artifact: None,
            secret_findings: Vec::new(),
        }
    }

    pub fn with_files(mut self, files: Vec<FileRecord>) -> Self {
        self.files = files;
        self
    }

    pub fn with_artifact(mut self, artifact: Vec<u8>) -> Self {
        self.artifact = Some(artifact);
        self
    }

    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn push_error(&mut self, error: CopyTreeError) {
        self.errors.push(error);
    }
}
