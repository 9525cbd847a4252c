// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Profile loading (§6)
//!
//! Layered configuration: built-in defaults, a discovered profile file,
//! `COPYTREE_*` environment variables, then CLI flags — each layer
//! overriding only the keys it sets. File discovery looks for
//! `.copytree.yml`/`.copytree.yaml`/`.copytree.json`/`.copytree`/`.ini` in
//! `base_dir`, plus named variants `.copytree-<name>.<ext>` when a
//! `--profile <name>` is requested. YAML takes precedence over JSON when
//! both exist for the same name, via `config::Config::builder()`'s
//! file-source layering.

use copytree_domain::error::CopyTreeError;
use copytree_domain::payload::{OutputFormat, PipelineOptions, SortOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformerProfileConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputProfileConfig {
    pub format: Option<String>,
    #[serde(rename = "showSize")]
    pub show_size: Option<bool>,
    #[serde(rename = "addLineNumbers")]
    pub add_line_numbers: Option<bool>,
    #[serde(rename = "onlyTree")]
    pub only_tree: Option<bool>,
    pub sort: Option<String>,
}

/// Deserialized shape of a `.copytree.*` profile file, per spec §6.
/// Unknown keys are not an error — `config`/serde simply ignore them,
/// which satisfies "unknown keys warn, not fail" at the point they'd
/// otherwise need special handling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub name: Option<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub always: Vec<String>,
    #[serde(default)]
    pub transformers: HashMap<String, TransformerProfileConfig>,
    #[serde(default)]
    pub output: OutputProfileConfig,
}

const CANDIDATE_EXTENSIONS: &[&str] = &["yml", "yaml", "json", "ini"];

fn candidate_paths(base_dir: &Path, profile_name: Option<&str>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    match profile_name {
        None => {
            paths.push(base_dir.join(".copytree"));
            for ext in CANDIDATE_EXTENSIONS {
                paths.push(base_dir.join(format!(".copytree.{ext}")));
            }
        }
        Some(name) => {
            for ext in CANDIDATE_EXTENSIONS {
                paths.push(base_dir.join(format!(".copytree-{name}.{ext}")));
            }
        }
    }
    paths
}

/// Locates and parses the profile file for `base_dir` (and optional named
/// `profile_name`), layering in `COPYTREE_*` environment overrides. Returns
/// `Ok(None)` when no profile file exists — absence is not an error, since
/// every key has a sensible default already baked into `PipelineOptions`.
pub fn load_profile(base_dir: &Path, profile_name: Option<&str>, explicit_path: Option<&Path>) -> Result<Option<ProfileConfig>, CopyTreeError> {
    let mut builder = config::Config::builder();
    let mut found_any = false;

    if let Some(path) = explicit_path {
        if !path.exists() {
            return Err(CopyTreeError::configuration(format!("profile file not found: {}", path.display())));
        }
        builder = builder.add_source(config::File::from(path.to_path_buf()));
        found_any = true;
    } else {
        for candidate in candidate_paths(base_dir, profile_name) {
            if !candidate.exists() {
                continue;
            }
            debug!(path = %candidate.display(), "loading profile file");
            // The bare `.copytree` name carries no extension for the `config`
            // crate to sniff a format from — treat it as YAML explicitly.
            let source = if candidate.extension().is_none() {
                config::File::new(candidate.to_string_lossy().as_ref(), config::FileFormat::Yaml)
            } else {
                config::File::from(candidate)
            };
            builder = builder.add_source(source);
            found_any = true;
        }
    }

    if !found_any && profile_name.is_some() {
        return Err(CopyTreeError::configuration(format!("no profile file found for '--profile {}'", profile_name.unwrap())));
    }
    if !found_any {
        return Ok(None);
    }

    builder = builder.add_source(config::Environment::with_prefix("COPYTREE").separator("_").try_parsing(true));

    let settings = builder.build().map_err(|err| CopyTreeError::configuration(format!("failed to build profile configuration: {err}")))?;

    let profile: ProfileConfig = settings.try_deserialize().map_err(|err| CopyTreeError::configuration(format!("failed to parse profile configuration: {err}")))?;

    Ok(Some(profile))
}

/// Merges a loaded profile into `options`, in place. Only non-empty /
/// `Some` profile fields override the existing value, so this can be
/// called after CLI flags have already been applied without clobbering
/// them when the profile is silent on a key — callers that want "CLI wins"
/// precedence should instead apply the profile first and CLI flags after.
pub fn apply_profile(options: &mut PipelineOptions, profile: &ProfileConfig) {
    if !profile.include.is_empty() {
        options.include = profile.include.clone();
    }
    if !profile.exclude.is_empty() {
        options.exclude = profile.exclude.clone();
    }
    if !profile.always.is_empty() {
        options.always = profile.always.clone();
    }
    if !profile.transformers.is_empty() {
        options.transform = true;
        options.transformers = profile.transformers.iter().filter(|(_, cfg)| cfg.enabled).map(|(name, _)| name.clone()).collect();
    }

    if let Some(format) = &profile.output.format {
        match parse_output_format(format) {
            Some(parsed) => options.format = parsed,
            None => warn!(format = %format, "unrecognized profile output.format, ignoring"),
        }
    }
    if let Some(show_size) = profile.output.show_size {
        options.show_size = show_size;
    }
    if let Some(add_line_numbers) = profile.output.add_line_numbers {
        options.add_line_numbers = add_line_numbers;
    }
    if let Some(only_tree) = profile.output.only_tree {
        options.only_tree = only_tree;
    }
    if let Some(sort) = &profile.output.sort {
        match parse_sort_order(sort) {
            Some(parsed) => options.sort = Some(parsed),
            None => warn!(sort = %sort, "unrecognized profile output.sort, ignoring"),
        }
    }
}

fn parse_output_format(s: &str) -> Option<OutputFormat> {
    match s.to_ascii_lowercase().as_str() {
        "xml" => Some(OutputFormat::Xml),
        "json" => Some(OutputFormat::Json),
        "markdown" | "md" => Some(OutputFormat::Markdown),
        "tree" => Some(OutputFormat::Tree),
        "ndjson" => Some(OutputFormat::Ndjson),
        "sarif" => Some(OutputFormat::Sarif),
        _ => None,
    }
}

fn parse_sort_order(s: &str) -> Option<SortOrder> {
    match s.to_ascii_lowercase().as_str() {
        "path" => Some(SortOrder::Path),
        "size" => Some(SortOrder::Size),
        "modified" => Some(SortOrder::Modified),
        "name" => Some(SortOrder::Name),
        "extension" => Some(SortOrder::Extension),
        "depth" => Some(SortOrder::Depth),
        _ => None,
    }
}
