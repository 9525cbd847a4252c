// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface
//!
//! Secure CLI argument parsing, split into two phases: `clap` does the
//! syntactic parsing into [`Cli`], then [`validate`] canonicalizes paths
//! and range-checks numeric options before anything downstream sees
//! them. Only the external interface (§6) is exposed here — interpreting
//! the options (building the rule engine, dispatching transformers) is
//! `copytree`'s job, not bootstrap's.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid value for --{arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),
    #[error("conflicting options: {0}")]
    Conflict(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Xml,
    Json,
    Markdown,
    Tree,
    Ndjson,
    Sarif,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Path,
    Size,
    Modified,
    Name,
    Extension,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SecretsArg {
    Redact,
    Reject,
    ReportOnly,
}

/// `copytree` — select, transform, and serialize a source tree for an LLM.
#[derive(Debug, Parser)]
#[command(name = "copytree", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit structured JSON logs instead of human-readable text.
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Walk a tree, apply rules/transforms, and emit a formatted artifact.
    Copy {
        /// Base directory to copy (defaults to the current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        #[arg(long)]
        include: Vec<String>,
        #[arg(long)]
        exclude: Vec<String>,
        #[arg(long)]
        always: Vec<String>,

        /// Restrict to files with uncommitted/untracked git changes.
        #[arg(long)]
        modified: bool,
        /// `"<from>[:<to>]"`; mutually exclusive with `--modified`.
        #[arg(long)]
        changes: Option<String>,

        #[arg(long, default_value_t = true)]
        respect_gitignore: bool,
        #[arg(long)]
        max_depth: Option<usize>,
        #[arg(long)]
        max_file_size: Option<u64>,
        #[arg(long)]
        max_total_size: Option<u64>,
        #[arg(long)]
        max_file_count: Option<usize>,

        #[arg(long)]
        transform: bool,
        #[arg(long)]
        transformers: Vec<String>,

        #[arg(long)]
        include_hidden: bool,
        #[arg(long)]
        follow_symlinks: bool,
        #[arg(long)]
        with_git_status: bool,
        #[arg(long, default_value_t = true)]
        dedupe: bool,

        #[arg(long, value_enum)]
        sort: Option<SortArg>,
        #[arg(long, value_enum, default_value_t = FormatArg::Xml)]
        format: FormatArg,
        #[arg(long)]
        only_tree: bool,
        #[arg(long)]
        add_line_numbers: bool,
        #[arg(long)]
        show_size: bool,
        #[arg(long)]
        instructions: Option<String>,
        #[arg(long)]
        char_limit: Option<usize>,
        #[arg(long)]
        stream: bool,

        /// Output file; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = SecretsArg::Redact)]
        secrets_policy: SecretsArg,
        /// Write scan findings to this path (SARIF or JSON, by extension).
        #[arg(long)]
        secrets_report: Option<PathBuf>,

        #[arg(long)]
        dry_run: bool,

        /// Worker count for the bounded-parallel walker (1-50).
        #[arg(long, default_value_t = 5)]
        walker_concurrency: usize,

        /// Named profile to load instead of auto-discovery.
        #[arg(long)]
        profile: Option<String>,
    },

    /// Multi-turn conversation over a previously copied tree.
    Ask {
        path: PathBuf,
        #[arg(long)]
        conversation_id: Option<String>,
        question: String,

        /// Bind a `GET /metrics` Prometheus endpoint on this address for
        /// the lifetime of the session; disabled by default (one-shot CLI
        /// runs have nothing worth scraping).
        #[arg(long)]
        metrics_addr: Option<std::net::SocketAddr>,
    },
}

#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: Cli,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

pub fn parse_and_validate() -> Result<ValidatedCli, CliError> {
    let cli = parse_cli();
    validate(&cli)?;
    Ok(ValidatedCli { command: cli })
}

fn validate(cli: &Cli) -> Result<(), CliError> {
    if let Commands::Copy {
        path,
        modified,
        changes,
        max_file_size,
        max_total_size,
        max_file_count,
        walker_concurrency,
        ..
    } = &cli.command
    {
        if !path.exists() {
            return Err(CliError::PathNotFound(path.clone()));
        }
        if *modified && changes.is_some() {
            return Err(CliError::Conflict(
                "--modified and --changes are mutually exclusive (spec §7 ConfigurationError)".to_string(),
            ));
        }
        if let Some(c) = changes {
            copytree_domain::ports::git::parse_changes_spec(c).map_err(|e| CliError::InvalidValue {
                arg: "changes".to_string(),
                reason: e.to_string(),
            })?;
        }
        if *walker_concurrency == 0 || *walker_concurrency > 50 {
            return Err(CliError::InvalidValue {
                arg: "walker-concurrency".to_string(),
                reason: "must be between 1 and 50".to_string(),
            });
        }
        for (name, value) in [
            ("max-file-size", max_file_size.map(|v| v as i128)),
            ("max-total-size", max_total_size.map(|v| v as i128)),
            ("max-file-count", max_file_count.map(|v| v as i128)),
        ] {
            if let Some(v) = value {
                if v == 0 {
                    return Err(CliError::InvalidValue {
                        arg: name.to_string(),
                        reason: "must be greater than zero".to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Rejects a handful of shell-metacharacter patterns in free-text CLI
/// fields (instructions, profile name) that have no business containing
/// them, before any value reaches a subprocess invocation (git, scanner,
/// OCR).
pub fn reject_shell_metacharacters(value: &str, arg: &str) -> Result<(), CliError> {
    const DANGEROUS: &[char] = &['`', '$', ';', '|', '&', '\n'];
    if value.chars().any(|c| DANGEROUS.contains(&c)) {
        return Err(CliError::InvalidValue {
            arg: arg.to_string(),
            reason: "contains a disallowed shell metacharacter".to_string(),
        });
    }
    Ok(())
}

pub fn canonicalize_existing(path: &Path) -> Result<PathBuf, CliError> {
    path.canonicalize().map_err(|_| CliError::PathNotFound(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_conflicting_modified_and_changes() {
        let cli = Cli {
            command: Commands::Copy {
                path: PathBuf::from("."),
                include: vec![],
                exclude: vec![],
                always: vec![],
                modified: true,
                changes: Some("main".to_string()),
                respect_gitignore: true,
                max_depth: None,
                max_file_size: None,
                max_total_size: None,
                max_file_count: None,
                transform: false,
                transformers: vec![],
                include_hidden: false,
                follow_symlinks: false,
                with_git_status: false,
                dedupe: true,
                sort: None,
                format: FormatArg::Xml,
                only_tree: false,
                add_line_numbers: false,
                show_size: false,
                instructions: None,
                char_limit: None,
                stream: false,
                output: None,
                secrets_policy: SecretsArg::Redact,
                secrets_report: None,
                dry_run: false,
                walker_concurrency: 5,
                profile: None,
            },
            verbose: 0,
            json_logs: false,
        };
        assert!(matches!(validate(&cli), Err(CliError::Conflict(_))));
    }

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(reject_shell_metacharacters("hello; rm -rf /", "instructions").is_err());
        assert!(reject_shell_metacharacters("hello world", "instructions").is_ok());
    }
}
