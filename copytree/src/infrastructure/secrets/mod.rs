// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secret scanner (§4.9)
//!
//! Pipes content over stdin to an external, `gitleaks`-compatible scanner
//! binary and parses its JSON-over-stdout findings — no temp files, so raw
//! secret bytes only ever live in this process's own memory and the
//! scanner's stdin pipe.

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::ports::secrets::SecretFinding;
use copytree_domain::ports::SecretScanner;
use serde::Deserialize;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Deserialize)]
struct RawFinding {
    #[serde(rename = "RuleID")]
    rule_id: String,
    #[serde(rename = "StartLine")]
    start_line: u32,
    #[serde(rename = "EndLine")]
    end_line: u32,
    #[serde(rename = "StartColumn")]
    start_column: u32,
    #[serde(rename = "EndColumn")]
    end_column: u32,
    #[serde(rename = "Match")]
    r#match: String,
    #[serde(rename = "Tags", default)]
    tags: Vec<String>,
}

impl From<RawFinding> for SecretFinding {
    fn from(raw: RawFinding) -> Self {
        SecretFinding {
            rule_id: raw.rule_id,
            start_line: raw.start_line,
            end_line: raw.end_line,
            start_column: raw.start_column,
            end_column: raw.end_column,
            r#match: raw.r#match,
            tags: raw.tags,
        }
    }
}

pub struct ProcessSecretScanner {
    scanner_binary: String,
}

impl Default for ProcessSecretScanner {
    fn default() -> Self {
        Self {
            scanner_binary: std::env::var("COPYTREE_SECRET_SCANNER").unwrap_or_else(|_| "gitleaks".to_string()),
        }
    }
}

impl ProcessSecretScanner {
    pub fn with_binary(scanner_binary: impl Into<String>) -> Self {
        Self { scanner_binary: scanner_binary.into() }
    }
}

#[async_trait]
impl SecretScanner for ProcessSecretScanner {
    async fn scan(&self, content: &str, logical_path: &str) -> Result<Vec<SecretFinding>, CopyTreeError> {
        let mut child = Command::new(&self.scanner_binary)
            .arg("stdin")
            .arg("--no-color")
            .arg("--report-format")
            .arg("json")
            .arg("--report-path")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| CopyTreeError::provider(self.scanner_binary.clone(), copytree_domain::ProviderErrorKind::ServiceUnavailable, format!("failed to spawn scanner: {err}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(content.as_bytes())
                .await
                .map_err(|err| CopyTreeError::provider(self.scanner_binary.clone(), copytree_domain::ProviderErrorKind::NetworkError, format!("writing to scanner stdin for {logical_path}: {err}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|err| CopyTreeError::provider(self.scanner_binary.clone(), copytree_domain::ProviderErrorKind::ServiceUnavailable, format!("scanner process failed: {err}")))?;

        if output.stdout.trim_ascii().is_empty() {
            return Ok(Vec::new());
        }

        let raw: Vec<RawFinding> = serde_json::from_slice(&output.stdout).unwrap_or_default();
        Ok(raw.into_iter().map(SecretFinding::from).collect())
    }
}
