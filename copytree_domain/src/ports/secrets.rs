// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `SecretScanner` port and redaction policy (§4.9, §7).

use crate::error::CopyTreeError;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct SecretFinding {
    pub rule_id: String,
    pub start_line: u32,
    pub end_line: u32,
    pub start_column: u32,
    pub end_column: u32,
    pub r#match: String,
    pub tags: Vec<String>,
}

#[async_trait]
pub trait SecretScanner: Send + Sync {
    /// Scans in-memory content (never spilled to a temp file) for a
    /// logical path, used only for rule context in findings.
    async fn scan(&self, content: &str, logical_path: &str) -> Result<Vec<SecretFinding>, CopyTreeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretsPolicy {
    Redact,
    Reject,
    ReportOnly,
}

/// Replaces every finding's matched span with `«REDACTED:ruleID»`,
/// scanning findings back-to-front so earlier offsets stay valid as later
/// ones are rewritten. Purely byte/char-offset driven — no re-scanning of
/// the rewritten content, so it cannot leak a match that straddles a
/// redaction boundary.
pub fn redact(content: &str, findings: &[SecretFinding]) -> String {
    let mut chars: Vec<char> = content.chars().collect();
    let mut line_starts = vec![0usize];
    for (i, c) in chars.iter().enumerate() {
        if *c == '\n' {
            line_starts.push(i + 1);
        }
    }

    let mut ordered: Vec<&SecretFinding> = findings.iter().collect();
    ordered.sort_by(|a, b| b.start_line.cmp(&a.start_line).then(b.start_column.cmp(&a.start_column)));

    for finding in ordered {
        let line_idx = finding.start_line.saturating_sub(1) as usize;
        let Some(&line_start) = line_starts.get(line_idx) else {
            continue;
        };
        let start = line_start + finding.start_column.saturating_sub(1) as usize;
        let end = (start + finding.r#match.chars().count()).min(chars.len());
        if start >= chars.len() || start > end {
            continue;
        }
        let placeholder: Vec<char> = format!("\u{ab}REDACTED:{}\u{bb}", finding.rule_id).chars().collect();
        chars.splice(start..end, placeholder);
    }

    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_single_line_match() {
        let content = "token = \"sk-live-abc123\"\n";
        let finding = SecretFinding {
            rule_id: "generic-api-key".to_string(),
            start_line: 1,
            end_line: 1,
            start_column: 10,
            end_column: 24,
            r#match: "\"sk-live-abc123\"".to_string(),
            tags: vec![],
        };
        let redacted = redact(content, &[finding]);
        assert!(!redacted.contains("sk-live-abc123"));
        assert!(redacted.contains("REDACTED:generic-api-key"));
    }
}
