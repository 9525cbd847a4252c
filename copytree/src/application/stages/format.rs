// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # FormatStage (§4.1 step 11, §4.6, §4.9)
//!
//! Scans every text file's content for secrets, applies the configured
//! [`SecretsPolicy`], then renders the final artifact bytes via the
//! writer selected by `options.format` and stores them on
//! `payload.artifact`. The only stage permitted to populate `artifact` or
//! `secret_findings`.

use crate::infrastructure::format::{render_for_format, RenderContext};
use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::file_record::FileContent;
use copytree_domain::payload::{PipelinePayload, SecretsPolicy};
use copytree_domain::ports::stage::{PipelineContext, Stage};
use copytree_domain::ports::SecretScanner;
use std::sync::Arc;

pub struct FormatStage {
    scanner: Arc<dyn SecretScanner>,
}

impl FormatStage {
    pub fn new(scanner: Arc<dyn SecretScanner>) -> Self {
        Self { scanner }
    }

    async fn scan_and_apply_policy(&self, mut input: PipelinePayload) -> Result<PipelinePayload, CopyTreeError> {
        let mut rejected_count = 0usize;

        for index in 0..input.files.len() {
            let (path, text) = {
                let file = &input.files[index];
                match file.content() {
                    FileContent::Text(text) => (file.relative_path().as_str().to_string(), text.clone()),
                    _ => continue,
                }
            };

            let findings = self.scanner.scan(&text, &path).await?;
            if findings.is_empty() {
                continue;
            }

            match input.options.secrets_policy {
                SecretsPolicy::Redact => {
                    let redacted = copytree_domain::ports::secrets::redact(&text, &findings);
                    input.files[index].set_content_text(redacted);
                }
                SecretsPolicy::Reject => {
                    rejected_count += findings.len();
                }
                SecretsPolicy::ReportOnly => {
                    input.secret_findings.extend(findings);
                }
            }
        }

        if rejected_count > 0 {
            return Err(CopyTreeError::SecretsDetected { count: rejected_count });
        }
        Ok(input)
    }
}

#[async_trait]
impl Stage for FormatStage {
    fn name(&self) -> &str {
        "format"
    }

    async fn process(&self, input: PipelinePayload, _ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
        let mut payload = self.scan_and_apply_policy(input).await?;

        let artifact = {
            let render_ctx = RenderContext {
                base_dir: &payload.base_dir,
                options: &payload.options,
                secret_findings: &payload.secret_findings,
            };
            render_for_format(&payload.files, &render_ctx)
        };

        payload = payload.with_artifact(artifact);
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytree_domain::payload::{OutputFormat, PipelineOptions};
    use copytree_domain::ports::secrets::SecretFinding;
    use copytree_domain::value_objects::RelativePath;
    use copytree_domain::FileRecord;

    struct FakeScanner(Vec<SecretFinding>);

    #[async_trait]
    impl SecretScanner for FakeScanner {
        async fn scan(&self, _content: &str, _logical_path: &str) -> Result<Vec<SecretFinding>, CopyTreeError> {
            Ok(self.0.clone())
        }
    }

    fn finding() -> SecretFinding {
        SecretFinding { rule_id: "aws-key".to_string(), start_line: 1, end_line: 1, start_column: 1, end_column: 10, r#match: "AKIA...".to_string(), tags: vec![] }
    }

    fn text_file(path: &str, content: &str) -> FileRecord {
        FileRecord::discovered(RelativePath::new(path).unwrap(), std::path::PathBuf::from(path), content.len() as u64, None)
            .with_content(FileContent::Text(content.to_string()), false, None)
    }

    fn payload(content: &str, policy: SecretsPolicy) -> PipelinePayload {
        let options = PipelineOptions { secrets_policy: policy, format: OutputFormat::Json, ..PipelineOptions::default() };
        copytree_domain::payload::PipelinePayload::new(std::path::PathBuf::from("/repo"), std::sync::Arc::new(options))
            .with_files(vec![text_file("secret.env", content)])
    }

    #[tokio::test]
    async fn redact_policy_rewrites_content_and_still_produces_an_artifact() {
        let scanner: Arc<dyn SecretScanner> = Arc::new(FakeScanner(vec![finding()]));
        let out = FormatStage::new(scanner).process(payload("AKIA...", SecretsPolicy::Redact), &PipelineContext::for_testing()).await.unwrap();
        assert!(out.artifact.is_some());
        assert!(!out.files[0].content().as_text().unwrap().contains("AKIA..."));
    }

    #[tokio::test]
    async fn reject_policy_fails_the_stage() {
        let scanner: Arc<dyn SecretScanner> = Arc::new(FakeScanner(vec![finding()]));
        let err = FormatStage::new(scanner).process(payload("AKIA...", SecretsPolicy::Reject), &PipelineContext::for_testing()).await.unwrap_err();
        assert!(matches!(err, CopyTreeError::SecretsDetected { count: 1 }));
    }

    #[tokio::test]
    async fn report_only_policy_keeps_content_and_records_findings() {
        let scanner: Arc<dyn SecretScanner> = Arc::new(FakeScanner(vec![finding()]));
        let out = FormatStage::new(scanner).process(payload("AKIA...", SecretsPolicy::ReportOnly), &PipelineContext::for_testing()).await.unwrap();
        assert_eq!(out.secret_findings.len(), 1);
        assert!(out.files[0].content().as_text().unwrap().contains("AKIA..."));
    }

    #[tokio::test]
    async fn no_findings_produces_an_artifact_untouched() {
        let scanner: Arc<dyn SecretScanner> = Arc::new(FakeScanner(vec![]));
        let out = FormatStage::new(scanner).process(payload("nothing here", SecretsPolicy::Redact), &PipelineContext::for_testing()).await.unwrap();
        assert!(out.artifact.is_some());
        assert!(out.secret_findings.is_empty());
    }
}
