// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Use cases — the composition root
//!
//! Assembles the fixed-topology `Pipeline` (§4.1) from a [`RuntimeServices`]
//! bundle and exposes the four entry points `copytree_domain`/`lib.rs`
//! documents: `build` (assemble, no run), `run` (full pipeline), `dry_run`
//! (run without exposing bytes to a sink — the sink itself is a caller
//! concern per §2's flow diagram, "Sink … via caller"), and `ask`
//! (§4.12, the optional conversation-backed "ask" command). Wires ports
//! to adapters without either layer depending on the concrete choice
//! directly.

use super::pipeline::Pipeline;
use super::stages::{
    always_include::AlwaysIncludeStage, dedup_sort::DedupStage, dedup_sort::SortStage, discovery::DiscoveryStage,
    external_source_merge::ExternalSourceMergeStage, format::FormatStage, git_filter::GitFilterStage, limit::LimitAndCharLimitStage,
    load::LoadStage, metadata_injection::MetadataInjectionStage, ruleset_filter::RulesetFilterStage, transform::TransformStage,
};
use crate::infrastructure::external_source::{ExternalSourceResolver, ExternalSourceSpec};
use crate::infrastructure::metrics::Metrics;
use crate::infrastructure::transformers::TransformerRegistry;
use copytree_domain::error::CopyTreeError;
use copytree_domain::payload::{PipelineOptions, PipelinePayload};
use copytree_domain::ports::stage::PipelineContext;
use copytree_domain::ports::{AiProvider, ChatMessage, ChatRequest, ConversationMessage, ConversationStore, GitService, SecretScanner};
use std::path::PathBuf;
use std::sync::Arc;

/// Every live adapter a pipeline run needs, gathered so `build` never has
/// to know how each one was constructed (subprocess, HTTP client, two-tier
/// cache directory, …) — that choice is bootstrap's.
pub struct RuntimeServices {
    pub git: Arc<dyn GitService>,
    pub secret_scanner: Arc<dyn SecretScanner>,
    pub registry: Arc<TransformerRegistry>,
    pub external_source_cache_root: PathBuf,
    pub external_sources: Vec<ExternalSourceSpec>,
    pub conversation_store: Option<Arc<dyn ConversationStore>>,
    pub ai_providers: Vec<Arc<dyn AiProvider>>,
    pub metrics: Option<Arc<Metrics>>,
}

impl RuntimeServices {
    pub fn new(
        git: Arc<dyn GitService>,
        secret_scanner: Arc<dyn SecretScanner>,
        registry: Arc<TransformerRegistry>,
        external_source_cache_root: PathBuf,
    ) -> Self {
        Self {
            git,
            secret_scanner,
            registry,
            external_source_cache_root,
            external_sources: Vec::new(),
            conversation_store: None,
            ai_providers: Vec::new(),
            metrics: None,
        }
    }

    pub fn with_external_sources(mut self, sources: Vec<ExternalSourceSpec>) -> Self {
        self.external_sources = sources;
        self
    }

    pub fn with_conversation_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.conversation_store = Some(store);
        self
    }

    pub fn with_ai_providers(mut self, providers: Vec<Arc<dyn AiProvider>>) -> Self {
        self.ai_providers = providers;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Assembles the fixed eleven-stage topology (§4.1): Discovery →
/// GitFilter → RulesetFilter → AlwaysInclude → ExternalSourceMerge →
/// LimitAndCharLimit → Load → Transform → MetadataInjection →
/// DedupAndSort (two stages) → Format. Every stage is always present;
/// stages documented as conditional are no-ops when their trigger option
/// is unset, never absent from the graph.
pub fn build(services: &RuntimeServices) -> Pipeline {
    let pipeline = Pipeline::new(vec![
        Arc::new(DiscoveryStage),
        Arc::new(GitFilterStage::new(Arc::clone(&services.git))),
        Arc::new(RulesetFilterStage),
        Arc::new(AlwaysIncludeStage),
        Arc::new(ExternalSourceMergeStage::new(build_resolver(services), services.external_sources.clone())),
        Arc::new(LimitAndCharLimitStage),
        Arc::new(LoadStage::new(Arc::clone(&services.registry))),
        Arc::new(TransformStage::new(Arc::clone(&services.registry))),
        Arc::new(MetadataInjectionStage),
        Arc::new(DedupStage),
        Arc::new(SortStage),
        Arc::new(FormatStage::new(Arc::clone(&services.secret_scanner))),
    ]);
    match &services.metrics {
        Some(metrics) => pipeline.with_metrics(Arc::clone(metrics)),
        None => pipeline,
    }
}

/// `ExternalSourceResolver` only holds an `Arc<dyn GitService>` and a
/// `PathBuf`, so it is cheap (and correct) to build one per pipeline build
/// rather than require `RuntimeServices` to hand out a shared instance.
fn build_resolver(services: &RuntimeServices) -> ExternalSourceResolver {
    ExternalSourceResolver::new(Arc::clone(&services.git), services.external_source_cache_root.clone())
}

/// Runs the full pipeline against `base_dir` and returns the final
/// payload, artifact bytes included.
pub async fn run(
    base_dir: PathBuf,
    options: PipelineOptions,
    services: &RuntimeServices,
    ctx: &PipelineContext,
) -> Result<PipelinePayload, CopyTreeError> {
    let pipeline = build(services);
    let payload = PipelinePayload::new(base_dir, Arc::new(options));
    pipeline.process(payload, ctx).await
}

/// Runs the full pipeline but never lets the artifact reach a sink — the
/// caller gets back `files`/`stats`/`warnings` for a preview, with
/// `artifact` always `None` regardless of what `Format` produced. This is
/// the pipeline-side half of `--dry-run` (§6); the CLI-side half is simply
/// "don't open the output sink at all".
pub async fn dry_run(
    base_dir: PathBuf,
    mut options: PipelineOptions,
    services: &RuntimeServices,
    ctx: &PipelineContext,
) -> Result<PipelinePayload, CopyTreeError> {
    options.dry_run = true;
    let mut payload = run(base_dir, options, services, ctx).await?;
    payload.artifact = None;
    Ok(payload)
}

/// The "ask" use case (§4.12): runs the pipeline to gather `base_dir`'s
/// context, appends the user's question to the named conversation
/// (creating one with `ttl_seconds` if `conversation_id` is `None`), sends
/// the full message history to the configured AI providers, and records
/// the assistant's reply before returning it.
///
/// Requires both a [`ConversationStore`] and at least one [`AiProvider`]
/// in `services`; absent either, this is a `ConfigurationError` rather
/// than a silent no-op, since "ask" without persistence or a model is not
/// a degraded mode, it is a different command that was never configured.
pub async fn ask(
    base_dir: PathBuf,
    options: PipelineOptions,
    services: &RuntimeServices,
    ctx: &PipelineContext,
    conversation_id: Option<String>,
    question: String,
    ttl_seconds: i64,
    max_messages: usize,
) -> Result<(String, String), CopyTreeError> {
    let store = services
        .conversation_store
        .as_ref()
        .ok_or_else(|| CopyTreeError::configuration("ask requires a configured conversation store"))?;

    if services.ai_providers.is_empty() {
        return Err(CopyTreeError::configuration("ask requires at least one configured AI provider"));
    }

    let conversation = match conversation_id {
        Some(id) => store
            .get(&id)
            .await?
            .ok_or_else(|| CopyTreeError::configuration(format!("no such conversation: {id}")))?,
        None => store.create(ttl_seconds).await?,
    };

    let payload = run(base_dir, options, services, ctx).await?;
    let context_summary = summarize_files_for_prompt(&payload);

    store
        .add_message(
            &conversation.id,
            ConversationMessage { role: "user".to_string(), content: question.clone(), created_at: chrono::Utc::now() },
            max_messages,
        )
        .await?;

    let mut messages: Vec<ChatMessage> = vec![ChatMessage {
        role: "system".to_string(),
        content: format!("You are answering questions about the following project contents:\n{context_summary}"),
    }];
    messages.extend(conversation.messages.iter().map(|m| ChatMessage { role: m.role.clone(), content: m.content.clone() }));
    messages.push(ChatMessage { role: "user".to_string(), content: question });

    let policy = crate::infrastructure::ai::retry::RetryPolicy::default();
    let request = ChatRequest { messages, max_tokens: None, model: None };
    let envelope = crate::infrastructure::ai::retry::call_with_fallback(&services.ai_providers, &policy, |provider| {
        let request = request.clone();
        async move { provider.chat(request).await }
    })
    .await?;

    store
        .add_message(
            &conversation.id,
            ConversationMessage { role: "assistant".to_string(), content: envelope.content.clone(), created_at: chrono::Utc::now() },
            max_messages,
        )
        .await?;

    Ok((conversation.id, envelope.content))
}

/// A short, bounded digest of the discovered files for the system prompt
/// — full file contents are not inlined here; the AI-summary transformer
/// (§4.5) is the mechanism for compressing large trees, not this use case.
fn summarize_files_for_prompt(payload: &PipelinePayload) -> String {
    payload
        .files
        .iter()
        .take(200)
        .map(|f| f.relative_path().as_str().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::git::ProcessGitService;
    use crate::infrastructure::secrets::ProcessSecretScanner;
    use crate::infrastructure::transformers::standard_registry;

    fn test_services(tmp: &std::path::Path) -> RuntimeServices {
        let git: Arc<dyn GitService> = Arc::new(ProcessGitService::default());
        let scanner: Arc<dyn SecretScanner> = Arc::new(ProcessSecretScanner::default());
        let registry = Arc::new(standard_registry(None, None).unwrap());
        RuntimeServices::new(git, scanner, registry, tmp.join("external-cache"))
    }

    #[tokio::test]
    async fn build_assembles_the_full_fixed_topology() {
        let tmp = tempfile::tempdir().unwrap();
        let services = test_services(tmp.path());
        let pipeline = build(&services);
        assert_eq!(pipeline.stage_count(), 11);
    }

    #[tokio::test]
    async fn run_over_an_empty_directory_produces_an_empty_artifact_payload() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "hello").unwrap();
        let services = test_services(tmp.path());
        let ctx = PipelineContext::for_testing();
        let payload = run(tmp.path().to_path_buf(), PipelineOptions::default(), &services, &ctx).await.unwrap();
        assert_eq!(payload.files.len(), 1);
        assert!(payload.artifact.is_some());
    }

    #[tokio::test]
    async fn dry_run_never_exposes_artifact_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "hello").unwrap();
        let services = test_services(tmp.path());
        let ctx = PipelineContext::for_testing();
        let payload = dry_run(tmp.path().to_path_buf(), PipelineOptions::default(), &services, &ctx).await.unwrap();
        assert_eq!(payload.files.len(), 1);
        assert!(payload.artifact.is_none());
    }

    #[tokio::test]
    async fn ask_without_a_conversation_store_is_a_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let services = test_services(tmp.path());
        let ctx = PipelineContext::for_testing();
        let result = ask(
            tmp.path().to_path_buf(),
            PipelineOptions::default(),
            &services,
            &ctx,
            None,
            "what does this do?".to_string(),
            3600,
            50,
        )
        .await;
        assert!(matches!(result, Err(CopyTreeError::Configuration(_))));
    }
}
