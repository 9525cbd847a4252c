// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `copytree` CLI entry point
//!
//! Wires `copytree_bootstrap`'s parsed-and-validated CLI onto the
//! application's use cases: builds the `RuntimeServices` adapter bundle
//! (subprocess git, subprocess secret scanner, the standard transformer
//! registry, the two-tier cache, and — when configured — a SQLite
//! conversation store and one or more AI providers), loads a `.copytree.*`
//! profile if one applies, translates `Commands::Copy`/`Commands::Ask`
//! into a `PipelineOptions`, runs the pipeline, writes the artifact to
//! stdout or `--output`, and returns the process exit code `exit_code`
//! maps from the resulting `CopyTreeError` category.

use copytree::application::use_cases::{self, RuntimeServices};
use copytree::infrastructure::ai::{FallbackAiProvider, HttpAiProvider, StubAiProvider};
use copytree::infrastructure::ai::retry::RetryPolicy;
use copytree::infrastructure::cache::TwoTierCache;
use copytree::infrastructure::conversation::SqliteConversationStore;
use copytree::infrastructure::git::ProcessGitService;
use copytree::infrastructure::profile;
use copytree::infrastructure::secrets::ProcessSecretScanner;
use copytree::infrastructure::transformers::standard_registry;
use copytree::application::pipeline::{BroadcastEventSink, TokioCancellation};
use copytree_bootstrap::cli::{Commands, FormatArg, SecretsArg, SortArg};
use copytree_bootstrap::{map_error_category_to_exit_code, ExitCode};
use copytree_domain::error::CopyTreeError;
use copytree_domain::payload::{OutputFormat, PipelineOptions, SecretsPolicy, SortOrder};
use copytree_domain::ports::stage::PipelineContext;
use copytree_domain::ports::AiProvider;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let validated = match copytree_bootstrap::bootstrap_cli() {
        Ok(validated) => validated,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::ConfigurationError.into();
        }
    };

    let cli = validated.command;
    init_tracing(cli.verbose, cli.json_logs);

    let outcome = match cli.command {
        cmd @ Commands::Copy { .. } => run_copy(cmd).await,
        cmd @ Commands::Ask { .. } => run_ask(cmd).await,
    };

    match outcome {
        Ok(code) => code.into(),
        Err(err) => {
            error!(error = %err, "copytree failed");
            eprintln!("error: {err}");
            map_error_category_to_exit_code(&err).into()
        }
    }
}

/// Uses `FmtSubscriber::builder().with_max_level(...)` for verbosity
/// rather than `EnvFilter`, so no extra `tracing-subscriber` feature is
/// needed beyond the default `fmt` one already enabled.
fn init_tracing(verbose: u8, json_logs: bool) {
    let level = match copytree_bootstrap::config::LogLevel::from_verbosity(verbose) {
        copytree_bootstrap::config::LogLevel::Error => tracing::Level::ERROR,
        copytree_bootstrap::config::LogLevel::Warn => tracing::Level::WARN,
        copytree_bootstrap::config::LogLevel::Info => tracing::Level::INFO,
        copytree_bootstrap::config::LogLevel::Debug => tracing::Level::DEBUG,
        copytree_bootstrap::config::LogLevel::Trace => tracing::Level::TRACE,
    };
    let subscriber = tracing_subscriber::fmt().with_max_level(level);
    if json_logs {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}

async fn build_runtime_services(cache_dir: &std::path::Path, ai_enabled: bool) -> Result<RuntimeServices, CopyTreeError> {
    let git: Arc<dyn copytree_domain::ports::GitService> = Arc::new(ProcessGitService::default());
    let scanner: Arc<dyn copytree_domain::ports::SecretScanner> = Arc::new(ProcessSecretScanner::default());
    let cache: Arc<dyn copytree_domain::ports::Cache> = Arc::new(TwoTierCache::new(cache_dir.join("transform-cache")));

    let ai_provider = if ai_enabled { build_ai_provider() } else { None };

    let registry = Arc::new(standard_registry(ai_provider.clone(), Some(Arc::clone(&cache)))?);

    let mut services = RuntimeServices::new(git, scanner, registry, cache_dir.join("external-sources"));
    if let Some(provider) = ai_provider {
        services = services.with_ai_providers(vec![provider]);
    }
    Ok(services)
}

/// Builds an AI provider from `COPYTREE_AI_*` environment variables — the
/// one place in the crate that reads them, per the adapter's own doc
/// comment. Absent an API key, a `StubAiProvider` keeps AI-dependent
/// transformers functional without a network call (spec §6).
fn build_ai_provider() -> Option<Arc<dyn AiProvider>> {
    let api_key = std::env::var("COPYTREE_AI_API_KEY").ok();
    match api_key {
        Some(key) if !key.is_empty() => {
            let base_url = std::env::var("COPYTREE_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
            let model = std::env::var("COPYTREE_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
            let primary: Arc<dyn AiProvider> = Arc::new(HttpAiProvider::new("primary", 10, base_url, key, model));
            let fallback: Arc<dyn AiProvider> = Arc::new(StubAiProvider { name: "stub-fallback".to_string() });
            Some(Arc::new(FallbackAiProvider::new(vec![primary, fallback], RetryPolicy::default())))
        }
        _ => Some(Arc::new(StubAiProvider { name: "stub".to_string() })),
    }
}

async fn run_copy(command: Commands) -> Result<ExitCode, CopyTreeError> {
    let Commands::Copy {
        path,
        include,
        exclude,
        always,
        modified,
        changes,
        respect_gitignore,
        max_depth,
        max_file_size,
        max_total_size,
        max_file_count,
        transform,
        transformers,
        include_hidden,
        follow_symlinks,
        with_git_status,
        dedupe,
        sort,
        format,
        only_tree,
        add_line_numbers,
        show_size,
        instructions,
        char_limit,
        stream,
        output,
        secrets_policy,
        secrets_report,
        dry_run,
        walker_concurrency,
        profile: profile_name,
    } = command
    else {
        unreachable!("run_copy called with a non-Copy command");
    };

    if let Some(instructions) = &instructions {
        copytree_bootstrap::cli::reject_shell_metacharacters(instructions, "instructions").map_err(|e| CopyTreeError::configuration(e.to_string()))?;
    }

    let base_dir = copytree_bootstrap::cli::canonicalize_existing(&path).map_err(|e| CopyTreeError::configuration(e.to_string()))?;

    let app_config = copytree_bootstrap::AppConfig::builder()
        .base_path(base_dir.clone())
        .walker_concurrency(walker_concurrency)
        .dry_run(dry_run)
        .output(output.clone())
        .profile(profile_name.clone())
        .build();

    let mut options = PipelineOptions {
        include,
        exclude,
        always,
        modified_only: modified,
        changes,
        respect_gitignore,
        max_depth,
        max_file_size,
        max_total_size,
        max_file_count,
        transform: transform || !transformers.is_empty(),
        transformers,
        include_hidden,
        follow_symlinks,
        with_git_status,
        dedupe,
        sort: sort.map(to_domain_sort),
        format: to_domain_format(format),
        only_tree,
        add_line_numbers,
        show_size,
        instructions,
        char_limit,
        stream,
        secrets_policy: to_domain_secrets_policy(secrets_policy),
        dry_run,
        walker_concurrency,
    };

    if let Some(profile) = profile::load_profile(&app_config.base_path, app_config.profile.as_deref(), None)? {
        profile::apply_profile(&mut options, &profile);
    }

    let cache_dir = cache_root_for(&app_config.base_path);
    let ai_enabled = options.transformers.iter().any(|t| t == "ai-summary") || options.transform;
    let services = build_runtime_services(&cache_dir, ai_enabled).await?;
    let ctx = build_pipeline_context();

    let payload = if app_config.dry_run {
        use_cases::dry_run(app_config.base_path.clone(), options, &services, &ctx).await?
    } else {
        use_cases::run(app_config.base_path.clone(), options, &services, &ctx).await?
    };

    if let Some(report_path) = &secrets_report {
        write_secrets_report(report_path, &payload)?;
    }

    if !payload.warnings.is_empty() {
        for warning in &payload.warnings {
            tracing::warn!(%warning, "pipeline warning");
        }
    }

    if let Some(artifact) = &payload.artifact {
        write_artifact(artifact, app_config.output.as_deref())?;
    } else {
        info!(files = payload.files.len(), "dry run complete, no artifact written");
    }

    Ok(ExitCode::Success)
}

async fn run_ask(command: Commands) -> Result<ExitCode, CopyTreeError> {
    let Commands::Ask { path, conversation_id, question, metrics_addr } = command else {
        unreachable!("run_ask called with a non-Ask command");
    };

    let base_dir = copytree_bootstrap::cli::canonicalize_existing(&path).map_err(|e| CopyTreeError::configuration(e.to_string()))?;
    let cache_dir = cache_root_for(&base_dir);

    let conversation_db = std::env::var("COPYTREE_CONVERSATION_DB").unwrap_or_else(|_| cache_dir.join("conversations.db").to_string_lossy().to_string());
    let store = Arc::new(SqliteConversationStore::new(&conversation_db).await?);

    let mut services = build_runtime_services(&cache_dir, true).await?;
    services = services.with_conversation_store(store);

    if let Some(addr) = metrics_addr {
        let metrics = Arc::new(copytree::infrastructure::metrics::Metrics::new()?);
        services = services.with_metrics(Arc::clone(&metrics));
        tokio::spawn(async move {
            if let Err(err) = copytree::infrastructure::metrics::serve(metrics, addr).await {
                tracing::warn!(error = %err, "metrics listener stopped");
            }
        });
    }

    let options = PipelineOptions::default();
    let ctx = build_pipeline_context();
    let ttl_seconds = 24 * 60 * 60;
    let max_messages = 50;

    let (conversation_id, answer) = use_cases::ask(base_dir, options, &services, &ctx, conversation_id, question, ttl_seconds, max_messages).await?;

    println!("conversation: {conversation_id}");
    println!("{answer}");
    Ok(ExitCode::Success)
}

fn cache_root_for(base_dir: &std::path::Path) -> PathBuf {
    std::env::var("COPYTREE_CACHE_DIR").map(PathBuf::from).unwrap_or_else(|_| base_dir.join(".copytree-cache"))
}

/// Builds a fresh `PipelineContext` wired to `ctrl_c` (cancellation) and a
/// broadcast channel whose events are logged at debug level.
fn build_pipeline_context() -> PipelineContext {
    let cancel_token = tokio_util::sync::CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let (tx, mut rx) = tokio::sync::broadcast::channel(256);
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            tracing::debug!(?event, "pipeline event");
        }
    });

    PipelineContext::new(Arc::new(TokioCancellation(cancel_token)), Arc::new(BroadcastEventSink(tx)))
}

fn write_artifact(bytes: &[u8], output: Option<&std::path::Path>) -> Result<(), CopyTreeError> {
    match output {
        Some(path) => std::fs::write(path, bytes).map_err(|e| CopyTreeError::file_system(path.display().to_string(), "write", e.to_string())),
        None => std::io::stdout().write_all(bytes).map_err(|e| CopyTreeError::Io(e.to_string())),
    }
}

/// Writes the secret-scan findings collected during `Format` to a separate
/// report file (spec §4.9). SARIF by extension, a plain JSON array
/// otherwise — the same `SarifWriter` the `--format sarif` artifact uses,
/// rendered over an empty file list since a report is findings-only.
fn write_secrets_report(path: &std::path::Path, payload: &copytree_domain::payload::PipelinePayload) -> Result<(), CopyTreeError> {
    let is_sarif = path.extension().map(|ext| ext.eq_ignore_ascii_case("sarif")).unwrap_or(false);

    let bytes = if is_sarif {
        let ctx = copytree::infrastructure::format::RenderContext {
            base_dir: &payload.base_dir,
            options: &payload.options,
            secret_findings: &payload.secret_findings,
        };
        copytree::infrastructure::format::render(&copytree::infrastructure::format::sarif::SarifWriter, &[], &ctx)
    } else {
        let findings: Vec<serde_json::Value> = payload
            .secret_findings
            .iter()
            .map(|f| {
                serde_json::json!({
                    "ruleId": f.rule_id,
                    "startLine": f.start_line,
                    "endLine": f.end_line,
                    "startColumn": f.start_column,
                    "endColumn": f.end_column,
                    "match": f.r#match,
                    "tags": f.tags,
                })
            })
            .collect();
        serde_json::to_vec_pretty(&findings).map_err(|e| CopyTreeError::Serialization(e.to_string()))?
    };

    std::fs::write(path, bytes).map_err(|e| CopyTreeError::file_system(path.display().to_string(), "write", e.to_string()))
}

fn to_domain_format(format: FormatArg) -> OutputFormat {
    match format {
        FormatArg::Xml => OutputFormat::Xml,
        FormatArg::Json => OutputFormat::Json,
        FormatArg::Markdown => OutputFormat::Markdown,
        FormatArg::Tree => OutputFormat::Tree,
        FormatArg::Ndjson => OutputFormat::Ndjson,
        FormatArg::Sarif => OutputFormat::Sarif,
    }
}

fn to_domain_sort(sort: SortArg) -> SortOrder {
    match sort {
        SortArg::Path => SortOrder::Path,
        SortArg::Size => SortOrder::Size,
        SortArg::Modified => SortOrder::Modified,
        SortArg::Name => SortOrder::Name,
        SortArg::Extension => SortOrder::Extension,
        SortArg::Depth => SortOrder::Depth,
    }
}

fn to_domain_secrets_policy(policy: SecretsArg) -> SecretsPolicy {
    match policy {
        SecretsArg::Redact => SecretsPolicy::Redact,
        SecretsArg::Reject => SecretsPolicy::Reject,
        SecretsArg::ReportOnly => SecretsPolicy::ReportOnly,
    }
}
