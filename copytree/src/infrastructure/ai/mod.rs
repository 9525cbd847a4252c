// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # AI provider adapters (§4.10)
//!
//! [`HttpAiProvider`] talks to an OpenAI-compatible chat-completions
//! endpoint over `reqwest`; [`StubAiProvider`] returns a canned response
//! and never touches the network, used in tests and when no provider is
//! configured. [`retry::call_with_fallback`] owns the sleeping
//! retry/fallback loop over `copytree_domain::ports::ai`'s pure
//! `should_retry`/`backoff_delay_ms` decisions.

pub mod retry;

use async_trait::async_trait;
use copytree_domain::error::{CopyTreeError, ProviderErrorKind};
use copytree_domain::ports::ai::{ChatRequest, CompletionEnvelope, CompletionRequest};
use copytree_domain::ports::AiProvider;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

/// An OpenAI-compatible chat-completions HTTP client. Configuration comes
/// entirely from the constructor rather than ambient environment reads, so
/// bootstrap owns the one place that inspects `COPYTREE_AI_*` variables.
pub struct HttpAiProvider {
    name: String,
    priority: i32,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
    timeout: std::time::Duration,
}

impl HttpAiProvider {
    pub fn new(name: impl Into<String>, priority: i32, base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client: reqwest::Client::new(),
            timeout: std::time::Duration::from_secs(30),
        }
    }

    async fn call(&self, messages: Vec<serde_json::Value>, max_tokens: Option<u32>, model: Option<&str>) -> Result<CompletionEnvelope, CopyTreeError> {
        let start = Instant::now();
        let body = serde_json::json!({
            "model": model.unwrap_or(&self.model),
            "messages": messages,
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| classify_request_error(&self.name, &err))?;

        let status = response.status();
        if !status.is_success() {
            let kind = classify_status(status.as_u16());
            let message = response.text().await.unwrap_or_default();
            return Err(CopyTreeError::provider(self.name.clone(), kind, format!("HTTP {status}: {message}")));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| CopyTreeError::provider(self.name.clone(), ProviderErrorKind::InvalidRequest, err.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CopyTreeError::provider(self.name.clone(), ProviderErrorKind::InvalidRequest, "empty choices array"))?;

        Ok(CompletionEnvelope {
            content: choice.message.content,
            tokens_used: parsed.usage.map(|u| u.total_tokens),
            finish_reason: choice.finish_reason,
            model: parsed.model,
            request_id: parsed.id,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    id: Option<String>,
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

fn classify_status(status: u16) -> ProviderErrorKind {
    match status {
        429 => ProviderErrorKind::RateLimit,
        401 | 403 => ProviderErrorKind::Auth,
        402 => ProviderErrorKind::Quota,
        408 => ProviderErrorKind::Timeout,
        503 => ProviderErrorKind::ServiceUnavailable,
        _ => ProviderErrorKind::InvalidRequest,
    }
}

fn classify_request_error(name: &str, err: &reqwest::Error) -> CopyTreeError {
    let kind = if err.is_timeout() {
        ProviderErrorKind::Timeout
    } else if err.is_connect() {
        ProviderErrorKind::NetworkError
    } else {
        ProviderErrorKind::ServiceUnavailable
    };
    CopyTreeError::provider(name.to_string(), kind, err.to_string())
}

#[async_trait]
impl AiProvider for HttpAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn complete(&self, req: CompletionRequest) -> Result<CompletionEnvelope, CopyTreeError> {
        let messages = vec![serde_json::json!({ "role": "user", "content": req.prompt })];
        self.call(messages, req.max_tokens, req.model.as_deref()).await
    }

    async fn chat(&self, req: ChatRequest) -> Result<CompletionEnvelope, CopyTreeError> {
        let messages = req
            .messages
            .iter()
            .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
            .collect();
        self.call(messages, req.max_tokens, req.model.as_deref()).await
    }
}

/// Wraps a priority-ordered list of providers behind a single `AiProvider`
/// face, so a transformer that only knows how to call *one* provider
/// (§4.5's `AiSummaryTransformer`) transparently gets retry-with-fallback
/// across all of them.
pub struct FallbackAiProvider {
    providers: Vec<Arc<dyn AiProvider>>,
    policy: retry::RetryPolicy,
}

impl FallbackAiProvider {
    pub fn new(providers: Vec<Arc<dyn AiProvider>>, policy: retry::RetryPolicy) -> Self {
        Self { providers, policy }
    }
}

#[async_trait]
impl AiProvider for FallbackAiProvider {
    fn name(&self) -> &str {
        "fallback"
    }

    fn priority(&self) -> i32 {
        self.providers.iter().map(|p| p.priority()).max().unwrap_or(0)
    }

    async fn complete(&self, req: CompletionRequest) -> Result<CompletionEnvelope, CopyTreeError> {
        retry::call_with_fallback(&self.providers, &self.policy, |provider| {
            let req = req.clone();
            async move { provider.complete(req).await }
        })
        .await
    }

    async fn chat(&self, req: ChatRequest) -> Result<CompletionEnvelope, CopyTreeError> {
        retry::call_with_fallback(&self.providers, &self.policy, |provider| {
            let req = req.clone();
            async move { provider.chat(req).await }
        })
        .await
    }
}

/// Returns a fixed, deterministic response without making a network call —
/// used when no API key is configured (spec §6: "absence of an API key
/// downgrades AI transformers to inactive") and in tests.
pub struct StubAiProvider {
    pub name: String,
}

#[async_trait]
impl AiProvider for StubAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        0
    }

    async fn complete(&self, req: CompletionRequest) -> Result<CompletionEnvelope, CopyTreeError> {
        Ok(CompletionEnvelope {
            content: format!("[stub summary of {} chars]", req.prompt.len()),
            tokens_used: Some(0),
            finish_reason: Some("stop".to_string()),
            model: "stub".to_string(),
            request_id: None,
            latency_ms: 0,
        })
    }

    async fn chat(&self, req: ChatRequest) -> Result<CompletionEnvelope, CopyTreeError> {
        let chars: usize = req.messages.iter().map(|m| m.content.len()).sum();
        Ok(CompletionEnvelope {
            content: format!("[stub reply to {chars} chars]"),
            tokens_used: Some(0),
            finish_reason: Some("stop".to_string()),
            model: "stub".to_string(),
            request_id: None,
            latency_ms: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rate_limit_as_retryable() {
        assert_eq!(classify_status(429), ProviderErrorKind::RateLimit);
        assert!(classify_status(429).is_retryable());
        assert!(!classify_status(401).is_retryable());
    }

    #[tokio::test]
    async fn stub_provider_never_fails() {
        let provider = StubAiProvider { name: "stub".to_string() };
        let result = provider
            .complete(CompletionRequest { prompt: "hello".to_string(), max_tokens: None, model: None })
            .await
            .unwrap();
        assert!(result.content.contains("stub summary"));
    }
}
