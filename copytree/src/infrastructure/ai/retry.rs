// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Priority-ordered multi-provider fallback with sleeping backoff (§4.10).
//!
//! Providers are tried highest-`priority()`-first. A retryable error is
//! retried against the *same* provider up to `max_retries_per_provider`
//! times before advancing; a non-retryable error advances immediately. If
//! every provider is exhausted, the last error observed is returned.

use copytree_domain::error::CopyTreeError;
use copytree_domain::ports::ai::{backoff_delay_ms, should_retry};
use copytree_domain::ports::AiProvider;
use std::sync::Arc;

pub struct RetryPolicy {
    pub max_retries_per_provider: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries_per_provider: 3, base_delay_ms: 250, max_delay_ms: 10_000 }
    }
}

/// Runs `call` against each provider in descending priority order,
/// retrying retryable errors in place before advancing to the next
/// provider. `providers` need not be pre-sorted.
pub async fn call_with_fallback<T, F, Fut>(providers: &[Arc<dyn AiProvider>], policy: &RetryPolicy, mut call: F) -> Result<T, CopyTreeError>
where
    F: FnMut(Arc<dyn AiProvider>) -> Fut,
    Fut: std::future::Future<Output = Result<T, CopyTreeError>>,
{
    if providers.is_empty() {
        return Err(CopyTreeError::configuration("no AI providers configured"));
    }

    let mut ordered: Vec<Arc<dyn AiProvider>> = providers.to_vec();
    ordered.sort_by(|a, b| b.priority().cmp(&a.priority()));

    let mut last_error: Option<CopyTreeError> = None;

    for provider in ordered {
        for attempt in 0..=policy.max_retries_per_provider {
            match call(provider.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let retryable = should_retry(&err) && attempt < policy.max_retries_per_provider;
                    last_error = Some(err);
                    if !retryable {
                        break;
                    }
                    let delay = backoff_delay_ms(attempt, policy.base_delay_ms, policy.max_delay_ms);
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| CopyTreeError::internal("AI provider fallback exhausted with no recorded error")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytree_domain::error::ProviderErrorKind;
    use copytree_domain::ports::ai::{ChatRequest, CompletionEnvelope, CompletionRequest};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyProvider {
        name: &'static str,
        priority: i32,
        fail_times: usize,
        calls: AtomicUsize,
        kind: ProviderErrorKind,
    }

    #[async_trait::async_trait]
    impl AiProvider for FlakyProvider {
        fn name(&self) -> &str {
            self.name
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        async fn complete(&self, _req: CompletionRequest) -> Result<CompletionEnvelope, CopyTreeError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(CopyTreeError::provider(self.name.to_string(), self.kind, "flaky"))
            } else {
                Ok(CompletionEnvelope {
                    content: format!("ok from {}", self.name),
                    tokens_used: None,
                    finish_reason: None,
                    model: "x".to_string(),
                    request_id: None,
                    latency_ms: 0,
                })
            }
        }
        async fn chat(&self, _req: ChatRequest) -> Result<CompletionEnvelope, CopyTreeError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn retries_then_succeeds_on_same_provider() {
        let provider: Arc<dyn AiProvider> = Arc::new(FlakyProvider {
            name: "a",
            priority: 1,
            fail_times: 2,
            calls: AtomicUsize::new(0),
            kind: ProviderErrorKind::RateLimit,
        });
        let policy = RetryPolicy { max_retries_per_provider: 3, base_delay_ms: 1, max_delay_ms: 5 };
        let result = call_with_fallback(&[provider], &policy, |p| async move { p.complete(CompletionRequest { prompt: "hi".into(), max_tokens: None, model: None }).await }).await;
        assert_eq!(result.unwrap().content, "ok from a");
    }

    #[tokio::test]
    async fn non_retryable_advances_to_next_provider() {
        let a: Arc<dyn AiProvider> = Arc::new(FlakyProvider {
            name: "a",
            priority: 2,
            fail_times: 99,
            calls: AtomicUsize::new(0),
            kind: ProviderErrorKind::Auth,
        });
        let b: Arc<dyn AiProvider> = Arc::new(FlakyProvider {
            name: "b",
            priority: 1,
            fail_times: 0,
            calls: AtomicUsize::new(0),
            kind: ProviderErrorKind::Auth,
        });
        let policy = RetryPolicy::default();
        let result = call_with_fallback(&[a, b], &policy, |p| async move { p.complete(CompletionRequest { prompt: "hi".into(), max_tokens: None, model: None }).await }).await;
        assert_eq!(result.unwrap().content, "ok from b");
    }

    #[tokio::test]
    async fn all_providers_failing_returns_last_error() {
        let a: Arc<dyn AiProvider> = Arc::new(FlakyProvider {
            name: "a",
            priority: 1,
            fail_times: 99,
            calls: AtomicUsize::new(0),
            kind: ProviderErrorKind::Auth,
        });
        let policy = RetryPolicy::default();
        let result = call_with_fallback(&[a], &policy, |p| async move { p.complete(CompletionRequest { prompt: "hi".into(), max_tokens: None, model: None }).await }).await;
        assert!(result.is_err());
    }
}
