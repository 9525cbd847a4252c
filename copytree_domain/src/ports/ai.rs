// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `AiProvider` port (§4.10) and the pure parts of its retry/fallback
//! policy. The loop that actually sleeps between attempts lives in
//! `copytree::infrastructure::ai::retry`, since sleeping needs a runtime;
//! this module only decides *whether* and *how long*.

use crate::error::{CopyTreeError, ProviderErrorKind};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompletionEnvelope {
    pub content: String,
    pub tokens_used: Option<u32>,
    pub finish_reason: Option<String>,
    pub model: String,
    pub request_id: Option<String>,
    pub latency_ms: u64,
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &str;
    /// Providers are tried in descending priority order when several are
    /// configured.
    fn priority(&self) -> i32;
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionEnvelope, CopyTreeError>;
    async fn chat(&self, req: ChatRequest) -> Result<CompletionEnvelope, CopyTreeError>;
}

/// `true` if a failed call against the *current* provider should be
/// retried rather than advancing to the next provider in priority order.
pub fn should_retry(error: &CopyTreeError) -> bool {
    match error {
        CopyTreeError::Provider { kind, .. } => kind.is_retryable(),
        _ => false,
    }
}

/// Exponential backoff with a cap, `base_ms * 2^attempt` clamped to
/// `max_delay_ms`. `attempt` is zero-based (the delay before the *second*
/// attempt is `backoff_delay(0, ..)`).
pub fn backoff_delay_ms(attempt: u32, base_ms: u64, max_delay_ms: u64) -> u64 {
    base_ms.saturating_mul(1u64 << attempt.min(20)).min(max_delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(ProviderErrorKind::RateLimit.is_retryable());
        assert!(ProviderErrorKind::Timeout.is_retryable());
        assert!(!ProviderErrorKind::Auth.is_retryable());
        assert!(!ProviderErrorKind::InvalidRequest.is_retryable());
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(backoff_delay_ms(0, 100, 5_000), 100);
        assert_eq!(backoff_delay_ms(10, 100, 5_000), 5_000);
    }
}
