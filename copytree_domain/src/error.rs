// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A hierarchical error taxonomy for the CopyTree pipeline, in the same
//! spirit as a typical domain-driven error design: one enum per bounded
//! concern, every variant carrying enough context to act on, and
//! `category()`/`is_recoverable()` helpers so callers can triage
//! programmatically instead of matching on display strings.
//!
//! ## Propagation
//!
//! `FileSystem` and `Transform` errors are recoverable by default: the
//! pipeline records them on the payload and continues. `Configuration`,
//! `Pattern`, and `Validation` are fatal pre-flight. `Pipeline` is fatal
//! during a run. `SecretsDetected` is fatal only under the `reject` policy.
//! `Cancelled` short-circuits without a final artifact.

use thiserror::Error;

/// Failure classification for an `AiProvider`/`SecretScanner` subprocess or
/// HTTP call. Used by the retry policy (`RATE_LIMIT | TIMEOUT |
/// SERVICE_UNAVAILABLE | NETWORK_ERROR` retry; everything else fails fast).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    RateLimit,
    Timeout,
    ServiceUnavailable,
    NetworkError,
    Auth,
    Quota,
    Safety,
    InvalidRequest,
}

impl ProviderErrorKind {
    /// Whether the retry policy should retry this kind on the same provider.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::RateLimit
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::ServiceUnavailable
                | ProviderErrorKind::NetworkError
        )
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderErrorKind::RateLimit => "RATE_LIMIT",
            ProviderErrorKind::Timeout => "TIMEOUT",
            ProviderErrorKind::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ProviderErrorKind::NetworkError => "NETWORK_ERROR",
            ProviderErrorKind::Auth => "AUTH",
            ProviderErrorKind::Quota => "QUOTA",
            ProviderErrorKind::Safety => "SAFETY",
            ProviderErrorKind::InvalidRequest => "INVALID_REQUEST",
        };
        f.write_str(s)
    }
}

/// Domain-specific errors for the CopyTree pipeline.
///
/// Each variant corresponds to one of the error kinds named in the
/// specification's error taxonomy, not to a Rust library error type —
/// library errors are folded in via the `From` impls below.
#[derive(Error, Debug, Clone)]
pub enum CopyTreeError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("file system error ({operation}) at {path}: {message}")]
    FileSystem {
        path: String,
        operation: String,
        message: String,
    },

    #[error("pattern error: {0}")]
    Pattern(String),

    #[error("pipeline error in stage '{stage}' (index {index}): {message}")]
    Pipeline {
        stage: String,
        index: usize,
        message: String,
    },

    #[error("transform error in '{transformer}': {message}")]
    Transform { transformer: String, message: String },

    #[error("git error: {0}")]
    Git(String),

    #[error("provider error ({provider}, {kind}): {message}")]
    Provider {
        provider: String,
        kind: ProviderErrorKind,
        message: String,
    },

    #[error("{count} secret(s) detected and rejected by policy")]
    SecretsDetected { count: usize },

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("external source error: {0}")]
    ExternalSource(String),

    #[error("conversation store error: {0}")]
    Conversation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CopyTreeError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn file_system(path: impl Into<String>, operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileSystem {
            path: path.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn pipeline(stage: impl Into<String>, index: usize, message: impl Into<String>) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            index,
            message: message.into(),
        }
    }

    pub fn transform(transformer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            transformer: transformer.into(),
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn conversation(msg: impl Into<String>) -> Self {
        Self::Conversation(msg.into())
    }

    /// Whether the pipeline may record this error and continue with the
    /// prior payload, per the propagation rules in the error taxonomy.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CopyTreeError::FileSystem { .. } | CopyTreeError::Transform { .. })
    }

    /// Stable category tag, useful for metrics labels and log fields.
    pub fn category(&self) -> &'static str {
        match self {
            CopyTreeError::Configuration(_) => "configuration",
            CopyTreeError::FileSystem { .. } => "filesystem",
            CopyTreeError::Pattern(_) => "pattern",
            CopyTreeError::Pipeline { .. } => "pipeline",
            CopyTreeError::Transform { .. } => "transform",
            CopyTreeError::Git(_) => "git",
            CopyTreeError::Provider { .. } => "provider",
            CopyTreeError::SecretsDetected { .. } => "secrets",
            CopyTreeError::Cancelled(_) => "cancelled",
            CopyTreeError::Validation(_) => "validation",
            CopyTreeError::Cache(_) => "cache",
            CopyTreeError::Io(_) => "io",
            CopyTreeError::Serialization(_) => "serialization",
            CopyTreeError::ExternalSource(_) => "external_source",
            CopyTreeError::Conversation(_) => "conversation",
            CopyTreeError::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for CopyTreeError {
    fn from(err: std::io::Error) -> Self {
        CopyTreeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CopyTreeError {
    fn from(err: serde_json::Error) -> Self {
        CopyTreeError::Serialization(err.to_string())
    }
}

impl From<regex::Error> for CopyTreeError {
    fn from(err: regex::Error) -> Self {
        CopyTreeError::Pattern(err.to_string())
    }
}
