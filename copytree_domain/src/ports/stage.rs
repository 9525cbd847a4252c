// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `Stage` contract and its supporting ports.
//!
//! The domain stays free of a concrete async runtime, so cancellation and
//! event publication are expressed as small capability traits —
//! `Cancellation` and `EventSink` — rather than as
//! `tokio_util::sync::CancellationToken` / `tokio::sync::broadcast::Sender`
//! directly. `copytree::application::pipeline` supplies the real,
//! tokio-backed implementations.

use crate::error::CopyTreeError;
use crate::events::PipelineEvent;
use crate::payload::PipelinePayload;
use async_trait::async_trait;
use std::sync::Arc;

/// A caller-supplied cancellation signal, consulted at stage boundaries
/// and at cooperative points inside long-running stages (§5).
pub trait Cancellation: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

/// No-op cancellation, useful for tests and `dry_run` previews that never
/// need to be interrupted.
pub struct NeverCancelled;
impl Cancellation for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Publishes pipeline events; the engine never blocks waiting for a
/// subscriber (bounded buffers, drop-oldest for `FileBatch`, per §9).
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// An `EventSink` that discards every event, used where no caller has
/// subscribed (e.g. library use without a progress bar).
pub struct NullEventSink;
impl EventSink for NullEventSink {
    fn emit(&self, _event: PipelineEvent) {}
}

/// Shared, read-only context threaded through every stage invocation.
#[derive(Clone)]
pub struct PipelineContext {
    pub cancellation: Arc<dyn Cancellation>,
    pub events: Arc<dyn EventSink>,
}

impl PipelineContext {
    pub fn new(cancellation: Arc<dyn Cancellation>, events: Arc<dyn EventSink>) -> Self {
        Self { cancellation, events }
    }

    pub fn for_testing() -> Self {
        Self::new(Arc::new(NeverCancelled), Arc::new(NullEventSink))
    }

    pub fn emit_progress(&self, stage: &str, percent: u8, message: Option<String>) {
        self.events.emit(PipelineEvent::StageProgress {
            stage: stage.to_string(),
            percent,
            message,
        });
    }
}

/// A unit in the pipeline: validate (optional), process, and two recovery
/// hooks (`handle_error`, `after_run`), splitting a narrow synchronous
/// capability check from the actual async unit of work.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    /// Optional pre-flight check; an invalid input fails the stage before
    /// `process` is invoked.
    async fn validate(&self, _input: &PipelinePayload) -> Result<(), CopyTreeError> {
        Ok(())
    }

    async fn process(&self, input: PipelinePayload, ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError>;

    /// Called when `process` fails; returning `Some` counts as recovery
    /// and the pipeline continues with the returned payload.
    async fn handle_error(&self, _error: &CopyTreeError, _input: &PipelinePayload) -> Option<PipelinePayload> {
        None
    }

    async fn after_run(&self, _output: &PipelinePayload) {}
}
