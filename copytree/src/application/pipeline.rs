// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Engine
//!
//! Owns the fixed stage topology, runs each stage's `process` against a
//! single payload, emits events, and applies the recovery policy. Builds
//! the topology once and captures stage-boundary metrics as it runs,
//! with `PipelineStats` behind a `parking_lot::Mutex` that only this
//! module writes to (§5 — stages call `ctx.emit_progress` only).

use crate::infrastructure::metrics::Metrics;
use copytree_domain::error::CopyTreeError;
use copytree_domain::events::PipelineEvent;
use copytree_domain::payload::PipelinePayload;
use copytree_domain::ports::stage::{Cancellation, EventSink, PipelineContext, Stage};
use copytree_domain::stats::{PipelineStats, StageMetrics};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Adapts `tokio_util::sync::CancellationToken` to the domain's
/// runtime-agnostic `Cancellation` capability.
pub struct TokioCancellation(pub CancellationToken);

impl Cancellation for TokioCancellation {
    fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Adapts `tokio::sync::broadcast::Sender` to `EventSink`. `FileBatch` is
/// the only event allowed to fail silently on a full/closed channel — a
/// dropped progress tick is never fatal; every other send failure is
/// likewise ignored because nobody may be listening (library use with no
/// subscriber attached).
pub struct BroadcastEventSink(pub tokio::sync::broadcast::Sender<PipelineEvent>);

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: PipelineEvent) {
        let _ = self.0.send(event);
    }
}

/// The ordered, fixed stage topology (§4.1): Discovery → GitFilter →
/// RulesetFilter → AlwaysInclude → ExternalSourceMerge → LimitAndCharLimit
/// → Load → Transform → MetadataInjection → DedupAndSort → Format.
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    stats: Mutex<PipelineStats>,
    metrics: Option<Arc<Metrics>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            stages,
            stats: Mutex::new(PipelineStats::new()),
            metrics: None,
        }
    }

    /// Attaches a Prometheus sink; every stage boundary this pipeline runs
    /// afterwards also records into it alongside the always-on
    /// `PipelineStats`.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stats_snapshot(&self) -> PipelineStats {
        self.stats.lock().clone()
    }

    /// Runs every stage in order against `input`, honoring `validate`,
    /// `handle_error`, and `after_run` hooks, and consulting cancellation
    /// before each stage boundary (§4.1, §5).
    pub async fn process(
        &self,
        input: PipelinePayload,
        ctx: &PipelineContext,
    ) -> Result<PipelinePayload, CopyTreeError> {
        ctx.events.emit(PipelineEvent::PipelineStart {
            stage_count: self.stages.len(),
        });
        let run_start = Instant::now();

        let mut payload = input;
        for (index, stage) in self.stages.iter().enumerate() {
            if ctx.cancellation.is_cancelled() {
                ctx.events.emit(PipelineEvent::PipelineError {
                    message: "cancelled before stage boundary".to_string(),
                });
                return Err(CopyTreeError::Cancelled(stage.name().to_string()));
            }

            if let Err(err) = stage.validate(&payload).await {
                ctx.events.emit(PipelineEvent::StageError {
                    stage: stage.name().to_string(),
                    index,
                    message: err.to_string(),
                });
                return Err(err);
            }

            ctx.events.emit(PipelineEvent::StageStart {
                stage: stage.name().to_string(),
                index,
            });
            let stage_start = Instant::now();
            let input_len = payload.files.len();

            match stage.process(payload.clone(), ctx).await {
                Ok(output) => {
                    let duration = stage_start.elapsed();
                    let output_len = output.files.len();
                    self.record_success(stage.name(), duration, input_len, output_len);
                    ctx.events.emit(PipelineEvent::StageComplete {
                        stage: stage.name().to_string(),
                        index,
                        duration,
                        input_len,
                        output_len,
                    });
                    stage.after_run(&output).await;
                    payload = output;
                }
                Err(err) => {
                    ctx.events.emit(PipelineEvent::StageError {
                        stage: stage.name().to_string(),
                        index,
                        message: err.to_string(),
                    });
                    if let Some(recovered) = stage.handle_error(&err, &payload).await {
                        ctx.events.emit(PipelineEvent::StageRecover {
                            stage: stage.name().to_string(),
                            index,
                        });
                        self.record_failure(stage.name(), &err);
                        payload = recovered;
                        continue;
                    }
                    self.record_failure(stage.name(), &err);
                    ctx.events.emit(PipelineEvent::PipelineError { message: err.to_string() });
                    return Err(CopyTreeError::pipeline(stage.name(), index, err.to_string()));
                }
            }
        }

        self.stats.lock().finish();
        ctx.events.emit(PipelineEvent::PipelineComplete {
            files_emitted: payload.files.len(),
            total_time: run_start.elapsed(),
        });
        Ok(payload)
    }

    fn record_success(&self, stage: &str, duration: Duration, input_len: usize, output_len: usize) {
        self.stats.lock().record_stage_success(
            stage,
            duration,
            StageMetrics {
                input_size: input_len,
                output_size: output_len,
                memory_delta_bytes: 0,
            },
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_stage_duration(duration);
            if stage == "discovery" {
                metrics.record_files_discovered(output_len as u64);
            }
        }
    }

    fn record_failure(&self, stage: &str, err: &CopyTreeError) {
        self.stats.lock().record_stage_failure(stage, err.to_string());
        if let Some(metrics) = &self.metrics {
            metrics.record_stage_error(stage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use copytree_domain::ports::stage::{NeverCancelled, NullEventSink};
    use copytree_domain::payload::PipelineOptions;
    use std::path::PathBuf;

    struct PassThrough(&'static str);

    #[async_trait]
    impl Stage for PassThrough {
        fn name(&self) -> &str {
            self.0
        }

        async fn process(&self, input: PipelinePayload, _ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
            Ok(input)
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Stage for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }

        async fn process(&self, _input: PipelinePayload, _ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
            Err(CopyTreeError::internal("boom"))
        }
    }

    struct RecoversToEmpty;

    #[async_trait]
    impl Stage for RecoversToEmpty {
        fn name(&self) -> &str {
            "recovers"
        }

        async fn process(&self, _input: PipelinePayload, _ctx: &PipelineContext) -> Result<PipelinePayload, CopyTreeError> {
            Err(CopyTreeError::internal("transient"))
        }

        async fn handle_error(&self, _error: &CopyTreeError, input: &PipelinePayload) -> Option<PipelinePayload> {
            Some(input.clone())
        }
    }

    fn empty_payload() -> PipelinePayload {
        PipelinePayload::new(PathBuf::from("/tmp"), Arc::new(PipelineOptions::default()))
    }

    fn test_ctx() -> PipelineContext {
        PipelineContext::new(Arc::new(NeverCancelled), Arc::new(NullEventSink))
    }

    #[tokio::test]
    async fn runs_stages_in_order() {
        let pipeline = Pipeline::new(vec![Arc::new(PassThrough("a")), Arc::new(PassThrough("b"))]);
        let result = pipeline.process(empty_payload(), &test_ctx()).await;
        assert!(result.is_ok());
        assert_eq!(pipeline.stats_snapshot().stages_completed, 2);
    }

    #[tokio::test]
    async fn unrecovered_failure_aborts_with_stage_context() {
        let pipeline = Pipeline::new(vec![Arc::new(PassThrough("a")), Arc::new(AlwaysFails)]);
        let result = pipeline.process(empty_payload(), &test_ctx()).await;
        match result {
            Err(CopyTreeError::Pipeline { stage, index, .. }) => {
                assert_eq!(stage, "always-fails");
                assert_eq!(index, 1);
            }
            other => panic!("expected Pipeline error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recovered_failure_continues() {
        let pipeline = Pipeline::new(vec![Arc::new(RecoversToEmpty), Arc::new(PassThrough("b"))]);
        let result = pipeline.process(empty_payload(), &test_ctx()).await;
        assert!(result.is_ok());
        assert_eq!(pipeline.stats_snapshot().stages_failed, 1);
        assert_eq!(pipeline.stats_snapshot().stages_completed, 1);
    }

    #[tokio::test]
    async fn attached_metrics_record_stage_duration_and_errors() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let pipeline = Pipeline::new(vec![Arc::new(PassThrough("a")), Arc::new(AlwaysFails)]).with_metrics(Arc::clone(&metrics));
        let _ = pipeline.process(empty_payload(), &test_ctx()).await;
        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("copytree_stage_duration_seconds"));
        assert!(rendered.contains("copytree_stage_errors_total"));
    }

    #[tokio::test]
    async fn cancellation_short_circuits() {
        struct AlwaysCancelled;
        impl Cancellation for AlwaysCancelled {
            fn is_cancelled(&self) -> bool {
                true
            }
        }
        let pipeline = Pipeline::new(vec![Arc::new(PassThrough("a"))]);
        let ctx = PipelineContext::new(Arc::new(AlwaysCancelled), Arc::new(NullEventSink));
        let result = pipeline.process(empty_payload(), &ctx).await;
        assert!(matches!(result, Err(CopyTreeError::Cancelled(_))));
    }
}
