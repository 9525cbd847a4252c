// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Prometheus metrics (§7, observability)
//!
//! One counter/histogram per stage-level concern: stage duration and
//! error counts, files discovered, cache hit/miss, and transformer
//! duration. `Pipeline` records into an instance handed to it via
//! `with_metrics`; the registry is otherwise inert. Exposed over HTTP
//! only for `copytree ask --metrics-addr <addr>`, a long-running
//! conversation session worth scraping — one-shot `copy` runs never
//! start the listener.

use copytree_domain::error::CopyTreeError;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;
use std::time::Duration;

pub struct Metrics {
    registry: Arc<Registry>,
    stage_duration_seconds: Histogram,
    stage_errors_total: IntCounterVec,
    files_discovered_total: IntCounter,
    cache_hits_total: IntCounter,
    cache_misses_total: IntCounter,
    transformer_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, CopyTreeError> {
        let registry = Registry::new();

        let stage_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("stage_duration_seconds", "Time spent in each pipeline stage").namespace("copytree").buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 30.0]),
        )
        .map_err(metrics_error("stage_duration_seconds"))?;

        let stage_errors_total = IntCounterVec::new(Opts::new("stage_errors_total", "Pipeline stage errors by stage name").namespace("copytree"), &["stage"]).map_err(metrics_error("stage_errors_total"))?;

        let files_discovered_total = IntCounter::with_opts(Opts::new("files_discovered_total", "Files discovered by the walker").namespace("copytree")).map_err(metrics_error("files_discovered_total"))?;

        let cache_hits_total = IntCounter::with_opts(Opts::new("cache_hits_total", "Two-tier cache hits").namespace("copytree")).map_err(metrics_error("cache_hits_total"))?;

        let cache_misses_total = IntCounter::with_opts(Opts::new("cache_misses_total", "Two-tier cache misses").namespace("copytree")).map_err(metrics_error("cache_misses_total"))?;

        let transformer_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("transformer_duration_seconds", "Time spent inside a single transformer invocation").namespace("copytree").buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 30.0]),
        )
        .map_err(metrics_error("transformer_duration_seconds"))?;

        registry.register(Box::new(stage_duration_seconds.clone())).map_err(metrics_error("stage_duration_seconds"))?;
        registry.register(Box::new(stage_errors_total.clone())).map_err(metrics_error("stage_errors_total"))?;
        registry.register(Box::new(files_discovered_total.clone())).map_err(metrics_error("files_discovered_total"))?;
        registry.register(Box::new(cache_hits_total.clone())).map_err(metrics_error("cache_hits_total"))?;
        registry.register(Box::new(cache_misses_total.clone())).map_err(metrics_error("cache_misses_total"))?;
        registry.register(Box::new(transformer_duration_seconds.clone())).map_err(metrics_error("transformer_duration_seconds"))?;

        Ok(Self {
            registry: Arc::new(registry),
            stage_duration_seconds,
            stage_errors_total,
            files_discovered_total,
            cache_hits_total,
            cache_misses_total,
            transformer_duration_seconds,
        })
    }

    pub fn record_stage_duration(&self, duration: Duration) {
        self.stage_duration_seconds.observe(duration.as_secs_f64());
    }

    pub fn record_stage_error(&self, stage: &str) {
        self.stage_errors_total.with_label_values(&[stage]).inc();
    }

    pub fn record_files_discovered(&self, count: u64) {
        self.files_discovered_total.inc_by(count);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits_total.inc();
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses_total.inc();
    }

    pub fn record_transformer_duration(&self, duration: Duration) {
        self.transformer_duration_seconds.observe(duration.as_secs_f64());
    }

    /// Prometheus text-format exposition, for the `/metrics` endpoint.
    pub fn render(&self) -> Result<String, CopyTreeError> {
        let encoder = prometheus::TextEncoder::new();
        let families = self.registry.gather();
        encoder.encode_to_string(&families).map_err(|err| CopyTreeError::internal(format!("failed to encode metrics: {err}")))
    }
}

fn metrics_error(metric: &'static str) -> impl Fn(prometheus::Error) -> CopyTreeError {
    move |err| CopyTreeError::internal(format!("failed to set up metric '{metric}': {err}"))
}

/// Serves a bare-bones `GET /metrics` response on `addr` until the process
/// exits. Intentionally minimal — one route, no routing crate — since
/// this endpoint exists only for a Prometheus scraper to hit, not for
/// general HTTP traffic. Spawned as a background task by `copytree ask`
/// when `--metrics-addr` is given.
pub async fn serve(metrics: Arc<Metrics>, addr: std::net::SocketAddr) -> Result<(), CopyTreeError> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    let listener = TcpListener::bind(addr).await.map_err(|err| CopyTreeError::internal(format!("failed to bind metrics listener on {addr}: {err}")))?;

    loop {
        let (mut stream, _peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(error = %err, "metrics listener accept failed");
                continue;
            }
        };
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;

            let body = metrics.render().unwrap_or_else(|err| format!("# metrics encoding failed: {err}\n"));
            let response = format!("HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}", body.len(), body);
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_renders_metrics() {
        let metrics = Metrics::new().unwrap();
        metrics.record_files_discovered(5);
        metrics.record_cache_hit();
        metrics.record_stage_error("load");
        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("copytree_files_discovered_total 5"));
        assert!(rendered.contains("copytree_stage_errors_total"));
    }
}
