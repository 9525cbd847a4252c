// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `PipelineStats` — owned by the pipeline engine and mutated only between
//! stage boundaries (§5: stages may emit progress but must not mutate
//! stats directly).

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct StageMetrics {
    pub input_size: usize,
    pub output_size: usize,
    pub memory_delta_bytes: i64,
}

#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub stages_completed: usize,
    pub stages_failed: usize,
    pub errors: Vec<String>,
    pub per_stage_timing: HashMap<String, Duration>,
    pub per_stage_metrics: HashMap<String, StageMetrics>,
    pub total_stage_time: Duration,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            start_time: Utc::now(),
            end_time: None,
            stages_completed: 0,
            stages_failed: 0,
            errors: Vec::new(),
            per_stage_timing: HashMap::new(),
            per_stage_metrics: HashMap::new(),
            total_stage_time: Duration::ZERO,
        }
    }

    pub fn record_stage_success(&mut self, stage: &str, duration: Duration, metrics: StageMetrics) {
        self.stages_completed += 1;
        self.total_stage_time += duration;
        self.per_stage_timing.insert(stage.to_string(), duration);
        self.per_stage_metrics.insert(stage.to_string(), metrics);
    }

    pub fn record_stage_failure(&mut self, stage: &str, message: impl Into<String>) {
        self.stages_failed += 1;
        self.errors.push(format!("{stage}: {}", message.into()));
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}
