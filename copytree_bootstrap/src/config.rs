// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Configuration
//!
//! `AppConfig` is the immutable, builder-constructed settings bundle that
//! bootstrap assembles before a pipeline exists: log level, base path,
//! worker counts, dry-run, and where the formatted artifact goes. It is
//! deliberately thin — per-run pipeline options (include/exclude patterns,
//! transformer selection, format) are `copytree_domain::PipelineOptions`,
//! built downstream from the validated CLI. `AppConfig` only carries what
//! the process needs before that translation happens.

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Maps `-v` occurrence count to a level, clamping past `Trace`.
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_path: PathBuf,
    pub log_level: LogLevel,
    pub json_logs: bool,
    pub walker_concurrency: usize,
    pub dry_run: bool,
    pub output: Option<PathBuf>,
    pub profile: Option<String>,
}

#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    base_path: Option<PathBuf>,
    log_level: Option<LogLevel>,
    json_logs: bool,
    walker_concurrency: usize,
    dry_run: bool,
    output: Option<PathBuf>,
    profile: Option<String>,
}

impl AppConfigBuilder {
    pub fn new() -> Self {
        Self {
            walker_concurrency: 5,
            ..Default::default()
        }
    }

    pub fn base_path(mut self, path: PathBuf) -> Self {
        self.base_path = Some(path);
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn json_logs(mut self, json_logs: bool) -> Self {
        self.json_logs = json_logs;
        self
    }

    pub fn walker_concurrency(mut self, n: usize) -> Self {
        self.walker_concurrency = n;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn build(self) -> AppConfig {
        AppConfig {
            base_path: self.base_path.unwrap_or_else(|| PathBuf::from(".")),
            log_level: self.log_level.unwrap_or(LogLevel::Info),
            json_logs: self.json_logs,
            walker_concurrency: self.walker_concurrency,
            dry_run: self.dry_run,
            output: self.output,
            profile: self.profile,
        }
    }
}

impl AppConfig {
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let config = AppConfig::builder().build();
        assert_eq!(config.base_path, PathBuf::from("."));
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.walker_concurrency, 5);
        assert!(!config.dry_run);
    }

    #[test]
    fn verbosity_maps_to_log_level() {
        assert_eq!(LogLevel::from_verbosity(0), LogLevel::Info);
        assert_eq!(LogLevel::from_verbosity(1), LogLevel::Debug);
        assert_eq!(LogLevel::from_verbosity(5), LogLevel::Trace);
    }

    #[test]
    fn builder_overrides_are_applied() {
        let config = AppConfig::builder()
            .base_path(PathBuf::from("/tmp/project"))
            .log_level(LogLevel::Debug)
            .dry_run(true)
            .walker_concurrency(10)
            .build();
        assert_eq!(config.base_path, PathBuf::from("/tmp/project"));
        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(config.dry_run);
        assert_eq!(config.walker_concurrency, 10);
    }
}
