// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `Cache` port (§4.7), shared across the AI and transformer
//! subsystems. Concrete two-tier implementation lives in
//! `copytree::infrastructure::cache`.

use crate::error::CopyTreeError;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, CopyTreeError>;
    async fn set(&self, key: &str, value: Value, ttl_seconds: Option<u64>) -> Result<(), CopyTreeError>;
    async fn has(&self, key: &str) -> Result<bool, CopyTreeError>;
    async fn forget(&self, key: &str) -> Result<(), CopyTreeError>;
    /// Clears all entries, or only those whose key matches `pattern` (a
    /// plain substring, not a glob) when provided.
    async fn clear(&self, pattern: Option<&str>) -> Result<(), CopyTreeError>;
    async fn run_gc(&self) -> Result<usize, CopyTreeError>;
}
