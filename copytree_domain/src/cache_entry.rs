// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `CacheEntry` — the value object shared by both cache tiers (in-process
//! map and on-disk directory, see the `Cache` port in `ports`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: String, value: serde_json::Value, ttl_seconds: Option<u64>) -> Self {
        let created_at = Utc::now();
        let expires_at = ttl_seconds.map(|ttl| created_at + chrono::Duration::seconds(ttl as i64));
        Self {
            key,
            value,
            expires_at,
            created_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age_seconds: i64) -> bool {
        (now - self.created_at).num_seconds() > max_age_seconds
    }
}
