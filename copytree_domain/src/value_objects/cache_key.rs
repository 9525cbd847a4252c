// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Cache key derivation: `prefix + userKey + optional sha256(canonicalize(params))[:8]`.
//!
//! `params` is canonicalized by sorting object keys before hashing, so two
//! semantically-equal parameter sets always derive the same key regardless
//! of field insertion order.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds a key with no extra parameters: `prefix + user_key`.
    pub fn simple(prefix: &str, user_key: &str) -> Self {
        Self(format!("{prefix}{user_key}"))
    }

    /// Builds a key whose suffix is derived from canonical-JSON-hashed
    /// parameters, truncated to 8 hex characters as specified.
    pub fn with_params<T: Serialize>(prefix: &str, user_key: &str, params: &T) -> Result<Self, String> {
        let value = serde_json::to_value(params).map_err(|e| e.to_string())?;
        let canonical = canonicalize(&value);
        let digest = Sha256::digest(canonical.as_bytes());
        let hex = hex::encode(digest);
        Ok(Self(format!("{prefix}{user_key}_{}", &hex[..8])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A filesystem-safe rendering of this key: `[A-Za-z0-9_-]+`, used as
    /// the on-disk cache file stem.
    pub fn sanitized_filename(&self) -> String {
        self.0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recursively sorts JSON object keys so serialization is order-independent.
fn canonicalize(value: &serde_json::Value) -> String {
    fn sort(value: &serde_json::Value) -> serde_json::Value {
        match value {
            serde_json::Value::Object(map) => {
                let sorted: BTreeMap<String, serde_json::Value> =
                    map.iter().map(|(k, v)| (k.clone(), sort(v))).collect();
                serde_json::to_value(sorted).unwrap_or(serde_json::Value::Null)
            }
            serde_json::Value::Array(items) => serde_json::Value::Array(items.iter().map(sort).collect()),
            other => other.clone(),
        }
    }
    sort(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct ParamsA {
        b: i32,
        a: i32,
    }

    #[derive(Serialize)]
    struct ParamsB {
        a: i32,
        b: i32,
    }

    #[test]
    fn key_order_independent() {
        let k1 = CacheKey::with_params("t:", "file.txt", &ParamsA { b: 2, a: 1 }).unwrap();
        let k2 = CacheKey::with_params("t:", "file.txt", &ParamsB { a: 1, b: 2 }).unwrap();
        assert_eq!(k1, k2);
    }
}
