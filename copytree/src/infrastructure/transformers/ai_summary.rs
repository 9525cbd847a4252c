// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Replaces a file's content with an AI-generated summary via the
//! `AiProvider` port (spec §4.5, §4.10). Bounds the prompt to the first
//! `MAX_PROMPT_CHARS` characters of content so a single oversized file
//! cannot blow the provider's context window. Requires an API key and
//! network access (`Requirements`), and conflicts with any future
//! rule-based `file-summary` transformer tagged `"summary"`.

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::file_record::FileContent;
use copytree_domain::ports::ai::{ChatMessage, ChatRequest};
use copytree_domain::ports::{AiProvider, Cache};
use copytree_domain::transformer::{ContentType, Requirements, Transformer, TransformerTraits};
use copytree_domain::value_objects::CacheKey;
use copytree_domain::FileRecord;
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};

const MAX_PROMPT_CHARS: usize = 12_000;
const CACHE_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

pub struct AiSummaryTransformer {
    provider: Arc<dyn AiProvider>,
    cache: Option<Arc<dyn Cache>>,
}

impl AiSummaryTransformer {
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider, cache: None }
    }

    /// Adds the §4.7 cache as a lookup keyed on `{transformer name, file
    /// content hash}` — the summary call is the one built-in transformer
    /// expensive and non-deterministic enough to be worth memoizing.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn cache_key(&self, text: &str) -> CacheKey {
        let digest = Sha256::digest(text.as_bytes());
        CacheKey::simple("ai-summary:", &hex::encode(digest))
    }
}

fn traits() -> &'static TransformerTraits {
    static TRAITS: OnceLock<TransformerTraits> = OnceLock::new();
    TRAITS.get_or_init(|| TransformerTraits {
        input_types: vec![ContentType::Text],
        output_types: vec![ContentType::Text],
        idempotent: false,
        heavy: true,
        conflicts_with: vec!["file-summary".to_string()],
        requirements: Requirements {
            api_key: true,
            network: true,
            memory_class: None,
        },
        tags: vec!["summary".to_string()],
        ..Default::default()
    })
}

#[async_trait]
impl Transformer for AiSummaryTransformer {
    fn name(&self) -> &str {
        "ai-summary"
    }

    fn traits(&self) -> &TransformerTraits {
        traits()
    }

    fn can_transform(&self, file: &FileRecord) -> bool {
        file.is_binary() == Some(false) && !file.content().is_empty()
    }

    async fn transform(&self, mut file: FileRecord) -> Result<FileRecord, CopyTreeError> {
        let Some(text) = file.content().as_text() else {
            return Ok(file);
        };
        let bounded: String = text.chars().take(MAX_PROMPT_CHARS).collect();
        let key = self.cache_key(&bounded);

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(key.as_str()).await? {
                if let Some(summary) = cached.as_str() {
                    file = file.with_content(FileContent::Text(summary.to_string()), false, Some("utf-8".to_string()));
                    file.mark_transformed(self.name());
                    return Ok(file);
                }
            }
        }

        let prompt = format!(
            "Summarize the following file ({}) in three sentences or fewer, focusing on its purpose and key exports:\n\n{bounded}",
            file.relative_path().as_str()
        );

        let response = self
            .provider
            .chat(ChatRequest {
                messages: vec![ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                }],
                max_tokens: Some(256),
                model: None,
            })
            .await?;

        if let Some(cache) = &self.cache {
            cache.set(key.as_str(), serde_json::Value::String(response.content.clone()), Some(CACHE_TTL_SECONDS)).await?;
        }

        file = file.with_content(FileContent::Text(response.content), false, Some("utf-8".to_string()));
        file.mark_transformed(self.name());
        Ok(file)
    }
}
