// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `ConversationStore` port (§4.12, optional "ask" command support).

use crate::error::CopyTreeError;
use crate::value_objects::Metadata;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub messages: Vec<ConversationMessage>,
    pub context: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ttl_seconds: i64,
}

impl Conversation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        (now - self.updated_at).num_seconds() > self.ttl_seconds
    }
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create(&self, ttl_seconds: i64) -> Result<Conversation, CopyTreeError>;
    async fn get(&self, id: &str) -> Result<Option<Conversation>, CopyTreeError>;
    async fn add_message(&self, id: &str, message: ConversationMessage, max_messages: usize) -> Result<(), CopyTreeError>;
    async fn update_context(&self, id: &str, context: Metadata) -> Result<(), CopyTreeError>;
    async fn list(&self) -> Result<Vec<Conversation>, CopyTreeError>;
    async fn delete(&self, id: &str) -> Result<(), CopyTreeError>;
    async fn cleanup_expired(&self) -> Result<usize, CopyTreeError>;
}

/// Trims the oldest messages once the cap is exceeded, keeping the most
/// recent `max_messages` — pure so the store adapter and tests can share it.
pub fn trim_messages(messages: &mut Vec<ConversationMessage>, max_messages: usize) {
    if messages.len() > max_messages {
        let drop_count = messages.len() - max_messages;
        messages.drain(0..drop_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> ConversationMessage {
        ConversationMessage {
            role: "user".to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn trims_oldest_first() {
        let mut messages = vec![msg("1"), msg("2"), msg("3")];
        trim_messages(&mut messages, 2);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "2");
    }
}
