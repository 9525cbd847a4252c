// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite conversation store (§4.12)
//!
//! Persists `ask` sessions so a follow-up question can see prior turns and
//! accumulated `context`. One table, messages and context stored as JSON
//! blobs — conversations are small and read/written whole, so there is no
//! normalized message table.

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::ports::conversation::{trim_messages, Conversation, ConversationMessage, ConversationStore};
use copytree_domain::value_objects::Metadata;
use sqlx::{Row, SqlitePool};
use tracing::debug;

pub struct SqliteConversationStore {
    pool: SqlitePool,
}

impl SqliteConversationStore {
    /// `database_path` is a filesystem path, or `:memory:` for an
    /// ephemeral store. Creates the database file and `conversations`
    /// table if either is missing.
    pub async fn new(database_path: &str) -> Result<Self, CopyTreeError> {
        let database_url = if database_path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{database_path}?mode=rwc")
        };

        debug!(database_url = %database_url, "opening conversation store");

        let pool = SqlitePool::connect(&database_url)
            .await
            .map_err(|err| CopyTreeError::conversation(format!("failed to open conversation database: {err}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                messages TEXT NOT NULL,
                context TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                ttl_seconds INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|err| CopyTreeError::conversation(format!("failed to create conversations table: {err}")))?;

        Ok(Self { pool })
    }

    fn row_to_conversation(id: String, messages: String, context: String, created_at: String, updated_at: String, ttl_seconds: i64) -> Result<Conversation, CopyTreeError> {
        let messages: Vec<ConversationMessage> = serde_json::from_str(&messages).map_err(|err| CopyTreeError::conversation(format!("corrupt messages JSON: {err}")))?;
        let context: Metadata = serde_json::from_str(&context).map_err(|err| CopyTreeError::conversation(format!("corrupt context JSON: {err}")))?;
        let created_at = created_at.parse().map_err(|err| CopyTreeError::conversation(format!("corrupt created_at: {err}")))?;
        let updated_at = updated_at.parse().map_err(|err| CopyTreeError::conversation(format!("corrupt updated_at: {err}")))?;
        Ok(Conversation { id, messages, context, created_at, updated_at, ttl_seconds })
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn create(&self, ttl_seconds: i64) -> Result<Conversation, CopyTreeError> {
        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
            context: Metadata::new(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            ttl_seconds,
        };

        let messages_json = serde_json::to_string(&conversation.messages).map_err(|err| CopyTreeError::conversation(err.to_string()))?;
        let context_json = serde_json::to_string(&conversation.context).map_err(|err| CopyTreeError::conversation(err.to_string()))?;

        sqlx::query("INSERT INTO conversations (id, messages, context, created_at, updated_at, ttl_seconds) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(&conversation.id)
            .bind(&messages_json)
            .bind(&context_json)
            .bind(conversation.created_at.to_rfc3339())
            .bind(conversation.updated_at.to_rfc3339())
            .bind(conversation.ttl_seconds)
            .execute(&self.pool)
            .await
            .map_err(|err| CopyTreeError::conversation(format!("failed to insert conversation: {err}")))?;

        Ok(conversation)
    }

    async fn get(&self, id: &str) -> Result<Option<Conversation>, CopyTreeError> {
        let row = sqlx::query("SELECT id, messages, context, created_at, updated_at, ttl_seconds FROM conversations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| CopyTreeError::conversation(format!("failed to query conversation: {err}")))?;

        match row {
            None => Ok(None),
            Some(row) => {
                let conversation = Self::row_to_conversation(
                    row.get("id"),
                    row.get("messages"),
                    row.get("context"),
                    row.get("created_at"),
                    row.get("updated_at"),
                    row.get("ttl_seconds"),
                )?;
                Ok(Some(conversation))
            }
        }
    }

    async fn add_message(&self, id: &str, message: ConversationMessage, max_messages: usize) -> Result<(), CopyTreeError> {
        let mut conversation = self.get(id).await?.ok_or_else(|| CopyTreeError::conversation(format!("conversation not found: {id}")))?;

        conversation.messages.push(message);
        trim_messages(&mut conversation.messages, max_messages);
        conversation.updated_at = chrono::Utc::now();

        let messages_json = serde_json::to_string(&conversation.messages).map_err(|err| CopyTreeError::conversation(err.to_string()))?;

        sqlx::query("UPDATE conversations SET messages = ?, updated_at = ? WHERE id = ?")
            .bind(&messages_json)
            .bind(conversation.updated_at.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| CopyTreeError::conversation(format!("failed to update conversation: {err}")))?;

        Ok(())
    }

    async fn update_context(&self, id: &str, context: Metadata) -> Result<(), CopyTreeError> {
        let context_json = serde_json::to_string(&context).map_err(|err| CopyTreeError::conversation(err.to_string()))?;
        let updated_at = chrono::Utc::now();

        let result = sqlx::query("UPDATE conversations SET context = ?, updated_at = ? WHERE id = ?")
            .bind(&context_json)
            .bind(updated_at.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| CopyTreeError::conversation(format!("failed to update context: {err}")))?;

        if result.rows_affected() == 0 {
            return Err(CopyTreeError::conversation(format!("conversation not found: {id}")));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Conversation>, CopyTreeError> {
        let rows = sqlx::query("SELECT id, messages, context, created_at, updated_at, ttl_seconds FROM conversations ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| CopyTreeError::conversation(format!("failed to list conversations: {err}")))?;

        rows.into_iter()
            .map(|row| Self::row_to_conversation(row.get("id"), row.get("messages"), row.get("context"), row.get("created_at"), row.get("updated_at"), row.get("ttl_seconds")))
            .collect()
    }

    async fn delete(&self, id: &str) -> Result<(), CopyTreeError> {
        sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| CopyTreeError::conversation(format!("failed to delete conversation: {err}")))?;
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, CopyTreeError> {
        let conversations = self.list().await?;
        let now = chrono::Utc::now();
        let mut removed = 0usize;

        for conversation in conversations {
            if conversation.is_expired(now) {
                self.delete(&conversation.id).await?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}
