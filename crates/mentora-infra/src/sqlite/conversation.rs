//! SQLite conversation store.
//!
//! Implements `ConversationStore` from mentora-core using sqlx with the
//! split read/write pool. Raw queries, private Row structs for
//! SQLite-to-domain mapping, `rows_affected == 0` mapped to NotFound.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use mentora_core::agent::store::ConversationStore;
use mentora_types::conversation::{Conversation, ConversationState, MessageRole, StoredMessage};
use mentora_types::error::StoreError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationStore`.
pub struct SqliteConversationStore {
    pool: DatabasePool,
}

impl SqliteConversationStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn load_messages(&self, conversation_id: &Uuid) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT role, content, model, input_tokens, output_tokens, created_at
             FROM messages WHERE conversation_id = ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let message_row =
                MessageRow::from_row(row).map_err(|e| StoreError::Query(e.to_string()))?;
            messages.push(message_row.into_message()?);
        }
        Ok(messages)
    }

    async fn load_conversation(
        &self,
        row: &sqlx::sqlite::SqliteRow,
    ) -> Result<Conversation, StoreError> {
        let conversation_row =
            ConversationRow::from_row(row).map_err(|e| StoreError::Query(e.to_string()))?;
        let mut conversation = conversation_row.into_conversation()?;
        conversation.messages = self.load_messages(&conversation.id).await?;
        Ok(conversation)
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ConversationRow {
    id: String,
    user_id: String,
    topic_id: Option<String>,
    state: String,
    summary: Option<String>,
    compacted_at: i64,
    started_at: String,
    ended_at: Option<String>,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            topic_id: row.try_get("topic_id")?,
            state: row.try_get("state")?,
            summary: row.try_get("summary")?,
            compacted_at: row.try_get("compacted_at")?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
        })
    }

    fn into_conversation(self) -> Result<Conversation, StoreError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| StoreError::Query(format!("invalid conversation id: {e}")))?;
        let state: ConversationState = self
            .state
            .parse()
            .map_err(|e: String| StoreError::Query(e))?;
        let started_at = parse_datetime(&self.started_at)?;
        let ended_at = self.ended_at.as_deref().map(parse_datetime).transpose()?;

        Ok(Conversation {
            id,
            user_id: self.user_id,
            topic_id: self.topic_id,
            state,
            messages: Vec::new(),
            summary: self.summary.filter(|s| !s.is_empty()),
            compacted_at: self.compacted_at.max(0) as usize,
            started_at,
            ended_at,
        })
    }
}

struct MessageRow {
    role: String,
    content: String,
    model: Option<String>,
    input_tokens: Option<i64>,
    output_tokens: Option<i64>,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            model: row.try_get("model")?,
            input_tokens: row.try_get("input_tokens")?,
            output_tokens: row.try_get("output_tokens")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<StoredMessage, StoreError> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| StoreError::Query(e))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(StoredMessage {
            role,
            content: self.content,
            model: self.model,
            input_tokens: self.input_tokens.map(|v| v as u32),
            output_tokens: self.output_tokens.map(|v| v as u32),
            created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// ConversationStore implementation
// ---------------------------------------------------------------------------

impl ConversationStore for SqliteConversationStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO conversations (id, user_id, topic_id, state, summary, compacted_at, started_at, ended_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(conversation.id.to_string())
        .bind(&conversation.user_id)
        .bind(&conversation.topic_id)
        .bind(conversation.state.to_string())
        .bind(&conversation.summary)
        .bind(conversation.compacted_at as i64)
        .bind(format_datetime(&conversation.started_at))
        .bind(conversation.ended_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        for message in &conversation.messages {
            self.add_message(&conversation.id, message).await?;
        }

        Ok(())
    }

    async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(self.load_conversation(&row).await?)),
            None => Ok(None),
        }
    }

    async fn get_active_conversation(
        &self,
        user_id: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM conversations
             WHERE user_id = ? AND ended_at IS NULL
             ORDER BY started_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(self.load_conversation(&row).await?)),
            None => Ok(None),
        }
    }

    async fn add_message(
        &self,
        conversation_id: &Uuid,
        message: &StoredMessage,
    ) -> Result<(), StoreError> {
        // INSERT..SELECT guarded on conversation existence, so a missing
        // target shows up as zero affected rows instead of an FK error.
        let result = sqlx::query(
            r#"INSERT INTO messages (id, conversation_id, role, content, model, input_tokens, output_tokens, created_at)
               SELECT ?, ?, ?, ?, ?, ?, ?, ?
               WHERE EXISTS (SELECT 1 FROM conversations WHERE id = ?)"#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(conversation_id.to_string())
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(&message.model)
        .bind(message.input_tokens.map(|v| v as i64))
        .bind(message.output_tokens.map(|v| v as i64))
        .bind(format_datetime(&message.created_at))
        .bind(conversation_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(*conversation_id));
        }

        Ok(())
    }

    async fn set_summary(
        &self,
        conversation_id: &Uuid,
        summary: &str,
        compacted_at: usize,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE conversations SET summary = ?, compacted_at = ? WHERE id = ?",
        )
        .bind(summary)
        .bind(compacted_at as i64)
        .bind(conversation_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(*conversation_id));
        }

        Ok(())
    }

    async fn end_conversation(&self, id: &Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE conversations SET ended_at = ? WHERE id = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(*id));
        }

        Ok(())
    }
}
