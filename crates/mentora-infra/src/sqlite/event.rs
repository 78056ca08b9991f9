//! SQLite event logger.
//!
//! Inserts analytics events into the events table, guarded on the target
//! conversation existing. Sits behind the `EventDispatcher` queue, so a
//! failure here is warn-logged by the drain task and never reaches the
//! student.

use sqlx::Row;
use uuid::Uuid;

use mentora_core::agent::events::EventLogger;
use mentora_types::error::EventError;
use mentora_types::event::{Event, EventKind};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `EventLogger`.
pub struct SqliteEventLogger {
    pool: DatabasePool,
}

impl SqliteEventLogger {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Events recorded for a conversation, oldest first. Used by the
    /// analytics surface and tests.
    pub async fn events_for_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<(EventKind, serde_json::Value)>, EventError> {
        let rows = sqlx::query(
            "SELECT event_type, data FROM events
             WHERE conversation_id = ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| EventError::Query(e.to_string()))?;

        let mut events = Vec::with_capacity(rows.len());
        for row in &rows {
            let event_type: String = row
                .try_get("event_type")
                .map_err(|e| EventError::Query(e.to_string()))?;
            let kind: EventKind = event_type
                .parse()
                .map_err(|e: String| EventError::Query(e))?;
            let data: String = row
                .try_get("data")
                .map_err(|e| EventError::Query(e.to_string()))?;
            let data = serde_json::from_str(&data)
                .map_err(|e| EventError::Query(format!("invalid event data: {e}")))?;
            events.push((kind, data));
        }
        Ok(events)
    }
}

impl EventLogger for SqliteEventLogger {
    async fn log_event(&self, event: &Event) -> Result<(), EventError> {
        let data = serde_json::to_string(&event.data)
            .map_err(|e| EventError::Query(format!("marshal event data: {e}")))?;

        let result = sqlx::query(
            r#"INSERT INTO events (id, conversation_id, user_id, event_type, data, created_at)
               SELECT ?, ?, ?, ?, ?, ?
               WHERE EXISTS (SELECT 1 FROM conversations WHERE id = ?)"#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(event.conversation_id.to_string())
        .bind(&event.user_id)
        .bind(event.kind.to_string())
        .bind(data)
        .bind(event.created_at.to_rfc3339())
        .bind(event.conversation_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| EventError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(EventError::NotFound(event.conversation_id));
        }

        tracing::debug!(
            kind = %event.kind,
            conversation_id = %event.conversation_id,
            user_id = %event.user_id,
            "event logged"
        );
        Ok(())
    }
}
