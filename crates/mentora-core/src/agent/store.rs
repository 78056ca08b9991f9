//! ConversationStore trait definition and the in-memory implementation.
//!
//! The store owns persistence of conversation state and message history;
//! the engine owns the lifecycle (when conversations are created and
//! ended). The durable SQLite implementation lives in mentora-infra.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use mentora_types::conversation::{Conversation, StoredMessage};
use mentora_types::error::StoreError;

/// Persistence port for conversation state and message history.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). Operations
/// targeting a missing conversation fail with `StoreError::NotFound`;
/// `get_*` report absence as `Ok(None)`.
pub trait ConversationStore: Send + Sync {
    /// Persist a new conversation (including any initial messages).
    fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Fetch a conversation with its full message log.
    fn get_conversation(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, StoreError>> + Send;

    /// Fetch the user's conversation with no end timestamp, if any.
    fn get_active_conversation(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, StoreError>> + Send;

    /// Append a message to a conversation.
    fn add_message(
        &self,
        conversation_id: &Uuid,
        message: &StoredMessage,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Replace the summary and advance the compaction watermark.
    fn set_summary(
        &self,
        conversation_id: &Uuid,
        summary: &str,
        compacted_at: usize,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Mark a conversation as ended.
    fn end_conversation(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

impl<S: ConversationStore> ConversationStore for std::sync::Arc<S> {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        self.as_ref().create_conversation(conversation).await
    }

    async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, StoreError> {
        self.as_ref().get_conversation(id).await
    }

    async fn get_active_conversation(
        &self,
        user_id: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        self.as_ref().get_active_conversation(user_id).await
    }

    async fn add_message(
        &self,
        conversation_id: &Uuid,
        message: &StoredMessage,
    ) -> Result<(), StoreError> {
        self.as_ref().add_message(conversation_id, message).await
    }

    async fn set_summary(
        &self,
        conversation_id: &Uuid,
        summary: &str,
        compacted_at: usize,
    ) -> Result<(), StoreError> {
        self.as_ref()
            .set_summary(conversation_id, summary, compacted_at)
            .await
    }

    async fn end_conversation(&self, id: &Uuid) -> Result<(), StoreError> {
        self.as_ref().end_conversation(id).await
    }
}

/// In-memory `ConversationStore` for tests and development.
///
/// A single mutex guards the whole map; access never holds the lock across
/// an await point.
#[derive(Default)]
pub struct MemoryConversationStore {
    conversations: Mutex<HashMap<Uuid, Conversation>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for MemoryConversationStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        let mut conversations = self.conversations.lock().expect("store lock poisoned");
        conversations.insert(conversation.id, conversation.clone());
        Ok(())
    }

    async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, StoreError> {
        let conversations = self.conversations.lock().expect("store lock poisoned");
        Ok(conversations.get(id).cloned())
    }

    async fn get_active_conversation(
        &self,
        user_id: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        let conversations = self.conversations.lock().expect("store lock poisoned");
        Ok(conversations
            .values()
            .find(|c| c.user_id == user_id && c.ended_at.is_none())
            .cloned())
    }

    async fn add_message(
        &self,
        conversation_id: &Uuid,
        message: &StoredMessage,
    ) -> Result<(), StoreError> {
        let mut conversations = self.conversations.lock().expect("store lock poisoned");
        let conversation = conversations
            .get_mut(conversation_id)
            .ok_or(StoreError::NotFound(*conversation_id))?;
        conversation.messages.push(message.clone());
        Ok(())
    }

    async fn set_summary(
        &self,
        conversation_id: &Uuid,
        summary: &str,
        compacted_at: usize,
    ) -> Result<(), StoreError> {
        let mut conversations = self.conversations.lock().expect("store lock poisoned");
        let conversation = conversations
            .get_mut(conversation_id)
            .ok_or(StoreError::NotFound(*conversation_id))?;
        conversation.summary = Some(summary.to_string());
        conversation.compacted_at = compacted_at;
        Ok(())
    }

    async fn end_conversation(&self, id: &Uuid) -> Result<(), StoreError> {
        let mut conversations = self.conversations.lock().expect("store lock poisoned");
        let conversation = conversations
            .get_mut(id)
            .ok_or(StoreError::NotFound(*id))?;
        conversation.ended_at = Some(Utc::now());
        Ok(())
    }
}
