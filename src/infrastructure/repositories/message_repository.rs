//! Message Repository Implementation
//!
//! Document-store implementation of the MessageRepository trait.
//! IDs come from the `message_id` sequence; lists are ordered by timestamp.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::sequence::{SequenceAllocator, MESSAGE_SEQUENCE};
use crate::domain::{Message, MessagePatch, MessageRepository, NewMessage, LIST_LIMIT};
use crate::infrastructure::store::{Document, DocumentStore, Filter, MESSAGES};
use crate::shared::error::RepositoryError;

const TIMESTAMP_FIELD: &str = "timestamp";

/// Stored representation of a message.
///
/// Timestamps are kept as integer microseconds so every store orders them
/// numerically.
#[derive(Debug, Serialize, Deserialize)]
struct MessageDocument {
    #[serde(rename = "_id")]
    id: i64,
    user_id: i64,
    message: String,
    #[serde(with = "chrono::serde::ts_microseconds")]
    timestamp: DateTime<Utc>,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    is_email: bool,
    #[serde(default)]
    is_response: bool,
}

impl MessageDocument {
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            user_id: self.user_id,
            message: self.message,
            timestamp: self.timestamp,
            is_bot: self.is_bot,
            is_email: self.is_email,
            is_response: self.is_response,
        }
    }

    fn to_document(&self) -> Result<Document, RepositoryError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(RepositoryError::Internal("message did not encode as an object".into())),
            Err(e) => Err(RepositoryError::Internal(format!("Failed to encode message: {}", e))),
        }
    }

    fn from_document(document: Document) -> Result<Self, RepositoryError> {
        serde_json::from_value(Value::Object(document))
            .map_err(|e| RepositoryError::Corrupt(format!("{}: {}", MESSAGES, e)))
    }
}

/// Stored precision of message timestamps.
fn truncate(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(6)
}

/// Fields of `patch` that are present, in stored form. Never contains `_id`.
fn patch_document(patch: MessagePatch) -> Document {
    let mut set = Document::new();
    if let Some(user_id) = patch.user_id {
        set.insert("user_id".into(), Value::from(user_id));
    }
    if let Some(message) = patch.message {
        set.insert("message".into(), Value::from(message));
    }
    if let Some(timestamp) = patch.timestamp {
        set.insert(TIMESTAMP_FIELD.into(), Value::from(truncate(timestamp).timestamp_micros()));
    }
    if let Some(is_bot) = patch.is_bot {
        set.insert("is_bot".into(), Value::from(is_bot));
    }
    if let Some(is_email) = patch.is_email {
        set.insert("is_email".into(), Value::from(is_email));
    }
    if let Some(is_response) = patch.is_response {
        set.insert("is_response".into(), Value::from(is_response));
    }
    set
}

/// Message repository over a document store.
#[derive(Clone)]
pub struct DocumentMessageRepository {
    store: Arc<dyn DocumentStore>,
    sequences: SequenceAllocator,
}

impl DocumentMessageRepository {
    /// Create a repository that allocates IDs through `sequences`.
    pub fn new(store: Arc<dyn DocumentStore>, sequences: SequenceAllocator) -> Self {
        Self { store, sequences }
    }

    async fn find_many(&self, filter: Filter) -> Result<Vec<Message>, RepositoryError> {
        let documents = self
            .store
            .find(MESSAGES, &filter, Some(TIMESTAMP_FIELD), LIST_LIMIT)
            .await?;

        documents
            .into_iter()
            .map(|d| MessageDocument::from_document(d).map(MessageDocument::into_message))
            .collect()
    }
}

#[async_trait]
impl MessageRepository for DocumentMessageRepository {
    async fn create(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let id = self.sequences.next(MESSAGE_SEQUENCE).await?;

        let stored = MessageDocument {
            id,
            user_id: message.user_id,
            message: message.message,
            timestamp: truncate(message.timestamp.unwrap_or_else(Utc::now)),
            is_bot: message.is_bot,
            is_email: message.is_email,
            is_response: message.is_response,
        };
        self.store.insert_one(MESSAGES, stored.to_document()?).await?;

        tracing::info!(message_id = id, user_id = stored.user_id, "Message created");
        Ok(stored.into_message())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, RepositoryError> {
        let document = self.store.find_one(MESSAGES, &Filter::by_id(id)).await?;

        document
            .map(|d| MessageDocument::from_document(d).map(MessageDocument::into_message))
            .transpose()
    }

    async fn find_all(&self) -> Result<Vec<Message>, RepositoryError> {
        self.find_many(Filter::all()).await
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Message>, RepositoryError> {
        self.find_many(Filter::field("user_id", user_id)).await
    }

    async fn update(&self, id: i64, patch: MessagePatch) -> Result<Option<Message>, RepositoryError> {
        if !patch.is_empty() {
            let matched = self
                .store
                .update_one(MESSAGES, &Filter::by_id(id), patch_document(patch))
                .await?;
            tracing::debug!(message_id = id, matched, "Message patched");
        }

        self.find_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let deleted = self.store.delete_one(MESSAGES, &Filter::by_id(id)).await?;

        if deleted > 0 {
            tracing::info!(message_id = id, "Message deleted");
        }
        Ok(deleted > 0)
    }
}
