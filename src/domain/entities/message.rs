//! Message entity and repository trait.
//!
//! Stored in the `messages` collection of the document store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::RepositoryError;

/// A chat message.
///
/// Document layout in `messages`:
/// - _id: integer, allocated from the `message_id` sequence
/// - user_id: integer, owning user (not checked against `users`)
/// - message: text body
/// - timestamp: microseconds since the Unix epoch
/// - is_bot / is_email / is_response: booleans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sequential ID (primary key)
    pub id: i64,

    /// ID of the user the message belongs to
    pub user_id: i64,

    /// Message body
    pub message: String,

    /// When the message was sent
    pub timestamp: DateTime<Utc>,

    /// Written by the assistant rather than a person
    pub is_bot: bool,

    /// Arrived by email
    pub is_email: bool,

    /// A reply to an earlier message
    pub is_response: bool,
}

/// Input for [`MessageRepository::create`]. The ID is always assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct NewMessage {
    pub user_id: i64,

    pub message: String,

    /// Defaults to the time of creation.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_bot: bool,

    #[serde(default)]
    pub is_email: bool,

    #[serde(default)]
    pub is_response: bool,
}

impl NewMessage {
    /// A plain user message with default flags, stamped at creation time.
    pub fn new(user_id: i64, message: impl Into<String>) -> Self {
        Self {
            user_id,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Set an explicit timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Partial update of a message. `None` leaves the stored field untouched.
///
/// There is deliberately no `id` field: identifiers cannot be patched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessagePatch {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_bot: Option<bool>,
    #[serde(default)]
    pub is_email: Option<bool>,
    #[serde(default)]
    pub is_response: Option<bool>,
}

impl MessagePatch {
    /// True when the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.message.is_none()
            && self.timestamp.is_none()
            && self.is_bot.is_none()
            && self.is_email.is_none()
            && self.is_response.is_none()
    }
}

/// Repository trait for Message data access operations.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Store a new message under the next `message_id` sequence value.
    async fn create(&self, message: NewMessage) -> Result<Message, RepositoryError>;

    /// Find a message by ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, RepositoryError>;

    /// All messages, oldest first, at most [`LIST_LIMIT`](crate::domain::LIST_LIMIT).
    async fn find_all(&self) -> Result<Vec<Message>, RepositoryError>;

    /// Messages of one user, oldest first, at most [`LIST_LIMIT`](crate::domain::LIST_LIMIT).
    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Message>, RepositoryError>;

    /// Apply a partial update; `None` if no message has this ID.
    async fn update(&self, id: i64, patch: MessagePatch) -> Result<Option<Message>, RepositoryError>;

    /// Hard delete. Returns whether a message was removed.
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
}
