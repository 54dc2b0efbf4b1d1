//! Document Store
//!
//! The port every repository talks to, plus its adapters.
//!
//! A store holds JSON documents grouped into named collections. Every document
//! carries its primary key in the `_id` field. The store guarantees atomicity
//! per document and per call only; nothing here spans documents.
//!
//! ## Adapters
//!
//! - [`MemoryDocumentStore`] - process-local, used by tests and the `memory` backend
//! - [`PgDocumentStore`] - JSONB documents in PostgreSQL

mod memory;
mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::shared::error::StoreError;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Primary key field present on every document.
pub const ID_FIELD: &str = "_id";

/// Collection holding one counter document per sequence name.
pub const COUNTERS: &str = "counters";

/// Collection holding user documents.
pub const USERS: &str = "users";

/// Collection holding message documents.
pub const MESSAGES: &str = "messages";

/// Equality filter: a document matches when every listed field equals the given value.
///
/// An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Document);

impl Filter {
    /// Filter matching every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter on a single field.
    pub fn field(field: &str, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    /// Filter on the primary key.
    pub fn by_id(id: impl Into<Value>) -> Self {
        Self::field(ID_FIELD, id)
    }

    /// Add another equality condition.
    pub fn and(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    /// Whether `document` satisfies every condition.
    pub fn matches(&self, document: &Document) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }

    /// The conditions as a JSON object.
    pub fn as_document(&self) -> &Document {
        &self.0
    }
}

/// Operations a document store must provide.
///
/// Implementations must make each call atomic with respect to the single
/// document it touches. In particular [`find_one_and_increment`] must never
/// hand the same value to two callers.
///
/// [`find_one_and_increment`]: DocumentStore::find_one_and_increment
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// First document matching `filter`, if any.
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError>;

    /// Atomically add `by` to the integer `field` of the document whose `_id`
    /// is `key`, creating the document (and field, from 0) when missing.
    ///
    /// Returns the document after the increment.
    async fn find_one_and_increment(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        by: i64,
    ) -> Result<Document, StoreError>;

    /// Insert a new document. Fails with `DuplicateKey` when `_id` or a unique field collides.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StoreError>;

    /// Merge `set` into the first document matching `filter`, field by field.
    ///
    /// `_id` in `set` is ignored. Returns the number of documents matched (0 or 1).
    async fn update_one(&self, collection: &str, filter: &Filter, set: Document) -> Result<u64, StoreError>;

    /// Delete the first document matching `filter`. Returns the number deleted (0 or 1).
    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Documents matching `filter`, optionally in ascending order of one field,
    /// truncated to `limit`.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort_ascending: Option<&'static str>,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError>;

    /// Reject future inserts and updates that would give two documents in
    /// `collection` the same value of `field`. Idempotent.
    async fn create_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError>;
}

/// Read an integer field from a document.
pub fn get_i64(document: &Document, field: &str) -> Option<i64> {
    document.get(field).and_then(Value::as_i64)
}

/// Collection and field names end up in index names and SQL, so keep them plain.
pub(crate) fn check_name(name: &str) -> Result<(), StoreError> {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}
