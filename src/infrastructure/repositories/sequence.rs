//! Sequence Allocator
//!
//! Issues human-readable, strictly increasing integer IDs, one counter
//! document per sequence name in the `counters` collection.
//!
//! All atomicity comes from the store's single-document increment. There is
//! no lock here, so any number of processes can allocate from the same
//! counter.

use std::sync::Arc;

use crate::infrastructure::store::{get_i64, DocumentStore, Filter, COUNTERS};
use crate::shared::error::RepositoryError;

/// Sequence used for message IDs.
pub const MESSAGE_SEQUENCE: &str = "message_id";

/// Sequence used for user IDs.
pub const USER_SEQUENCE: &str = "user_id";

/// Counter field inside a counter document.
const VALUE_FIELD: &str = "value";

/// Allocates sequential IDs from store-backed counters.
#[derive(Clone)]
pub struct SequenceAllocator {
    store: Arc<dyn DocumentStore>,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Next value of `sequence`: one more than its state on entry, 1 on first use.
    ///
    /// Either the increment is persisted and its value returned, or nothing
    /// changed and the store error is returned. A value handed out here is
    /// never handed out again, even if the caller then fails to use it.
    pub async fn next(&self, sequence: &str) -> Result<i64, RepositoryError> {
        let counter = self
            .store
            .find_one_and_increment(COUNTERS, sequence, VALUE_FIELD, 1)
            .await?;

        let value = get_i64(&counter, VALUE_FIELD).ok_or_else(|| {
            RepositoryError::Corrupt(format!("counter {} has no integer value", sequence))
        })?;

        tracing::debug!(sequence, value, "Allocated sequence value");
        Ok(value)
    }

    /// Last value handed out for `sequence`, 0 if none yet. Does not allocate.
    pub async fn current(&self, sequence: &str) -> Result<i64, RepositoryError> {
        let counter = self
            .store
            .find_one(COUNTERS, &Filter::by_id(sequence))
            .await?;

        match counter {
            None => Ok(0),
            Some(counter) => get_i64(&counter, VALUE_FIELD).ok_or_else(|| {
                RepositoryError::Corrupt(format!("counter {} has no integer value", sequence))
            }),
        }
    }
}
