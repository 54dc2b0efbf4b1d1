//! Error Types
//!
//! Two layers of errors: [`StoreError`] is what a document store adapter
//! reports, [`RepositoryError`] is what repository callers branch on.
//! Lookups that find nothing are `Ok(None)`, never an error.

/// Failure reported by a [`DocumentStore`](crate::infrastructure::store::DocumentStore) adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or the operation did not complete.
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    /// An insert or update collided with the primary key or a unique index.
    #[error("Duplicate key in {collection}.{field}")]
    DuplicateKey { collection: String, field: String },

    /// A document was inserted without an `_id`.
    #[error("Document in {collection} has no _id")]
    MissingKey { collection: String },

    /// A stored document could not be read back as a JSON object.
    #[error("Malformed document in {collection}: {reason}")]
    Malformed { collection: String, reason: String },

    /// A collection or field name is not usable as an identifier.
    #[error("Invalid collection or field name: {0}")]
    InvalidName(String),
}

impl StoreError {
    /// Whether this is a unique-key collision on `field`.
    pub fn is_duplicate_of(&self, field: &str) -> bool {
        matches!(self, Self::DuplicateKey { field: f, .. } if f == field)
    }
}

/// Repository error type
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("User with email {0} already exists")]
    DuplicateEmail(String),

    #[error("User with username {0} already exists")]
    DuplicateUsername(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RepositoryError {
    /// Whether the caller supplied input it can correct (as opposed to a server-side failure).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateEmail(_) | Self::DuplicateUsername(_) | Self::Validation(_)
        )
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::DuplicateKey { collection, field } => {
                Self::Conflict(format!("duplicate {} in {}", field, collection))
            }
            StoreError::Malformed { collection, reason } => {
                Self::Corrupt(format!("{}: {}", collection, reason))
            }
            e @ (StoreError::MissingKey { .. } | StoreError::InvalidName(_)) => {
                Self::Internal(e.to_string())
            }
        }
    }
}
