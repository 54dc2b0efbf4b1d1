//! User entity and repository trait.
//!
//! Stored in the `users` collection of the document store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::shared::error::RepositoryError;

/// Represents a user account.
///
/// Document layout in `users`:
/// - _id: integer, allocated from the `user_id` sequence
/// - email: unique
/// - username: unique
/// - password_hash: Argon2id PHC string
/// - name: display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Sequential ID (primary key)
    pub id: i64,

    /// Email address (unique)
    pub email: String,

    /// Username (unique)
    pub username: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name
    pub name: String,
}

/// Input for [`UserRepository::create`]. The password is hashed before it is stored.
#[derive(Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub username: String,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
}

impl NewUser {
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password: password.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

/// Partial update of a user. `None` leaves the stored field untouched.
///
/// There is no `id` field, so identifiers cannot be patched.
#[derive(Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    #[serde(default)]
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub username: Option<String>,

    /// New plaintext password; re-hashed on update.
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: Option<String>,
}

impl UserPatch {
    /// True when the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.username.is_none() && self.password.is_none() && self.name.is_none()
    }
}

impl std::fmt::Debug for UserPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPatch")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("name", &self.name)
            .finish()
    }
}

/// Repository trait for User data access operations.
///
/// Implementations of this trait handle the actual store interactions.
/// The trait is defined in the domain layer to maintain dependency inversion.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user after checking email and username are free.
    ///
    /// Fails with `DuplicateEmail` or `DuplicateUsername` without consuming an ID.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Find a user by ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError>;

    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Find a user by username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// All users in store order, at most [`LIST_LIMIT`](crate::domain::LIST_LIMIT).
    async fn find_all(&self) -> Result<Vec<User>, RepositoryError>;

    /// Apply a partial update; `None` if no user has this ID.
    async fn update(&self, id: i64, patch: UserPatch) -> Result<Option<User>, RepositoryError>;

    /// Hard delete. Returns whether a user was removed.
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;

    /// The user with this email if `password` matches; `None` otherwise,
    /// whether the email is unknown or the password wrong.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, RepositoryError>;
}
