//! User Repository Implementation
//!
//! Document-store implementation of the UserRepository trait.
//!
//! Email and username are unique. `create` checks both up front so the common
//! case fails without consuming an ID, and the store's unique indexes (see
//! [`DocumentUserRepository::ensure_indexes`]) close the window between the
//! check and the insert.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::sequence::{SequenceAllocator, USER_SEQUENCE};
use crate::domain::{NewUser, User, UserPatch, UserRepository, LIST_LIMIT};
use crate::infrastructure::store::{Document, DocumentStore, Filter, USERS};
use crate::shared::error::{RepositoryError, StoreError};
use crate::shared::password::CredentialHasher;
use crate::shared::validation::validation_error;

const EMAIL_FIELD: &str = "email";
const USERNAME_FIELD: &str = "username";

/// Stored representation of a user.
#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: i64,
    email: String,
    username: String,
    password_hash: String,
    name: String,
}

impl UserDocument {
    fn into_user(self) -> User {
        User {
            id: self.id,
            email: self.email,
            username: self.username,
            password_hash: self.password_hash,
            name: self.name,
        }
    }

    fn to_document(&self) -> Result<Document, RepositoryError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(RepositoryError::Internal("user did not encode as an object".into())),
            Err(e) => Err(RepositoryError::Internal(format!("Failed to encode user: {}", e))),
        }
    }

    fn from_document(document: Document) -> Result<Self, RepositoryError> {
        serde_json::from_value(Value::Object(document))
            .map_err(|e| RepositoryError::Corrupt(format!("{}: {}", USERS, e)))
    }
}

fn decode(document: Option<Document>) -> Result<Option<User>, RepositoryError> {
    document
        .map(|d| UserDocument::from_document(d).map(UserDocument::into_user))
        .transpose()
}

/// Translate a store collision on a unique field into the matching domain error.
fn map_duplicate(err: StoreError, email: &str, username: &str) -> RepositoryError {
    if err.is_duplicate_of(EMAIL_FIELD) {
        tracing::warn!(email, "Duplicate email rejected by store");
        RepositoryError::DuplicateEmail(email.to_string())
    } else if err.is_duplicate_of(USERNAME_FIELD) {
        tracing::warn!(username, "Duplicate username rejected by store");
        RepositoryError::DuplicateUsername(username.to_string())
    } else {
        err.into()
    }
}

/// User repository over a document store.
#[derive(Clone)]
pub struct DocumentUserRepository {
    store: Arc<dyn DocumentStore>,
    sequences: SequenceAllocator,
    hasher: CredentialHasher,
}

impl DocumentUserRepository {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        sequences: SequenceAllocator,
        hasher: CredentialHasher,
    ) -> Self {
        Self {
            store,
            sequences,
            hasher,
        }
    }

    /// Create the unique indexes on `email` and `username`. Idempotent.
    pub async fn ensure_indexes(&self) -> Result<(), RepositoryError> {
        self.store.create_unique_index(USERS, EMAIL_FIELD).await?;
        self.store.create_unique_index(USERS, USERNAME_FIELD).await?;
        Ok(())
    }

    async fn find_by_field(&self, field: &str, value: &str) -> Result<Option<User>, RepositoryError> {
        let document = self.store.find_one(USERS, &Filter::field(field, value)).await?;
        decode(document)
    }

    /// Fail if a user other than `id` already holds the patched email or username.
    async fn check_patch_conflicts(&self, id: i64, patch: &UserPatch) -> Result<(), RepositoryError> {
        if let Some(email) = &patch.email {
            if self.find_by_email(email).await?.is_some_and(|u| u.id != id) {
                tracing::warn!(user_id = id, email = %email, "Email already taken");
                return Err(RepositoryError::DuplicateEmail(email.clone()));
            }
        }
        if let Some(username) = &patch.username {
            if self.find_by_username(username).await?.is_some_and(|u| u.id != id) {
                tracing::warn!(user_id = id, username = %username, "Username already taken");
                return Err(RepositoryError::DuplicateUsername(username.clone()));
            }
        }
        Ok(())
    }

    /// Fields of `patch` that are present, in stored form. Never contains `_id`.
    fn patch_document(&self, patch: UserPatch) -> Result<Document, RepositoryError> {
        let mut set = Document::new();
        if let Some(email) = patch.email {
            set.insert(EMAIL_FIELD.into(), Value::from(email));
        }
        if let Some(username) = patch.username {
            set.insert(USERNAME_FIELD.into(), Value::from(username));
        }
        if let Some(password) = patch.password {
            set.insert("password_hash".into(), Value::from(self.hasher.hash_password(&password)?));
        }
        if let Some(name) = patch.name {
            set.insert("name".into(), Value::from(name));
        }
        Ok(set)
    }
}

#[async_trait]
impl UserRepository for DocumentUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        user.validate().map_err(validation_error)?;

        if self.find_by_email(&user.email).await?.is_some() {
            tracing::warn!(email = %user.email, "Email already registered");
            return Err(RepositoryError::DuplicateEmail(user.email));
        }
        if self.find_by_username(&user.username).await?.is_some() {
            tracing::warn!(username = %user.username, "Username already taken");
            return Err(RepositoryError::DuplicateUsername(user.username));
        }

        let password_hash = self.hasher.hash_password(&user.password)?;
        let id = self.sequences.next(USER_SEQUENCE).await?;

        let stored = UserDocument {
            id,
            email: user.email,
            username: user.username,
            password_hash,
            name: user.name,
        };
        self.store
            .insert_one(USERS, stored.to_document()?)
            .await
            .map_err(|e| map_duplicate(e, &stored.email, &stored.username))?;

        tracing::info!(user_id = id, username = %stored.username, "User created");
        Ok(stored.into_user())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        let document = self.store.find_one(USERS, &Filter::by_id(id)).await?;
        decode(document)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.find_by_field(EMAIL_FIELD, email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        self.find_by_field(USERNAME_FIELD, username).await
    }

    async fn find_all(&self) -> Result<Vec<User>, RepositoryError> {
        let documents = self.store.find(USERS, &Filter::all(), None, LIST_LIMIT).await?;

        documents
            .into_iter()
            .map(|d| UserDocument::from_document(d).map(UserDocument::into_user))
            .collect()
    }

    async fn update(&self, id: i64, patch: UserPatch) -> Result<Option<User>, RepositoryError> {
        if patch.is_empty() {
            return self.find_by_id(id).await;
        }
        patch.validate().map_err(validation_error)?;
        if self.find_by_id(id).await?.is_none() {
            return Ok(None);
        }
        self.check_patch_conflicts(id, &patch).await?;

        let email = patch.email.clone().unwrap_or_default();
        let username = patch.username.clone().unwrap_or_default();
        let set = self.patch_document(patch)?;

        let matched = self
            .store
            .update_one(USERS, &Filter::by_id(id), set)
            .await
            .map_err(|e| map_duplicate(e, &email, &username))?;
        tracing::debug!(user_id = id, matched, "User patched");

        self.find_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let deleted = self.store.delete_one(USERS, &Filter::by_id(id)).await?;

        if deleted > 0 {
            tracing::info!(user_id = id, "User deleted");
        }
        Ok(deleted > 0)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, RepositoryError> {
        let Some(user) = self.find_by_email(email).await? else {
            tracing::debug!("Authentication failed: unknown email");
            return Ok(None);
        };

        if self.hasher.verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            tracing::debug!(user_id = user.id, "Authentication failed: wrong password");
            Ok(None)
        }
    }
}
