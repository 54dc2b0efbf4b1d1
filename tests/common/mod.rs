//! Common Test Utilities
//!
//! Shared helpers and fixtures.

#![allow(dead_code)]

use std::sync::Arc;

use fake::faker::internet::en::{Password, SafeEmail, Username};
use fake::faker::name::en::Name;
use fake::Fake;

use chat_store::config::PasswordSettings;
use chat_store::domain::NewUser;
use chat_store::infrastructure::store::MemoryDocumentStore;
use chat_store::shared::password::CredentialHasher;
use chat_store::startup::Repositories;

/// Repositories over a fresh in-memory store, with unique indexes.
pub async fn memory_repositories() -> Repositories {
    Repositories::in_memory()
        .await
        .expect("in-memory repositories")
}

/// Like [`memory_repositories`], also returning the store for inspection.
pub async fn memory_repositories_with_store() -> (Repositories, MemoryDocumentStore) {
    let store = MemoryDocumentStore::new();
    let repositories = Repositories::with_store(Arc::new(store.clone()), cheap_hasher());
    repositories.ensure_indexes().await.expect("indexes");
    (repositories, store)
}

/// Argon2id hasher with minimal cost.
pub fn cheap_hasher() -> CredentialHasher {
    CredentialHasher::new(&PasswordSettings::low_cost()).expect("valid params")
}

/// Generate a unique email for testing
pub fn unique_email() -> String {
    let email: String = SafeEmail().fake();
    format!("{}.{}", uuid::Uuid::new_v4().simple(), email)
}

/// Generate a unique username for testing
pub fn unique_username() -> String {
    let username: String = Username().fake();
    format!("{}_{}", username, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

/// A valid new user with generated, unique fields.
pub fn fake_user() -> NewUser {
    let password: String = Password(8..16).fake();
    let name: String = Name().fake();
    NewUser::new(unique_email(), unique_username(), password, name)
}
