//! PostgreSQL Store Tests
//!
//! Run against a real database with:
//!
//! ```text
//! TEST_DATABASE_URL=postgres://localhost/chat_store_test cargo test -- --ignored
//! ```
//!
//! Tests share the database, so they assert on deltas and unique values only.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

use chat_store::config::DatabaseSettings;
use chat_store::domain::{MessagePatch, MessageRepository, NewMessage, NewUser, UserPatch, UserRepository};
use chat_store::infrastructure::database::{create_pool, run_migrations};
use chat_store::infrastructure::repositories::USER_SEQUENCE;
use chat_store::infrastructure::store::{DocumentStore, Filter, PgDocumentStore};
use chat_store::shared::error::{RepositoryError, StoreError};
use chat_store::startup::Repositories;

use crate::common::{cheap_hasher, fake_user, unique_email, unique_username};

async fn pg_repositories() -> (Repositories, PgDocumentStore) {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let settings = DatabaseSettings {
        url: Some(url),
        max_connections: 5,
        min_connections: 0,
        acquire_timeout: 5,
    };

    let pool = create_pool(&settings).await.expect("connect");
    run_migrations(&pool).await.expect("migrate");

    let store = PgDocumentStore::new(pool);
    let repositories = Repositories::with_store(Arc::new(store.clone()), cheap_hasher());
    repositories.ensure_indexes().await.expect("indexes");
    (repositories, store)
}

/// A sequence name no other test run uses.
fn scratch_sequence() -> String {
    format!("test_{}", uuid::Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_pg_fresh_sequence_starts_at_one() {
    let (repositories, _) = pg_repositories().await;
    let name = scratch_sequence();

    assert_eq!(repositories.sequences.current(&name).await.unwrap(), 0);
    assert_eq!(repositories.sequences.next(&name).await.unwrap(), 1);
    assert_eq!(repositories.sequences.next(&name).await.unwrap(), 2);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_pg_concurrent_allocations_are_distinct() {
    let (repositories, _) = pg_repositories().await;
    let name = scratch_sequence();
    let k = 32;

    let handles: Vec<_> = (0..k)
        .map(|_| {
            let sequences = repositories.sequences.clone();
            let name = name.clone();
            tokio::spawn(async move { sequences.next(&name).await })
        })
        .collect();

    let values: HashSet<i64> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(values, (1..=k as i64).collect());
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_pg_message_round_trip_and_patch() {
    let (repositories, _) = pg_repositories().await;
    let user_id = i64::from(rand_user_id());

    let created = repositories
        .messages
        .create(NewMessage::new(user_id, "hello"))
        .await
        .unwrap();
    assert_eq!(repositories.messages.find_by_id(created.id).await.unwrap(), Some(created.clone()));

    let patch = MessagePatch {
        is_bot: Some(true),
        ..Default::default()
    };
    let updated = repositories.messages.update(created.id, patch).await.unwrap().unwrap();
    assert!(updated.is_bot);
    assert_eq!(updated.message, "hello");

    assert!(repositories.messages.delete(created.id).await.unwrap());
    assert_eq!(repositories.messages.find_by_id(created.id).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_pg_find_by_user_orders_by_timestamp() {
    let (repositories, _) = pg_repositories().await;
    let user_id = i64::from(rand_user_id());
    let now = Utc::now();

    for offset in [3, 1, 2] {
        repositories
            .messages
            .create(NewMessage::new(user_id, offset.to_string()).at(now - Duration::minutes(offset)))
            .await
            .unwrap();
    }

    let bodies: Vec<String> = repositories
        .messages
        .find_by_user(user_id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.message)
        .collect();
    assert_eq!(bodies, vec!["3", "2", "1"]);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_pg_user_uniqueness_and_authentication() {
    let (repositories, _) = pg_repositories().await;
    let input = fake_user();
    let user = repositories.users.create(input.clone()).await.unwrap();

    let clash = NewUser::new(input.email.clone(), unique_username(), "p", "Clash");
    let err = repositories.users.create(clash).await.unwrap_err();
    assert!(matches!(err, RepositoryError::DuplicateEmail(_)));

    let authenticated = repositories
        .users
        .authenticate(&input.email, &input.password)
        .await
        .unwrap();
    assert_eq!(authenticated, Some(user.clone()));
    assert_eq!(repositories.users.authenticate(&input.email, "wrong").await.unwrap(), None);

    assert!(repositories.sequences.current(USER_SEQUENCE).await.unwrap() >= user.id);

    let patch = UserPatch {
        username: Some(unique_username()),
        ..Default::default()
    };
    let renamed = repositories.users.update(user.id, patch).await.unwrap().unwrap();
    assert_ne!(renamed.username, user.username);

    assert!(repositories.users.delete(user.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_pg_unique_index_rejects_direct_insert() {
    let (_, store) = pg_repositories().await;
    let email = unique_email();

    let document = |id: &str, username: String| {
        let mut document = chat_store::infrastructure::store::Document::new();
        document.insert("_id".into(), serde_json::json!(id));
        document.insert("email".into(), serde_json::json!(email));
        document.insert("username".into(), serde_json::json!(username));
        document
    };

    let first = format!("raw-{}", uuid::Uuid::new_v4().simple());
    let second = format!("raw-{}", uuid::Uuid::new_v4().simple());
    store.insert_one("users", document(&first, unique_username())).await.unwrap();

    let err = store
        .insert_one("users", document(&second, unique_username()))
        .await
        .unwrap_err();
    assert!(err.is_duplicate_of("email"));
    assert!(matches!(err, StoreError::DuplicateKey { .. }));

    store.delete_one("users", &Filter::by_id(first)).await.unwrap();
}

/// User IDs for message tests; messages do not check them against users.
fn rand_user_id() -> u32 {
    uuid::Uuid::new_v4().as_u128() as u32
}
