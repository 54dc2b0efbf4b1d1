//! Sequence Allocator Tests

use std::collections::HashSet;

use chat_store::infrastructure::repositories::{MESSAGE_SEQUENCE, USER_SEQUENCE};
use chat_store::shared::error::RepositoryError;

use crate::common::{memory_repositories, memory_repositories_with_store};

#[tokio::test]
async fn test_fresh_sequence_starts_at_one() {
    let repositories = memory_repositories().await;

    assert_eq!(repositories.sequences.next(MESSAGE_SEQUENCE).await.unwrap(), 1);
    assert_eq!(repositories.sequences.next(MESSAGE_SEQUENCE).await.unwrap(), 2);
}

#[tokio::test]
async fn test_concurrent_allocations_are_distinct_and_dense() {
    let repositories = memory_repositories().await;
    let k = 64;

    let handles: Vec<_> = (0..k)
        .map(|_| {
            let sequences = repositories.sequences.clone();
            tokio::spawn(async move { sequences.next(USER_SEQUENCE).await })
        })
        .collect();

    let values: HashSet<i64> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(values.len(), k);
    assert_eq!(values, (1..=k as i64).collect());
    assert_eq!(repositories.sequences.current(USER_SEQUENCE).await.unwrap(), k as i64);
}

#[tokio::test]
async fn test_offline_store_reports_unavailable() {
    let (repositories, store) = memory_repositories_with_store().await;

    store.set_offline(true);
    let err = repositories.sequences.next(MESSAGE_SEQUENCE).await.unwrap_err();
    assert!(matches!(err, RepositoryError::StoreUnavailable(_)));

    store.set_offline(false);
    assert_eq!(repositories.sequences.current(MESSAGE_SEQUENCE).await.unwrap(), 0);
}
