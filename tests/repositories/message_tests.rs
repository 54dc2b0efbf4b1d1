//! Message Repository Tests

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;

use chat_store::domain::{MessagePatch, MessageRepository, NewMessage, LIST_LIMIT};
use chat_store::infrastructure::repositories::MESSAGE_SEQUENCE;
use chat_store::infrastructure::store::{DocumentStore, Filter, MESSAGES};
use chat_store::shared::error::RepositoryError;

use crate::common::{memory_repositories, memory_repositories_with_store};

#[tokio::test]
async fn test_create_then_get_returns_equal_record() {
    let repositories = memory_repositories().await;
    let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();

    let mut input = NewMessage::new(7, "hello").at(ts);
    input.is_email = true;
    let created = repositories.messages.create(input).await.unwrap();

    assert_eq!(created.id, 1);
    assert_eq!(created.user_id, 7);
    assert!(created.is_email);
    assert!(!created.is_bot);
    assert_eq!(repositories.messages.find_by_id(created.id).await.unwrap(), Some(created));
}

#[tokio::test]
async fn test_ids_follow_the_message_sequence() {
    let repositories = memory_repositories().await;

    let first = repositories.messages.create(NewMessage::new(1, "a")).await.unwrap();
    let second = repositories.messages.create(NewMessage::new(1, "a")).await.unwrap();

    assert_eq!(second.id, first.id + 1);
    assert_eq!(repositories.sequences.current(MESSAGE_SEQUENCE).await.unwrap(), second.id);
}

#[tokio::test]
async fn test_missing_message_is_none() {
    let repositories = memory_repositories().await;
    assert_eq!(repositories.messages.find_by_id(99).await.unwrap(), None);
}

#[tokio::test]
async fn test_lists_are_ordered_by_timestamp() {
    let repositories = memory_repositories().await;
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    for (user_id, offset) in [(1, 30), (2, 10), (1, 20), (1, 0)] {
        repositories
            .messages
            .create(NewMessage::new(user_id, format!("t+{}", offset)).at(base + Duration::seconds(offset)))
            .await
            .unwrap();
    }

    let all: Vec<String> = repositories
        .messages
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.message)
        .collect();
    assert_eq!(all, vec!["t+0", "t+10", "t+20", "t+30"]);

    let user_one: Vec<String> = repositories
        .messages
        .find_by_user(1)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.message)
        .collect();
    assert_eq!(user_one, vec!["t+0", "t+20", "t+30"]);
}

#[tokio::test]
async fn test_find_by_user_without_messages_is_empty() {
    let repositories = memory_repositories().await;
    repositories.messages.create(NewMessage::new(1, "x")).await.unwrap();

    assert!(repositories.messages.find_by_user(2).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_lists_stop_at_ceiling() {
    let repositories = memory_repositories().await;
    for _ in 0..LIST_LIMIT + 5 {
        repositories.messages.create(NewMessage::new(1, "spam")).await.unwrap();
    }

    assert_eq!(repositories.messages.find_all().await.unwrap().len(), LIST_LIMIT);
    assert_eq!(repositories.messages.find_by_user(1).await.unwrap().len(), LIST_LIMIT);
}

#[tokio::test]
async fn test_update_merges_only_given_fields() {
    let repositories = memory_repositories().await;
    let created = repositories.messages.create(NewMessage::new(3, "draft")).await.unwrap();

    let patch = MessagePatch {
        message: Some("final".into()),
        is_response: Some(true),
        ..Default::default()
    };
    let updated = repositories.messages.update(created.id, patch).await.unwrap().unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.user_id, 3);
    assert_eq!(updated.message, "final");
    assert_eq!(updated.timestamp, created.timestamp);
    assert!(updated.is_response);
    assert!(!updated.is_bot);
}

#[tokio::test]
async fn test_patch_with_id_key_cannot_change_id() {
    let (repositories, store) = memory_repositories_with_store().await;
    let created = repositories.messages.create(NewMessage::new(3, "x")).await.unwrap();

    // A patch carrying `_id` is rejected at the type boundary.
    assert!(serde_json::from_str::<MessagePatch>(r#"{"_id": 42, "message": "y"}"#).is_err());

    let patch: MessagePatch = serde_json::from_str(r#"{"message": "y"}"#).unwrap();
    repositories.messages.update(created.id, patch).await.unwrap();

    assert!(store.find_one(MESSAGES, &Filter::by_id(42)).await.unwrap().is_none());
    assert_eq!(
        repositories.messages.find_by_id(created.id).await.unwrap().unwrap().message,
        "y"
    );
}

#[tokio::test]
async fn test_update_of_missing_message_is_none() {
    let (repositories, store) = memory_repositories_with_store().await;

    let patch = MessagePatch {
        message: Some("ghost".into()),
        ..Default::default()
    };
    assert_eq!(repositories.messages.update(5, patch).await.unwrap(), None);
    assert_eq!(store.count(MESSAGES), 0);
}

#[tokio::test]
async fn test_empty_patch_returns_current_record() {
    let repositories = memory_repositories().await;
    let created = repositories.messages.create(NewMessage::new(3, "x")).await.unwrap();

    let same = repositories
        .messages
        .update(created.id, MessagePatch::default())
        .await
        .unwrap();
    assert_eq!(same, Some(created));
}

#[tokio::test]
async fn test_delete_reports_whether_removed() {
    let repositories = memory_repositories().await;
    let created = repositories.messages.create(NewMessage::new(3, "x")).await.unwrap();

    assert!(repositories.messages.delete(created.id).await.unwrap());
    assert!(!repositories.messages.delete(created.id).await.unwrap());
    assert_eq!(repositories.messages.find_by_id(created.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_deleted_ids_are_not_reused() {
    let repositories = memory_repositories().await;
    let first = repositories.messages.create(NewMessage::new(1, "x")).await.unwrap();
    repositories.messages.delete(first.id).await.unwrap();

    let second = repositories.messages.create(NewMessage::new(1, "y")).await.unwrap();
    assert_eq!(second.id, first.id + 1);
}

#[tokio::test]
async fn test_store_outage_surfaces_as_unavailable() {
    let (repositories, store) = memory_repositories_with_store().await;
    store.set_offline(true);

    let err = repositories.messages.find_all().await.unwrap_err();
    assert!(matches!(err, RepositoryError::StoreUnavailable(_)));

    let err = repositories.messages.create(NewMessage::new(1, "x")).await.unwrap_err();
    assert!(matches!(err, RepositoryError::StoreUnavailable(_)));
}
