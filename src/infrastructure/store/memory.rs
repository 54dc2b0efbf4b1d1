//! In-memory document store.
//!
//! Everything lives behind one mutex, which makes every call trivially
//! atomic. Good enough for tests and single-process use.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{check_name, Document, DocumentStore, Filter, ID_FIELD};
use crate::shared::error::StoreError;

/// Thread-safe in-memory document store.
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<MemoryState>>,
    offline: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Documents per collection, in insertion order.
    collections: HashMap<String, Vec<Document>>,
    /// Unique fields per collection, `_id` excluded.
    unique_fields: HashMap<String, BTreeSet<String>>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`] until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .collections
            .get(collection)
            .map_or(0, Vec::len)
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

impl MemoryState {
    /// Fail if `candidate` would share `_id` or a unique field with any
    /// document other than the one at `skip`.
    fn check_unique(
        &self,
        collection: &str,
        candidate: &Document,
        skip: Option<usize>,
    ) -> Result<(), StoreError> {
        let Some(documents) = self.collections.get(collection) else {
            return Ok(());
        };

        let unique = self.unique_fields.get(collection);
        let fields = std::iter::once(ID_FIELD).chain(unique.into_iter().flatten().map(String::as_str));

        for field in fields {
            let Some(value) = candidate.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let collides = documents
                .iter()
                .enumerate()
                .any(|(index, existing)| Some(index) != skip && existing.get(field) == Some(value));
            if collides {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Ordering used for sorted finds: missing and null first, then booleans,
/// numbers, strings.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        self.ensure_online()?;
        let state = self.state.lock();

        Ok(state
            .collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|d| filter.matches(d)))
            .cloned())
    }

    async fn find_one_and_increment(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        by: i64,
    ) -> Result<Document, StoreError> {
        self.ensure_online()?;
        let mut state = self.state.lock();
        let documents = state.collections.entry(collection.to_string()).or_default();

        let filter = Filter::by_id(key);
        let index = match documents.iter().position(|d| filter.matches(d)) {
            Some(index) => index,
            None => {
                let mut document = Document::new();
                document.insert(ID_FIELD.to_string(), Value::from(key));
                documents.push(document);
                documents.len() - 1
            }
        };

        let document = &mut documents[index];
        let current = match document.get(field) {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_i64().ok_or_else(|| StoreError::Malformed {
                collection: collection.to_string(),
                reason: format!("{} of {} is not an integer", field, key),
            })?,
        };
        let next = current.checked_add(by).ok_or_else(|| StoreError::Malformed {
            collection: collection.to_string(),
            reason: format!("{} of {} would overflow", field, key),
        })?;
        document.insert(field.to_string(), Value::from(next));

        Ok(document.clone())
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.ensure_online()?;
        if !document.contains_key(ID_FIELD) {
            return Err(StoreError::MissingKey {
                collection: collection.to_string(),
            });
        }

        let mut state = self.state.lock();
        state.check_unique(collection, &document, None)?;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(())
    }

    async fn update_one(&self, collection: &str, filter: &Filter, mut set: Document) -> Result<u64, StoreError> {
        self.ensure_online()?;
        set.remove(ID_FIELD);

        let mut state = self.state.lock();
        let Some(index) = state
            .collections
            .get(collection)
            .and_then(|documents| documents.iter().position(|d| filter.matches(d)))
        else {
            return Ok(0);
        };

        let mut merged = state.collections[collection][index].clone();
        merged.extend(set);
        state.check_unique(collection, &merged, Some(index))?;

        if let Some(documents) = state.collections.get_mut(collection) {
            documents[index] = merged;
        }
        Ok(1)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.ensure_online()?;
        let mut state = self.state.lock();

        let Some(documents) = state.collections.get_mut(collection) else {
            return Ok(0);
        };
        match documents.iter().position(|d| filter.matches(d)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort_ascending: Option<&'static str>,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        self.ensure_online()?;
        let state = self.state.lock();

        let mut found: Vec<Document> = state
            .collections
            .get(collection)
            .map(|documents| documents.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();
        drop(state);

        if let Some(field) = sort_ascending {
            // stable, so ties keep insertion order
            found.sort_by(|a, b| compare_values(a.get(field), b.get(field)));
        }
        found.truncate(limit);
        Ok(found)
    }

    async fn create_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        self.ensure_online()?;
        check_name(collection)?;
        check_name(field)?;

        let mut state = self.state.lock();
        if let Some(documents) = state.collections.get(collection) {
            let mut seen = Vec::new();
            for value in documents.iter().filter_map(|d| d.get(field)).filter(|v| !v.is_null()) {
                if seen.contains(&value) {
                    return Err(StoreError::DuplicateKey {
                        collection: collection.to_string(),
                        field: field.to_string(),
                    });
                }
                seen.push(value);
            }
        }

        if field != ID_FIELD {
            state
                .unique_fields
                .entry(collection.to_string())
                .or_default()
                .insert(field.to_string());
        }
        Ok(())
    }
}
