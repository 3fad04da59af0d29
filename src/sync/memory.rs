use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{Collection, RemoteStore};
use crate::error::{SyncError, SyncResult};

/// A write that reached the store, recorded in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Create { collection: Collection, id: String },
    Update { collection: Collection, id: String, paths: Vec<String> },
    Delete { collection: Collection, id: String },
}

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<(Collection, String), Value>,
    writes: Vec<Write>,
    fail_reads: bool,
    fail_writes: bool,
    fail_deletes: bool,
}

/// Process-local document store for tests and offline use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a document without recording a write.
    pub fn insert(&self, collection: Collection, id: &str, document: Value) {
        self.lock()
            .documents
            .insert((collection, id.to_string()), document);
    }

    pub fn document(&self, collection: Collection, id: &str) -> Option<Value> {
        self.lock()
            .documents
            .get(&(collection, id.to_string()))
            .cloned()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Make every fetch fail until switched off.
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Make every create, update and delete fail until switched off.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make only deletes fail until switched off.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.lock().fail_deletes = fail;
    }
}

fn injected() -> SyncError {
    SyncError::Transport("memory store is set to fail".to_string())
}

/// Set `path` (dot separated) inside `document`, creating objects on the way.
fn set_path(document: &mut Value, path: &str, value: Value) {
    if !document.is_object() {
        *document = Value::Object(Map::new());
    }
    let Value::Object(map) = document else {
        return;
    };
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            set_path(child, rest, value);
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn fetch(&self, collection: Collection, id: &str) -> SyncResult<Option<Value>> {
        let inner = self.lock();
        if inner.fail_reads {
            return Err(injected());
        }
        Ok(inner.documents.get(&(collection, id.to_string())).cloned())
    }

    async fn create(&self, collection: Collection, id: &str, document: &Value) -> SyncResult<()> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(injected());
        }
        inner
            .documents
            .insert((collection, id.to_string()), document.clone());
        inner.writes.push(Write::Create {
            collection,
            id: id.to_string(),
        });
        Ok(())
    }

    async fn replace_fields(
        &self,
        collection: Collection,
        id: &str,
        fields: &[(&str, Value)],
    ) -> SyncResult<()> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(injected());
        }
        let document = inner
            .documents
            .get_mut(&(collection, id.to_string()))
            .ok_or_else(|| SyncError::MissingDocument {
                collection,
                id: id.to_string(),
            })?;
        for (path, value) in fields {
            set_path(document, path, value.clone());
        }
        inner.writes.push(Write::Update {
            collection,
            id: id.to_string(),
            paths: fields.iter().map(|(p, _)| p.to_string()).collect(),
        });
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> SyncResult<()> {
        let mut inner = self.lock();
        if inner.fail_writes || inner.fail_deletes {
            return Err(injected());
        }
        inner.documents.remove(&(collection, id.to_string()));
        inner.writes.push(Write::Delete {
            collection,
            id: id.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_paths_replace_nested_values() {
        let mut doc = json!({ "preferences": { "language": "en", "theme": "dark" } });
        set_path(&mut doc, "preferences.language", json!("tr"));
        set_path(&mut doc, "tasks", json!([1, 2]));
        set_path(&mut doc, "budget.settings.currency", json!("EUR"));
        assert_eq!(
            doc,
            json!({
                "preferences": { "language": "tr", "theme": "dark" },
                "tasks": [1, 2],
                "budget": { "settings": { "currency": "EUR" } }
            })
        );
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let store = MemoryStore::new();
        let err = store
            .replace_field(Collection::UserData, "nobody", "tasks", json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingDocument { .. }));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn writes_are_recorded_in_order() {
        let store = MemoryStore::new();
        store
            .create(Collection::UserData, "u", &json!({ "tasks": [] }))
            .await
            .unwrap();
        store
            .replace_field(Collection::UserData, "u", "tasks", json!([{ "id": "a" }]))
            .await
            .unwrap();
        store.delete(Collection::UserData, "u").await.unwrap();
        store.delete(Collection::UserData, "u").await.unwrap();

        let writes = store.writes();
        assert_eq!(writes.len(), 4);
        assert!(matches!(writes[0], Write::Create { .. }));
        assert!(matches!(
            &writes[1],
            Write::Update { paths, .. } if paths == &["tasks".to_string()]
        ));
        assert!(store.document(Collection::UserData, "u").is_none());
    }
}
