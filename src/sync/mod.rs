pub mod http;
pub mod keyring;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::config::StoreBackend;
use crate::core::date::Clock;
use crate::core::document::Field;
use crate::core::principal::Principal;
use crate::error::{LoadError, SyncError, SyncResult};
use crate::store::UserDataStore;
use crate::store::migrate;

/// Where a user document lives on the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// Current schema, one document per principal.
    UserData,
    /// Pre-migration schema. Documents are deleted once migrated.
    LegacyUsers,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserData => "user_data",
            Self::LegacyUsers => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A JSON document store addressed by collection and principal id.
///
/// Writes are whole-field overwrites: last writer wins, nothing is merged.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// `Ok(None)` when the document does not exist.
    async fn fetch(&self, collection: Collection, id: &str) -> SyncResult<Option<Value>>;

    async fn create(&self, collection: Collection, id: &str, document: &Value) -> SyncResult<()>;

    /// Overwrite each `(dotted path, value)` of an existing document in one update.
    async fn replace_fields(
        &self,
        collection: Collection,
        id: &str,
        fields: &[(&str, Value)],
    ) -> SyncResult<()>;

    /// Deleting a missing document is not an error.
    async fn delete(&self, collection: Collection, id: &str) -> SyncResult<()>;

    async fn replace_field(
        &self,
        collection: Collection,
        id: &str,
        path: &str,
        value: Value,
    ) -> SyncResult<()> {
        self.replace_fields(collection, id, &[(path, value)]).await
    }
}

/// Loads user documents and writes changed fields back.
#[derive(Clone)]
pub struct RemoteSync {
    store: Arc<dyn RemoteStore>,
}

impl RemoteSync {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    /// Open the configured backend. An HTTP store picks up its access token
    /// from the keyring; without one, requests go out unauthenticated.
    pub async fn connect(backend: &StoreBackend) -> SyncResult<Self> {
        let store: Arc<dyn RemoteStore> = match backend {
            StoreBackend::Memory => {
                log::info!("Using in-memory document store");
                Arc::new(memory::MemoryStore::new())
            }
            StoreBackend::Http { base_url } => {
                let token = match keyring::load_token(base_url).await {
                    Ok(token) => token,
                    Err(e) => {
                        log::warn!("No access token for {}: {}", base_url, e);
                        None
                    }
                };
                if token.is_none() {
                    log::info!("Connecting to {} without a token", base_url);
                }
                Arc::new(http::HttpDocumentStore::new(base_url, token)?)
            }
        };
        Ok(Self::new(store))
    }

    /// Current document, else a migrated legacy one, else a fresh default.
    ///
    /// Calling this again after it succeeded reads the current document and
    /// writes nothing.
    pub async fn load_or_migrate(
        &self,
        principal: &Principal,
        clock: Clock,
    ) -> Result<UserDataStore, LoadError> {
        let id = principal.id.as_str();

        if let Some(raw) = self
            .store
            .fetch(Collection::UserData, id)
            .await
            .map_err(LoadError::Fetch)?
        {
            log::debug!("Loaded {}/{}", Collection::UserData, id);
            let doc = migrate::normalize(raw, &clock).map_err(LoadError::Corrupt)?;
            return Ok(UserDataStore::new(id, doc, clock));
        }

        if let Some(legacy) = self
            .store
            .fetch(Collection::LegacyUsers, id)
            .await
            .map_err(LoadError::Fetch)?
        {
            let doc = migrate::migrate_legacy(&legacy, principal, &clock)?;
            let value =
                serde_json::to_value(&doc).map_err(|e| LoadError::Migration(e.to_string()))?;
            self.store
                .create(Collection::UserData, id, &value)
                .await
                .map_err(|e| LoadError::Migration(e.to_string()))?;
            // A leftover legacy copy is shadowed by the current document.
            let deleted = self.store.delete(Collection::LegacyUsers, id).await;
            if let Err(e) = deleted {
                log::warn!("Could not remove legacy document for {}: {}", id, e);
            }
            log::info!(
                "Migrated legacy document for {} ({} tasks, {} projects)",
                id,
                doc.tasks.len(),
                doc.projects.len()
            );
            return Ok(UserDataStore::new(id, doc, clock));
        }

        let doc = migrate::default_document(principal, &clock);
        let value = serde_json::to_value(&doc)
            .map_err(|e| LoadError::Create(SyncError::Encoding(e)))?;
        self.store
            .create(Collection::UserData, id, &value)
            .await
            .map_err(LoadError::Create)?;
        log::info!("Created default document for {}", id);
        Ok(UserDataStore::new(id, doc, clock))
    }

    /// Write every field changed since the last persist in a single update.
    ///
    /// The dirty set is drained whether or not the write succeeds; local state
    /// is never rolled back. Returns the number of fields written.
    pub async fn persist(&self, store: &mut UserDataStore) -> SyncResult<usize> {
        let fields = minimal_fields(store.take_dirty());
        if fields.is_empty() {
            return Ok(0);
        }

        let mut updates = Vec::with_capacity(fields.len());
        for field in &fields {
            updates.push((field.path(), store.document().field_value(*field)?));
        }

        let id = store.principal_id().to_string();
        match self
            .store
            .replace_fields(Collection::UserData, &id, &updates)
            .await
        {
            Ok(()) => {
                log::debug!(
                    "Persisted {} for {}",
                    fields.iter().map(Field::path).collect::<Vec<_>>().join(", "),
                    id
                );
                Ok(fields.len())
            }
            Err(e) => {
                log::warn!("Persist of {} field(s) for {} failed: {}", fields.len(), id, e);
                Err(e)
            }
        }
    }

    /// Remove the principal's current document.
    pub async fn delete_document(&self, principal_id: &str) -> SyncResult<()> {
        self.store.delete(Collection::UserData, principal_id).await?;
        log::info!("Deleted {}/{}", Collection::UserData, principal_id);
        Ok(())
    }
}

/// Drop fields already written as part of a wider one.
fn minimal_fields(dirty: BTreeSet<Field>) -> Vec<Field> {
    dirty
        .iter()
        .copied()
        .filter(|f| !dirty.iter().any(|other| other != f && other.covers(*f)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::memory::{MemoryStore, Write};
    use super::*;
    use crate::core::locale::Locale;
    use crate::core::profile::PreferencesPatch;
    use crate::core::task::NewTask;
    use chrono::NaiveDate;
    use serde_json::json;

    fn clock() -> Clock {
        Clock::fixed_on(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
    }

    fn ada() -> Principal {
        Principal::new("uid-1", "ada@example.com")
    }

    fn sync_with(store: &Arc<MemoryStore>) -> RemoteSync {
        RemoteSync::new(store.clone())
    }

    #[tokio::test]
    async fn first_load_creates_default_document() {
        let memory = Arc::new(MemoryStore::new());
        let sync = sync_with(&memory);

        let store = sync.load_or_migrate(&ada(), clock()).await.unwrap();
        assert_eq!(store.profile().name, "ada");
        assert!(memory.document(Collection::UserData, "uid-1").is_some());

        memory.clear_writes();
        let again = sync.load_or_migrate(&ada(), clock()).await.unwrap();
        assert_eq!(again.profile().name, "ada");
        assert!(memory.writes().is_empty());
    }

    #[tokio::test]
    async fn legacy_document_is_migrated_once() {
        let memory = Arc::new(MemoryStore::new());
        memory.insert(
            Collection::LegacyUsers,
            "uid-1",
            json!({
                "userInfo": { "username": "ada_l", "email": "ada@example.com" },
                "tasks": [{ "id": "t1", "title": "Old task" }]
            }),
        );
        let sync = sync_with(&memory);

        let store = sync.load_or_migrate(&ada(), clock()).await.unwrap();
        assert_eq!(store.tasks()[0].id, "t1");
        assert!(memory.document(Collection::LegacyUsers, "uid-1").is_none());
        assert!(memory.document(Collection::UserData, "uid-1").is_some());

        memory.clear_writes();
        let again = sync.load_or_migrate(&ada(), clock()).await.unwrap();
        assert_eq!(again.document(), store.document());
        assert!(memory.writes().is_empty());
    }

    #[tokio::test]
    async fn failed_migration_write_blocks_load() {
        let memory = Arc::new(MemoryStore::new());
        memory.insert(Collection::LegacyUsers, "uid-1", json!({ "tasks": [] }));
        memory.set_fail_writes(true);
        let sync = sync_with(&memory);

        let err = sync.load_or_migrate(&ada(), clock()).await.unwrap_err();
        assert!(matches!(err, LoadError::Migration(_)));
        assert!(memory.document(Collection::LegacyUsers, "uid-1").is_some());
        assert!(memory.document(Collection::UserData, "uid-1").is_none());
    }

    #[tokio::test]
    async fn failed_legacy_delete_still_loads() {
        let memory = Arc::new(MemoryStore::new());
        memory.insert(
            Collection::LegacyUsers,
            "uid-1",
            json!({ "tasks": [{ "id": "t1", "title": "Old task" }] }),
        );
        memory.set_fail_deletes(true);
        let sync = sync_with(&memory);

        let store = sync.load_or_migrate(&ada(), clock()).await.unwrap();
        assert_eq!(store.tasks()[0].id, "t1");
        assert!(memory.document(Collection::UserData, "uid-1").is_some());
        assert!(memory.document(Collection::LegacyUsers, "uid-1").is_some());

        memory.set_fail_deletes(false);
        memory.clear_writes();
        let again = sync.load_or_migrate(&ada(), clock()).await.unwrap();
        assert_eq!(again.tasks()[0].id, "t1");
        assert!(memory.writes().is_empty());
    }

    #[tokio::test]
    async fn failed_read_is_reported() {
        let memory = Arc::new(MemoryStore::new());
        memory.set_fail_reads(true);
        let err = sync_with(&memory).load_or_migrate(&ada(), clock()).await.unwrap_err();
        assert!(matches!(err, LoadError::Fetch(_)));
    }

    #[tokio::test]
    async fn malformed_current_document() {
        let memory = Arc::new(MemoryStore::new());
        memory.insert(
            Collection::UserData,
            "uid-1",
            json!({ "profile": {}, "budget": { "periods": "weekly" } }),
        );
        let err = sync_with(&memory).load_or_migrate(&ada(), clock()).await.unwrap_err();
        assert!(matches!(err, LoadError::Corrupt(_)));
    }

    #[tokio::test]
    async fn persist_writes_each_dirty_field_once() {
        let memory = Arc::new(MemoryStore::new());
        let sync = sync_with(&memory);
        let mut store = sync.load_or_migrate(&ada(), clock()).await.unwrap();
        memory.clear_writes();

        store.create_task(NewTask::titled("One")).unwrap();
        store.create_task(NewTask::titled("Two")).unwrap();
        store.set_language(Locale::De);
        store
            .update_preferences(PreferencesPatch {
                time_zone: Some("Europe/Berlin".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(sync.persist(&mut store).await.unwrap(), 2);
        assert_eq!(
            memory.writes(),
            vec![Write::Update {
                collection: Collection::UserData,
                id: "uid-1".into(),
                paths: vec!["preferences".into(), "tasks".into()],
            }]
        );
        let remote = memory.document(Collection::UserData, "uid-1").unwrap();
        assert_eq!(remote["tasks"].as_array().unwrap().len(), 2);
        assert_eq!(remote["preferences"]["language"], "de");

        assert_eq!(sync.persist(&mut store).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_persist_keeps_local_state() {
        let memory = Arc::new(MemoryStore::new());
        let sync = sync_with(&memory);
        let mut store = sync.load_or_migrate(&ada(), clock()).await.unwrap();

        memory.set_fail_writes(true);
        store.create_task(NewTask::titled("Offline")).unwrap();
        assert!(sync.persist(&mut store).await.is_err());
        assert_eq!(store.tasks().len(), 1);
        assert!(!store.is_dirty());

        let remote = memory.document(Collection::UserData, "uid-1").unwrap();
        assert_eq!(remote["tasks"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn language_alone_is_written_alone() {
        let fields = minimal_fields(BTreeSet::from([Field::PreferredLanguage, Field::ActivityLog]));
        assert_eq!(fields, vec![Field::PreferredLanguage, Field::ActivityLog]);
    }
}
