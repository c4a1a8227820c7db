//! In-memory document store (process lifetime only).

use activity_types::{ActivityRecord, DocumentStore, DocumentStoreError, IndexSettings};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

struct StoredIndex {
    settings: IndexSettings,
    mapping: serde_json::Value,
    /// document id -> document
    documents: HashMap<String, serde_json::Value>,
}

/// In-memory DocumentStore: indexes must be created before documents are written.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    indexes: Arc<RwLock<HashMap<String, StoredIndex>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with `index` already created with default settings and no mapping.
    pub async fn with_index(index: &str) -> Self {
        let store = Self::new();
        store.indexes.write().await.insert(
            index.to_string(),
            StoredIndex {
                settings: IndexSettings {
                    number_of_shards: 1,
                    number_of_replicas: 1,
                },
                mapping: serde_json::Value::Null,
                documents: HashMap::new(),
            },
        );
        store
    }

    pub async fn document(&self, index: &str, id: &str) -> Option<serde_json::Value> {
        let guard = self.indexes.read().await;
        guard.get(index).and_then(|i| i.documents.get(id).cloned())
    }

    pub async fn document_count(&self, index: &str) -> usize {
        let guard = self.indexes.read().await;
        guard.get(index).map(|i| i.documents.len()).unwrap_or(0)
    }

    pub async fn settings(&self, index: &str) -> Option<IndexSettings> {
        let guard = self.indexes.read().await;
        guard.get(index).map(|i| i.settings)
    }

    pub async fn mapping(&self, index: &str) -> Option<serde_json::Value> {
        let guard = self.indexes.read().await;
        guard.get(index).map(|i| i.mapping.clone())
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn index_exists(&self, index: &str) -> Result<bool, DocumentStoreError> {
        Ok(self.indexes.read().await.contains_key(index))
    }

    async fn create_index(
        &self,
        index: &str,
        settings: &IndexSettings,
        mapping: &serde_json::Value,
    ) -> Result<(), DocumentStoreError> {
        let mut guard = self.indexes.write().await;
        if guard.contains_key(index) {
            return Err(DocumentStoreError::IndexAlreadyExists(index.to_string()));
        }
        guard.insert(
            index.to_string(),
            StoredIndex {
                settings: *settings,
                mapping: mapping.clone(),
                documents: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn populate_index(
        &self,
        index: &str,
        record: &ActivityRecord,
    ) -> Result<(), DocumentStoreError> {
        let doc =
            serde_json::to_value(record).map_err(|e| DocumentStoreError::Other(e.to_string()))?;
        let mut guard = self.indexes.write().await;
        let stored = guard
            .get_mut(index)
            .ok_or_else(|| DocumentStoreError::IndexNotFound(index.to_string()))?;
        stored.documents.insert(record.id().to_string(), doc);
        Ok(())
    }
}
