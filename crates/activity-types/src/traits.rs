//! Traits for the document store and the delivery queue.

use crate::ActivityRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Index settings sent on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
}

impl From<&crate::IndexConfig> for IndexSettings {
    fn from(cfg: &crate::IndexConfig) -> Self {
        Self {
            number_of_shards: cfg.shards,
            number_of_replicas: cfg.replicas,
        }
    }
}

/// Search/analytics document store holding activity documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool, DocumentStoreError>;

    /// Create an index. Returns `IndexAlreadyExists` if it is already there.
    async fn create_index(
        &self,
        index: &str,
        settings: &IndexSettings,
        mapping: &serde_json::Value,
    ) -> Result<(), DocumentStoreError>;

    /// Index one record, keyed by its id so a redelivery overwrites the same document.
    async fn populate_index(
        &self,
        index: &str,
        record: &ActivityRecord,
    ) -> Result<(), DocumentStoreError>;
}

/// State of a delivery job in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

/// One queued delivery of an activity record to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryJob {
    pub job_id: String,
    pub record_id: String,
    pub queue: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Hands completed records to asynchronous delivery.
///
/// `enqueue` must not block on network I/O: it runs inline with the mutation that raised the event.
#[async_trait]
pub trait ActivityDispatcher: Send + Sync {
    /// Queue a record for delivery; returns the delivery job id.
    fn enqueue(&self, queue: &str, record: ActivityRecord) -> Result<String, DispatchError>;

    /// Current state of a delivery job. `Ok(None)` when the id is unknown.
    async fn job(&self, job_id: &str) -> Result<Option<DeliveryJob>, DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentStoreError {
    #[error("index not found: {0}")]
    IndexNotFound(String),
    #[error("index already exists: {0}")]
    IndexAlreadyExists(String),
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("document store rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("document store error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("delivery queue closed")]
    QueueClosed,
    #[error("dispatch error: {0}")]
    Other(String),
}
