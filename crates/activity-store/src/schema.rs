//! Activity index mapping and idempotent index provisioning.

use activity_types::{DocumentStore, DocumentStoreError, IndexConfig, IndexSettings};
use serde_json::json;

/// Stored in place of an absent field-change `before`/`after`.
pub const NULL_SENTINEL: &str = "NULL";

pub const TIMESTAMP_FORMATS: &str = "strict_date_time||strict_date_time_no_millis||epoch_millis";

fn keyword() -> serde_json::Value {
    json!({ "type": "keyword" })
}

fn text_with_keyword() -> serde_json::Value {
    json!({
        "type": "text",
        "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
    })
}

/// Field mapping for activity documents.
pub fn activity_index_mapping() -> serde_json::Value {
    json!({
        "properties": {
            "id": keyword(),
            "model": keyword(),
            "model_id": keyword(),
            "event": keyword(),
            "attributes": { "type": "object", "enabled": true, "dynamic": true },
            "changes": {
                "type": "object",
                "enabled": true,
                "dynamic": true,
                "properties": {
                    "field": keyword(),
                    "before": { "type": "keyword", "null_value": NULL_SENTINEL },
                    "after": { "type": "keyword", "null_value": NULL_SENTINEL }
                }
            },
            "user": {
                "type": "object",
                "properties": {
                    "id": keyword(),
                    "type": keyword(),
                    "company": text_with_keyword(),
                    "contact": keyword(),
                    "nickname": keyword(),
                    "level": keyword(),
                    "department": keyword(),
                    "shift": keyword()
                }
            },
            "context": {
                "type": "object",
                "properties": {
                    "ip": { "type": "ip" },
                    "user_agent": {
                        "type": "text",
                        "fields": { "keyword": { "type": "keyword" } }
                    },
                    "request_id": keyword(),
                    "session_id": keyword(),
                    "route": keyword(),
                    "method": keyword(),
                    "url": keyword(),
                    "referrer": keyword(),
                    "source": keyword(),
                    "command": keyword()
                }
            },
            "metadata": {
                "type": "object",
                "properties": {
                    "environment": keyword(),
                    "application_version": keyword(),
                    "database_transaction_id": keyword(),
                    "logger_version": keyword()
                }
            },
            "tags": keyword(),
            "timestamp": { "type": "date", "format": TIMESTAMP_FORMATS }
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created,
    AlreadyExists,
}

/// Create the activity index unless it exists. An existing index is not an error.
pub async fn provision_index(
    store: &dyn DocumentStore,
    index: &IndexConfig,
) -> Result<ProvisionOutcome, DocumentStoreError> {
    if store.index_exists(&index.name).await? {
        tracing::info!(index = %index.name, "activity index already exists");
        return Ok(ProvisionOutcome::AlreadyExists);
    }
    let settings = IndexSettings::from(index);
    match store
        .create_index(&index.name, &settings, &activity_index_mapping())
        .await
    {
        Ok(()) => {
            tracing::info!(
                index = %index.name,
                shards = settings.number_of_shards,
                replicas = settings.number_of_replicas,
                "activity index created"
            );
            Ok(ProvisionOutcome::Created)
        }
        // Lost a race with another provisioner.
        Err(DocumentStoreError::IndexAlreadyExists(_)) => {
            tracing::info!(index = %index.name, "activity index already exists");
            Ok(ProvisionOutcome::AlreadyExists)
        }
        Err(e) => Err(e),
    }
}
