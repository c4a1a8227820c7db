//! HTTP client for an Elasticsearch-compatible document store.

use activity_types::{ActivityRecord, DocumentStore, DocumentStoreError, IndexSettings};
use reqwest::{Method, RequestBuilder, StatusCode};

const ALREADY_EXISTS: &str = "resource_already_exists_exception";
const INDEX_NOT_FOUND: &str = "index_not_found_exception";

/// DocumentStore backed by the Elasticsearch REST API.
pub struct ElasticsearchStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ElasticsearchStore {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_env() -> Self {
        let url = std::env::var("ELASTICSEARCH_URL")
            .unwrap_or_else(|_| "http://localhost:9200".to_string());
        let api_key = std::env::var("ELASTICSEARCH_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        Self::new(url, api_key)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self
            .client
            .request(method, format!("{}/{}", self.base_url, path));
        match self.api_key {
            Some(ref key) => req.header("Authorization", format!("ApiKey {}", key)),
            None => req,
        }
    }

    async fn send(req: RequestBuilder) -> Result<(StatusCode, String), DocumentStoreError> {
        let res = req
            .send()
            .await
            .map_err(|e| DocumentStoreError::Unavailable(e.to_string()))?;
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| DocumentStoreError::Unavailable(e.to_string()))?;
        Ok((status, body))
    }
}

fn rejected(status: StatusCode, body: String) -> DocumentStoreError {
    DocumentStoreError::Rejected {
        status: status.as_u16(),
        body,
    }
}

#[async_trait::async_trait]
impl DocumentStore for ElasticsearchStore {
    async fn index_exists(&self, index: &str) -> Result<bool, DocumentStoreError> {
        let (status, body) = Self::send(self.request(Method::HEAD, index)).await?;
        match status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(rejected(s, body)),
        }
    }

    async fn create_index(
        &self,
        index: &str,
        settings: &IndexSettings,
        mapping: &serde_json::Value,
    ) -> Result<(), DocumentStoreError> {
        let body = serde_json::json!({
            "settings": settings,
            "mappings": mapping,
        });
        let (status, body) = Self::send(self.request(Method::PUT, index).json(&body)).await?;
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::BAD_REQUEST && body.contains(ALREADY_EXISTS) {
            return Err(DocumentStoreError::IndexAlreadyExists(index.to_string()));
        }
        Err(rejected(status, body))
    }

    async fn populate_index(
        &self,
        index: &str,
        record: &ActivityRecord,
    ) -> Result<(), DocumentStoreError> {
        let path = format!("{}/_doc/{}", index, record.id());
        let (status, body) = Self::send(self.request(Method::PUT, &path).json(record)).await?;
        if status.is_success() {
            tracing::debug!(index, record_id = %record.id(), "activity document indexed");
            return Ok(());
        }
        if status == StatusCode::NOT_FOUND && body.contains(INDEX_NOT_FOUND) {
            return Err(DocumentStoreError::IndexNotFound(index.to_string()));
        }
        Err(rejected(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use activity_core::{
        ActivityContext, Attributes, ConsoleContext, EventKind, RecordAssembler, RecordParts,
    };
    use std::collections::BTreeSet;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record() -> ActivityRecord {
        let assembler = RecordAssembler::new("testing", "1.0.0");
        assembler.assemble(
            RecordParts {
                model: "Post".to_string(),
                model_id: "42".to_string(),
                event: EventKind::Deleted,
                user: None,
                attributes: Attributes::new(),
                changes: Vec::new(),
                context: ActivityContext::Console(ConsoleContext::new("prune")),
                metadata: assembler.environment_info(None),
                tags: BTreeSet::new(),
            },
            chrono::Utc::now(),
        )
    }

    #[tokio::test]
    async fn index_exists_maps_head_status() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/activity-logs"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = ElasticsearchStore::new(server.uri(), None);
        assert!(store.index_exists("activity-logs").await.unwrap());
        assert!(!store.index_exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn create_index_sends_settings_and_detects_existing() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/acts"))
            .and(body_partial_json(serde_json::json!({
                "settings": { "number_of_shards": 1, "number_of_replicas": 2 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "acknowledged": true
            })))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/acts"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "type": "resource_already_exists_exception" },
                "status": 400
            })))
            .mount(&server)
            .await;

        let store = ElasticsearchStore::new(server.uri(), None);
        let settings = IndexSettings {
            number_of_shards: 1,
            number_of_replicas: 2,
        };
        let mapping = crate::activity_index_mapping();
        store.create_index("acts", &settings, &mapping).await.unwrap();
        let err = store
            .create_index("acts", &settings, &mapping)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::IndexAlreadyExists(_)));
    }

    #[tokio::test]
    async fn populate_puts_document_under_record_id() {
        let server = MockServer::start().await;
        let rec = record();
        Mock::given(method("PUT"))
            .and(path(format!("/activity-logs/_doc/{}", rec.id())))
            .and(header("Authorization", "ApiKey k1"))
            .and(body_partial_json(serde_json::json!({
                "model": "Post",
                "model_id": "42",
                "event": "deleted"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let store = ElasticsearchStore::new(format!("{}/", server.uri()), Some("k1".to_string()));
        store.populate_index("activity-logs", &rec).await.unwrap();
    }

    #[tokio::test]
    async fn populate_reports_missing_index_and_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex_for("gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"error":{"type":"index_not_found_exception"},"status":404}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex_for("busy"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let store = ElasticsearchStore::new(server.uri(), None);
        let rec = record();
        assert!(matches!(
            store.populate_index("gone", &rec).await.unwrap_err(),
            DocumentStoreError::IndexNotFound(_)
        ));
        assert!(matches!(
            store.populate_index("busy", &rec).await.unwrap_err(),
            DocumentStoreError::Rejected { status: 503, .. }
        ));
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        let store = ElasticsearchStore::new("http://127.0.0.1:1", None);
        assert!(matches!(
            store.index_exists("activity-logs").await.unwrap_err(),
            DocumentStoreError::Unavailable(_)
        ));
    }

    fn path_regex_for(index: &str) -> wiremock::matchers::PathRegexMatcher {
        wiremock::matchers::path_regex(format!("^/{}/_doc/.+$", index))
    }
}
