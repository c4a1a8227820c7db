//! Document stores for activity records: in-memory and Elasticsearch, plus the index schema.

#[cfg(feature = "elasticsearch")]
mod elasticsearch;
mod memory;
mod schema;

pub use activity_types::{DocumentStore, DocumentStoreError, IndexSettings};
#[cfg(feature = "elasticsearch")]
pub use elasticsearch::ElasticsearchStore;
pub use memory::InMemoryDocumentStore;
pub use schema::{
    activity_index_mapping, provision_index, ProvisionOutcome, NULL_SENTINEL, TIMESTAMP_FORMATS,
};
