//! Record assembly: id, timestamp, and composition. No I/O.

use activity_types::{ActivityLoggingConfig, ActivityRecord, EnvironmentInfo, RecordParts};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RecordAssembler {
    environment: String,
    application_version: String,
}

impl RecordAssembler {
    pub fn new(environment: impl Into<String>, application_version: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            application_version: application_version.into(),
        }
    }

    pub fn from_config(config: &ActivityLoggingConfig) -> Self {
        Self::new(&config.environment, &config.application_version)
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn environment_info(&self, transaction_id: Option<String>) -> EnvironmentInfo {
        EnvironmentInfo {
            environment: self.environment.clone(),
            application_version: self.application_version.clone(),
            database_transaction_id: transaction_id,
            logger_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// New record with a fresh v4 id, stamped with `captured_at` (RFC 3339, UTC, millis).
    pub fn assemble(&self, parts: RecordParts, captured_at: DateTime<Utc>) -> ActivityRecord {
        ActivityRecord::new(
            Uuid::new_v4().to_string(),
            captured_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            parts,
        )
    }
}
