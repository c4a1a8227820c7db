//! Pipeline configuration, passed explicitly at construction time.

use serde::{Deserialize, Serialize};

/// Default sensitive-field names; values under these keys never appear in plaintext.
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "password_confirmation",
    "remember_token",
    "api_token",
    "secret",
    "private_key",
    "credit_card_number",
    "ssn",
    "social_security_number",
];

pub const DEFAULT_IGNORE_FIELDS: &[&str] = &[
    "updated_at",
    "created_at",
    "user_ip",
    "password",
    "remember_token",
];

pub const DEFAULT_MODELS: &[&str] = &["Post", "Comment"];

/// Target index for activity documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_name")]
    pub name: String,
    #[serde(default = "default_one")]
    pub shards: u32,
    #[serde(default = "default_one")]
    pub replicas: u32,
}

fn default_index_name() -> String {
    "activity-logs".to_string()
}

fn default_one() -> u32 {
    1
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
            shards: default_one(),
            replicas: default_one(),
        }
    }
}

/// Activity logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Queue name delivery jobs are tagged with.
    #[serde(default = "default_queue")]
    pub queue: String,
    /// Whether events raised from console processes are recorded.
    #[serde(default)]
    pub log_console_events: bool,
    /// Observed entity types; events on other types are skipped.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default = "default_sensitive_fields")]
    pub sensitive_fields: Vec<String>,
    #[serde(default = "default_ignore_fields")]
    pub ignore_fields: Vec<String>,
    /// Text longer than this (in characters) is truncated during redaction.
    #[serde(default = "default_large_text_threshold")]
    pub large_text_threshold: usize,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_application_version")]
    pub application_version: String,
}

fn default_true() -> bool {
    true
}

fn default_queue() -> String {
    "default".to_string()
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_models() -> Vec<String> {
    to_strings(DEFAULT_MODELS)
}

fn default_sensitive_fields() -> Vec<String> {
    to_strings(DEFAULT_SENSITIVE_FIELDS)
}

fn default_ignore_fields() -> Vec<String> {
    to_strings(DEFAULT_IGNORE_FIELDS)
}

fn default_large_text_threshold() -> usize {
    10_000
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_application_version() -> String {
    "1.0.0".to_string()
}

impl Default for ActivityLoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue: default_queue(),
            log_console_events: false,
            models: default_models(),
            index: IndexConfig::default(),
            sensitive_fields: default_sensitive_fields(),
            ignore_fields: default_ignore_fields(),
            large_text_threshold: default_large_text_threshold(),
            environment: default_environment(),
            application_version: default_application_version(),
        }
    }
}

impl ActivityLoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a variable lookup. Unset variables keep defaults; unparseable ones fall back
    /// to defaults (lists fall back to empty) with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            enabled: env_bool(&lookup, "ACTIVITY_LOGGING_ENABLED", d.enabled),
            queue: lookup("ACTIVITY_LOGGING_QUEUE")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(d.queue),
            log_console_events: env_bool(
                &lookup,
                "ACTIVITY_LOG_CONSOLE_EVENTS",
                d.log_console_events,
            ),
            models: env_list(&lookup, "ACTIVITY_LOGGING_MODELS").unwrap_or(d.models),
            index: IndexConfig {
                name: lookup("ACTIVITY_LOGGING_INDEX")
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(d.index.name),
                shards: env_parse(&lookup, "ACTIVITY_LOGGING_SHARDS", d.index.shards),
                replicas: env_parse(&lookup, "ACTIVITY_LOGGING_REPLICAS", d.index.replicas),
            },
            sensitive_fields: env_list(&lookup, "ACTIVITY_LOGGING_SENSITIVE_FIELDS")
                .unwrap_or(d.sensitive_fields),
            ignore_fields: env_list(&lookup, "ACTIVITY_LOGGING_IGNORE_FIELDS")
                .unwrap_or(d.ignore_fields),
            large_text_threshold: env_parse(
                &lookup,
                "ACTIVITY_LOGGING_LARGE_TEXT_THRESHOLD",
                d.large_text_threshold,
            ),
            environment: lookup("APP_ENV")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(d.environment),
            application_version: lookup("APP_VERSION")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(d.application_version),
        }
    }

    /// Whether events on this entity type are observed.
    pub fn observes(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }
}

/// Retry policy for the delivery worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOptions {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry; doubled on each further attempt.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Settled (done or failed) jobs kept for status lookups; older ones are forgotten.
    #[serde(default = "default_retain_jobs")]
    pub retain_jobs: usize,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    200
}

fn default_retain_jobs() -> usize {
    1000
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            retain_jobs: default_retain_jobs(),
        }
    }
}

impl DeliveryOptions {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            max_attempts: env_parse(&lookup, "ACTIVITY_DELIVERY_MAX_ATTEMPTS", d.max_attempts)
                .max(1),
            backoff_ms: env_parse(&lookup, "ACTIVITY_DELIVERY_BACKOFF_MS", d.backoff_ms),
            retain_jobs: env_parse(&lookup, "ACTIVITY_DELIVERY_RETAIN_JOBS", d.retain_jobs),
        }
    }

    /// Delay before retry number `attempt` (1-based attempt that just failed).
    pub fn backoff_for(&self, attempt: u32) -> std::time::Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        std::time::Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

fn env_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        "" => default,
        other => {
            tracing::warn!(key, value = other, "invalid boolean, using default");
            default
        }
    }
}

fn env_parse<T: std::str::FromStr + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) if raw.trim().is_empty() => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "invalid number, using default");
            default
        }),
    }
}

/// `None` when unset; otherwise the parsed list (empty when malformed).
fn env_list(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Vec<String>> {
    let raw = lookup(key)?;
    Some(parse_list(key, &raw))
}

/// Parse a comma-separated or JSON-array field list.
pub fn parse_list(key: &str, raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        return match serde_json::from_str::<Vec<String>>(raw) {
            Ok(items) => items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(e) => {
                tracing::warn!(key, error = %e, "malformed field list, treating as empty");
                Vec::new()
            }
        };
    }
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let cfg = ActivityLoggingConfig::from_lookup(|_| None);
        assert_eq!(cfg, ActivityLoggingConfig::default());
        assert!(cfg.sensitive_fields.iter().any(|f| f == "ssn"));
        assert_eq!(cfg.index.name, "activity-logs");
    }

    #[test]
    fn env_overrides_are_applied() {
        let cfg = ActivityLoggingConfig::from_lookup(lookup_from(&[
            ("ACTIVITY_LOGGING_ENABLED", "false"),
            ("ACTIVITY_LOGGING_QUEUE", "audit"),
            ("ACTIVITY_LOG_CONSOLE_EVENTS", "1"),
            ("ACTIVITY_LOGGING_MODELS", "Post, Invoice"),
            ("ACTIVITY_LOGGING_SHARDS", "3"),
            ("ACTIVITY_LOGGING_SENSITIVE_FIELDS", r#"["pin","secret"]"#),
            ("APP_ENV", "staging"),
        ]));
        assert!(!cfg.enabled);
        assert_eq!(cfg.queue, "audit");
        assert!(cfg.log_console_events);
        assert_eq!(cfg.models, vec!["Post", "Invoice"]);
        assert!(cfg.observes("Invoice"));
        assert!(!cfg.observes("Comment"));
        assert_eq!(cfg.index.shards, 3);
        assert_eq!(cfg.index.replicas, 1);
        assert_eq!(cfg.sensitive_fields, vec!["pin", "secret"]);
        assert_eq!(cfg.environment, "staging");
    }

    #[test]
    fn malformed_values_fall_back() {
        let cfg = ActivityLoggingConfig::from_lookup(lookup_from(&[
            ("ACTIVITY_LOGGING_ENABLED", "maybe"),
            ("ACTIVITY_LOGGING_REPLICAS", "two"),
            ("ACTIVITY_LOGGING_IGNORE_FIELDS", "[\"updated_at\","),
        ]));
        assert!(cfg.enabled);
        assert_eq!(cfg.index.replicas, 1);
        assert!(cfg.ignore_fields.is_empty());
    }

    #[test]
    fn deserializes_with_partial_document() {
        let cfg: ActivityLoggingConfig =
            serde_json::from_str(r#"{ "queue": "audit", "index": { "name": "acts" } }"#).unwrap();
        assert_eq!(cfg.queue, "audit");
        assert_eq!(cfg.index.name, "acts");
        assert_eq!(cfg.index.shards, 1);
        assert!(cfg.enabled);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let opts = DeliveryOptions {
            max_attempts: 4,
            backoff_ms: 100,
            ..Default::default()
        };
        assert_eq!(opts.backoff_for(1).as_millis(), 100);
        assert_eq!(opts.backoff_for(2).as_millis(), 200);
        assert_eq!(opts.backoff_for(3).as_millis(), 400);
    }

    #[test]
    fn job_retention_reads_env() {
        assert_eq!(DeliveryOptions::from_lookup(|_| None).retain_jobs, 1000);
        let opts =
            DeliveryOptions::from_lookup(lookup_from(&[("ACTIVITY_DELIVERY_RETAIN_JOBS", "50")]));
        assert_eq!(opts.retain_jobs, 50);
    }
}
