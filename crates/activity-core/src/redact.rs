//! Attribute redaction: masks sensitive fields and truncates oversized text.

use crate::format::truncate_chars;
use activity_types::{ActivityLoggingConfig, AttributeValue, Attributes};
use std::collections::HashSet;

pub const REDACTED: &str = "[REDACTED]";

pub const TRUNCATED_MARKER: &str = "... [TRUNCATED]";

/// Characters kept from text that exceeds the large-text threshold.
pub const TRUNCATED_KEEP_CHARS: usize = 1_000;

#[derive(Debug, Clone)]
pub struct Redactor {
    sensitive: HashSet<String>,
    large_text_threshold: usize,
}

impl Redactor {
    pub fn new<I, S>(sensitive_fields: I, large_text_threshold: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sensitive: sensitive_fields.into_iter().map(Into::into).collect(),
            large_text_threshold,
        }
    }

    pub fn from_config(config: &ActivityLoggingConfig) -> Self {
        Self::new(
            config.sensitive_fields.iter().cloned(),
            config.large_text_threshold,
        )
    }

    pub fn is_sensitive(&self, field: &str) -> bool {
        self.sensitive.contains(field)
    }

    /// Redacted copy of `attributes`, same key order.
    pub fn redact(&self, attributes: &Attributes) -> Attributes {
        attributes
            .iter()
            .map(|(field, value)| (field.clone(), self.redact_value(field, value)))
            .collect()
    }

    /// Sensitive keys always become the redaction marker, whatever the value's type.
    pub fn redact_value(&self, field: &str, value: &AttributeValue) -> AttributeValue {
        if self.is_sensitive(field) {
            return AttributeValue::Text(REDACTED.to_string());
        }
        match value {
            AttributeValue::Uuid(id) => AttributeValue::Text(id.to_string()),
            AttributeValue::Text(s) if s.chars().count() > self.large_text_threshold => {
                AttributeValue::Text(truncate_chars(s, TRUNCATED_KEEP_CHARS, TRUNCATED_MARKER))
            }
            other => other.clone(),
        }
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::from_config(&ActivityLoggingConfig::default())
    }
}
