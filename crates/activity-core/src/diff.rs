//! Field-level change lists per lifecycle event.

use crate::format::format_value;
use crate::redact::Redactor;
use activity_types::{ActivityLoggingConfig, AttributeValue, EventKind, FieldChange, LifecycleEvent};
use std::collections::HashSet;

/// Substrings that exclude a field from change lists even when not configured (case-sensitive).
const ALWAYS_IGNORED_SUBSTRINGS: &[&str] = &["password", "token"];

#[derive(Debug, Clone)]
pub struct DiffBuilder {
    ignore: HashSet<String>,
    redactor: Redactor,
}

impl DiffBuilder {
    pub fn new<I, S>(ignore_fields: I, redactor: Redactor) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignore: ignore_fields.into_iter().map(Into::into).collect(),
            redactor,
        }
    }

    pub fn from_config(config: &ActivityLoggingConfig) -> Self {
        Self::new(config.ignore_fields.iter().cloned(), Redactor::from_config(config))
    }

    pub fn is_ignored(&self, field: &str) -> bool {
        self.ignore.contains(field)
            || ALWAYS_IGNORED_SUBSTRINGS
                .iter()
                .any(|needle| field.contains(needle))
    }

    /// Ordered change list for `event`, following the source collection's key order.
    ///
    /// `Updated` walks only `event.changes`; `Restored` yields nothing.
    pub fn build_changes(&self, event: &LifecycleEvent) -> Vec<FieldChange> {
        match event.kind {
            EventKind::Created => self
                .redactor
                .redact(&event.attributes)
                .into_iter()
                .filter(|(field, _)| !self.is_ignored(field))
                .map(|(field, value)| FieldChange {
                    before: None,
                    after: format_value(&value),
                    field,
                })
                .collect(),
            EventKind::Deleted => self
                .redactor
                .redact(&event.original)
                .into_iter()
                .filter(|(field, _)| !self.is_ignored(field))
                .map(|(field, value)| FieldChange {
                    before: format_value(&value),
                    after: None,
                    field,
                })
                .collect(),
            EventKind::Updated => event
                .changes
                .iter()
                .filter(|(field, _)| !self.is_ignored(field))
                .map(|(field, new_value)| {
                    let old_value = event.original.get(field).unwrap_or(&AttributeValue::Null);
                    FieldChange {
                        field: field.clone(),
                        before: format_value(&self.redactor.redact_value(field, old_value)),
                        after: format_value(&self.redactor.redact_value(field, new_value)),
                    }
                })
                .collect(),
            EventKind::Restored => Vec::new(),
        }
    }
}
