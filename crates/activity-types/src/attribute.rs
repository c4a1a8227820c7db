//! Attribute values and the lifecycle trigger handed to the pipeline.

use crate::EventKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity attribute value as observed at the mutation site.
///
/// Serialized untagged so a snapshot stores as a plain JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Uuid(Uuid),
    Composite(serde_json::Value),
}

/// Insertion-ordered attribute snapshot (field name -> value).
pub type Attributes = IndexMap<String, AttributeValue>;

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Bool(b),
            serde_json::Value::Number(n) => AttributeValue::Number(n),
            serde_json::Value::String(s) => AttributeValue::Text(s),
            other => AttributeValue::Composite(other),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::Number(n.into())
    }
}

impl From<u64> for AttributeValue {
    fn from(n: u64) -> Self {
        AttributeValue::Number(n.into())
    }
}

impl From<i32> for AttributeValue {
    fn from(n: i32) -> Self {
        AttributeValue::Number(n.into())
    }
}

impl From<f64> for AttributeValue {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(AttributeValue::Number)
            .unwrap_or(AttributeValue::Null)
    }
}

impl From<Uuid> for AttributeValue {
    fn from(id: Uuid) -> Self {
        AttributeValue::Uuid(id)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(AttributeValue::Null)
    }
}

/// An entity whose lifecycle is audited.
///
/// `MODEL` is the explicit entity type tag stored on every record.
pub trait Auditable {
    const MODEL: &'static str;

    /// Primary key, stringified.
    fn model_id(&self) -> String;

    /// Current attribute snapshot in column order.
    fn attributes(&self) -> Attributes;
}

/// Fields whose value differs between `original` and `current`, with their new values.
///
/// This is the data layer's changed-field set; fields present only in `current` count as changed.
pub fn changed_attributes(original: &Attributes, current: &Attributes) -> Attributes {
    current
        .iter()
        .filter(|(field, value)| original.get(*field) != Some(*value))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

/// Lifecycle trigger: one observed create/update/delete/restore on an entity.
///
/// For `Updated`, `changes` holds the changed-field set with new values and `original` the
/// pre-update snapshot. They are trusted as given and are not checked against `attributes`.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub model: String,
    pub model_id: String,
    pub attributes: Attributes,
    pub original: Attributes,
    pub changes: Attributes,
    pub transaction_id: Option<String>,
}

impl LifecycleEvent {
    fn new(kind: EventKind, model: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            kind,
            model: model.into(),
            model_id: model_id.into(),
            attributes: Attributes::new(),
            original: Attributes::new(),
            changes: Attributes::new(),
            transaction_id: None,
        }
    }

    pub fn created(
        model: impl Into<String>,
        model_id: impl Into<String>,
        attributes: Attributes,
    ) -> Self {
        Self {
            attributes,
            ..Self::new(EventKind::Created, model, model_id)
        }
    }

    pub fn updated(
        model: impl Into<String>,
        model_id: impl Into<String>,
        attributes: Attributes,
        original: Attributes,
        changes: Attributes,
    ) -> Self {
        Self {
            attributes,
            original,
            changes,
            ..Self::new(EventKind::Updated, model, model_id)
        }
    }

    /// A deleted entity's current and original snapshots are the same row.
    pub fn deleted(
        model: impl Into<String>,
        model_id: impl Into<String>,
        original: Attributes,
    ) -> Self {
        Self {
            attributes: original.clone(),
            original,
            ..Self::new(EventKind::Deleted, model, model_id)
        }
    }

    pub fn restored(
        model: impl Into<String>,
        model_id: impl Into<String>,
        attributes: Attributes,
    ) -> Self {
        Self {
            attributes,
            ..Self::new(EventKind::Restored, model, model_id)
        }
    }

    /// Build a created/deleted/restored trigger from an auditable entity.
    pub fn of<T: Auditable>(kind: EventKind, entity: &T) -> Self {
        let attributes = entity.attributes();
        match kind {
            EventKind::Deleted => Self::deleted(T::MODEL, entity.model_id(), attributes),
            _ => Self {
                attributes,
                ..Self::new(kind, T::MODEL, entity.model_id())
            },
        }
    }

    /// Build an updated trigger from the entity before and after the mutation.
    pub fn update_of<T: Auditable>(before: &T, after: &T) -> Self {
        let original = before.attributes();
        let attributes = after.attributes();
        let changes = changed_attributes(&original, &attributes);
        Self::updated(T::MODEL, after.model_id(), attributes, original, changes)
    }

    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }
}
