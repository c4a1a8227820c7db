//! Activity record and the pieces it is composed of.

use crate::Attributes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle event observed on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
    Restored,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Updated => "updated",
            EventKind::Deleted => "deleted",
            EventKind::Restored => "restored",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field's before/after transition within an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub before: Option<String>,
    pub after: Option<String>,
}

/// Authenticated actor responsible for the event, keyed by actor kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserInfo {
    Vendor {
        id: String,
        company: Option<String>,
        contact: Option<String>,
    },
    Moderator {
        id: String,
        nickname: Option<String>,
        level: Option<String>,
    },
    SupportAgent {
        id: String,
        department: Option<String>,
        shift: Option<String>,
    },
}

impl UserInfo {
    pub fn id(&self) -> &str {
        match self {
            UserInfo::Vendor { id, .. }
            | UserInfo::Moderator { id, .. }
            | UserInfo::SupportAgent { id, .. } => id,
        }
    }

    /// The `type` tag as stored in the document (`vendor`, `moderator`, `support_agent`).
    pub fn actor_type(&self) -> &'static str {
        match self {
            UserInfo::Vendor { .. } => "vendor",
            UserInfo::Moderator { .. } => "moderator",
            UserInfo::SupportAgent { .. } => "support_agent",
        }
    }
}

/// Context of an event raised while serving a web request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: String,
    pub session_id: Option<String>,
    pub route: Option<String>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub referrer: Option<String>,
}

/// Context of an event raised from a console command or background process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleContext {
    pub source: String,
    pub command: String,
}

impl ConsoleContext {
    pub const SOURCE: &'static str = "console";

    pub fn new(command: impl Into<String>) -> Self {
        Self {
            source: Self::SOURCE.to_string(),
            command: command.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActivityContext {
    Request(RequestContext),
    Console(ConsoleContext),
}

impl ActivityContext {
    pub fn is_console(&self) -> bool {
        matches!(self, ActivityContext::Console(_))
    }
}

/// Environment and version metadata captured with every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub environment: String,
    pub application_version: String,
    pub database_transaction_id: Option<String>,
    pub logger_version: String,
}

/// One immutable audit document per lifecycle event.
///
/// Built by the record assembler; fields are read through accessors only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    id: String,
    model: String,
    model_id: String,
    event: EventKind,
    user: Option<UserInfo>,
    attributes: Attributes,
    changes: Vec<FieldChange>,
    context: ActivityContext,
    metadata: EnvironmentInfo,
    tags: BTreeSet<String>,
    timestamp: String,
}

/// Everything a record carries besides its generated id and timestamp.
#[derive(Debug, Clone)]
pub struct RecordParts {
    pub model: String,
    pub model_id: String,
    pub event: EventKind,
    pub user: Option<UserInfo>,
    pub attributes: Attributes,
    pub changes: Vec<FieldChange>,
    pub context: ActivityContext,
    pub metadata: EnvironmentInfo,
    pub tags: BTreeSet<String>,
}

impl ActivityRecord {
    pub fn new(id: String, timestamp: String, parts: RecordParts) -> Self {
        Self {
            id,
            model: parts.model,
            model_id: parts.model_id,
            event: parts.event,
            user: parts.user,
            attributes: parts.attributes,
            changes: parts.changes,
            context: parts.context,
            metadata: parts.metadata,
            tags: parts.tags,
            timestamp,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn event(&self) -> EventKind {
        self.event
    }

    pub fn user(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    pub fn context(&self) -> &ActivityContext {
        &self.context
    }

    pub fn metadata(&self) -> &EnvironmentInfo {
        &self.metadata
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// RFC 3339 capture time, UTC, millisecond precision.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}
