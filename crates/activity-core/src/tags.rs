//! Categorical labels attached to each record.

use activity_types::{EventKind, InvocationSource, UserInfo};
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::collections::BTreeSet;

pub const ANONYMOUS_TAG: &str = "anonymous";

/// Tag set for one event. Hour and weekday come from `captured_at` (UTC, Monday = 1).
pub fn generate_tags(
    environment: &str,
    event: EventKind,
    model: &str,
    actor: Option<&UserInfo>,
    source: InvocationSource,
    captured_at: DateTime<Utc>,
) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    tags.insert(environment.to_string());
    tags.insert(event.as_str().to_string());
    tags.insert(format!("model:{}", model.to_lowercase()));
    tags.insert(format!("hour:{:02}", captured_at.hour()));
    tags.insert(format!("day:{}", captured_at.weekday().number_from_monday()));
    match actor {
        Some(user) => tags.insert(format!("user_type:{}", user.actor_type())),
        None => tags.insert(ANONYMOUS_TAG.to_string()),
    };
    tags.insert(source.as_str().to_string());
    tags
}
