//! ActivityLogger: the entry point mutation sites call after each lifecycle event.

use crate::actor::ActorChain;
use crate::assemble::RecordAssembler;
use crate::context::ContextCollector;
use crate::diff::DiffBuilder;
use crate::redact::Redactor;
use crate::tags::generate_tags;
use activity_types::{
    ActivityDispatcher, ActivityLoggingConfig, ActivityRecord, Invocation, InvocationSource,
    LifecycleEvent, RecordParts,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Why an event produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    UnobservedModel,
    ConsoleEventsDisabled,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Disabled => "disabled",
            SkipReason::UnobservedModel => "unobserved_model",
            SkipReason::ConsoleEventsDisabled => "console_events_disabled",
        }
    }
}

/// Result of logging one lifecycle event. Never an error: failures are logged, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutcome {
    Skipped(SkipReason),
    Enqueued { record_id: String, job_id: String },
    DispatchFailed { record_id: String },
}

/// Builds an activity record per lifecycle event and hands it to the dispatcher.
pub struct ActivityLogger {
    config: ActivityLoggingConfig,
    redactor: Redactor,
    diff: DiffBuilder,
    context: ContextCollector,
    actors: ActorChain,
    assembler: RecordAssembler,
    dispatcher: Arc<dyn ActivityDispatcher>,
}

impl ActivityLogger {
    /// Logger with the default actor priority (vendors, moderators, support agents).
    pub fn new(config: ActivityLoggingConfig, dispatcher: Arc<dyn ActivityDispatcher>) -> Self {
        Self {
            redactor: Redactor::from_config(&config),
            diff: DiffBuilder::from_config(&config),
            context: ContextCollector,
            actors: ActorChain::default(),
            assembler: RecordAssembler::from_config(&config),
            config,
            dispatcher,
        }
    }

    pub fn with_actors(mut self, actors: ActorChain) -> Self {
        self.actors = actors;
        self
    }

    pub fn config(&self) -> &ActivityLoggingConfig {
        &self.config
    }

    pub fn skip_reason(&self, event: &LifecycleEvent, invocation: &Invocation) -> Option<SkipReason> {
        if !self.config.enabled {
            return Some(SkipReason::Disabled);
        }
        if !self.config.observes(&event.model) {
            return Some(SkipReason::UnobservedModel);
        }
        if invocation.source() == InvocationSource::Console && !self.config.log_console_events {
            return Some(SkipReason::ConsoleEventsDisabled);
        }
        None
    }

    /// Build the record for `event` without dispatching it. Synchronous, no I/O.
    pub fn build_record(
        &self,
        event: &LifecycleEvent,
        invocation: &Invocation,
        captured_at: DateTime<Utc>,
    ) -> ActivityRecord {
        let user = self.actors.resolve(invocation);
        let tags = generate_tags(
            self.assembler.environment(),
            event.kind,
            &event.model,
            user.as_ref(),
            invocation.source(),
            captured_at,
        );
        let parts = RecordParts {
            model: event.model.clone(),
            model_id: event.model_id.clone(),
            event: event.kind,
            user,
            attributes: self.redactor.redact(&event.attributes),
            changes: self.diff.build_changes(event),
            context: self.context.collect(invocation),
            metadata: self.assembler.environment_info(event.transaction_id.clone()),
            tags,
        };
        self.assembler.assemble(parts, captured_at)
    }

    /// Record `event` and enqueue it once for delivery.
    pub fn log(&self, event: &LifecycleEvent, invocation: &Invocation) -> LogOutcome {
        if let Some(reason) = self.skip_reason(event, invocation) {
            tracing::debug!(
                model = %event.model,
                event = %event.kind,
                reason = ?reason,
                "activity skipped"
            );
            return LogOutcome::Skipped(reason);
        }

        let record = self.build_record(event, invocation, Utc::now());
        let record_id = record.id().to_string();
        tracing::debug!(
            record_id = %record_id,
            model = %event.model,
            model_id = %event.model_id,
            event = %event.kind,
            changes = record.changes().len(),
            "activity record built"
        );

        match self.dispatcher.enqueue(&self.config.queue, record) {
            Ok(job_id) => {
                tracing::info!(
                    record_id = %record_id,
                    job_id = %job_id,
                    queue = %self.config.queue,
                    "activity enqueued"
                );
                LogOutcome::Enqueued { record_id, job_id }
            }
            Err(e) => {
                tracing::error!(record_id = %record_id, error = %e, "activity dispatch failed");
                LogOutcome::DispatchFailed { record_id }
            }
        }
    }
}
