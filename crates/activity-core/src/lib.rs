//! Activity record construction: redaction, field diffs, request context, tags, and dispatch.
//!
//! Everything here runs inline with the mutation that raised the event, so no stage performs
//! network I/O or returns an error to the caller.

mod actor;
mod assemble;
mod context;
mod diff;
mod format;
mod logger;
mod redact;
mod tags;

pub use activity_types::*;
pub use actor::{
    ActorChain, ActorResolver, ModeratorResolver, SupportAgentResolver, VendorResolver,
};
pub use assemble::RecordAssembler;
pub use context::ContextCollector;
pub use diff::DiffBuilder;
pub use format::{format_value, FORMAT_ELLIPSIS, FORMAT_MAX_CHARS};
pub use logger::{ActivityLogger, LogOutcome, SkipReason};
pub use redact::{Redactor, REDACTED, TRUNCATED_KEEP_CHARS, TRUNCATED_MARKER};
pub use tags::{generate_tags, ANONYMOUS_TAG};
