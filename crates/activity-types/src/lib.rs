//! Core types, configuration, and traits for the activity audit pipeline.
//!
//! Records serialize to the document shape stored in the activity index.

mod attribute;
mod config;
mod invocation;
mod record;
mod traits;

pub use attribute::*;
pub use config::*;
pub use invocation::*;
pub use record::*;
pub use traits::*;
