//! HTTP surface for the activity pipeline: an instrumented demo resource and delivery job status.

pub mod posts;
pub mod request;
pub mod server;
