//! Delivery of activity records to the document store off the request path.

mod memory;

pub use activity_types::{ActivityDispatcher, DeliveryJob, DeliveryOptions, DispatchError, JobStatus};
pub use memory::InMemoryActivityQueue;
