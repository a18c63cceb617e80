//! Outbox for kiosk combination submissions.
//!
//! This crate provides:
//! - Combination: one flavor-rating submission
//! - CombinationQueue: durable FIFO of pending submissions
//! - Publisher: head-of-queue delivery with fixed-delay retry
//! - HttpTransport: JSON POST delivery to the flavors API

mod error;
mod publisher;
mod queue;
mod record;
mod transport;

pub use error::{OutboxError, OutboxResult};
pub use publisher::{Publisher, PublisherConfig, PublisherState, PublisherStats};
pub use queue::{CombinationQueue, QUEUE_STORAGE_KEY};
pub use record::{Combination, FLAVORS_PER_COMBINATION};
pub use transport::{HttpTransport, Transport, TransportError, TransportResult};
