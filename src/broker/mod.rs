//! NATS JetStream integration
//!
//! Publishes canonical records to the configured broker topic, echoing
//! every record to a local sink.

mod publisher;

pub use publisher::RecordPublisher;
