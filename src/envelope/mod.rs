//! Envelope handling module
//!
//! Classification and extraction of raw feed frames into canonical
//! records for broker publishing.

pub mod classify;
pub mod extract;

pub use classify::{classify, Classification, RawEnvelope, SIGNAL_DATA_PRESENT};
pub use extract::{extract, CanonicalRecord, DataEnvelope};
