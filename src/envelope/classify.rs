//! First-pass envelope classification
//!
//! Decodes only the `Signal` discriminant of a feed frame to decide
//! whether it carries a data payload, without paying for the full
//! nested decode.

use serde::Deserialize;

/// Discriminant value marking a data-bearing envelope.
pub const SIGNAL_DATA_PRESENT: i64 = 2;

/// Minimal wire shape for the first decode pass.
///
/// An absent discriminant decodes as `0`, which classifies as no-data.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawEnvelope {
    pub signal: i64,
}

/// Outcome of the first-pass decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The envelope carries a full data payload.
    DataPresent,
    /// Any other decoded signal, carried for logging. A normal outcome,
    /// not an error.
    NoData(i64),
    /// The frame is not valid JSON.
    Unparseable,
}

/// Classify a raw feed frame by its `Signal` discriminant.
///
/// Pure: no side effects, no logging.
pub fn classify(body: &str) -> Classification {
    match serde_json::from_str::<RawEnvelope>(body) {
        Ok(raw) if raw.signal == SIGNAL_DATA_PRESENT => Classification::DataPresent,
        Ok(raw) => Classification::NoData(raw.signal),
        Err(_) => Classification::Unparseable,
    }
}
