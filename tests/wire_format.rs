//! Wire format conformance tests
//!
//! Validates the canonical record contract between the bridge and
//! downstream consumers of the broker topic: field names, field order,
//! and the projection from feed envelopes to published records. The
//! fixtures mirror real frames from the upstream feed.

use serde_json::Value;

/// A data-bearing feed frame and the record the bridge publishes for it.
const FEED_FRAME: &str = r#"{"Signal":2,"Data":{"Feed":{"Metric":"temperature"},"Entity":{"Meta":{"Building":"USB","BuildingFloor":"1"}},"Timeseries":{"Value":{"Data":21.5}}}}"#;
const PUBLISHED_RECORD: &str = r#"{"Building":"USB","Floor":"1","Sensor":"temperature","Value":21.5}"#;

/// A no-op frame: anything with Signal != 2 carries no payload.
const NO_DATA_FRAME: &str = r#"{"Signal":0}"#;

/// Required fields on every published record.
const REQUIRED_RECORD_FIELDS: &[&str] = &["Building", "Floor", "Sensor", "Value"];

fn parse(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Fixture is not valid JSON: {e}"))
}

#[test]
fn published_record_has_required_fields() {
    let record = parse(PUBLISHED_RECORD);
    let obj = record.as_object().expect("record should be a JSON object");

    for field in REQUIRED_RECORD_FIELDS {
        assert!(
            obj.contains_key(*field),
            "Record missing required field '{field}'"
        );
    }
    assert_eq!(
        obj.len(),
        REQUIRED_RECORD_FIELDS.len(),
        "Record must carry exactly the canonical fields"
    );
}

#[test]
fn record_fields_project_from_feed_envelope() {
    let frame = parse(FEED_FRAME);
    let record = parse(PUBLISHED_RECORD);

    assert_eq!(record["Building"], frame["Data"]["Entity"]["Meta"]["Building"]);
    assert_eq!(
        record["Floor"],
        frame["Data"]["Entity"]["Meta"]["BuildingFloor"]
    );
    assert_eq!(record["Sensor"], frame["Data"]["Feed"]["Metric"]);
    assert_eq!(record["Value"], frame["Data"]["Timeseries"]["Value"]["Data"]);
}

#[test]
fn record_field_order_is_stable() {
    // Downstream consumers and the stdout echo both see this exact
    // byte order; keep it stable across releases.
    let positions: Vec<usize> = REQUIRED_RECORD_FIELDS
        .iter()
        .map(|field| {
            PUBLISHED_RECORD
                .find(&format!("\"{field}\""))
                .unwrap_or_else(|| panic!("field '{field}' not found"))
        })
        .collect();

    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted, "Record fields out of order");
}

#[test]
fn data_frame_signal_discriminant_is_two() {
    let frame = parse(FEED_FRAME);
    assert_eq!(frame["Signal"], 2);
    assert!(frame["Data"].is_object());
}

#[test]
fn no_data_frame_carries_no_payload() {
    let frame = parse(NO_DATA_FRAME);
    assert_ne!(frame["Signal"], 2);
    assert!(frame.get("Data").is_none());
}

#[test]
fn record_value_is_numeric() {
    let record = parse(PUBLISHED_RECORD);
    assert!(record["Value"].is_f64() || record["Value"].is_i64());
    for field in ["Building", "Floor", "Sensor"] {
        assert!(record[field].is_string(), "field '{field}' must be a string");
    }
}
