//! Full envelope decode and canonical projection
//!
//! Second, independent decode of a frame already classified as
//! data-bearing. Absent fields fall back to empty-string/zero values;
//! the projection performs no validation beyond the decode itself.

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fully-typed form of a data-bearing envelope.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DataEnvelope {
    pub data: EnvelopeData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EnvelopeData {
    pub feed: Feed,
    pub entity: Entity,
    pub timeseries: Timeseries,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Feed {
    pub metric: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Entity {
    pub name: String,
    pub meta: EntityMeta,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EntityMeta {
    pub building: String,
    pub building_floor: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Timeseries {
    pub unit: String,
    pub value: TimeseriesValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TimeseriesValue {
    pub time: String,
    pub time_accuracy: f64,
    pub data: f64,
    #[serde(rename = "Type")]
    pub value_type: String,
}

/// Normalized record published downstream.
///
/// Field order is the wire order; immutable once built, no identity
/// beyond its field values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CanonicalRecord {
    pub building: String,
    pub floor: String,
    pub sensor: String,
    pub value: f64,
}

impl From<DataEnvelope> for CanonicalRecord {
    fn from(envelope: DataEnvelope) -> Self {
        Self {
            building: envelope.data.entity.meta.building,
            floor: envelope.data.entity.meta.building_floor,
            sensor: envelope.data.feed.metric,
            value: envelope.data.timeseries.value.data,
        }
    }
}

/// Decode a data-bearing frame and project it to a [`CanonicalRecord`].
///
/// A decode failure is an explicit error the caller logs and drops; it
/// never escalates past the message.
pub fn extract(body: &str) -> Result<CanonicalRecord, BridgeError> {
    let envelope: DataEnvelope =
        serde_json::from_str(body).map_err(BridgeError::ExtractionFailed)?;

    debug!(
        entity = %envelope.data.entity.name,
        unit = %envelope.data.timeseries.unit,
        time = %envelope.data.timeseries.value.time,
        accuracy = envelope.data.timeseries.value.time_accuracy,
        value_type = %envelope.data.timeseries.value.value_type,
        "Decoded data envelope"
    );

    Ok(CanonicalRecord::from(envelope))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_FRAME: &str = r#"{"Signal":2,"Data":{"Feed":{"Metric":"temperature"},"Entity":{"Meta":{"Building":"USB","BuildingFloor":"1"}},"Timeseries":{"Value":{"Data":21.5}}}}"#;

    #[test]
    fn projects_all_canonical_fields() {
        let record = extract(FULL_FRAME).unwrap();
        assert_eq!(
            record,
            CanonicalRecord {
                building: "USB".to_string(),
                floor: "1".to_string(),
                sensor: "temperature".to_string(),
                value: 21.5,
            }
        );
    }

    #[test]
    fn absent_fields_project_defaults() {
        let record = extract(r#"{"Signal":2}"#).unwrap();
        assert_eq!(record.building, "");
        assert_eq!(record.floor, "");
        assert_eq!(record.sensor, "");
        assert_eq!(record.value, 0.0);

        // Partial payloads keep what is present
        let record =
            extract(r#"{"Signal":2,"Data":{"Entity":{"Meta":{"Building":"USB"}}}}"#).unwrap();
        assert_eq!(record.building, "USB");
        assert_eq!(record.floor, "");
    }

    #[test]
    fn extraction_is_deterministic() {
        let first = extract(FULL_FRAME).unwrap();
        let second = extract(FULL_FRAME).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_json_is_an_extraction_error() {
        let err = extract("not json").unwrap_err();
        assert_eq!(err.error_type_label(), "extraction");

        // Type mismatches fail the decode rather than defaulting
        assert!(extract(r#"{"Signal":2,"Data":{"Feed":{"Metric":7}}}"#).is_err());
    }

    #[test]
    fn canonical_record_wire_format() {
        let record = extract(FULL_FRAME).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"Building":"USB","Floor":"1","Sensor":"temperature","Value":21.5}"#
        );
    }

    #[test]
    fn full_nested_shape_decodes() {
        let frame = r#"{
            "Signal": 2,
            "Data": {
                "Feed": {"Metric": "room-temperature"},
                "Entity": {"Name": "Zone 2.1", "Meta": {"Building": "USB", "BuildingFloor": "2"}},
                "Timeseries": {
                    "Unit": "C",
                    "Value": {"Time": "2020-01-01T00:00:00Z", "TimeAccuracy": 0.5, "Data": 19.25, "Type": "Real"}
                }
            }
        }"#;
        let record = extract(frame).unwrap();
        assert_eq!(record.sensor, "room-temperature");
        assert_eq!(record.building, "USB");
        assert_eq!(record.floor, "2");
        assert_eq!(record.value, 19.25);
    }
}
