use crate::config::field_map::{FieldMap, UPDATED_ON};
use crate::domain::model::{Feature, Geometry, Record};
use crate::utils::time::{cutoff, format_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyRow,
    MissingCoordinates,
    InvalidCoordinates,
    MissingTimestamp,
    InvalidTimestamp,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SkipReason::EmptyRow => "row has no fields",
            SkipReason::MissingCoordinates => "missing latitude/longitude",
            SkipReason::InvalidCoordinates => "latitude/longitude not numeric",
            SkipReason::MissingTimestamp => "missing occurrence date",
            SkipReason::InvalidTimestamp => "unparseable occurrence date",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Kept {
        feature: Feature,
        occurred_on: DateTime<Utc>,
    },
    /// 時間早於 cutoff；仍然計入最新時間
    Stale { occurred_on: DateTime<Utc> },
    Skipped(SkipReason),
}

/// Turns upstream rows into features, applying the recency cutoff.
pub struct RecordMapper<'a> {
    field_map: &'a FieldMap,
    cutoff: DateTime<Utc>,
    processed_at: String,
}

impl<'a> RecordMapper<'a> {
    pub fn new(field_map: &'a FieldMap, now: DateTime<Utc>, lookback_days: u32) -> Self {
        Self {
            field_map,
            cutoff: cutoff(now, lookback_days),
            processed_at: format_timestamp(now),
        }
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    pub fn map(&self, record: &Record) -> RowOutcome {
        if record.is_empty() {
            return RowOutcome::Skipped(SkipReason::EmptyRow);
        }

        let (lat_raw, lon_raw) = match (
            present(record, &self.field_map.latitude),
            present(record, &self.field_map.longitude),
        ) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return RowOutcome::Skipped(SkipReason::MissingCoordinates),
        };

        let (latitude, longitude) = match (parse_coordinate(lat_raw), parse_coordinate(lon_raw)) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return RowOutcome::Skipped(SkipReason::InvalidCoordinates),
        };

        let occurred_on = match record.get(&self.field_map.occurred_on_date) {
            None | Some(Value::Null) => return RowOutcome::Skipped(SkipReason::MissingTimestamp),
            Some(Value::String(s)) if s.is_empty() => {
                return RowOutcome::Skipped(SkipReason::MissingTimestamp)
            }
            Some(Value::String(s)) => match parse_timestamp(s) {
                Some(ts) => ts,
                None => return RowOutcome::Skipped(SkipReason::InvalidTimestamp),
            },
            Some(_) => return RowOutcome::Skipped(SkipReason::InvalidTimestamp),
        };

        if occurred_on < self.cutoff {
            return RowOutcome::Stale { occurred_on };
        }

        RowOutcome::Kept {
            feature: Feature {
                geometry: Geometry::point(longitude, latitude),
                attributes: self.project(record),
            },
            occurred_on,
        }
    }

    fn project(&self, record: &Record) -> serde_json::Map<String, Value> {
        let mut attributes: serde_json::Map<String, Value> = self
            .field_map
            .attributes
            .iter()
            .map(|(dest, src)| (dest.clone(), record.get(src).cloned().unwrap_or(Value::Null)))
            .collect();

        attributes.insert(
            UPDATED_ON.to_string(),
            Value::String(self.processed_at.clone()),
        );
        attributes
    }
}

fn present<'r>(record: &'r Record, key: &str) -> Option<&'r Value> {
    record.get(key).filter(|value| !value.is_null())
}

fn parse_coordinate(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(obj) => Record::from(obj),
            _ => panic!("record must be an object"),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_custom_field_map_projection() {
        let field_map = FieldMap::from_json_str(
            r#"{"latitude":"Y","longitude":"X","occurred_on_date":"DT","attributes":{"id":"CASE_ID"}}"#,
        )
        .unwrap();
        let mapper = RecordMapper::new(&field_map, now(), 7);

        let outcome = mapper.map(&record(json!({
            "X": -71.06, "Y": 42.36, "DT": "2024-05-01T12:00:00Z", "CASE_ID": "A1"
        })));

        match outcome {
            RowOutcome::Kept {
                feature,
                occurred_on,
            } => {
                assert_eq!(
                    serde_json::to_value(feature.geometry).unwrap(),
                    json!({"x": -71.06, "y": 42.36, "spatialReference": {"wkid": 4326}})
                );
                assert_eq!(feature.attributes.get("id").unwrap(), "A1");
                assert_eq!(
                    feature.attributes.get("updated_on").unwrap(),
                    "2024-05-03T00:00:00.000000+00:00"
                );
                assert_eq!(feature.attributes.len(), 2);
                assert_eq!(occurred_on, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_default_projection() {
        let field_map = FieldMap::default();
        let mapper = RecordMapper::new(&field_map, now(), 7);

        let outcome = mapper.map(&record(json!({
            "Lat": "42.35", "Long": "-71.05",
            "OCCURRED_ON_DATE": "2024-05-02 08:30:00+00",
            "INCIDENT_NUMBER": "I24000001",
            "OFFENSE_DESCRIPTION": "LARCENY",
            "DISTRICT": "B2"
        })));

        let RowOutcome::Kept { feature, .. } = outcome else {
            panic!("row should be kept");
        };
        assert_eq!(feature.geometry, Geometry::point(-71.05, 42.35));
        assert_eq!(feature.attributes.get("incident_number").unwrap(), "I24000001");
        assert_eq!(feature.attributes.get("offense_description").unwrap(), "LARCENY");
        assert_eq!(
            feature.attributes.get("occurred_on_date").unwrap(),
            "2024-05-02 08:30:00+00"
        );
        assert!(feature.attributes.get("DISTRICT").is_none());
    }

    #[test]
    fn test_missing_source_attribute_becomes_null() {
        let field_map = FieldMap::default();
        let mapper = RecordMapper::new(&field_map, now(), 7);

        let RowOutcome::Kept { feature, .. } = mapper.map(&record(json!({
            "Lat": 42.35, "Long": -71.05, "OCCURRED_ON_DATE": "2024-05-02"
        }))) else {
            panic!("row should be kept");
        };
        assert_eq!(feature.attributes.get("incident_number").unwrap(), &Value::Null);
    }

    #[test]
    fn test_missing_or_null_coordinates_are_skipped() {
        let field_map = FieldMap::default();
        let mapper = RecordMapper::new(&field_map, now(), 7);

        for row in [
            json!({"Long": "-71.0", "OCCURRED_ON_DATE": "2024-05-02"}),
            json!({"Lat": null, "Long": "-71.0", "OCCURRED_ON_DATE": "2024-05-02"}),
            json!({"Lat": "42.3", "Long": null, "OCCURRED_ON_DATE": "2024-05-02"}),
        ] {
            assert_eq!(
                mapper.map(&record(row)),
                RowOutcome::Skipped(SkipReason::MissingCoordinates)
            );
        }
    }

    #[test]
    fn test_rows_without_fields_are_skipped() {
        let field_map = FieldMap::default();
        let mapper = RecordMapper::new(&field_map, now(), 7);

        for row in [Value::Null, json!(42), json!(["42.3", "-71.0"]), json!({})] {
            assert_eq!(
                mapper.map(&Record::from(row)),
                RowOutcome::Skipped(SkipReason::EmptyRow)
            );
        }
    }

    #[test]
    fn test_non_numeric_coordinates_are_skipped() {
        let field_map = FieldMap::default();
        let mapper = RecordMapper::new(&field_map, now(), 7);

        for lat in [json!(""), json!("north"), json!(true), json!("NaN"), json!([42.3])] {
            let row = json!({"Lat": lat, "Long": "-71.0", "OCCURRED_ON_DATE": "2024-05-02"});
            assert_eq!(
                mapper.map(&record(row)),
                RowOutcome::Skipped(SkipReason::InvalidCoordinates)
            );
        }
    }

    #[test]
    fn test_timestamp_problems_are_skipped() {
        let field_map = FieldMap::default();
        let mapper = RecordMapper::new(&field_map, now(), 7);

        let missing = [
            json!({"Lat": "42.3", "Long": "-71.0"}),
            json!({"Lat": "42.3", "Long": "-71.0", "OCCURRED_ON_DATE": null}),
            json!({"Lat": "42.3", "Long": "-71.0", "OCCURRED_ON_DATE": ""}),
        ];
        for row in missing {
            assert_eq!(
                mapper.map(&record(row)),
                RowOutcome::Skipped(SkipReason::MissingTimestamp)
            );
        }

        let invalid = [
            json!({"Lat": "42.3", "Long": "-71.0", "OCCURRED_ON_DATE": "last tuesday"}),
            json!({"Lat": "42.3", "Long": "-71.0", "OCCURRED_ON_DATE": 1714521600}),
        ];
        for row in invalid {
            assert_eq!(
                mapper.map(&record(row)),
                RowOutcome::Skipped(SkipReason::InvalidTimestamp)
            );
        }
    }

    #[test]
    fn test_rows_before_cutoff_are_stale() {
        let field_map = FieldMap::default();
        let mapper = RecordMapper::new(&field_map, now(), 7);
        assert_eq!(
            mapper.cutoff(),
            Utc.with_ymd_and_hms(2024, 4, 26, 0, 0, 0).unwrap()
        );

        let stale = mapper.map(&record(json!({
            "Lat": "42.3", "Long": "-71.0", "OCCURRED_ON_DATE": "2024-04-25T23:59:59"
        })));
        assert_eq!(
            stale,
            RowOutcome::Stale {
                occurred_on: Utc.with_ymd_and_hms(2024, 4, 25, 23, 59, 59).unwrap()
            }
        );

        // 剛好等於 cutoff 仍保留
        let boundary = mapper.map(&record(json!({
            "Lat": "42.3", "Long": "-71.0", "OCCURRED_ON_DATE": "2024-04-26T00:00:00Z"
        })));
        assert!(matches!(boundary, RowOutcome::Kept { .. }));
    }
}
