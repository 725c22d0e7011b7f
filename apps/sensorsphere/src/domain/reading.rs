//! Sensor Reading Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single measurement reported by a sensor.
///
/// `time` is assigned by storage when the reading is created; callers leave
/// it unset. The sensor name is not checked against existing sensors here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SensorReading {
    /// Name of the sensor that produced the reading.
    pub sensor_name: String,
    /// When the reading was recorded.
    #[serde(with = "super::timestamp", skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Measured value.
    pub value: f64,
}

impl SensorReading {
    /// Create an untimed reading, ready to be stored.
    #[must_use]
    pub fn new(sensor_name: impl Into<String>, value: f64) -> Self {
        Self {
            sensor_name: sensor_name.into(),
            time: None,
            value,
        }
    }

    /// Return the reading stamped with the given time.
    #[must_use]
    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }
}

/// Inclusive time window over one sensor's readings.
///
/// `start_time <= end_time` is not checked; an inverted window simply
/// matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeRangeQuery {
    /// Sensor whose readings are requested.
    pub sensor_name: String,
    /// Lower bound, inclusive.
    #[serde(with = "super::timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    /// Upper bound, inclusive.
    #[serde(with = "super::timestamp")]
    pub end_time: Option<DateTime<Utc>>,
}

impl TimeRangeQuery {
    /// Create a query over `[start, end]`.
    #[must_use]
    pub fn new(sensor_name: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            sensor_name: sensor_name.into(),
            start_time: Some(start),
            end_time: Some(end),
        }
    }

    /// True when `time` falls inside the window.
    #[must_use]
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => start <= time && time <= end,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn sample_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap() + chrono::Duration::nanoseconds(5)
    }

    #[test]
    fn reading_time_has_nanosecond_precision() {
        let reading = SensorReading::new("s1", 21.5).at(sample_time());

        let json = serde_json::to_string(&reading).unwrap();

        assert_eq!(
            json,
            r#"{"sensorName":"s1","time":"2024-03-01T12:30:00.000000005Z","value":21.5}"#
        );
    }

    #[test]
    fn untimed_reading_omits_time() {
        let json = serde_json::to_string(&SensorReading::new("s1", 1.0)).unwrap();

        assert_eq!(json, r#"{"sensorName":"s1","value":1.0}"#);
    }

    #[test]
    fn offsets_normalize_to_utc() {
        let query: TimeRangeQuery = serde_json::from_str(
            r#"{"sensorName":"s1","startTime":"2024-03-01T14:30:00+02:00","endTime":"2024-03-02T00:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(
            query.start_time,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
        );
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        let result: Result<TimeRangeQuery, _> =
            serde_json::from_str(r#"{"sensorName":"s1","startTime":"yesterday"}"#);

        assert!(result.is_err());
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let start = sample_time();
        let end = start + chrono::Duration::hours(1);
        let query = TimeRangeQuery::new("s1", start, end);

        assert!(query.contains(start));
        assert!(query.contains(end));
        assert!(!query.contains(end + chrono::Duration::nanoseconds(1)));
        assert!(!TimeRangeQuery::default().contains(start));
    }

    fn coordinate() -> impl Strategy<Value = f64> {
        (-180_000i32..=180_000).prop_map(|v| f64::from(v) / 1000.0)
    }

    fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
        (0i64..4_102_444_800, 0u32..1_000_000_000)
            .prop_map(|(secs, nanos)| DateTime::from_timestamp(secs, nanos).unwrap())
    }

    proptest! {
        #[test]
        fn reading_json_round_trips(name in "[a-z][a-z0-9_-]{0,15}", value in coordinate(), time in timestamp()) {
            let reading = SensorReading::new(name, value).at(time);
            let json = serde_json::to_string(&reading).unwrap();
            prop_assert_eq!(serde_json::from_str::<SensorReading>(&json).unwrap(), reading);
        }

        #[test]
        fn query_json_round_trips(name in "[a-z][a-z0-9_-]{0,15}", start in timestamp(), end in timestamp()) {
            let query = TimeRangeQuery::new(name, start, end);
            let json = serde_json::to_string(&query).unwrap();
            prop_assert_eq!(serde_json::from_str::<TimeRangeQuery>(&json).unwrap(), query);
        }

        #[test]
        fn sensor_json_round_trips(
            name in "[a-z][a-z0-9_-]{0,15}",
            latitude in coordinate(),
            longitude in coordinate(),
            tags in proptest::collection::vec("[a-z]{1,8}", 0..4),
        ) {
            let sensor = crate::domain::Sensor::new(name, crate::domain::Location::new(latitude, longitude), tags);
            let json = serde_json::to_string(&sensor).unwrap();
            prop_assert_eq!(serde_json::from_str::<crate::domain::Sensor>(&json).unwrap(), sensor);
        }
    }
}
