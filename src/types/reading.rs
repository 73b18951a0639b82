//! Hourly weather reading
//!
//! A [Reading] is a single timestamped sample for one locality. Readings carry no behaviour of
//! their own; they are created by ingestion, persisted by the store and consumed by the
//! aggregators in [operations](crate::operations).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a stored locality.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct LocalityId(pub u64);

impl fmt::Display for LocalityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LocalityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A single hourly weather sample.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Reading {
    /// Temperature in the unit delivered by the data source (no conversion is applied).
    pub temperature: f64,
    /// Precipitation, or `None` when the source had no data for this hour.
    ///
    /// `None` is distinct from `Some(0.0)`, which is an observed zero.
    pub precipitation: Option<f64>,
    /// Local date-time of the sample, hour granularity.
    pub timestamp: NaiveDateTime,
    /// Locality the sample belongs to.
    pub locality_id: LocalityId,
}

impl Reading {
    /// Return a new Reading.
    pub fn new(
        temperature: f64,
        precipitation: Option<f64>,
        timestamp: NaiveDateTime,
        locality_id: LocalityId,
    ) -> Self {
        Self {
            temperature,
            precipitation,
            timestamp,
            locality_id,
        }
    }

    /// Calendar day of the sample, in the timestamp's own time reference.
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_truncates_timestamp() {
        let timestamp = NaiveDate::from_ymd_opt(2025, 10, 1)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        let reading = Reading::new(12.0, None, timestamp, LocalityId(1));
        assert_eq!(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(), reading.day());
    }

    #[test]
    fn serialise_null_precipitation() {
        let timestamp = NaiveDate::from_ymd_opt(2025, 10, 1)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap();
        let reading = Reading::new(12.5, None, timestamp, LocalityId(7));
        let json = serde_json::to_string(&reading).unwrap();
        assert_eq!(
            r#"{"temperature":12.5,"precipitation":null,"timestamp":"2025-10-01T01:00:00","locality_id":7}"#,
            json
        );
        let back: Reading = serde_json::from_str(&json).unwrap();
        assert_eq!(reading, back);
    }

    #[test]
    fn locality_id_display() {
        assert_eq!("99", LocalityId::from(99).to_string());
    }
}
