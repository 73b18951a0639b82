//! Request and report data types

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::operation::Thresholds;
use crate::types::Locality;

/// Request data for ingesting hourly data of a city
#[derive(Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_ingest_request"))]
pub struct IngestRequest {
    /// Name of the city to geocode and store
    #[validate(length(min = 1, message = "city_name must not be empty"))]
    pub city_name: String,
    /// First day to fetch
    pub start_date: NaiveDate,
    /// Last day to fetch (inclusive)
    pub end_date: NaiveDate,
}

/// Request data for temperature statistics of one locality
#[derive(Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_temperature_request"))]
pub struct TemperatureRequest {
    /// Name of a stored locality
    #[validate(length(min = 1, message = "city_name must not be empty"))]
    pub city_name: String,
    /// First day of the range
    pub start_date: NaiveDate,
    /// Last day of the range (inclusive)
    pub end_date: NaiveDate,
    /// Readings strictly above this temperature are counted
    pub threshold_high: f64,
    /// Readings strictly below this temperature are counted
    pub threshold_low: f64,
}

impl TemperatureRequest {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.threshold_high, self.threshold_low)
    }
}

/// Request data for precipitation statistics of one locality
#[derive(Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_precipitation_request"))]
pub struct PrecipitationRequest {
    /// Name of a stored locality
    #[validate(length(min = 1, message = "city_name must not be empty"))]
    pub city_name: String,
    /// First day of the range
    pub start_date: NaiveDate,
    /// Last day of the range (inclusive)
    pub end_date: NaiveDate,
}

/// Request data for statistics of every stored locality
///
/// Without a date range all stored readings are used.
#[derive(Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_general_request"))]
pub struct GeneralStatisticsRequest {
    /// Readings strictly above this temperature are counted
    pub threshold_high: f64,
    /// Readings strictly below this temperature are counted
    pub threshold_low: f64,
    /// First day of the range
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last day of the range (inclusive)
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl GeneralStatisticsRequest {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.threshold_high, self.threshold_low)
    }

    /// Timestamp range covered by the request, if any.
    pub fn range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some(day_range(start, end)),
            _ => None,
        }
    }
}

/// Expand an inclusive range of days to the timestamps from the first hour of `start` through
/// the last minute of `end`.
pub fn day_range(start: NaiveDate, end: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let last_minute = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    (start.and_time(NaiveTime::MIN), end.and_time(last_minute))
}

/// Validate that a date range is not inverted
fn validate_date_range(start: &NaiveDate, end: &NaiveDate) -> Result<(), ValidationError> {
    if start > end {
        let mut error = ValidationError::new("start_date must not be after end_date");
        error.add_param("start_date".into(), &start.to_string());
        error.add_param("end_date".into(), &end.to_string());
        return Err(error);
    }
    Ok(())
}

fn validate_ingest_request(request: &IngestRequest) -> Result<(), ValidationError> {
    validate_date_range(&request.start_date, &request.end_date)
}

fn validate_temperature_request(request: &TemperatureRequest) -> Result<(), ValidationError> {
    validate_date_range(&request.start_date, &request.end_date)
}

fn validate_precipitation_request(request: &PrecipitationRequest) -> Result<(), ValidationError> {
    validate_date_range(&request.start_date, &request.end_date)
}

fn validate_general_request(request: &GeneralStatisticsRequest) -> Result<(), ValidationError> {
    match (&request.start_date, &request.end_date) {
        (Some(start), Some(end)) => validate_date_range(start, end),
        (None, None) => Ok(()),
        _ => Err(ValidationError::new(
            "start_date and end_date must be given together",
        )),
    }
}

/// Temperature at a point in time
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TemperatureExtremum {
    /// Temperature rounded to 1 decimal
    pub value: f64,
    /// `YYYY-MM-DDTHH:MM`
    pub date_time: String,
}

/// Temperature statistics of a set of readings
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TemperatureReport {
    pub average: f64,
    /// Mean temperature per `YYYY-MM-DD` day, in chronological order
    pub average_by_day: BTreeMap<String, f64>,
    pub max: TemperatureExtremum,
    pub min: TemperatureExtremum,
    pub hours_above_threshold: usize,
    pub hours_below_threshold: usize,
}

/// Precipitation on a day
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PrecipitationExtremum {
    /// Precipitation rounded to 2 decimals
    pub value: f64,
    /// `YYYY-MM-DD`
    pub date: String,
}

/// Precipitation statistics of a set of readings
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PrecipitationReport {
    pub total: f64,
    /// Total precipitation per `YYYY-MM-DD` day, in chronological order
    pub total_by_day: BTreeMap<String, f64>,
    pub days_with_precipitation: usize,
    pub max: PrecipitationExtremum,
    pub average: f64,
}

/// Temperature and precipitation statistics of one locality
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LocationReport {
    pub temperature: TemperatureReport,
    pub precipitation: PrecipitationReport,
}

/// Statistics of several localities, keyed by display name
pub type GeneralReport = BTreeMap<String, LocationReport>;

/// Response body of the temperature endpoint
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct TemperatureResponse {
    pub temperature: TemperatureReport,
}

/// Response body of the precipitation endpoint
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct PrecipitationResponse {
    pub precipitation: PrecipitationReport,
}

/// Outcome of an ingestion
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct IngestSummary {
    /// The locality the readings were stored against
    pub locality: Locality,
    /// Number of readings stored
    pub inserted: usize,
    /// Number of samples not stored
    pub skipped: usize,
    /// One message per skipped sample
    pub messages: Vec<String>,
}
