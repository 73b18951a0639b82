//! Statistics operations.
//!
//! Each per-locality operation is implemented as a struct that implements the
//! [Operation](crate::operation::Operation) trait. Statistics over several localities are computed
//! by [summarize_general], which partitions its input and applies [Location] per partition.

use std::collections::btree_map::Entry;

use crate::error::WeatherStatsError;
use crate::grouping::{
    find_extremum, format_date, format_date_time, group_by_day, partition_by_locality, round_to,
    Accumulator, Extremum,
};
use crate::models::{
    GeneralReport, LocationReport, PrecipitationExtremum, PrecipitationReport,
    TemperatureExtremum, TemperatureReport,
};
use crate::operation::{Operation, Thresholds};
use crate::types::{LocalityId, Reading};

/// Decimal places of temperature values in reports.
const TEMPERATURE_DECIMALS: u32 = 1;

/// Decimal places of precipitation values in reports.
const PRECIPITATION_DECIMALS: u32 = 2;

/// Temperature statistics: mean, daily means, extrema and threshold crossings.
pub struct Temperature {}

impl Temperature {
    fn extremum(reading: &Reading) -> TemperatureExtremum {
        TemperatureExtremum {
            value: round_to(reading.temperature, TEMPERATURE_DECIMALS),
            date_time: format_date_time(&reading.timestamp),
        }
    }
}

impl Operation for Temperature {
    type Report = TemperatureReport;
    const NAME: &'static str = "temperature";

    fn execute(
        readings: &[Reading],
        thresholds: &Thresholds,
    ) -> Result<TemperatureReport, WeatherStatsError> {
        let empty = || WeatherStatsError::EmptyInput {
            operation: Self::NAME,
        };
        let average = readings
            .iter()
            .map(|r| r.temperature)
            .collect::<Accumulator>()
            .mean()
            .ok_or_else(empty)?;
        let max = find_extremum(readings, Extremum::Max, |r| r.temperature).ok_or_else(empty)?;
        let min = find_extremum(readings, Extremum::Min, |r| r.temperature).ok_or_else(empty)?;

        let average_by_day = group_by_day(readings.iter().map(|r| (r.timestamp, r.temperature)))
            .into_iter()
            .filter_map(|(day, day_total)| {
                day_total
                    .mean()
                    .map(|mean| (format_date(&day), round_to(mean, TEMPERATURE_DECIMALS)))
            })
            .collect();

        let hours_above_threshold = readings
            .iter()
            .filter(|r| r.temperature > thresholds.high)
            .count();
        let hours_below_threshold = readings
            .iter()
            .filter(|r| r.temperature < thresholds.low)
            .count();

        Ok(TemperatureReport {
            average: round_to(average, TEMPERATURE_DECIMALS),
            average_by_day,
            max: Self::extremum(max),
            min: Self::extremum(min),
            hours_above_threshold,
            hours_below_threshold,
        })
    }
}

/// Precipitation statistics: totals, daily totals, rainy days, maximum and mean.
///
/// Readings without precipitation data are left out of every figure.
pub struct Precipitation {}

impl Operation for Precipitation {
    type Report = PrecipitationReport;
    const NAME: &'static str = "precipitation";

    fn execute(
        readings: &[Reading],
        _thresholds: &Thresholds,
    ) -> Result<PrecipitationReport, WeatherStatsError> {
        let empty = || WeatherStatsError::EmptyInput {
            operation: Self::NAME,
        };
        let observed: Vec<(&Reading, f64)> = readings
            .iter()
            .filter_map(|r| r.precipitation.map(|value| (r, value)))
            .collect();

        let overall: Accumulator = observed.iter().map(|(_, value)| *value).collect();
        let average = overall.mean().ok_or_else(empty)?;
        let max = find_extremum(
            observed.iter().map(|(reading, _)| *reading),
            Extremum::Max,
            |r| r.precipitation.unwrap_or_default(),
        )
        .ok_or_else(empty)?;

        let daily = group_by_day(observed.iter().map(|(r, value)| (r.timestamp, *value)));
        let days_with_precipitation = daily.values().filter(|day| day.sum > 0.0).count();
        let total_by_day = daily
            .iter()
            .map(|(day, day_total)| {
                (
                    format_date(day),
                    round_to(day_total.sum, PRECIPITATION_DECIMALS),
                )
            })
            .collect();

        Ok(PrecipitationReport {
            total: round_to(overall.sum, PRECIPITATION_DECIMALS),
            total_by_day,
            days_with_precipitation,
            max: PrecipitationExtremum {
                value: round_to(
                    max.precipitation.unwrap_or_default(),
                    PRECIPITATION_DECIMALS,
                ),
                date: format_date(&max.day()),
            },
            average: round_to(average, PRECIPITATION_DECIMALS),
        })
    }
}

/// Temperature and precipitation statistics of one locality.
///
/// Fails as soon as either part fails; no partial report is produced.
pub struct Location {}

impl Operation for Location {
    type Report = LocationReport;
    const NAME: &'static str = "location";

    fn execute(
        readings: &[Reading],
        thresholds: &Thresholds,
    ) -> Result<LocationReport, WeatherStatsError> {
        Ok(LocationReport {
            temperature: Temperature::execute(readings, thresholds)?,
            precipitation: Precipitation::execute(readings, thresholds)?,
        })
    }
}

/// Display name used for a locality whose name can no longer be resolved.
pub fn fallback_name(locality_id: LocalityId) -> String {
    format!("ID_{}", locality_id)
}

/// Compute [Location] statistics for every locality present in `readings`.
///
/// Each locality's statistics cover only its own readings. The report is keyed by the display
/// name returned by `resolve_name`; a locality that no longer exists
/// ([WeatherStatsError::NameResolution]) is reported under [fallback_name] instead of failing the
/// whole call. Any other resolver error is returned.
///
/// Resolved names take precedence over fallback names. A fallback name that matches a resolved
/// name (a locality literally called `ID_7`, say) is left out of the report with a warning, as is
/// any later locality resolving to a name already present.
///
/// # Arguments
///
/// * `readings`: Readings of any number of localities. Must not be empty.
/// * `thresholds`: Temperature bounds for threshold-crossing counts
/// * `resolve_name`: Maps a locality id to its display name
pub fn summarize_general<F>(
    readings: &[Reading],
    thresholds: &Thresholds,
    resolve_name: F,
) -> Result<GeneralReport, WeatherStatsError>
where
    F: Fn(LocalityId) -> Result<String, WeatherStatsError>,
{
    if readings.is_empty() {
        return Err(WeatherStatsError::EmptyInput {
            operation: "general",
        });
    }
    let mut report = GeneralReport::new();
    let mut unresolved = Vec::new();
    for (locality_id, partition) in partition_by_locality(readings) {
        match resolve_name(locality_id) {
            Ok(name) => {
                let location = Location::execute(&partition, thresholds)?;
                insert_location(&mut report, name, locality_id, location);
            }
            Err(WeatherStatsError::NameResolution { locality_id }) => {
                tracing::warn!(%locality_id, "locality no longer exists, using fallback name");
                let location = Location::execute(&partition, thresholds)?;
                unresolved.push((locality_id, location));
            }
            Err(error) => return Err(error),
        }
    }
    for (locality_id, location) in unresolved {
        insert_location(&mut report, fallback_name(locality_id), locality_id, location);
    }
    Ok(report)
}

/// Add `location` to `report` under `name` unless the name is already taken.
fn insert_location(
    report: &mut GeneralReport,
    name: String,
    locality_id: LocalityId,
    location: LocationReport,
) {
    match report.entry(name) {
        Entry::Vacant(entry) => {
            entry.insert(location);
        }
        Entry::Occupied(entry) => {
            tracing::warn!(
                %locality_id,
                name = %entry.key(),
                "report name already taken, leaving locality out of general statistics"
            );
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use crate::test_utils::{self, reading, reading_at};

    fn thresholds() -> Thresholds {
        Thresholds::new(14.0, 9.0)
    }

    fn city_name(locality_id: LocalityId) -> Result<String, WeatherStatsError> {
        match locality_id.0 {
            99 => Err(WeatherStatsError::NameResolution { locality_id }),
            id => Ok(format!("City{}", id)),
        }
    }

    #[test]
    fn temperature_end_to_end() {
        let readings = test_utils::get_test_readings();
        let report = Temperature::execute(&readings, &thresholds()).unwrap();
        assert_eq!(11.0, report.average);
        assert_eq!(15.0, report.max.value);
        assert_eq!("2025-10-01T01:00", report.max.date_time);
        assert_eq!(8.0, report.min.value);
        assert_eq!("2025-10-02T00:00", report.min.date_time);
        assert_eq!(1, report.hours_above_threshold);
        assert_eq!(1, report.hours_below_threshold);
        let days: Vec<(&str, f64)> = report
            .average_by_day
            .iter()
            .map(|(day, mean)| (day.as_str(), *mean))
            .collect();
        assert_eq!(vec![("2025-10-01", 12.5), ("2025-10-02", 8.0)], days);
    }

    #[test]
    fn temperature_single_reading() {
        let readings = vec![reading(-3.25, None, "2025-01-05T06:00")];
        let report = Temperature::execute(&readings, &thresholds()).unwrap();
        assert_eq!(report.average, report.max.value);
        assert_eq!(report.average, report.min.value);
        assert_eq!(-3.2, report.average);
    }

    #[test]
    fn temperature_max_tie_first_wins() {
        let readings = vec![
            reading(12.0, None, "2025-10-01T00:00"),
            reading(20.0, None, "2025-10-01T05:00"),
            reading(20.0, None, "2025-10-01T03:00"),
        ];
        let report = Temperature::execute(&readings, &thresholds()).unwrap();
        assert_eq!("2025-10-01T05:00", report.max.date_time);
    }

    #[test]
    fn temperature_min_tie_first_wins() {
        let readings = vec![
            reading(1.0, None, "2025-10-02T00:00"),
            reading(1.0, None, "2025-10-01T00:00"),
        ];
        let report = Temperature::execute(&readings, &thresholds()).unwrap();
        assert_eq!("2025-10-02T00:00", report.min.date_time);
    }

    #[test]
    fn temperature_thresholds_are_strict() {
        let readings = vec![
            reading(14.0, None, "2025-10-01T00:00"),
            reading(9.0, None, "2025-10-01T01:00"),
            reading(14.1, None, "2025-10-01T02:00"),
        ];
        let report = Temperature::execute(&readings, &thresholds()).unwrap();
        assert_eq!(1, report.hours_above_threshold);
        assert_eq!(0, report.hours_below_threshold);
        assert!(report.hours_above_threshold + report.hours_below_threshold < readings.len());
    }

    #[test]
    fn temperature_inverted_thresholds() {
        let readings = test_utils::get_test_readings();
        let report = Temperature::execute(&readings, &Thresholds::new(0.0, 100.0)).unwrap();
        assert_eq!(3, report.hours_above_threshold);
        assert_eq!(3, report.hours_below_threshold);
    }

    #[test]
    fn temperature_average_rounded() {
        let readings = vec![
            reading(10.0, None, "2025-10-01T00:00"),
            reading(10.0, None, "2025-10-01T01:00"),
            reading(10.1, None, "2025-10-01T02:00"),
        ];
        let report = Temperature::execute(&readings, &thresholds()).unwrap();
        assert_eq!(10.0, report.average);
        assert_eq!(10.0, report.average_by_day["2025-10-01"]);
    }

    #[test]
    fn temperature_average_rounds_stored_value() {
        // (20.1 + 20.2) / 2 is stored as 20.1499.. and (1.0 + 1.1) / 2 as 1.0500..
        let readings = vec![
            reading(20.1, None, "2025-10-01T00:00"),
            reading(20.2, None, "2025-10-01T01:00"),
        ];
        let report = Temperature::execute(&readings, &thresholds()).unwrap();
        assert_eq!(20.1, report.average);
        assert_eq!(Some(&20.1), report.average_by_day.get("2025-10-01"));

        let readings = vec![
            reading(1.0, None, "2025-10-01T00:00"),
            reading(1.1, None, "2025-10-01T01:00"),
        ];
        let report = Temperature::execute(&readings, &thresholds()).unwrap();
        assert_eq!(1.1, report.average);
    }

    #[test]
    fn temperature_empty() {
        let error = Temperature::execute(&[], &thresholds()).unwrap_err();
        assert!(matches!(
            error,
            WeatherStatsError::EmptyInput {
                operation: "temperature"
            }
        ));
    }

    #[test]
    fn precipitation_end_to_end() {
        let readings = test_utils::get_test_readings();
        let report = Precipitation::execute(&readings, &thresholds()).unwrap();
        assert_eq!(3.5, report.total);
        assert_eq!(2, report.days_with_precipitation);
        assert_eq!(2.5, report.max.value);
        assert_eq!("2025-10-01", report.max.date);
        assert_eq!(1.17, report.average);
        assert_eq!(2.5, report.total_by_day["2025-10-01"]);
        assert_eq!(1.0, report.total_by_day["2025-10-02"]);
    }

    #[test]
    fn precipitation_excludes_null() {
        let readings = vec![
            reading(10.0, None, "2025-10-01T00:00"),
            reading(10.0, Some(1.0), "2025-10-01T01:00"),
            reading(10.0, Some(2.0), "2025-10-01T02:00"),
        ];
        let report = Precipitation::execute(&readings, &thresholds()).unwrap();
        assert_eq!(3.0, report.total);
        assert_eq!(1.5, report.average);
    }

    #[test]
    fn precipitation_null_only_day_is_absent() {
        let readings = vec![
            reading(10.0, None, "2025-10-01T00:00"),
            reading(10.0, Some(0.4), "2025-10-02T00:00"),
        ];
        let report = Precipitation::execute(&readings, &thresholds()).unwrap();
        let days: Vec<&String> = report.total_by_day.keys().collect();
        assert_eq!(vec!["2025-10-02"], days);
    }

    #[test]
    fn precipitation_dry_days_not_counted() {
        let readings = vec![
            reading(10.0, Some(0.0), "2025-10-01T00:00"),
            reading(10.0, Some(0.0), "2025-10-01T01:00"),
            reading(10.0, Some(0.5), "2025-10-02T00:00"),
        ];
        let report = Precipitation::execute(&readings, &thresholds()).unwrap();
        assert_eq!(1, report.days_with_precipitation);
        assert_eq!(0.0, report.total_by_day["2025-10-01"]);
    }

    #[test]
    fn precipitation_max_tie_first_wins() {
        let readings = vec![
            reading(10.0, Some(3.0), "2025-10-03T00:00"),
            reading(10.0, Some(3.0), "2025-10-01T00:00"),
        ];
        let report = Precipitation::execute(&readings, &thresholds()).unwrap();
        assert_eq!("2025-10-03", report.max.date);
    }

    #[test]
    fn precipitation_all_null() {
        let readings = vec![
            reading(10.0, None, "2025-10-01T00:00"),
            reading(11.0, None, "2025-10-01T01:00"),
        ];
        let error = Precipitation::execute(&readings, &thresholds()).unwrap_err();
        assert!(matches!(
            error,
            WeatherStatsError::EmptyInput {
                operation: "precipitation"
            }
        ));
    }

    #[test]
    fn precipitation_empty() {
        assert!(Precipitation::execute(&[], &thresholds()).is_err());
    }

    #[test]
    fn location_composes() {
        let readings = test_utils::get_test_readings();
        let report = Location::execute(&readings, &thresholds()).unwrap();
        assert_eq!(
            Temperature::execute(&readings, &thresholds()).unwrap(),
            report.temperature
        );
        assert_eq!(
            Precipitation::execute(&readings, &thresholds()).unwrap(),
            report.precipitation
        );
    }

    #[test]
    fn location_propagates_precipitation_error() {
        let readings = vec![reading(10.0, None, "2025-10-01T00:00")];
        let error = Location::execute(&readings, &thresholds()).unwrap_err();
        assert!(matches!(
            error,
            WeatherStatsError::EmptyInput {
                operation: "precipitation"
            }
        ));
    }

    #[test]
    fn general_partition_scoped() {
        let readings = vec![
            reading_at(1, 10.0, Some(0.5), "2025-10-01T00:00"),
            reading_at(2, 14.0, Some(1.0), "2025-10-01T00:00"),
            reading_at(1, 12.0, Some(0.0), "2025-10-02T00:00"),
        ];
        let report = summarize_general(&readings, &Thresholds::new(18.0, 9.0), city_name).unwrap();
        let names: Vec<&String> = report.keys().collect();
        assert_eq!(vec!["City1", "City2"], names);
        assert_eq!(11.0, report["City1"].temperature.average);
        assert_eq!(0.5, report["City1"].precipitation.total);
        assert_eq!(14.0, report["City2"].temperature.average);
        assert_eq!(1.0, report["City2"].precipitation.total);
    }

    #[test]
    fn general_unresolvable_locality() {
        let readings = vec![
            reading_at(99, 10.0, Some(0.5), "2025-10-01T00:00"),
            reading_at(3, 14.0, Some(1.0), "2025-10-01T00:00"),
        ];
        let report = summarize_general(&readings, &thresholds(), city_name).unwrap();
        assert!(report.contains_key("ID_99"));
        assert!(report.contains_key("City3"));
        assert_eq!(10.0, report["ID_99"].temperature.average);
    }

    #[test]
    fn general_fallback_name_does_not_replace_resolved_name() {
        let readings = vec![
            reading_at(1, 10.0, Some(0.5), "2025-10-01T00:00"),
            reading_at(2, 20.0, Some(1.0), "2025-10-01T00:00"),
        ];
        // Locality 1 is gone and locality 2 happens to be called "ID_1".
        let report = summarize_general(&readings, &thresholds(), |locality_id| {
            match locality_id.0 {
                1 => Err(WeatherStatsError::NameResolution { locality_id }),
                _ => Ok("ID_1".to_string()),
            }
        })
        .unwrap();
        assert_eq!(1, report.len());
        assert_eq!(20.0, report["ID_1"].temperature.average);
    }

    #[test]
    fn general_duplicate_resolved_name_keeps_first() {
        let readings = vec![
            reading_at(1, 10.0, Some(0.5), "2025-10-01T00:00"),
            reading_at(2, 20.0, Some(1.0), "2025-10-01T00:00"),
        ];
        let report =
            summarize_general(&readings, &thresholds(), |_| Ok("Sevilla".to_string())).unwrap();
        assert_eq!(1, report.len());
        assert_eq!(10.0, report["Sevilla"].temperature.average);
    }

    #[test]
    fn general_resolver_failure_propagates() {
        let readings = test_utils::get_test_readings();
        let result = summarize_general(&readings, &thresholds(), |_| {
            Err(WeatherStatsError::Storage(sled::Error::Unsupported(
                "closed".to_string(),
            )))
        });
        assert!(matches!(result, Err(WeatherStatsError::Storage(_))));
    }

    #[test]
    fn general_partition_error_fails_call() {
        let readings = vec![
            reading_at(1, 10.0, Some(0.5), "2025-10-01T00:00"),
            reading_at(2, 14.0, None, "2025-10-01T00:00"),
        ];
        let error = summarize_general(&readings, &thresholds(), city_name).unwrap_err();
        assert!(matches!(
            error,
            WeatherStatsError::EmptyInput {
                operation: "precipitation"
            }
        ));
    }

    #[test]
    fn general_empty() {
        let error = summarize_general(&[], &thresholds(), city_name).unwrap_err();
        assert!(matches!(
            error,
            WeatherStatsError::EmptyInput {
                operation: "general"
            }
        ));
    }
}
