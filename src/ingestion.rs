//! Ingestion of hourly history from a [WeatherSource] into a [ReadingStore].

use crate::data_source::WeatherSource;
use crate::error::WeatherStatsError;
use crate::grouping::format_date_time;
use crate::metrics::INGESTED_READINGS;
use crate::models::{IngestRequest, IngestSummary};
use crate::storage::ReadingStore;
use crate::types::{Coordinates, Locality, Reading};

/// Fetch and store the hourly history of a city.
///
/// The city is geocoded, its history fetched for the requested days and each sample stored as a
/// [Reading] against the locality of the same name, which is created on first use.
///
/// Samples without a temperature and samples already stored are skipped, with a message in the
/// summary for each. Any other storage error aborts the ingestion; readings stored before the
/// error are kept.
///
/// # Arguments
///
/// * `source`: Weather service to query
/// * `store`: Store to write to
/// * `request`: City and days to ingest
#[tracing::instrument(level = "DEBUG", skip(source, store))]
pub async fn ingest<S, R>(
    source: &S,
    store: &R,
    request: &IngestRequest,
) -> Result<IngestSummary, WeatherStatsError>
where
    S: WeatherSource,
    R: ReadingStore,
{
    let coordinates = source
        .coordinates(&request.city_name)
        .await?
        .ok_or_else(|| WeatherStatsError::UnknownCity {
            name: request.city_name.clone(),
        })?;
    let series = source
        .hourly_series(&coordinates, request.start_date, request.end_date)
        .await?;
    let locality = locality_for(store, &request.city_name, &coordinates)?;

    let mut inserted = 0;
    let mut messages = Vec::new();
    for (timestamp, temperature, precipitation) in series.samples() {
        let Some(temperature) = temperature else {
            messages.push(format!(
                "skipped reading at {}: temperature missing",
                format_date_time(&timestamp)
            ));
            continue;
        };
        let reading = Reading::new(temperature, precipitation, timestamp, locality.id);
        match store.insert_reading(&reading) {
            Ok(()) => inserted += 1,
            Err(error @ WeatherStatsError::DuplicateReading { .. }) => {
                messages.push(format!("skipped {}", error))
            }
            Err(error) => return Err(error),
        }
    }

    INGESTED_READINGS.inc_by(inserted as u64);
    tracing::info!(
        locality = %locality.name,
        inserted,
        skipped = messages.len(),
        "ingested hourly history"
    );
    Ok(IngestSummary {
        locality,
        inserted,
        skipped: messages.len(),
        messages,
    })
}

/// Return the stored locality named `name`, inserting it if there is none.
fn locality_for<R: ReadingStore>(
    store: &R,
    name: &str,
    coordinates: &Coordinates,
) -> Result<Locality, WeatherStatsError> {
    if let Some(locality) = store.locality_by_name(name)? {
        return Ok(locality);
    }
    match store.insert_locality(name, coordinates) {
        Ok(locality) => Ok(locality),
        // Lost a race with a concurrent ingestion of the same city.
        Err(WeatherStatsError::DuplicateLocality { .. }) => store
            .locality_by_name(name)?
            .ok_or_else(|| WeatherStatsError::UnknownLocality {
                name: name.to_string(),
            }),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::data_source::HourlySeries;
    use crate::storage::{ReadingFilter, SledStore};
    use crate::test_utils::timestamp;

    use chrono::NaiveDate;

    /// Weather source returning canned data.
    struct StubSource {
        coordinates: Option<Coordinates>,
        series: HourlySeries,
    }

    impl WeatherSource for StubSource {
        async fn coordinates(&self, _name: &str) -> Result<Option<Coordinates>, WeatherStatsError> {
            Ok(self.coordinates)
        }

        async fn hourly_series(
            &self,
            _coordinates: &Coordinates,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<HourlySeries, WeatherStatsError> {
            Ok(self.series.clone())
        }
    }

    fn stub_source() -> StubSource {
        StubSource {
            coordinates: Some(Coordinates::new(39.4699, -0.3763)),
            series: HourlySeries::new(
                vec![
                    timestamp("2025-10-01T00:00"),
                    timestamp("2025-10-01T01:00"),
                    timestamp("2025-10-01T02:00"),
                ],
                vec![Some(18.5), None, Some(17.9)],
                vec![Some(0.0), Some(0.4), None],
            )
            .unwrap(),
        }
    }

    fn request(city_name: &str) -> IngestRequest {
        IngestRequest {
            city_name: city_name.to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn ingest_stores_readings() {
        let store = SledStore::temporary().unwrap();
        let summary = ingest(&stub_source(), &store, &request("Valencia"))
            .await
            .unwrap();
        assert_eq!("Valencia", summary.locality.name);
        assert_eq!(39.4699, summary.locality.latitude);
        assert_eq!(2, summary.inserted);
        assert_eq!(1, summary.skipped);
        assert_eq!(
            vec!["skipped reading at 2025-10-01T01:00: temperature missing"],
            summary.messages
        );

        let readings = store.readings(&ReadingFilter::default()).unwrap();
        assert_eq!(2, readings.len());
        assert_eq!(18.5, readings[0].temperature);
        assert_eq!(Some(0.0), readings[0].precipitation);
        assert_eq!(None, readings[1].precipitation);
        assert_eq!(summary.locality.id, readings[1].locality_id);
    }

    #[tokio::test]
    async fn ingest_twice_skips_duplicates() {
        let store = SledStore::temporary().unwrap();
        let first = ingest(&stub_source(), &store, &request("Valencia"))
            .await
            .unwrap();
        let second = ingest(&stub_source(), &store, &request("Valencia"))
            .await
            .unwrap();
        assert_eq!(first.locality, second.locality);
        assert_eq!(0, second.inserted);
        assert_eq!(3, second.skipped);
        assert_eq!(
            format!(
                "skipped reading for locality {} at 2025-10-01T00:00 already exists",
                first.locality.id
            ),
            second.messages[0]
        );
        assert_eq!(1, store.localities().unwrap().len());
        assert_eq!(2, store.readings(&ReadingFilter::default()).unwrap().len());
    }

    #[tokio::test]
    async fn ingest_unknown_city() {
        let store = SledStore::temporary().unwrap();
        let source = StubSource {
            coordinates: None,
            series: HourlySeries::default(),
        };
        let error = ingest(&source, &store, &request("Atlantis"))
            .await
            .unwrap_err();
        assert_eq!("no coordinates found for city Atlantis", error.to_string());
        assert!(store.localities().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ingest_empty_series() {
        let store = SledStore::temporary().unwrap();
        let source = StubSource {
            coordinates: Some(Coordinates::new(40.0, -3.0)),
            series: HourlySeries::default(),
        };
        let summary = ingest(&source, &store, &request("Toledo")).await.unwrap();
        assert_eq!(0, summary.inserted);
        assert_eq!(0, summary.skipped);
        assert_eq!(1, store.localities().unwrap().len());
    }
}
