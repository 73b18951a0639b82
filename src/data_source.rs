//! Retrieval of coordinates and hourly history from a weather service.

use crate::cli::CommandLineArgs;
use crate::error::WeatherStatsError;
use crate::grouping::DATE_TIME_FORMAT;
use crate::types::Coordinates;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use url::Url;

/// Hourly temperature and precipitation samples, aligned by index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HourlySeries {
    pub time: Vec<NaiveDateTime>,
    pub temperature: Vec<Option<f64>>,
    pub precipitation: Vec<Option<f64>>,
}

impl HourlySeries {
    /// Check that the three arrays line up and return the series.
    pub fn new(
        time: Vec<NaiveDateTime>,
        temperature: Vec<Option<f64>>,
        precipitation: Vec<Option<f64>>,
    ) -> Result<Self, WeatherStatsError> {
        if time.len() != temperature.len() || time.len() != precipitation.len() {
            return Err(WeatherStatsError::MalformedSeries {
                times: time.len(),
                temperatures: temperature.len(),
                precipitations: precipitation.len(),
            });
        }
        Ok(Self {
            time,
            temperature,
            precipitation,
        })
    }

    /// Iterate over `(timestamp, temperature, precipitation)` samples.
    pub fn samples(&self) -> impl Iterator<Item = (NaiveDateTime, Option<f64>, Option<f64>)> + '_ {
        self.time
            .iter()
            .zip(self.temperature.iter())
            .zip(self.precipitation.iter())
            .map(|((time, temperature), precipitation)| (*time, *temperature, *precipitation))
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Weather source trait.
///
/// Defines the interface used by ingestion to look up a city and fetch its history.
pub trait WeatherSource {
    /// Resolve a city name to coordinates.
    ///
    /// Returns `None` if the service knows no such city.
    fn coordinates(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Option<Coordinates>, WeatherStatsError>> + Send;

    /// Fetch hourly samples for every hour of the days from `start` to `end` inclusive.
    fn hourly_series(
        &self,
        coordinates: &Coordinates,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl std::future::Future<Output = Result<HourlySeries, WeatherStatsError>> + Send;
}

/// Geocoding query parameters.
#[derive(Serialize)]
struct GeocodingQuery<'a> {
    name: &'a str,
    count: u8,
    language: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    elevation: Option<f64>,
}

impl GeocodingResponse {
    /// Coordinates of the first match.
    fn into_coordinates(self) -> Option<Coordinates> {
        self.results.into_iter().next().map(|result| Coordinates {
            latitude: result.latitude,
            longitude: result.longitude,
            elevation: result.elevation,
        })
    }
}

/// Archive query parameters.
#[derive(Serialize)]
struct ArchiveQuery<'a> {
    latitude: f64,
    longitude: f64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    hourly: &'a str,
    timezone: &'a str,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    hourly: ArchiveHourly,
}

#[derive(Debug, Deserialize)]
struct ArchiveHourly {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    precipitation: Vec<Option<f64>>,
}

impl TryFrom<ArchiveHourly> for HourlySeries {
    type Error = WeatherStatsError;

    fn try_from(hourly: ArchiveHourly) -> Result<Self, Self::Error> {
        let time = hourly
            .time
            .iter()
            .map(|t| NaiveDateTime::parse_from_str(t, DATE_TIME_FORMAT))
            .collect::<Result<Vec<_>, _>>()?;
        HourlySeries::new(time, hourly.temperature_2m, hourly.precipitation)
    }
}

/// Open-Meteo client.
///
/// Implements [WeatherSource] using the Open-Meteo geocoding and historical archive APIs.
#[derive(Clone, Debug)]
pub struct OpenMeteoClient {
    reqwest_client: reqwest::Client,
    geocoding_url: Url,
    archive_url: Url,
    language: String,
    timezone: String,
}

impl OpenMeteoClient {
    /// Create a new Open-Meteo client.
    ///
    /// # Arguments
    ///
    /// * `geocoding_url`: Endpoint of the geocoding search API
    /// * `archive_url`: Endpoint of the historical archive API
    /// * `language`: Language of geocoding results
    /// * `timezone`: Timezone in which the archive reports local hours
    pub fn new(geocoding_url: Url, archive_url: Url, language: &str, timezone: &str) -> Self {
        Self {
            reqwest_client: reqwest::Client::new(),
            geocoding_url,
            archive_url,
            language: language.to_string(),
            timezone: timezone.to_string(),
        }
    }

    /// Create a client configured from command line arguments.
    pub fn from_args(args: &CommandLineArgs) -> Self {
        Self::new(
            args.geocoding_url.clone(),
            args.archive_url.clone(),
            &args.language,
            &args.timezone,
        )
    }

    async fn get_json<Q, T>(&self, url: &Url, query: &Q) -> Result<T, WeatherStatsError>
    where
        Q: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .reqwest_client
            .get(url.as_str())
            .query(query)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(WeatherStatsError::UpstreamStatus {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}

impl WeatherSource for OpenMeteoClient {
    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn coordinates(&self, name: &str) -> Result<Option<Coordinates>, WeatherStatsError> {
        let query = GeocodingQuery {
            name,
            count: 1,
            language: &self.language,
            format: "json",
        };
        let response: GeocodingResponse = self.get_json(&self.geocoding_url, &query).await?;
        Ok(response.into_coordinates())
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn hourly_series(
        &self,
        coordinates: &Coordinates,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HourlySeries, WeatherStatsError> {
        let query = ArchiveQuery {
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            start_date: start,
            end_date: end,
            hourly: "temperature_2m,precipitation",
            timezone: &self.timezone,
        };
        let response: ArchiveResponse = self.get_json(&self.archive_url, &query).await?;
        response.hourly.try_into()
    }
}
