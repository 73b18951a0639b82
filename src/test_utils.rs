use crate::models::*;
use crate::types::{LocalityId, Reading};

use chrono::{NaiveDate, NaiveDateTime};

/// Create a TemperatureRequest with thresholds high=14 and low=9.
pub(crate) fn get_test_temperature_request() -> TemperatureRequest {
    TemperatureRequest {
        city_name: "Madrid".to_string(),
        start_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 10, 2).unwrap(),
        threshold_high: 14.0,
        threshold_low: 9.0,
    }
}

/// Parse a `YYYY-MM-DDTHH:MM` timestamp.
pub(crate) fn timestamp(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").unwrap()
}

/// Create a reading for locality 1.
pub(crate) fn reading(temperature: f64, precipitation: Option<f64>, at: &str) -> Reading {
    Reading::new(temperature, precipitation, timestamp(at), LocalityId(1))
}

/// Create a reading for the given locality.
pub(crate) fn reading_at(
    locality_id: u64,
    temperature: f64,
    precipitation: Option<f64>,
    at: &str,
) -> Reading {
    Reading::new(
        temperature,
        precipitation,
        timestamp(at),
        LocalityId(locality_id),
    )
}

/// Three readings over two days:
/// (10.0, 0.0, 10-01 00:00), (15.0, 2.5, 10-01 01:00), (8.0, 1.0, 10-02 00:00).
pub(crate) fn get_test_readings() -> Vec<Reading> {
    vec![
        reading(10.0, Some(0.0), "2025-10-01T00:00"),
        reading(15.0, Some(2.5), "2025-10-01T01:00"),
        reading(8.0, Some(1.0), "2025-10-02T00:00"),
    ]
}

/// Spawn a local stand-in for the Open-Meteo geocoding and archive APIs.
///
/// Geocoding knows only "Madrid" and "Sevilla". The archive returns three hours of
/// 2025-10-01 regardless of the query, with a missing temperature at 01:00. Any request for
/// "Error" answers with 503.
///
/// Returns the geocoding and archive endpoint URLs.
pub(crate) async fn spawn_open_meteo_mock() -> (url::Url, url::Url) {
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use std::collections::HashMap;

    async fn search(
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<Json<serde_json::Value>, StatusCode> {
        let coordinates = match params.get("name").map(String::as_str) {
            Some("Madrid") => (40.4165, -3.70256),
            Some("Sevilla") => (37.38283, -5.97317),
            Some("Error") => return Err(StatusCode::SERVICE_UNAVAILABLE),
            _ => return Ok(Json(serde_json::json!({"generationtime_ms": 0.2}))),
        };
        assert_eq!(Some("1"), params.get("count").map(String::as_str));
        assert_eq!(Some("json"), params.get("format").map(String::as_str));
        Ok(Json(serde_json::json!({
            "results": [{
                "name": params["name"],
                "latitude": coordinates.0,
                "longitude": coordinates.1,
                "elevation": 600.0
            }]
        })))
    }

    async fn archive(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
        assert_eq!(
            Some("temperature_2m,precipitation"),
            params.get("hourly").map(String::as_str)
        );
        Json(serde_json::json!({
            "hourly": {
                "time": ["2025-10-01T00:00", "2025-10-01T01:00", "2025-10-01T02:00"],
                "temperature_2m": [15.5, null, 14.0],
                "precipitation": [0.0, 0.3, 1.2]
            }
        }))
    }

    let router = Router::new()
        .route("/v1/search", get(search))
        .route("/v1/archive", get(archive));
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(router.into_make_service()),
    );
    (
        format!("http://{addr}/v1/search").parse().unwrap(),
        format!("http://{addr}/v1/archive").parse().unwrap(),
    )
}
