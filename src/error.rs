//! Error handling.

use axum::{
    extract::rejection::JsonRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tokio::sync::AcquireError;
use tracing::{event, Level};

use crate::types::LocalityId;

/// Weather statistics server error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum WeatherStatsError {
    /// Attempt to aggregate an empty set of readings
    #[error("cannot compute {operation} statistics from an empty set of readings")]
    EmptyInput { operation: &'static str },

    /// Geocoding returned no match for a city name
    #[error("no coordinates found for city {name}")]
    UnknownCity { name: String },

    /// A locality name that is not in the store
    #[error("unknown locality {name}")]
    UnknownLocality { name: String },

    /// A locality id that is no longer in the store
    #[error("no locality with id {locality_id}")]
    NameResolution { locality_id: LocalityId },

    /// A locality with the same name is already stored
    #[error("locality {name} already exists")]
    DuplicateLocality { name: String },

    /// A reading for the same locality and timestamp is already stored
    #[error("reading for locality {locality_id} at {timestamp} already exists")]
    DuplicateReading {
        locality_id: LocalityId,
        timestamp: String,
    },

    /// Hourly series whose arrays do not line up
    #[error(
        "hourly series is malformed (time: {times}, temperature: {temperatures}, precipitation: {precipitations})"
    )]
    MalformedSeries {
        times: usize,
        temperatures: usize,
        precipitations: usize,
    },

    /// Error deserialising request data
    #[error("request data is not valid")]
    RequestDataJsonRejection(#[from] JsonRejection),

    /// Error validating request data
    #[error("request data is not valid")]
    RequestDataValidation(#[from] validator::ValidationErrors),

    /// Error sending a request to, or decoding a response from, the weather service
    #[error("error requesting data from the weather service")]
    Upstream(#[from] reqwest::Error),

    /// The weather service responded with a non-success status
    #[error("weather service responded with status {status}")]
    UpstreamStatus { status: u16 },

    /// A timestamp from the weather service could not be parsed
    #[error("failed to parse timestamp from the weather service")]
    TimestampParse(#[from] chrono::ParseError),

    /// Error in the embedded database
    #[error("storage error")]
    Storage(#[from] sled::Error),

    /// Error (de)serialising a stored record
    #[error("failed to serialise or deserialise stored record")]
    Serialization(#[from] serde_json::Error),

    /// Error acquiring a semaphore
    #[error("error acquiring resources")]
    SemaphoreAcquireError(#[from] AcquireError),

    /// Error converting between integer types
    #[error(transparent)]
    TryFromInt(#[from] std::num::TryFromIntError),
}

impl IntoResponse for WeatherStatsError {
    /// Convert from a `WeatherStatsError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut causes = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            causes.push(source.to_string());
            current = source.source();
        }
        causes.dedup();
        let caused_by = if causes.is_empty() {
            None
        } else {
            Some(causes)
        };
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }
}

impl From<WeatherStatsError> for ErrorResponse {
    /// Convert from a `WeatherStatsError` into an `ErrorResponse`.
    fn from(error: WeatherStatsError) -> Self {
        let status = match &error {
            WeatherStatsError::EmptyInput { .. }
            | WeatherStatsError::MalformedSeries { .. }
            | WeatherStatsError::RequestDataJsonRejection(_)
            | WeatherStatsError::RequestDataValidation(_) => StatusCode::BAD_REQUEST,

            WeatherStatsError::UnknownCity { .. }
            | WeatherStatsError::UnknownLocality { .. }
            | WeatherStatsError::NameResolution { .. } => StatusCode::NOT_FOUND,

            WeatherStatsError::DuplicateLocality { .. }
            | WeatherStatsError::DuplicateReading { .. } => StatusCode::CONFLICT,

            WeatherStatsError::Upstream(_)
            | WeatherStatsError::UpstreamStatus { .. }
            | WeatherStatsError::TimestampParse(_) => StatusCode::BAD_GATEWAY,

            WeatherStatsError::Storage(_)
            | WeatherStatsError::Serialization(_)
            | WeatherStatsError::SemaphoreAcquireError(_)
            | WeatherStatsError::TryFromInt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let response = Self::new(status, &error);

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
