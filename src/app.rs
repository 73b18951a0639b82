//! Active weather statistics server API

use crate::app_state::{task_limit, AppState, SharedAppState};
use crate::cli::CommandLineArgs;
use crate::error::WeatherStatsError;
use crate::ingestion;
use crate::metrics::{metrics_handler, record_response_metrics, request_counter};
use crate::models;
use crate::operation::{Operation, Thresholds};
use crate::operations;
use crate::storage::{ReadingFilter, ReadingStore};
use crate::types::{Locality, Reading};
use crate::validated_json::ValidatedJson;

use axum::{
    extract::{Json, State},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

/// Application service type.
pub type Service = NormalizePath<Router>;

/// Initialise the application.
///
/// Sizes the global Rayon pool when Rayon is used for aggregation.
pub fn init(args: &CommandLineArgs) {
    if args.use_rayon {
        if let Err(err) = rayon::ThreadPoolBuilder::new()
            .num_threads(task_limit(args))
            .build_global()
        {
            tracing::warn!("failed to configure Rayon thread pool: {}", err);
        }
    }
}

/// Returns a [axum::Router] for the weather statistics API.
///
/// The router is populated with all routes as well as the following middleware:
///
/// * a [tower_http::trace::TraceLayer] for tracing requests and responses, which also feeds the
///   Prometheus request and response metrics
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn router(state: SharedAppState) -> Router {
    fn v1(state: SharedAppState) -> Router {
        Router::new()
            .route("/weather_data", post(ingest_handler))
            .route("/temperature", post(temperature_handler))
            .route("/precipitation", post(precipitation_handler))
            .route("/general_statistics", post(general_statistics_handler))
            .route("/localities", get(localities_handler))
            .with_state(state)
    }

    Router::new()
        .route("/metrics", get(metrics_handler))
        .nest("/v1", v1(state))
        .layer(
            TraceLayer::new_for_http()
                .on_request(request_counter)
                .on_response(record_response_metrics),
        )
}

/// Returns an [axum::Router] wrapped in a [tower_http::normalize_path::NormalizePath] layer,
/// so that trailing slashes on request paths are ignored.
///
/// # Arguments
///
/// * `args`: Command line arguments
pub fn service(args: &CommandLineArgs) -> Result<Service, WeatherStatsError> {
    let state = Arc::new(AppState::new(args)?);
    let router = router(state);
    Ok(NormalizePathLayer::trim_trailing_slash().layer(router))
}

/// Run a CPU-bound aggregation.
///
/// The closure runs on the Rayon pool if enabled, otherwise inline once a task permit has been
/// acquired.
async fn run_aggregation<F, R>(state: &AppState, f: F) -> Result<R, WeatherStatsError>
where
    F: FnOnce() -> Result<R, WeatherStatsError> + Send + 'static,
    R: Send + 'static,
{
    if state.args.use_rayon {
        tokio_rayon::spawn(f).await
    } else {
        let _task_permit = state.resource_manager.task().await?;
        f()
    }
}

/// Execute operation `T` over the readings of one locality.
async fn locality_operation<T>(
    state: &AppState,
    city_name: &str,
    (start, end): (chrono::NaiveDateTime, chrono::NaiveDateTime),
    thresholds: Thresholds,
) -> Result<T::Report, WeatherStatsError>
where
    T: Operation + 'static,
{
    let filter = ReadingFilter::locality_in_range(city_name, start, end);
    let readings: Vec<Reading> = state.store.readings(&filter)?;
    tracing::debug!(city_name, readings = readings.len(), operation = T::NAME);
    run_aggregation(state, move || T::execute(&readings, &thresholds)).await
}

/// Handler for ingesting the hourly history of a city.
#[tracing::instrument(level = "DEBUG", skip(state))]
async fn ingest_handler(
    State(state): State<SharedAppState>,
    ValidatedJson(request): ValidatedJson<models::IngestRequest>,
) -> Result<Json<models::IngestSummary>, WeatherStatsError> {
    let _conn_permit = state.resource_manager.upstream_connection().await?;
    let summary = ingestion::ingest(&state.source, &state.store, &request).await?;
    Ok(Json(summary))
}

/// Handler for temperature statistics of one locality.
#[tracing::instrument(level = "DEBUG", skip(state))]
async fn temperature_handler(
    State(state): State<SharedAppState>,
    ValidatedJson(request): ValidatedJson<models::TemperatureRequest>,
) -> Result<Json<models::TemperatureResponse>, WeatherStatsError> {
    let temperature = locality_operation::<operations::Temperature>(
        &state,
        &request.city_name,
        models::day_range(request.start_date, request.end_date),
        request.thresholds(),
    )
    .await?;
    Ok(Json(models::TemperatureResponse { temperature }))
}

/// Handler for precipitation statistics of one locality.
#[tracing::instrument(level = "DEBUG", skip(state))]
async fn precipitation_handler(
    State(state): State<SharedAppState>,
    ValidatedJson(request): ValidatedJson<models::PrecipitationRequest>,
) -> Result<Json<models::PrecipitationResponse>, WeatherStatsError> {
    // Thresholds only affect temperature statistics.
    let thresholds = Thresholds::new(f64::INFINITY, f64::NEG_INFINITY);
    let precipitation = locality_operation::<operations::Precipitation>(
        &state,
        &request.city_name,
        models::day_range(request.start_date, request.end_date),
        thresholds,
    )
    .await?;
    Ok(Json(models::PrecipitationResponse { precipitation }))
}

/// Handler for statistics of every stored locality.
#[tracing::instrument(level = "DEBUG", skip(state))]
async fn general_statistics_handler(
    State(state): State<SharedAppState>,
    ValidatedJson(request): ValidatedJson<models::GeneralStatisticsRequest>,
) -> Result<Json<models::GeneralReport>, WeatherStatsError> {
    let filter = ReadingFilter {
        locality: None,
        range: request.range(),
    };
    let readings = state.store.readings(&filter)?;
    let thresholds = request.thresholds();
    let store = state.store.clone();
    let report = run_aggregation(&state, move || {
        operations::summarize_general(&readings, &thresholds, |locality_id| {
            store.locality_name(locality_id)
        })
    })
    .await?;
    Ok(Json(report))
}

/// Handler listing the stored localities.
async fn localities_handler(
    State(state): State<SharedAppState>,
) -> Result<Json<Vec<Locality>>, WeatherStatsError> {
    Ok(Json(state.store.localities()?))
}
