//! This crate provides a weather statistics server. It ingests hourly temperature and
//! precipitation history for named cities from the [Open-Meteo](https://open-meteo.com) archive,
//! stores it locally, and summarises it on request.
//!
//! Four summaries are offered:
//!
//! * temperature statistics of one locality over a range of days
//! * precipitation statistics of one locality over a range of days
//! * both of the above for every stored locality
//! * a listing of the stored localities
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team, on top of the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON request, response and stored data.
//! * [sled] is the embedded database holding localities and readings.
//! * [reqwest] talks to the Open-Meteo geocoding and archive APIs.
//! * [chrono] provides the calendar types readings are grouped by.

pub mod app;
pub mod app_state;
pub mod cli;
pub mod data_source;
pub mod error;
pub mod grouping;
pub mod ingestion;
pub mod metrics;
pub mod models;
pub mod operation;
pub mod operations;
pub mod resource_manager;
pub mod server;
pub mod storage;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod types;
pub mod validated_json;
