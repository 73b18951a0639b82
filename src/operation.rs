use crate::error::WeatherStatsError;
use crate::types::Reading;

use serde::Serialize;

/// Temperature bounds for threshold-crossing counts.
///
/// Bounds are not validated: they may be equal, inverted or outside the observed range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    /// Readings strictly above this are counted
    pub high: f64,
    /// Readings strictly below this are counted
    pub low: f64,
}

impl Thresholds {
    /// Return new Thresholds.
    pub fn new(high: f64, low: f64) -> Self {
        Self { high, low }
    }
}

/// Trait for statistics operations over a set of readings.
///
/// This forms the contract between the API layer and the aggregators. Operations are pure: they
/// neither retain state between calls nor modify their input.
pub trait Operation {
    /// Report produced by the operation.
    type Report: Serialize + Send + 'static;

    /// Name used in errors and logs.
    const NAME: &'static str;

    /// Execute the operation.
    ///
    /// # Arguments
    ///
    /// * `readings`: Readings to summarise. Must not be empty.
    /// * `thresholds`: Temperature bounds, ignored by operations that do not count crossings.
    fn execute(
        readings: &[Reading],
        thresholds: &Thresholds,
    ) -> Result<Self::Report, WeatherStatsError>;
}
