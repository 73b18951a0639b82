//! Grouping, extremum and rounding helpers shared by the aggregators.
//!
//! Grouping is done in a single pass into an ordered map from calendar day to an [Accumulator],
//! so per-day results always come out in chronological order.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::{LocalityId, Reading};

/// Format of date keys and date fields in reports.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format of date-time fields in reports (minute precision).
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Running sum and count of a series of values.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Accumulator {
    pub sum: f64,
    pub count: usize,
}

impl Accumulator {
    /// Add a value.
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Arithmetic mean of the accumulated values, or `None` if there are none.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

impl FromIterator<f64> for Accumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut accumulator = Self::default();
        for value in iter {
            accumulator.push(value);
        }
        accumulator
    }
}

/// Accumulate `(timestamp, value)` pairs by calendar day.
pub fn group_by_day<I>(values: I) -> BTreeMap<NaiveDate, Accumulator>
where
    I: IntoIterator<Item = (NaiveDateTime, f64)>,
{
    let mut groups: BTreeMap<NaiveDate, Accumulator> = BTreeMap::new();
    for (timestamp, value) in values {
        groups.entry(timestamp.date()).or_default().push(value);
    }
    groups
}

/// Split readings into one partition per locality.
///
/// Partitions are ordered by locality id and keep the relative input order of their readings.
pub fn partition_by_locality(readings: &[Reading]) -> BTreeMap<LocalityId, Vec<Reading>> {
    let mut partitions: BTreeMap<LocalityId, Vec<Reading>> = BTreeMap::new();
    for reading in readings {
        partitions
            .entry(reading.locality_id)
            .or_default()
            .push(reading.clone());
    }
    partitions
}

/// Which extremum to search for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Extremum {
    Max,
    Min,
}

/// Find the reading holding the extremum of `value`.
///
/// The first reading wins on ties: a later candidate replaces the current one only when it is
/// strictly greater (or strictly smaller for [Extremum::Min]). Returns `None` for an empty input.
pub fn find_extremum<'a, I, F>(readings: I, extremum: Extremum, value: F) -> Option<&'a Reading>
where
    I: IntoIterator<Item = &'a Reading>,
    F: Fn(&Reading) -> f64,
{
    readings
        .into_iter()
        .fold(None::<(&'a Reading, f64)>, |best, reading| {
            let candidate = value(reading);
            match best {
                None => Some((reading, candidate)),
                Some((_, current)) => {
                    let replace = match extremum {
                        Extremum::Max => candidate > current,
                        Extremum::Min => candidate < current,
                    };
                    if replace {
                        Some((reading, candidate))
                    } else {
                        best
                    }
                }
            }
        })
        .map(|(reading, _)| reading)
}

/// Round `value` to `decimals` places, rounding halves to even.
///
/// Rounding works on the exact decimal expansion of the binary value, so a value stored just
/// below a midpoint rounds down (`20.15` is `20.1499..` and rounds to `20.1`) and one stored just
/// above rounds up (`1.05` is `1.0500..` and rounds to `1.1`). Values outside the range of
/// [Decimal] are returned unchanged.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let Some(exact) = Decimal::from_f64_retain(value) else {
        return value;
    };
    // Decimal text parses to the nearest f64.
    exact
        .round_dp_with_strategy(decimals, RoundingStrategy::MidpointNearestEven)
        .to_string()
        .parse()
        .unwrap_or(value)
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Format a date-time as `YYYY-MM-DDTHH:MM`.
pub fn format_date_time(timestamp: &NaiveDateTime) -> String {
    timestamp.format(DATE_TIME_FORMAT).to_string()
}
