//! Persistent storage of localities and readings.
//!
//! [ReadingStore] is the interface the rest of the crate uses; [SledStore] implements it on top of
//! an embedded [sled] database.

use crate::error::WeatherStatsError;
use crate::grouping::format_date_time;
use crate::types::{Coordinates, Locality, LocalityId, Reading};

use chrono::NaiveDateTime;
use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use std::path::Path;

/// Selects readings by locality name and timestamp range.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadingFilter {
    /// Only readings of the locality with this name
    pub locality: Option<String>,
    /// Only readings with `start <= timestamp <= end`
    pub range: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl ReadingFilter {
    /// Readings of one locality within an inclusive range.
    pub fn locality_in_range(name: &str, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            locality: Some(name.to_string()),
            range: Some((start, end)),
        }
    }

    fn contains(&self, timestamp: &NaiveDateTime) -> bool {
        match &self.range {
            Some((start, end)) => start <= timestamp && timestamp <= end,
            None => true,
        }
    }
}

/// Storage interface.
pub trait ReadingStore {
    /// Store a new locality.
    ///
    /// Fails with [WeatherStatsError::DuplicateLocality] if the name is taken.
    fn insert_locality(
        &self,
        name: &str,
        coordinates: &Coordinates,
    ) -> Result<Locality, WeatherStatsError>;

    /// Look up a locality by name.
    fn locality_by_name(&self, name: &str) -> Result<Option<Locality>, WeatherStatsError>;

    /// All stored localities, ordered by id.
    fn localities(&self) -> Result<Vec<Locality>, WeatherStatsError>;

    /// Display name of a locality.
    ///
    /// Fails with [WeatherStatsError::NameResolution] if the id does not exist.
    fn locality_name(&self, locality_id: LocalityId) -> Result<String, WeatherStatsError>;

    /// Store a reading.
    ///
    /// Fails with [WeatherStatsError::DuplicateReading] if the locality already has a reading
    /// with the same timestamp.
    fn insert_reading(&self, reading: &Reading) -> Result<(), WeatherStatsError>;

    /// Readings matching `filter`, ordered by locality id then timestamp.
    ///
    /// Fails with [WeatherStatsError::UnknownLocality] if the filter names a locality that does
    /// not exist.
    fn readings(&self, filter: &ReadingFilter) -> Result<Vec<Reading>, WeatherStatsError>;
}

const LOCALITIES: &str = "localities";
const LOCALITY_NAMES: &str = "locality_names";
const READINGS: &str = "readings";

/// [ReadingStore] backed by sled.
///
/// Trees:
/// * `localities`: big-endian id -> JSON [Locality]
/// * `locality_names`: name -> big-endian id
/// * `readings`: big-endian locality id ++ `YYYY-MM-DDTHH:MM` -> JSON [Reading]
///
/// Both key layouts sort in id then timestamp order, so range scans return readings in
/// chronological order per locality.
#[derive(Clone, Debug)]
pub struct SledStore {
    db: sled::Db,
    localities: sled::Tree,
    locality_names: sled::Tree,
    readings: sled::Tree,
}

impl SledStore {
    /// Open (or create) a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WeatherStatsError> {
        Self::from_db(sled::open(path)?)
    }

    /// Create a store that is removed when dropped.
    pub fn temporary() -> Result<Self, WeatherStatsError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, WeatherStatsError> {
        Ok(Self {
            localities: db.open_tree(LOCALITIES)?,
            locality_names: db.open_tree(LOCALITY_NAMES)?,
            readings: db.open_tree(READINGS)?,
            db,
        })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), WeatherStatsError> {
        self.db.flush()?;
        Ok(())
    }

    fn locality(&self, locality_id: LocalityId) -> Result<Option<Locality>, WeatherStatsError> {
        match self.localities.get(locality_id.0.to_be_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn locality_id(&self, name: &str) -> Result<Option<LocalityId>, WeatherStatsError> {
        self.locality_names
            .get(name.as_bytes())?
            .map(|value| decode_id(&value))
            .transpose()
    }

    /// Decode the readings yielded by `iter`, keeping those within the filter's range.
    ///
    /// Keys hold minute precision only, so key bounds are rechecked against full timestamps.
    fn collect(
        iter: sled::Iter,
        filter: &ReadingFilter,
        readings: &mut Vec<Reading>,
    ) -> Result<(), WeatherStatsError> {
        for item in iter {
            let (_, value) = item?;
            let reading: Reading = serde_json::from_slice(&value)?;
            if filter.contains(&reading.timestamp) {
                readings.push(reading);
            }
        }
        Ok(())
    }
}

fn decode_id(value: &[u8]) -> Result<LocalityId, WeatherStatsError> {
    let bytes: [u8; 8] = value.try_into().map_err(|_| {
        WeatherStatsError::Storage(sled::Error::Unsupported(
            "locality id is not 8 bytes".to_string(),
        ))
    })?;
    Ok(LocalityId(u64::from_be_bytes(bytes)))
}

fn reading_key(locality_id: LocalityId, timestamp: &NaiveDateTime) -> Vec<u8> {
    let mut key = locality_id.0.to_be_bytes().to_vec();
    key.extend_from_slice(format_date_time(timestamp).as_bytes());
    key
}

impl ReadingStore for SledStore {
    fn insert_locality(
        &self,
        name: &str,
        coordinates: &Coordinates,
    ) -> Result<Locality, WeatherStatsError> {
        let locality_id = LocalityId(self.db.generate_id()?);
        let locality = Locality::new(locality_id, name, coordinates);
        let record = serde_json::to_vec(&locality)?;
        let key = locality_id.0.to_be_bytes();
        // The name and the record are written together or not at all.
        let result = (&self.locality_names, &self.localities).transaction(
            |(locality_names, localities)| {
                if locality_names.get(name.as_bytes())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(()));
                }
                locality_names.insert(name.as_bytes(), &key[..])?;
                localities.insert(&key[..], record.as_slice())?;
                Ok(())
            },
        );
        match result {
            Ok(()) => {
                tracing::debug!(%locality_id, name, "inserted locality");
                Ok(locality)
            }
            Err(TransactionError::Abort(())) => Err(WeatherStatsError::DuplicateLocality {
                name: name.to_string(),
            }),
            Err(TransactionError::Storage(error)) => Err(error.into()),
        }
    }

    fn locality_by_name(&self, name: &str) -> Result<Option<Locality>, WeatherStatsError> {
        match self.locality_id(name)? {
            Some(locality_id) => self.locality(locality_id),
            None => Ok(None),
        }
    }

    fn localities(&self) -> Result<Vec<Locality>, WeatherStatsError> {
        self.localities
            .iter()
            .values()
            .map(|value| Ok(serde_json::from_slice(&value?)?))
            .collect()
    }

    fn locality_name(&self, locality_id: LocalityId) -> Result<String, WeatherStatsError> {
        self.locality(locality_id)?
            .map(|locality| locality.name)
            .ok_or(WeatherStatsError::NameResolution { locality_id })
    }

    fn insert_reading(&self, reading: &Reading) -> Result<(), WeatherStatsError> {
        let key = reading_key(reading.locality_id, &reading.timestamp);
        let value = serde_json::to_vec(reading)?;
        let inserted = self
            .readings
            .compare_and_swap(key, None as Option<&[u8]>, Some(value))?;
        inserted.map_err(|_| WeatherStatsError::DuplicateReading {
            locality_id: reading.locality_id,
            timestamp: format_date_time(&reading.timestamp),
        })
    }

    fn readings(&self, filter: &ReadingFilter) -> Result<Vec<Reading>, WeatherStatsError> {
        let mut readings = Vec::new();
        let iter = match &filter.locality {
            Some(name) => {
                let locality_id =
                    self.locality_id(name)?
                        .ok_or_else(|| WeatherStatsError::UnknownLocality {
                            name: name.clone(),
                        })?;
                match &filter.range {
                    Some((start, end)) if start > end => return Ok(readings),
                    Some((start, end)) => self
                        .readings
                        .range(reading_key(locality_id, start)..=reading_key(locality_id, end)),
                    None => self.readings.scan_prefix(locality_id.0.to_be_bytes()),
                }
            }
            None => self.readings.iter(),
        };
        Self::collect(iter, filter, &mut readings)?;
        Ok(readings)
    }
}
