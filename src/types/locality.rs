//! Named geographic localities

use crate::types::LocalityId;

use serde::{Deserialize, Serialize};

/// Geographic position of a locality as returned by the geocoding service.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Elevation in metres, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

impl Coordinates {
    /// Return new Coordinates without elevation.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
        }
    }
}

/// A stored locality. Names are unique within a store.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Locality {
    pub id: LocalityId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
}

impl Locality {
    /// Return a new Locality with the given id, name and position.
    pub fn new(id: LocalityId, name: &str, coordinates: &Coordinates) -> Self {
        Self {
            id,
            name: name.to_string(),
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            elevation: coordinates.elevation,
        }
    }

    /// Position of the locality.
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
            elevation: self.elevation,
        }
    }
}
