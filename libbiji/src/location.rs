//! Objects describing the points of interest that users share on the map
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A point on the map, stored in the `(longitude, latitude)` order that map
/// renderers expect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinate {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Checks that both components are finite and within their valid ranges
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::LatitudeOutOfRange(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

/// A location that has been stored by the backend. Everything except the
/// user-supplied text and coordinates is assigned by the backend.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Deserialize, Serialize)]
pub struct Location {
    /// An opaque identifier assigned by the backend
    pub id: String,

    /// The label of the location. The first word is used as its category.
    pub name: String,

    /// A longer free-text description
    pub description: String,

    pub latitude: f64,

    pub longitude: f64,

    /// The principal who submitted this location
    pub created_by: String,

    /// When the backend stored this location
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Location {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.longitude, self.latitude)
    }
}

/// The data that a user submits to create a new [Location]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewLocation {
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewLocation {
    pub fn new(name: String, description: String, latitude: f64, longitude: f64) -> Self {
        Self {
            name,
            description,
            latitude,
            longitude,
        }
    }

    /// Validate the submission before it is sent anywhere. The backend does not
    /// re-validate, so every submission path must call this first.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::EmptyName);
        }
        self.coordinate().validate()
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.longitude, self.latitude)
    }
}
