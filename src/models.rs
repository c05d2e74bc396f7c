//! Domain types shared by every phase of the planner.

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::traits::Stop;

/// Saint-Étienne city centre, the default technician depot.
pub const DEFAULT_DEPOT: Coordinate = Coordinate {
    lat: 45.439695,
    lon: 4.387178,
};

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Builds a coordinate, rejecting out-of-range or non-finite values.
    pub fn new(lat: f64, lon: f64) -> Result<Self, PlanError> {
        let coordinate = Self { lat, lon };
        coordinate.validate()?;
        Ok(coordinate)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(PlanError::InvalidInput(format!(
                "coordinate ({}, {}) is outside [-90, 90] x [-180, 180]",
                self.lat, self.lon
            )))
        }
    }

    /// Copy of this coordinate forced into the valid range.
    pub fn clamped(&self) -> Self {
        Self {
            lat: self.lat.clamp(-90.0, 90.0),
            lon: self.lon.clamp(-180.0, 180.0),
        }
    }

    /// Flat-plane distance in degrees, used for clustering at city scale.
    pub fn euclidean(&self, other: &Coordinate) -> f64 {
        let dlat = self.lat - other.lat;
        let dlon = self.lon - other.lon;
        (dlat * dlat + dlon * dlon).sqrt()
    }

    /// Arithmetic mean of a set of coordinates, `None` when empty.
    pub fn mean<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        let mut count = 0usize;
        let mut lat = 0.0;
        let mut lon = 0.0;
        for point in points {
            count += 1;
            lat += point.lat;
            lon += point.lon;
        }
        if count == 0 {
            return None;
        }
        Some(Self {
            lat: lat / count as f64,
            lon: lon / count as f64,
        })
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// Job priority, lowest first so that `Ord` matches urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn is_urgent(&self) -> bool {
        matches!(self, Priority::Urgent)
    }

    /// Contribution of one job to a technician's priority score.
    pub fn weight(&self) -> f64 {
        match self {
            Priority::Urgent => 100.0,
            Priority::High => 25.0,
            Priority::Medium => 5.0,
            Priority::Low => 1.0,
        }
    }
}

/// A maintenance job as delivered by the job source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_id: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64, priority: Priority) -> Self {
        Self {
            id: id.into(),
            coordinate: Coordinate { lat, lon },
            priority,
            station_id: None,
        }
    }

    pub fn at_station(mut self, station_id: impl Into<String>) -> Self {
        self.station_id = Some(station_id.into());
        self
    }
}

impl Stop for Job {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn location(&self) -> Coordinate {
        self.coordinate
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn station_id(&self) -> Option<&str> {
        self.station_id.as_deref()
    }
}
