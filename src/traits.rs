//! Core seams for the technician planner.
//!
//! These are intentionally minimal. The crate ships concrete implementations
//! (`Job`, `HaversineModel`, `HttpJobSource`), but callers can route their own
//! job types or plug in another travel model.

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::SourceError;
use crate::models::{Coordinate, Job, Priority};

/// Unique identifier for planner entities.
///
/// `Ord` is required because identifiers are the final tie-break everywhere
/// the planner has to choose between otherwise equal jobs.
pub trait Id: Clone + Eq + Hash + Ord + Debug + Send + Sync {}

impl<T> Id for T where T: Clone + Eq + Hash + Ord + Debug + Send + Sync {}

/// A job is a single place a technician has to visit.
pub trait Stop: Sync {
    type Id: Id;

    fn id(&self) -> &Self::Id;

    /// Location of the job (WGS84 degrees).
    fn location(&self) -> Coordinate;

    /// Priority tag. Only used for tie-breaks and transfer penalties.
    fn priority(&self) -> Priority;

    /// Originating station, display only.
    fn station_id(&self) -> Option<&str> {
        None
    }
}

/// Estimates distance and time between coordinates.
pub trait TravelModel: Sync {
    /// Distance in meters between two coordinates.
    fn distance_meters(&self, from: Coordinate, to: Coordinate) -> f64;

    /// Minutes needed to travel the given distance.
    fn travel_minutes(&self, meters: f64) -> f64;

    /// Minutes spent on site per stop.
    fn service_minutes(&self) -> f64;

    /// Travel plus service time for visiting `stops` in order from `start`.
    ///
    /// Zero stops take zero minutes.
    fn estimate_duration(&self, start: Coordinate, stops: &[Coordinate]) -> f64 {
        if stops.is_empty() {
            return 0.0;
        }

        let mut meters = 0.0;
        let mut previous = start;
        for stop in stops {
            meters += self.distance_meters(previous, *stop);
            previous = *stop;
        }

        self.travel_minutes(meters) + stops.len() as f64 * self.service_minutes()
    }
}

/// Supplies the jobs that currently need a visit.
pub trait JobSource {
    fn fetch_jobs(&self) -> Result<Vec<Job>, SourceError>;
}
