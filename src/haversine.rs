//! Haversine travel model.
//!
//! Uses great-circle distance and a constant average speed to estimate
//! travel time. Ignores roads, which is accurate enough for city-scale
//! bike-share maintenance rounds.

use crate::models::Coordinate;
use crate::planner::PlannerOptions;
use crate::traits::TravelModel;

/// Average urban driving speed assumption for time estimation.
pub const DEFAULT_SPEED_KMH: f64 = 30.0;

/// Time spent on site per job (collecting or fixing a bike).
pub const DEFAULT_SERVICE_MINUTES: f64 = 5.0;

/// Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters.
///
/// Inputs are clamped into the valid latitude/longitude range first, so two
/// distinct out-of-range points can come out at distance 0 (latitudes 95 and
/// 90 both become 90). Distance is zero exactly for equal points only when
/// both are valid. The planner rejects invalid coordinates before calling this.
pub fn distance_meters(from: Coordinate, to: Coordinate) -> f64 {
    let from = from.clamped();
    let to = to.clamped();

    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Haversine-based travel model with a fixed speed and service time.
#[derive(Debug, Clone)]
pub struct HaversineModel {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
    /// Minutes spent at each stop.
    pub service_minutes: f64,
}

impl Default for HaversineModel {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
            service_minutes: DEFAULT_SERVICE_MINUTES,
        }
    }
}

impl HaversineModel {
    pub fn new(speed_kmh: f64, service_minutes: f64) -> Self {
        Self {
            speed_kmh,
            service_minutes,
        }
    }

    pub fn from_options(options: &PlannerOptions) -> Self {
        Self::new(options.speed_kmh, options.service_minutes_per_stop)
    }
}

impl TravelModel for HaversineModel {
    fn distance_meters(&self, from: Coordinate, to: Coordinate) -> f64 {
        distance_meters(from, to)
    }

    fn travel_minutes(&self, meters: f64) -> f64 {
        let hours = meters / 1000.0 / self.speed_kmh;
        hours * 60.0
    }

    fn service_minutes(&self) -> f64 {
        self.service_minutes
    }
}
