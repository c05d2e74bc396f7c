//! Nearest-neighbor route sequencing.
//!
//! Starting from a technician's start location, always visit the closest
//! remaining job. O(n²) in the number of jobs, which is fine for territories
//! of a few dozen stops.

use std::cmp::Ordering;

use crate::models::Coordinate;
use crate::traits::{Stop, TravelModel};

/// A sequenced visiting order for one technician.
#[derive(Debug)]
pub struct Route<'a, J: Stop> {
    pub start: Coordinate,
    pub ordered_stops: Vec<&'a J>,
    /// Minutes after departure at which each stop is reached.
    pub arrival_minutes: Vec<f64>,
    pub total_distance_meters: f64,
    pub estimated_duration_minutes: f64,
}

impl<'a, J: Stop> Route<'a, J> {
    fn empty(start: Coordinate) -> Self {
        Self {
            start,
            ordered_stops: Vec::new(),
            arrival_minutes: Vec::new(),
            total_distance_meters: 0.0,
            estimated_duration_minutes: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_stops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ordered_stops.len()
    }

    pub fn job_ids(&self) -> Vec<&'a J::Id> {
        self.ordered_stops.iter().map(|job| job.id()).collect()
    }

    /// Start location followed by every stop, for drawing the route.
    pub fn path(&self) -> Vec<Coordinate> {
        std::iter::once(self.start)
            .chain(self.ordered_stops.iter().map(|job| job.location()))
            .collect()
    }
}

/// Orders `jobs` by repeatedly visiting the nearest remaining one.
///
/// Equal distances are resolved by higher priority first, then by job id,
/// so the result is fully deterministic.
pub fn sequence<'a, J, M>(jobs: &[&'a J], start: Coordinate, model: &M) -> Route<'a, J>
where
    J: Stop,
    M: TravelModel + ?Sized,
{
    if jobs.is_empty() {
        return Route::empty(start);
    }

    let mut remaining: Vec<&'a J> = jobs.to_vec();
    let mut ordered_stops = Vec::with_capacity(jobs.len());
    let mut arrival_minutes = Vec::with_capacity(jobs.len());
    let mut current = start;
    let mut total_distance_meters = 0.0;
    let mut elapsed = 0.0;

    while !remaining.is_empty() {
        let mut best: Option<(usize, f64)> = None;
        for (idx, job) in remaining.iter().enumerate() {
            let distance = model.distance_meters(current, job.location());
            let better = match best {
                None => true,
                Some((best_idx, best_distance)) => {
                    compare_candidates(distance, *job, best_distance, remaining[best_idx])
                        == Ordering::Less
                }
            };
            if better {
                best = Some((idx, distance));
            }
        }

        let Some((idx, leg)) = best else { break };
        let next = remaining.swap_remove(idx);

        total_distance_meters += leg;
        elapsed += model.travel_minutes(leg);
        arrival_minutes.push(elapsed);
        elapsed += model.service_minutes();

        current = next.location();
        ordered_stops.push(next);
    }

    let coordinates: Vec<Coordinate> = ordered_stops.iter().map(|job| job.location()).collect();
    let estimated_duration_minutes = model.estimate_duration(start, &coordinates);

    Route {
        start,
        ordered_stops,
        arrival_minutes,
        total_distance_meters,
        estimated_duration_minutes,
    }
}

/// `Less` when candidate `a` should be visited before candidate `b`.
fn compare_candidates<J: Stop>(a_distance: f64, a: &J, b_distance: f64, b: &J) -> Ordering {
    a_distance
        .total_cmp(&b_distance)
        .then_with(|| b.priority().cmp(&a.priority()))
        .then_with(|| a.id().cmp(b.id()))
}
