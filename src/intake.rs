//! Turns bike and intervention snapshots into prioritized jobs.
//!
//! Three kinds of maintenance rounds are supported. Each picks the bikes that
//! need a visit and tags them with a priority derived from remaining range.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Coordinate, Job, Priority};

/// Below this range a bike is close to unusable.
pub const CRITICAL_RANGE_METERS: u32 = 1_000;

/// Below this range an enabled bike needs a battery swap.
pub const LOW_BATTERY_RANGE_METERS: u32 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mission {
    DisabledBikes,
    LowBattery,
    PendingInterventions,
}

/// Last known state of a bike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BikeSnapshot {
    pub bike_id: String,
    pub location: Coordinate,
    pub is_disabled: bool,
    #[serde(default)]
    pub range_meters: Option<u32>,
    #[serde(default)]
    pub station_id: Option<String>,
}

/// A maintenance intervention waiting to be carried out on a bike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingIntervention {
    pub id: String,
    pub bike_id: String,
    pub priority: Priority,
}

/// Jobs for one kind of round.
///
/// Interventions are only read for [`Mission::PendingInterventions`]; those
/// whose bike is not among `bikes` are skipped.
pub fn jobs_for_mission(
    mission: Mission,
    bikes: &[BikeSnapshot],
    interventions: &[PendingIntervention],
) -> Vec<Job> {
    match mission {
        Mission::DisabledBikes => bikes
            .iter()
            .filter(|bike| bike.is_disabled)
            .map(|bike| {
                let priority = if is_critical(bike.range_meters) {
                    Priority::Urgent
                } else {
                    Priority::Medium
                };
                bike_job(bike, bike.bike_id.clone(), priority)
            })
            .collect(),
        Mission::LowBattery => bikes
            .iter()
            .filter(|bike| !bike.is_disabled)
            .filter(|bike| {
                matches!(
                    bike.range_meters,
                    Some(range) if range > 0 && range < LOW_BATTERY_RANGE_METERS
                )
            })
            .map(|bike| {
                let priority = if is_critical(bike.range_meters) {
                    Priority::High
                } else {
                    Priority::Medium
                };
                bike_job(bike, bike.bike_id.clone(), priority)
            })
            .collect(),
        Mission::PendingInterventions => {
            let by_id: HashMap<&str, &BikeSnapshot> = bikes
                .iter()
                .map(|bike| (bike.bike_id.as_str(), bike))
                .collect();
            interventions
                .iter()
                .filter_map(|intervention| {
                    by_id
                        .get(intervention.bike_id.as_str())
                        .map(|bike| bike_job(bike, intervention.id.clone(), intervention.priority))
                })
                .collect()
        }
    }
}

fn is_critical(range_meters: Option<u32>) -> bool {
    matches!(range_meters, Some(range) if range < CRITICAL_RANGE_METERS)
}

fn bike_job(bike: &BikeSnapshot, id: String, priority: Priority) -> Job {
    Job {
        id,
        coordinate: bike.location,
        priority,
        station_id: bike.station_id.clone(),
    }
}
