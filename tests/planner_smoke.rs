use std::collections::HashMap;

use technician_planner::models::{Coordinate, Priority};
use technician_planner::planner::{assign_technicians_with, AssignmentRequest, PlannerOptions};
use technician_planner::traits::{Stop, TravelModel};

#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
struct Id(&'static str);

#[derive(Clone, Debug)]
struct MockStop {
    id: Id,
    location: (f64, f64),
    priority: Priority,
}

impl Stop for MockStop {
    type Id = Id;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn location(&self) -> Coordinate {
        self.location.into()
    }

    fn priority(&self) -> Priority {
        self.priority
    }
}

/// Manhattan distance, one kilometre per degree, one minute per kilometre.
struct MockModel;

impl TravelModel for MockModel {
    fn distance_meters(&self, from: Coordinate, to: Coordinate) -> f64 {
        ((from.lat - to.lat).abs() + (from.lon - to.lon).abs()) * 1000.0
    }

    fn travel_minutes(&self, meters: f64) -> f64 {
        meters / 1000.0
    }

    fn service_minutes(&self) -> f64 {
        0.0
    }
}

fn stop(id: &'static str, lat: f64, lon: f64) -> MockStop {
    MockStop {
        id: Id(id),
        location: (lat, lon),
        priority: Priority::Medium,
    }
}

#[test]
fn keeps_nearby_stops_together() {
    let stops = vec![
        stop("a1", 0.0, 0.0),
        stop("b1", 1.0, 1.0),
        stop("a2", 0.0, 0.01),
        stop("b2", 1.0, 1.01),
    ];
    let options = PlannerOptions::default().with_depot(Coordinate { lat: 0.5, lon: 0.5 });

    let result = assign_technicians_with(&stops, &AssignmentRequest::new(2), &MockModel, &options)
        .expect("valid request");

    let mut owner: HashMap<&str, usize> = HashMap::new();
    for tech in &result.per_technician {
        for route_stop in &tech.ordered_stops {
            owner.insert(route_stop.job_id.0, tech.technician_index);
        }
    }

    assert_eq!(owner.len(), 4);
    assert_eq!(owner["a1"], owner["a2"]);
    assert_eq!(owner["b1"], owner["b2"]);
    assert_ne!(owner["a1"], owner["b1"]);
    assert!(result.convergence.is_converged());
}

#[test]
fn uses_the_supplied_travel_model() {
    let stops = vec![stop("only", 0.0, 2.0)];
    let options = PlannerOptions::default().with_depot(Coordinate { lat: 0.0, lon: 0.0 });

    let result = assign_technicians_with(&stops, &AssignmentRequest::new(1), &MockModel, &options)
        .expect("valid request");

    let tech = &result.per_technician[0];
    assert_eq!(tech.total_distance_meters, 2000.0);
    assert_eq!(tech.estimated_duration_minutes, 2.0);
    assert_eq!(tech.ordered_stops[0].estimated_arrival_minutes, 2.0);
}
