//! Saint-Étienne locations for realistic test fixtures.
//!
//! Coordinates are approximate neighbourhood landmarks around the Vélivert
//! service area. Four districts are spread a few kilometres apart so that
//! clustering has real structure to find.

use technician_planner::models::{Coordinate, Job, Priority};

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lon: f64) -> Self {
        Self { name, lat, lon }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lon: self.lon,
        }
    }

    /// A job at this location.
    pub fn job(&self, id: &str, priority: Priority) -> Job {
        Job::new(id, self.lat, self.lon, priority)
    }
}

// ============================================================================
// Depot
// ============================================================================

pub const DEPOT: Location = Location::new("Place Jean Jaurès", 45.439695, 4.387178);

// ============================================================================
// Centre
// ============================================================================

pub const CENTRE: &[Location] = &[
    Location::new("Hôtel de Ville", 45.4391, 4.3858),
    Location::new("Place du Peuple", 45.4370, 4.3878),
    Location::new("Musée d'Art et d'Industrie", 45.4430, 4.3845),
    Location::new("Place Chavanelle", 45.4350, 4.3930),
];

// ============================================================================
// North (Carnot, Le Marais, Geoffroy-Guichard)
// ============================================================================

pub const NORTH: &[Location] = &[
    Location::new("Stade Geoffroy-Guichard", 45.4608, 4.3903),
    Location::new("Gare de La Terrasse", 45.4668, 4.3963),
    Location::new("Parc de l'Europe", 45.4630, 4.4005),
    Location::new("Le Marais", 45.4585, 4.3960),
];

// ============================================================================
// South (Bellevue, Solaure)
// ============================================================================

pub const SOUTH: &[Location] = &[
    Location::new("Place Bellevue", 45.4200, 4.3900),
    Location::new("Solaure", 45.4245, 4.4050),
    Location::new("Hôpital Bellevue", 45.4230, 4.3820),
    Location::new("Jardin des Plantes", 45.4290, 4.3960),
];

// ============================================================================
// East (Châteaucreux, Montreynaud, Métare)
// ============================================================================

pub const EAST: &[Location] = &[
    Location::new("Gare Châteaucreux", 45.4435, 4.3995),
    Location::new("Cité du Design", 45.4494, 4.3975),
    Location::new("Montreynaud", 45.4560, 4.4150),
    Location::new("Métare", 45.4270, 4.4200),
];

/// Every location of every district.
pub fn all_locations() -> Vec<Location> {
    CENTRE
        .iter()
        .chain(NORTH)
        .chain(SOUTH)
        .chain(EAST)
        .cloned()
        .collect()
}
