//! Geographic clustering of jobs into technician territories.
//!
//! k-means over (lat, lon) with flat Euclidean distance. At city scale the
//! distortion of treating degrees as a plane is negligible for grouping.

use crate::models::Coordinate;
use crate::traits::Stop;

/// One technician's territory while the planner is running.
#[derive(Debug)]
pub struct Cluster<'a, J: Stop> {
    pub technician_index: usize,
    /// Mean of the member coordinates. An emptied cluster keeps its last centroid.
    pub centroid: Coordinate,
    pub start_location: Coordinate,
    pub jobs: Vec<&'a J>,
}

impl<'a, J: Stop> Cluster<'a, J> {
    /// Builds a cluster; without members the centroid falls back to the start location.
    pub fn new(technician_index: usize, start_location: Coordinate, jobs: Vec<&'a J>) -> Self {
        let centroid =
            Coordinate::mean(jobs.iter().map(|job| job.location())).unwrap_or(start_location);
        Self {
            technician_index,
            centroid,
            start_location,
            jobs,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn urgent_count(&self) -> usize {
        self.jobs.iter().filter(|job| job.priority().is_urgent()).count()
    }

    pub fn push(&mut self, job: &'a J) {
        self.jobs.push(job);
        self.recompute_centroid();
    }

    pub fn remove(&mut self, idx: usize) -> &'a J {
        let job = self.jobs.remove(idx);
        self.recompute_centroid();
        job
    }

    pub fn recompute_centroid(&mut self) {
        if let Some(centroid) = Coordinate::mean(self.jobs.iter().map(|job| job.location())) {
            self.centroid = centroid;
        }
    }
}

/// Result of a k-means run.
#[derive(Debug, Clone)]
pub struct KMeansOutcome {
    /// Cluster index for each input point.
    pub labels: Vec<usize>,
    pub centroids: Vec<Coordinate>,
    pub iterations: usize,
    /// `false` when the iteration cap was hit while labels were still moving.
    pub converged: bool,
}

/// Partitions `points` into `k` clusters.
///
/// `seeds` are used as initial centroids when there are exactly `k` of them
/// and no two coincide; otherwise furthest-point seeding picks them from the
/// points. With `k >= points.len()` every point gets its own cluster. At least
/// one assignment round always runs, even with `max_iterations == 0`.
pub fn kmeans(
    points: &[Coordinate],
    k: usize,
    seeds: Option<&[Coordinate]>,
    max_iterations: usize,
) -> KMeansOutcome {
    let n = points.len();
    let usable_seeds = seeds.filter(|seeds| seeds.len() == k && pairwise_distinct(seeds));

    if k >= n {
        let fallback =
            Coordinate::mean(points.iter().copied()).unwrap_or(crate::models::DEFAULT_DEPOT);
        let centroids = (0..k)
            .map(|idx| match (points.get(idx), usable_seeds) {
                (Some(point), _) => *point,
                (None, Some(seeds)) => seeds[idx],
                (None, None) => fallback,
            })
            .collect();
        return KMeansOutcome {
            labels: (0..n).collect(),
            centroids,
            iterations: 0,
            converged: true,
        };
    }

    let mut centroids = match usable_seeds {
        Some(seeds) => seeds.to_vec(),
        None => furthest_point_seeds(points, k),
    };

    let mut labels = vec![usize::MAX; n];
    let mut iterations = 0;
    let mut converged = false;

    let max_iterations = max_iterations.max(1);
    while iterations < max_iterations {
        iterations += 1;

        let mut changed = false;
        for (idx, point) in points.iter().enumerate() {
            let nearest = nearest_centroid(point, &centroids);
            if labels[idx] != nearest {
                labels[idx] = nearest;
                changed = true;
            }
        }

        if !changed {
            converged = true;
            break;
        }

        for (cluster, centroid) in centroids.iter_mut().enumerate() {
            let members = points
                .iter()
                .zip(&labels)
                .filter(|(_, label)| **label == cluster)
                .map(|(point, _)| *point);
            if let Some(mean) = Coordinate::mean(members) {
                *centroid = mean;
            }
        }
    }

    KMeansOutcome {
        labels,
        centroids,
        iterations,
        converged,
    }
}

/// Groups jobs into clusters following k-means labels.
pub fn clusters_from_labels<'a, J: Stop>(
    jobs: &[&'a J],
    outcome: &KMeansOutcome,
    start_locations: &[Coordinate],
) -> Vec<Cluster<'a, J>> {
    let mut clusters: Vec<Cluster<'a, J>> = start_locations
        .iter()
        .enumerate()
        .map(|(idx, start)| Cluster {
            technician_index: idx,
            centroid: outcome.centroids.get(idx).copied().unwrap_or(*start),
            start_location: *start,
            jobs: Vec::new(),
        })
        .collect();

    for (job, label) in jobs.iter().zip(&outcome.labels) {
        clusters[*label].jobs.push(*job);
    }
    for cluster in clusters.iter_mut() {
        cluster.recompute_centroid();
    }

    clusters
}

/// Deterministic furthest-point seeding.
///
/// The first seed is the point nearest the overall mean; each further seed is
/// the point furthest from its closest existing seed. Ties go to input order.
fn furthest_point_seeds(points: &[Coordinate], k: usize) -> Vec<Coordinate> {
    let Some(mean) = Coordinate::mean(points.iter().copied()) else {
        return Vec::new();
    };

    let first = nearest_centroid(&mean, points);
    let mut seeds = vec![points[first]];
    let mut closest: Vec<f64> = points
        .iter()
        .map(|point| point.euclidean(&points[first]))
        .collect();

    while seeds.len() < k {
        let mut best = 0;
        for idx in 1..points.len() {
            if closest[idx] > closest[best] {
                best = idx;
            }
        }
        let seed = points[best];
        seeds.push(seed);
        for (idx, point) in points.iter().enumerate() {
            closest[idx] = closest[idx].min(point.euclidean(&seed));
        }
    }

    seeds
}

/// Index of the closest candidate, lowest index on ties.
fn nearest_centroid(point: &Coordinate, candidates: &[Coordinate]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (idx, candidate) in candidates.iter().enumerate() {
        let distance = point.euclidean(candidate);
        if distance < best_distance {
            best = idx;
            best_distance = distance;
        }
    }
    best
}

fn pairwise_distinct(points: &[Coordinate]) -> bool {
    points
        .iter()
        .enumerate()
        .all(|(i, a)| points[i + 1..].iter().all(|b| a != b))
}
