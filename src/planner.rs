//! Multi-technician assignment planner.
//!
//! A run goes through `Clustering -> CountBalancing -> TimeBalancing ->
//! Sequencing -> Done` synchronously. Every loop is capped, so a run always
//! terminates; hitting a cap is reported through [`Convergence`], not as an
//! error.

use std::collections::HashSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::balancer::{balance_counts, balance_time, PhaseOutcome, TimeBalanceOutcome};
use crate::clustering::{clusters_from_labels, kmeans, Cluster, KMeansOutcome};
use crate::error::PlanError;
use crate::haversine::{self, HaversineModel, DEFAULT_SERVICE_MINUTES, DEFAULT_SPEED_KMH};
use crate::models::{Coordinate, Priority, DEFAULT_DEPOT};
use crate::sequencer::{sequence, Route};
use crate::traits::{JobSource, Stop, TravelModel};

/// Number of job ids listed per zone in a preview.
const PREVIEW_SAMPLE_SIZE: usize = 5;

/// Territory ordering: one urgent job outweighs 100 km of distance from the depot.
const URGENT_TERRITORY_WEIGHT: f64 = 100.0;

/// Where a technician's route begins when no explicit start is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// Every technician leaves from the depot.
    Depot,
    /// Each technician starts at the job of their territory closest to the depot.
    NearestJob,
}

#[derive(Debug, Clone)]
pub struct PlannerOptions {
    /// Average travel speed in km/h.
    pub speed_kmh: f64,
    /// On-site time per job in minutes.
    pub service_minutes_per_stop: f64,
    /// Default start location.
    pub depot: Coordinate,
    pub start_policy: StartPolicy,
    pub kmeans_max_iterations: usize,
    pub count_balance_max_iterations: usize,
    pub time_balance_max_iterations: usize,
    /// Duration gap (minutes) under which territories count as balanced.
    pub time_tolerance_minutes: f64,
    /// Added to an urgent job's transfer score so it is moved last.
    pub urgent_transfer_penalty: f64,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
            service_minutes_per_stop: DEFAULT_SERVICE_MINUTES,
            depot: DEFAULT_DEPOT,
            start_policy: StartPolicy::Depot,
            kmeans_max_iterations: 50,
            count_balance_max_iterations: 50,
            time_balance_max_iterations: 15,
            time_tolerance_minutes: 20.0,
            urgent_transfer_penalty: 1000.0,
        }
    }
}

impl PlannerOptions {
    /// Fewer clustering and time balancing rounds, looser time tolerance.
    /// Count balancing keeps its full cap.
    pub fn fast() -> Self {
        Self {
            kmeans_max_iterations: 20,
            time_balance_max_iterations: 5,
            time_tolerance_minutes: 30.0,
            ..Self::default()
        }
    }

    pub fn with_depot(mut self, depot: Coordinate) -> Self {
        self.depot = depot;
        self
    }

    pub fn with_start_policy(mut self, start_policy: StartPolicy) -> Self {
        self.start_policy = start_policy;
        self
    }

    fn validate(&self) -> Result<(), PlanError> {
        if !(self.speed_kmh.is_finite() && self.speed_kmh > 0.0) {
            return Err(PlanError::InvalidInput(format!(
                "speed_kmh must be positive, got {}",
                self.speed_kmh
            )));
        }
        if !(self.service_minutes_per_stop.is_finite() && self.service_minutes_per_stop >= 0.0) {
            return Err(PlanError::InvalidInput(format!(
                "service_minutes_per_stop must be non-negative, got {}",
                self.service_minutes_per_stop
            )));
        }
        if !(self.time_tolerance_minutes.is_finite() && self.time_tolerance_minutes >= 0.0) {
            return Err(PlanError::InvalidInput(format!(
                "time_tolerance_minutes must be non-negative, got {}",
                self.time_tolerance_minutes
            )));
        }
        if !(self.urgent_transfer_penalty.is_finite() && self.urgent_transfer_penalty >= 0.0) {
            return Err(PlanError::InvalidInput(format!(
                "urgent_transfer_penalty must be non-negative, got {}",
                self.urgent_transfer_penalty
            )));
        }
        if self.kmeans_max_iterations == 0
            || self.count_balance_max_iterations == 0
            || self.time_balance_max_iterations == 0
        {
            return Err(PlanError::InvalidInput("iteration caps must be at least 1".to_string()));
        }
        self.depot.validate()
    }
}

/// What the caller asks for besides the jobs themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    pub technician_count: usize,
    #[serde(default)]
    pub technician_names: Option<Vec<String>>,
    /// One start per technician; the depot is used when absent.
    #[serde(default)]
    pub start_locations: Option<Vec<Coordinate>>,
}

impl AssignmentRequest {
    pub fn new(technician_count: usize) -> Self {
        Self {
            technician_count,
            technician_names: None,
            start_locations: None,
        }
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.technician_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_start_locations(mut self, starts: Vec<Coordinate>) -> Self {
        self.start_locations = Some(starts);
        self
    }
}

/// One stop of a technician's route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStop<Id> {
    pub job_id: Id,
    /// 0-based visiting order.
    pub order: usize,
    pub lat: f64,
    pub lon: f64,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_id: Option<String>,
    /// Minutes after departure.
    pub estimated_arrival_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianAssignment<Id> {
    pub technician_index: usize,
    pub technician_name: String,
    pub start_location: Coordinate,
    pub job_count: usize,
    pub urgent_count: usize,
    pub ordered_stops: Vec<RouteStop<Id>>,
    pub total_distance_meters: f64,
    pub estimated_duration_minutes: f64,
    /// Sum of [`Priority::weight`] over the assigned jobs.
    pub priority_score: f64,
}

/// How each phase of a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Convergence {
    pub clustering_iterations: usize,
    pub clustering_converged: bool,
    pub count_balance: PhaseOutcome,
    pub time_balance: TimeBalanceOutcome,
}

impl Convergence {
    fn trivial() -> Self {
        Self {
            clustering_iterations: 0,
            clustering_converged: true,
            count_balance: PhaseOutcome {
                iterations: 0,
                transfers: 0,
                converged: true,
            },
            time_balance: TimeBalanceOutcome {
                iterations: 0,
                transfers: 0,
                converged: true,
                initial_spread_minutes: 0.0,
                final_spread_minutes: 0.0,
            },
        }
    }

    /// `true` when no phase stopped on a cap or stall.
    pub fn is_converged(&self) -> bool {
        self.clustering_converged && self.count_balance.converged && self.time_balance.converged
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResult<Id> {
    pub per_technician: Vec<TechnicianAssignment<Id>>,
    pub total_technicians: usize,
    pub total_jobs: usize,
    pub total_distance_meters: f64,
    pub max_duration_minutes: f64,
    /// `100 * (1 - cv(job counts))`, within [0, 100].
    pub load_balance_score: f64,
    /// Name of the first technician with the most jobs, `None` without jobs.
    pub most_loaded_technician: Option<String>,
    /// Rounded to one decimal.
    pub average_jobs_per_technician: f64,
    pub convergence: Convergence,
}

/// Clustering-only view of the territories, without balancing or routes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonePreview<Id> {
    pub zone_id: usize,
    pub technician_name: String,
    pub center: Coordinate,
    pub job_count: usize,
    pub sample_job_ids: Vec<Id>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Clustering,
    CountBalancing,
    TimeBalancing,
    Sequencing,
    Done,
}

/// Assigns `jobs` to technicians using the haversine travel model built from `options`.
pub fn assign_technicians<J: Stop>(
    jobs: &[J],
    request: &AssignmentRequest,
    options: &PlannerOptions,
) -> Result<AssignmentResult<J::Id>, PlanError> {
    let model = HaversineModel::from_options(options);
    assign_technicians_with(jobs, request, &model, options)
}

/// Assigns `jobs` to technicians with a caller-supplied travel model.
#[tracing::instrument(skip_all, fields(jobs = jobs.len(), technicians = request.technician_count))]
pub fn assign_technicians_with<J, M>(
    jobs: &[J],
    request: &AssignmentRequest,
    model: &M,
    options: &PlannerOptions,
) -> Result<AssignmentResult<J::Id>, PlanError>
where
    J: Stop,
    M: TravelModel + ?Sized,
{
    validate(jobs, request, options)?;

    let technician_count = request.technician_count;
    let names = technician_names(request.technician_names.as_deref(), technician_count);
    let explicit_starts = request.start_locations.as_deref();
    let starts: Vec<Coordinate> = match explicit_starts {
        Some(starts) => starts.to_vec(),
        None => vec![options.depot; technician_count],
    };

    info!(technician_count, "assignment started");

    let refs: Vec<&J> = jobs.iter().collect();

    if refs.is_empty() {
        let clusters: Vec<Cluster<'_, J>> = starts
            .iter()
            .enumerate()
            .map(|(idx, start)| Cluster::new(idx, *start, Vec::new()))
            .collect();
        return Ok(build_result(&clusters, &names, model, Convergence::trivial()));
    }

    enter(Phase::Clustering);
    let points: Vec<Coordinate> = refs.iter().map(|job| job.location()).collect();
    let clustering = kmeans(
        &points,
        technician_count,
        explicit_starts,
        options.kmeans_max_iterations,
    );
    if !clustering.converged {
        warn!(iterations = clustering.iterations, "k-means hit its iteration cap");
    }
    let mut clusters = clusters_from_labels(&refs, &clustering, &starts);

    enter(Phase::CountBalancing);
    let count_balance = balance_counts(&mut clusters, options.count_balance_max_iterations);

    let nearest_job_starts =
        explicit_starts.is_none() && options.start_policy == StartPolicy::NearestJob;
    if nearest_job_starts {
        place_nearest_job_starts(&mut clusters, options.depot);
    }

    enter(Phase::TimeBalancing);
    let time_balance = balance_time(&mut clusters, model, options);

    // Time balancing may have moved a start job to another territory.
    if nearest_job_starts {
        place_nearest_job_starts(&mut clusters, options.depot);
    }
    // Explicit starts tie territory i to technician i.
    if explicit_starts.is_none() {
        order_territories(&mut clusters, options.depot);
    }

    enter(Phase::Sequencing);
    let convergence = convergence_of(&clustering, count_balance, time_balance);
    let result = build_result(&clusters, &names, model, convergence);

    enter(Phase::Done);
    info!(
        total_distance_meters = result.total_distance_meters,
        max_duration_minutes = result.max_duration_minutes,
        load_balance_score = result.load_balance_score,
        converged = convergence.is_converged(),
        "assignment complete"
    );

    Ok(result)
}

/// Runs only the clustering phase, for showing territories before committing.
pub fn preview_zones<J: Stop>(
    jobs: &[J],
    technician_count: usize,
    options: &PlannerOptions,
) -> Result<Vec<ZonePreview<J::Id>>, PlanError> {
    let request = AssignmentRequest::new(technician_count);
    validate(jobs, &request, options)?;

    let refs: Vec<&J> = jobs.iter().collect();
    let points: Vec<Coordinate> = refs.iter().map(|job| job.location()).collect();
    let starts = vec![options.depot; technician_count];
    let names = technician_names(None, technician_count);

    let clusters = if refs.is_empty() {
        starts
            .iter()
            .enumerate()
            .map(|(idx, start)| Cluster::new(idx, *start, Vec::new()))
            .collect()
    } else {
        let clustering = kmeans(&points, technician_count, None, options.kmeans_max_iterations);
        clusters_from_labels(&refs, &clustering, &starts)
    };

    Ok(clusters
        .iter()
        .zip(names)
        .map(|(cluster, technician_name)| ZonePreview {
            zone_id: cluster.technician_index,
            technician_name,
            center: cluster.centroid,
            job_count: cluster.len(),
            sample_job_ids: cluster
                .jobs
                .iter()
                .take(PREVIEW_SAMPLE_SIZE)
                .map(|job| job.id().clone())
                .collect(),
        })
        .collect())
}

/// Fetches jobs from `source` and assigns them.
pub fn plan_from_source<S>(
    source: &S,
    request: &AssignmentRequest,
    options: &PlannerOptions,
) -> Result<AssignmentResult<String>, PlanError>
where
    S: JobSource + ?Sized,
{
    let jobs = source.fetch_jobs()?;
    info!(fetched = jobs.len(), "jobs fetched from source");
    assign_technicians(&jobs, request, options)
}

/// `100 * (1 - coefficient of variation)` of the job counts, clamped to [0, 100]
/// and rounded to one decimal.
pub fn load_balance_score(counts: &[usize]) -> f64 {
    if counts.len() < 2 {
        return 100.0;
    }
    let n = counts.len() as f64;
    let mean = counts.iter().sum::<usize>() as f64 / n;
    if mean == 0.0 {
        return 100.0;
    }
    let variance = counts
        .iter()
        .map(|count| (*count as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let cv = variance.sqrt() / mean;
    let score = (100.0 * (1.0 - cv)).clamp(0.0, 100.0);
    (score * 10.0).round() / 10.0
}

fn enter(phase: Phase) {
    info!(?phase, "phase");
}

fn validate<J: Stop>(
    jobs: &[J],
    request: &AssignmentRequest,
    options: &PlannerOptions,
) -> Result<(), PlanError> {
    if request.technician_count < 1 {
        return Err(PlanError::InvalidInput("technician count must be at least 1".to_string()));
    }
    options.validate()?;

    let mut seen = HashSet::with_capacity(jobs.len());
    for job in jobs {
        if !job.location().is_valid() {
            return Err(PlanError::InvalidInput(format!(
                "job {:?} has invalid coordinate ({}, {})",
                job.id(),
                job.location().lat,
                job.location().lon
            )));
        }
        if !seen.insert(job.id()) {
            return Err(PlanError::InvalidInput(format!("duplicate job id {:?}", job.id())));
        }
    }

    if let Some(starts) = &request.start_locations {
        if starts.len() != request.technician_count {
            return Err(PlanError::InvalidInput(format!(
                "expected {} start locations, got {}",
                request.technician_count,
                starts.len()
            )));
        }
        for start in starts {
            start.validate()?;
        }
    }

    Ok(())
}

/// Requested names, completed with "Technician n" when missing or short.
fn technician_names(requested: Option<&[String]>, count: usize) -> Vec<String> {
    let requested = requested.unwrap_or_default();
    (0..count)
        .map(|idx| {
            requested
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("Technician {}", idx + 1))
        })
        .collect()
}

/// Location of the job closest to `anchor`, job id breaking ties.
fn nearest_job_to<J: Stop>(jobs: &[&J], anchor: Coordinate) -> Option<Coordinate> {
    jobs.iter()
        .map(|job| (haversine::distance_meters(anchor, job.location()), *job))
        .min_by(|(a_dist, a), (b_dist, b)| {
            a_dist.total_cmp(b_dist).then_with(|| a.id().cmp(b.id()))
        })
        .map(|(_, job)| job.location())
}

fn place_nearest_job_starts<J: Stop>(clusters: &mut [Cluster<'_, J>], depot: Coordinate) {
    for cluster in clusters.iter_mut() {
        if let Some(start) = nearest_job_to(&cluster.jobs, depot) {
            cluster.start_location = start;
        }
    }
}

/// Hands territories to technicians by urgency, then proximity to the depot.
///
/// Non-empty territories come first. Among them the score is
/// `urgent jobs * 100 - km from depot to centroid`, highest first, previous
/// index breaking ties. Technician indices are renumbered to the new order.
fn order_territories<J: Stop>(clusters: &mut [Cluster<'_, J>], depot: Coordinate) {
    let score = |cluster: &Cluster<'_, J>| {
        cluster.urgent_count() as f64 * URGENT_TERRITORY_WEIGHT
            - haversine::distance_meters(depot, cluster.centroid) / 1000.0
    };

    clusters.sort_by(|a, b| {
        a.is_empty()
            .cmp(&b.is_empty())
            .then_with(|| score(b).total_cmp(&score(a)))
            .then_with(|| a.technician_index.cmp(&b.technician_index))
    });

    for (idx, cluster) in clusters.iter_mut().enumerate() {
        cluster.technician_index = idx;
    }
    debug!(
        order = ?clusters.iter().map(|cluster| cluster.len()).collect::<Vec<_>>(),
        "territories ordered"
    );
}

fn convergence_of(
    clustering: &KMeansOutcome,
    count_balance: PhaseOutcome,
    time_balance: TimeBalanceOutcome,
) -> Convergence {
    Convergence {
        clustering_iterations: clustering.iterations,
        clustering_converged: clustering.converged,
        count_balance,
        time_balance,
    }
}

fn build_result<J, M>(
    clusters: &[Cluster<'_, J>],
    names: &[String],
    model: &M,
    convergence: Convergence,
) -> AssignmentResult<J::Id>
where
    J: Stop,
    M: TravelModel + ?Sized,
{
    let routes: Vec<Route<'_, J>> = clusters
        .par_iter()
        .map(|cluster| sequence(&cluster.jobs, cluster.start_location, model))
        .collect();

    let per_technician: Vec<TechnicianAssignment<J::Id>> = clusters
        .iter()
        .zip(&routes)
        .map(|(cluster, route)| {
            technician_assignment(cluster, route, &names[cluster.technician_index])
        })
        .collect();

    let counts: Vec<usize> = per_technician.iter().map(|tech| tech.job_count).collect();
    let total_jobs: usize = counts.iter().sum();

    let mut most_loaded: Option<&TechnicianAssignment<J::Id>> = None;
    for tech in &per_technician {
        if most_loaded.is_none_or(|best| tech.job_count > best.job_count) {
            most_loaded = Some(tech);
        }
    }
    let most_loaded_technician = most_loaded
        .filter(|tech| tech.job_count > 0)
        .map(|tech| tech.technician_name.clone());
    let average_jobs_per_technician = if per_technician.is_empty() {
        0.0
    } else {
        (total_jobs as f64 / per_technician.len() as f64 * 10.0).round() / 10.0
    };

    AssignmentResult {
        total_technicians: per_technician.len(),
        total_jobs,
        total_distance_meters: per_technician.iter().map(|tech| tech.total_distance_meters).sum(),
        max_duration_minutes: per_technician
            .iter()
            .map(|tech| tech.estimated_duration_minutes)
            .fold(0.0, f64::max),
        load_balance_score: load_balance_score(&counts),
        most_loaded_technician,
        average_jobs_per_technician,
        per_technician,
        convergence,
    }
}

fn technician_assignment<J: Stop>(
    cluster: &Cluster<'_, J>,
    route: &Route<'_, J>,
    name: &str,
) -> TechnicianAssignment<J::Id> {
    let ordered_stops = route
        .ordered_stops
        .iter()
        .zip(&route.arrival_minutes)
        .enumerate()
        .map(|(order, (job, arrival))| {
            let location = job.location();
            RouteStop {
                job_id: job.id().clone(),
                order,
                lat: location.lat,
                lon: location.lon,
                priority: job.priority(),
                station_id: job.station_id().map(str::to_string),
                estimated_arrival_minutes: *arrival,
            }
        })
        .collect();

    TechnicianAssignment {
        technician_index: cluster.technician_index,
        technician_name: name.to_string(),
        start_location: cluster.start_location,
        job_count: cluster.len(),
        urgent_count: cluster.urgent_count(),
        ordered_stops,
        total_distance_meters: route.total_distance_meters,
        estimated_duration_minutes: route.estimated_duration_minutes,
        priority_score: cluster.jobs.iter().map(|job| job.priority().weight()).sum(),
    }
}
