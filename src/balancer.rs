//! Workload balancing between technician territories.
//!
//! Two passes run after clustering: a strict pass that evens out job counts,
//! then a soft pass that evens out estimated working time by moving single
//! jobs from the busiest territory to the idlest one.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clustering::Cluster;
use crate::planner::PlannerOptions;
use crate::sequencer::sequence;
use crate::traits::{Stop, TravelModel};

/// How a bounded balancing loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseOutcome {
    pub iterations: usize,
    pub transfers: usize,
    /// `false` when the loop stopped on its cap or on a stall.
    pub converged: bool,
}

/// Outcome of the time balancing pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBalanceOutcome {
    pub iterations: usize,
    pub transfers: usize,
    pub converged: bool,
    pub initial_spread_minutes: f64,
    pub final_spread_minutes: f64,
}

/// Moves jobs from the largest to the smallest cluster until sizes differ by at most one.
///
/// The moved job is the one closest to the receiving cluster's centroid. The
/// clusters that were largest when the pass starts keep the remainder jobs.
pub fn balance_counts<J: Stop>(
    clusters: &mut [Cluster<'_, J>],
    max_iterations: usize,
) -> PhaseOutcome {
    if clusters.is_empty() {
        return PhaseOutcome {
            iterations: 0,
            transfers: 0,
            converged: true,
        };
    }

    let total: usize = clusters.iter().map(|cluster| cluster.len()).sum();
    info!(
        total_jobs = total,
        target_count = total / clusters.len().max(1),
        technicians = clusters.len(),
        "count balancing started"
    );

    let mut iterations = 0;
    let mut transfers = 0;

    while iterations < max_iterations {
        let (largest, smallest) = size_extremes(clusters);
        if clusters[largest].len() - clusters[smallest].len() <= 1 {
            break;
        }
        iterations += 1;

        let target = clusters[smallest].centroid;
        let Some(position) =
            closest_job(&clusters[largest], |job| job.location().euclidean(&target))
        else {
            break;
        };

        let job = clusters[largest].remove(position);
        clusters[smallest].push(job);
        transfers += 1;

        debug!(
            from = largest,
            to = smallest,
            from_count = clusters[largest].len(),
            to_count = clusters[smallest].len(),
            "count transfer"
        );
    }

    let converged = count_spread(clusters) <= 1;
    let counts: Vec<usize> = clusters.iter().map(|cluster| cluster.len()).collect();
    if converged {
        info!(?counts, iterations, "count balancing converged");
    } else {
        warn!(?counts, iterations, "count balancing stopped before convergence");
    }

    PhaseOutcome {
        iterations,
        transfers,
        converged,
    }
}

/// Moves jobs from the longest to the shortest route until durations are within tolerance.
///
/// Candidates are ranked by how much closer they sit to the receiving
/// territory, urgent jobs carrying `urgent_transfer_penalty` so they are
/// tried last. A move is kept only if it strictly shrinks the gap between the
/// longest and shortest route, so job counts may drift apart here. When no
/// candidate qualifies the pass stops.
pub fn balance_time<J, M>(
    clusters: &mut [Cluster<'_, J>],
    model: &M,
    options: &PlannerOptions,
) -> TimeBalanceOutcome
where
    J: Stop,
    M: TravelModel + ?Sized,
{
    if clusters.is_empty() {
        return TimeBalanceOutcome {
            iterations: 0,
            transfers: 0,
            converged: true,
            initial_spread_minutes: 0.0,
            final_spread_minutes: 0.0,
        };
    }

    let mut durations: Vec<f64> = clusters
        .par_iter()
        .map(|cluster| {
            sequence(&cluster.jobs, cluster.start_location, model).estimated_duration_minutes
        })
        .collect();

    let initial_spread = spread(&durations);
    info!(?durations, spread_minutes = initial_spread, "time balancing started");

    let mut iterations = 0;
    let mut transfers = 0;
    let mut converged = false;

    while iterations < options.time_balance_max_iterations {
        let (longest, shortest) = duration_extremes(&durations);
        let current_spread = durations[longest] - durations[shortest];
        if current_spread <= options.time_tolerance_minutes {
            converged = true;
            break;
        }
        iterations += 1;

        let candidates = rank_candidates(
            &clusters[longest],
            &clusters[shortest],
            options.urgent_transfer_penalty,
        );

        let mut accepted = None;
        for position in candidates {
            let job = clusters[longest].jobs[position];

            let mut donor = clusters[longest].jobs.clone();
            donor.remove(position);
            let mut receiver = clusters[shortest].jobs.clone();
            receiver.push(job);

            let donor_start = clusters[longest].start_location;
            let receiver_start = clusters[shortest].start_location;
            let (donor_minutes, receiver_minutes) = rayon::join(
                || sequence(&donor, donor_start, model).estimated_duration_minutes,
                || sequence(&receiver, receiver_start, model).estimated_duration_minutes,
            );

            let mut trial = durations.clone();
            trial[longest] = donor_minutes;
            trial[shortest] = receiver_minutes;

            if spread(&trial) < current_spread {
                accepted = Some((position, trial));
                break;
            }
        }

        let Some((position, trial)) = accepted else {
            warn!(
                longest,
                shortest,
                spread_minutes = current_spread,
                "time balancing stalled: no transfer improves the spread"
            );
            break;
        };

        let job = clusters[longest].remove(position);
        clusters[shortest].push(job);
        durations = trial;
        transfers += 1;

        debug!(
            from = longest,
            to = shortest,
            job = ?job.id(),
            spread_minutes = spread(&durations),
            "time transfer"
        );
    }

    let final_spread = spread(&durations);
    if !converged && final_spread <= options.time_tolerance_minutes {
        converged = true;
    }

    if converged {
        info!(iterations, transfers, spread_minutes = final_spread, "time balancing converged");
    } else {
        warn!(
            iterations,
            transfers,
            spread_minutes = final_spread,
            "time balancing stopped before convergence"
        );
    }

    TimeBalanceOutcome {
        iterations,
        transfers,
        converged,
        initial_spread_minutes: initial_spread,
        final_spread_minutes: final_spread,
    }
}

/// Difference between the largest and smallest cluster size.
pub fn count_spread<J: Stop>(clusters: &[Cluster<'_, J>]) -> usize {
    if clusters.is_empty() {
        return 0;
    }
    let (largest, smallest) = size_extremes(clusters);
    clusters[largest].len() - clusters[smallest].len()
}

/// Positions in `donor` ordered from best to worst transfer candidate.
fn rank_candidates<J: Stop>(
    donor: &Cluster<'_, J>,
    receiver: &Cluster<'_, J>,
    urgent_penalty: f64,
) -> Vec<usize> {
    let mut scored: Vec<(f64, usize)> = donor
        .jobs
        .iter()
        .enumerate()
        .map(|(position, job)| {
            let location = job.location();
            let penalty = if job.priority().is_urgent() { urgent_penalty } else { 0.0 };
            let score = location.euclidean(&receiver.centroid)
                - location.euclidean(&donor.centroid)
                + penalty;
            (score, position)
        })
        .collect();

    scored.sort_by(|(a_score, a_pos), (b_score, b_pos)| {
        a_score
            .total_cmp(b_score)
            .then_with(|| donor.jobs[*a_pos].id().cmp(donor.jobs[*b_pos].id()))
    });

    scored.into_iter().map(|(_, position)| position).collect()
}

/// Position of the job minimizing `distance`, job id breaking ties.
fn closest_job<J, F>(cluster: &Cluster<'_, J>, distance: F) -> Option<usize>
where
    J: Stop,
    F: Fn(&J) -> f64,
{
    let mut best: Option<(usize, f64)> = None;
    for (position, job) in cluster.jobs.iter().enumerate() {
        let d = distance(*job);
        let better = match best {
            None => true,
            Some((best_pos, best_d)) => {
                d.total_cmp(&best_d)
                    .then_with(|| job.id().cmp(cluster.jobs[best_pos].id()))
                    == Ordering::Less
            }
        };
        if better {
            best = Some((position, d));
        }
    }
    best.map(|(position, _)| position)
}

/// Indices of the largest and smallest cluster, lowest index on ties.
fn size_extremes<J: Stop>(clusters: &[Cluster<'_, J>]) -> (usize, usize) {
    let mut largest = 0;
    let mut smallest = 0;
    for (idx, cluster) in clusters.iter().enumerate() {
        if cluster.len() > clusters[largest].len() {
            largest = idx;
        }
        if cluster.len() < clusters[smallest].len() {
            smallest = idx;
        }
    }
    (largest, smallest)
}

fn duration_extremes(durations: &[f64]) -> (usize, usize) {
    let mut longest = 0;
    let mut shortest = 0;
    for (idx, minutes) in durations.iter().enumerate() {
        if *minutes > durations[longest] {
            longest = idx;
        }
        if *minutes < durations[shortest] {
            shortest = idx;
        }
    }
    (longest, shortest)
}

fn spread(durations: &[f64]) -> f64 {
    if durations.is_empty() {
        return 0.0;
    }
    let (longest, shortest) = duration_extremes(durations);
    durations[longest] - durations[shortest]
}
