//! Greedy heuristics from the supplementary material of the Alonso-Mora
//! paper. Neither leaves requests out on purpose; penalties are ignored.

use std::collections::HashSet;

use crate::request::RequestId;
use crate::trip::Trip;
use crate::vehicle::VehicleId;

use super::{AssignmentProblem, AssignmentSolution, AssignmentSolver, SolutionStatus};

/// Visits vehicles by id and gives each its cheapest trip whose requests are
/// still free.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyVehicleFirstSolver;

impl AssignmentSolver for GreedyVehicleFirstSolver {
    fn solve(&self, problem: &AssignmentProblem<'_>) -> AssignmentSolution {
        let trips = problem.trips;

        let mut vehicles: Vec<VehicleId> = trips.iter().map(|trip| trip.vehicle).collect();
        vehicles.sort();
        vehicles.dedup();

        let mut claimed: HashSet<RequestId> = HashSet::new();
        let mut selected = Vec::new();

        for vehicle in vehicles {
            let mut candidates: Vec<usize> = (0..trips.len())
                .filter(|index| trips[*index].vehicle == vehicle)
                .collect();
            candidates.sort_by(|a, b| trips[*a].cmp_by_cost(&trips[*b]));

            let choice = candidates
                .into_iter()
                .find(|index| is_free(&trips[*index], &claimed));

            if let Some(index) = choice {
                claimed.extend(trips[index].requests.iter().copied());
                selected.push(index);
            }
        }

        AssignmentSolution {
            status: SolutionStatus::Optimal,
            selected,
        }
    }
}

/// Visits all trips by ascending cost and takes every trip whose vehicle
/// and requests are still free.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyTripFirstSolver;

impl AssignmentSolver for GreedyTripFirstSolver {
    fn solve(&self, problem: &AssignmentProblem<'_>) -> AssignmentSolution {
        let trips = problem.trips;

        let mut order: Vec<usize> = (0..trips.len()).collect();
        order.sort_by(|a, b| trips[*a].cmp_by_cost(&trips[*b]));

        let mut claimed: HashSet<RequestId> = HashSet::new();
        let mut busy: HashSet<VehicleId> = HashSet::new();
        let mut selected = Vec::new();

        for index in order {
            let trip = &trips[index];

            if busy.contains(&trip.vehicle) || !is_free(trip, &claimed) {
                continue;
            }

            busy.insert(trip.vehicle);
            claimed.extend(trip.requests.iter().copied());
            selected.push(index);
        }

        AssignmentSolution {
            status: SolutionStatus::Optimal,
            selected,
        }
    }
}

fn is_free(trip: &Trip, claimed: &HashSet<RequestId>) -> bool {
    trip.requests.iter().all(|request| !claimed.contains(request))
}
