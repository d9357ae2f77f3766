//! Selection of a conflict-free set of trips.
//!
//! At most one trip per vehicle is chosen and every request is either served
//! by exactly one chosen trip or left out at a penalty.

mod cbc;
mod greedy;
mod mps;

pub use cbc::CbcMpsAssignmentSolver;
pub use greedy::{GreedyTripFirstSolver, GreedyVehicleFirstSolver};
pub use mps::write_assignment_problem;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::request::{Request, RequestPool};
use crate::trip::Trip;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentSolverKind {
    GreedyVehicleFirst,
    GreedyTripFirst,
    CbcMps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    Optimal,
    /// Usable but not proven optimal, e.g. the solver hit its time limit.
    Feasible,
    /// No usable result; the caller falls back to another solver.
    Failure,
}

/// Cost of leaving a request out of the selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RejectionPenalty {
    /// Charged for requests that already had a vehicle before this cycle.
    pub unassignment: f64,
    /// Charged for requests that never had one.
    pub rejection: f64,
}

impl Default for RejectionPenalty {
    fn default() -> Self {
        Self {
            unassignment: 86_400_000.0,
            rejection: 86_400.0,
        }
    }
}

impl RejectionPenalty {
    pub fn new(unassignment: f64, rejection: f64) -> Self {
        Self {
            unassignment,
            rejection,
        }
    }

    pub fn penalty(&self, request: &Request) -> f64 {
        if request.is_assigned() {
            self.unassignment
        } else {
            self.rejection
        }
    }
}

/// Candidate trips of all vehicles for one cycle.
#[derive(Debug, Clone, Copy)]
pub struct AssignmentProblem<'a> {
    pub trips: &'a [Trip],
    pub pool: &'a RequestPool,
    pub penalty: RejectionPenalty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentSolution {
    pub status: SolutionStatus,
    /// Indices into [`AssignmentProblem::trips`].
    pub selected: Vec<usize>,
}

impl AssignmentSolution {
    pub fn failure() -> Self {
        Self {
            status: SolutionStatus::Failure,
            selected: Vec::new(),
        }
    }
}

pub trait AssignmentSolver: Send + Sync {
    fn solve(&self, problem: &AssignmentProblem<'_>) -> AssignmentSolution;
}

/// Keeps selected trips in order as long as they share neither vehicle nor
/// request with an earlier one.
pub fn retain_conflict_free(trips: &[Trip], selected: &[usize]) -> Vec<usize> {
    let mut vehicles = HashSet::new();
    let mut requests = HashSet::new();

    selected
        .iter()
        .copied()
        .filter(|index| *index < trips.len())
        .filter(|index| {
            let trip = &trips[*index];

            if vehicles.contains(&trip.vehicle)
                || trip.requests.iter().any(|request| requests.contains(request))
            {
                return false;
            }

            vehicles.insert(trip.vehicle);
            requests.extend(trip.requests.iter().copied());
            true
        })
        .collect()
}
