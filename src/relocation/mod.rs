//! Rebalancing of idle vehicles towards unserved demand.

mod best_response;
mod cbc;
mod matching;
mod mps;

pub use best_response::BestResponseRelocationSolver;
pub use cbc::CbcMpsRelocationSolver;
pub use matching::MatchingRelocationSolver;
pub use mps::write_relocation_problem;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::stop::Location;
use crate::vehicle::VehicleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelocationSolverKind {
    Noop,
    BestResponse,
    Matching,
    CbcMps,
}

/// Candidate drive of a vehicle to a destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Relocation {
    pub vehicle: VehicleId,
    pub destination: Location,
    pub cost: f64,
}

impl Relocation {
    pub fn new(vehicle: VehicleId, destination: Location, cost: f64) -> Self {
        Self {
            vehicle,
            destination,
            cost,
        }
    }
}

pub trait RelocationSolver: Send + Sync {
    /// Chooses relocations among the candidates; each vehicle and each
    /// destination appears at most once in the result.
    fn solve(&self, candidates: &[Relocation]) -> Vec<Relocation>;
}

/// Relocation disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRelocationSolver;

impl RelocationSolver for NoopRelocationSolver {
    fn solve(&self, _candidates: &[Relocation]) -> Vec<Relocation> {
        Vec::new()
    }
}

/// Number of relocations a complete matching makes.
pub fn matching_size(candidates: &[Relocation]) -> usize {
    let vehicles: HashSet<VehicleId> = candidates.iter().map(|r| r.vehicle).collect();
    let destinations: HashSet<Location> = candidates.iter().map(|r| r.destination).collect();
    vehicles.len().min(destinations.len())
}

/// Keeps relocations in order while neither their vehicle nor their
/// destination has been used by an earlier one.
pub(crate) fn retain_one_to_one(relocations: impl IntoIterator<Item = Relocation>) -> Vec<Relocation> {
    let mut vehicles = HashSet::new();
    let mut destinations = HashSet::new();

    relocations
        .into_iter()
        .filter(|relocation| {
            if vehicles.contains(&relocation.vehicle) || destinations.contains(&relocation.destination) {
                return false;
            }

            vehicles.insert(relocation.vehicle);
            destinations.insert(relocation.destination);
            true
        })
        .collect()
}
