//! Evaluated routes and the trips built from them.

use std::cmp::Ordering;

use crate::request::RequestId;
use crate::stop::Stop;
use crate::vehicle::VehicleId;

/// Best sequence found for a (vehicle, request set) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub cost: f64,
    /// Snapshot of the stops with their computed times.
    pub stops: Vec<Stop>,
}

impl RouteResult {
    pub fn empty() -> Self {
        Self {
            cost: 0.0,
            stops: Vec::new(),
        }
    }
}

/// A feasible pairing of one vehicle with a request set. Requests are kept in
/// (load, id) order.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub vehicle: VehicleId,
    pub requests: Vec<RequestId>,
    pub result: RouteResult,
}

impl Trip {
    pub fn new(vehicle: VehicleId, requests: Vec<RequestId>, result: RouteResult) -> Self {
        Self {
            vehicle,
            requests,
            result,
        }
    }

    pub fn cost(&self) -> f64 {
        self.result.cost
    }

    pub fn level(&self) -> usize {
        self.requests.len()
    }

    pub fn cmp_by_cost(&self, other: &Trip) -> Ordering {
        self.cost().total_cmp(&other.cost())
    }
}
