//! Dispatcher configuration.
//!
//! All fields have defaults, so partial configurations deserialize.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assignment::{AssignmentSolverKind, RejectionPenalty};
use crate::error::DispatchError;
use crate::function::FunctionOptions;
use crate::graph::TripLimits;
use crate::haversine::HaversineEstimator;
use crate::osrm::{OsrmConfig, OsrmEstimator};
use crate::relocation::RelocationSolverKind;
use crate::sequence::{SequenceGeneratorFactory, SequenceGeneratorKind};
use crate::traits::TravelTimeEstimator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Seconds between status lines.
    pub logging_interval: u64,
    /// Seconds a request may wait for its first assignment.
    pub maximum_queue_time: f64,
    pub check_deterministic_travel_times: bool,
    pub sequence_generator: SequenceGeneratorKind,
    /// Load from which the combined generator only inserts into the
    /// committed route.
    pub insertion_start_occupancy: u32,
    /// Cheapest vehicles kept per request; 0 keeps all.
    pub candidate_vehicles_per_request: usize,
    pub vehicle_stop_duration: f64,
    pub violation_factor: f64,
    pub violation_offset: f64,
    pub prefer_non_violation: bool,
    pub relax_dropoff_only_deadlines: bool,
    /// Seconds between dispatch cycles.
    pub assignment_interval: u64,
    pub rejection_penalty: f64,
    pub unassignment_penalty: f64,
    /// Seconds between relocation rounds; 0 disables relocation.
    pub relocation_interval: u64,
    /// Relocating vehicles may receive a new relocation destination.
    pub use_binding_relocations: bool,
    /// Relocating vehicles without a new destination are stopped.
    pub use_stepwise_relocation: bool,
    pub trip_graph_limit_per_vehicle: usize,
    pub trip_graph_limit_per_sequence_length: usize,
    /// Wall-clock seconds the trip graphs of one cycle may take.
    pub cycle_time_budget: Option<f64>,
    pub congestion_mitigation: CongestionMitigation,
    pub assignment: AssignmentConfig,
    pub relocation: RelocationConfig,
    pub travel_time: TravelTimeConfig,
    pub cbc_executable: String,
    /// Where solver files go. Unset gives every dispatcher a fresh
    /// directory under the system temp dir; a configured directory must not
    /// be shared between dispatchers running at the same time.
    pub working_directory: Option<PathBuf>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            logging_interval: 600,
            maximum_queue_time: 0.0,
            check_deterministic_travel_times: false,
            sequence_generator: SequenceGeneratorKind::Combined,
            insertion_start_occupancy: 5,
            candidate_vehicles_per_request: 30,
            vehicle_stop_duration: 60.0,
            violation_factor: 60.0,
            violation_offset: 10000.0,
            prefer_non_violation: false,
            relax_dropoff_only_deadlines: true,
            assignment_interval: 30,
            rejection_penalty: 86400.0,
            unassignment_penalty: 86_400_000.0,
            relocation_interval: 30,
            use_binding_relocations: false,
            use_stepwise_relocation: false,
            trip_graph_limit_per_vehicle: 0,
            trip_graph_limit_per_sequence_length: 0,
            cycle_time_budget: None,
            congestion_mitigation: CongestionMitigation::default(),
            assignment: AssignmentConfig::default(),
            relocation: RelocationConfig::default(),
            travel_time: TravelTimeConfig::default(),
            cbc_executable: "cbc".to_string(),
            working_directory: None,
        }
    }
}

/// Tolerance towards committed stops drifting late in congestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CongestionMitigation {
    /// Re-optimise assigned requests even when nothing new arrived.
    pub allow_bare_reassignment: bool,
    pub preserve_vehicle_assignments: bool,
    pub allow_pickup_violations: bool,
    pub allow_pickups_with_dropoff_violations: bool,
}

impl Default for CongestionMitigation {
    fn default() -> Self {
        Self {
            allow_bare_reassignment: false,
            preserve_vehicle_assignments: true,
            allow_pickup_violations: true,
            allow_pickups_with_dropoff_violations: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentConfig {
    pub solver: AssignmentSolverKind,
    /// Used when `solver` fails.
    pub fallback: AssignmentSolverKind,
    /// Seconds.
    pub time_limit: f64,
    pub optimality_gap: f64,
    pub random_seed: u64,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            solver: AssignmentSolverKind::GreedyTripFirst,
            fallback: AssignmentSolverKind::GreedyTripFirst,
            time_limit: 15.0,
            optimality_gap: 0.1,
            random_seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelocationConfig {
    pub solver: RelocationSolverKind,
    pub runtime_threshold_ms: u64,
    pub random_seed: u64,
}

impl Default for RelocationConfig {
    fn default() -> Self {
        Self {
            solver: RelocationSolverKind::BestResponse,
            runtime_threshold_ms: 3_600_000,
            random_seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TravelTimeConfig {
    /// Great-circle estimate only.
    Euclidean { distance_factor: f64, speed_kmh: f64 },
    /// OSRM only; unreachable pairs are infinitely far.
    Routing { osrm: OsrmConfig, cache_lifetime: f64 },
    /// OSRM with the great-circle estimate as fallback.
    Hybrid {
        osrm: OsrmConfig,
        cache_lifetime: f64,
        distance_factor: f64,
        speed_kmh: f64,
    },
}

impl Default for TravelTimeConfig {
    fn default() -> Self {
        TravelTimeConfig::Euclidean {
            distance_factor: 1.3,
            speed_kmh: 40.0,
        }
    }
}

impl TravelTimeConfig {
    pub fn build(&self) -> Result<Arc<dyn TravelTimeEstimator>, DispatchError> {
        match self {
            TravelTimeConfig::Euclidean {
                distance_factor,
                speed_kmh,
            } => Ok(Arc::new(HaversineEstimator::new(*distance_factor, *speed_kmh))),
            TravelTimeConfig::Routing {
                osrm,
                cache_lifetime,
            } => Ok(Arc::new(OsrmEstimator::new(osrm.clone(), *cache_lifetime)?)),
            TravelTimeConfig::Hybrid {
                osrm,
                cache_lifetime,
                distance_factor,
                speed_kmh,
            } => {
                let fallback = HaversineEstimator::new(*distance_factor, *speed_kmh);
                let estimator = OsrmEstimator::new(osrm.clone(), *cache_lifetime)?.with_fallback(fallback);
                Ok(Arc::new(estimator))
            }
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.assignment_interval == 0 {
            return Err(invalid("assignment_interval must be positive"));
        }

        if self.relocation_interval % self.assignment_interval != 0 {
            return Err(invalid("relocation_interval must be a multiple of assignment_interval"));
        }

        if self.logging_interval % self.assignment_interval != 0 {
            return Err(invalid("logging_interval must be a multiple of assignment_interval"));
        }

        if self.rejection_penalty < 0.0 || self.unassignment_penalty < 0.0 {
            return Err(invalid("penalties must not be negative"));
        }

        if self.violation_factor < 0.0 {
            return Err(invalid("violation_factor must not be negative"));
        }

        if !(0.0..=1.0).contains(&self.assignment.optimality_gap) {
            return Err(invalid("assignment.optimality_gap must be within [0, 1]"));
        }

        if self.insertion_start_occupancy == 0 {
            return Err(invalid("insertion_start_occupancy must be positive"));
        }

        Ok(())
    }

    pub fn function_options(&self) -> FunctionOptions {
        FunctionOptions {
            vehicle_stop_duration: self.vehicle_stop_duration,
            allow_pickup_violations: self.congestion_mitigation.allow_pickup_violations,
            allow_pickups_with_dropoff_violations: self
                .congestion_mitigation
                .allow_pickups_with_dropoff_violations,
            relax_dropoff_only_deadlines: self.relax_dropoff_only_deadlines,
            check_deterministic_travel_times: self.check_deterministic_travel_times,
            violation_factor: self.violation_factor,
            violation_offset: self.violation_offset,
            prefer_non_violation: self.prefer_non_violation,
        }
    }

    pub fn sequence_generators(&self) -> SequenceGeneratorFactory {
        SequenceGeneratorFactory::new(self.sequence_generator, self.insertion_start_occupancy)
    }

    pub fn rejection_penalty(&self) -> RejectionPenalty {
        RejectionPenalty::new(self.unassignment_penalty, self.rejection_penalty)
    }

    pub fn trip_limits(&self) -> TripLimits {
        TripLimits {
            per_vehicle: self.trip_graph_limit_per_vehicle,
            per_sequence_length: self.trip_graph_limit_per_sequence_length,
        }
    }
}

fn invalid(reason: &str) -> DispatchError {
    DispatchError::InvalidConfig(reason.to_string())
}
