//! Per-cycle orchestration: shareability, trip graphs, assignment and
//! relocation.
//!
//! The dispatcher only reads the request pool and the vehicle snapshots. Its
//! decisions come back as a [`DispatchOutcome`] which the host applies to its
//! schedules and, through [`DispatchOutcome::apply`], to the pool.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::assignment::{
    AssignmentProblem, AssignmentSolution, AssignmentSolver, AssignmentSolverKind,
    CbcMpsAssignmentSolver, GreedyTripFirstSolver, GreedyVehicleFirstSolver, SolutionStatus,
};
use crate::cbc::CbcSolver;
use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::function::{Constraint, Objective, RouteFunction};
use crate::graph::{RequestGraph, VehicleGraph};
use crate::relocation::{
    BestResponseRelocationSolver, CbcMpsRelocationSolver, MatchingRelocationSolver,
    NoopRelocationSolver, Relocation, RelocationSolver, RelocationSolverKind,
};
use crate::request::{RequestId, RequestPool};
use crate::stop::{Location, Stop};
use crate::traits::{StopDurationProvider, TravelTimeEstimator};
use crate::trip::{RouteResult, Trip};
use crate::vehicle::{Vehicle, VehicleId};

/// A trip chosen for a vehicle in this cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub vehicle: VehicleId,
    /// Newly served requests; onboard passengers are implied.
    pub requests: Vec<RequestId>,
    /// The new route with projected pickup and dropoff times.
    pub stops: Vec<Stop>,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reassignment {
    pub request: RequestId,
    pub from: VehicleId,
    pub to: VehicleId,
}

/// Timings and sizes of one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CycleInformation {
    pub time: f64,
    /// Number of shareable request pairs.
    pub request_graph_size: usize,
    pub request_graph_time: Duration,
    /// Number of trips over all vehicles.
    pub trip_graph_size: usize,
    pub trip_graph_time: Duration,
    pub assignment_time: Duration,
    /// `None` when the assignment was skipped.
    pub solution_status: Option<SolutionStatus>,
    pub relocations: usize,
    pub relocation_time: Duration,
    pub reassignments: usize,
    /// Vehicles by number of passengers on board, indexed by passenger count.
    pub occupancy_by_passengers: Vec<usize>,
    /// Vehicles by number of onboard requests, indexed by request count.
    pub occupancy_by_requests: Vec<usize>,
}

/// Cycle statistics kept across the lifetime of a dispatcher.
#[derive(Debug, Clone, Default)]
pub struct InformationCollector {
    cycles: Vec<CycleInformation>,
}

impl InformationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, information: CycleInformation) {
        self.cycles.push(information);
    }

    pub fn cycles(&self) -> &[CycleInformation] {
        &self.cycles
    }

    /// Hands out everything collected so far and starts over.
    pub fn drain(&mut self) -> Vec<CycleInformation> {
        std::mem::take(&mut self.cycles)
    }

    pub fn total_reassignments(&self) -> usize {
        self.cycles.iter().map(|cycle| cycle.reassignments).sum()
    }

    pub fn total_relocations(&self) -> usize {
        self.cycles.iter().map(|cycle| cycle.relocations).sum()
    }

    /// Cycles in which the assignment solver reported `status`.
    pub fn count_status(&self, status: SolutionStatus) -> usize {
        self.cycles
            .iter()
            .filter(|cycle| cycle.solution_status == Some(status))
            .count()
    }
}

/// Decisions of one dispatch cycle.
///
/// Vehicles without an entry in `assignments` keep their route, minus the
/// stops of requests listed in `unassigned` or `reassigned`.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    pub time: f64,
    pub assignments: Vec<Assignment>,
    pub reassigned: Vec<Reassignment>,
    /// Previously assigned requests that lost their vehicle.
    pub unassigned: Vec<RequestId>,
    /// Requests that were never assigned and ran out of time.
    pub rejected: Vec<RequestId>,
    pub relocations: Vec<Relocation>,
    /// Relocating vehicles that should stop where they are.
    pub stopped: Vec<VehicleId>,
    pub information: CycleInformation,
}

impl DispatchOutcome {
    /// Writes the request side of the outcome back into the pool.
    pub fn apply(&self, pool: &mut RequestPool, now: f64) {
        for assignment in &self.assignments {
            for id in &assignment.requests {
                if let Some(request) = pool.get_mut(*id) {
                    request.assign(assignment.vehicle);
                    request.accept();
                }
            }
        }

        for id in &self.unassigned {
            if let Some(request) = pool.get_mut(*id) {
                request.unassign();
            }
        }

        for id in &self.rejected {
            if let Some(request) = pool.get_mut(*id) {
                request.reject();
            }
        }

        tracing::debug!(
            "Applied dispatch outcome of {} at {}: {} assignments, {} unassigned, {} rejected",
            self.time,
            now,
            self.assignments.len(),
            self.unassigned.len(),
            self.rejected.len()
        );
    }

    fn skipped(now: f64) -> Self {
        Self {
            time: now,
            ..Self::default()
        }
    }
}

/// Runs dispatch cycles with a fixed configuration.
pub struct Dispatcher {
    config: DispatchConfig,
    function: RouteFunction,
    solver: Box<dyn AssignmentSolver>,
    fallback: Box<dyn AssignmentSolver>,
    relocation: Box<dyn RelocationSolver>,
    collector: InformationCollector,
}

impl Dispatcher {
    /// Validates the configuration and sets up the solvers. Fails if a
    /// configured external solver is not available.
    pub fn new(
        config: DispatchConfig,
        estimator: Arc<dyn TravelTimeEstimator>,
        stop_durations: Arc<dyn StopDurationProvider>,
    ) -> Result<Self, DispatchError> {
        config.validate()?;

        let mut cbc: Option<CbcSolver> = None;
        let solver = build_assignment_solver(&config, config.assignment.solver, &mut cbc)?;
        let fallback = build_assignment_solver(&config, config.assignment.fallback, &mut cbc)?;
        let relocation = build_relocation_solver(&config, &mut cbc)?;

        let function = RouteFunction::new(
            estimator,
            stop_durations,
            config.sequence_generators(),
            config.function_options(),
        );

        Ok(Self {
            config,
            function,
            solver,
            fallback,
            relocation,
            collector: InformationCollector::new(),
        })
    }

    /// Like [`Dispatcher::new`] with the travel-time estimator described by
    /// the configuration.
    pub fn from_config(
        config: DispatchConfig,
        stop_durations: Arc<dyn StopDurationProvider>,
    ) -> Result<Self, DispatchError> {
        let estimator = config.travel_time.build()?;
        Self::new(config, estimator, stop_durations)
    }

    pub fn with_objective(mut self, objective: impl Objective + 'static) -> Self {
        self.function = self.function.with_objective(objective);
        self
    }

    pub fn with_constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.function = self.function.with_constraint(constraint);
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn function(&self) -> &RouteFunction {
        &self.function
    }

    pub fn information(&self) -> &InformationCollector {
        &self.collector
    }

    pub fn information_mut(&mut self) -> &mut InformationCollector {
        &mut self.collector
    }

    /// Whether `now` falls on the dispatch grid.
    pub fn is_dispatch_time(&self, now: f64) -> bool {
        is_on_interval(now, self.config.assignment_interval)
    }

    /// Runs one cycle at simulation time `now`.
    pub fn dispatch(&mut self, pool: &RequestPool, vehicles: &[Vehicle], now: f64) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::skipped(now);
        outcome.information.time = now;

        let candidates: Vec<RequestId> = pool
            .active()
            .filter(|request| !request.is_picked_up())
            .map(|request| request.id())
            .collect();

        let has_unassigned = candidates.iter().any(|id| !pool[*id].is_assigned());

        if has_unassigned || self.config.congestion_mitigation.allow_bare_reassignment {
            self.assign(pool, vehicles, &candidates, now, &mut outcome);
        }

        if self.config.relocation_interval > 0 && is_on_interval(now, self.config.relocation_interval) {
            self.relocate(pool, vehicles, &candidates, now, &mut outcome);
        }

        let (by_passengers, by_requests) = occupancy(pool, vehicles);
        outcome.information.occupancy_by_passengers = by_passengers;
        outcome.information.occupancy_by_requests = by_requests;

        let information = &outcome.information;
        tracing::debug!(
            "Dispatch at {}: {} requests, {} shareable pairs in {:.3}s, {} trips in {:.3}s, assignment {:?} in {:.3}s, {} reassignments, {} relocations in {:.3}s",
            now,
            candidates.len(),
            information.request_graph_size,
            information.request_graph_time.as_secs_f64(),
            information.trip_graph_size,
            information.trip_graph_time.as_secs_f64(),
            information.solution_status,
            information.assignment_time.as_secs_f64(),
            information.reassignments,
            information.relocations,
            information.relocation_time.as_secs_f64()
        );

        if self.config.logging_interval > 0 && is_on_interval(now, self.config.logging_interval) {
            self.log_status(pool, vehicles, now);
        }

        self.collector.add(outcome.information.clone());
        outcome
    }

    fn assign(
        &self,
        pool: &RequestPool,
        vehicles: &[Vehicle],
        candidates: &[RequestId],
        now: f64,
        outcome: &mut DispatchOutcome,
    ) {
        let deadline = self
            .config
            .cycle_time_budget
            .map(|budget| Instant::now() + Duration::from_secs_f64(budget.max(0.0)));

        let started = Instant::now();
        let request_graph = RequestGraph::build(&self.function, pool, candidates, now);
        outcome.information.request_graph_size = request_graph.size();
        outcome.information.request_graph_time = started.elapsed();

        let started = Instant::now();
        let unpooled = self.unpooled_routes(pool, vehicles, candidates, now);
        let trips = self.build_trips(pool, vehicles, &request_graph, unpooled, deadline, now);
        outcome.information.trip_graph_size = trips.len();
        outcome.information.trip_graph_time = started.elapsed();

        let started = Instant::now();
        let solution = self.solve_assignment(pool, &trips);
        outcome.information.assignment_time = started.elapsed();
        outcome.information.solution_status = Some(solution.status);

        let mut served: HashMap<RequestId, VehicleId> = HashMap::new();

        for trip in solution.selected.iter().filter_map(|index| trips.get(*index)) {
            for request in &trip.requests {
                served.insert(*request, trip.vehicle);

                let previous = pool[*request].vehicle().filter(|vehicle| *vehicle != trip.vehicle);

                if let Some(previous) = previous {
                    outcome.reassigned.push(Reassignment {
                        request: *request,
                        from: previous,
                        to: trip.vehicle,
                    });
                }
            }

            outcome.assignments.push(Assignment {
                vehicle: trip.vehicle,
                requests: trip.requests.clone(),
                stops: trip.result.stops.clone(),
                cost: trip.cost(),
            });
        }

        for id in candidates {
            if served.contains_key(id) {
                continue;
            }

            let request = &pool[*id];

            if request.is_assigned() {
                outcome.unassigned.push(*id);
            } else if request.latest_assignment_time() <= now {
                outcome.rejected.push(*id);
            }
        }

        outcome.information.reassignments = outcome.reassigned.len();
    }

    /// Single-request routes per (vehicle, request) pair, keeping only the
    /// cheapest vehicles per request plus its current vehicle.
    fn unpooled_routes(
        &self,
        pool: &RequestPool,
        vehicles: &[Vehicle],
        candidates: &[RequestId],
        now: f64,
    ) -> Vec<Vec<(RequestId, RouteResult)>> {
        let pairs: Vec<(usize, RequestId)> = (0..vehicles.len())
            .flat_map(|vehicle| candidates.iter().map(move |request| (vehicle, *request)))
            .collect();

        let results: Vec<(usize, RequestId, RouteResult)> = pairs
            .into_par_iter()
            .filter_map(|(vehicle, request)| {
                self.function
                    .calculate_route(pool, &[request], &vehicles[vehicle], now)
                    .map(|result| (vehicle, request, result))
            })
            .collect();

        let mut by_request: HashMap<RequestId, Vec<(usize, RouteResult)>> = HashMap::new();
        for (vehicle, request, result) in results {
            by_request.entry(request).or_default().push((vehicle, result));
        }

        let limit = self.config.candidate_vehicles_per_request;
        let mut by_vehicle: Vec<Vec<(RequestId, RouteResult)>> = vec![Vec::new(); vehicles.len()];

        for (request, mut options) in by_request {
            options.sort_by(|a, b| a.1.cost.total_cmp(&b.1.cost).then(a.0.cmp(&b.0)));
            let current = pool[request].vehicle();

            for (rank, (vehicle, result)) in options.into_iter().enumerate() {
                let is_current = current == Some(vehicles[vehicle].id);

                if limit == 0 || rank < limit || is_current {
                    by_vehicle[vehicle].push((request, result));
                }
            }
        }

        for requests in &mut by_vehicle {
            requests.sort_by_key(|(request, _)| pool[*request].ordering_key());
        }

        by_vehicle
    }

    fn build_trips(
        &self,
        pool: &RequestPool,
        vehicles: &[Vehicle],
        request_graph: &RequestGraph,
        unpooled: Vec<Vec<(RequestId, RouteResult)>>,
        deadline: Option<Instant>,
        now: f64,
    ) -> Vec<Trip> {
        let limits = self.config.trip_limits();
        let preserve = self.config.congestion_mitigation.preserve_vehicle_assignments;

        let per_vehicle: Vec<Vec<Trip>> = vehicles
            .par_iter()
            .zip(unpooled.into_par_iter())
            .map(|(vehicle, requests)| {
                let mut graph = VehicleGraph::new(&self.function, request_graph, pool, vehicle, limits)
                    .with_deadline(deadline);

                for (request, result) in requests {
                    graph.add_request_with_result(request, now, result, true);
                }

                if preserve {
                    graph.preserve_vehicle_assignment(now);
                }

                let mut trips = graph.into_trips();

                if trips.is_empty() && !vehicle.onboard.is_empty() {
                    match self.function.calculate_route(pool, &[], vehicle, now) {
                        Some(result) => trips.push(Trip::new(vehicle.id, Vec::new(), result)),
                        None => tracing::warn!(
                            "Vehicle {} cannot finish its onboard requests",
                            vehicle.id.0
                        ),
                    }
                }

                trips
            })
            .collect();

        per_vehicle.into_iter().flatten().collect()
    }

    fn solve_assignment(&self, pool: &RequestPool, trips: &[Trip]) -> AssignmentSolution {
        let problem = AssignmentProblem {
            trips,
            pool,
            penalty: self.config.rejection_penalty(),
        };

        let solution = self.solver.solve(&problem);

        if solution.status != SolutionStatus::Failure {
            return solution;
        }

        tracing::warn!(
            "Assignment solver {:?} failed, falling back to {:?}",
            self.config.assignment.solver,
            self.config.assignment.fallback
        );
        self.fallback.solve(&problem)
    }

    fn relocate(
        &self,
        pool: &RequestPool,
        vehicles: &[Vehicle],
        candidates: &[RequestId],
        now: f64,
        outcome: &mut DispatchOutcome,
    ) {
        let started = Instant::now();

        let busy: HashSet<VehicleId> = outcome
            .assignments
            .iter()
            .filter(|assignment| !assignment.requests.is_empty())
            .map(|assignment| assignment.vehicle)
            .collect();

        let handled: HashSet<RequestId> = outcome
            .assignments
            .iter()
            .flat_map(|assignment| assignment.requests.iter().copied())
            .chain(outcome.rejected.iter().copied())
            .collect();

        let mut seen = HashSet::new();
        let destinations: Vec<Location> = candidates
            .iter()
            .filter(|id| !handled.contains(*id))
            .filter(|id| !pool[**id].is_assigned() || outcome.unassigned.contains(*id))
            .map(|id| pool[*id].pickup_location())
            .filter(|location| seen.insert(location.id))
            .collect();

        let binding = self.config.use_binding_relocations;
        let relocatable: Vec<&Vehicle> = vehicles
            .iter()
            .filter(|vehicle| !busy.contains(&vehicle.id))
            .filter(|vehicle| vehicle.is_idle())
            .filter(|vehicle| binding || !vehicle.is_relocating())
            .collect();

        let relocations = if destinations.is_empty() || relocatable.is_empty() {
            Vec::new()
        } else {
            let edges: Vec<Relocation> = relocatable
                .par_iter()
                .flat_map_iter(|vehicle| {
                    destinations.iter().filter_map(move |destination| {
                        self.function
                            .check_relocation(vehicle, destination, now)
                            .map(|arrival| Relocation::new(vehicle.id, *destination, arrival - now))
                    })
                })
                .collect();

            self.relocation.solve(&edges)
        };

        if self.config.use_stepwise_relocation {
            let relocated: HashSet<VehicleId> = relocations.iter().map(|r| r.vehicle).collect();

            outcome.stopped = vehicles
                .iter()
                .filter(|vehicle| vehicle.is_relocating())
                .filter(|vehicle| !relocated.contains(&vehicle.id) && !busy.contains(&vehicle.id))
                .map(|vehicle| vehicle.id)
                .collect();
        }

        outcome.information.relocations = relocations.len();
        outcome.information.relocation_time = started.elapsed();
        outcome.relocations = relocations;
    }

    fn log_status(&self, pool: &RequestPool, vehicles: &[Vehicle], now: f64) {
        let active = pool.active().count();
        let assigned = pool.active().filter(|request| request.is_assigned()).count();
        let onboard = pool.active().filter(|request| request.is_picked_up()).count();
        let rejected = pool.iter().filter(|request| request.is_rejected()).count();
        let idle = vehicles.iter().filter(|vehicle| vehicle.is_idle()).count();

        tracing::info!(
            "Status at {}: {} active requests ({} assigned, {} onboard), {} rejected, {}/{} vehicles idle, {} cycles, {} reassignments, {} relocations",
            now,
            active,
            assigned,
            onboard,
            rejected,
            idle,
            vehicles.len(),
            self.collector.cycles().len(),
            self.collector.total_reassignments(),
            self.collector.total_relocations()
        );
    }
}

fn is_on_interval(now: f64, interval: u64) -> bool {
    interval > 0 && now.rem_euclid(interval as f64) == 0.0
}

fn occupancy(pool: &RequestPool, vehicles: &[Vehicle]) -> (Vec<usize>, Vec<usize>) {
    let mut by_passengers = Vec::new();
    let mut by_requests = Vec::new();

    for vehicle in vehicles {
        let passengers = pool.total_load(&vehicle.onboard) as usize;
        let requests = vehicle.onboard.len();

        if by_passengers.len() <= passengers {
            by_passengers.resize(passengers + 1, 0);
        }
        if by_requests.len() <= requests {
            by_requests.resize(requests + 1, 0);
        }

        by_passengers[passengers] += 1;
        by_requests[requests] += 1;
    }

    (by_passengers, by_requests)
}

fn build_assignment_solver(
    config: &DispatchConfig,
    kind: AssignmentSolverKind,
    cbc: &mut Option<CbcSolver>,
) -> Result<Box<dyn AssignmentSolver>, DispatchError> {
    Ok(match kind {
        AssignmentSolverKind::GreedyVehicleFirst => Box::new(GreedyVehicleFirstSolver),
        AssignmentSolverKind::GreedyTripFirst => Box::new(GreedyTripFirstSolver),
        AssignmentSolverKind::CbcMps => Box::new(CbcMpsAssignmentSolver::new(
            cbc_solver(config, cbc)?,
            Duration::from_secs_f64(config.assignment.time_limit.max(0.0)),
            config.assignment.optimality_gap,
            config.assignment.random_seed,
        )),
    })
}

fn build_relocation_solver(
    config: &DispatchConfig,
    cbc: &mut Option<CbcSolver>,
) -> Result<Box<dyn RelocationSolver>, DispatchError> {
    Ok(match config.relocation.solver {
        RelocationSolverKind::Noop => Box::new(NoopRelocationSolver),
        RelocationSolverKind::BestResponse => Box::new(BestResponseRelocationSolver),
        RelocationSolverKind::Matching => Box::new(MatchingRelocationSolver),
        RelocationSolverKind::CbcMps => Box::new(CbcMpsRelocationSolver::new(
            cbc_solver(config, cbc)?,
            Duration::from_millis(config.relocation.runtime_threshold_ms),
            config.relocation.random_seed,
        )),
    })
}

fn cbc_solver(config: &DispatchConfig, cbc: &mut Option<CbcSolver>) -> Result<CbcSolver, DispatchError> {
    if let Some(solver) = cbc {
        return Ok(solver.clone());
    }

    let solver = match &config.working_directory {
        Some(directory) => CbcSolver::new(&config.cbc_executable, directory.clone())?,
        None => CbcSolver::in_temp_dir(&config.cbc_executable)?,
    };
    *cbc = Some(solver.clone());
    Ok(solver)
}
