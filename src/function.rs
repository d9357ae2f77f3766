//! Route evaluation: the best feasible stop sequence for a vehicle and a
//! request set.
//!
//! The evaluator drives a [`SequenceGenerator`] and a [`RouteTracker`] in
//! lock step. Every prefix the generator exposes is timed by the tracker and
//! checked against pickup and dropoff deadlines, vehicle capacity and the
//! pluggable [`Constraint`]; rejected prefixes are pruned with `abort`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::request::{Request, RequestId, RequestPool};
use crate::sequence::{ExtensiveSequenceGenerator, SequenceGenerator, SequenceGeneratorFactory};
use crate::stop::{Location, Stop, StopKind};
use crate::tracker::RouteTracker;
use crate::traits::{StopDurationProvider, TravelTimeEstimator};
use crate::trip::RouteResult;
use crate::vehicle::Vehicle;

/// Scores a (possibly partial) sequence. Lower is better.
pub trait Objective: Send + Sync {
    fn calculate(
        &self,
        pool: &RequestPool,
        vehicle: &Vehicle,
        stops: &[Stop],
        tracker: &RouteTracker<'_>,
        now: f64,
    ) -> f64;
}

/// Additional, domain-specific feasibility checks.
pub trait Constraint: Send + Sync {
    /// Extra violation amount of the sequence; anything but zero makes it
    /// infeasible unless only dropoffs remain.
    fn check_assignment(
        &self,
        pool: &RequestPool,
        vehicle: &Vehicle,
        stops: &[Stop],
        tracker: &RouteTracker<'_>,
        is_complete: bool,
        now: f64,
    ) -> f64;

    fn check_relocation(&self, vehicle: &Vehicle, destination: &Location, now: f64) -> bool;
}

/// Load-weighted delay of every dropoff beyond the unshared arrival time.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimumDelay;

impl Objective for MinimumDelay {
    fn calculate(
        &self,
        pool: &RequestPool,
        _vehicle: &Vehicle,
        stops: &[Stop],
        tracker: &RouteTracker<'_>,
        _now: f64,
    ) -> f64 {
        stops
            .iter()
            .enumerate()
            .filter(|(_, stop)| stop.kind == StopKind::Dropoff)
            .filter_map(|(index, stop)| stop.request.map(|id| (index, &pool[id])))
            .map(|(index, request)| {
                let delay = (tracker.stop_time(index) - request.direct_arrival_time()).max(0.0);
                request.load() as f64 * delay
            })
            .sum()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopConstraint;

impl Constraint for NoopConstraint {
    fn check_assignment(
        &self,
        _pool: &RequestPool,
        _vehicle: &Vehicle,
        _stops: &[Stop],
        _tracker: &RouteTracker<'_>,
        _is_complete: bool,
        _now: f64,
    ) -> f64 {
        0.0
    }

    fn check_relocation(&self, _vehicle: &Vehicle, _destination: &Location, _now: f64) -> bool {
        true
    }
}

/// Evaluation policy.
#[derive(Debug, Clone, Copy)]
pub struct FunctionOptions {
    /// Minimum dwell of the vehicle at each stop, seconds.
    pub vehicle_stop_duration: f64,
    /// Committed pickups may drift past their planned time.
    pub allow_pickup_violations: bool,
    /// Committed dropoffs may drift past their latest time.
    pub allow_pickups_with_dropoff_violations: bool,
    /// Sequences without new requests only have to drop passengers off, so
    /// late dropoffs and extra constraint violations do not reject them.
    pub relax_dropoff_only_deadlines: bool,
    /// Panic if the best sequence carries violations.
    pub check_deterministic_travel_times: bool,
    pub violation_factor: f64,
    pub violation_offset: f64,
    /// Take a violation-free sequence over a violating incumbent even at a
    /// higher objective.
    pub prefer_non_violation: bool,
}

impl Default for FunctionOptions {
    fn default() -> Self {
        Self {
            vehicle_stop_duration: 60.0,
            allow_pickup_violations: true,
            allow_pickups_with_dropoff_violations: true,
            relax_dropoff_only_deadlines: true,
            check_deterministic_travel_times: false,
            violation_factor: 60.0,
            violation_offset: 10000.0,
            prefer_non_violation: false,
        }
    }
}

/// Incumbent of the search.
struct Best {
    objective: f64,
    has_violations: bool,
    stops: Option<Vec<Stop>>,
}

/// Route evaluator shared by all graph builders of a cycle.
pub struct RouteFunction {
    estimator: Arc<dyn TravelTimeEstimator>,
    durations: Arc<dyn StopDurationProvider>,
    generators: SequenceGeneratorFactory,
    objective: Box<dyn Objective>,
    constraint: Box<dyn Constraint>,
    options: FunctionOptions,
}

impl RouteFunction {
    /// Minimises delay without extra constraints.
    pub fn new(
        estimator: Arc<dyn TravelTimeEstimator>,
        durations: Arc<dyn StopDurationProvider>,
        generators: SequenceGeneratorFactory,
        options: FunctionOptions,
    ) -> Self {
        Self {
            estimator,
            durations,
            generators,
            objective: Box::new(MinimumDelay),
            constraint: Box::new(NoopConstraint),
            options,
        }
    }

    pub fn with_objective(mut self, objective: impl Objective + 'static) -> Self {
        self.objective = Box::new(objective);
        self
    }

    pub fn with_constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraint = Box::new(constraint);
        self
    }

    pub fn options(&self) -> &FunctionOptions {
        &self.options
    }

    pub fn estimator(&self) -> &dyn TravelTimeEstimator {
        self.estimator.as_ref()
    }

    /// Probes whether two requests could ride together at all: a virtual
    /// empty vehicle starting now at the first stop must serve both within
    /// their deadlines. The first feasible ordering decides.
    pub fn check_shareability(
        &self,
        pool: &RequestPool,
        first: RequestId,
        second: RequestId,
        now: f64,
    ) -> bool {
        let first = &pool[first];
        let second = &pool[second];

        let pickup = HashMap::from([
            (first.id(), first.planned_pickup_time()),
            (second.id(), second.planned_pickup_time()),
        ]);
        let dropoff = HashMap::from([
            (first.id(), first.latest_dropoff_time()),
            (second.id(), second.latest_dropoff_time()),
        ]);

        let mut generator = ExtensiveSequenceGenerator::new(&[], &[first, second]);
        let mut tracker = RouteTracker::new(
            self.estimator.as_ref(),
            self.durations.as_ref(),
            pool,
            self.options.vehicle_stop_duration,
            0,
            now,
            None,
        )
        .with_required_times(pickup, dropoff);

        while generator.has_next() {
            let stops = generator.current();
            let start = tracker.update(stops);

            let is_valid = (start..stops.len()).all(|index| {
                let stop = &stops[index];
                let request = request_of(pool, stop);

                match stop.kind {
                    StopKind::Pickup => tracker.stop_time(index) <= request.planned_pickup_time(),
                    StopKind::Dropoff => tracker.stop_time(index) <= request.latest_dropoff_time(),
                    StopKind::Relocation => unreachable!("relocation stop in shareability probe"),
                }
            });

            if is_valid && generator.is_complete() {
                return true;
            }

            if is_valid {
                generator.advance();
            } else {
                generator.abort();
            }
        }

        false
    }

    /// Best feasible sequence serving `requests` plus everything onboard,
    /// or `None` if no ordering satisfies the constraints.
    pub fn calculate_route(
        &self,
        pool: &RequestPool,
        requests: &[RequestId],
        vehicle: &Vehicle,
        now: f64,
    ) -> Option<RouteResult> {
        if requests.is_empty() && vehicle.onboard.is_empty() {
            return Some(RouteResult::empty());
        }

        let only_dropoff = requests.is_empty();
        let relaxed = only_dropoff && self.options.relax_dropoff_only_deadlines;

        let new_requests: Vec<&Request> = requests.iter().map(|id| &pool[*id]).collect();
        let onboard: Vec<&Request> = vehicle.onboard.iter().map(|id| &pool[*id]).collect();

        let (required_pickup, required_dropoff) =
            self.required_times(pool, vehicle, &new_requests, &onboard);

        let start_load: u32 = onboard.iter().map(|request| request.load()).sum();

        let mut generator = self.generators.create(vehicle, &onboard, &new_requests);
        let mut tracker = RouteTracker::new(
            self.estimator.as_ref(),
            self.durations.as_ref(),
            pool,
            self.options.vehicle_stop_duration,
            start_load,
            vehicle.diversion.time,
            Some(vehicle.diversion.location),
        )
        .with_required_times(required_pickup.clone(), required_dropoff.clone())
        .with_vehicle(vehicle);

        let mut best = Best {
            objective: f64::INFINITY,
            has_violations: true,
            stops: None,
        };

        let mut violations: Vec<f64> = Vec::new();

        while generator.has_next() {
            let stops = generator.current();
            let start = tracker.update(stops);
            violations.truncate(start);

            let mut is_valid = true;

            for index in start..stops.len() {
                if !is_valid {
                    break;
                }

                let stop = &stops[index];
                let request = request_of(pool, stop);
                let time = tracker.stop_time(index);
                let load = request.load() as f64;

                match stop.kind {
                    StopKind::Pickup => {
                        assert!(
                            !vehicle.onboard.contains(&request.id()),
                            "cannot pick up onboard request {:?}",
                            request.id()
                        );

                        if time > required_pickup[&request.id()] {
                            is_valid = false;
                        }

                        violations.push((time - request.planned_pickup_time()).max(0.0) * load);
                    }
                    StopKind::Dropoff => {
                        // Passengers have to leave the vehicle eventually, so
                        // a pure dropoff sequence may finish late.
                        if time > required_dropoff[&request.id()] && !relaxed {
                            is_valid = false;
                        }

                        violations.push((time - request.latest_dropoff_time()).max(0.0) * load);
                    }
                    StopKind::Relocation => unreachable!("relocation stop in route search"),
                }

                if tracker.occupancy_after(index) > vehicle.capacity {
                    is_valid = false;
                }
            }

            let mut constraint_violations = 0.0;

            if is_valid {
                constraint_violations = self.constraint.check_assignment(
                    pool,
                    vehicle,
                    stops,
                    &tracker,
                    generator.is_complete(),
                    now,
                );
                is_valid &= constraint_violations == 0.0 || relaxed;
            }

            let mut objective = self.objective.calculate(pool, vehicle, stops, &tracker, now);

            let total_violations = violations.iter().sum::<f64>() + constraint_violations;
            let has_violations = total_violations > 0.0;

            if has_violations {
                objective += total_violations * self.options.violation_factor;
                objective += self.options.violation_offset;
            }

            if objective > best.objective {
                is_valid = is_valid
                    && self.options.prefer_non_violation
                    && best.has_violations
                    && !has_violations;
            }

            if is_valid
                && !only_dropoff
                && tracker.departure_time(stops.len() - 1) > vehicle.service_end_time
            {
                is_valid = false;
            }

            if is_valid {
                if generator.is_complete() {
                    best = Best {
                        objective,
                        has_violations,
                        stops: Some(snapshot(stops, &tracker)),
                    };
                }

                generator.advance();
            } else {
                generator.abort();
            }
        }

        let stops = best.stops?;

        if self.options.check_deterministic_travel_times {
            assert!(
                !best.has_violations,
                "best route for vehicle {:?} has violations under deterministic travel times",
                vehicle.id
            );
        }

        tracing::trace!(
            "Route for vehicle {} with {} requests: cost {}",
            vehicle.id.0,
            requests.len(),
            best.objective
        );

        Some(RouteResult {
            cost: best.objective,
            stops,
        })
    }

    /// Arrival time of a relocation drive from the vehicle's diversion point,
    /// or `None` if it would not arrive before its service ends.
    pub fn check_relocation(
        &self,
        vehicle: &Vehicle,
        destination: &Location,
        now: f64,
    ) -> Option<f64> {
        if !self.constraint.check_relocation(vehicle, destination, now) {
            return None;
        }

        let diversion = vehicle.diversion;
        let travel_time = self.estimator.estimate_travel_time(
            &diversion.location,
            destination,
            diversion.time,
            vehicle.service_end_time,
        );
        let arrival_time = diversion.time + travel_time;

        (arrival_time < vehicle.service_end_time).then_some(arrival_time)
    }

    /// Deadlines enforced during the search. Committed stops may be relaxed
    /// to their currently projected time so that congestion after the
    /// commitment does not make the whole vehicle infeasible.
    fn required_times(
        &self,
        pool: &RequestPool,
        vehicle: &Vehicle,
        requests: &[&Request],
        onboard: &[&Request],
    ) -> (HashMap<RequestId, f64>, HashMap<RequestId, f64>) {
        let mut pickup = HashMap::new();
        let mut dropoff = HashMap::new();

        for stop in &vehicle.route {
            let Some(id) = stop.request else {
                continue;
            };
            let request = &pool[id];

            match stop.kind {
                StopKind::Pickup if self.options.allow_pickup_violations => {
                    let nominal = request.planned_pickup_time();
                    pickup.insert(id, stop.time.unwrap_or(nominal).max(nominal));
                }
                StopKind::Dropoff if self.options.allow_pickups_with_dropoff_violations => {
                    let nominal = request.latest_dropoff_time();
                    dropoff.insert(id, stop.time.unwrap_or(nominal).max(nominal));
                }
                _ => {}
            }
        }

        for request in requests.iter().chain(onboard) {
            pickup
                .entry(request.id())
                .or_insert_with(|| request.planned_pickup_time());
            dropoff
                .entry(request.id())
                .or_insert_with(|| request.latest_dropoff_time());
        }

        (pickup, dropoff)
    }
}

fn request_of<'a>(pool: &'a RequestPool, stop: &Stop) -> &'a Request {
    match stop.request {
        Some(id) => &pool[id],
        None => panic!("{:?} stop without request", stop.kind),
    }
}

/// Copies the stops with their computed pickup and dropoff times.
fn snapshot(stops: &[Stop], tracker: &RouteTracker<'_>) -> Vec<Stop> {
    stops
        .iter()
        .enumerate()
        .map(|(index, stop)| stop.with_time(tracker.stop_time(index)))
        .collect()
}
