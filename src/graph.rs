//! Shareability and trip-vehicle graphs.
//!
//! The [`RequestGraph`] records which request pairs could ride together at
//! all. Each [`VehicleGraph`] then grows the feasible trips of one vehicle
//! level by level: singles, pairs of shareable requests, and larger sets
//! whose every one-smaller subset is already a feasible trip.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::function::RouteFunction;
use crate::request::{RequestId, RequestPool};
use crate::traits::ShareabilityIndex;
use crate::trip::{RouteResult, Trip};
use crate::vehicle::Vehicle;

/// Wall-clock interval between progress lines of a long graph build.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(60);

/// Undirected pairwise shareability of requests.
#[derive(Debug, Clone, Default)]
pub struct RequestGraph {
    pairs: HashSet<(RequestId, RequestId)>,
}

impl RequestGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probes every pair of `requests` in parallel.
    pub fn build(
        function: &RouteFunction,
        pool: &RequestPool,
        requests: &[RequestId],
        now: f64,
    ) -> Self {
        let candidates: Vec<(RequestId, RequestId)> = requests
            .iter()
            .enumerate()
            .flat_map(|(index, first)| {
                requests[index + 1..]
                    .iter()
                    .map(move |second| (*first, *second))
            })
            .collect();

        let shareable: Vec<(RequestId, RequestId)> = candidates
            .into_par_iter()
            .filter(|(first, second)| function.check_shareability(pool, *first, *second, now))
            .collect();

        let mut graph = Self::new();
        for (first, second) in shareable {
            graph.add_pair(first, second);
        }
        graph
    }

    pub fn add_pair(&mut self, first: RequestId, second: RequestId) {
        self.pairs.insert(Self::key(first, second));
    }

    /// Number of shareable pairs.
    pub fn size(&self) -> usize {
        self.pairs.len()
    }

    fn key(first: RequestId, second: RequestId) -> (RequestId, RequestId) {
        if first <= second {
            (first, second)
        } else {
            (second, first)
        }
    }
}

impl ShareabilityIndex for RequestGraph {
    fn are_shareable(&self, first: RequestId, second: RequestId) -> bool {
        self.pairs.contains(&Self::key(first, second))
    }
}

/// Caps on the number of trips a vehicle graph generates. Zero disables a cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TripLimits {
    pub per_vehicle: usize,
    pub per_sequence_length: usize,
}

/// Throttled progress reporting for one graph.
struct Progress {
    started: Instant,
    next: Instant,
}

impl Progress {
    fn new() -> Self {
        let started = Instant::now();
        Self {
            started,
            next: started + PROGRESS_INTERVAL,
        }
    }
}

/// Trips of one vehicle, grown incrementally as requests are added.
pub struct VehicleGraph<'a> {
    function: &'a RouteFunction,
    shareability: &'a dyn ShareabilityIndex,
    pool: &'a RequestPool,
    vehicle: &'a Vehicle,
    limits: TripLimits,
    deadline: Option<Instant>,

    /// Trips by level; level `k` holds trips with `k + 1` requests.
    levels: Vec<Vec<Trip>>,
    /// Request sets present at each level.
    known: Vec<HashSet<Vec<RequestId>>>,
    /// Registered requests in insertion order.
    requests: Vec<RequestId>,
    registered: HashSet<RequestId>,
    number_of_trips: usize,
    progress: Progress,
}

impl<'a> VehicleGraph<'a> {
    pub fn new(
        function: &'a RouteFunction,
        shareability: &'a dyn ShareabilityIndex,
        pool: &'a RequestPool,
        vehicle: &'a Vehicle,
        limits: TripLimits,
    ) -> Self {
        let mut graph = Self {
            function,
            shareability,
            pool,
            vehicle,
            limits,
            deadline: None,
            levels: Vec::new(),
            known: Vec::new(),
            requests: Vec::new(),
            registered: HashSet::new(),
            number_of_trips: 0,
            progress: Progress::new(),
        };

        graph.ensure_levels((2 * vehicle.capacity as usize).max(2));
        graph
    }

    /// Stops expanding once the wall clock passes `deadline`.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Evaluates the request on its own and registers it if the vehicle can
    /// serve it.
    pub fn add_request(&mut self, request: RequestId, now: f64, consider_thresholds: bool) {
        if let Some(result) = self.function.calculate_route(self.pool, &[request], self.vehicle, now) {
            self.add_request_with_result(request, now, result, consider_thresholds);
        }
    }

    /// Registers a request whose unpooled route is already known and expands
    /// all trips that contain it.
    pub fn add_request_with_result(
        &mut self,
        request: RequestId,
        now: f64,
        unpooled: RouteResult,
        consider_thresholds: bool,
    ) {
        assert!(
            self.registered.insert(request),
            "request {:?} is already registered with vehicle {:?}",
            request,
            self.vehicle.id
        );
        self.report_progress();

        let partners: Vec<RequestId> = self
            .requests
            .iter()
            .copied()
            .filter(|other| self.shareability.are_shareable(request, *other))
            .collect();
        self.requests.push(request);

        if consider_thresholds && self.vehicle_limit_reached() {
            return;
        }

        if !self.level_limit_reached(0) {
            self.insert(Trip::new(self.vehicle.id, vec![request], unpooled));
        }

        let first_pair = self.levels[1].len();

        for partner in partners {
            self.report_progress();

            if consider_thresholds && self.level_limit_reached(1) {
                break;
            }

            if consider_thresholds && (self.vehicle_limit_reached() || self.deadline_passed()) {
                return;
            }

            let mut requests = vec![request, partner];
            self.pool.sort(&mut requests);

            if let Some(result) = self.function.calculate_route(self.pool, &requests, self.vehicle, now) {
                self.insert(Trip::new(self.vehicle.id, requests, result));
            }
        }

        if self.levels[1].len() > first_pair {
            self.construct_trips(1, first_pair, now, consider_thresholds);
        }
    }

    /// Combines the trips added to `level` from index `first` on into trips
    /// one request larger, then recurses into the new level.
    fn construct_trips(&mut self, level: usize, first: usize, now: f64, consider_thresholds: bool) {
        let next = level + 1;
        self.ensure_levels(next + 1);

        let mut previous: Vec<usize> = (first..self.levels[level].len()).collect();
        previous.sort_by(|a, b| self.levels[level][*a].cmp_by_cost(&self.levels[level][*b]));

        let first_new = self.levels[next].len();
        let mut tried: HashSet<Vec<RequestId>> = HashSet::new();

        for (position, i) in previous.iter().enumerate() {
            for j in &previous[position + 1..] {
                self.report_progress();

                if consider_thresholds && self.level_limit_reached(next) {
                    break;
                }

                if consider_thresholds && (self.vehicle_limit_reached() || self.deadline_passed()) {
                    return;
                }

                let first_trip = &self.levels[level][*i];
                let second_trip = &self.levels[level][*j];

                let mut requests = first_trip.requests.clone();
                for request in &second_trip.requests {
                    if !requests.contains(request) {
                        requests.push(*request);
                    }
                }

                if requests.len() != first_trip.requests.len() + 1 {
                    continue;
                }

                self.pool.sort(&mut requests);

                if self.known[next].contains(&requests) || !tried.insert(requests.clone()) {
                    continue;
                }

                if !self.all_subtrips_exist(level, &requests) {
                    continue;
                }

                if let Some(result) = self.function.calculate_route(self.pool, &requests, self.vehicle, now) {
                    self.insert(Trip::new(self.vehicle.id, requests, result));
                }
            }
        }

        if self.levels[next].len() > first_new {
            self.construct_trips(next, first_new, now, consider_thresholds);
        }
    }

    fn all_subtrips_exist(&self, level: usize, requests: &[RequestId]) -> bool {
        (0..requests.len()).all(|skip| {
            let subset: Vec<RequestId> = requests
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != skip)
                .map(|(_, request)| *request)
                .collect();

            self.known[level].contains(&subset)
        })
    }

    /// Makes sure the vehicle's current set of pending pickups is available
    /// as a trip, so keeping the status quo stays a valid assignment.
    pub fn preserve_vehicle_assignment(&mut self, now: f64) {
        let mut assigned: Vec<RequestId> = self
            .vehicle
            .assigned_requests()
            .into_iter()
            .filter(|request| !self.pool[*request].is_picked_up())
            .collect();

        if assigned.is_empty() {
            return;
        }

        self.pool.sort(&mut assigned);
        let level = assigned.len() - 1;
        self.ensure_levels(level + 1);

        if self.known[level].contains(&assigned) {
            return;
        }

        if let Some(result) = self.function.calculate_route(self.pool, &assigned, self.vehicle, now) {
            tracing::debug!(
                "Preserved assignment of {} requests for vehicle {}",
                assigned.len(),
                self.vehicle.id.0
            );
            self.insert(Trip::new(self.vehicle.id, assigned, result));
        }
    }

    pub fn trips(&self) -> impl Iterator<Item = &Trip> {
        self.levels.iter().flatten()
    }

    pub fn into_trips(self) -> Vec<Trip> {
        self.levels.into_iter().flatten().collect()
    }

    pub fn size(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Number of trips per level.
    pub fn level_sizes(&self) -> Vec<usize> {
        self.levels.iter().map(Vec::len).collect()
    }

    fn insert(&mut self, trip: Trip) {
        let level = trip.level() - 1;
        self.ensure_levels(level + 1);

        self.known[level].insert(trip.requests.clone());
        self.levels[level].push(trip);
        self.number_of_trips += 1;
    }

    fn ensure_levels(&mut self, count: usize) {
        while self.levels.len() < count {
            self.levels.push(Vec::new());
            self.known.push(HashSet::new());
        }
    }

    fn vehicle_limit_reached(&self) -> bool {
        self.limits.per_vehicle > 0 && self.number_of_trips >= self.limits.per_vehicle
    }

    fn level_limit_reached(&self, level: usize) -> bool {
        self.limits.per_sequence_length > 0
            && self.levels.get(level).map_or(0, Vec::len) >= self.limits.per_sequence_length
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn report_progress(&mut self) {
        let now = Instant::now();

        if now >= self.progress.next {
            self.progress.next += PROGRESS_INTERVAL;

            let levels: Vec<String> = self.levels.iter().map(|level| level.len().to_string()).collect();
            tracing::debug!(
                "Vehicle {} graph: elapsed {:.0}s, trips {}, requests {}, levels {}",
                self.vehicle.id.0,
                (now - self.progress.started).as_secs_f64(),
                self.number_of_trips,
                self.requests.len(),
                levels.join(",")
            );
        }
    }
}
