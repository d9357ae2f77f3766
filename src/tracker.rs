//! Timing and occupancy along a stop sequence.
//!
//! The tracker keeps per-stop histories of arrival, departure, passenger
//! stop time and occupancy. [`RouteTracker::update`] compares the proposed
//! sequence with the one it saw last and only recomputes the changed suffix,
//! which is what makes prefix-by-prefix sequence search affordable.

use std::collections::HashMap;

use crate::request::{Request, RequestId, RequestPool};
use crate::stop::{Location, Stop, StopKind};
use crate::traits::{StopDurationProvider, TravelTimeEstimator};
use crate::vehicle::Vehicle;

/// Cost of entering the first link when departing from a stop.
const FIRST_LINK_TT: f64 = 1.0;

/// Cost of passing the last node before the current link ends.
const NODE_TRANSITION_TIME: f64 = 1.0;

/// One second to stop and depart again when switching the drive mode.
const DRIVE_TASK_SWITCH_OFFSET: f64 = 1.0;

pub struct RouteTracker<'a> {
    estimator: &'a dyn TravelTimeEstimator,
    durations: &'a dyn StopDurationProvider,
    requests: &'a RequestPool,
    vehicle: Option<&'a Vehicle>,

    vehicle_stop_duration: f64,
    initial_occupancy: u32,
    initial_departure_time: f64,
    initial_location: Option<Location>,

    required_pickup_times: HashMap<RequestId, f64>,
    required_dropoff_times: HashMap<RequestId, f64>,

    is_driving: bool,
    needs_drive_mode_switch: bool,

    stops: Vec<Stop>,
    arrival_times: Vec<f64>,
    departure_times: Vec<f64>,
    stop_times: Vec<f64>,
    occupancies: Vec<u32>,
}

impl<'a> RouteTracker<'a> {
    /// Without `initial_location` the vehicle starts at the first stop.
    pub fn new(
        estimator: &'a dyn TravelTimeEstimator,
        durations: &'a dyn StopDurationProvider,
        requests: &'a RequestPool,
        vehicle_stop_duration: f64,
        initial_occupancy: u32,
        initial_departure_time: f64,
        initial_location: Option<Location>,
    ) -> Self {
        Self {
            estimator,
            durations,
            requests,
            vehicle: None,
            vehicle_stop_duration,
            initial_occupancy,
            initial_departure_time,
            initial_location,
            required_pickup_times: HashMap::new(),
            required_dropoff_times: HashMap::new(),
            is_driving: false,
            needs_drive_mode_switch: false,
            stops: Vec::new(),
            arrival_times: Vec::new(),
            departure_times: Vec::new(),
            stop_times: Vec::new(),
            occupancies: Vec::new(),
        }
    }

    /// Required times bound the travel-time estimates towards each stop.
    pub fn with_required_times(
        mut self,
        pickup: HashMap<RequestId, f64>,
        dropoff: HashMap<RequestId, f64>,
    ) -> Self {
        self.required_pickup_times = pickup;
        self.required_dropoff_times = dropoff;
        self
    }

    /// Tracks on behalf of a real vehicle. A driving vehicle is diverted
    /// rather than departing from a stop, which shifts the first arrival.
    pub fn with_vehicle(mut self, vehicle: &'a Vehicle) -> Self {
        self.vehicle = Some(vehicle);
        self.is_driving = vehicle.is_driving();
        self.needs_drive_mode_switch = vehicle.needs_drive_mode_switch();
        self
    }

    /// Proposes a new sequence and returns the first index that was
    /// recomputed. Everything before it is reused from the previous call.
    pub fn update(&mut self, stops: &[Stop]) -> usize {
        let common = self
            .stops
            .iter()
            .zip(stops)
            .take_while(|(cached, proposed)| cached.same_task(proposed))
            .count();
        let start = common.min(stops.len().saturating_sub(1));

        self.stops.truncate(start);
        self.arrival_times.truncate(start);
        self.departure_times.truncate(start);
        self.stop_times.truncate(start);
        self.occupancies.truncate(start);

        for i in start..stops.len() {
            self.track(stops, i);
        }

        start
    }

    fn track(&mut self, stops: &[Stop], i: usize) {
        let stop = &stops[i];

        let (from, departure_time, occupancy) = if i == 0 {
            (
                self.initial_location.unwrap_or(stop.location),
                self.initial_departure_time,
                self.initial_occupancy,
            )
        } else {
            (
                stops[i - 1].location,
                self.departure_times[i - 1],
                self.occupancies[i - 1],
            )
        };

        let (arrival, stop_time, departure) = if from != stop.location || i == 0 {
            let budget = self.time_budget(stop);
            let mut arrival = departure_time
                + self
                    .estimator
                    .estimate_travel_time(&from, &stop.location, departure_time, budget);

            if i == 0 {
                arrival = self.correct_arrival_time(arrival, from != stop.location);
            }

            match stop.kind {
                StopKind::Pickup => {
                    // Pre-booked requests make the vehicle wait until the earliest pickup.
                    let request = self.request_of(stop);
                    let arrival = arrival.max(request.earliest_pickup_time());
                    let pickup_time =
                        arrival + self.durations.pickup_duration(self.vehicle, request);
                    let departure = pickup_time.max(arrival + self.vehicle_stop_duration);
                    (arrival, pickup_time, departure)
                }
                StopKind::Dropoff => {
                    let request = self.request_of(stop);
                    let dropoff_time =
                        arrival + self.durations.dropoff_duration(self.vehicle, request);
                    let departure = dropoff_time.max(arrival + self.vehicle_stop_duration);
                    (arrival, dropoff_time, departure)
                }
                StopKind::Relocation => (arrival, arrival, arrival),
            }
        } else {
            // Same place as the previous stop, the vehicle does not move.
            let arrival = self.arrival_times[i - 1];
            let vehicle_departure = self.departure_times[i - 1].max(arrival + self.vehicle_stop_duration);

            match stop.kind {
                StopKind::Pickup => {
                    let request = self.request_of(stop);
                    let pickup_time = arrival.max(request.earliest_pickup_time())
                        + self.durations.pickup_duration(self.vehicle, request);
                    (arrival, pickup_time, pickup_time.max(vehicle_departure))
                }
                StopKind::Dropoff => {
                    let request = self.request_of(stop);
                    let dropoff_time =
                        arrival + self.durations.dropoff_duration(self.vehicle, request);
                    (arrival, dropoff_time, dropoff_time.max(vehicle_departure))
                }
                StopKind::Relocation => (arrival, arrival, arrival),
            }
        };

        let occupancy = match stop.kind {
            StopKind::Pickup => occupancy + self.request_of(stop).load(),
            StopKind::Dropoff => {
                let load = self.request_of(stop).load();
                assert!(
                    occupancy >= load,
                    "dropping off {:?} would make occupancy negative",
                    stop.request
                );
                occupancy - load
            }
            StopKind::Relocation => occupancy,
        };

        self.stops.push(*stop);
        self.arrival_times.push(arrival);
        self.departure_times.push(departure);
        self.stop_times.push(stop_time);
        self.occupancies.push(occupancy);
    }

    fn time_budget(&self, stop: &Stop) -> f64 {
        let required = match stop.kind {
            StopKind::Pickup => &self.required_pickup_times,
            _ => &self.required_dropoff_times,
        };

        stop.request
            .and_then(|request| required.get(&request).copied())
            .unwrap_or(f64::INFINITY)
    }

    fn correct_arrival_time(&self, arrival_time: f64, needs_moving: bool) -> f64 {
        if !self.is_driving {
            return arrival_time;
        }

        if needs_moving {
            // Estimates assume departure from a stop; a diverted vehicle is
            // already on its link.
            let mut corrected = arrival_time - FIRST_LINK_TT;

            if self.needs_drive_mode_switch {
                corrected += DRIVE_TASK_SWITCH_OFFSET;
            }

            corrected
        } else {
            arrival_time - NODE_TRANSITION_TIME
        }
    }

    fn request_of(&self, stop: &Stop) -> &'a Request {
        match stop.request {
            Some(id) => &self.requests[id],
            None => panic!("{:?} stop without request", stop.kind),
        }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn arrival_time(&self, index: usize) -> f64 {
        self.arrival_times[index]
    }

    pub fn departure_time(&self, index: usize) -> f64 {
        self.departure_times[index]
    }

    /// Passenger pickup or dropoff time at the stop.
    pub fn stop_time(&self, index: usize) -> f64 {
        self.stop_times[index]
    }

    pub fn occupancy_after(&self, index: usize) -> u32 {
        self.occupancies[index]
    }

    pub fn occupancy_before(&self, index: usize) -> u32 {
        if index == 0 {
            self.initial_occupancy
        } else {
            self.occupancies[index - 1]
        }
    }
}
