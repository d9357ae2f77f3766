//! Test fixtures for ride-pool-dispatch.
//!
//! Provides:
//! - A line world where travel time equals the distance along one axis
//! - Builders for requests and vehicles
//! - Real Las Vegas locations for haversine-based scenarios

#![allow(dead_code)]

pub mod las_vegas;

use std::sync::Arc;

use ride_pool_dispatch::function::{FunctionOptions, RouteFunction};
use ride_pool_dispatch::request::{RequestId, RequestPool, RequestSpec, TaskHandle, TaskStatus};
use ride_pool_dispatch::sequence::{SequenceGeneratorFactory, SequenceGeneratorKind};
use ride_pool_dispatch::stop::{Location, Stop};
use ride_pool_dispatch::traits::{StaticStopDuration, TravelTimeEstimator};
use ride_pool_dispatch::vehicle::{Vehicle, VehicleId};

// ============================================================================
// Line world
// ============================================================================

/// One second per unit of distance along the line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineEstimator;

impl TravelTimeEstimator for LineEstimator {
    fn estimate_travel_time(&self, from: &Location, to: &Location, _: f64, _: f64) -> f64 {
        (from.coord.1 - to.coord.1).abs()
    }
}

/// The place at position `x`; its id is the position.
pub fn place(x: u32) -> Location {
    Location::new(x as u64, 0.0, x as f64)
}

/// Options without dwell times, so times are pure travel times.
pub fn options() -> FunctionOptions {
    FunctionOptions {
        vehicle_stop_duration: 0.0,
        ..FunctionOptions::default()
    }
}

pub fn line_function(options: FunctionOptions) -> RouteFunction {
    RouteFunction::new(
        Arc::new(LineEstimator),
        Arc::new(StaticStopDuration::of(0.0, 0.0)),
        SequenceGeneratorFactory::new(SequenceGeneratorKind::Extensive, 5),
        options,
    )
}

// ============================================================================
// Builders
// ============================================================================

/// Builder for requests on the line with generous defaults.
#[derive(Debug, Clone)]
pub struct TestRequest {
    pickup: u32,
    dropoff: u32,
    earliest_pickup: f64,
    latest_pickup: f64,
    latest_dropoff: f64,
    load: u32,
    maximum_queue_time: f64,
}

impl TestRequest {
    pub fn new(pickup: u32, dropoff: u32) -> Self {
        Self {
            pickup,
            dropoff,
            earliest_pickup: 0.0,
            latest_pickup: 1000.0,
            latest_dropoff: 5000.0,
            load: 1,
            maximum_queue_time: 0.0,
        }
    }

    pub fn earliest_pickup(mut self, time: f64) -> Self {
        self.earliest_pickup = time;
        self
    }

    pub fn latest_pickup(mut self, time: f64) -> Self {
        self.latest_pickup = time;
        self
    }

    pub fn latest_dropoff(mut self, time: f64) -> Self {
        self.latest_dropoff = time;
        self
    }

    pub fn load(mut self, load: u32) -> Self {
        self.load = load;
        self
    }

    pub fn queue_time(mut self, time: f64) -> Self {
        self.maximum_queue_time = time;
        self
    }

    pub fn spec(&self) -> RequestSpec {
        let distance = (self.dropoff as f64 - self.pickup as f64).abs();

        RequestSpec {
            pickup: place(self.pickup),
            dropoff: place(self.dropoff),
            earliest_pickup_time: self.earliest_pickup,
            latest_pickup_time: self.latest_pickup,
            latest_dropoff_time: self.latest_dropoff,
            load: self.load,
            direct_travel_time: distance,
            direct_distance: distance,
        }
    }

    pub fn submit(&self, pool: &mut RequestPool) -> RequestId {
        pool.submit(self.spec(), self.maximum_queue_time)
    }
}

/// An idle vehicle at position `x`, available from `time`.
pub fn vehicle(id: usize, capacity: u32, x: u32, time: f64) -> Vehicle {
    Vehicle::new(VehicleId(id), capacity, place(x), time)
}

/// Puts `request` on board `vehicle`, with its dropoff as the next stop.
pub fn board(pool: &mut RequestPool, vehicle: &mut Vehicle, request: RequestId) {
    if let Some(entry) = pool.get_mut(request) {
        entry.set_pickup_task(vehicle.id, TaskHandle::planned(1));
        entry.set_dropoff_task(vehicle.id, TaskHandle::planned(2));
        entry.set_pickup_status(TaskStatus::Performed);
    }

    vehicle.onboard.push(request);
    vehicle.route.push(Stop::dropoff(&pool[request]));
}

/// Commits `request` to `vehicle` without picking it up.
pub fn commit(pool: &mut RequestPool, vehicle: &mut Vehicle, request: RequestId) {
    if let Some(entry) = pool.get_mut(request) {
        entry.assign(vehicle.id);
        entry.accept();
    }

    vehicle.route.push(Stop::pickup(&pool[request]));
    vehicle.route.push(Stop::dropoff(&pool[request]));
}
