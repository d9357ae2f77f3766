//! Full dispatch cycles on the line world.

mod fixtures;

use std::sync::Arc;

use ride_pool_dispatch::assignment::SolutionStatus;
use ride_pool_dispatch::config::{DispatchConfig, TravelTimeConfig};
use ride_pool_dispatch::dispatcher::{Dispatcher, Reassignment};
use ride_pool_dispatch::relocation::{Relocation, RelocationSolverKind};
use ride_pool_dispatch::request::{RequestId, RequestPool, RequestSpec};
use ride_pool_dispatch::stop::Location;
use ride_pool_dispatch::traits::StaticStopDuration;
use ride_pool_dispatch::vehicle::{DriveKind, Vehicle, VehicleActivity, VehicleId};

use fixtures::*;

fn config() -> DispatchConfig {
    DispatchConfig {
        vehicle_stop_duration: 0.0,
        ..DispatchConfig::default()
    }
}

fn dispatcher(config: DispatchConfig) -> Dispatcher {
    Dispatcher::new(
        config,
        Arc::new(LineEstimator),
        Arc::new(StaticStopDuration::of(0.0, 0.0)),
    )
    .expect("valid configuration")
}

// ============================================================================
// Assignment
// ============================================================================

#[test]
fn test_nearest_vehicle_serves_each_request() {
    let mut pool = RequestPool::new();
    let west = TestRequest::new(10, 30).submit(&mut pool);
    let east = TestRequest::new(90, 70).submit(&mut pool);
    let vehicles = vec![vehicle(0, 4, 0, 0.0), vehicle(1, 4, 100, 0.0)];

    let mut dispatcher = dispatcher(config());
    let outcome = dispatcher.dispatch(&pool, &vehicles, 0.0);

    let mut assigned: Vec<(VehicleId, Vec<RequestId>)> = outcome
        .assignments
        .iter()
        .map(|assignment| (assignment.vehicle, assignment.requests.clone()))
        .collect();
    assigned.sort();

    assert_eq!(
        assigned,
        vec![(VehicleId(0), vec![west]), (VehicleId(1), vec![east])]
    );
    assert!(outcome.rejected.is_empty());
    assert!(outcome.unassigned.is_empty());
    assert!(outcome.relocations.is_empty());
    assert_eq!(outcome.information.solution_status, Some(SolutionStatus::Optimal));
    assert_eq!(outcome.information.request_graph_size, 1);
    assert!(outcome.information.trip_graph_size >= 4);

    outcome.apply(&mut pool, 0.0);
    assert_eq!(pool[west].vehicle(), Some(VehicleId(0)));
    assert_eq!(pool[east].vehicle(), Some(VehicleId(1)));
    assert!(pool[west].has_planned_pickup_time());
}

#[test]
fn test_assignment_carries_timed_stops() {
    let mut pool = RequestPool::new();
    let request = TestRequest::new(10, 30).submit(&mut pool);
    let vehicles = vec![vehicle(0, 4, 0, 0.0)];

    let mut dispatcher = dispatcher(config());
    let outcome = dispatcher.dispatch(&pool, &vehicles, 0.0);

    assert_eq!(outcome.assignments.len(), 1);
    let assignment = &outcome.assignments[0];
    assert_eq!(assignment.requests, vec![request]);
    assert_eq!(assignment.cost, 10.0);

    let times: Vec<Option<f64>> = assignment.stops.iter().map(|stop| stop.time).collect();
    assert_eq!(times, vec![Some(10.0), Some(30.0)]);
}

#[test]
fn test_unreachable_request_is_rejected() {
    let mut pool = RequestPool::new();
    let request = TestRequest::new(50, 60).latest_pickup(5.0).submit(&mut pool);
    let vehicles = vec![vehicle(0, 4, 0, 0.0)];

    let mut dispatcher = dispatcher(config());
    let outcome = dispatcher.dispatch(&pool, &vehicles, 0.0);

    assert!(outcome.assignments.is_empty());
    assert_eq!(outcome.rejected, vec![request]);
    assert!(outcome.relocations.is_empty());

    outcome.apply(&mut pool, 0.0);
    assert!(pool[request].is_rejected());
    assert_eq!(pool.active().count(), 0);
}

#[test]
fn test_waiting_request_attracts_relocation() {
    let mut pool = RequestPool::new();
    let request = TestRequest::new(50, 60)
        .latest_pickup(5.0)
        .queue_time(600.0)
        .submit(&mut pool);
    let vehicles = vec![vehicle(0, 4, 0, 0.0)];

    let mut dispatcher = dispatcher(config());
    let outcome = dispatcher.dispatch(&pool, &vehicles, 0.0);

    assert!(outcome.assignments.is_empty());
    assert!(outcome.rejected.is_empty());
    assert_eq!(
        outcome.relocations,
        vec![Relocation::new(VehicleId(0), place(50), 50.0)]
    );
    assert_eq!(outcome.information.relocations, 1);
    assert!(!pool[request].is_assigned());
}

#[test]
fn test_relocation_only_on_its_interval() {
    let mut pool = RequestPool::new();
    // Too many passengers for the vehicle, but still waiting for one.
    TestRequest::new(50, 60)
        .load(2)
        .queue_time(600.0)
        .submit(&mut pool);
    let vehicles = vec![vehicle(0, 1, 0, 0.0)];

    let mut dispatcher = dispatcher(DispatchConfig {
        relocation_interval: 60,
        ..config()
    });

    assert!(dispatcher.dispatch(&pool, &vehicles, 30.0).relocations.is_empty());
    assert_eq!(dispatcher.dispatch(&pool, &vehicles, 60.0).relocations.len(), 1);
}

#[test]
fn test_stepwise_relocation_stops_relocating_vehicles() {
    let pool = RequestPool::new();
    let mut relocating = vehicle(1, 4, 20, 0.0);
    relocating.activity = VehicleActivity::Driving(DriveKind::Relocation);
    let vehicles = vec![vehicle(0, 4, 0, 0.0), relocating];

    let mut dispatcher = dispatcher(DispatchConfig {
        use_stepwise_relocation: true,
        ..config()
    });
    let outcome = dispatcher.dispatch(&pool, &vehicles, 0.0);

    assert!(outcome.relocations.is_empty());
    assert_eq!(outcome.stopped, vec![VehicleId(1)]);
}

#[test]
fn test_assigned_requests_are_not_reoptimised_by_default() {
    let mut pool = RequestPool::new();
    let request = TestRequest::new(10, 30).submit(&mut pool);
    let mut far = vehicle(1, 4, 100, 0.0);
    commit(&mut pool, &mut far, request);
    let vehicles = vec![vehicle(0, 4, 0, 0.0), far];

    let mut dispatcher = dispatcher(config());
    let outcome = dispatcher.dispatch(&pool, &vehicles, 0.0);

    assert_eq!(outcome.information.solution_status, None);
    assert!(outcome.assignments.is_empty());
    assert!(outcome.reassigned.is_empty());
}

#[test]
fn test_bare_reassignment_moves_request_to_closer_vehicle() {
    let mut pool = RequestPool::new();
    let request = TestRequest::new(10, 30).submit(&mut pool);
    let mut far = vehicle(1, 4, 100, 0.0);
    commit(&mut pool, &mut far, request);
    let vehicles = vec![vehicle(0, 4, 0, 0.0), far];

    let mut config = config();
    config.congestion_mitigation.allow_bare_reassignment = true;
    let mut dispatcher = dispatcher(config);
    let outcome = dispatcher.dispatch(&pool, &vehicles, 0.0);

    assert_eq!(
        outcome.reassigned,
        vec![Reassignment {
            request,
            from: VehicleId(1),
            to: VehicleId(0),
        }]
    );
    assert_eq!(outcome.information.reassignments, 1);
    assert!(outcome.unassigned.is_empty());

    outcome.apply(&mut pool, 0.0);
    assert_eq!(pool[request].vehicle(), Some(VehicleId(0)));
}

#[test]
fn test_candidate_vehicle_limit_keeps_current_vehicle() {
    let mut pool = RequestPool::new();
    let request = TestRequest::new(10, 30).submit(&mut pool);
    let mut far = vehicle(2, 4, 100, 0.0);
    commit(&mut pool, &mut far, request);
    let vehicles = vec![vehicle(0, 4, 0, 0.0), vehicle(1, 4, 5, 0.0), far];

    let mut config = config();
    config.candidate_vehicles_per_request = 1;
    config.congestion_mitigation.allow_bare_reassignment = true;
    let mut dispatcher = dispatcher(config);
    let outcome = dispatcher.dispatch(&pool, &vehicles, 0.0);

    // Vehicle 1 is closest, vehicle 2 holds the request; vehicle 0 is cut.
    assert_eq!(outcome.information.trip_graph_size, 2);
    assert_eq!(outcome.assignments.len(), 1);
    assert_eq!(outcome.assignments[0].vehicle, VehicleId(1));
}

// ============================================================================
// Onboard passengers
// ============================================================================

#[test]
fn test_onboard_passengers_keep_their_vehicle() {
    let mut pool = RequestPool::new();
    let onboard = TestRequest::new(0, 40).load(2).submit(&mut pool);
    // Out of reach for the busy vehicle.
    let waiting = TestRequest::new(90, 100).latest_pickup(50.0).submit(&mut pool);

    let mut busy = vehicle(0, 2, 0, 0.0);
    board(&mut pool, &mut busy, onboard);
    let vehicles = vec![busy, vehicle(1, 4, 100, 0.0)];

    let mut dispatcher = dispatcher(config());
    let outcome = dispatcher.dispatch(&pool, &vehicles, 0.0);

    let mut assigned: Vec<(VehicleId, Vec<RequestId>)> = outcome
        .assignments
        .iter()
        .map(|assignment| (assignment.vehicle, assignment.requests.clone()))
        .collect();
    assigned.sort();

    assert_eq!(
        assigned,
        vec![(VehicleId(0), vec![]), (VehicleId(1), vec![waiting])]
    );
    assert_eq!(outcome.information.occupancy_by_passengers, vec![1, 0, 1]);
    assert_eq!(outcome.information.occupancy_by_requests, vec![1, 1]);
}

// ============================================================================
// Information
// ============================================================================

#[test]
fn test_cycles_are_collected() {
    let mut pool = RequestPool::new();
    TestRequest::new(10, 30).submit(&mut pool);
    let vehicles = vec![vehicle(0, 4, 0, 0.0)];

    let mut dispatcher = dispatcher(config());
    dispatcher.dispatch(&pool, &vehicles, 0.0);
    dispatcher.dispatch(&pool, &vehicles, 30.0);

    let cycles = dispatcher.information().cycles();
    assert_eq!(cycles.len(), 2);
    assert_eq!(cycles[0].time, 0.0);
    assert_eq!(cycles[1].time, 30.0);
    assert_eq!(dispatcher.information().count_status(SolutionStatus::Optimal), 2);

    let drained = dispatcher.information_mut().drain();
    assert_eq!(drained.len(), 2);
    assert!(dispatcher.information().cycles().is_empty());
}

#[test]
fn test_dispatch_grid() {
    let dispatcher = dispatcher(config());
    assert!(dispatcher.is_dispatch_time(60.0));
    assert!(!dispatcher.is_dispatch_time(45.0));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_invalid_config_is_rejected() {
    let result = Dispatcher::new(
        DispatchConfig {
            assignment_interval: 0,
            ..config()
        },
        Arc::new(LineEstimator),
        Arc::new(StaticStopDuration::of(0.0, 0.0)),
    );

    assert!(result.is_err());
}

#[test]
fn test_matching_relocation_from_config() {
    let mut pool = RequestPool::new();
    for x in [50, 80] {
        TestRequest::new(x, x + 10)
            .latest_pickup(5.0)
            .queue_time(600.0)
            .submit(&mut pool);
    }
    let vehicles = vec![vehicle(0, 4, 0, 0.0), vehicle(1, 4, 60, 0.0)];

    let mut config = config();
    config.relocation.solver = RelocationSolverKind::Matching;
    let mut dispatcher = dispatcher(config);
    let outcome = dispatcher.dispatch(&pool, &vehicles, 0.0);

    let mut relocations = outcome.relocations.clone();
    relocations.sort_by_key(|relocation| relocation.vehicle);

    // 50 + 20 beats 80 + 10.
    assert_eq!(
        relocations,
        vec![
            Relocation::new(VehicleId(0), place(50), 50.0),
            Relocation::new(VehicleId(1), place(80), 20.0),
        ]
    );
}

#[test]
fn test_haversine_dispatch_on_the_strip() {
    let strip = fixtures::las_vegas::strip();
    let spec = |pickup: Location, dropoff: Location| RequestSpec {
        pickup,
        dropoff,
        earliest_pickup_time: 0.0,
        latest_pickup_time: 900.0,
        latest_dropoff_time: 3600.0,
        load: 1,
        direct_travel_time: 600.0,
        direct_distance: 4000.0,
    };

    let mut pool = RequestPool::new();
    let first = pool.submit(spec(strip[0], strip[1]), 0.0);
    let second = pool.submit(spec(strip[2], strip[4]), 0.0);

    let vehicles = vec![
        Vehicle::new(VehicleId(0), 4, strip[3], 0.0),
        Vehicle::new(VehicleId(1), 4, strip[5], 0.0),
    ];

    let config = DispatchConfig {
        travel_time: TravelTimeConfig::Euclidean {
            distance_factor: 1.3,
            speed_kmh: 40.0,
        },
        ..DispatchConfig::default()
    };
    let mut dispatcher = Dispatcher::from_config(config, Arc::new(StaticStopDuration::of(30.0, 30.0)))
        .expect("valid configuration");
    let outcome = dispatcher.dispatch(&pool, &vehicles, 0.0);

    let served: Vec<RequestId> = outcome
        .assignments
        .iter()
        .flat_map(|assignment| assignment.requests.iter().copied())
        .collect();
    assert!(served.contains(&first));
    assert!(served.contains(&second));
    assert!(outcome.rejected.is_empty());
}
