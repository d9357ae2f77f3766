//! Greedy assignment heuristics on hand-built trip sets.

mod fixtures;

use ride_pool_dispatch::assignment::{
    AssignmentProblem, AssignmentSolver, GreedyTripFirstSolver, GreedyVehicleFirstSolver,
    RejectionPenalty, SolutionStatus,
};
use ride_pool_dispatch::request::{RequestId, RequestPool};
use ride_pool_dispatch::trip::{RouteResult, Trip};
use ride_pool_dispatch::vehicle::VehicleId;

use fixtures::*;

fn trip(vehicle: usize, requests: &[RequestId], cost: f64) -> Trip {
    Trip::new(
        VehicleId(vehicle),
        requests.to_vec(),
        RouteResult {
            cost,
            stops: Vec::new(),
        },
    )
}

fn solvers() -> Vec<(&'static str, Box<dyn AssignmentSolver>)> {
    vec![
        (
            "vehicle first",
            Box::new(GreedyVehicleFirstSolver) as Box<dyn AssignmentSolver>,
        ),
        (
            "trip first",
            Box::new(GreedyTripFirstSolver) as Box<dyn AssignmentSolver>,
        ),
    ]
}

fn selection(trips: &[Trip], selected: &[usize]) -> Vec<(VehicleId, Vec<RequestId>)> {
    let mut chosen: Vec<(VehicleId, Vec<RequestId>)> = selected
        .iter()
        .map(|index| (trips[*index].vehicle, trips[*index].requests.clone()))
        .collect();
    chosen.sort();
    chosen
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_cheap_pooled_trip_is_selected() {
    let mut pool = RequestPool::new();
    let a = TestRequest::new(10, 50).submit(&mut pool);
    let b = TestRequest::new(20, 40).submit(&mut pool);

    let trips = vec![trip(0, &[a], 10.0), trip(0, &[b], 10.0), trip(0, &[a, b], 5.0)];

    for (name, solver) in solvers() {
        let solution = solver.solve(&AssignmentProblem {
            trips: &trips,
            pool: &pool,
            penalty: RejectionPenalty::default(),
        });

        assert_eq!(solution.status, SolutionStatus::Optimal, "{}", name);
        assert_eq!(solution.selected, vec![2], "{}", name);
    }
}

#[test]
fn test_expensive_pooling_uses_two_vehicles() {
    let mut pool = RequestPool::new();
    let a = TestRequest::new(10, 50).submit(&mut pool);
    let b = TestRequest::new(20, 40).submit(&mut pool);

    let trips = vec![
        trip(0, &[a], 10.0),
        trip(0, &[a, b], 100.0),
        trip(1, &[b], 10.0),
        trip(1, &[a], 50.0),
    ];

    for (name, solver) in solvers() {
        let solution = solver.solve(&AssignmentProblem {
            trips: &trips,
            pool: &pool,
            penalty: RejectionPenalty::default(),
        });

        assert_eq!(
            selection(&trips, &solution.selected),
            vec![(VehicleId(0), vec![a]), (VehicleId(1), vec![b])],
            "{}",
            name
        );
    }
}

#[test]
fn test_vehicle_first_skips_claimed_requests() {
    let mut pool = RequestPool::new();
    let a = TestRequest::new(10, 50).submit(&mut pool);
    let b = TestRequest::new(20, 40).submit(&mut pool);

    // Vehicle 0 comes first and takes its cheapest trip, leaving vehicle 1
    // with whatever is still free.
    let trips = vec![
        trip(1, &[a], 1.0),
        trip(1, &[b], 30.0),
        trip(0, &[a], 20.0),
    ];

    let solution = GreedyVehicleFirstSolver.solve(&AssignmentProblem {
        trips: &trips,
        pool: &pool,
        penalty: RejectionPenalty::default(),
    });

    assert_eq!(
        selection(&trips, &solution.selected),
        vec![(VehicleId(0), vec![a]), (VehicleId(1), vec![b])]
    );
}

#[test]
fn test_trip_first_takes_cheapest_globally() {
    let mut pool = RequestPool::new();
    let a = TestRequest::new(10, 50).submit(&mut pool);
    let b = TestRequest::new(20, 40).submit(&mut pool);

    let trips = vec![
        trip(1, &[a], 1.0),
        trip(1, &[b], 30.0),
        trip(0, &[a], 20.0),
    ];

    let solution = GreedyTripFirstSolver.solve(&AssignmentProblem {
        trips: &trips,
        pool: &pool,
        penalty: RejectionPenalty::default(),
    });

    // Request b is left out: its only vehicle is already busy.
    assert_eq!(selection(&trips, &solution.selected), vec![(VehicleId(1), vec![a])]);
}

#[test]
fn test_empty_problem() {
    let pool = RequestPool::new();

    for (name, solver) in solvers() {
        let solution = solver.solve(&AssignmentProblem {
            trips: &[],
            pool: &pool,
            penalty: RejectionPenalty::default(),
        });

        assert_eq!(solution.status, SolutionStatus::Optimal, "{}", name);
        assert!(solution.selected.is_empty(), "{}", name);
    }
}
