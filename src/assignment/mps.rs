//! MPS encoding of the assignment problem.
//!
//! Rows: `R0000000` is the objective, then one `L` row per vehicle (at most
//! one trip) and one `E` row per request (served once or rejected). Columns
//! `T<i>` select trip `i`, columns `x<j>` reject request `j`. Vehicles and
//! requests are numbered by first appearance in the trip list.

use std::io::{self, Write};

use crate::request::RequestId;
use crate::vehicle::VehicleId;

use super::AssignmentProblem;

pub fn write_assignment_problem<W: Write>(
    writer: &mut W,
    problem: &AssignmentProblem<'_>,
) -> io::Result<()> {
    let mut vehicles: Vec<VehicleId> = Vec::new();
    let mut requests: Vec<RequestId> = Vec::new();

    for trip in problem.trips {
        if !vehicles.contains(&trip.vehicle) {
            vehicles.push(trip.vehicle);
        }

        for request in &trip.requests {
            if !requests.contains(request) {
                requests.push(*request);
            }
        }
    }

    let number_of_vehicles = vehicles.len();

    writeln!(writer, "NAME AlonsoMoraAssignment")?;
    writeln!(writer, "ROWS")?;
    writeln!(writer, " N R{:07}", 0)?;

    for index in 0..number_of_vehicles {
        writeln!(writer, " L R{:07}", index + 1)?;
    }

    for index in 0..requests.len() {
        writeln!(writer, " E R{:07}", index + number_of_vehicles + 1)?;
    }

    writeln!(writer, "COLUMNS")?;
    writeln!(writer, " M0000001 'MARKER' 'INTORG'")?;

    for (index, trip) in problem.trips.iter().enumerate() {
        writeln!(writer, " T{} R{:07} {:.6}", index, 0, trip.cost())?;

        let vehicle_index = vehicles
            .iter()
            .position(|vehicle| *vehicle == trip.vehicle)
            .unwrap_or_default();
        writeln!(writer, " T{} R{:07} 1", index, vehicle_index + 1)?;

        for request in &trip.requests {
            let request_index = requests
                .iter()
                .position(|other| other == request)
                .unwrap_or_default();
            writeln!(
                writer,
                " T{} R{:07} 1",
                index,
                request_index + number_of_vehicles + 1
            )?;
        }
    }

    for (index, request) in requests.iter().enumerate() {
        let penalty = problem.penalty.penalty(&problem.pool[*request]);
        writeln!(
            writer,
            " x{} R{:07} {:.6} R{:07} 1",
            index,
            0,
            penalty,
            index + number_of_vehicles + 1
        )?;
    }

    writeln!(writer, " M0000002 'MARKER' 'INTEND'")?;
    writeln!(writer, "RHS")?;

    for index in 0..number_of_vehicles + requests.len() {
        writeln!(writer, " RHS1 R{:07} 1", index + 1)?;
    }

    writeln!(writer, "BOUNDS")?;

    for index in 0..problem.trips.len() {
        writeln!(writer, " UP BND1 T{} 1", index)?;
    }

    for index in 0..requests.len() {
        writeln!(writer, " UP BND1 x{} 1", index)?;
    }

    writeln!(writer, "ENDATA")?;
    Ok(())
}
