//! Exact relocation via Kuhn-Munkres (Hungarian) assignment.

use std::collections::HashMap;

use pathfinding::kuhn_munkres::{Weights, kuhn_munkres};

use crate::stop::Location;
use crate::vehicle::VehicleId;

use super::{Relocation, RelocationSolver};

/// Costs enter the matrix in milliseconds.
const SCALE: f64 = 1_000.0;

/// Cap on a single scaled cost, about 35 years, so that the sentinel and the
/// matching totals built from it stay well inside `i64`.
const MAX_WEIGHT: i64 = 1 << 40;

/// Dense weight matrix, rows being the smaller side.
struct WeightMatrix(Vec<Vec<i64>>);

impl Weights<i64> for WeightMatrix {
    fn rows(&self) -> usize {
        self.0.len()
    }

    fn columns(&self) -> usize {
        self.0.first().map_or(0, |row| row.len())
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.0[row][col]
    }

    fn neg(&self) -> Self {
        WeightMatrix(
            self.0
                .iter()
                .map(|row| row.iter().map(|weight| weight.saturating_neg()).collect())
                .collect(),
        )
    }
}

/// Minimum total cost among the matchings with the most relocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchingRelocationSolver;

/// Negated, scaled cost; the solver maximises.
fn weight(cost: f64) -> i64 {
    let scaled = (cost * SCALE).round().clamp(0.0, MAX_WEIGHT as f64);
    -(scaled as i64)
}

impl RelocationSolver for MatchingRelocationSolver {
    fn solve(&self, candidates: &[Relocation]) -> Vec<Relocation> {
        let mut vehicles: Vec<VehicleId> = Vec::new();
        let mut destinations: Vec<Location> = Vec::new();
        let mut edges: HashMap<(usize, usize), usize> = HashMap::new();

        for (index, candidate) in candidates.iter().enumerate() {
            let v = position_or_push(&mut vehicles, candidate.vehicle);
            let d = position_or_push(&mut destinations, candidate.destination);

            edges
                .entry((v, d))
                .and_modify(|best| {
                    if candidate.cost < candidates[*best].cost {
                        *best = index;
                    }
                })
                .or_insert(index);
        }

        if edges.is_empty() {
            return Vec::new();
        }

        // Every row gets matched, so rows are the smaller side.
        let vehicles_as_rows = vehicles.len() <= destinations.len();
        let (rows, cols) = if vehicles_as_rows {
            (vehicles.len(), destinations.len())
        } else {
            (destinations.len(), vehicles.len())
        };

        let edge = |row: usize, col: usize| {
            let key = if vehicles_as_rows { (row, col) } else { (col, row) };
            edges.get(&key).copied()
        };

        // A missing pair weighs more than all real pairs together, so one
        // more real relocation always beats any cost saving.
        let infeasible = -edges
            .values()
            .map(|index| -weight(candidates[*index].cost))
            .fold(1_i64, i64::saturating_add);

        let mut matrix = vec![vec![infeasible; cols]; rows];
        for (row, weights) in matrix.iter_mut().enumerate() {
            for (col, entry) in weights.iter_mut().enumerate() {
                if let Some(index) = edge(row, col) {
                    *entry = weight(candidates[index].cost);
                }
            }
        }

        let (_total, assignments) = kuhn_munkres(&WeightMatrix(matrix));

        assignments
            .iter()
            .enumerate()
            .filter_map(|(row, &col)| edge(row, col))
            .map(|index| candidates[index])
            .collect()
    }
}

fn position_or_push<T: PartialEq + Copy>(items: &mut Vec<T>, item: T) -> usize {
    match items.iter().position(|other| *other == item) {
        Some(position) => position,
        None => {
            items.push(item);
            items.len() - 1
        }
    }
}
