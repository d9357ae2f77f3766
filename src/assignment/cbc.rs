use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Duration;

use crate::cbc::{CbcSolver, parse_solution};
use crate::error::DispatchError;

use super::{
    AssignmentProblem, AssignmentSolution, AssignmentSolver, SolutionStatus, retain_conflict_free,
    write_assignment_problem,
};

/// Exact assignment through the CBC executable.
#[derive(Debug, Clone)]
pub struct CbcMpsAssignmentSolver {
    cbc: CbcSolver,
    time_limit: Duration,
    optimality_gap: f64,
    random_seed: u64,
}

impl CbcMpsAssignmentSolver {
    pub fn new(cbc: CbcSolver, time_limit: Duration, optimality_gap: f64, random_seed: u64) -> Self {
        Self {
            cbc,
            time_limit,
            optimality_gap,
            random_seed,
        }
    }

    fn try_solve(&self, problem: &AssignmentProblem<'_>) -> Result<AssignmentSolution, DispatchError> {
        let problem_path = self.cbc.problem_path("assignment");
        let solution_path = self.cbc.solution_path("assignment");

        let mut writer = BufWriter::new(File::create(&problem_path)?);
        write_assignment_problem(&mut writer, problem)?;
        writer.flush()?;

        let options = vec![
            "-randomSeed".to_string(),
            self.random_seed.to_string(),
            "-randomCbcSeed".to_string(),
            self.random_seed.to_string(),
            "-ratio".to_string(),
            self.optimality_gap.to_string(),
            "-seconds".to_string(),
            self.time_limit.as_secs_f64().to_string(),
            "-threads".to_string(),
            "1".to_string(),
        ];

        let text = self.cbc.run(&problem_path, &solution_path, &options, self.time_limit)?;
        let (status, selected) = parse_solution(&text);

        match status {
            SolutionStatus::Optimal => {}
            SolutionStatus::Feasible => tracing::warn!("Cbc MPS assignment solution is not optimal"),
            SolutionStatus::Failure => {
                tracing::warn!("Cbc MPS assignment did not find a solution");
                return Ok(AssignmentSolution {
                    status,
                    selected: Vec::new(),
                });
            }
        }

        // The solution file is only trusted as far as it names real,
        // non-conflicting trips.
        let retained = retain_conflict_free(problem.trips, &selected);
        if retained.len() != selected.len() {
            tracing::warn!(
                "Dropped {} of {} trips selected by cbc",
                selected.len() - retained.len(),
                selected.len()
            );
        }
        let selected = retained;

        Ok(AssignmentSolution { status, selected })
    }
}

impl AssignmentSolver for CbcMpsAssignmentSolver {
    fn solve(&self, problem: &AssignmentProblem<'_>) -> AssignmentSolution {
        match self.try_solve(problem) {
            Ok(solution) => solution,
            Err(err) => {
                tracing::warn!("Cbc MPS assignment solver did not finish successfully: {}", err);
                AssignmentSolution::failure()
            }
        }
    }
}
