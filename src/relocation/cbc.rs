use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Duration;

use crate::assignment::SolutionStatus;
use crate::cbc::{CbcSolver, parse_solution};
use crate::error::DispatchError;

use super::{Relocation, RelocationSolver, retain_one_to_one, write_relocation_problem};

/// Relocation through the CBC executable.
///
/// The model only fixes the number of relocations, so the selection is
/// reduced to one relocation per vehicle and destination afterwards.
#[derive(Debug, Clone)]
pub struct CbcMpsRelocationSolver {
    cbc: CbcSolver,
    time_limit: Duration,
    random_seed: u64,
}

impl CbcMpsRelocationSolver {
    pub fn new(cbc: CbcSolver, time_limit: Duration, random_seed: u64) -> Self {
        Self {
            cbc,
            time_limit,
            random_seed,
        }
    }

    fn try_solve(&self, candidates: &[Relocation]) -> Result<Vec<Relocation>, DispatchError> {
        let problem_path = self.cbc.problem_path("relocation");
        let solution_path = self.cbc.solution_path("relocation");

        let mut writer = BufWriter::new(File::create(&problem_path)?);
        write_relocation_problem(&mut writer, candidates)?;
        writer.flush()?;

        let options = vec![
            "-randomSeed".to_string(),
            self.random_seed.to_string(),
            "-randomCbcSeed".to_string(),
            self.random_seed.to_string(),
            "-seconds".to_string(),
            self.time_limit.as_secs_f64().to_string(),
            "-threads".to_string(),
            "1".to_string(),
        ];

        let text = self.cbc.run(&problem_path, &solution_path, &options, self.time_limit)?;
        let (status, selected) = parse_solution(&text);

        match status {
            SolutionStatus::Optimal => {}
            SolutionStatus::Feasible => tracing::warn!("Cbc MPS relocation solution is not optimal"),
            SolutionStatus::Failure => {
                tracing::warn!("Cbc MPS relocation did not find a solution");
                return Ok(Vec::new());
            }
        }

        Ok(retain_one_to_one(
            selected
                .into_iter()
                .filter_map(|index| candidates.get(index).copied()),
        ))
    }
}

impl RelocationSolver for CbcMpsRelocationSolver {
    fn solve(&self, candidates: &[Relocation]) -> Vec<Relocation> {
        if candidates.is_empty() {
            return Vec::new();
        }

        self.try_solve(candidates).unwrap_or_else(|err| {
            tracing::warn!("Cbc MPS relocation solver did not finish successfully: {}", err);
            Vec::new()
        })
    }
}
