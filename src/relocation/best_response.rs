use super::{Relocation, RelocationSolver, retain_one_to_one};

/// Greedy: cheapest candidate first, skipping vehicles and destinations that
/// are already taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestResponseRelocationSolver;

impl RelocationSolver for BestResponseRelocationSolver {
    fn solve(&self, candidates: &[Relocation]) -> Vec<Relocation> {
        let mut sorted = candidates.to_vec();
        sorted.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        retain_one_to_one(sorted)
    }
}
