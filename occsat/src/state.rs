//! Miscellaneous solver state.
use occsat_formula::Lit;

/// Outcome of a search.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SolveResult {
    /// The requested number of satisfying assignments was found.
    Sat,
    /// Unsatisfiable, or the enumeration was exhausted before reaching the requested count.
    Unsat,
    /// The time budget expired.
    TimeFail,
    /// The memory budget expired.
    MemFail,
}

/// Search progress that is not owned by a more specific part of the context.
#[derive(Default)]
pub struct SolverState {
    /// How many more satisfying assignments the driver still has to find.
    pub solutions_remaining: u64,
    /// Every satisfying assignment found so far, as trail literals in assignment order.
    ///
    /// Propositions missing from a model are don't-cares.
    pub models: Vec<Vec<Lit>>,
}

impl SolverState {
    /// Reset for a new search asked to find `sol_num` assignments.
    pub fn reset(&mut self, sol_num: u64) {
        self.solutions_remaining = sol_num;
        self.models.clear();
    }
}
