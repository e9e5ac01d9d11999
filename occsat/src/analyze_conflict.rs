//! The working reason: the running resolvent of conflict analysis.
//!
//! The working reason is a literal list plus a per-proposition membership map storing each
//! literal's position (offset by one, zero meaning absent). Resolution against a clause is an
//! in-place union followed by the removal of the pivot with swap-with-last. This is the
//! `initWr / resolveWithWr / makeClauseFromWr` protocol of conflict-directed backjumping.
use occsat_formula::{Lit, Var};

use crate::clause::{ClauseAlloc, ClauseRef};
use crate::lit::LitIdx;
use crate::props::Props;

/// The working reason.
#[derive(Default)]
pub struct WorkingReason {
    lits: Vec<Lit>,
    member: Vec<LitIdx>,
}

impl WorkingReason {
    /// Size the membership map for the proposition store.
    pub fn set_var_count(&mut self, count: usize) {
        self.member.clear();
        self.member.resize(count, 0);
    }

    /// The literals of the current resolvent.
    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    pub fn len(&self) -> usize {
        self.lits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }

    /// Whether the proposition occurs in the current resolvent.
    pub fn contains(&self, var: Var) -> bool {
        self.member[var.index()] != 0
    }

    /// Restart the resolvent from the literals of a conflict clause.
    pub fn init(&mut self, clause_lits: &[Lit]) {
        for &lit in self.lits.iter() {
            self.member[lit.index()] = 0;
        }
        self.lits.clear();

        for &lit in clause_lits.iter() {
            self.lits.push(lit);
            self.member[lit.index()] = self.lits.len() as LitIdx;
        }
    }

    /// Resolve the resolvent with a clause, eliminating the given proposition.
    ///
    /// The clause's literals not yet present are unioned in, then the pivot's entry is removed by
    /// swapping with the last literal. This also works when the pivot was not a member: its
    /// literal arrives with the union and is removed again.
    pub fn resolve(&mut self, clause_lits: &[Lit], pivot: Var) {
        for &lit in clause_lits.iter() {
            let entry = &mut self.member[lit.index()];
            if *entry == 0 {
                self.lits.push(lit);
                *entry = self.lits.len() as LitIdx;
            }
        }

        let i = self.member[pivot.index()] as usize;
        debug_assert!(i > 0, "resolve: pivot not in the working reason");
        let last = self.lits[self.lits.len() - 1];
        self.lits[i - 1] = last;
        self.member[last.index()] = i as LitIdx;
        self.lits.pop();
        self.member[pivot.index()] = 0;
    }
}

/// Synthesize a reason clause from the working reason.
///
/// The clause is free-floating: it is not linked into any occurrence list or index until it is
/// learned.
pub fn make_reason_from_wr(wr: &WorkingReason, alloc: &mut ClauseAlloc) -> ClauseRef {
    alloc.alloc_with(wr.lits().to_vec())
}

/// Synthesize a candidate learned clause from the working reason.
///
/// Under relevance-bounded learning a clause whose number of literals assigned at the current
/// level exceeds the learn order would be discarded by the next backtrack anyway; synthesis is
/// aborted instead and `None` is returned.
pub fn make_learnable_from_wr(
    wr: &WorkingReason,
    props: &Props,
    alloc: &mut ClauseAlloc,
    current_level: usize,
    relevance_bound: Option<usize>,
) -> Option<ClauseRef> {
    let mut lits = Vec::with_capacity(wr.len());

    match relevance_bound {
        Some(bound) => {
            let mut at_level = 0;
            for &lit in wr.lits().iter() {
                lits.push(lit);
                if props.store[lit.index()].level == current_level {
                    at_level += 1;
                    if at_level > bound {
                        return None;
                    }
                }
            }
        }
        None => lits.extend_from_slice(wr.lits()),
    }

    Some(alloc.alloc_with(lits))
}

#[cfg(test)]
mod tests {
    use occsat_formula::lits;

    use super::*;

    #[test]
    fn union_and_pivot_removal() {
        let mut wr = WorkingReason::default();
        wr.set_var_count(10);

        wr.init(&lits![1, -2, 3]);
        assert_eq!(wr.len(), 3);
        assert!(wr.contains(Var::from_dimacs(2)));

        // Resolve on 2: add the reason's other literals, drop 2.
        wr.resolve(&lits![2, -4], Var::from_dimacs(2));

        assert_eq!(wr.len(), 3);
        assert!(!wr.contains(Var::from_dimacs(2)));
        assert!(wr.contains(Var::from_dimacs(1)));
        assert!(wr.contains(Var::from_dimacs(3)));
        assert!(wr.contains(Var::from_dimacs(4)));
    }

    #[test]
    fn resolving_to_empty() {
        let mut wr = WorkingReason::default();
        wr.set_var_count(4);

        wr.init(&lits![1]);
        wr.resolve(&lits![-1], Var::from_dimacs(1));
        assert!(wr.is_empty());
        assert!(!wr.contains(Var::from_dimacs(1)));
    }

    #[test]
    fn reinit_clears_members() {
        let mut wr = WorkingReason::default();
        wr.set_var_count(8);

        wr.init(&lits![1, 2]);
        wr.init(&lits![-3]);

        assert!(!wr.contains(Var::from_dimacs(1)));
        assert!(!wr.contains(Var::from_dimacs(2)));
        assert!(wr.contains(Var::from_dimacs(3)));
        assert_eq!(wr.lits(), &lits![-3]);
    }
}
