//! Sato 3.2 heuristic: shortest open non-Horn clauses first.
//!
//! At build time the ratio of non-Horn to total clauses picks the mode and default sign: above
//! 28.54% non-Horn plain MOMS is used with a negative default sign, below that the shortest
//! non-Horn clauses are collected first, and below 2.36% the default sign flips to positive. Up
//! to seven shortest open non-Horn clauses contribute up to seven propositions, which MOMS then
//! scores. Without horn relaxation the non-Horn index is not maintained and plain MOMS is used.
use partial_ref::{partial, PartialRef};

use occsat_formula::Var;

use crate::clause::ClauseRef;
use crate::context::{
    ClauseAllocP, ClauseDbP, Context, HeurStateP, MlfQueueP, PropsP, SolverConfigP,
};

use super::{moms, Decision, HeurState};

/// Maximum number of shortest clauses and propositions to consider.
const SATO_MAGIC: usize = 7;

/// Pick the mode and the default sign from the clause profile.
pub fn init(heur: &mut HeurState, clause_count: usize, nh_count: usize) {
    if nh_count > 2 {
        let rate = (100 * clause_count) / (nh_count - 2);
        if rate < 350 {
            // More than 28.54% non-Horn clauses.
            heur.use_moms = true;
            heur.sign_pos = false;
        } else {
            heur.use_moms = false;
            // Fewer than 2.36% non-Horn clauses inverts the sign.
            heur.sign_pos = rate >= 4242;
        }
    } else {
        heur.use_moms = true;
        heur.sign_pos = false;
    }
}

pub fn choose(
    mut ctx: partial!(
        Context,
        mut HeurStateP,
        mut MlfQueueP,
        mut PropsP,
        ClauseAllocP,
        ClauseDbP,
        SolverConfigP,
    ),
) -> Option<Decision> {
    let use_moms = ctx.part(HeurStateP).use_moms;
    let sign_pos = ctx.part(HeurStateP).sign_pos;
    let horn = ctx.part(SolverConfigP).horn_relaxation;

    if use_moms || !horn {
        return moms::choose(ctx.borrow(), None, sign_pos);
    }

    // Collect up to seven of the shortest open non-Horn clauses.
    let mut shortest: Vec<ClauseRef> = Vec::with_capacity(SATO_MAGIC);
    {
        let db = ctx.part(ClauseDbP);
        let alloc = ctx.part(ClauseAllocP);
        let mut min_length = ctx.part(PropsP).order.len() as i64;
        for &cref in db.nh_clauses.iter() {
            let cl = alloc.clause(cref);
            if !cl.is_open() {
                continue;
            }
            let length = cl.open_lits as i64;
            if length < min_length {
                min_length = length;
                shortest.clear();
                shortest.push(cref);
            } else if shortest.len() < SATO_MAGIC && length == min_length {
                shortest.push(cref);
            }
        }
    }

    // Collect up to seven open propositions out of them, deduplicated via the selection marks.
    let mut selected: Vec<Var> = Vec::with_capacity(SATO_MAGIC);
    'clauses: for idx in (0..shortest.len()).rev() {
        let cref = shortest[idx];
        let len = ctx.part(ClauseAllocP).clause(cref).lits.len();
        for k in 0..len {
            let var = ctx.part(ClauseAllocP).clause(cref).lits[k].var();
            let eligible = {
                let props = ctx.part(PropsP);
                let heur = ctx.part(HeurStateP);
                props.value(var).is_none() && !heur.selected[var.index()]
            };
            if eligible {
                ctx.part_mut(HeurStateP).selected[var.index()] = true;
                selected.push(var);
                if selected.len() == SATO_MAGIC {
                    break 'clauses;
                }
            }
        }
    }
    for &var in selected.iter() {
        ctx.part_mut(HeurStateP).selected[var.index()] = false;
    }

    moms::choose(ctx.borrow(), Some(&selected), sign_pos)
}

#[cfg(test)]
mod tests {
    use partial_ref::IntoPartialRefMut;

    use occsat_formula::{lits, Var};

    use crate::config::Heuristic;
    use crate::context::Context;
    use crate::test_setup::load_and_finalize;

    use super::*;

    #[test]
    fn mode_thresholds() {
        let mut heur = HeurState::default();

        // Lots of non-Horn clauses: plain MOMS, negative sign.
        init(&mut heur, 100, 52);
        assert!(heur.use_moms);
        assert!(!heur.sign_pos);

        // Few non-Horn clauses: shortest-first, negative sign.
        init(&mut heur, 100, 12);
        assert!(!heur.use_moms);
        assert!(!heur.sign_pos);

        // Almost no non-Horn clauses: shortest-first, positive sign.
        init(&mut heur, 1000, 3);
        assert!(!heur.use_moms);
        assert!(heur.sign_pos);

        // Degenerate: fewer than three non-Horn clauses.
        init(&mut heur, 10, 2);
        assert!(heur.use_moms);
    }

    #[test]
    fn shortest_non_horn_restricts_candidates() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        {
            let config = ctx.part_mut(crate::context::SolverConfigP);
            config.horn_relaxation = true;
            config.heuristic = Heuristic::Sato;
        }

        // Three non-Horn clauses; the binary one over {5, 6} is the shortest.
        load_and_finalize(
            ctx.borrow(),
            &[
                &lits![1, 2, 3][..],
                &lits![2, 3, 4][..],
                &lits![5, 6][..],
                &lits![-1, -5][..],
            ],
        );
        {
            let heur = ctx.part_mut(HeurStateP);
            heur.use_moms = false;
            heur.sign_pos = false;
        }

        let decision = choose(ctx.borrow()).unwrap();
        assert!(
            decision.var == Var::from_dimacs(5) || decision.var == Var::from_dimacs(6),
            "candidate {} should come from the shortest non-Horn clause",
            decision.var
        );
    }
}
