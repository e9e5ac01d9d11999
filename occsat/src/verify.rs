//! Solution verification.
//!
//! Before a satisfying assignment is reported, the trail is replayed from the bottom over a
//! fresh scratch copy of the original clause state. The replay must close every clause (every
//! non-Horn clause under horn relaxation) without ever emptying one; trail entries beyond the
//! last one needed are reported as redundant assignments.
use partial_ref::{partial, PartialRef};

use crate::context::{
    ClauseAllocP, ClauseDbP, Context, PropsP, SolverConfigP, TmpDataP, TrailP,
};
use crate::errors::SolverError;
use crate::lit::LitIdx;
use crate::props::AssignMode;

/// Scratch state of the verification replay.
#[derive(Default)]
pub struct TmpData {
    open: Vec<LitIdx>,
    sub: Vec<bool>,
    pos: Vec<LitIdx>,
}

/// Replay the trail and check that the current assignment is a solution.
///
/// Returns the number of redundant assignments, or a verification error.
pub fn check_solution(
    mut ctx: partial!(
        Context,
        mut TmpDataP,
        ClauseAllocP,
        ClauseDbP,
        PropsP,
        SolverConfigP,
        TrailP,
    ),
) -> Result<usize, SolverError> {
    let horn = ctx.part(SolverConfigP).horn_relaxation;

    let (tmp, ctx) = ctx.split_part_mut(TmpDataP);
    let alloc = ctx.part(ClauseAllocP);
    let db = ctx.part(ClauseDbP);
    let props = ctx.part(PropsP);
    let trail = ctx.part(TrailP);

    // Fresh copy of the original clause state.
    let slots = alloc.slot_count();
    tmp.open.clear();
    tmp.open.resize(slots, 0);
    tmp.sub.clear();
    tmp.sub.resize(slots, false);
    tmp.pos.clear();
    tmp.pos.resize(slots, 0);
    for &cref in db.clauses.iter() {
        let cl = alloc.clause(cref);
        tmp.open[cref.index()] = cl.lits.len() as LitIdx;
        tmp.pos[cref.index()] = cl.lits.iter().filter(|lit| lit.is_positive()).count() as LitIdx;
    }

    let mut remaining: i64 = if horn {
        db.nh_count as i64
    } else {
        db.clause_count as i64
    };

    let mut j = 0;
    'replay: while j < trail.stack.len() && remaining > 0 {
        let var = trail.stack[j];
        let value = match props.value(var) {
            Some(value) => value,
            None => break,
        };

        let p = &props.store[var.index()];
        let (sat_occs, sat_orig, fals_occs, fals_orig) = if value {
            (&p.pos_occs, p.pos_orig, &p.neg_occs, p.neg_orig)
        } else {
            (&p.neg_occs, p.neg_orig, &p.pos_occs, p.pos_orig)
        };

        for &cref in &sat_occs[..sat_orig] {
            let slot = cref.index();
            if !tmp.sub[slot] {
                tmp.sub[slot] = true;
                if !horn || tmp.pos[slot] > 1 {
                    remaining -= 1;
                }
            }
        }
        for &cref in &fals_occs[..fals_orig] {
            let slot = cref.index();
            if !tmp.sub[slot] {
                tmp.open[slot] -= 1;
                if horn && !value {
                    if tmp.pos[slot] == 2 {
                        remaining -= 1;
                    }
                    tmp.pos[slot] -= 1;
                }
            }
            if tmp.open[slot] == 0 {
                // An empty clause: the assignment is no solution.
                remaining = -1;
                break 'replay;
            }
        }

        j += 1;
    }

    if remaining != 0 {
        return Err(SolverError::verify("assignment is not verified"));
    }

    if horn {
        // Trailing unit propagations close the Horn part and do not count as redundant.
        while j < trail.stack.len() && props.prop(trail.stack[j]).mode == AssignMode::Unit {
            j += 1;
        }
    }

    Ok(trail.stack.len() - j)
}

#[cfg(test)]
mod tests {
    use partial_ref::IntoPartialRefMut;

    use occsat_formula::{lits, Var};

    use crate::context::{Context, TrailP};
    use crate::prop::extend_prop;
    use crate::test_setup::load_and_finalize;

    use super::*;

    #[test]
    fn accepts_a_solution_and_counts_redundancy() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(ctx.borrow(), &[&lits![1, 2][..], &lits![-1, 2][..]]);

        assert!(extend_prop(ctx.borrow(), Var::from_dimacs(2), true, AssignMode::LeftSplit).is_ok());
        assert_eq!(check_solution(ctx.borrow()).unwrap(), 0);

        // A second assignment closes nothing new.
        assert!(extend_prop(ctx.borrow(), Var::from_dimacs(1), true, AssignMode::LeftSplit).is_ok());
        assert_eq!(check_solution(ctx.borrow()).unwrap(), 1);
    }

    #[test]
    fn rejects_a_non_solution() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(ctx.borrow(), &[&lits![1, 2][..]]);

        // Nothing assigned: the clause is still open.
        assert!(check_solution(ctx.borrow()).is_err());

        ctx.part_mut(TrailP).stack.push(Var::from_dimacs(1));
        // A trail entry without a value also fails the check.
        assert!(check_solution(ctx.borrow()).is_err());
    }
}
