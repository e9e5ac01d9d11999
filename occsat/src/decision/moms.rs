//! Maximum occurrences in minimum size (binary) clauses.
//!
//! Scores a proposition as `(pos + 1) * (neg + 1)` over its open binary occurrences. The sign of
//! the winner follows `sign_pos`, flipped when the negative count dominates; Sato reuses this
//! with its own default sign and a restricted candidate list.
use partial_ref::{partial, PartialRef};

use occsat_formula::Var;

use crate::context::{ClauseAllocP, Context, MlfQueueP, PropsP, SolverConfigP};
use crate::props::AssignMode;

use super::{candidate_at, candidate_count, Decision};

pub fn choose(
    mut ctx: partial!(
        Context,
        mut MlfQueueP,
        mut PropsP,
        ClauseAllocP,
        SolverConfigP,
    ),
    prop_list: Option<&[Var]>,
    sign_pos: bool,
) -> Option<Decision> {
    let use_model = ctx.part(SolverConfigP).indep_props;
    let pure = ctx.part(SolverConfigP).pure_literal;

    let mut best_weight = -1i64;
    let mut best: Option<(Var, bool)> = None;

    let count = match prop_list {
        Some(list) => list.len(),
        None => candidate_count(ctx.part(PropsP), use_model),
    };
    for i in 0..count {
        let var = match prop_list {
            Some(list) => list[i],
            None => candidate_at(ctx.part(PropsP), use_model, i),
        };
        if ctx.part(PropsP).value(var).is_some() {
            continue;
        }

        let mut pos = 1i64;
        let mut neg = 1i64;
        let mut pos_all = 0i64;
        let mut neg_all = 0i64;
        {
            let props = ctx.part(PropsP);
            let alloc = ctx.part(ClauseAllocP);
            let p = props.prop(var);
            for &cref in &p.pos_occs[..p.pos_orig] {
                let cl = alloc.clause(cref);
                if cl.is_open() {
                    if cl.open_lits == 2 {
                        pos += 1;
                    }
                    pos_all += 1;
                }
            }
            for &cref in &p.neg_occs[..p.neg_orig] {
                let cl = alloc.clause(cref);
                if cl.is_open() {
                    if cl.open_lits == 2 {
                        neg += 1;
                    }
                    neg_all += 1;
                }
            }
        }

        if pure && (pos_all == 0) != (neg_all == 0) {
            let mode = if neg_all != 0 {
                AssignMode::PureNeg
            } else {
                AssignMode::PurePos
            };
            ctx.part_mut(PropsP).prop_mut(var).mode = mode;
            ctx.part_mut(MlfQueueP).stack.push(var);
        }

        let weight = pos * neg;
        if weight > best_weight {
            best_weight = weight;
            let sign = if neg > pos { !sign_pos } else { sign_pos };
            best = Some((var, sign));
        }
    }

    best.map(|(var, value)| Decision {
        var,
        value,
        mode: AssignMode::LeftSplit,
    })
}

#[cfg(test)]
mod tests {
    use partial_ref::IntoPartialRefMut;

    use occsat_formula::{lits, vars, Var};

    use crate::context::Context;
    use crate::test_setup::load_and_finalize;

    use super::*;

    #[test]
    fn binary_occurrences_decide() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(
            ctx.borrow(),
            &[
                &lits![1, -2][..],
                &lits![-1, 2][..],
                &lits![2, -3][..],
                &lits![4, 5, 6][..],
            ],
        );

        let decision = choose(ctx.borrow(), None, true).unwrap();
        assert_eq!(decision.var, Var::from_dimacs(2));
    }

    #[test]
    fn candidate_list_restricts_the_choice() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(
            ctx.borrow(),
            &[&lits![1, -2][..], &lits![-1, 2][..], &lits![3, 4][..]],
        );

        let list = vars![3, 4];
        let decision = choose(ctx.borrow(), Some(&list), true).unwrap();
        assert!(decision.var == Var::from_dimacs(3) || decision.var == Var::from_dimacs(4));
    }
}
