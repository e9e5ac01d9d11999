//! One- and two-sided Jeroslow-Wang.
//!
//! Literal `l` weighs the sum over the open clauses containing it of `2^(6 - |C|)`, clamped to 1
//! for clauses of six or more open literals. One-sided branches on the proposition with the
//! maximal one-side weight, taking the heavier sign; two-sided scores propositions by the sum of
//! both sides, suggesting the positive sign on ties.
use partial_ref::{partial, PartialRef};

use occsat_formula::Var;

use crate::clause::{ClauseAlloc, ClauseRef};
use crate::context::{ClauseAllocP, Context, MlfQueueP, PropsP, SolverConfigP};
use crate::lit::LitIdx;
use crate::props::AssignMode;

use super::{candidate_at, candidate_count, Decision};

const JW_MAX: LitIdx = 6;

pub(crate) fn side_weight(occs: &[ClauseRef], alloc: &ClauseAlloc) -> i64 {
    let mut weight = 0i64;
    for &cref in occs.iter() {
        let cl = alloc.clause(cref);
        if cl.is_open() {
            let shift = if cl.open_lits > JW_MAX {
                0
            } else {
                JW_MAX - cl.open_lits
            };
            weight += 1i64 << shift;
        }
    }
    weight
}

pub fn choose(
    mut ctx: partial!(
        Context,
        mut MlfQueueP,
        mut PropsP,
        ClauseAllocP,
        SolverConfigP,
    ),
    two_sided: bool,
) -> Option<Decision> {
    let use_model = ctx.part(SolverConfigP).indep_props;
    let pure = ctx.part(SolverConfigP).pure_literal;

    let mut best_weight = 0i64;
    let mut best: Option<(Var, bool)> = None;

    let count = candidate_count(ctx.part(PropsP), use_model);
    for i in 0..count {
        let var = candidate_at(ctx.part(PropsP), use_model, i);
        if ctx.part(PropsP).value(var).is_some() {
            continue;
        }

        let (pos_weight, neg_weight) = {
            let props = ctx.part(PropsP);
            let alloc = ctx.part(ClauseAllocP);
            let p = props.prop(var);
            (
                side_weight(&p.pos_occs[..p.pos_orig], alloc),
                side_weight(&p.neg_occs[..p.neg_orig], alloc),
            )
        };

        if pure && (pos_weight == 0) != (neg_weight == 0) {
            let mode = if neg_weight != 0 {
                AssignMode::PureNeg
            } else {
                AssignMode::PurePos
            };
            ctx.part_mut(PropsP).prop_mut(var).mode = mode;
            ctx.part_mut(MlfQueueP).stack.push(var);
        }

        let (weight, sign) = if two_sided {
            (pos_weight + neg_weight, pos_weight >= neg_weight)
        } else {
            (pos_weight.max(neg_weight), pos_weight > neg_weight)
        };
        if weight > best_weight {
            best_weight = weight;
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

    use occsat_formula::{lits, Var};

    use crate::context::Context;
    use crate::test_setup::load_and_finalize;

    use super::*;

    #[test]
    fn prefers_short_clause_occurrences() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        // 2 occurs in both binary clauses, everything else is spread thin.
        load_and_finalize(
            ctx.borrow(),
            &[
                &lits![2, 5][..],
                &lits![2, 6][..],
                &lits![1, 3, 4, 5, 6][..],
            ],
        );

        let decision = choose(ctx.borrow(), false).unwrap();
        assert_eq!(decision.var, Var::from_dimacs(2));
        assert_eq!(decision.value, true);
        assert_eq!(decision.mode, AssignMode::LeftSplit);
    }

    #[test]
    fn exhausted_candidates_return_none() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(ctx.borrow(), &[]);

        assert!(choose(ctx.borrow(), false).is_none());
        assert!(choose(ctx.borrow(), true).is_none());
    }
}
