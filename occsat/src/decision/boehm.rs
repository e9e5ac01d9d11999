//! Boehm's heuristic.
//!
//! Maximizes the weight vector (H, H') lexicographically, where H counts occurrences in clauses
//! of the current minimum open length and H' counts all open occurrences, both combined as
//! `alpha * max(pos, neg) + beta * min(pos, neg)`.
use partial_ref::{partial, PartialRef};

use occsat_formula::Var;

use crate::context::{ClauseAllocP, Context, MlfQueueP, PropsP, SolverConfigP};
use crate::props::AssignMode;

use super::{candidate_at, candidate_count, Decision};

const BOEHM_ALPHA: i64 = 1;
const BOEHM_BETA: i64 = 2;

fn combine(pos: i64, neg: i64) -> i64 {
    BOEHM_ALPHA * pos.max(neg) + BOEHM_BETA * pos.min(neg)
}

pub fn choose(
    mut ctx: partial!(
        Context,
        mut MlfQueueP,
        mut PropsP,
        ClauseAllocP,
        SolverConfigP,
    ),
) -> Option<Decision> {
    let use_model = ctx.part(SolverConfigP).indep_props;
    let pure = ctx.part(SolverConfigP).pure_literal;

    let mut best: Option<Var> = None;
    let mut sign = true;
    let mut min_length = ctx.part(PropsP).order.len() as i64;
    let mut best_weight = 0i64;
    let mut best_weight_all = 0i64;

    let count = candidate_count(ctx.part(PropsP), use_model);
    for i in 0..count {
        let var = candidate_at(ctx.part(PropsP), use_model, i);
        if ctx.part(PropsP).value(var).is_some() {
            continue;
        }

        let mut pos = 0i64;
        let mut pos_all = 0i64;
        let mut neg = 0i64;
        let mut neg_all = 0i64;
        let mut claimed = false;
        {
            let props = ctx.part(PropsP);
            let alloc = ctx.part(ClauseAllocP);
            let p = props.prop(var);

            for &cref in &p.pos_occs[..p.pos_orig] {
                let cl = alloc.clause(cref);
                if cl.is_open() {
                    let length = cl.open_lits as i64;
                    pos_all += 1;
                    if length < min_length {
                        claimed = true;
                        min_length = length;
                        pos = 1;
                    } else if length == min_length {
                        pos += 1;
                    }
                }
            }
            for &cref in &p.neg_occs[..p.neg_orig] {
                let cl = alloc.clause(cref);
                if cl.is_open() {
                    let length = cl.open_lits as i64;
                    neg_all += 1;
                    if length < min_length {
                        claimed = true;
                        min_length = length;
                        pos = 0;
                        neg = 1;
                    } else if length == min_length {
                        neg += 1;
                    }
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

        let weight = combine(pos, neg);
        let weight_all = combine(pos_all, neg_all);

        if claimed {
            // This proposition occurred in a clause shorter than everything seen before.
            best = Some(var);
            sign = pos > neg;
            best_weight = weight;
            best_weight_all = weight_all;
        } else if pos > 0 || neg > 0 {
            if weight > best_weight {
                best = Some(var);
                sign = pos > neg;
                best_weight = weight;
                best_weight_all = weight_all;
            } else if weight == best_weight && weight_all > best_weight_all {
                best = Some(var);
                sign = pos > neg;
                best_weight_all = weight_all;
            }
        }
    }

    best.map(|var| Decision {
        var,
        value: sign,
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
    fn minimum_length_occurrences_dominate() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        // 3 sits in the only binary clause twice as both polarities of the pair.
        load_and_finalize(
            ctx.borrow(),
            &[
                &lits![3, -4][..],
                &lits![1, 2, 5][..],
                &lits![1, -2, 6][..],
            ],
        );

        let decision = choose(ctx.borrow()).unwrap();
        assert_eq!(decision.var, Var::from_dimacs(3));
        assert_eq!(decision.mode, AssignMode::LeftSplit);
    }

    #[test]
    fn no_open_candidates() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(ctx.borrow(), &[]);

        assert!(choose(ctx.borrow()).is_none());
    }
}
