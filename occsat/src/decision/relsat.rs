//! Relsat 2.0 scoring: binary occurrence counts refined by unit propagation.
//!
//! Propositions score `2 * pos * neg + pos + neg + 1` over their binary occurrence counts, where
//! a count is replaced by the number of unit propagations a lookahead performs whenever the
//! count grew since the last call. A failed literal found while scoring is propagated and the
//! scoring restarts. The final pick is random among the candidates within 90% of the best score,
//! with a random sign.
use partial_ref::{partial, PartialRef};

use occsat_formula::Var;

use crate::context::{
    BcpQueueP, ClauseAllocP, ClauseDbP, Context, HeurStateP, MlfQueueP, PropsP, RngP,
    SolverConfigP, StatsP, TrailP, WorkingReasonP,
};
use crate::errors::SolverError;
use crate::lookback::backtrack;
use crate::prop::{bcp, extend_prop};
use crate::props::AssignMode;

use super::lookahead::{probe, ProbeScoring};
use super::Decision;

/// Scores within this fraction of the best are considered best as well.
const RELSAT_FUDGE: f64 = 0.9;

pub fn choose(
    mut ctx: partial!(
        Context,
        mut BcpQueueP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut HeurStateP,
        mut MlfQueueP,
        mut PropsP,
        mut RngP,
        mut StatsP,
        mut TrailP,
        mut WorkingReasonP,
        SolverConfigP,
    ),
) -> Result<Option<Decision>, SolverError> {
    'restart: loop {
        ctx.part_mut(HeurStateP).chosen_props.clear();
        let mut best_score = -1i64;
        let mut no_binary = true;

        let n = ctx.part(PropsP).order.len();
        let mut i = 0;
        while i < n {
            let var = ctx.part(PropsP).order[i];
            i += 1;
            if ctx.part(PropsP).value(var).is_some() {
                continue;
            }

            let pos_bin = count_binary(ctx.borrow(), var, true);
            let neg_bin = count_binary(ctx.borrow(), var, false);
            {
                let heur = ctx.part_mut(HeurStateP);
                heur.pos_bin[var.index()] = pos_bin;
                heur.neg_bin[var.index()] = neg_bin;
            }
            if pos_bin > 0 || neg_bin > 0 {
                no_binary = false;
            }

            // Propagate only when the count is fresh and grew since the last scoring round.
            let retry_ff = {
                let heur = ctx.part(HeurStateP);
                neg_bin > 0
                    && heur.score_neg[var.index()] != -1
                    && neg_bin > heur.score_neg[var.index()]
            };
            let score_ff = if retry_ff {
                let out = probe(ctx.borrow(), var, true, ProbeScoring::Units, true);
                if out.failed {
                    let _ = extend_prop(ctx.borrow(), var, false, AssignMode::Failed);
                    ctx.part_mut(StatsP).faileds += 1;
                    if let Err(conflict) = bcp(ctx.borrow()) {
                        return backtrack(ctx.borrow(), conflict);
                    }
                    debug_assert!(ctx.part(BcpQueueP).stack.is_empty());
                    continue 'restart;
                }
                out.units
            } else {
                neg_bin
            };

            let retry_tt = {
                let heur = ctx.part(HeurStateP);
                pos_bin > 0
                    && heur.score_pos[var.index()] != -1
                    && pos_bin > heur.score_pos[var.index()]
            };
            let score_tt = if retry_tt {
                let out = probe(ctx.borrow(), var, false, ProbeScoring::Units, true);
                if out.failed {
                    let _ = extend_prop(ctx.borrow(), var, true, AssignMode::Failed);
                    ctx.part_mut(StatsP).faileds += 1;
                    if let Err(conflict) = bcp(ctx.borrow()) {
                        return backtrack(ctx.borrow(), conflict);
                    }
                    debug_assert!(ctx.part(BcpQueueP).stack.is_empty());
                    continue 'restart;
                }
                out.units
            } else {
                pos_bin
            };

            let score = 2 * score_tt * score_ff + score_tt + score_ff + 1;
            ctx.part_mut(HeurStateP).score[var.index()] = score;
            if score > best_score {
                best_score = score;
            }
        }

        // Without binary clauses, fall back to a modified Jeroslow-Wang weight.
        if no_binary {
            let n = ctx.part(PropsP).order.len();
            for i in 0..n {
                let var = ctx.part(PropsP).order[i];
                if ctx.part(PropsP).value(var).is_some() {
                    continue;
                }
                let score_tt = count_no_binary(ctx.borrow(), var, true);
                let score_ff = count_no_binary(ctx.borrow(), var, false);
                let score = 2 * score_tt * score_ff + score_tt + score_ff + 1;
                ctx.part_mut(HeurStateP).score[var.index()] = score;
                if score > best_score {
                    best_score = score;
                }
            }
        }

        if best_score == -1 {
            return Ok(None);
        }

        // Refresh the caches and collect the pool of near-best candidates.
        let fmin = best_score as f64 * RELSAT_FUDGE;
        {
            let mut bctx: partial!(Context, mut HeurStateP, PropsP) = ctx.borrow();
            let (heur, bctx) = bctx.split_part_mut(HeurStateP);
            let props = bctx.part(PropsP);
            for &var in props.order.iter() {
                heur.score_neg[var.index()] = heur.neg_bin[var.index()];
                heur.score_pos[var.index()] = heur.pos_bin[var.index()];
                if props.value(var).is_none() && heur.score[var.index()] as f64 >= fmin {
                    heur.chosen_props.push(var);
                }
            }
        }

        let pool_size = ctx.part(HeurStateP).chosen_props.len();
        debug_assert!(pool_size > 0, "relsat: no best candidates");
        if pool_size == 0 {
            return Ok(None);
        }
        let pick = {
            let target = ctx.part_mut(RngP).below(pool_size);
            ctx.part(HeurStateP).chosen_props[target]
        };
        let value = ctx.part_mut(RngP).flip();

        return Ok(Some(Decision {
            var: pick,
            value,
            mode: AssignMode::LeftSplit,
        }));
    }
}

/// Open binary occurrences of one polarity.
fn count_binary(ctx: partial!(Context, ClauseAllocP, PropsP), var: Var, positive: bool) -> i64 {
    let props = ctx.part(PropsP);
    let alloc = ctx.part(ClauseAllocP);
    let p = props.prop(var);
    let occs = if positive {
        &p.pos_occs[..p.pos_orig]
    } else {
        &p.neg_occs[..p.neg_orig]
    };

    occs.iter()
        .filter(|&&cref| {
            let cl = alloc.clause(cref);
            cl.is_open() && cl.open_lits == 2
        })
        .count() as i64
}

/// A modified Jeroslow-Wang weight of one polarity, for formulas without binary clauses.
fn count_no_binary(ctx: partial!(Context, ClauseAllocP, PropsP), var: Var, positive: bool) -> i64 {
    let props = ctx.part(PropsP);
    let alloc = ctx.part(ClauseAllocP);
    let p = props.prop(var);
    let occs = if positive {
        &p.pos_occs[..p.pos_orig]
    } else {
        &p.neg_occs[..p.neg_orig]
    };

    let mut score = 0i64;
    for &cref in occs.iter() {
        let cl = alloc.clause(cref);
        if cl.is_open() {
            let shift = if cl.open_lits >= 6 {
                0
            } else {
                (1u32 << (6 - cl.open_lits)).min(62)
            };
            score += 1i64 << shift;
        }
    }
    score
}
