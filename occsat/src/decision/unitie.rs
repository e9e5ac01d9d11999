//! Unit propagation scoring with tie breaking.
//!
//! Every candidate is propagated both ways by the lookahead. The score combines the unit
//! propagation counts and the counts of clauses that became binary, keyed on the heuristic
//! parameter; among tied best candidates the one subsuming the most clauses can be preferred.
//! Failed literals found while scoring are propagated and the candidate scan continues.
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
use super::{candidate_at, candidate_count, Decision};

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
    loop {
        {
            let heur = ctx.part_mut(HeurStateP);
            heur.best_props.clear();
            heur.best_signs.clear();
        }
        let mut best_weight = 0i64;

        let use_model = ctx.part(SolverConfigP).indep_props;
        let heur_param = ctx.part(SolverConfigP).heur_param;

        let n = candidate_count(ctx.part(PropsP), use_model);
        let mut i = 0;
        while i < n {
            let var = candidate_at(ctx.part(PropsP), use_model, i);
            i += 1;
            if ctx.part(PropsP).value(var).is_some() {
                continue;
            }

            let tt = probe(ctx.borrow(), var, true, ProbeScoring::Unitie, false);
            if tt.failed {
                let _ = extend_prop(ctx.borrow(), var, false, AssignMode::Failed);
                ctx.part_mut(StatsP).faileds += 1;
                if let Err(conflict) = bcp(ctx.borrow()) {
                    return backtrack(ctx.borrow(), conflict);
                }
                debug_assert!(ctx.part(BcpQueueP).stack.is_empty());
                continue;
            }

            let ff = probe(ctx.borrow(), var, false, ProbeScoring::Unitie, false);
            if ff.failed {
                let _ = extend_prop(ctx.borrow(), var, true, AssignMode::Failed);
                ctx.part_mut(StatsP).faileds += 1;
                if let Err(conflict) = bcp(ctx.borrow()) {
                    return backtrack(ctx.borrow(), conflict);
                }
                debug_assert!(ctx.part(BcpQueueP).stack.is_empty());
                continue;
            }

            let (pos, pos_bin) = (tt.units, tt.bins);
            let (neg, neg_bin) = (ff.units, ff.bins);
            let weight = match heur_param {
                0 => pos * neg * 1024 + pos + neg + 1,
                1 => pos_bin * neg_bin * 1024 + pos + neg + 1,
                _ => ((pos_bin * neg_bin) << 1) + pos + neg + 1,
            };
            let sign = pos >= neg;

            if weight > best_weight {
                best_weight = weight;
                let heur = ctx.part_mut(HeurStateP);
                heur.best_props.clear();
                heur.best_signs.clear();
                heur.best_props.push(var);
                heur.best_signs.push(sign);
            } else if weight == best_weight && !ctx.part(HeurStateP).best_props.is_empty() {
                let heur = ctx.part_mut(HeurStateP);
                heur.best_props.push(var);
                heur.best_signs.push(sign);
            }
        }

        // Select one proposition out of the pool of best candidates.
        let selected: Option<(Var, bool)> = {
            let props = ctx.part(PropsP);
            let alloc = ctx.part(ClauseAllocP);
            let heur = ctx.part(HeurStateP);

            if heur.best_props.is_empty() {
                None
            } else if heur_param > 0 {
                // Prefer the candidate that subsumes the most clauses.
                let mut pick = heur.best_props[0];
                let mut pick_sign = heur.best_signs[0];
                let mut best_subs = 0i64;
                for &var in heur.best_props.iter() {
                    if props.value(var).is_some() {
                        continue;
                    }
                    let p = props.prop(var);
                    let open = |occs: &[crate::clause::ClauseRef]| {
                        occs.iter()
                            .filter(|&&cref| alloc.clause(cref).is_open())
                            .count() as i64
                    };
                    let pos = open(&p.pos_occs[..p.pos_orig]);
                    let neg = open(&p.neg_occs[..p.neg_orig]);
                    if pos > best_subs || neg > best_subs {
                        pick = var;
                        if pos > neg {
                            best_subs = pos;
                            pick_sign = true;
                        } else {
                            best_subs = neg;
                            pick_sign = false;
                        }
                    }
                }
                Some((pick, pick_sign))
            } else {
                // The first open candidate.
                let mut found = (heur.best_props[0], heur.best_signs[0]);
                for (k, &var) in heur.best_props.iter().enumerate() {
                    if props.value(var).is_none() {
                        found = (var, heur.best_signs[k]);
                        break;
                    }
                }
                Some(found)
            }
        };

        match selected {
            None => return Ok(None),
            Some((var, value)) => {
                if ctx.part(PropsP).value(var).is_none() {
                    return Ok(Some(Decision {
                        var,
                        value,
                        mode: AssignMode::LeftSplit,
                    }));
                }
                // All best candidates were assigned during failed literal propagation:
                // scoring must restart.
            }
        }
    }
}
