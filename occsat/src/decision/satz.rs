//! Satz: unit-propagation driven lookahead staging.
//!
//! Candidates are staged by their binary occurrence profile (PROP41, then PROP31, then plain
//! BCP weighting on every candidate), each stage examining both polarities via a lookahead and
//! propagating failed literals on the spot. The winner maximizes
//! `posR * (negR * 1024 + 1) + negR + 1` over the recorded reduction counts, and is branched on
//! positively.
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

use super::lookahead::{probe, probe_satz_weight, ProbeScoring};
use super::{candidate_at, candidate_count, Decision};

/// Minimum number of candidates to collect before settling for a stage.
const SATZ_T: usize = 10;

/// Outcome of examining both polarities of a candidate.
enum Examined {
    /// Both lookaheads succeeded and the reduction counts were recorded.
    Scored,
    /// One polarity failed; the other was propagated for real.
    Propagated,
    /// The failed-literal propagation conflicted; the backtracking result is passed through.
    Backtrack(Option<Decision>),
}

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
        ctx.part_mut(HeurStateP).chosen_props.clear();

        let pure = ctx.part(SolverConfigP).pure_literal;

        // PROP41: both polarities in binary clauses, more than three binary occurrences.
        let n = ctx.part(PropsP).order.len();
        let mut i = 0;
        while i < n {
            let var = ctx.part(PropsP).order[i];
            i += 1;
            if ctx.part(PropsP).value(var).is_some() {
                continue;
            }

            {
                let heur = ctx.part_mut(HeurStateP);
                heur.reduced_pos[var.index()] = 0;
                heur.reduced_neg[var.index()] = 0;
            }

            let (pos2, pos3) = occurrence_profile(ctx.borrow(), var, true);
            {
                let heur = ctx.part_mut(HeurStateP);
                heur.pos_len2[var.index()] = pos2;
                heur.pos_len3[var.index()] = pos3;
            }
            if pure && pos2 + pos3 == 0 {
                let _ = extend_prop(ctx.borrow(), var, false, AssignMode::PureNeg);
                ctx.part_mut(StatsP).pures += 1;
                continue;
            }

            let (neg2, neg3) = occurrence_profile(ctx.borrow(), var, false);
            {
                let heur = ctx.part_mut(HeurStateP);
                heur.neg_len2[var.index()] = neg2;
                heur.neg_len3[var.index()] = neg3;
            }
            if pure && neg2 + neg3 == 0 {
                let _ = extend_prop(ctx.borrow(), var, true, AssignMode::PurePos);
                ctx.part_mut(StatsP).pures += 1;
                continue;
            }

            if neg2 > 0 && pos2 > 0 && neg2 + pos2 > 3 {
                match examine_pair(ctx.borrow(), var)? {
                    Examined::Backtrack(decision) => return Ok(decision),
                    Examined::Propagated => continue,
                    Examined::Scored => ctx.part_mut(HeurStateP).chosen_props.push(var),
                }
            }
        }

        // PROP31: both polarities in binary clauses, one of them at least twice.
        if ctx.part(HeurStateP).chosen_props.len() < SATZ_T {
            let n = ctx.part(PropsP).order.len();
            let mut i = 0;
            while i < n {
                let var = ctx.part(PropsP).order[i];
                i += 1;
                if ctx.part(PropsP).value(var).is_some() {
                    continue;
                }
                let (examined, pos2, neg2) = {
                    let heur = ctx.part(HeurStateP);
                    (
                        heur.reduced_neg[var.index()] != 0,
                        heur.pos_len2[var.index()],
                        heur.neg_len2[var.index()],
                    )
                };
                if examined {
                    continue;
                }
                if neg2 > 0 && pos2 > 0 && (neg2 > 1 || pos2 > 1) {
                    match examine_pair(ctx.borrow(), var)? {
                        Examined::Backtrack(decision) => return Ok(decision),
                        Examined::Propagated => continue,
                        Examined::Scored => ctx.part_mut(HeurStateP).chosen_props.push(var),
                    }
                }
            }
        }

        // PROP0: BCP based weighting of every open candidate.
        if ctx.part(HeurStateP).chosen_props.len() < SATZ_T {
            ctx.part_mut(HeurStateP).chosen_props.clear();

            let use_model = ctx.part(SolverConfigP).indep_props;
            let n = candidate_count(ctx.part(PropsP), use_model);
            let mut i = 0;
            while i < n {
                let var = candidate_at(ctx.part(PropsP), use_model, i);
                i += 1;
                if ctx.part(PropsP).value(var).is_some() {
                    continue;
                }

                match probe_satz_weight(ctx.borrow(), var, true) {
                    None => {
                        let _ = extend_prop(ctx.borrow(), var, false, AssignMode::Failed);
                        ctx.part_mut(StatsP).faileds += 1;
                        if let Err(conflict) = bcp(ctx.borrow()) {
                            return backtrack(ctx.borrow(), conflict);
                        }
                        debug_assert!(ctx.part(BcpQueueP).stack.is_empty());
                        continue;
                    }
                    Some(weight) => {
                        ctx.part_mut(HeurStateP).reduced_pos[var.index()] += weight;
                    }
                }
                match probe_satz_weight(ctx.borrow(), var, false) {
                    None => {
                        let _ = extend_prop(ctx.borrow(), var, true, AssignMode::Failed);
                        ctx.part_mut(StatsP).faileds += 1;
                        if let Err(conflict) = bcp(ctx.borrow()) {
                            return backtrack(ctx.borrow(), conflict);
                        }
                        debug_assert!(ctx.part(BcpQueueP).stack.is_empty());
                        continue;
                    }
                    Some(weight) => {
                        ctx.part_mut(HeurStateP).reduced_neg[var.index()] += weight;
                    }
                }
                ctx.part_mut(HeurStateP).chosen_props.push(var);
            }
        }

        // Select the candidate with the best combined reduction count.
        let mut best: Option<Var> = None;
        let mut best_weight = 0i64;
        {
            let heur = ctx.part(HeurStateP);
            for &var in heur.chosen_props.iter() {
                let neg = heur.reduced_neg[var.index()];
                let weight = heur.reduced_pos[var.index()] * ((neg << 10) + 1) + neg + 1;
                if weight > best_weight {
                    best_weight = weight;
                    best = Some(var);
                }
            }
        }

        match best {
            None => return Ok(None),
            Some(var) => {
                if ctx.part(PropsP).value(var).is_none() {
                    return Ok(Some(Decision {
                        var,
                        value: true,
                        mode: AssignMode::LeftSplit,
                    }));
                }
                // The best candidate was assigned by a failed literal meanwhile: rescore.
            }
        }
    }
}

/// Lookahead on both polarities, recording the reduction counts.
fn examine_pair(
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
    var: Var,
) -> Result<Examined, SolverError> {
    let probe_tt = probe(ctx.borrow(), var, true, ProbeScoring::Plain, false);
    if probe_tt.failed {
        let _ = extend_prop(ctx.borrow(), var, false, AssignMode::Failed);
        ctx.part_mut(StatsP).faileds += 1;
        if let Err(conflict) = bcp(ctx.borrow()) {
            return Ok(Examined::Backtrack(backtrack(ctx.borrow(), conflict)?));
        }
        debug_assert!(ctx.part(BcpQueueP).stack.is_empty());
        return Ok(Examined::Propagated);
    }
    ctx.part_mut(HeurStateP).reduced_pos[var.index()] = probe_tt.touched;

    let probe_ff = probe(ctx.borrow(), var, false, ProbeScoring::Plain, false);
    if probe_ff.failed {
        let _ = extend_prop(ctx.borrow(), var, true, AssignMode::Failed);
        ctx.part_mut(StatsP).faileds += 1;
        if let Err(conflict) = bcp(ctx.borrow()) {
            return Ok(Examined::Backtrack(backtrack(ctx.borrow(), conflict)?));
        }
        debug_assert!(ctx.part(BcpQueueP).stack.is_empty());
        return Ok(Examined::Propagated);
    }
    ctx.part_mut(HeurStateP).reduced_neg[var.index()] = probe_ff.touched;

    Ok(Examined::Scored)
}

/// Count the open binary and longer occurrences of one polarity.
fn occurrence_profile(
    ctx: partial!(Context, ClauseAllocP, PropsP),
    var: Var,
    positive: bool,
) -> (i64, i64) {
    let props = ctx.part(PropsP);
    let alloc = ctx.part(ClauseAllocP);
    let p = props.prop(var);
    let occs = if positive {
        &p.pos_occs[..p.pos_orig]
    } else {
        &p.neg_occs[..p.neg_orig]
    };

    let mut two = 0i64;
    let mut longer = 0i64;
    for &cref in occs.iter() {
        let cl = alloc.clause(cref);
        if cl.is_open() {
            if cl.open_lits > 2 {
                longer += 1;
            } else {
                two += 1;
            }
        }
    }
    (two, longer)
}
