//! Lookback: chronological backtracking, conflict-directed backjumping, clause learning.
use partial_ref::{partial, PartialRef};

use crate::analyze_conflict::{make_learnable_from_wr, make_reason_from_wr};
use crate::clause::db::push_unit_learned;
use crate::clause::{ClauseAlloc, ClauseDb, ClauseRef, UnitState};
use crate::config::LearnType;
use crate::context::{
    BcpQueueP, ClauseAllocP, ClauseDbP, Context, HeurStateP, MlfQueueP, PropsP, RngP,
    SolverConfigP, StatsP, TrailP, WorkingReasonP,
};
use crate::decision::{choose_literal, Decision};
use crate::errors::{ErrorLocation, SolverError};
use crate::lit::{LitIdx, Var, NO_REF};
use crate::prop::{bcp, retract_prop, Conflict};
use crate::props::{AssignMode, Props};

/// Return to a previous open choice point after a conflict.
///
/// Dispatches between conflict-directed backjumping and chronological backtracking.
pub fn backtrack(
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
    conflict: Conflict,
) -> Result<Option<Decision>, SolverError> {
    if ctx.part(SolverConfigP).backjumping {
        backjump(ctx.borrow(), conflict)
    } else {
        Ok(chrono_bt(ctx.borrow()))
    }
}

/// Stackwise chronological backtracking.
///
/// Pops and retracts trail entries until the most recent left split, flips its sign and returns
/// it as a right split. Returns `None` when the trail runs out of choice points.
pub fn chrono_bt(
    mut ctx: partial!(
        Context,
        mut BcpQueueP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut MlfQueueP,
        mut PropsP,
        mut StatsP,
        mut TrailP,
        SolverConfigP,
    ),
) -> Option<Decision> {
    {
        let level = ctx.part(TrailP).level;
        ctx.part_mut(StatsP).update_depth_max(level);
    }
    trace_conflict(ctx.borrow());

    ctx.part_mut(BcpQueueP).stack.clear();
    ctx.part_mut(MlfQueueP).stack.clear();

    loop {
        let var = ctx.part_mut(TrailP).stack.pop()?;
        let (mode, value, level) = {
            let p = ctx.part(PropsP).prop(var);
            (p.mode, p.value, p.level)
        };
        if mode == AssignMode::LeftSplit {
            let value = match value {
                Some(value) => value,
                None => return None,
            };
            retract_prop(ctx.borrow(), var);
            ctx.part_mut(TrailP).level = level;
            ctx.part_mut(StatsP).update_depth_min(level);
            ctx.part_mut(StatsP).fdas += 1;
            return Some(Decision {
                var,
                value: !value,
                mode: AssignMode::RightSplit,
            });
        }
        retract_prop(ctx.borrow(), var);
    }
}

/// Stackwise conflict-directed backjumping.
///
/// Resolves the working reason along the trail, learning clauses along the way, skipping choice
/// points that do not occur in the reason, and replaying unit learned clauses after landing on
/// the flipped split. Returns `None` when the trail is exhausted or the empty clause is derived.
pub fn backjump(
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
    conflict: Conflict,
) -> Result<Option<Decision>, SolverError> {
    ctx.part_mut(BcpQueueP).stack.clear();
    ctx.part_mut(MlfQueueP).stack.clear();

    init_wr_from(ctx.borrow(), conflict.clause);

    {
        let level = ctx.part(TrailP).level;
        ctx.part_mut(StatsP).update_depth_max(level);
    }
    trace_conflict(ctx.borrow());

    let mut skipped: u64 = 0;
    // The clause most recently learned from the working reason; reused as the right split's
    // reason when it still matches the resolvent.
    let mut wr_clause: Option<ClauseRef> = None;

    loop {
        let var = match ctx.part_mut(TrailP).stack.pop() {
            None => return Ok(None),
            Some(var) => var,
        };
        let in_wr = ctx.part(WorkingReasonP).contains(var);
        let (mode, value) = {
            let p = ctx.part(PropsP).prop(var);
            (p.mode, p.value)
        };

        if in_wr && mode == AssignMode::LeftSplit {
            let value = match value {
                Some(value) => value,
                None => return Ok(None),
            };

            retract_prop(ctx.borrow(), var);
            {
                let level = ctx.part(TrailP).level;
                ctx.part_mut(StatsP).update_depth_min(level);
            }

            if ctx.part(SolverConfigP).learning {
                ctx.part_mut(TrailP).level -= 1;

                // Replay the learned clauses that are unit above the new current level.
                let mut replay_conflict = None;
                let mut i = ctx.part(ClauseDbP).unit_learned.len();
                while i > 0 {
                    i -= 1;
                    let cref = ctx.part(ClauseDbP).unit_learned[i];
                    let stamp = ctx.part(ClauseAllocP).clause(cref).learned;
                    let level_now = ctx.part(TrailP).level;
                    if matches!(stamp, Some(stamp) if stamp as usize > level_now) {
                        ctx.part_mut(BcpQueueP).stack.push(cref);
                        ctx.part_mut(StatsP).ulearned += 1;
                        if let Err(new_conflict) = bcp(ctx.borrow()) {
                            replay_conflict = Some(new_conflict);
                            break;
                        }
                    }
                }

                if let Some(new_conflict) = replay_conflict {
                    // Contradiction: continue backjumping from the new conflict.
                    ctx.part_mut(BcpQueueP).stack.clear();
                    init_wr_from(ctx.borrow(), new_conflict.clause);
                    wr_clause = None;
                    trace_conflict(ctx.borrow());
                    continue;
                }

                if ctx.part(PropsP).value(var).is_some() {
                    // The replay re-assigned the flipped split; hand control back to the
                    // heuristic at the new level.
                    let horn = ctx.part(SolverConfigP).horn_relaxation;
                    if ctx.part(ClauseDbP).formula_is_empty(horn) {
                        return Ok(None);
                    }
                    return choose_literal(ctx.borrow());
                }

                ctx.part_mut(TrailP).level += 1;
            }

            let reason = match wr_clause {
                Some(cref) => cref,
                None => {
                    let mut bctx: partial!(Context, mut ClauseAllocP, WorkingReasonP) = ctx.borrow();
                    let (alloc, bctx) = bctx.split_part_mut(ClauseAllocP);
                    let wr = bctx.part(WorkingReasonP);
                    make_reason_from_wr(wr, alloc)
                }
            };
            ctx.part_mut(PropsP).prop_mut(var).reason = Some(reason);
            ctx.part_mut(StatsP).fdas += 1;
            return Ok(Some(Decision {
                var,
                value: !value,
                mode: AssignMode::RightSplit,
            }));
        }

        if in_wr
            && matches!(
                mode,
                AssignMode::Unit | AssignMode::RightSplit | AssignMode::Failed
            )
        {
            // Resolve the reason of the popped proposition into the working reason.
            let reason = match ctx.part(PropsP).prop(var).reason {
                Some(reason) => reason,
                None => {
                    return Err(SolverError::internal(
                        ErrorLocation::Backjump,
                        "missing reason during working-reason resolution",
                    ))
                }
            };
            resolve_wr(ctx.borrow(), reason, var);

            if ctx.part(WorkingReasonP).is_empty() {
                // The empty clause: the formula is unsatisfiable.
                return Ok(None);
            }

            if ctx.part(SolverConfigP).learning {
                let learn_type = ctx.part(SolverConfigP).learn_type;
                let order = ctx.part(SolverConfigP).learn_order;
                if learn_type == LearnType::Relevance || ctx.part(WorkingReasonP).len() <= order {
                    let made = {
                        let current_level = ctx.part(TrailP).level;
                        let bound = if learn_type == LearnType::Relevance {
                            Some(order)
                        } else {
                            None
                        };
                        let mut bctx: partial!(Context, mut ClauseAllocP, WorkingReasonP, PropsP) =
                            ctx.borrow();
                        let (alloc, bctx) = bctx.split_part_mut(ClauseAllocP);
                        let wr = bctx.part(WorkingReasonP);
                        let props = bctx.part(PropsP);
                        make_learnable_from_wr(wr, props, alloc, current_level, bound)
                    };
                    match made {
                        Some(cref) => {
                            learn_clause(ctx.borrow(), cref);
                            wr_clause = Some(cref);
                        }
                        None => wr_clause = None,
                    }
                } else {
                    wr_clause = None;
                }
            }
        }

        // Shared retraction path; an in-reason left split never reaches this point.
        match mode {
            AssignMode::LeftSplit => {
                skipped += 1;
                ctx.part_mut(StatsP).skipped += 1;
                if skipped > ctx.part(StatsP).skip_max {
                    ctx.part_mut(StatsP).skip_max = skipped;
                }
                retract_prop(ctx.borrow(), var);
                ctx.part_mut(TrailP).level -= 1;
            }
            AssignMode::RightSplit => {
                retract_prop(ctx.borrow(), var);
                ctx.part_mut(TrailP).level -= 1;
            }
            _ => retract_prop(ctx.borrow(), var),
        }
    }
}

/// Append a learned clause: stamp it, link it into the learned index and the occurrence lists,
/// and queue it for replay if it is already unit.
pub fn learn_clause(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut PropsP,
        mut StatsP,
        SolverConfigP,
        TrailP,
    ),
    cref: ClauseRef,
) {
    let level = ctx.part(TrailP).level;
    let order = ctx.part(SolverConfigP).learn_order;

    let (props, mut ctx) = ctx.split_part_mut(PropsP);
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
    let stats = ctx.part_mut(StatsP);

    {
        let cl = alloc.clause_mut(cref);
        cl.learned = Some(level as LitIdx);
        cl.back_clauses = db.learned.len() as LitIdx;
        cl.unit_state = UnitState::Allow;
    }
    db.learned.push(cref);

    let mut open: LitIdx = 0;
    let mut pos: LitIdx = 0;
    {
        let cl = alloc.clause(cref);
        for &lit in cl.lits.iter() {
            if !props.lit_falsified(lit) {
                open += 1;
            }
            let p = &mut props.store[lit.index()];
            if lit.is_positive() {
                p.pos_occs.push(cref);
                pos += 1;
            } else {
                p.neg_occs.push(cref);
            }
        }
    }
    {
        let cl = alloc.clause_mut(cref);
        cl.open_lits = open;
        cl.pos_lits = pos;
    }
    if open == 1 {
        push_unit_learned(db, alloc, cref);
    }

    let size = alloc.clause(cref).lits.len();
    stats.learned += 1;
    if size <= order {
        stats.slearned += 1;
    }
    stats.update_learn_size(size);
    log::trace!("learned a clause of size {}", size);
}

/// Delete a clause from the learned database.
///
/// Removes its occurrences from the learned suffix of each occurrence list, unlinks it from the
/// learned index and the unit-learned stack, and frees the slot. Swap-with-last everywhere.
pub fn unlearn_clause(
    props: &mut Props,
    db: &mut ClauseDb,
    alloc: &mut ClauseAlloc,
    cref: ClauseRef,
) {
    for k in 0..alloc.clause(cref).lits.len() {
        let lit = alloc.clause(cref).lits[k];
        let p = &mut props.store[lit.index()];
        let (occs, split) = if lit.is_positive() {
            (&mut p.pos_occs, p.pos_orig)
        } else {
            (&mut p.neg_occs, p.neg_orig)
        };
        let mut i = occs.len();
        let mut found = false;
        while i > split {
            i -= 1;
            if occs[i] == cref {
                occs.swap_remove(i);
                found = true;
                break;
            }
        }
        debug_assert!(found, "unlearn_clause: could not find occurrence");
    }

    {
        let i = alloc.clause(cref).back_clauses as usize;
        debug_assert!(db.learned[i] == cref);
        let last_idx = db.learned.len() - 1;
        let last = db.learned[last_idx];
        db.learned.truncate(last_idx);
        if last != cref {
            db.learned[i] = last;
            alloc.clause_mut(last).back_clauses = i as LitIdx;
        }
        alloc.clause_mut(cref).back_clauses = NO_REF;
    }

    if let UnitState::At(i) = alloc.clause(cref).unit_state {
        let i = i as usize;
        debug_assert!(db.unit_learned[i] == cref);
        let last_idx = db.unit_learned.len() - 1;
        let last = db.unit_learned[last_idx];
        db.unit_learned.truncate(last_idx);
        if last != cref {
            db.unit_learned[i] = last;
            alloc.clause_mut(last).unit_state = UnitState::At(i as LitIdx);
        }
    }

    alloc.free(cref);
}

/// Restart the working reason from a conflict clause.
fn init_wr_from(
    mut ctx: partial!(Context, mut WorkingReasonP, ClauseAllocP),
    cref: ClauseRef,
) {
    let (wr, ctx) = ctx.split_part_mut(WorkingReasonP);
    let alloc = ctx.part(ClauseAllocP);
    wr.init(&alloc.clause(cref).lits);
}

/// Resolve a reason clause into the working reason, eliminating the pivot.
fn resolve_wr(
    mut ctx: partial!(Context, mut WorkingReasonP, ClauseAllocP),
    reason: ClauseRef,
    pivot: Var,
) {
    let (wr, ctx) = ctx.split_part_mut(WorkingReasonP);
    let alloc = ctx.part(ClauseAllocP);
    wr.resolve(&alloc.clause(reason).lits, pivot);
}

/// Emit the running-trace line for contradictions when it is due.
fn trace_conflict(mut ctx: partial!(Context, mut StatsP, SolverConfigP, TrailP)) {
    let interval = ctx.part(SolverConfigP).run_trace;
    if interval == 0 {
        return;
    }
    let level = ctx.part(TrailP).level;
    let stats = ctx.part_mut(StatsP);
    if stats.conflicts >= stats.trace_conflicts_due {
        stats.trace_conflicts_due = stats.conflicts + interval;
        log::info!(
            "trace: {} contradictions, {} nodes, level {}",
            stats.conflicts,
            stats.nodes,
            level
        );
    }
}

#[cfg(test)]
mod tests {
    use partial_ref::IntoPartialRefMut;

    use occsat_formula::{lits, Var};

    use crate::context::Context;
    use crate::prop::{bcp, extend_prop};
    use crate::test_setup::load_and_finalize;

    use super::*;

    #[test]
    fn chrono_bt_flips_the_last_split() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(ctx.borrow(), &[&lits![1, 2][..], &lits![1, -2][..]]);

        let v1 = Var::from_dimacs(1);
        ctx.part_mut(TrailP).level = 1;
        assert!(extend_prop(ctx.borrow(), v1, false, AssignMode::LeftSplit).is_ok());
        assert!(bcp(ctx.borrow()).is_err());

        let decision = chrono_bt(ctx.borrow()).unwrap();
        assert_eq!(decision.var, v1);
        assert_eq!(decision.value, true);
        assert_eq!(decision.mode, AssignMode::RightSplit);
        assert!(ctx.part(TrailP).stack.is_empty());
    }

    #[test]
    fn chrono_bt_exhausts_on_unit_only_trail() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(ctx.borrow(), &[&lits![1][..], &lits![-1][..]]);

        assert!(bcp(ctx.borrow()).is_err());
        assert!(chrono_bt(ctx.borrow()).is_none());
    }

    #[test]
    fn backjump_skips_splits_outside_the_reason() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        ctx.part_mut(SolverConfigP).learning = false;

        load_and_finalize(
            ctx.borrow(),
            &[
                &lits![-1, -3, 4][..],
                &lits![-1, -3, -4][..],
                &lits![-1, -5, 3][..],
                &lits![-1, 5, 3][..],
                &lits![2, 9][..],
            ],
        );

        let v1 = Var::from_dimacs(1);
        let v2 = Var::from_dimacs(2);
        let v3 = Var::from_dimacs(3);

        ctx.part_mut(TrailP).level = 1;
        assert!(extend_prop(ctx.borrow(), v1, true, AssignMode::LeftSplit).is_ok());
        assert!(bcp(ctx.borrow()).is_ok());
        ctx.part_mut(TrailP).level = 2;
        assert!(extend_prop(ctx.borrow(), v2, true, AssignMode::LeftSplit).is_ok());
        assert!(bcp(ctx.borrow()).is_ok());
        ctx.part_mut(TrailP).level = 3;
        assert!(extend_prop(ctx.borrow(), v3, true, AssignMode::LeftSplit).is_ok());
        let conflict = bcp(ctx.borrow()).unwrap_err();

        // First conflict: flip 3 itself, with a synthesized reason.
        let decision = backjump(ctx.borrow(), conflict).unwrap().unwrap();
        assert_eq!(decision.var, v3);
        assert_eq!(decision.value, false);
        assert_eq!(decision.mode, AssignMode::RightSplit);

        // Extending the flip makes the clauses over 5 clash.
        assert!(extend_prop(ctx.borrow(), decision.var, decision.value, decision.mode).is_ok());
        let conflict = bcp(ctx.borrow()).unwrap_err();

        // Second conflict: the split over 2 is not in the reason and is skipped; 1 flips.
        let decision = backjump(ctx.borrow(), conflict).unwrap().unwrap();
        assert_eq!(decision.var, v1);
        assert_eq!(decision.value, false);
        assert_eq!(decision.mode, AssignMode::RightSplit);
        assert_eq!(ctx.part(StatsP).skipped, 1);
        assert_eq!(ctx.part(PropsP).value(v2), None);
        assert_eq!(ctx.part(TrailP).level, 1);
    }

    #[test]
    fn learn_and_unlearn_roundtrip() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(ctx.borrow(), &[&lits![1, 2, 3][..]]);

        let cref = {
            let mut bctx: partial!(Context, mut ClauseAllocP) = ctx.borrow();
            let alloc = bctx.part_mut(ClauseAllocP);
            alloc.alloc_with(lits![1, -2].to_vec())
        };
        learn_clause(ctx.borrow(), cref);

        {
            let props = ctx.part(PropsP);
            let p1 = props.prop(Var::from_dimacs(1));
            assert_eq!(p1.pos_occs.len(), p1.pos_orig + 1);
            assert_eq!(ctx.part(ClauseDbP).learned.len(), 1);
        }

        {
            let mut bctx: partial!(Context, mut PropsP, mut ClauseAllocP, mut ClauseDbP) =
                ctx.borrow();
            let (props, mut bctx) = bctx.split_part_mut(PropsP);
            let (alloc, mut bctx) = bctx.split_part_mut(ClauseAllocP);
            let db = bctx.part_mut(ClauseDbP);
            unlearn_clause(props, db, alloc, cref);
        }

        let props = ctx.part(PropsP);
        let p1 = props.prop(Var::from_dimacs(1));
        assert_eq!(p1.pos_occs.len(), p1.pos_orig);
        assert!(ctx.part(ClauseDbP).learned.is_empty());
    }
}
