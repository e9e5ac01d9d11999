//! Extending and retracting proposition valuations.
//!
//! Extending walks the satisfied-side occurrence list freezing clauses (setting their subsumer)
//! and the falsified-side list decrementing open-literal counts, queueing new unit clauses and
//! remembering the first clause that runs empty. Retraction is the exact inverse; on the learned
//! suffix it additionally drives relevance-bounded unlearning and the unit-learned stack.
use partial_ref::{partial, PartialRef};

use crate::clause::db::{link_non_horn, push_unit_learned, remove_unit_learned, unlink_non_horn};
use crate::clause::UnitState;
use crate::context::{
    BcpQueueP, ClauseAllocP, ClauseDbP, Context, PropsP, SolverConfigP, StatsP, TrailP,
};
use crate::lit::{LitIdx, Var, NO_REF};
use crate::lookback::unlearn_clause;
use crate::props::AssignMode;

use super::Conflict;

/// The trail: propositions in assignment order, plus the current decision level.
#[derive(Default)]
pub struct Trail {
    pub stack: Vec<Var>,
    pub level: usize,
}

/// Assign a value to a proposition and propagate it through the occurrence lists.
///
/// Unit clauses created by this assignment are pushed onto the BCP queue. When a clause runs out
/// of open literals it is recorded as the conflict clause and `Err` is returned, but the
/// remaining occurrence arithmetic is still carried out so retraction stays in balance.
pub fn extend_prop(
    mut ctx: partial!(
        Context,
        mut BcpQueueP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut PropsP,
        mut StatsP,
        mut TrailP,
        SolverConfigP,
    ),
    var: Var,
    value: bool,
    mode: AssignMode,
) -> Result<(), Conflict> {
    let level = ctx.part(TrailP).level;
    let horn = ctx.part(SolverConfigP).horn_relaxation;

    {
        let p = ctx.part_mut(PropsP).prop_mut(var);
        debug_assert!(
            p.value.is_none(),
            "extend_prop: attempt to reassign proposition"
        );
        p.value = Some(value);
        p.mode = mode;
        p.level = level;
    }
    ctx.part_mut(TrailP).stack.push(var);

    let (props, mut ctx) = ctx.split_part_mut(PropsP);
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
    let (bcp_queue, mut ctx) = ctx.split_part_mut(BcpQueueP);
    let stats = ctx.part_mut(StatsP);

    let mut conflict = None;

    let p = &props.store[var.index()];
    let (sat_occs, sat_orig, fals_occs, fals_orig) = if value {
        (&p.pos_occs, p.pos_orig, &p.neg_occs, p.neg_orig)
    } else {
        (&p.neg_occs, p.neg_orig, &p.pos_occs, p.pos_orig)
    };

    // Unit subsumptions (original occurrences).
    for &cref in &sat_occs[..sat_orig] {
        let cl = alloc.clause_mut(cref);
        if cl.is_open() {
            cl.subsumer = Some(var);
            db.open_clauses -= 1;
            if horn && cl.pos_lits > 1 {
                db.open_nh -= 1;
            }
        }
    }

    // Unit resolutions (original occurrences).
    for &cref in &fals_occs[..fals_orig] {
        if !alloc.clause(cref).is_open() {
            continue;
        }
        let open_now = {
            let cl = alloc.clause_mut(cref);
            cl.open_lits -= 1;
            cl.open_lits
        };
        if conflict.is_none() {
            if open_now == 1 {
                bcp_queue.stack.push(cref);
            } else if open_now == 0 {
                conflict = Some(cref);
                stats.conflicts += 1;
            }
        }
        if horn && !value {
            // The clause loses a positive literal; unlink it when it becomes Horn.
            if alloc.clause(cref).pos_lits == 2 {
                unlink_non_horn(db, alloc, cref);
                db.open_nh -= 1;
            }
            alloc.clause_mut(cref).pos_lits -= 1;
        }
    }

    // Unit resolutions (learned occurrences). Learned clauses are always open and never
    // subsumed; they are only resolved.
    for idx in fals_orig..fals_occs.len() {
        let cref = fals_occs[idx];
        let open_now = {
            let cl = alloc.clause_mut(cref);
            cl.open_lits -= 1;
            cl.open_lits
        };
        if conflict.is_none() {
            if open_now == 1 {
                bcp_queue.stack.push(cref);
            } else if open_now == 0 {
                conflict = Some(cref);
                stats.conflicts += 1;
                stats.clashes += 1;
            }
        }
    }

    match conflict {
        Some(cref) => Err(Conflict { clause: cref }),
        None => Ok(()),
    }
}

/// Undo the effects of [`extend_prop`] for a single proposition.
///
/// Synthesized reason clauses of right splits and failed literals are released here; reasons that
/// were learned belong to the learned database and are released by unlearning instead. On the
/// learned suffix, clauses whose open count climbs above the learn order are unlearned
/// (relevance-bounded learning) and the unit-learned stack is maintained.
pub fn retract_prop(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut PropsP,
        SolverConfigP,
    ),
    var: Var,
) {
    let horn = ctx.part(SolverConfigP).horn_relaxation;
    let learn_order = ctx.part(SolverConfigP).learn_order as LitIdx;

    let (props, mut ctx) = ctx.split_part_mut(PropsP);
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let db = ctx.part_mut(ClauseDbP);

    let (value, mode) = {
        let p = &props.store[var.index()];
        (p.value, p.mode)
    };
    debug_assert!(
        value.is_some(),
        "retract_prop: attempt to retract an unassigned proposition"
    );
    let value = match value {
        Some(value) => value,
        None => return,
    };

    if mode.owns_reason() {
        if let Some(reason) = props.store[var.index()].reason.take() {
            let owned = {
                let rcl = alloc.clause(reason);
                rcl.back_clauses == NO_REF && !rcl.is_learned()
            };
            if owned {
                alloc.free(reason);
            }
        }
    }

    props.store[var.index()].value = None;

    let (sat_orig, fals_orig) = {
        let p = &props.store[var.index()];
        if value {
            (p.pos_orig, p.neg_orig)
        } else {
            (p.neg_orig, p.pos_orig)
        }
    };

    // Retract unit subsumptions (original occurrences).
    for idx in 0..sat_orig {
        let cref = {
            let p = &props.store[var.index()];
            if value {
                p.pos_occs[idx]
            } else {
                p.neg_occs[idx]
            }
        };
        let cl = alloc.clause_mut(cref);
        if cl.subsumer == Some(var) {
            cl.subsumer = None;
            db.open_clauses += 1;
            if horn && cl.pos_lits > 1 {
                db.open_nh += 1;
            }
        }
    }

    // Retract unit resolutions (original occurrences).
    for idx in 0..fals_orig {
        let cref = {
            let p = &props.store[var.index()];
            if value {
                p.neg_occs[idx]
            } else {
                p.pos_occs[idx]
            }
        };
        if !alloc.clause(cref).is_open() {
            continue;
        }
        alloc.clause_mut(cref).open_lits += 1;
        if horn && !value {
            // The clause regains a positive literal; relink it when it becomes non-Horn.
            if alloc.clause(cref).pos_lits == 1 {
                link_non_horn(db, alloc, cref);
                db.open_nh += 1;
            }
            alloc.clause_mut(cref).pos_lits += 1;
        }
    }

    // Retract unit resolutions (learned occurrences). Reverse iteration because unlearning
    // removes entries from the very suffix being walked.
    let mut idx = {
        let p = &props.store[var.index()];
        if value {
            p.neg_occs.len()
        } else {
            p.pos_occs.len()
        }
    };
    loop {
        let len = {
            let p = &props.store[var.index()];
            if value {
                p.neg_occs.len()
            } else {
                p.pos_occs.len()
            }
        };
        if idx > len {
            idx = len;
        }
        if idx <= fals_orig {
            break;
        }
        idx -= 1;
        let cref = {
            let p = &props.store[var.index()];
            if value {
                p.neg_occs[idx]
            } else {
                p.pos_occs[idx]
            }
        };
        let open_now = {
            let cl = alloc.clause_mut(cref);
            cl.open_lits += 1;
            cl.open_lits
        };
        if open_now > learn_order {
            unlearn_clause(props, db, alloc, cref);
        } else if open_now == 1 && alloc.clause(cref).unit_state == UnitState::Allow {
            push_unit_learned(db, alloc, cref);
        } else if open_now == 2 && alloc.clause(cref).unit_state != UnitState::Forbid {
            remove_unit_learned(db, alloc, cref, UnitState::Forbid);
        }
    }
}

#[cfg(test)]
mod tests {
    use partial_ref::IntoPartialRefMut;

    use occsat_formula::lits;

    use crate::context::{BcpQueueP, ClauseAllocP, ClauseDbP, Context, PropsP, TrailP};
    use crate::test_setup::load_and_finalize;

    use super::*;

    #[test]
    fn extend_freezes_and_retract_restores() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(
            ctx.borrow(),
            &[&lits![1, 2, 3][..], &lits![-1, 2][..], &lits![-2, -3][..]],
        );

        let snapshot: Vec<_> = {
            let alloc = ctx.part(ClauseAllocP);
            let db = ctx.part(ClauseDbP);
            db.clauses
                .iter()
                .map(|&cref| {
                    let cl = alloc.clause(cref);
                    (cl.open_lits, cl.subsumer)
                })
                .collect()
        };

        let v1 = Var::from_dimacs(1);
        let v2 = Var::from_dimacs(2);

        assert!(extend_prop(ctx.borrow(), v1, true, AssignMode::LeftSplit).is_ok());
        // The second extension empties (-1 2), which reports a conflict.
        assert!(extend_prop(ctx.borrow(), v2, false, AssignMode::LeftSplit).is_err());

        // (1 2 3) is frozen by 1, (-1 2) lost both 1 and 2, (-2 -3) is frozen by -2.
        {
            let alloc = ctx.part(ClauseAllocP);
            let db = ctx.part(ClauseDbP);
            let middle = alloc.clause(db.clauses[1]);
            assert!(middle.is_open());
            assert_eq!(middle.open_lits, 0);
            assert_eq!(db.open_clauses, 1);
        }

        while let Some(var) = ctx.part_mut(TrailP).stack.pop() {
            retract_prop(ctx.borrow(), var);
        }

        let restored: Vec<_> = {
            let alloc = ctx.part(ClauseAllocP);
            let db = ctx.part(ClauseDbP);
            db.clauses
                .iter()
                .map(|&cref| {
                    let cl = alloc.clause(cref);
                    (cl.open_lits, cl.subsumer)
                })
                .collect()
        };

        assert_eq!(snapshot, restored);
        assert_eq!(ctx.part(ClauseDbP).open_clauses, 3);
    }

    #[test]
    fn conflicting_extension_reports_the_empty_clause() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(ctx.borrow(), &[&lits![1, 2][..]]);

        let v1 = Var::from_dimacs(1);
        let v2 = Var::from_dimacs(2);

        assert!(extend_prop(ctx.borrow(), v1, false, AssignMode::LeftSplit).is_ok());
        let conflict = extend_prop(ctx.borrow(), v2, false, AssignMode::LeftSplit);
        assert!(conflict.is_err());

        // The arithmetic must finish so retraction stays in balance.
        while let Some(var) = ctx.part_mut(TrailP).stack.pop() {
            retract_prop(ctx.borrow(), var);
        }
        let alloc = ctx.part(ClauseAllocP);
        let db = ctx.part(ClauseDbP);
        assert_eq!(alloc.clause(db.clauses[0]).open_lits, 2);
    }

    #[test]
    fn builder_state_survives_extend_retract_roundtrip() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(
            ctx.borrow(),
            &[&lits![1, -2, 3][..], &lits![2, 3][..], &lits![-3, 1][..]],
        );

        for &(dimacs, value) in [(1isize, false), (3isize, true)].iter() {
            let var = Var::from_dimacs(dimacs);
            let _ = extend_prop(ctx.borrow(), var, value, AssignMode::LeftSplit);
        }
        while let Some(var) = ctx.part_mut(TrailP).stack.pop() {
            retract_prop(ctx.borrow(), var);
        }

        let props = ctx.part(PropsP);
        for &var in props.order.iter() {
            assert_eq!(props.value(var), None);
        }
        let alloc = ctx.part(ClauseAllocP);
        for &cref in ctx.part(ClauseDbP).clauses.iter() {
            let cl = alloc.clause(cref);
            assert_eq!(cl.open_lits as usize, cl.lits.len());
            assert_eq!(cl.subsumer, None);
        }
    }

    #[test]
    fn unit_commit_reaches_bcp_queue() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(ctx.borrow(), &[&lits![5][..]]);

        assert_eq!(ctx.part(BcpQueueP).stack.len(), 1);
    }
}
