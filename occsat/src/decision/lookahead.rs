//! Side-effect-free unit propagation lookahead.
//!
//! The BCP based heuristics extend a proposition, propagate through a scratch unit queue while
//! recording every touched clause, and undo everything afterwards. Only open-literal counts and
//! valuations are touched: subsumers, the non-Horn index and the open-clause counters stay as
//! they are, so undoing is a matter of incrementing the recorded clauses and clearing the
//! recorded propositions. When the lookahead runs into a conflict, the working reason is used to
//! synthesize a reason clause for the resulting failed literal.
use partial_ref::{partial, PartialRef};

use occsat_formula::Var;

use crate::analyze_conflict::{make_reason_from_wr, WorkingReason};
use crate::clause::{ClauseAlloc, ClauseRef};
use crate::context::{ClauseAllocP, Context, HeurStateP, PropsP, SolverConfigP, WorkingReasonP};
use crate::props::Props;

use super::HeurState;

/// Weight of occurrences in binary clauses in the Satz scoring.
const SATZ_WEIGHT: i64 = 5;

/// What the lookahead counts while propagating.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProbeScoring {
    /// Nothing, only the touched-clause count matters.
    Plain,
    /// Unit propagations.
    Units,
    /// Unit propagations and clauses that became binary.
    Unitie,
}

/// Outcome of a lookahead probe.
#[derive(Default, Copy, Clone, Debug)]
pub struct Probe {
    /// Whether the probed assignment is a failed literal.
    pub failed: bool,
    /// Number of unit propagations performed.
    pub units: i64,
    /// Number of clauses that became binary.
    pub bins: i64,
    /// Number of clause shrinks performed (only valid on success).
    pub touched: i64,
}

/// Probe one assignment: extend, propagate, undo.
///
/// On failure (the assignment conflicts) a reason clause is synthesized from the working reason
/// and stored as the probed proposition's reason, so the caller can propagate the opposite
/// assignment as a failed literal. With `relsat_marking` the undo pass records the assignment
/// marks of the Relsat score caches.
pub fn probe(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut HeurStateP,
        mut PropsP,
        mut WorkingReasonP,
        SolverConfigP,
    ),
    var: Var,
    value: bool,
    scoring: ProbeScoring,
    relsat_marking: bool,
) -> Probe {
    let backjumping = ctx.part(SolverConfigP).backjumping;

    let (props, mut ctx) = ctx.split_part_mut(PropsP);
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let (heur, mut ctx) = ctx.split_part_mut(HeurStateP);
    let (wr, _ctx) = ctx.split_part_mut(WorkingReasonP);

    let mut out = Probe::default();
    heur.managed_cls.clear();
    heur.changed_props.clear();
    heur.lean_queue.clear();

    let mut conflict = lean_extend(props, alloc, heur, var, value, scoring, &mut out);
    let mut culprit = None;
    if conflict.is_none() {
        let (found, q) = lean_bcp(props, alloc, heur, scoring, backjumping, &mut out);
        conflict = found;
        culprit = q;
    }

    match conflict {
        None => {
            out.touched = heur.managed_cls.len() as i64;
            reset_plain(props, alloc, heur, relsat_marking);
        }
        Some(conflict) => {
            out.failed = true;
            finish_failure(props, alloc, heur, wr, conflict, culprit, var, backjumping);
        }
    }

    out
}

/// Probe one assignment for Satz, scoring by a modified Jeroslow-Wang weight applied to the
/// clauses that the propagation made binary. Returns `None` for a failed literal.
pub fn probe_satz_weight(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut HeurStateP,
        mut PropsP,
        mut WorkingReasonP,
        SolverConfigP,
    ),
    var: Var,
    value: bool,
) -> Option<i64> {
    let backjumping = ctx.part(SolverConfigP).backjumping;

    let (props, mut ctx) = ctx.split_part_mut(PropsP);
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let (heur, mut ctx) = ctx.split_part_mut(HeurStateP);
    let (wr, _ctx) = ctx.split_part_mut(WorkingReasonP);

    let mut out = Probe::default();
    heur.managed_cls.clear();
    heur.changed_props.clear();
    heur.lean_queue.clear();

    let mut conflict = lean_extend(props, alloc, heur, var, value, ProbeScoring::Plain, &mut out);
    let mut culprit = None;
    if conflict.is_none() {
        let (found, q) = lean_bcp(props, alloc, heur, ProbeScoring::Plain, backjumping, &mut out);
        conflict = found;
        culprit = q;
    }

    match conflict {
        None => {
            let mut score: i64 = 0;
            for &cref in heur.managed_cls.iter() {
                if alloc.clause(cref).open_lits != 2 {
                    continue;
                }
                for &lit in alloc.clause(cref).lits.iter() {
                    if props.store[lit.index()].value.is_some() {
                        continue;
                    }
                    score += if lit.is_positive() {
                        heur.neg_len2[lit.index()] * SATZ_WEIGHT + heur.neg_len3[lit.index()]
                    } else {
                        heur.pos_len2[lit.index()] * SATZ_WEIGHT + heur.pos_len3[lit.index()]
                    };
                }
            }
            reset_plain(props, alloc, heur, false);
            Some(score)
        }
        Some(conflict) => {
            finish_failure(props, alloc, heur, wr, conflict, culprit, var, backjumping);
            None
        }
    }
}

/// Lean extension: set the value and shrink the falsified-side clauses, queueing new units.
///
/// Original occurrences are skipped when closed; learned occurrences are always resolved. On a
/// conflict the walk stops immediately, the managed-clause record keeps the undo in balance.
fn lean_extend(
    props: &mut Props,
    alloc: &mut ClauseAlloc,
    heur: &mut HeurState,
    var: Var,
    value: bool,
    scoring: ProbeScoring,
    out: &mut Probe,
) -> Option<ClauseRef> {
    heur.changed_props.push(var);
    props.store[var.index()].value = Some(value);

    let (orig, total) = {
        let p = &props.store[var.index()];
        if value {
            (p.neg_orig, p.neg_occs.len())
        } else {
            (p.pos_orig, p.pos_occs.len())
        }
    };

    for idx in 0..total {
        let cref = {
            let p = &props.store[var.index()];
            if value {
                p.neg_occs[idx]
            } else {
                p.pos_occs[idx]
            }
        };
        if idx < orig && !alloc.clause(cref).is_open() {
            continue;
        }
        heur.managed_cls.push(cref);
        let open_now = {
            let cl = alloc.clause_mut(cref);
            cl.open_lits -= 1;
            cl.open_lits
        };
        if scoring == ProbeScoring::Unitie && open_now == 2 {
            out.bins += 1;
        }
        if open_now == 1 {
            heur.lean_queue.push(cref);
        } else if open_now == 0 {
            return Some(cref);
        }
    }

    None
}

/// Lean unit propagation over the scratch queue.
///
/// Returns the conflict clause and the proposition whose propagation found it, if any.
fn lean_bcp(
    props: &mut Props,
    alloc: &mut ClauseAlloc,
    heur: &mut HeurState,
    scoring: ProbeScoring,
    store_reasons: bool,
    out: &mut Probe,
) -> (Option<ClauseRef>, Option<Var>) {
    while let Some(cref) = heur.lean_queue.pop() {
        let unit_lit = alloc
            .clause(cref)
            .lits
            .iter()
            .copied()
            .find(|&lit| props.store[lit.index()].value.is_none());
        let lit = match unit_lit {
            None => continue,
            Some(lit) => lit,
        };
        let q = lit.var();

        if store_reasons {
            props.store[q.index()].reason = Some(cref);
        }
        if scoring != ProbeScoring::Plain {
            out.units += 1;
        }

        if let Some(conflict) =
            lean_extend(props, alloc, heur, q, lit.is_positive(), scoring, out)
        {
            return (Some(conflict), Some(q));
        }
    }
    (None, None)
}

/// Undo a successful probe.
fn reset_plain(
    props: &mut Props,
    alloc: &mut ClauseAlloc,
    heur: &mut HeurState,
    relsat_marking: bool,
) {
    while let Some(cref) = heur.managed_cls.pop() {
        alloc.clause_mut(cref).open_lits += 1;
    }
    while let Some(q) = heur.changed_props.pop() {
        if relsat_marking {
            if props.store[q.index()].value == Some(true) {
                heur.score_neg[q.index()] = -1;
            } else {
                heur.score_pos[q.index()] = -1;
            }
        }
        props.store[q.index()].value = None;
    }
    heur.lean_queue.clear();
}

/// Undo a failed probe, resolving the working reason along the way and leaving a synthesized
/// reason clause on the probed proposition.
fn finish_failure(
    props: &mut Props,
    alloc: &mut ClauseAlloc,
    heur: &mut HeurState,
    wr: &mut WorkingReason,
    conflict: ClauseRef,
    culprit: Option<Var>,
    var: Var,
    backjumping: bool,
) {
    if !backjumping {
        reset_plain(props, alloc, heur, false);
        return;
    }

    wr.init(&alloc.clause(conflict).lits);
    if let Some(q) = culprit {
        if let Some(reason) = props.store[q.index()].reason {
            wr.resolve(&alloc.clause(reason).lits, q);
        }
    }

    // Undo in reverse, resolving each propagated proposition's reason into the working reason.
    // The first recorded proposition is the probed one itself and is only unassigned.
    while let Some(cref) = heur.managed_cls.pop() {
        alloc.clause_mut(cref).open_lits += 1;
    }
    while heur.changed_props.len() > 1 {
        let q = heur.changed_props[heur.changed_props.len() - 1];
        if let Some(reason) = props.store[q.index()].reason {
            wr.resolve(&alloc.clause(reason).lits, q);
        }
        props.store[q.index()].value = None;
        heur.changed_props.pop();
    }
    if let Some(first) = heur.changed_props.pop() {
        props.store[first.index()].value = None;
    }
    heur.lean_queue.clear();

    let reason = make_reason_from_wr(wr, alloc);
    props.store[var.index()].reason = Some(reason);
}

#[cfg(test)]
mod tests {
    use partial_ref::IntoPartialRefMut;

    use occsat_formula::lits;

    use crate::context::{ClauseAllocP, ClauseDbP, Context, PropsP};
    use crate::test_setup::load_and_finalize;

    use super::*;

    #[test]
    fn successful_probe_leaves_no_trace() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(
            ctx.borrow(),
            &[&lits![1, 2, 3][..], &lits![-1, 2][..], &lits![-2, 3, 4][..]],
        );

        let out = probe(
            ctx.borrow(),
            Var::from_dimacs(1),
            true,
            ProbeScoring::Units,
            false,
        );

        assert!(!out.failed);
        assert_eq!(out.units, 1); // -1 2 becomes unit and propagates 2

        let props = ctx.part(PropsP);
        for &var in props.order.iter() {
            assert_eq!(props.value(var), None);
        }
        let alloc = ctx.part(ClauseAllocP);
        for &cref in ctx.part(ClauseDbP).clauses.iter() {
            let cl = alloc.clause(cref);
            assert_eq!(cl.open_lits as usize, cl.lits.len());
        }
    }

    #[test]
    fn failed_probe_synthesizes_a_reason() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        // Probing 1 = true propagates 2 and 3 into a clash.
        load_and_finalize(
            ctx.borrow(),
            &[&lits![-1, 2][..], &lits![-1, 3][..], &lits![-2, -3][..]],
        );

        let var = Var::from_dimacs(1);
        let out = probe(ctx.borrow(), var, true, ProbeScoring::Plain, false);

        assert!(out.failed);

        // Everything is undone and the probed proposition carries a reason clause.
        let props = ctx.part(PropsP);
        for &v in props.order.iter() {
            assert_eq!(props.value(v), None);
        }
        let reason = props.prop(var).reason.expect("reason for failed literal");
        let alloc = ctx.part(ClauseAllocP);
        assert!(alloc
            .clause(reason)
            .lits
            .iter()
            .any(|lit| lit.var() == var));
    }
}
