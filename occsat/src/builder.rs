//! Incremental clause assembly.
//!
//! Clauses are built one at a time: `new_clause` opens a pending clause, `add_lit` appends
//! literals (creating propositions on demand and recording occurrences), `commit_clause` moves
//! the pending clause into the database. Tautologies destroy the pending clause and rewind the
//! occurrences already recorded; duplicated literals are dropped silently; committing a clause
//! with no literals is a no-op. Once everything is committed, `finalize` freezes the
//! original/learned occurrence split, prunes occurrence-free propositions and seeds the MLF
//! queue.
use partial_ref::{partial, PartialRef};

use thiserror::Error;

use crate::clause::db::link_non_horn;
use crate::clause::{ClauseAlloc, ClauseDb, ClauseRef};
use crate::context::{
    BcpQueueP, ClauseAllocP, ClauseDbP, Context, HeurStateP, MlfQueueP, PropsP, SolverConfigP,
    TimersP, WorkingReasonP,
};
use crate::lit::{LitIdx, Var};
use crate::props::{AssignMode, Props};

/// What became of an added literal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AddLit {
    /// The literal was appended to the pending clause.
    Added,
    /// The literal duplicates one already present and was dropped.
    Duplicate,
    /// The literal's negation was already present; the pending clause was destroyed.
    Tautology,
}

/// Misuse of the clause builder.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("there is already a pending clause")]
    AlreadyPending,
    #[error("there is no pending clause")]
    NoPendingClause,
    #[error("pending clause id mismatch")]
    ClauseMismatch,
    #[error("invalid literal {0}")]
    InvalidLiteral(isize),
}

/// Open a new (empty) pending clause and return its id.
pub fn new_clause(
    mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP),
) -> Result<usize, BuildError> {
    if ctx.part(ClauseDbP).pending.is_some() {
        return Err(BuildError::AlreadyPending);
    }
    let id = ctx.part(ClauseDbP).clauses.len();
    let cref = ctx.part_mut(ClauseAllocP).alloc();
    ctx.part_mut(ClauseAllocP).clause_mut(cref).back_clauses = id as LitIdx;
    ctx.part_mut(ClauseDbP).pending = Some(cref);
    Ok(id)
}

/// Append a signed DIMACS literal to the pending clause.
pub fn add_lit(
    mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP, mut PropsP),
    cl_id: usize,
    lit: isize,
) -> Result<AddLit, BuildError> {
    let cref = match ctx.part(ClauseDbP).pending {
        Some(cref) => cref,
        None => return Err(BuildError::NoPendingClause),
    };
    if ctx.part(ClauseAllocP).clause(cref).back_clauses as usize != cl_id {
        return Err(BuildError::ClauseMismatch);
    }
    if lit == 0 || lit == isize::min_value() {
        return Err(BuildError::InvalidLiteral(lit));
    }
    let magnitude = lit.abs() as usize;
    if magnitude > ctx.part(PropsP).store.len() {
        return Err(BuildError::InvalidLiteral(lit));
    }
    let var = Var::from_dimacs(lit.abs());
    let positive = lit > 0;

    let (props, mut ctx) = ctx.split_part_mut(PropsP);
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let db = ctx.part_mut(ClauseDbP);

    // A proposition whose latest occurrence is the pending clause was already added to it.
    enum Seen {
        No,
        Duplicate,
        Tautology,
    }
    let seen = if props.is_present(var) {
        let p = &props.store[var.index()];
        if p.pos_occs.last() == Some(&cref) {
            if positive {
                Seen::Duplicate
            } else {
                Seen::Tautology
            }
        } else if p.neg_occs.last() == Some(&cref) {
            if !positive {
                Seen::Duplicate
            } else {
                Seen::Tautology
            }
        } else {
            Seen::No
        }
    } else {
        Seen::No
    };

    match seen {
        Seen::Duplicate => return Ok(AddLit::Duplicate),
        Seen::Tautology => {
            rewind_tautology(props, alloc, db, cref);
            return Ok(AddLit::Tautology);
        }
        Seen::No => {}
    }

    props.insert(var);
    if positive {
        props.store[var.index()].pos_occs.push(cref);
        alloc.clause_mut(cref).pos_lits += 1;
    } else {
        props.store[var.index()].neg_occs.push(cref);
    }
    alloc.push_lit(cref, var.lit(positive));
    alloc.clause_mut(cref).open_lits += 1;

    Ok(AddLit::Added)
}

/// Destroy the pending clause, rewinding the occurrences it already recorded.
fn rewind_tautology(props: &mut Props, alloc: &mut ClauseAlloc, db: &mut ClauseDb, cref: ClauseRef) {
    for k in 0..alloc.clause(cref).lits.len() {
        let lit = alloc.clause(cref).lits[k];
        let now_unused = {
            let p = &mut props.store[lit.index()];
            if lit.is_positive() {
                p.pos_occs.pop();
            } else {
                p.neg_occs.pop();
            }
            p.pos_occs.is_empty() && p.neg_occs.is_empty()
        };
        if now_unused {
            props.remove(lit.var());
        }
    }
    db.pending = None;
    alloc.free(cref);
}

/// Commit the pending clause.
///
/// A clause that ended up with no literals is discarded silently and `None` is returned. A unit
/// clause is queued for propagation; under horn relaxation a non-Horn clause enters the non-Horn
/// index.
pub fn commit_clause(
    mut ctx: partial!(
        Context,
        mut BcpQueueP,
        mut ClauseAllocP,
        mut ClauseDbP,
        SolverConfigP,
    ),
    cl_id: usize,
) -> Result<Option<usize>, BuildError> {
    let cref = match ctx.part(ClauseDbP).pending {
        Some(cref) => cref,
        None => return Err(BuildError::NoPendingClause),
    };
    if ctx.part(ClauseAllocP).clause(cref).back_clauses as usize != cl_id {
        return Err(BuildError::ClauseMismatch);
    }

    if ctx.part(ClauseAllocP).clause(cref).open_lits == 0 {
        ctx.part_mut(ClauseDbP).pending = None;
        ctx.part_mut(ClauseAllocP).free(cref);
        return Ok(None);
    }

    let horn = ctx.part(SolverConfigP).horn_relaxation;

    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);

    db.clauses.push(cref);
    db.pending = None;

    if alloc.clause(cref).open_lits == 1 {
        ctx.part_mut(BcpQueueP).stack.push(cref);
    }
    if horn && alloc.clause(cref).pos_lits > 1 {
        link_non_horn(db, alloc, cref);
    }

    Ok(Some(cl_id))
}

/// Declare a proposition independent (a model proposition of the host).
///
/// Out-of-range ids are ignored, like unknown ids in the original interface.
pub fn make_indep(mut ctx: partial!(Context, mut PropsP), prop: isize) {
    let props = ctx.part_mut(PropsP);
    if prop > 0 && (prop as usize) <= props.store.len() {
        props.make_model(Var::from_dimacs(prop));
    }
}

/// Final build step before the search.
///
/// Freezes the clause counters, drops propositions with no remaining occurrences (also removing
/// them from the model index), records the original occurrence split of every surviving
/// proposition, scans for initial pure literals and performs per-heuristic setup.
pub fn finalize(
    mut ctx: partial!(
        Context,
        mut ClauseDbP,
        mut HeurStateP,
        mut MlfQueueP,
        mut PropsP,
        mut TimersP,
        mut WorkingReasonP,
        SolverConfigP,
    ),
) {
    if ctx.part(ClauseDbP).finalized {
        return;
    }
    ctx.part_mut(TimersP).build.start();

    {
        let db = ctx.part_mut(ClauseDbP);
        db.finalized = true;
        db.clause_count = db.clauses.len();
        db.open_clauses = db.clause_count;
        db.nh_count = db.nh_clauses.len();
        db.open_nh = db.nh_count;
    }

    let pure = ctx.part(SolverConfigP).pure_literal;
    {
        let mut bctx: partial!(Context, mut PropsP, mut MlfQueueP) = ctx.borrow();
        let (props, mut bctx) = bctx.split_part_mut(PropsP);
        let mlf = bctx.part_mut(MlfQueueP);

        // Reverse iteration so swap-with-last removal only moves already visited entries.
        let mut i = props.order.len();
        while i > 0 {
            i -= 1;
            let var = props.order[i];
            let unused = {
                let p = &props.store[var.index()];
                p.pos_occs.is_empty() && p.neg_occs.is_empty()
            };
            if unused {
                props.remove(var);
                continue;
            }
            let p = &mut props.store[var.index()];
            p.pos_orig = p.pos_occs.len();
            p.neg_orig = p.neg_occs.len();
            if pure {
                if p.pos_occs.is_empty() {
                    p.mode = AssignMode::PureNeg;
                    mlf.stack.push(var);
                } else if p.neg_occs.is_empty() {
                    p.mode = AssignMode::PurePos;
                    mlf.stack.push(var);
                }
            }
        }
    }

    let var_count = ctx.part(PropsP).store.len();
    ctx.part_mut(WorkingReasonP).set_var_count(var_count);

    {
        let heuristic = ctx.part(SolverConfigP).heuristic;
        let mut bctx: partial!(Context, mut HeurStateP, ClauseDbP) = ctx.borrow();
        let (heur, bctx) = bctx.split_part_mut(HeurStateP);
        let db = bctx.part(ClauseDbP);
        heur.init(heuristic, var_count, db.clause_count, db.nh_count);
    }

    ctx.part_mut(TimersP).build.stop();
}

#[cfg(test)]
mod tests {
    use partial_ref::IntoPartialRefMut;

    use crate::context::{BcpQueueP, ClauseDbP, Context, PropsP};

    use super::*;

    fn fresh() -> Box<Context> {
        let mut ctx = Box::new(Context::default());
        {
            let mut ctx = ctx.into_partial_ref_mut();
            let max_var = ctx.part(SolverConfigP).max_var_num;
            ctx.part_mut(PropsP).init(max_var);
        }
        ctx
    }

    #[test]
    fn tautology_destroys_pending_clause() {
        let mut ctx = fresh();
        let mut ctx = ctx.into_partial_ref_mut();

        let id = new_clause(ctx.borrow()).unwrap();
        assert_eq!(add_lit(ctx.borrow(), id, 5).unwrap(), AddLit::Added);
        assert_eq!(add_lit(ctx.borrow(), id, -5).unwrap(), AddLit::Tautology);

        assert!(ctx.part(ClauseDbP).pending.is_none());
        assert!(!ctx.part(PropsP).is_present(Var::from_dimacs(5)));

        // A subsequent new clause succeeds.
        let id = new_clause(ctx.borrow()).unwrap();
        assert_eq!(add_lit(ctx.borrow(), id, 5).unwrap(), AddLit::Added);
        assert_eq!(commit_clause(ctx.borrow(), id).unwrap(), Some(id));
    }

    #[test]
    fn duplicates_are_dropped_silently() {
        let mut ctx = fresh();
        let mut ctx = ctx.into_partial_ref_mut();

        let id = new_clause(ctx.borrow()).unwrap();
        assert_eq!(add_lit(ctx.borrow(), id, 5).unwrap(), AddLit::Added);
        assert_eq!(add_lit(ctx.borrow(), id, 5).unwrap(), AddLit::Duplicate);
        assert_eq!(add_lit(ctx.borrow(), id, -6).unwrap(), AddLit::Added);
        assert_eq!(add_lit(ctx.borrow(), id, -6).unwrap(), AddLit::Duplicate);
        commit_clause(ctx.borrow(), id).unwrap();

        let alloc = ctx.part(crate::context::ClauseAllocP);
        let db = ctx.part(ClauseDbP);
        assert_eq!(alloc.clause(db.clauses[0]).lits.len(), 2);
    }

    #[test]
    fn empty_commit_is_a_no_op() {
        let mut ctx = fresh();
        let mut ctx = ctx.into_partial_ref_mut();

        let id = new_clause(ctx.borrow()).unwrap();
        assert_eq!(commit_clause(ctx.borrow(), id).unwrap(), None);
        assert!(ctx.part(ClauseDbP).clauses.is_empty());
        assert!(ctx.part(ClauseDbP).pending.is_none());
    }

    #[test]
    fn two_pending_clauses_are_rejected() {
        let mut ctx = fresh();
        let mut ctx = ctx.into_partial_ref_mut();

        let _id = new_clause(ctx.borrow()).unwrap();
        assert!(matches!(
            new_clause(ctx.borrow()),
            Err(BuildError::AlreadyPending)
        ));
    }

    #[test]
    fn out_of_range_literals_are_rejected() {
        let mut ctx = fresh();
        let mut ctx = ctx.into_partial_ref_mut();

        let id = new_clause(ctx.borrow()).unwrap();
        assert!(matches!(
            add_lit(ctx.borrow(), id, 0),
            Err(BuildError::InvalidLiteral(0))
        ));
        assert!(matches!(
            add_lit(ctx.borrow(), id, 101),
            Err(BuildError::InvalidLiteral(_))
        ));
        assert!(matches!(
            add_lit(ctx.borrow(), id + 1, 1),
            Err(BuildError::ClauseMismatch)
        ));
    }

    #[test]
    fn unit_clauses_are_queued_on_commit() {
        let mut ctx = fresh();
        let mut ctx = ctx.into_partial_ref_mut();

        let id = new_clause(ctx.borrow()).unwrap();
        add_lit(ctx.borrow(), id, -3).unwrap();
        commit_clause(ctx.borrow(), id).unwrap();

        assert_eq!(ctx.part(BcpQueueP).stack.len(), 1);
    }

    #[test]
    fn finalize_prunes_unused_propositions() {
        let mut ctx = fresh();
        let mut ctx = ctx.into_partial_ref_mut();

        make_indep(ctx.borrow(), 9);

        let id = new_clause(ctx.borrow()).unwrap();
        add_lit(ctx.borrow(), id, 1).unwrap();
        add_lit(ctx.borrow(), id, 2).unwrap();
        commit_clause(ctx.borrow(), id).unwrap();

        finalize(ctx.borrow());

        let props = ctx.part(PropsP);
        assert!(!props.is_present(Var::from_dimacs(9)));
        assert!(props.model_props.is_empty());
        assert_eq!(props.order.len(), 2);
    }
}
