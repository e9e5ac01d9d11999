//! Boolean constraint propagation (unit resolution).
use partial_ref::{partial, PartialRef};

use crate::clause::ClauseRef;
use crate::context::{
    BcpQueueP, ClauseAllocP, ClauseDbP, Context, PropsP, SolverConfigP, StatsP, TrailP,
};
use crate::props::AssignMode;

use super::{extend_prop, Conflict};

/// Clauses that became unit and await propagation.
#[derive(Default)]
pub struct BcpQueue {
    pub stack: Vec<ClauseRef>,
}

/// Propagate unit clauses to fixpoint.
///
/// Keeps propagating until an empty clause is found or no more unit clauses remain. The reason of
/// each propagated proposition is stamped for conflict analysis. On a conflict the queue is left
/// as is; the backtracking component flushes it.
pub fn bcp(
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
) -> Result<(), Conflict> {
    loop {
        let cref = match ctx.part_mut(BcpQueueP).stack.pop() {
            None => return Ok(()),
            Some(cref) => cref,
        };

        // Locate the lone unvalued literal. A learned clause can lose its eligibility when it
        // was already resolved to zero unassigned literals elsewhere; it is skipped then.
        let mut unit_lit = None;
        {
            let alloc = ctx.part(ClauseAllocP);
            let props = ctx.part(PropsP);
            let cl = alloc.clause(cref);
            if cl.is_open() {
                debug_assert!(
                    cl.is_learned() || cl.open_lits == 1,
                    "bcp: more than one open literal"
                );
                unit_lit = cl.lits.iter().copied().find(|&lit| props.lit_unassigned(lit));
                debug_assert!(
                    unit_lit.is_some() || cl.is_learned(),
                    "bcp: cannot find unvalued literal"
                );
            }
        }

        let lit = match unit_lit {
            None => continue,
            Some(lit) => lit,
        };

        let res = extend_prop(ctx.borrow(), lit.var(), lit.is_positive(), AssignMode::Unit);
        ctx.part_mut(PropsP).prop_mut(lit.var()).reason = Some(cref);
        ctx.part_mut(StatsP).units += 1;
        log::trace!("{} has value {} by unit", lit.var(), lit.is_positive());
        res?;
    }
}

#[cfg(test)]
mod tests {
    use partial_ref::IntoPartialRefMut;

    use occsat_formula::{lits, Lit, Var};

    use crate::context::{Context, PropsP, TrailP};
    use crate::test_setup::load_and_finalize;

    use super::*;

    #[test]
    fn propagates_units_to_fixpoint() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(
            ctx.borrow(),
            &[&lits![1][..], &lits![-1, 2][..], &lits![-2, 3][..]],
        );

        assert!(bcp(ctx.borrow()).is_ok());

        let props = ctx.part(PropsP);
        for dimacs in 1..=3 {
            assert_eq!(props.value(Var::from_dimacs(dimacs)), Some(true));
        }
        assert_eq!(ctx.part(TrailP).stack.len(), 3);
    }

    #[test]
    fn reasons_are_stamped() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(ctx.borrow(), &[&lits![-4][..], &lits![4, 7][..]]);

        assert!(bcp(ctx.borrow()).is_ok());

        let props = ctx.part(PropsP);
        assert!(!props.lit_falsified(Lit::from_dimacs(7)));
        assert_eq!(props.value(Var::from_dimacs(7)), Some(true));
        assert!(props.prop(Var::from_dimacs(7)).reason.is_some());
        assert_eq!(
            props.prop(Var::from_dimacs(7)).mode,
            crate::props::AssignMode::Unit
        );
    }

    #[test]
    fn contradicting_units_conflict() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(ctx.borrow(), &[&lits![1][..], &lits![-1][..]]);

        assert!(bcp(ctx.borrow()).is_err());
    }
}
