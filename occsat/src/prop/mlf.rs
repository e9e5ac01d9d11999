//! Monotone literal fixing (pure literal propagation).
use partial_ref::{partial, PartialRef};

use crate::context::{
    BcpQueueP, ClauseAllocP, ClauseDbP, Context, MlfQueueP, PropsP, SolverConfigP, StatsP, TrailP,
};
use crate::lit::Var;
use crate::props::AssignMode;

use super::extend_prop;

/// Propositions tagged pure and awaiting propagation.
#[derive(Default)]
pub struct MlfQueue {
    pub stack: Vec<Var>,
}

/// Propagate all pure literals on the MLF queue.
///
/// A queued proposition that lost its eligibility in the meantime (it was assigned, or its tag
/// was overwritten) is discarded. The queue is flushed once the formula is empty.
pub fn mlf(
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
) {
    if !ctx.part(SolverConfigP).pure_literal {
        ctx.part_mut(MlfQueueP).stack.clear();
        return;
    }

    while !ctx.part(MlfQueueP).stack.is_empty() {
        let formula_empty = {
            let horn = ctx.part(SolverConfigP).horn_relaxation;
            ctx.part(ClauseDbP).formula_is_empty(horn)
        };
        if formula_empty {
            ctx.part_mut(MlfQueueP).stack.clear();
            break;
        }

        let var = match ctx.part_mut(MlfQueueP).stack.pop() {
            None => break,
            Some(var) => var,
        };

        let (assigned, mode) = {
            let p = ctx.part(PropsP).prop(var);
            (p.value.is_some(), p.mode)
        };
        if assigned {
            continue;
        }
        let value = match mode {
            AssignMode::PurePos => true,
            AssignMode::PureNeg => false,
            _ => continue,
        };

        let _ = extend_prop(ctx.borrow(), var, value, mode);
        ctx.part_mut(StatsP).pures += 1;
        log::trace!("{} has value {} by pure literal", var, value);
    }
}

#[cfg(test)]
mod tests {
    use partial_ref::IntoPartialRefMut;

    use occsat_formula::{lits, Var};

    use crate::context::{ClauseDbP, Context, PropsP};
    use crate::test_setup::load_and_finalize;

    use super::*;

    #[test]
    fn initial_pure_literals_are_fixed() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        // 3 only occurs positively, 4 only negatively.
        load_and_finalize(ctx.borrow(), &[&lits![1, 3][..], &lits![-1, 3, -4][..]]);

        mlf(ctx.borrow());

        // 3 closes both clauses; the queue is flushed once the formula is empty, so 4 may
        // stay unassigned.
        let props = ctx.part(PropsP);
        assert_eq!(props.value(Var::from_dimacs(3)), Some(true));
        assert_eq!(props.value(Var::from_dimacs(1)), None);
        assert_eq!(ctx.part(ClauseDbP).open_clauses, 0);
        assert!(ctx.part(MlfQueueP).stack.is_empty());
    }
}
