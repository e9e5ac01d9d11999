//! Shared setup for engine unit tests.
use partial_ref::{partial, PartialRef};

use occsat_formula::Lit;

use crate::builder::{self, AddLit};
use crate::context::{
    BcpQueueP, ClauseAllocP, ClauseDbP, Context, HeurStateP, MlfQueueP, PropsP, SolverConfigP,
    TimersP, WorkingReasonP,
};

/// Size the proposition store, feed the clauses through the builder and finalize.
pub fn load_and_finalize(
    mut ctx: partial!(
        Context,
        mut BcpQueueP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut HeurStateP,
        mut MlfQueueP,
        mut PropsP,
        mut TimersP,
        mut WorkingReasonP,
        SolverConfigP,
    ),
    clauses: &[&[Lit]],
) {
    let max_var = ctx.part(SolverConfigP).max_var_num;
    ctx.part_mut(PropsP).init(max_var);

    for clause in clauses {
        let id = builder::new_clause(ctx.borrow()).unwrap();
        let mut tautology = false;
        for &lit in clause.iter() {
            match builder::add_lit(ctx.borrow(), id, lit.to_dimacs()).unwrap() {
                AddLit::Tautology => {
                    tautology = true;
                    break;
                }
                _ => {}
            }
        }
        if !tautology {
            builder::commit_clause(ctx.borrow(), id).unwrap();
        }
    }

    builder::finalize(ctx.borrow());
}
