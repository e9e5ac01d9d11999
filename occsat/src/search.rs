//! The DPLL search driver.
//!
//! The driver alternates unit propagation, optional pure-literal fixing, the consistency check
//! and the branching heuristic; conflicts are handed to the backtracking component. The
//! consistency check is the single place deciding "is this a model": callers asking for several
//! assignments decrement the remaining solution count there and drive chronological
//! backtracking to enumerate further.
use partial_ref::{partial, PartialRef};

use occsat_formula::Lit;

use crate::builder;
use crate::context::{
    BcpQueueP, ClauseAllocP, ClauseDbP, Context, HeurStateP, LimitsP, MlfQueueP, PropsP, RngP,
    SolverConfigP, SolverStateP, StatsP, TimersP, TmpDataP, TrailP, WorkingReasonP,
};
use crate::decision::choose_literal;
use crate::errors::SolverError;
use crate::lookback::{backtrack, chrono_bt};
use crate::prop::{bcp, extend_prop, mlf};
use crate::state::SolveResult;
use crate::verify;

/// Finalize the clause database and search for the requested number of assignments.
pub fn solve(
    mut ctx: partial!(
        Context,
        mut BcpQueueP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut HeurStateP,
        mut LimitsP,
        mut MlfQueueP,
        mut PropsP,
        mut RngP,
        mut SolverStateP,
        mut StatsP,
        mut TimersP,
        mut TmpDataP,
        mut TrailP,
        mut WorkingReasonP,
        SolverConfigP,
    ),
) -> Result<SolveResult, SolverError> {
    builder::finalize(ctx.borrow());

    ctx.part_mut(TimersP).search.start();
    let result = run_search(ctx.borrow());
    ctx.part_mut(TimersP).search.stop();

    result
}

fn run_search(
    mut ctx: partial!(
        Context,
        mut BcpQueueP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut HeurStateP,
        mut LimitsP,
        mut MlfQueueP,
        mut PropsP,
        mut RngP,
        mut SolverStateP,
        mut StatsP,
        mut TimersP,
        mut TmpDataP,
        mut TrailP,
        mut WorkingReasonP,
        SolverConfigP,
    ),
) -> Result<SolveResult, SolverError> {
    let mut stop = false;

    // Assignment enumeration loop.
    loop {
        // Single assignment search loop.
        loop {
            let mem_in_use = ctx.part(ClauseAllocP).bytes_estimate();
            if let Some(failure) = ctx.part_mut(LimitsP).check(mem_in_use) {
                return Ok(failure);
            }

            let next = match bcp(ctx.borrow()) {
                Ok(()) => {
                    mlf(ctx.borrow());
                    if check_consistency(ctx.borrow(), &mut stop)? {
                        break;
                    }
                    choose_literal(ctx.borrow())?
                }
                Err(conflict) => backtrack(ctx.borrow(), conflict)?,
            };

            ctx.part_mut(StatsP).cycles += 1;

            match next {
                Some(decision) => {
                    let _ = extend_prop(ctx.borrow(), decision.var, decision.value, decision.mode);
                }
                None => {
                    let _ = check_consistency(ctx.borrow(), &mut stop)?;
                    break;
                }
            }
        }

        if !stop {
            // More solutions are wanted: backtrack chronologically and keep enumerating.
            match chrono_bt(ctx.borrow()) {
                Some(decision) => {
                    let _ = extend_prop(ctx.borrow(), decision.var, decision.value, decision.mode);
                }
                None => stop = true,
            }
        }
        if stop {
            break;
        }
    }

    Ok(
        if ctx.part(SolverStateP).solutions_remaining == 0 {
            SolveResult::Sat
        } else {
            SolveResult::Unsat
        },
    )
}

/// The single point deciding whether the current assignment is a model.
///
/// When no open clause remains, the assignment is verified, recorded, and the remaining solution
/// count decremented; `stop` is raised once the requested count is reached. Otherwise `stop` is
/// raised for the caller's exhaustion paths.
fn check_consistency(
    mut ctx: partial!(
        Context,
        mut SolverStateP,
        mut StatsP,
        mut TmpDataP,
        ClauseAllocP,
        ClauseDbP,
        PropsP,
        SolverConfigP,
        TrailP,
    ),
    stop: &mut bool,
) -> Result<bool, SolverError> {
    let horn = ctx.part(SolverConfigP).horn_relaxation;
    if !ctx.part(ClauseDbP).formula_is_empty(horn) {
        *stop = true;
        return Ok(false);
    }

    let redundant = verify::check_solution(ctx.borrow())?;
    if redundant != 0 {
        log::warn!("there are {} redundant assignments", redundant);
    }

    let model: Vec<Lit> = {
        let trail = ctx.part(TrailP);
        let props = ctx.part(PropsP);
        trail
            .stack
            .iter()
            .map(|&var| var.lit(props.value(var) == Some(true)))
            .collect()
    };
    {
        let state = ctx.part_mut(SolverStateP);
        state.models.push(model);
        state.solutions_remaining -= 1;
        *stop = state.solutions_remaining == 0;
    }
    {
        let level = ctx.part(TrailP).level;
        let stats = ctx.part_mut(StatsP);
        stats.sol_depth += level as u64;
        stats.update_depth_max(level);
    }
    log::debug!(
        "model found, {} more requested",
        ctx.part(SolverStateP).solutions_remaining
    );

    Ok(true)
}

#[cfg(test)]
mod tests {
    use partial_ref::IntoPartialRefMut;

    use occsat_formula::lits;

    use crate::config::{Heuristic, SolverConfig};
    use crate::context::{init_solve, Context};
    use crate::test_setup::load_and_finalize;

    use super::*;

    fn solve_clauses(config: &SolverConfig, clauses: &[&[occsat_formula::Lit]]) -> SolveResult {
        let mut ctx = Box::new(Context::default());
        let mut ctx = ctx.into_partial_ref_mut();
        init_solve(ctx.borrow(), config);
        load_and_finalize(ctx.borrow(), clauses);
        solve(ctx.borrow()).unwrap()
    }

    #[test]
    fn single_unit_clause_is_sat() {
        let config = SolverConfig::default();
        assert_eq!(
            solve_clauses(&config, &[&lits![1][..]]),
            SolveResult::Sat
        );
    }

    #[test]
    fn contradicting_units_are_unsat() {
        let config = SolverConfig::default();
        assert_eq!(
            solve_clauses(&config, &[&lits![1][..], &lits![-1][..]]),
            SolveResult::Unsat
        );
    }

    #[test]
    fn all_sign_combinations_are_unsat() {
        for &heuristic in Heuristic::all() {
            if heuristic == Heuristic::Usr {
                continue;
            }
            let config = SolverConfig {
                heuristic,
                rnd_seed: 7,
                ..SolverConfig::default()
            };
            assert_eq!(
                solve_clauses(
                    &config,
                    &[
                        &lits![1, 2][..],
                        &lits![-1, 2][..],
                        &lits![1, -2][..],
                        &lits![-1, -2][..],
                    ],
                ),
                SolveResult::Unsat,
                "heuristic {:?}",
                heuristic
            );
        }
    }

    #[test]
    fn chained_implications_are_sat() {
        for &heuristic in Heuristic::all() {
            if heuristic == Heuristic::Usr {
                continue;
            }
            let config = SolverConfig {
                heuristic,
                rnd_seed: 3,
                ..SolverConfig::default()
            };
            let mut ctx = Box::new(Context::default());
            let mut ctx = ctx.into_partial_ref_mut();
            init_solve(ctx.borrow(), &config);
            let clauses: &[&[occsat_formula::Lit]] = &[
                &lits![1, 2, 3][..],
                &lits![-1, 2][..],
                &lits![-2, 3][..],
            ];
            load_and_finalize(ctx.borrow(), clauses);
            assert_eq!(solve(ctx.borrow()).unwrap(), SolveResult::Sat);

            // Every returned model satisfies all three clauses.
            let state = ctx.part(crate::context::SolverStateP);
            let model = state.models.last().unwrap();
            for clause in clauses.iter() {
                assert!(
                    clause.iter().any(|lit| model.contains(lit)),
                    "heuristic {:?} produced a bogus model",
                    heuristic
                );
            }
        }
    }

    #[test]
    fn enumeration_finds_two_models_then_exhausts() {
        let config = SolverConfig {
            sol_num: 2,
            ..SolverConfig::default()
        };
        let mut ctx = Box::new(Context::default());
        let mut ctx = ctx.into_partial_ref_mut();
        init_solve(ctx.borrow(), &config);
        load_and_finalize(ctx.borrow(), &[&lits![1, 2][..]]);

        assert_eq!(solve(ctx.borrow()).unwrap(), SolveResult::Sat);

        let state = ctx.part(crate::context::SolverStateP);
        assert_eq!(state.models.len(), 2);
        assert_ne!(state.models[0], state.models[1]);
    }

    #[test]
    fn enumeration_past_the_model_count_is_unsat() {
        let config = SolverConfig {
            sol_num: 3,
            ..SolverConfig::default()
        };
        let mut ctx = Box::new(Context::default());
        let mut ctx = ctx.into_partial_ref_mut();
        init_solve(ctx.borrow(), &config);
        // x has only two assignments.
        load_and_finalize(ctx.borrow(), &[&lits![1][..], &lits![1, 2][..]]);

        assert_eq!(solve(ctx.borrow()).unwrap(), SolveResult::Unsat);
    }
}
