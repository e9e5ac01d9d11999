//! Central solver data structure.
//!
//! This module defines the `Context` data structure which holds all data used by the solver. The
//! original engine this solver descends from kept everything in globals; here every piece of
//! state is a part of the context and functions declare the parts they touch via `partial_ref`.
use partial_ref::{part, partial, PartialRef, PartialRefTarget};

use crate::analyze_conflict::WorkingReason;
use crate::clause::{ClauseAlloc, ClauseDb};
use crate::config::SolverConfig;
use crate::decision::{HeurState, SolverRng};
use crate::limits::SearchLimits;
use crate::prop::{BcpQueue, MlfQueue, Trail};
use crate::props::Props;
use crate::state::SolverState;
use crate::stats::{Stats, Timers};
use crate::verify::TmpData;

/// Part declarations for the [`Context`] struct.
pub mod parts {
    use super::*;

    part!(pub BcpQueueP: BcpQueue);
    part!(pub ClauseAllocP: ClauseAlloc);
    part!(pub ClauseDbP: ClauseDb);
    part!(pub HeurStateP: HeurState);
    part!(pub LimitsP: SearchLimits);
    part!(pub MlfQueueP: MlfQueue);
    part!(pub PropsP: Props);
    part!(pub RngP: SolverRng);
    part!(pub SolverConfigP: SolverConfig);
    part!(pub SolverStateP: SolverState);
    part!(pub StatsP: Stats);
    part!(pub TimersP: Timers);
    part!(pub TrailP: Trail);
    part!(pub TmpDataP: TmpData);
    part!(pub WorkingReasonP: WorkingReason);
}

pub use parts::*;

/// Central solver data structure.
///
/// This struct contains all data kept by the solver. Most functions operating on multiple fields
/// of the context use partial references provided by the `partial_ref` crate. This documents the
/// data dependencies and makes the borrow checker happy without the overhead of passing
/// individual references.
#[derive(PartialRefTarget, Default)]
pub struct Context {
    #[part(BcpQueueP)]
    pub bcp_queue: BcpQueue,
    #[part(ClauseAllocP)]
    pub clause_alloc: ClauseAlloc,
    #[part(ClauseDbP)]
    pub clause_db: ClauseDb,
    #[part(HeurStateP)]
    pub heur_state: HeurState,
    #[part(LimitsP)]
    pub limits: SearchLimits,
    #[part(MlfQueueP)]
    pub mlf_queue: MlfQueue,
    #[part(PropsP)]
    pub props: Props,
    #[part(RngP)]
    pub rng: SolverRng,
    #[part(SolverConfigP)]
    pub solver_config: SolverConfig,
    #[part(SolverStateP)]
    pub solver_state: SolverState,
    #[part(StatsP)]
    pub stats: Stats,
    #[part(TimersP)]
    pub timers: Timers,
    #[part(TrailP)]
    pub trail: Trail,
    #[part(TmpDataP)]
    pub tmp_data: TmpData,
    #[part(WorkingReasonP)]
    pub working_reason: WorkingReason,
}

/// Prepare a context for a new solve with the given configuration.
pub fn init_solve(
    mut ctx: partial!(
        Context,
        mut LimitsP,
        mut PropsP,
        mut RngP,
        mut SolverConfigP,
        mut SolverStateP,
        mut StatsP,
    ),
    config: &SolverConfig,
) {
    let mut config = config.clone();
    if config.sol_num > 1 && config.pure_literal {
        // Pure literal fixing commits to one polarity and would hide assignments from the
        // enumeration.
        log::debug!("pure literal fixing disabled while enumerating models");
        config.pure_literal = false;
    }
    *ctx.part_mut(StatsP) = Stats::default();
    *ctx.part_mut(LimitsP) = SearchLimits::from_config(&config);
    ctx.part_mut(PropsP).init(config.max_var_num);
    ctx.part_mut(RngP).reseed(config.rnd_seed);
    ctx.part_mut(SolverStateP).reset(config.sol_num);
    *ctx.part_mut(SolverConfigP) = config;
}
