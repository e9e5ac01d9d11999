//! Branching heuristics.
//!
//! Ten policies behind a single dispatch function. Every heuristic either returns the next
//! proposition to split on together with its initial sign, or `None` when the candidate set is
//! exhausted. The unit-propagation based heuristics (Satz, Relsat, Unitie) additionally detect
//! and propagate failed literals on their own and can hand back the result of the backtracking
//! component when such a propagation runs into a conflict.
pub mod boehm;
pub mod jw;
pub mod lookahead;
pub mod moms;
pub mod relsat;
pub mod rnd;
pub mod sato;
pub mod satz;
pub mod unitie;
pub mod usr;

use partial_ref::{partial, PartialRef};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use occsat_formula::Var;

use crate::clause::ClauseRef;
use crate::config::Heuristic;
use crate::context::{
    BcpQueueP, ClauseAllocP, ClauseDbP, Context, HeurStateP, MlfQueueP, PropsP, RngP,
    SolverConfigP, StatsP, TrailP, WorkingReasonP,
};
use crate::errors::SolverError;
use crate::props::{AssignMode, Props};

/// A branching choice.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    pub var: Var,
    pub value: bool,
    pub mode: AssignMode,
}

/// The process-scoped random source of the solver.
pub struct SolverRng {
    rng: SmallRng,
}

impl Default for SolverRng {
    fn default() -> SolverRng {
        SolverRng {
            rng: SmallRng::seed_from_u64(0),
        }
    }
}

impl SolverRng {
    /// Reseed; a seed of 0 seeds from entropy.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
    }

    /// A uniform integer in `[0, bound)`.
    pub fn below(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0, bound)
    }

    /// A uniform sign.
    pub fn flip(&mut self) -> bool {
        self.rng.gen()
    }
}

/// Shared scratch of the heuristics, owned by the engine context.
#[derive(Default)]
pub struct HeurState {
    /// Clauses whose open count was changed by the current lookahead.
    pub managed_cls: Vec<ClauseRef>,
    /// Propositions assigned by the current lookahead.
    pub changed_props: Vec<Var>,
    /// Candidates collected by the staged Satz scheme.
    pub chosen_props: Vec<Var>,
    /// Pool of best-scoring propositions.
    pub best_props: Vec<Var>,
    /// Signs recorded alongside `best_props`.
    pub best_signs: Vec<bool>,
    /// Scratch unit queue of the lookahead.
    pub lean_queue: Vec<ClauseRef>,
    /// Sato's selection marks.
    pub selected: Vec<bool>,

    // Satz tables, indexed by proposition.
    pub pos_len2: Vec<i64>,
    pub pos_len3: Vec<i64>,
    pub neg_len2: Vec<i64>,
    pub neg_len3: Vec<i64>,
    pub reduced_pos: Vec<i64>,
    pub reduced_neg: Vec<i64>,

    // Relsat tables, indexed by proposition.
    pub score_pos: Vec<i64>,
    pub score_neg: Vec<i64>,
    pub score: Vec<i64>,
    pub pos_bin: Vec<i64>,
    pub neg_bin: Vec<i64>,

    // Sato's mode switch and default sign.
    pub use_moms: bool,
    pub sign_pos: bool,
}

impl HeurState {
    /// Per-heuristic setup, run by the builder's finalize step.
    pub fn init(
        &mut self,
        heuristic: Heuristic,
        var_count: usize,
        clause_count: usize,
        nh_count: usize,
    ) {
        self.managed_cls.clear();
        self.changed_props.clear();
        self.chosen_props.clear();
        self.best_props.clear();
        self.best_signs.clear();
        self.lean_queue.clear();

        match heuristic {
            Heuristic::Satz => {
                self.pos_len2 = vec![0; var_count];
                self.pos_len3 = vec![0; var_count];
                self.neg_len2 = vec![0; var_count];
                self.neg_len3 = vec![0; var_count];
                self.reduced_pos = vec![0; var_count];
                self.reduced_neg = vec![0; var_count];
            }
            Heuristic::Relsat => {
                self.score_pos = vec![0; var_count];
                self.score_neg = vec![0; var_count];
                self.score = vec![0; var_count];
                self.pos_bin = vec![0; var_count];
                self.neg_bin = vec![0; var_count];
            }
            Heuristic::Sato => {
                self.selected = vec![false; var_count];
                sato::init(self, clause_count, nh_count);
            }
            _ => {}
        }
    }
}

/// Index into the branching candidate set: all open propositions, or the model propositions when
/// the independent-propositions parameter is set.
pub(crate) fn candidate_count(props: &Props, use_model: bool) -> usize {
    if use_model {
        props.model_props.len()
    } else {
        props.order.len()
    }
}

pub(crate) fn candidate_at(props: &Props, use_model: bool, i: usize) -> Var {
    if use_model {
        props.model_props[i]
    } else {
        props.order[i]
    }
}

/// Call the selected heuristic and account for the new search node.
pub fn choose_literal(
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
    let heuristic = ctx.part(SolverConfigP).heuristic;
    let decision = match heuristic {
        Heuristic::Usr => usr::choose(ctx.borrow())?,
        Heuristic::Rnd => rnd::choose(ctx.borrow()),
        Heuristic::Jw => jw::choose(ctx.borrow(), false),
        Heuristic::Jw2 => jw::choose(ctx.borrow(), true),
        Heuristic::Sato => sato::choose(ctx.borrow()),
        Heuristic::Satz => satz::choose(ctx.borrow())?,
        Heuristic::Boehm => boehm::choose(ctx.borrow()),
        Heuristic::Moms => moms::choose(ctx.borrow(), None, true),
        Heuristic::Relsat => relsat::choose(ctx.borrow())?,
        Heuristic::Unitie => unitie::choose(ctx.borrow())?,
    };

    if let Some(decision) = decision {
        if decision.mode == AssignMode::LeftSplit {
            ctx.part_mut(TrailP).level += 1;
            ctx.part_mut(StatsP).nodes += 1;
            trace_node(ctx.borrow());
            log::trace!(
                "now let {} have value {} at level {}",
                decision.var,
                decision.value,
                ctx.part(TrailP).level
            );
        }
    }

    Ok(decision)
}

/// Emit the running-trace line for search nodes when it is due.
fn trace_node(mut ctx: partial!(Context, mut StatsP, SolverConfigP, TrailP)) {
    let interval = ctx.part(SolverConfigP).run_trace;
    if interval == 0 {
        return;
    }
    let level = ctx.part(TrailP).level;
    let stats = ctx.part_mut(StatsP);
    if stats.nodes >= stats.trace_nodes_due {
        stats.trace_nodes_due = stats.nodes + interval;
        log::info!(
            "trace: {} nodes, {} contradictions, level {}",
            stats.nodes,
            stats.conflicts,
            level
        );
    }
}
