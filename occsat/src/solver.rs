//! The polymorphic solver facade.
//!
//! The host constructs a backend by name, pushes CNF problems into the permanent group, asks the
//! solver to solve and extracts a model. Only the built-in non-incremental backend is provided;
//! for it the permanent group is the only group, and every solve builds a fresh engine context
//! from the accumulated clause database (stateless per solve).
use std::io;
use std::time::{Duration, Instant};

use anyhow::Error;
use partial_ref::{IntoPartialRefMut, PartialRef};

use occsat_dimacs::DimacsParser;

use crate::builder::{self, AddLit, BuildError};
use crate::cnf::{CnfProblem, TRUE_FORMULA_LITERAL};
use crate::config::{Heuristic, ParamName, Params};
use crate::context::{self, Context, SolverStateP, StatsP, TimersP};
use crate::errors::{ErrorLocation, SolverError};
use crate::search;
use crate::state::SolveResult;
use crate::stats::{Stats, Timers};

/// A clause group of the facade. The permanent group always exists and cannot be destroyed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GroupId(usize);

/// Outcome of `solve_all_groups`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SolverResult {
    Satisfiable,
    Unsatisfiable,
    InternalError,
}

/// The backends the facade knows by name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// The built-in DPLL engine.
    Occsat,
    /// Recognized for dispatching, but not linked in.
    MiniSat,
    /// Recognized for dispatching, but not linked in.
    ZChaff,
}

impl BackendKind {
    /// All known backends.
    pub fn all() -> &'static [BackendKind] {
        &[BackendKind::Occsat, BackendKind::MiniSat, BackendKind::ZChaff]
    }

    /// The canonical spelling of the backend name.
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Occsat => "occsat",
            BackendKind::MiniSat => "minisat",
            BackendKind::ZChaff => "zchaff",
        }
    }

    /// Look a backend up by case-insensitive name.
    pub fn from_name(name: &str) -> Option<BackendKind> {
        BackendKind::all()
            .iter()
            .find(|backend| backend.name().eq_ignore_ascii_case(name))
            .copied()
    }

    /// Normalize a backend name to its canonical spelling.
    pub fn normalize(name: &str) -> Option<&'static str> {
        BackendKind::from_name(name).map(BackendKind::name)
    }

    /// Whether the backend is actually linked into this build.
    pub fn is_available(self) -> bool {
        matches!(self, BackendKind::Occsat)
    }
}

/// A solver instance as seen by the host.
pub struct Solver {
    name: String,
    backend: BackendKind,
    groups: Vec<GroupId>,
    unsatisfiable_groups: Vec<GroupId>,
    model: Option<Vec<isize>>,
    solving_time: Option<Duration>,
    params: Params,
    clauses: Vec<Vec<isize>>,
    independent_vars: Vec<isize>,
    max_var: isize,
    last_stats: Option<Stats>,
    last_timers: Option<Timers>,
}

impl Solver {
    /// Construct a non-incremental solver by backend name.
    ///
    /// Returns `None` when the name is unknown or the backend is not linked in.
    pub fn new_non_incremental(backend_name: &str) -> Option<Solver> {
        let backend = BackendKind::from_name(backend_name)?;
        if !backend.is_available() {
            return None;
        }

        let mut params = Params::new();
        params
            .set(ParamName::Heuristics, Heuristic::Unitie as i64)
            .set(ParamName::RunTrace, 0)
            .set(ParamName::IndepProps, 1);

        Some(Solver {
            name: backend.name().to_string(),
            backend,
            groups: vec![GroupId(0)],
            unsatisfiable_groups: vec![],
            model: None,
            solving_time: None,
            params,
            clauses: vec![],
            independent_vars: vec![],
            max_var: 0,
            last_stats: None,
            last_timers: None,
        })
    }

    /// Construct an incremental solver by backend name.
    ///
    /// No incremental backend is linked in, so this recognizes the name and returns `None`.
    pub fn new_incremental(backend_name: &str) -> Option<Solver> {
        let _ = BackendKind::from_name(backend_name)?;
        None
    }

    /// The backend name of this instance.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backend this instance dispatches to.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// The always-included group.
    pub fn permanent_group(&self) -> GroupId {
        self.groups[0]
    }

    /// The backend parameter array, for tuning before a solve.
    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    /// Add a CNF problem's clauses to a group.
    ///
    /// Constant CNFs contribute through [`set_polarity`](Solver::set_polarity) only; adding one
    /// is a no-op.
    pub fn add(&mut self, cnf: &CnfProblem, group: GroupId) {
        assert_eq!(
            group,
            self.permanent_group(),
            "only the permanent group exists"
        );
        if cnf.formula_literal() == TRUE_FORMULA_LITERAL {
            return;
        }

        for clause in cnf.clauses().iter() {
            self.clauses.push(clause.clone());
        }

        self.independent_vars.extend_from_slice(cnf.vars());
        self.independent_vars.sort_unstable();
        self.independent_vars.dedup();

        self.max_var = self.max_var.max(cnf.max_var_index());
    }

    /// Reads and adds a formula in DIMACS CNF format.
    ///
    /// Propositions declared by a `c model` line are registered as independent.
    pub fn add_dimacs_cnf(&mut self, input: impl io::Read) -> Result<(), Error> {
        let mut parser = DimacsParser::parse_incremental(input, |_| Ok(()))?;

        let model_vars = parser.model_vars().to_vec();
        let formula = parser.take_formula();
        let problem = CnfProblem::from_formula(&formula, &model_vars);
        let group = self.permanent_group();
        self.add(&problem, group);

        log::info!(
            "Parsed formula with {} variables and {} clauses",
            parser.var_count(),
            parser.clause_count()
        );

        Ok(())
    }

    /// Fix the polarity under which a CNF problem contributes to a group.
    ///
    /// A constant CNF turns into a no-op (true with positive polarity, false with negative) or
    /// marks the group unsatisfiable without touching the backend. A non-constant CNF
    /// contributes the unit clause over its formula literal times the polarity.
    pub fn set_polarity(&mut self, cnf: &CnfProblem, polarity: i32, group: GroupId) {
        assert!(polarity == 1 || polarity == -1, "polarity must be -1 or +1");
        assert_eq!(
            group,
            self.permanent_group(),
            "only the permanent group exists"
        );

        if cnf.is_constant() {
            let effectively_true = cnf.constant_value() == (polarity == 1);
            if effectively_true {
                log::debug!("the true constant was added to solver '{}'", self.name);
            } else {
                log::debug!("the false constant was added to solver '{}'", self.name);
                if !self.unsatisfiable_groups.contains(&group) {
                    self.unsatisfiable_groups.push(group);
                }
            }
            return;
        }

        let literal = polarity as isize * cnf.formula_literal();
        self.clauses.push(vec![literal]);
    }

    /// Solve the permanent group, recording the wall time.
    ///
    /// If any group is marked unsatisfiable this short-circuits without invoking the backend.
    pub fn solve_all_groups(&mut self) -> SolverResult {
        self.model = None;
        let started = Instant::now();

        log::info!("invoking solver '{}'", self.name);

        let result = if !self.unsatisfiable_groups.is_empty() {
            SolverResult::Unsatisfiable
        } else {
            match self.run_built_in() {
                Ok(result) => result,
                Err(err) => {
                    log::error!("solver '{}' failed: {}", self.name, err);
                    SolverResult::InternalError
                }
            }
        };

        let elapsed = started.elapsed();
        self.solving_time = Some(elapsed);
        log::info!(
            "solver '{}' returned after {:.3} secs",
            self.name,
            elapsed.as_secs_f64()
        );

        result
    }

    /// The model of the previous successful solve, as signed variable indices in DIMACS
    /// convention. Variables missing from the list are don't-cares.
    pub fn model(&self) -> Option<&[isize]> {
        self.model.as_deref()
    }

    /// Wall time of the last solve.
    pub fn last_solving_time(&self) -> Option<Duration> {
        self.solving_time
    }

    /// Search statistics of the last solve that reached the backend.
    pub fn stats(&self) -> Option<&Stats> {
        self.last_stats.as_ref()
    }

    /// Timers of the last solve that reached the backend.
    pub fn timers(&self) -> Option<&Timers> {
        self.last_timers.as_ref()
    }

    /// Build a fresh engine context from the accumulated clauses and search.
    fn run_built_in(&mut self) -> Result<SolverResult, SolverError> {
        self.params
            .set(ParamName::MaxVarNum, self.max_var.max(1) as i64)
            .set(ParamName::MaxClNum, self.clauses.len().max(1) as i64);
        let mut config = self.params.resolve();
        if self.independent_vars.is_empty() {
            // Without declared model variables the restriction would leave nothing to branch on.
            config.indep_props = false;
        }

        let mut ctx = Box::new(Context::default());
        let mut ctx = ctx.into_partial_ref_mut();
        context::init_solve(ctx.borrow(), &config);

        for clause in self.clauses.iter() {
            let id = builder::new_clause(ctx.borrow()).map_err(build_error)?;
            let mut tautology = false;
            for &lit in clause.iter() {
                match builder::add_lit(ctx.borrow(), id, lit).map_err(build_error)? {
                    AddLit::Tautology => {
                        tautology = true;
                        break;
                    }
                    AddLit::Added | AddLit::Duplicate => {}
                }
            }
            if !tautology {
                builder::commit_clause(ctx.borrow(), id).map_err(build_error)?;
            }
        }
        for &var in self.independent_vars.iter() {
            builder::make_indep(ctx.borrow(), var);
        }

        let outcome = search::solve(ctx.borrow())?;

        self.last_stats = Some(ctx.part(StatsP).clone());
        self.last_timers = Some(ctx.part(TimersP).clone());

        Ok(match outcome {
            SolveResult::Sat => {
                let model = ctx
                    .part(SolverStateP)
                    .models
                    .last()
                    .map(|model| model.iter().map(|lit| lit.to_dimacs()).collect())
                    .unwrap_or_default();
                self.model = Some(model);
                SolverResult::Satisfiable
            }
            SolveResult::Unsat => SolverResult::Unsatisfiable,
            SolveResult::TimeFail | SolveResult::MemFail => {
                log::warn!("solver '{}' ran out of its resource budget", self.name);
                SolverResult::InternalError
            }
        })
    }
}

fn build_error(err: BuildError) -> SolverError {
    SolverError::new(
        crate::errors::ErrorKind::InternalError,
        ErrorLocation::NoLocation,
        err.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use occsat_formula::{cnf_formula, vars};

    use super::*;

    #[test]
    fn backend_names_normalize() {
        assert_eq!(BackendKind::from_name("OccSat"), Some(BackendKind::Occsat));
        assert_eq!(BackendKind::normalize("ZCHAFF"), Some("zchaff"));
        assert_eq!(BackendKind::from_name("picosat"), None);
        assert!(Solver::new_non_incremental("minisat").is_none());
        assert!(Solver::new_incremental("occsat").is_none());
    }

    #[test]
    fn solves_a_simple_problem() {
        let mut solver = Solver::new_non_incremental("occsat").unwrap();
        let group = solver.permanent_group();

        let formula = cnf_formula![
            1, 2;
            -1, 2;
        ];
        let problem = CnfProblem::from_formula(&formula, &vars![1, 2]);
        solver.add(&problem, group);

        assert_eq!(solver.solve_all_groups(), SolverResult::Satisfiable);

        let model = solver.model().unwrap();
        assert!(model.contains(&2));
        assert!(solver.last_solving_time().is_some());
    }

    #[test]
    fn unsatisfiable_formula() {
        let mut solver = Solver::new_non_incremental("occsat").unwrap();
        let group = solver.permanent_group();

        let formula = cnf_formula![
            1;
            -1;
        ];
        let problem = CnfProblem::from_formula(&formula, &vars![1]);
        solver.add(&problem, group);

        assert_eq!(solver.solve_all_groups(), SolverResult::Unsatisfiable);
        assert!(solver.model().is_none());
    }

    #[test]
    fn constant_false_polarity_short_circuits() {
        let mut solver = Solver::new_non_incremental("occsat").unwrap();
        let group = solver.permanent_group();

        solver.set_polarity(&CnfProblem::constant(false), 1, group);
        assert_eq!(solver.solve_all_groups(), SolverResult::Unsatisfiable);
        // No search ran at all.
        assert!(solver.stats().is_none());

        // The true constant with flipped polarity is also false.
        let mut solver = Solver::new_non_incremental("occsat").unwrap();
        let group = solver.permanent_group();
        solver.set_polarity(&CnfProblem::constant(true), -1, group);
        assert_eq!(solver.solve_all_groups(), SolverResult::Unsatisfiable);
    }

    #[test]
    fn adding_the_true_constant_is_a_no_op() {
        let mut solver = Solver::new_non_incremental("occsat").unwrap();
        let group = solver.permanent_group();

        solver.add(&CnfProblem::constant(true), group);
        solver.set_polarity(&CnfProblem::constant(true), 1, group);

        assert_eq!(solver.solve_all_groups(), SolverResult::Satisfiable);
    }

    #[test]
    fn polarity_contributes_the_formula_literal() {
        let mut solver = Solver::new_non_incremental("occsat").unwrap();
        let group = solver.permanent_group();

        // Formula literal 3 stands for the whole formula (3 <-> 1 v 2 in the host encoding).
        let problem = CnfProblem::new(3, vec![vec![-3, 1, 2]], vec![1, 2, 3], 3);
        solver.add(&problem, group);
        solver.set_polarity(&problem, 1, group);

        assert_eq!(solver.solve_all_groups(), SolverResult::Satisfiable);
        let model = solver.model().unwrap();
        assert!(model.contains(&3));
        assert!(model.contains(&1) || model.contains(&2));
    }

    #[test]
    fn solves_dimacs_input() {
        let mut solver = Solver::new_non_incremental("occsat").unwrap();

        solver
            .add_dimacs_cnf(b"c model 1 2 0\np cnf 3 2\n1 2 0\n-1 3 0\n" as &[_])
            .unwrap();

        assert_eq!(solver.solve_all_groups(), SolverResult::Satisfiable);
        let model = solver.model().unwrap();
        assert!(model.contains(&1) || model.contains(&2));
    }

    #[test]
    #[should_panic(expected = "only the permanent group exists")]
    fn foreign_groups_are_rejected() {
        let mut solver = Solver::new_non_incremental("occsat").unwrap();
        let problem = CnfProblem::from_formula(&cnf_formula![1;], &[]);
        solver.add(&problem, GroupId(7));
    }
}
