//! Standard outputs: result line, model, statistics, timers and parameter dumps.
//!
//! Everything writes into an `io::Write` so the CLI and embedders can route the output; the
//! formats follow the DIMACS output conventions (`s`, `v` and `c` prefixed lines).
use std::io;

use occsat_formula::Lit;

use crate::config::{SolverConfig, PARAM_NAMES};
use crate::state::SolveResult;
use crate::stats::{Stats, Timers};

/// Write the solution line.
pub fn write_result(target: &mut impl io::Write, result: SolveResult) -> io::Result<()> {
    match result {
        SolveResult::Sat => writeln!(target, "s SATISFIABLE"),
        SolveResult::Unsat => writeln!(target, "s UNSATISFIABLE"),
        SolveResult::TimeFail | SolveResult::MemFail => writeln!(target, "s UNKNOWN"),
    }
}

/// Write a satisfying assignment as a DIMACS `v` line.
pub fn write_model(target: &mut impl io::Write, model: &[Lit]) -> io::Result<()> {
    target.write_all(b"v")?;
    for &lit in model.iter() {
        target.write_all(b" ")?;
        itoa::write(&mut *target, lit.to_dimacs())?;
    }
    target.write_all(b" 0\n")?;
    Ok(())
}

/// Write the search statistics.
///
/// The human readable mode emits one commented line per statistic; the machine mode emits a
/// single space separated line for log scrapers.
pub fn write_stats(target: &mut impl io::Write, stats: &Stats, machine: bool) -> io::Result<()> {
    let depth_min = if stats.depth_min_seen() {
        stats.depth_min
    } else {
        0
    };
    let entries: [(&str, u64); 15] = [
        ("Unit clauses", stats.units),
        ("Pure literals", stats.pures),
        ("Failed literals", stats.faileds),
        ("Search tree nodes", stats.nodes),
        ("Contradictions found", stats.conflicts),
        ("Failure driven assignments", stats.fdas),
        ("Deepest level", stats.depth_max),
        ("Shallowest backtrack", depth_min),
        ("Solution depth (if any)", stats.sol_depth),
        ("Cycles in the main loop", stats.cycles),
        ("Skipped nodes", stats.skipped),
        ("Highest backjump", stats.skip_max),
        ("Learned clauses", stats.learned),
        ("Persistently learned clauses", stats.slearned),
        ("Unit learned clauses", stats.ulearned),
    ];

    if machine {
        target.write_all(b"c stats")?;
        for &(_, value) in entries.iter() {
            target.write_all(b" ")?;
            itoa::write(&mut *target, value)?;
        }
        target.write_all(b"\n")?;
    } else {
        for &(name, value) in entries.iter() {
            writeln!(target, "c {:<32} {}", name, value)?;
        }
        writeln!(target, "c {:<32} {}", "Average learned clause", stats.learn_avg())?;
    }
    Ok(())
}

/// Write the timers.
pub fn write_timers(target: &mut impl io::Write, timers: &Timers) -> io::Result<()> {
    writeln!(
        target,
        "c {:<32} {:.3}s",
        "Parse time",
        timers.parse.elapsed().as_secs_f64()
    )?;
    writeln!(
        target,
        "c {:<32} {:.3}s",
        "Build time",
        timers.build.elapsed().as_secs_f64()
    )?;
    writeln!(
        target,
        "c {:<32} {:.3}s",
        "Search time",
        timers.search.elapsed().as_secs_f64()
    )?;
    Ok(())
}

/// Dump the effective parameters.
pub fn write_params(target: &mut impl io::Write, config: &SolverConfig) -> io::Result<()> {
    let values: [String; 14] = [
        config
            .timeout
            .map(|budget| budget.as_secs().to_string())
            .unwrap_or_else(|| "unlimited".to_string()),
        config
            .memout_mb
            .map(|mb| mb.to_string())
            .unwrap_or_else(|| "unlimited".to_string()),
        config.heuristic.name().to_string(),
        config.sol_num.to_string(),
        config.learn_order.to_string(),
        format!("{:?}", config.learn_type),
        (config.indep_props as u8).to_string(),
        config.pproc_strength.to_string(),
        config.rnd_seed.to_string(),
        config.verbosity.to_string(),
        config.run_trace.to_string(),
        config.heur_param.to_string(),
        config.max_var_num.to_string(),
        config.max_cl_num.to_string(),
    ];
    for (name, value) in PARAM_NAMES.iter().zip(values.iter()) {
        writeln!(target, "c {:<36} {}", name, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use occsat_formula::lits;

    use super::*;

    #[test]
    fn model_line_is_dimacs() {
        let mut buf = vec![];
        write_model(&mut buf, &lits![1, -3, 4]).unwrap();
        assert_eq!(buf, b"v 1 -3 4 0\n");
    }

    #[test]
    fn result_lines() {
        let mut buf = vec![];
        write_result(&mut buf, SolveResult::Sat).unwrap();
        write_result(&mut buf, SolveResult::Unsat).unwrap();
        write_result(&mut buf, SolveResult::TimeFail).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "s SATISFIABLE\ns UNSATISFIABLE\ns UNKNOWN\n");
    }

    #[test]
    fn stats_have_both_modes() {
        let stats = Stats::default();
        let mut human = vec![];
        write_stats(&mut human, &stats, false).unwrap();
        assert!(String::from_utf8(human).unwrap().contains("Search tree nodes"));

        let mut machine = vec![];
        write_stats(&mut machine, &stats, true).unwrap();
        let text = String::from_utf8(machine).unwrap();
        assert!(text.starts_with("c stats "));
        assert_eq!(text.lines().count(), 1);
    }
}
