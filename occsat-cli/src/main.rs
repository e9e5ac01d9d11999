use std::env;
use std::fs;
use std::io::{self, Read, Write};

use anyhow::{anyhow, Error};
use clap::{App, AppSettings, Arg};
use env_logger::{fmt, Builder, Target};
use log::{error, info};
use log::{Level, LevelFilter, Record};

use occsat::config::{Heuristic, LearnType, ParamName};
use occsat::output;
use occsat::stats::Timer;
use occsat::{CnfProblem, Solver, SolverResult};
use occsat_dimacs::DimacsParser;

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{}", err);
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let format = |buf: &mut fmt::Formatter, record: &Record| {
        if record.level() == Level::Info {
            writeln!(buf, "c {}", record.args())
        } else {
            writeln!(buf, "c {}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .format(format)
        .filter(None, LevelFilter::Info);

    if let Ok(ref env_var) = env::var("OCCSAT_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();
}

fn banner() {
    info!("This is occsat {}", env!("CARGO_PKG_VERSION"));
}

fn main_with_err() -> Result<i32, Error> {
    let heuristic_names: Vec<&str> = Heuristic::all().iter().map(|heur| heur.name()).collect();

    let matches = App::new("occsat")
        .version(env!("CARGO_PKG_VERSION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .arg_from_usage("[INPUT] 'The input file to use (stdin if omitted)'")
        .arg(
            Arg::from_usage("[heuristic] -H --heuristic=[NAME] 'The branching heuristic to use'")
                .possible_values(&heuristic_names)
                .case_insensitive(true),
        )
        .arg_from_usage("[solutions] -n --solutions=[N] 'Number of satisfying assignments to enumerate'")
        .arg_from_usage("[learn-order] --learn-order=[N] 'Bound used by the learning schemes'")
        .arg(
            Arg::from_usage("[learn-type] --learn-type=[TYPE] 'The learning scheme'")
                .possible_values(&["relevance", "size"])
                .case_insensitive(true),
        )
        .arg_from_usage(
            "--independent 'Restrict branching to the model propositions of a c model line'",
        )
        .arg_from_usage("[seed] --seed=[N] 'Random seed, 0 seeds from entropy'")
        .arg_from_usage("[timeout] -t --timeout=[SECS] 'Time limit in seconds'")
        .arg_from_usage("[memout] -m --memout=[MB] 'Memory limit in megabytes'")
        .arg_from_usage("[trace] --trace=[N] 'Emit a running trace line every N nodes'")
        .arg_from_usage("[heur-param] --heur-param=[N] 'Optional parameter of the heuristic'")
        .arg_from_usage("--stats 'Print search statistics'")
        .arg_from_usage("--machine-stats 'Print search statistics in machine readable form'")
        .arg_from_usage("--params 'Print the effective parameters'")
        .get_matches();

    init_logging();
    banner();

    let stdin = io::stdin();
    let input: Box<dyn Read> = match matches.value_of("INPUT") {
        Some(path) => {
            info!("Reading file '{}'", path);
            Box::new(fs::File::open(path)?)
        }
        None => {
            info!("Reading from stdin");
            Box::new(stdin)
        }
    };

    let mut parse_timer = Timer::default();
    parse_timer.start();
    let mut parser = DimacsParser::parse_incremental(input, |_| Ok(()))?;
    parse_timer.stop();

    info!(
        "Parsed formula with {} variables and {} clauses",
        parser.var_count(),
        parser.clause_count()
    );
    if !parser.model_vars().is_empty() {
        info!("{} model propositions declared", parser.model_vars().len());
    }

    let mut solver = Solver::new_non_incremental("occsat")
        .ok_or_else(|| anyhow!("the built-in backend is unavailable"))?;

    {
        let params = solver.params_mut();

        if let Some(name) = matches.value_of("heuristic") {
            let heuristic = Heuristic::from_name(name)
                .ok_or_else(|| anyhow!("unknown heuristic: {}", name))?;
            params.set(ParamName::Heuristics, heuristic as i64);
        }
        if let Some(value) = matches.value_of("solutions") {
            params.set(ParamName::SolNum, value.parse()?);
        }
        if let Some(value) = matches.value_of("learn-order") {
            params.set(ParamName::LearnOrder, value.parse()?);
        }
        if let Some(name) = matches.value_of("learn-type") {
            let learn_type = if name.eq_ignore_ascii_case("size") {
                LearnType::Size
            } else {
                LearnType::Relevance
            };
            params.set(ParamName::LearnType, learn_type as i64);
        }
        params.set(
            ParamName::IndepProps,
            matches.is_present("independent") as i64,
        );
        if let Some(value) = matches.value_of("seed") {
            params.set(ParamName::RndSeed, value.parse()?);
        }
        if let Some(value) = matches.value_of("timeout") {
            params.set(ParamName::Timeout, value.parse()?);
        }
        if let Some(value) = matches.value_of("memout") {
            params.set(ParamName::Memout, value.parse()?);
        }
        if let Some(value) = matches.value_of("trace") {
            params.set(ParamName::RunTrace, value.parse()?);
        }
        if let Some(value) = matches.value_of("heur-param") {
            params.set(ParamName::HeurParam, value.parse()?);
        }
    }

    let model_vars = parser.model_vars().to_vec();
    let formula = parser.take_formula();
    let problem = CnfProblem::from_formula(&formula, &model_vars);
    let group = solver.permanent_group();
    solver.add(&problem, group);

    if matches.is_present("params") {
        let config = solver.params_mut().resolve();
        let stdout = io::stdout();
        output::write_params(&mut stdout.lock(), &config)?;
    }

    let result = solver.solve_all_groups();

    if matches.is_present("stats") || matches.is_present("machine-stats") {
        if let Some(stats) = solver.stats() {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            output::write_stats(&mut out, stats, matches.is_present("machine-stats"))?;
        }
        if let Some(timers) = solver.timers() {
            let mut timers = timers.clone();
            timers.parse = parse_timer.clone();
            let stdout = io::stdout();
            output::write_timers(&mut stdout.lock(), &timers)?;
        }
    }

    match result {
        SolverResult::Satisfiable => {
            println!("s SATISFIABLE");
            print!("v");
            for index in solver.model().unwrap_or(&[]) {
                print!(" {}", index);
            }
            println!(" 0");
            Ok(10)
        }
        SolverResult::Unsatisfiable => {
            println!("s UNSATISFIABLE");
            Ok(20)
        }
        SolverResult::InternalError => {
            println!("s UNKNOWN");
            Ok(0)
        }
    }
}
