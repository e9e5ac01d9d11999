//! Interactive branching: ask the user for a literal. Debugging only.
use std::io::{self, BufRead, Write};

use partial_ref::{partial, PartialRef};

use occsat_formula::Var;

use crate::context::{Context, PropsP};
use crate::errors::{ErrorLocation, SolverError};
use crate::props::AssignMode;

use super::Decision;

pub fn choose(ctx: partial!(Context, PropsP)) -> Result<Option<Decision>, SolverError> {
    let open: Vec<Var> = {
        let props = ctx.part(PropsP);
        props
            .order
            .iter()
            .copied()
            .filter(|&var| props.value(var).is_none())
            .collect()
    };
    if open.is_empty() {
        return Ok(None);
    }

    let stdout = io::stdout();
    {
        let mut out = stdout.lock();
        let _ = writeln!(out, "Please choose one of the following propositions:");
        for var in open.iter() {
            let _ = write!(out, " {}", var);
        }
        let _ = writeln!(out);
        let _ = write!(out, "i assigns the proposition to true, -i to false: ");
        let _ = out.flush();
    }

    let mut line = String::new();
    let stdin = io::stdin();
    stdin.lock().read_line(&mut line).map_err(|err| {
        SolverError::internal(ErrorLocation::Heuristic, format!("reading choice: {}", err))
    })?;

    let lit: isize = line.trim().parse().map_err(|_| {
        SolverError::internal(
            ErrorLocation::Heuristic,
            format!("not a literal: {:?}", line.trim()),
        )
    })?;

    let magnitude = lit.abs() as usize;
    if lit == 0 || magnitude > ctx.part(PropsP).store.len() {
        return Err(SolverError::internal(
            ErrorLocation::Heuristic,
            format!("literal out of range: {}", lit),
        ));
    }

    Ok(Some(Decision {
        var: Var::from_dimacs(lit.abs()),
        value: lit > 0,
        mode: AssignMode::LeftSplit,
    }))
}
