//! Solver parameters and configuration.
//!
//! The host-facing surface is the flat [`Params`] array with well-known slots and the
//! `ASK_DEFAULT` sentinel. Before a solve the array is resolved into a typed [`SolverConfig`],
//! which also carries the switches that used to be conditional compilation in the engine this
//! solver descends from (backjumping, learning, pure literal fixing, horn relaxation). These are
//! runtime flags here because the behaviors interact through the same data structures.
use std::time::Duration;

/// Ask the default for a parameter.
pub const ASK_DEFAULT: i64 = -1;

/// The well-known parameter slots.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum ParamName {
    /// Time limit in seconds, 0 for unlimited.
    Timeout = 0,
    /// Memory limit in megabytes, 0 for unlimited.
    Memout = 1,
    /// Heuristic choice, see [`Heuristic`].
    Heuristics = 2,
    /// Requested number of solutions.
    SolNum = 3,
    /// Learn order.
    LearnOrder = 4,
    /// Learning type, see [`LearnType`].
    LearnType = 5,
    /// If non-0 branching prefers the independent (model) propositions.
    IndepProps = 6,
    /// Preprocessing strength. Only 0 (none) is implemented.
    PprocStrength = 7,
    /// Random seed, 0 to seed from entropy.
    RndSeed = 8,
    /// Verbosity level of the output.
    Verbosity = 9,
    /// Running trace quantization steps, 0 to disable.
    RunTrace = 10,
    /// An optional parameter for heuristics.
    HeurParam = 11,
    /// Maximum variable index in the input.
    MaxVarNum = 12,
    /// Maximum number of input clauses.
    MaxClNum = 13,
}

/// How many parameters there are.
pub const PARAM_NUM: usize = 14;

/// Human readable parameter names, indexed like the parameter slots.
pub static PARAM_NAMES: [&str; PARAM_NUM] = [
    "Time limit (sec)",
    "Memory limit (Mb)",
    "Heuristics",
    "Requested solutions",
    "Learn order",
    "Learning type",
    "Independent propositions",
    "Preprocessing strength",
    "Random seed",
    "Verbosity",
    "Running trace",
    "Heuristics optional param.",
    "Maximum number of input variables",
    "Maximum number of input clauses",
];

/// Default parameter values, indexed like the parameter slots.
static DEFAULT_PARAMS: [i64; PARAM_NUM] = [
    0,                          // Timeout
    0,                          // Memout
    Heuristic::Boehm as i64,    // Heuristics
    1,                          // SolNum
    3,                          // LearnOrder
    LearnType::Relevance as i64, // LearnType
    0,                          // IndepProps
    0,                          // PprocStrength
    0,                          // RndSeed
    0,                          // Verbosity
    0,                          // RunTrace
    0,                          // HeurParam
    100,                        // MaxVarNum
    1000,                       // MaxClNum
];

/// The flat parameter array handed to a backend.
///
/// Slots left at [`ASK_DEFAULT`] resolve to the fixed defaults.
#[derive(Clone, Debug)]
pub struct Params {
    values: [i64; PARAM_NUM],
}

impl Default for Params {
    fn default() -> Params {
        Params {
            values: [ASK_DEFAULT; PARAM_NUM],
        }
    }
}

impl Params {
    /// Create a parameter array with every slot asking for the default.
    pub fn new() -> Params {
        Params::default()
    }

    /// Change the value of a specific parameter.
    pub fn set(&mut self, name: ParamName, value: i64) -> &mut Params {
        self.values[name as usize] = value;
        self
    }

    /// The raw value of a parameter slot, `ASK_DEFAULT` included.
    pub fn get(&self, name: ParamName) -> i64 {
        self.values[name as usize]
    }

    /// The effective value of a parameter slot after default substitution.
    pub fn effective(&self, name: ParamName) -> i64 {
        let raw = self.values[name as usize];
        if raw == ASK_DEFAULT {
            DEFAULT_PARAMS[name as usize]
        } else {
            raw
        }
    }

    /// Resolve the array into a typed configuration.
    pub fn resolve(&self) -> SolverConfig {
        let timeout = match self.effective(ParamName::Timeout) {
            0 => None,
            secs => Some(Duration::from_secs(secs.max(0) as u64)),
        };
        let memout_mb = match self.effective(ParamName::Memout) {
            0 => None,
            mb => Some(mb.max(0) as usize),
        };

        SolverConfig {
            timeout,
            memout_mb,
            heuristic: Heuristic::from_param(self.effective(ParamName::Heuristics))
                .unwrap_or(Heuristic::Boehm),
            sol_num: self.effective(ParamName::SolNum).max(1) as u64,
            learn_order: self.effective(ParamName::LearnOrder).max(0) as usize,
            learn_type: if self.effective(ParamName::LearnType) == LearnType::Size as i64 {
                LearnType::Size
            } else {
                LearnType::Relevance
            },
            indep_props: self.effective(ParamName::IndepProps) != 0,
            pproc_strength: self.effective(ParamName::PprocStrength),
            rnd_seed: self.effective(ParamName::RndSeed).max(0) as u64,
            verbosity: self.effective(ParamName::Verbosity),
            run_trace: self.effective(ParamName::RunTrace).max(0) as u64,
            heur_param: self.effective(ParamName::HeurParam),
            max_var_num: self.effective(ParamName::MaxVarNum).max(1) as usize,
            max_cl_num: self.effective(ParamName::MaxClNum).max(1) as usize,
            ..SolverConfig::default()
        }
    }
}

/// The available branching heuristics.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(i64)]
pub enum Heuristic {
    /// Ask the user for a literal (debug only).
    Usr = 0,
    /// Random proposition and sign.
    Rnd = 1,
    /// Jeroslow-Wang.
    Jw = 2,
    /// Two-sided Jeroslow-Wang.
    Jw2 = 3,
    /// Sato 3.2 shortest-non-Horn-first.
    Sato = 4,
    /// Satz unit-propagation lookahead.
    Satz = 5,
    /// Boehm's lexicographic weight vector.
    Boehm = 6,
    /// Maximum occurrences in minimum size clauses.
    Moms = 7,
    /// Relsat 2.0 binary occurrence scoring.
    Relsat = 8,
    /// Unit propagation scoring with tie breaking.
    Unitie = 9,
}

/// How many heuristics there are.
pub const HEUR_NUM: usize = 10;

impl Heuristic {
    /// All heuristics in parameter order.
    pub fn all() -> &'static [Heuristic] {
        &[
            Heuristic::Usr,
            Heuristic::Rnd,
            Heuristic::Jw,
            Heuristic::Jw2,
            Heuristic::Sato,
            Heuristic::Satz,
            Heuristic::Boehm,
            Heuristic::Moms,
            Heuristic::Relsat,
            Heuristic::Unitie,
        ]
    }

    /// Decode a parameter slot value.
    pub fn from_param(value: i64) -> Option<Heuristic> {
        Heuristic::all().get(value as usize).copied()
    }

    /// Decode a case-insensitive name as used on the command line.
    pub fn from_name(name: &str) -> Option<Heuristic> {
        Heuristic::all()
            .iter()
            .find(|heur| heur.name().eq_ignore_ascii_case(name))
            .copied()
    }

    /// The canonical name of the heuristic.
    pub fn name(self) -> &'static str {
        match self {
            Heuristic::Usr => "usr",
            Heuristic::Rnd => "rnd",
            Heuristic::Jw => "jw",
            Heuristic::Jw2 => "2jw",
            Heuristic::Sato => "sato",
            Heuristic::Satz => "satz",
            Heuristic::Boehm => "boehm",
            Heuristic::Moms => "moms",
            Heuristic::Relsat => "relsat",
            Heuristic::Unitie => "unitie",
        }
    }
}

/// Which learned clauses are kept.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(i64)]
pub enum LearnType {
    /// Relevance-bounded learning: discard a learned clause when retraction brings its open
    /// literal count above the learn order.
    Relevance = 0,
    /// Size-bounded learning: learn only clauses up to the learn order, never discard.
    Size = 1,
}

/// Resolved configuration used during solving.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Time budget, `None` for unlimited. (Default: unlimited)
    pub timeout: Option<Duration>,
    /// Memory budget in megabytes, `None` for unlimited. (Default: unlimited)
    pub memout_mb: Option<usize>,
    /// Branching heuristic. (Default: Boehm)
    pub heuristic: Heuristic,
    /// Number of satisfying assignments to enumerate. (Default: 1)
    pub sol_num: u64,
    /// Bound used by the learning schemes. (Default: 3)
    pub learn_order: usize,
    /// Learning type. (Default: relevance)
    pub learn_type: LearnType,
    /// Restrict branching to the independent (model) propositions. (Default: off)
    pub indep_props: bool,
    /// Preprocessing strength; only 0 is implemented. (Default: 0)
    pub pproc_strength: i64,
    /// Random seed, 0 seeds from entropy. (Default: 0)
    pub rnd_seed: u64,
    /// Verbosity level. (Default: 0)
    pub verbosity: i64,
    /// Emit a trace line every this many nodes/conflicts, 0 to disable. (Default: 0)
    pub run_trace: u64,
    /// Optional heuristic-specific parameter. (Default: 0)
    pub heur_param: i64,
    /// Maximum variable index accepted by the clause builder. (Default: 100)
    pub max_var_num: usize,
    /// Expected number of input clauses, used for presizing. (Default: 1000)
    pub max_cl_num: usize,

    /// Conflict-directed backjumping instead of chronological backtracking. (Default: on)
    pub backjumping: bool,
    /// Clause learning; requires backjumping. (Default: on)
    pub learning: bool,
    /// Monotone literal fixing. (Default: on)
    pub pure_literal: bool,
    /// Track non-Horn clauses and declare consistency when none is open. (Default: off)
    pub horn_relaxation: bool,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            timeout: None,
            memout_mb: None,
            heuristic: Heuristic::Boehm,
            sol_num: 1,
            learn_order: 3,
            learn_type: LearnType::Relevance,
            indep_props: false,
            pproc_strength: 0,
            rnd_seed: 0,
            verbosity: 0,
            run_trace: 0,
            heur_param: 0,
            max_var_num: 100,
            max_cl_num: 1000,
            backjumping: true,
            learning: true,
            pure_literal: true,
            horn_relaxation: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve() {
        let config = Params::new().resolve();
        assert_eq!(config.heuristic, Heuristic::Boehm);
        assert_eq!(config.sol_num, 1);
        assert_eq!(config.learn_order, 3);
        assert_eq!(config.learn_type, LearnType::Relevance);
        assert_eq!(config.max_var_num, 100);
        assert_eq!(config.max_cl_num, 1000);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn set_overrides_default() {
        let mut params = Params::new();
        params
            .set(ParamName::Heuristics, Heuristic::Unitie as i64)
            .set(ParamName::SolNum, 4)
            .set(ParamName::MaxVarNum, 17);
        let config = params.resolve();
        assert_eq!(config.heuristic, Heuristic::Unitie);
        assert_eq!(config.sol_num, 4);
        assert_eq!(config.max_var_num, 17);
    }

    #[test]
    fn heuristic_names_roundtrip() {
        for &heur in Heuristic::all() {
            assert_eq!(Heuristic::from_name(heur.name()), Some(heur));
            assert_eq!(
                Heuristic::from_name(&heur.name().to_ascii_uppercase()),
                Some(heur)
            );
        }
        assert_eq!(Heuristic::from_name("vsids"), None);
    }
}
