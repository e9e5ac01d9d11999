//! Clause storage.
use crate::lit::{Lit, LitIdx, Var, NO_REF};

pub mod alloc;
pub mod db;

pub use alloc::{ClauseAlloc, ClauseRef};
pub use db::ClauseDb;

/// Replay state of a learned clause on the unit-learned stack.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnitState {
    /// May enter the unit-learned stack when it becomes unit.
    Allow,
    /// Was unit once and left the stack again; barred from replay.
    Forbid,
    /// Currently on the unit-learned stack at this position.
    At(LitIdx),
}

impl Default for UnitState {
    fn default() -> UnitState {
        UnitState::Allow
    }
}

/// One clause.
///
/// `open_lits` counts the literals not yet falsified. `subsumer` names the proposition whose
/// current value satisfies the clause; `subsumer == None` is the definition of *open*. Learned
/// clauses never get a subsumer, they are only resolved against.
#[derive(Clone, Debug)]
pub struct Clause {
    /// Ordered literal references.
    pub lits: Vec<Lit>,
    /// Number of literals not yet falsified.
    pub open_lits: LitIdx,
    /// Number of positive literals. Only kept up to date under horn relaxation.
    pub pos_lits: LitIdx,
    /// The proposition currently satisfying this clause.
    pub subsumer: Option<Var>,
    /// Back index into the original clause array (originals) or the learned array (learned
    /// clauses); `NO_REF` for free-floating reason clauses.
    pub back_clauses: LitIdx,
    /// Back index into the non-Horn clause index, `NO_REF` when unlinked.
    pub back_nh: LitIdx,
    /// Unit-learned stack state.
    pub unit_state: UnitState,
    /// For learned clauses the decision level they were learned at, `None` for originals.
    pub learned: Option<LitIdx>,
}

impl Default for Clause {
    fn default() -> Clause {
        Clause {
            lits: vec![],
            open_lits: 0,
            pos_lits: 0,
            subsumer: None,
            back_clauses: NO_REF,
            back_nh: NO_REF,
            unit_state: UnitState::Allow,
            learned: None,
        }
    }
}

impl Clause {
    /// Whether the clause is open, i.e. not satisfied by any assigned proposition.
    pub fn is_open(&self) -> bool {
        self.subsumer.is_none()
    }

    /// Whether this is a learned clause.
    pub fn is_learned(&self) -> bool {
        self.learned.is_some()
    }
}
