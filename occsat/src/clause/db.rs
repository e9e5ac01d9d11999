//! The clause database: committed originals, the non-Horn index, learned clauses and the
//! unit-learned stack.
use crate::lit::{LitIdx, NO_REF};

use super::{ClauseAlloc, ClauseRef, UnitState};

/// Dense clause indices plus the open-clause counters.
#[derive(Default)]
pub struct ClauseDb {
    /// All committed original clauses.
    pub clauses: Vec<ClauseRef>,
    /// The currently linked non-Horn clauses (more than one positive literal). Maintained only
    /// under horn relaxation.
    pub nh_clauses: Vec<ClauseRef>,
    /// All learned clauses.
    pub learned: Vec<ClauseRef>,
    /// The learned clauses currently having exactly one open literal.
    pub unit_learned: Vec<ClauseRef>,
    /// The clause currently being assembled by the builder.
    pub pending: Option<ClauseRef>,
    /// Original clause count at the end of the build.
    pub clause_count: usize,
    /// Non-Horn clause count at the end of the build.
    pub nh_count: usize,
    /// Currently open original clauses.
    pub open_clauses: usize,
    /// Currently open non-Horn clauses.
    pub open_nh: usize,
    /// Whether the builder's finalize step ran.
    pub finalized: bool,
}

impl ClauseDb {
    /// Whether the formula is empty under the configured consistency notion.
    pub fn formula_is_empty(&self, horn_relaxation: bool) -> bool {
        if horn_relaxation {
            self.open_nh == 0
        } else {
            self.open_clauses == 0
        }
    }
}

/// Link a clause into the non-Horn index.
pub fn link_non_horn(db: &mut ClauseDb, alloc: &mut ClauseAlloc, cref: ClauseRef) {
    alloc.clause_mut(cref).back_nh = db.nh_clauses.len() as LitIdx;
    db.nh_clauses.push(cref);
}

/// Unlink a clause from the non-Horn index by swapping with the last entry.
pub fn unlink_non_horn(db: &mut ClauseDb, alloc: &mut ClauseAlloc, cref: ClauseRef) {
    let i = alloc.clause(cref).back_nh as usize;
    debug_assert!(db.nh_clauses[i] == cref);
    let last_idx = db.nh_clauses.len() - 1;
    let last = db.nh_clauses[last_idx];
    db.nh_clauses.truncate(last_idx);
    if last != cref {
        db.nh_clauses[i] = last;
        alloc.clause_mut(last).back_nh = i as LitIdx;
    }
    alloc.clause_mut(cref).back_nh = NO_REF;
}

/// Push a learned clause onto the unit-learned stack.
pub fn push_unit_learned(db: &mut ClauseDb, alloc: &mut ClauseAlloc, cref: ClauseRef) {
    alloc.clause_mut(cref).unit_state = UnitState::At(db.unit_learned.len() as LitIdx);
    db.unit_learned.push(cref);
}

/// Remove a learned clause from the unit-learned stack, leaving it in the given state.
pub fn remove_unit_learned(
    db: &mut ClauseDb,
    alloc: &mut ClauseAlloc,
    cref: ClauseRef,
    after: UnitState,
) {
    if let UnitState::At(i) = alloc.clause(cref).unit_state {
        let i = i as usize;
        debug_assert!(db.unit_learned[i] == cref);
        let last_idx = db.unit_learned.len() - 1;
        let last = db.unit_learned[last_idx];
        db.unit_learned.truncate(last_idx);
        if last != cref {
            db.unit_learned[i] = last;
            alloc.clause_mut(last).unit_state = UnitState::At(i as LitIdx);
        }
    }
    alloc.clause_mut(cref).unit_state = after;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_horn_index_stays_dense() {
        let mut db = ClauseDb::default();
        let mut alloc = ClauseAlloc::new();

        let a = alloc.alloc();
        let b = alloc.alloc();
        let c = alloc.alloc();

        link_non_horn(&mut db, &mut alloc, a);
        link_non_horn(&mut db, &mut alloc, b);
        link_non_horn(&mut db, &mut alloc, c);

        unlink_non_horn(&mut db, &mut alloc, a);

        assert_eq!(db.nh_clauses.len(), 2);
        for (i, &cref) in db.nh_clauses.iter().enumerate() {
            assert_eq!(alloc.clause(cref).back_nh as usize, i);
        }
        assert_eq!(alloc.clause(a).back_nh, NO_REF);

        unlink_non_horn(&mut db, &mut alloc, c);
        unlink_non_horn(&mut db, &mut alloc, b);
        assert!(db.nh_clauses.is_empty());
    }

    #[test]
    fn unit_learned_stack_state_machine() {
        let mut db = ClauseDb::default();
        let mut alloc = ClauseAlloc::new();

        let a = alloc.alloc();
        let b = alloc.alloc();

        push_unit_learned(&mut db, &mut alloc, a);
        push_unit_learned(&mut db, &mut alloc, b);
        assert_eq!(alloc.clause(a).unit_state, UnitState::At(0));

        remove_unit_learned(&mut db, &mut alloc, a, UnitState::Forbid);
        assert_eq!(alloc.clause(a).unit_state, UnitState::Forbid);
        assert_eq!(alloc.clause(b).unit_state, UnitState::At(0));
        assert_eq!(db.unit_learned, vec![b]);
    }
}
