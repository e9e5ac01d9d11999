//! Propositions and the proposition store.
use crate::clause::ClauseRef;
use crate::lit::{Lit, LitIdx, Var, NO_REF};

/// Why a proposition carries its current value.
///
/// `PurePos`/`PureNeg` double as the eligibility tag of the MLF queue: a proposition is tagged
/// while still unassigned and the tag is checked again when it is popped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssignMode {
    /// Unit propagation.
    Unit,
    /// Pure literal, positive polarity.
    PurePos,
    /// Pure literal, negative polarity.
    PureNeg,
    /// First branch of a decision.
    LeftSplit,
    /// Flipped branch of a decision.
    RightSplit,
    /// Failed literal detected by a lookahead.
    Failed,
}

impl Default for AssignMode {
    fn default() -> AssignMode {
        AssignMode::Unit
    }
}

impl AssignMode {
    /// Whether assignments of this mode own a synthesized reason clause.
    pub fn owns_reason(self) -> bool {
        matches!(self, AssignMode::RightSplit | AssignMode::Failed)
    }
}

/// One proposition.
///
/// The occurrence lists are logically split into an original prefix and a learned suffix; the
/// split indices are frozen by the builder's finalize step. Learned occurrences are added and
/// removed behind the split, with swap-with-last removal inside the suffix.
#[derive(Clone, Default)]
pub struct Prop {
    /// Current valuation, `None` while unassigned.
    pub value: Option<bool>,
    /// Why the value was set, or the pending pure-literal tag.
    pub mode: AssignMode,
    /// Decision level at assignment time.
    pub level: usize,
    /// The clause that forced this assignment, when there is one.
    pub reason: Option<ClauseRef>,
    /// Clauses with a positive occurrence of this proposition.
    pub pos_occs: Vec<ClauseRef>,
    /// Clauses with a negative occurrence of this proposition.
    pub neg_occs: Vec<ClauseRef>,
    /// Length of the original prefix of `pos_occs`.
    pub pos_orig: usize,
    /// Length of the original prefix of `neg_occs`.
    pub neg_orig: usize,
    /// Back index into the dense proposition index, `NO_REF` if absent.
    pub back_order: LitIdx,
    /// Back index into the model proposition index, `NO_REF` if absent.
    pub back_model: LitIdx,
}

impl Prop {
    fn new() -> Prop {
        Prop {
            back_order: NO_REF,
            back_model: NO_REF,
            ..Prop::default()
        }
    }
}

/// The proposition store.
///
/// `store` is indexed directly by `Var::index()`; `order` is the dense list of propositions that
/// actually appear (the iteration order of the heuristics), `model_props` the subset declared
/// independent by the host.
#[derive(Default)]
pub struct Props {
    pub store: Vec<Prop>,
    pub order: Vec<Var>,
    pub model_props: Vec<Var>,
}

impl Props {
    /// Prepare for propositions up to the given maximal variable count.
    pub fn init(&mut self, max_var_count: usize) {
        self.store.clear();
        self.store.resize(max_var_count, Prop::new());
        self.order.clear();
        self.model_props.clear();
    }

    pub fn prop(&self, var: Var) -> &Prop {
        &self.store[var.index()]
    }

    pub fn prop_mut(&mut self, var: Var) -> &mut Prop {
        &mut self.store[var.index()]
    }

    /// Whether the proposition is linked into the dense index.
    pub fn is_present(&self, var: Var) -> bool {
        self.store[var.index()].back_order != NO_REF
    }

    /// Link a proposition into the dense index on first appearance.
    pub fn insert(&mut self, var: Var) {
        if !self.is_present(var) {
            self.store[var.index()].back_order = self.order.len() as LitIdx;
            self.order.push(var);
        }
    }

    /// Unlink a proposition from the dense index and the model index.
    pub fn remove(&mut self, var: Var) {
        let back_order = self.store[var.index()].back_order;
        if back_order != NO_REF {
            let i = back_order as usize;
            let last_idx = self.order.len() - 1;
            let last = self.order[last_idx];
            self.order.truncate(last_idx);
            if last != var {
                self.order[i] = last;
                self.store[last.index()].back_order = i as LitIdx;
            }
            self.store[var.index()].back_order = NO_REF;
        }

        let back_model = self.store[var.index()].back_model;
        if back_model != NO_REF {
            let i = back_model as usize;
            let last_idx = self.model_props.len() - 1;
            let last = self.model_props[last_idx];
            self.model_props.truncate(last_idx);
            if last != var {
                self.model_props[i] = last;
                self.store[last.index()].back_model = i as LitIdx;
            }
            self.store[var.index()].back_model = NO_REF;
        }
    }

    /// Declare a proposition independent (a model proposition).
    pub fn make_model(&mut self, var: Var) {
        self.insert(var);
        if self.store[var.index()].back_model == NO_REF {
            self.store[var.index()].back_model = self.model_props.len() as LitIdx;
            self.model_props.push(var);
        }
    }

    /// Current value of a proposition.
    pub fn value(&self, var: Var) -> Option<bool> {
        self.store[var.index()].value
    }

    /// Whether a literal is currently falsified.
    pub fn lit_falsified(&self, lit: Lit) -> bool {
        self.store[lit.index()].value == Some(lit.is_negative())
    }

    /// Whether a literal's proposition is unassigned.
    pub fn lit_unassigned(&self, lit: Lit) -> bool {
        self.store[lit.index()].value.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove_keep_indices_dense() {
        let mut props = Props::default();
        props.init(10);

        let a = Var::from_dimacs(1);
        let b = Var::from_dimacs(2);
        let c = Var::from_dimacs(3);

        props.insert(a);
        props.insert(b);
        props.insert(c);
        props.insert(b);

        assert_eq!(props.order, vec![a, b, c]);

        props.remove(a);

        assert_eq!(props.order.len(), 2);
        for (i, &var) in props.order.iter().enumerate() {
            assert_eq!(props.prop(var).back_order as usize, i);
        }
        assert!(!props.is_present(a));
    }

    #[test]
    fn model_membership() {
        let mut props = Props::default();
        props.init(4);

        let a = Var::from_dimacs(1);
        let b = Var::from_dimacs(2);

        props.make_model(a);
        props.make_model(b);
        props.make_model(a);

        assert_eq!(props.model_props, vec![a, b]);

        props.remove(a);
        assert_eq!(props.model_props, vec![b]);
        assert_eq!(props.prop(b).back_model, 0);
    }
}
