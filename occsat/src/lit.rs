//! Literals and propositions.
pub use occsat_formula::{lit::LitIdx, Lit, Var};

/// Sentinel for absent back indices in the dense index vectors.
///
/// Swap-with-last deletion keeps the index vectors dense; every indexed object carries its own
/// position so deletion stays O(1). `NO_REF` marks objects not currently linked into a vector.
pub const NO_REF: LitIdx = LitIdx::max_value();
