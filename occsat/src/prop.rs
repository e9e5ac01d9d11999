//! Assignment propagation and retraction.
pub mod assignment;
pub mod bcp;
pub mod mlf;

pub use assignment::{extend_prop, retract_prop, Trail};
pub use bcp::{bcp, BcpQueue};
pub use mlf::{mlf, MlfQueue};

use crate::clause::ClauseRef;

/// A clause that ran out of open literals.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub clause: ClauseRef,
}
