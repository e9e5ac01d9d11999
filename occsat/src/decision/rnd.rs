//! Uniformly random branching.
use partial_ref::{partial, PartialRef};

use crate::context::{Context, PropsP, RngP};
use crate::props::AssignMode;

use super::Decision;

pub fn choose(mut ctx: partial!(Context, mut RngP, PropsP)) -> Option<Decision> {
    let open_count = {
        let props = ctx.part(PropsP);
        props
            .order
            .iter()
            .filter(|&&var| props.value(var).is_none())
            .count()
    };
    if open_count == 0 {
        return None;
    }

    let target = ctx.part_mut(RngP).below(open_count);
    let value = ctx.part_mut(RngP).flip();

    let props = ctx.part(PropsP);
    let mut seen = 0;
    for &var in props.order.iter() {
        if props.value(var).is_none() {
            if seen == target {
                return Some(Decision {
                    var,
                    value,
                    mode: AssignMode::LeftSplit,
                });
            }
            seen += 1;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use partial_ref::IntoPartialRefMut;

    use occsat_formula::lits;

    use crate::context::Context;
    use crate::test_setup::load_and_finalize;

    use super::*;

    #[test]
    fn picks_an_open_proposition() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_and_finalize(ctx.borrow(), &[&lits![1, 2][..], &lits![-2, 3][..]]);

        for _ in 0..16 {
            let decision = choose(ctx.borrow()).unwrap();
            assert_eq!(ctx.part(PropsP).value(decision.var), None);
            assert_eq!(decision.mode, AssignMode::LeftSplit);
        }
    }
}
