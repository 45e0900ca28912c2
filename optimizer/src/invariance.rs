// invariance.rs — Loop-invariance check for hoisting candidates
//
// An operation is invariant when none of its operands is the loop's
// induction variable, directly or through an index-slicing producer. The
// check is deliberately shallow: one level through `Slice`, nothing
// transitive. Operands two or more definitions away from the induction
// variable are conservatively treated as invariant; a deeper analysis would
// change which pairs hoist and is out of scope.
//
// Preconditions: `op` is directly inside `loop_op`'s body.
// Postconditions: none (read-only).
// Failure modes: none.
// Side effects: none.

use crate::id::OpId;
use crate::ir::{Func, OpKind};

/// True iff `op`'s operands do not depend on the loop's induction variable
/// within one level of indirection.
pub fn is_invariant(func: &Func, op: OpId, loop_op: OpId) -> bool {
    let induction = func.induction_var(loop_op);
    for operand in func.op(op).all_operands() {
        if operand == induction {
            return false;
        }
        if let Some(producer) = func.producer(operand) {
            if matches!(func.op(producer).kind, OpKind::Slice { .. })
                && func.op(producer).all_operands().contains(&induction)
            {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FuncBuilder;
    use crate::ir::{ShapeDim, Type};

    #[test]
    fn direct_induction_operand_is_variant() {
        let mut b = FuncBuilder::new("f");
        let ext = b.arg(Type::Buffer);
        let buf = b.arg(Type::Buffer);
        let (_, t0) = b.barrier(&[]);
        let c0 = b.constant(0);
        let c8 = b.constant(8);
        let c1 = b.constant(1);
        let lp = b.start_loop(c0, c8, c1, t0);
        let dim = ShapeDim {
            offset: lp.induction,
            size: c1,
            stride: c1,
        };
        let (tr, tr_t) = b.transfer_nd(ext, buf, vec![], vec![dim], &[lp.iter_token]);
        b.end_loop(&lp, tr_t);
        let f = b.finish();
        assert!(!is_invariant(&f, tr, lp.op));
    }

    #[test]
    fn slice_of_induction_is_variant_one_level_deep() {
        let mut b = FuncBuilder::new("f");
        let ext = b.arg(Type::Buffer);
        let (_, t0) = b.barrier(&[]);
        let c0 = b.constant(0);
        let c8 = b.constant(8);
        let c1 = b.constant(1);
        let lp = b.start_loop(c0, c8, c1, t0);
        let view = b.slice(ext, &[lp.induction]);
        let (tr, tr_t) = b.transfer_nd(view, ext, vec![], vec![], &[lp.iter_token]);
        b.end_loop(&lp, tr_t);
        let f = b.finish();
        assert!(!is_invariant(&f, tr, lp.op));
    }

    #[test]
    fn two_levels_of_indirection_pass_the_shallow_check() {
        // slice(slice(ext, i), 0): the outer slice's operands do not name
        // the induction variable, so the shallow check reports invariant.
        let mut b = FuncBuilder::new("f");
        let ext = b.arg(Type::Buffer);
        let (_, t0) = b.barrier(&[]);
        let c0 = b.constant(0);
        let c8 = b.constant(8);
        let c1 = b.constant(1);
        let lp = b.start_loop(c0, c8, c1, t0);
        let inner = b.slice(ext, &[lp.induction]);
        let outer = b.slice(inner, &[c0]);
        let (tr, tr_t) = b.transfer_nd(outer, ext, vec![], vec![], &[lp.iter_token]);
        b.end_loop(&lp, tr_t);
        let f = b.finish();
        assert!(is_invariant(&f, tr, lp.op));
    }

    #[test]
    fn constant_shapes_are_invariant() {
        let mut b = FuncBuilder::new("f");
        let ext = b.arg(Type::Buffer);
        let buf = b.arg(Type::Buffer);
        let (_, t0) = b.barrier(&[]);
        let c0 = b.constant(0);
        let c8 = b.constant(8);
        let c1 = b.constant(1);
        let lp = b.start_loop(c0, c8, c1, t0);
        let dim = ShapeDim {
            offset: c0,
            size: c8,
            stride: c1,
        };
        let (tr, tr_t) = b.transfer_nd(ext, buf, vec![dim], vec![dim], &[lp.iter_token]);
        b.end_loop(&lp, tr_t);
        let f = b.finish();
        assert!(is_invariant(&f, tr, lp.op));
    }
}
